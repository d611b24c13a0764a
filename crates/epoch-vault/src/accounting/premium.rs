//! # Premium Streamer
//!
//! Extracts the time-accrued premium from the settled pool and pays it to the
//! collector. Must run before anything that changes the pricing basis: epoch
//! advance, rate change, matured settlement.
//!
//! ## Algorithm
//!
//! ```text
//! full = elapsed / PERIOD, rem = elapsed % PERIOD
//! if full > MAX_PERIODS { full = MAX_PERIODS; rem = 0 }
//!
//! value = total_assets()
//! repeat full times:
//!     fee = floor(value * rate / 10_000)
//!     stop if fee == 0
//!     value -= fee
//!     stop if value == 0
//! value -= floor(value * rate * rem / (10_000 * PERIOD))
//!
//! premium = before - value
//! ```

use crate::accounting::context::SettlementContext;
use crate::config::VaultConfig;
use crate::domain::invariants::InvariantViolation;
use crate::domain::services::{add, bps_mul_floor, mul_div, sub};
use crate::domain::value_objects::{Rounding, Timestamp, BPS_DENOMINATOR, U256};
use crate::errors::VaultError;
use crate::events::{PremiumOutcome, VaultEvent};
use crate::ports::outbound::AssetToken;
use tracing::debug;

/// Timestamp value meaning "never streamed".
pub const NEVER_STREAMED: Timestamp = 0;

/// Premium owed on `value` for `elapsed_secs` at `rate_bps`.
///
/// Pure; returns the amount to move, never more than `value`.
pub fn accrue(
    value: U256,
    rate_bps: u64,
    elapsed_secs: u64,
    config: &VaultConfig,
) -> Result<U256, InvariantViolation> {
    if value.is_zero() || rate_bps == 0 || elapsed_secs == 0 {
        return Ok(U256::zero());
    }

    let period = config.premium_period_secs;
    let mut full = elapsed_secs / period;
    let mut rem = elapsed_secs % period;
    if full > config.max_premium_periods {
        full = config.max_premium_periods;
        rem = 0;
    }

    let mut remaining = value;
    for _ in 0..full {
        let fee = bps_mul_floor(remaining, rate_bps)?;
        if fee.is_zero() {
            break;
        }
        remaining = sub(remaining, fee, "premium period")?;
        if remaining.is_zero() {
            break;
        }
    }

    if rem > 0 && !remaining.is_zero() {
        let numerator = U256::from(rate_bps)
            .checked_mul(U256::from(rem))
            .ok_or(InvariantViolation::ArithmeticOverflow("premium numerator"))?;
        let denominator = U256::from(BPS_DENOMINATOR)
            .checked_mul(U256::from(period))
            .ok_or(InvariantViolation::ArithmeticOverflow("premium denominator"))?;
        let fee = mul_div(remaining, numerator, denominator, Rounding::Floor)?;
        remaining = sub(remaining, fee, "premium remainder")?;
    }

    sub(value, remaining, "premium delta")
}

/// Extracts premium up to `ctx.now`, pays the collector and stamps the time.
///
/// Always emits [`VaultEvent::PremiumStreamed`], zero amounts included.
pub fn extract<T: AssetToken>(ctx: &mut SettlementContext<'_, T>) -> Result<U256, VaultError> {
    let global = &ctx.storage().global;
    let last = global.last_premium_timestamp;
    let rate_bps = global.premium_rate_bps;
    let collector = global.premium_collector;
    let elapsed_secs = if last == NEVER_STREAMED {
        0
    } else {
        ctx.now.saturating_sub(last)
    };
    let before = ctx.storage().total_assets()?;

    let (amount, outcome) = if last == NEVER_STREAMED {
        (U256::zero(), PremiumOutcome::NeverStreamed)
    } else if elapsed_secs == 0 {
        (U256::zero(), PremiumOutcome::NoTimeElapsed)
    } else if rate_bps == 0 {
        (U256::zero(), PremiumOutcome::ZeroRate)
    } else if before.is_zero() {
        (U256::zero(), PremiumOutcome::NothingToStream)
    } else {
        let amount = accrue(before, rate_bps, elapsed_secs, ctx.config)?;
        if amount > before {
            return Err(InvariantViolation::PremiumOverdraw {
                fee: amount,
                pool: before,
            }
            .into());
        }
        if amount.is_zero() {
            (amount, PremiumOutcome::NothingToStream)
        } else {
            (amount, PremiumOutcome::Streamed)
        }
    };

    if !amount.is_zero() {
        let global = ctx.global_mut();
        global.tracked_assets = sub(global.tracked_assets, amount, "tracked assets")?;
        global.premium_paid = add(global.premium_paid, amount, "premium paid")?;
        ctx.push_assets(collector, amount)?;
    }
    let now = ctx.now;
    ctx.global_mut().last_premium_timestamp = now;

    debug!(
        amount = %amount,
        rate_bps,
        elapsed_secs,
        ?outcome,
        "premium extraction"
    );
    ctx.emit(VaultEvent::PremiumStreamed {
        collector,
        amount,
        rate_bps,
        elapsed_secs,
        outcome,
    });
    Ok(amount)
}
