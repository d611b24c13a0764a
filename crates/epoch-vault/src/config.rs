//! Engine configuration from environment variables.

use crate::domain::value_objects::BPS_DENOMINATOR;
use crate::errors::VaultError;
use std::env;

/// Seconds in the premium accrual period (365 days).
pub const DEFAULT_PREMIUM_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

/// Compounding periods processed per extraction. Any older elapsed time is
/// discarded.
pub const DEFAULT_MAX_PREMIUM_PERIODS: u64 = 10;

/// Largest accepted `max_premium_periods`. Keeps one extraction's loop
/// bounded whatever the environment says.
pub const MAX_PREMIUM_PERIODS_LIMIT: u64 = 100;

/// Hard ceiling for any premium rate cap (20%).
pub const DEFAULT_GLOBAL_RATE_CAP_BPS: u64 = 2_000;

/// Delay after which any redemption may be settled permissionlessly (7 days).
pub const DEFAULT_REDEEM_MATURITY_DELAY_SECS: u64 = 7 * 24 * 60 * 60;

/// Constants of the settlement engine, fixed for the lifetime of a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Length of one premium compounding period.
    pub premium_period_secs: u64,

    /// Bound on compounding iterations per extraction.
    pub max_premium_periods: u64,

    /// Ceiling for `premium_rate_cap_bps`.
    pub global_rate_cap_bps: u64,

    /// Maturity delay for permissionless redemption settlement.
    pub redeem_maturity_delay_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            premium_period_secs: DEFAULT_PREMIUM_PERIOD_SECS,
            max_premium_periods: DEFAULT_MAX_PREMIUM_PERIODS,
            global_rate_cap_bps: DEFAULT_GLOBAL_RATE_CAP_BPS,
            redeem_maturity_delay_secs: DEFAULT_REDEEM_MATURITY_DELAY_SECS,
        }
    }
}

impl VaultConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EV_PREMIUM_PERIOD_SECS`: Premium period (default: 31536000)
    /// - `EV_MAX_PREMIUM_PERIODS`: Max compounding periods (default: 10)
    /// - `EV_GLOBAL_RATE_CAP_BPS`: Global rate cap (default: 2000)
    /// - `EV_REDEEM_MATURITY_DELAY_SECS`: Maturity delay (default: 604800)
    ///
    /// Unparseable values fall back to the default. The result is not
    /// validated; the vault constructor does that.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var_or = |name: &str, default: u64| -> u64 {
            lookup(name)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            premium_period_secs: var_or("EV_PREMIUM_PERIOD_SECS", DEFAULT_PREMIUM_PERIOD_SECS),
            max_premium_periods: var_or("EV_MAX_PREMIUM_PERIODS", DEFAULT_MAX_PREMIUM_PERIODS),
            global_rate_cap_bps: var_or("EV_GLOBAL_RATE_CAP_BPS", DEFAULT_GLOBAL_RATE_CAP_BPS),
            redeem_maturity_delay_secs: var_or(
                "EV_REDEEM_MATURITY_DELAY_SECS",
                DEFAULT_REDEEM_MATURITY_DELAY_SECS,
            ),
        }
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.premium_period_secs == 0 {
            return Err(VaultError::InvalidConfig(
                "premium_period_secs must be non-zero".to_string(),
            ));
        }
        if !(1..=MAX_PREMIUM_PERIODS_LIMIT).contains(&self.max_premium_periods) {
            return Err(VaultError::InvalidConfig(format!(
                "max_premium_periods {} must be in 1..={MAX_PREMIUM_PERIODS_LIMIT}",
                self.max_premium_periods
            )));
        }
        if self.global_rate_cap_bps >= BPS_DENOMINATOR {
            return Err(VaultError::InvalidConfig(format!(
                "global_rate_cap_bps {} must be below {BPS_DENOMINATOR}",
                self.global_rate_cap_bps
            )));
        }
        Ok(())
    }
}
