//! # Accounting Components
//!
//! The five settlement components, leaves first:
//!
//! | Component | Module | Responsibility |
//! |-----------|--------|----------------|
//! | ExchangeAccounting | `exchange` | `total_assets()`, share/asset conversion |
//! | PremiumStreamer | `premium` | Time-accrued fee extraction |
//! | DepositLedger | `deposit` | Pending deposits, epoch sync, claims |
//! | RedeemLedger | `redeem` | Escrow, settlement, reserved claims |
//! | SettlementCoordinator | `settlement` | Epoch advance, batch and matured settlement |
//!
//! Every component operates on a [`SettlementContext`]; none of them knows
//! about locking, capability checks or event publication.

pub mod context;
pub mod deposit;
pub mod exchange;
pub mod premium;
pub mod redeem;
pub mod settlement;

pub use context::SettlementContext;
pub use settlement::SettlementReport;
