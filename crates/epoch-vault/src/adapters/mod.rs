//! Adapters layer for the settlement engine.
//!
//! In-process implementations of the outbound ports. They back the test
//! suites and embedders that keep the asset ledger in memory.

pub mod access;
pub mod clock;
pub mod events;
pub mod pool;
pub mod token;

pub use access::StaticAccessPolicy;
pub use clock::{ManualClock, SystemTimeSource};
pub use events::{RecordingEventSink, TracingEventSink};
pub use pool::FixedRatePool;
pub use token::InMemoryAssetToken;
