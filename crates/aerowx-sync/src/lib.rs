//! Rate-limited fetching, caching and scheduling of airport weather.
//!
//! The `SyncEngine` owns the only writable handle to the `WeatherCache`.
//! Upstream calls go through a `RateGate` and never run in parallel.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod gate;
pub mod scheduler;

pub use cache::{CacheDocument, CacheReader, WeatherCache};
pub use error::{PersistenceError, UpstreamError};
pub use fetcher::{Fetched, Fetcher, ReportKind};
pub use gate::{MinSpacingGate, RateGate};
pub use scheduler::{
    AirportOutcome, CycleReport, StepOutcome, SyncEngine, SyncSettings, TriggerOutcome,
};
