//! # Cadence
//!
//! > *"One tick at a time"*
//!
//! A Rust library for serialized repeated execution: polling, retrying,
//! staged pipelines, and backoff-driven repetition.
//!
//! ## Philosophy
//!
//! **Cadence** separates *when* from *what*:
//! - **Duration strategies** are pure counter -> delay functions (constant,
//!   linear, exponential, fibonacci, jittered, stepped)
//! - **The schedule** is a small state machine that drives ticks, strictly
//!   serializing invocations - the next tick is never armed while work is
//!   still in flight
//! - **Combinators** ([`poll`], [`until`], [`times`], [`retry`],
//!   [`pipeline`]) compose the two for the common control-flow patterns
//!
//! ## Quick Example
//!
//! ```rust
//! use cadence::{poll, duration};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let checks = Arc::new(AtomicU32::new(0));
//!
//! // Poll until the predicate reports readiness, backing off exponentially.
//! let result = poll(
//!     {
//!         let checks = checks.clone();
//!         move || {
//!             let n = checks.fetch_add(1, Ordering::SeqCst) + 1;
//!             async move { Ok::<_, String>(n >= 3) }
//!         }
//!     },
//!     duration::exponential(Duration::from_millis(1), Some(Duration::from_millis(5))),
//! )
//! .await;
//!
//! assert!(result.is_ok());
//! assert_eq!(checks.load(Ordering::SeqCst), 3);
//! # });
//! ```
//!
//! ## Start modes
//!
//! Every schedule fires its first tick either immediately
//! ([`StartMode::Immediate`], the default everywhere) or after one full
//! computed delay ([`StartMode::Delayed`]). The combinators accept an
//! explicit mode through their `_with` variants.
//!
//! For more examples, see the `demos/` directory.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod combinators;
pub mod duration;
pub mod schedule;

// Re-exports
pub use combinators::{
    pipeline, pipeline_with, poll, poll_with, retry, retry_with, step, times, times_with, until,
    until_with, PipelineStep, RetryError,
};
pub use duration::{DelayFn, Period};
pub use schedule::{
    Completion, Recovery, Schedule, ScheduleBuilder, ScheduleError, StartMode, Tick,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::combinators::{pipeline, poll, retry, step, times, until, RetryError};
    pub use crate::duration::{DelayFn, Period};
    pub use crate::schedule::{Completion, Recovery, Schedule, ScheduleError, StartMode, Tick};
}
