//! Combinator helpers: common control-flow patterns composed from the
//! scheduling engine.
//!
//! Each helper builds one [`Schedule`](crate::Schedule) whose work function
//! adapts a simpler predicate/step API onto the tick contract, then awaits
//! the run and settles exactly once:
//!
//! - [`poll`] - repeat until a predicate reports `true`
//! - [`until`] - repeat until a predicate yields a value
//! - [`times`] - run a fixed number of ticks
//! - [`retry`] - like `until`, with an attempt budget
//! - [`pipeline`] - feed each step the previous step's output, one per tick
//!
//! The helpers are cancellation-safe: dropping one before it settles (for
//! instance under [`tokio::time::timeout`]) disarms its schedule, so no
//! ticking continues in the background.
//!
//! Every helper has a `_with` variant taking an explicit
//! [`StartMode`](crate::StartMode); the short forms use the default
//! ([`StartMode::Immediate`](crate::StartMode::Immediate)). Periods are
//! accepted as `impl Into<Period>`, so both a bare `Duration` and a
//! [`duration`](crate::duration) strategy work:
//!
//! ```rust
//! use cadence::{retry, duration};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let mut readings = vec![None, None, Some(21)].into_iter();
//!
//! let value = retry(
//!     move || {
//!         let next = readings.next().flatten();
//!         async move { Ok::<_, String>(next) }
//!     },
//!     5,
//!     duration::fibonacci(Duration::from_millis(1)),
//! )
//! .await
//! .unwrap();
//!
//! assert_eq!(value, 21);
//! # });
//! ```

mod error;
mod pipeline;
mod poll;
mod retry;
mod times;
mod until;

pub use error::RetryError;
pub use pipeline::{pipeline, pipeline_with, step, PipelineStep};
pub use poll::{poll, poll_with};
pub use retry::{retry, retry_with};
pub use times::{times, times_with};
pub use until::{until, until_with};


use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::schedule::{Schedule, ScheduleBuilder};

/// Terminal-value slot shared between a helper and its work closure.
type Slot<T> = std::sync::Arc<Mutex<Option<T>>>;

fn slot_lock<T>(slot: &Mutex<Option<T>>) -> MutexGuard<'_, Option<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn built<E: Send + 'static>(builder: ScheduleBuilder<E>) -> Schedule<E> {
    match builder.build() {
        Ok(schedule) => schedule,
        Err(_) => unreachable!("combinator schedules always carry work and a period"),
    }
}

fn start_fresh<E: Send + 'static>(schedule: &Schedule<E>) {
    if schedule.start().is_err() {
        unreachable!("a freshly built schedule cannot already be running");
    }
}
