//! The scheduling engine: a tick-driving state machine with strict
//! serialization, self-termination, and recoverable error handling.
//!
//! A [`Schedule`] owns a work function, a [`Period`], and an optional error
//! hook. [`Schedule::start`] arms it; the engine then repeatedly computes the
//! next delay, sleeps, invokes the work with the 1-based tick counter, and
//! interprets the result: [`Tick::Continue`] re-arms, [`Tick::Stop`]
//! auto-stops, an error is routed to the hook (or fails the run if there is
//! none). The next tick is never armed while work is still in flight.
//!
//! # Quick Start
//!
//! ```rust
//! use cadence::{Completion, Schedule, Tick};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let ticks = Arc::new(AtomicU32::new(0));
//!
//! let schedule = Schedule::builder()
//!     .work_sync({
//!         let ticks = ticks.clone();
//!         move |counter| {
//!             ticks.fetch_add(1, Ordering::SeqCst);
//!             Ok::<_, String>(if counter == 3 { Tick::Stop } else { Tick::Continue })
//!         }
//!     })
//!     .period(Duration::from_millis(1))
//!     .build()
//!     .unwrap();
//!
//! schedule.start().unwrap();
//! assert!(matches!(schedule.done().await, Completion::Finished));
//! assert_eq!(ticks.load(Ordering::SeqCst), 3);
//! assert!(!schedule.is_running());
//! # });
//! ```

mod error;

pub use error::ScheduleError;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tokio::sync::watch;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::Notify;

use crate::duration::Period;

/// What a tick of work tells the engine to do next.
///
/// This is the engine's rendering of the "return `false` to stop" contract:
/// [`Tick::Stop`] auto-stops the schedule, [`Tick::Continue`] re-arms the
/// next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Re-arm the next tick.
    Continue,
    /// Auto-stop: this run is complete.
    Stop,
}

/// What an error hook tells the engine to do with a failed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The error is recovered; re-arm the next tick.
    Resume,
    /// The error is handled but the run should end.
    Halt,
}

/// Whether the first tick fires immediately or waits one full delay.
///
/// The default - for the bare engine and for every combinator - is
/// [`StartMode::Immediate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// The first tick fires with zero delay.
    #[default]
    Immediate,
    /// The first tick waits one full computed delay.
    Delayed,
}

/// How a run of a schedule settled.
///
/// Obtained from [`Schedule::done`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<E> {
    /// The caller invoked [`Schedule::stop`].
    Stopped,
    /// The schedule ended on its own: work returned [`Tick::Stop`], or the
    /// error hook returned [`Recovery::Halt`].
    Finished,
    /// A tick failed with no error hook, or the hook itself failed. The
    /// hook's own error supersedes the original.
    Failed(E),
}

impl<E> Completion<E> {
    /// Returns true if the run failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Extract the error, if the run failed.
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

type WorkFn<E> = Box<dyn FnMut(u32) -> BoxFuture<'static, Result<Tick, E>> + Send>;
type ErrorFn<E> = Box<dyn FnMut(E) -> BoxFuture<'static, Result<Recovery, E>> + Send>;

struct Hooks<E> {
    work: WorkFn<E>,
    period: Period,
    on_error: Option<ErrorFn<E>>,
}

struct State<E> {
    running: bool,
    epoch: u64,
    stop: Option<watch::Sender<bool>>,
    completion: Option<Completion<E>>,
}

struct Shared<E> {
    hooks: AsyncMutex<Hooks<E>>,
    state: Mutex<State<E>>,
    done: Notify,
    mode: StartMode,
}

impl<E> Shared<E> {
    fn state(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A driver is live only while the run it was spawned for is current.
    fn alive(&self, epoch: u64) -> bool {
        let state = self.state();
        state.running && state.epoch == epoch
    }

    /// Record the completion of a run, unless it was superseded by a manual
    /// stop or a restart (in which case the outcome is discarded).
    fn finish(&self, epoch: u64, completion: Completion<E>) {
        {
            let mut state = self.state();
            if !state.running || state.epoch != epoch {
                return;
            }
            state.running = false;
            state.stop = None;
            state.completion = Some(completion);
        }
        self.done.notify_waiters();
    }
}

/// A repeated-execution schedule.
///
/// Constructed via [`Schedule::builder`]; immutable after construction apart
/// from its running state. May be restarted after it stops; each
/// `start()`/`stop()` cycle gets a fresh counter starting at 1. Dropping a
/// running schedule disarms it, as if [`Schedule::stop`] had been called.
///
/// See the [module documentation](self) for the tick and error-recovery
/// contracts.
pub struct Schedule<E> {
    shared: Arc<Shared<E>>,
}

impl<E> fmt::Debug for Schedule<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("running", &self.shared.state().running)
            .finish_non_exhaustive()
    }
}

impl<E> Drop for Schedule<E> {
    fn drop(&mut self) {
        // The driver task must not outlive its handle.
        let mut state = self.shared.state();
        state.running = false;
        if let Some(stop_tx) = state.stop.take() {
            let _ = stop_tx.send(true);
        }
    }
}

impl<E: Send + 'static> Schedule<E> {
    /// Start building a schedule.
    pub fn builder() -> ScheduleBuilder<E> {
        ScheduleBuilder {
            work: None,
            period: None,
            mode: StartMode::default(),
            on_error: None,
        }
    }

    /// Whether the schedule is currently running. No side effects.
    pub fn is_running(&self) -> bool {
        self.shared.state().running
    }

    /// Arm the schedule: reset the counter, spawn the driver, schedule the
    /// first tick. Chainable - returns `&self` on success.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::AlreadyRunning`] if the schedule is running.
    pub fn start(&self) -> Result<&Self, ScheduleError> {
        let (epoch, stop_rx) = {
            let mut state = self.shared.state();
            if state.running {
                return Err(ScheduleError::AlreadyRunning);
            }
            state.running = true;
            state.epoch += 1;
            state.completion = None;
            let (stop_tx, stop_rx) = watch::channel(false);
            state.stop = Some(stop_tx);
            (state.epoch, stop_rx)
        };
        tracing::debug!(epoch, "schedule started");
        tokio::spawn(drive(self.shared.clone(), stop_rx, epoch));
        Ok(self)
    }

    /// Disarm the schedule. A pending sleeping tick becomes inert; an
    /// in-flight work invocation is allowed to complete, but its result is
    /// discarded and never re-arms a tick. Chainable.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::NotRunning`] if the schedule is not running.
    pub fn stop(&self) -> Result<&Self, ScheduleError> {
        {
            let mut state = self.shared.state();
            if !state.running {
                return Err(ScheduleError::NotRunning);
            }
            state.running = false;
            if let Some(stop_tx) = state.stop.take() {
                let _ = stop_tx.send(true);
            }
            state.completion = Some(Completion::Stopped);
        }
        self.shared.done.notify_waiters();
        tracing::debug!("schedule stopped");
        Ok(self)
    }

    /// Wait for the current run to settle and take its [`Completion`].
    ///
    /// The completion channel is single-consumer: the first caller takes the
    /// outcome. If the schedule has never been started, this waits until a
    /// run settles.
    pub async fn done(&self) -> Completion<E> {
        loop {
            let notified = self.shared.done.notified();
            tokio::pin!(notified);
            // Register for the wakeup before checking, so a completion that
            // lands in between is not missed.
            notified.as_mut().enable();
            if let Some(completion) = self.shared.state().completion.take() {
                return completion;
            }
            notified.await;
        }
    }
}

/// The driver for one `start()` cycle. Strictly serialized: the next tick's
/// timer is armed only after the current invocation's result (or error) has
/// been fully interpreted. Liveness is rechecked after every suspension
/// point, so a stale timer or an in-flight result after `stop()` is a no-op.
async fn drive<E: Send + 'static>(
    shared: Arc<Shared<E>>,
    mut stop_rx: watch::Receiver<bool>,
    epoch: u64,
) {
    let mut counter: u32 = 0;
    loop {
        counter += 1;

        let delay = {
            let mut hooks = shared.hooks.lock().await;
            if counter == 1 && shared.mode == StartMode::Immediate {
                Duration::ZERO
            } else {
                hooks.period.delay(counter)
            }
        };

        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_rx.changed() => {}
            }
        }
        // Liveness at invocation time, not only at scheduling time.
        if !shared.alive(epoch) {
            return;
        }

        // The hooks lock is held across the await: a stopped-and-restarted
        // schedule's new driver cannot invoke work while an old invocation is
        // still in flight.
        let result = {
            let mut hooks = shared.hooks.lock().await;
            let work_fut = (hooks.work)(counter);
            work_fut.await
        };

        // A result that lands after stop() is discarded.
        if !shared.alive(epoch) {
            return;
        }

        match result {
            Ok(Tick::Continue) => {
                tracing::trace!(counter, "tick complete");
            }
            Ok(Tick::Stop) => {
                tracing::debug!(counter, "work signaled completion");
                shared.finish(epoch, Completion::Finished);
                return;
            }
            Err(error) => {
                let recovery = {
                    let mut hooks = shared.hooks.lock().await;
                    let hook_fut = match hooks.on_error.as_mut() {
                        Some(hook) => hook(error),
                        None => {
                            drop(hooks);
                            tracing::error!(counter, "tick failed with no error hook; stopping");
                            shared.finish(epoch, Completion::Failed(error));
                            return;
                        }
                    };
                    hook_fut.await
                };

                if !shared.alive(epoch) {
                    return;
                }
                match recovery {
                    Ok(Recovery::Resume) => {
                        tracing::trace!(counter, "error recovered; resuming");
                    }
                    Ok(Recovery::Halt) => {
                        tracing::debug!(counter, "error hook declined to resume; stopping");
                        shared.finish(epoch, Completion::Finished);
                        return;
                    }
                    Err(hook_error) => {
                        tracing::error!(counter, "error hook failed; stopping");
                        shared.finish(epoch, Completion::Failed(hook_error));
                        return;
                    }
                }
            }
        }
    }
}

/// Builder for [`Schedule`].
///
/// A work function and a period are required; the start mode defaults to
/// [`StartMode::Immediate`] and the error hook is optional.
///
/// ```rust
/// use cadence::{Recovery, Schedule, StartMode, Tick};
/// use std::time::Duration;
///
/// let schedule = Schedule::builder()
///     .work_sync(|_counter| Ok::<_, String>(Tick::Continue))
///     .period(Duration::from_secs(1))
///     .start_mode(StartMode::Delayed)
///     .on_error_sync(|err: String| {
///         Ok(if err.contains("transient") { Recovery::Resume } else { Recovery::Halt })
///     })
///     .build()
///     .unwrap();
/// # let _ = schedule;
/// ```
pub struct ScheduleBuilder<E> {
    work: Option<WorkFn<E>>,
    period: Option<Period>,
    mode: StartMode,
    on_error: Option<ErrorFn<E>>,
}

impl<E> fmt::Debug for ScheduleBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleBuilder")
            .field("work", &self.work.is_some())
            .field("period", &self.period)
            .field("mode", &self.mode)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl<E: Send + 'static> ScheduleBuilder<E> {
    /// The unit of work, invoked once per tick with the 1-based counter.
    pub fn work<F, Fut>(mut self, mut f: F) -> Self
    where
        F: FnMut(u32) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Tick, E>> + Send + 'static,
    {
        self.work = Some(Box::new(move |counter| f(counter).boxed()));
        self
    }

    /// Synchronous work; wrapped in an immediately-ready future.
    pub fn work_sync<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(u32) -> Result<Tick, E> + Send + 'static,
    {
        self.work = Some(Box::new(move |counter| future::ready(f(counter)).boxed()));
        self
    }

    /// The delay policy between ticks: a fixed [`Duration`] or a
    /// [`DelayFn`](crate::DelayFn) from [`duration`](crate::duration).
    pub fn period(mut self, period: impl Into<Period>) -> Self {
        self.period = Some(period.into());
        self
    }

    /// Whether the first tick fires immediately or after one full delay.
    pub fn start_mode(mut self, mode: StartMode) -> Self {
        self.mode = mode;
        self
    }

    /// Hook invoked with a failed tick's error. [`Recovery::Resume`] re-arms
    /// the next tick; [`Recovery::Halt`] ends the run as handled; the hook's
    /// own `Err` ends the run as failed, superseding the original error.
    pub fn on_error<F, Fut>(mut self, mut f: F) -> Self
    where
        F: FnMut(E) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Recovery, E>> + Send + 'static,
    {
        self.on_error = Some(Box::new(move |error| f(error).boxed()));
        self
    }

    /// Synchronous error hook; wrapped in an immediately-ready future.
    pub fn on_error_sync<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(E) -> Result<Recovery, E> + Send + 'static,
    {
        self.on_error = Some(Box::new(move |error| future::ready(f(error)).boxed()));
        self
    }

    /// Finalize the schedule.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::MissingWork`] or [`ScheduleError::MissingPeriod`]
    /// when a required piece is absent.
    pub fn build(self) -> Result<Schedule<E>, ScheduleError> {
        let work = self.work.ok_or(ScheduleError::MissingWork)?;
        let period = self.period.ok_or(ScheduleError::MissingPeriod)?;
        Ok(Schedule {
            shared: Arc::new(Shared {
                hooks: AsyncMutex::new(Hooks {
                    work,
                    period,
                    on_error: self.on_error,
                }),
                state: Mutex::new(State {
                    running: false,
                    epoch: 0,
                    stop: None,
                    completion: None,
                }),
                done: Notify::new(),
                mode: self.mode,
            }),
        })
    }
}
