//! Duration strategies: counter-driven delay functions for spacing ticks.
//!
//! Each factory here takes its configuration up front and returns a
//! [`DelayFn`] - a boxed `counter -> delay` function the schedule evaluates
//! once per tick. Counters are the schedule's 1-based tick numbers, but every
//! strategy is total over `u32` and can be evaluated at any counter.
//!
//! All strategies are pure except [`decorrelated_jitter`], which carries the
//! previous delay between calls. A [`DelayFn`] is not `Clone`, so a stateful
//! strategy cannot accidentally be shared between two schedules: construct
//! one per schedule.
//!
//! # Quick Start
//!
//! ```rust
//! use cadence::duration;
//! use std::time::Duration;
//!
//! let mut delay = duration::exponential(
//!     Duration::from_millis(100),
//!     Some(Duration::from_millis(500)),
//! );
//!
//! assert_eq!(delay(0), Duration::from_millis(100));
//! assert_eq!(delay(1), Duration::from_millis(200));
//! assert_eq!(delay(2), Duration::from_millis(400));
//! assert_eq!(delay(3), Duration::from_millis(500)); // capped
//! ```

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// A counter-driven delay function.
///
/// The argument is the schedule's 1-based tick counter. Boxed and `FnMut` so
/// that stateful strategies ([`decorrelated_jitter`]) fit the same shape as
/// the pure ones.
pub type DelayFn = Box<dyn FnMut(u32) -> Duration + Send>;

/// The delay policy of a schedule: a fixed pause or a per-tick computation.
///
/// Anything accepting `impl Into<Period>` takes either a bare
/// [`Duration`] or a [`DelayFn`] built by this module's factories.
pub enum Period {
    /// The same delay before every tick.
    Fixed(Duration),
    /// A delay computed from the tick counter.
    PerTick(DelayFn),
}

impl Period {
    /// A fixed delay before every tick.
    pub fn fixed(delay: Duration) -> Self {
        Period::Fixed(delay)
    }

    /// A delay computed per tick from the 1-based counter.
    ///
    /// This is the escape hatch for policies the stock strategies don't
    /// cover, e.g. a decreasing ramp:
    ///
    /// ```rust
    /// use cadence::Period;
    /// use std::time::Duration;
    ///
    /// let start = Duration::from_secs(10);
    /// let period = Period::per_tick(move |counter| {
    ///     start.saturating_sub(Duration::from_secs(u64::from(counter)))
    /// });
    /// # let _ = period;
    /// ```
    pub fn per_tick(f: impl FnMut(u32) -> Duration + Send + 'static) -> Self {
        Period::PerTick(Box::new(f))
    }

    /// Evaluate the delay for the given tick counter.
    pub(crate) fn delay(&mut self, counter: u32) -> Duration {
        match self {
            Period::Fixed(d) => *d,
            Period::PerTick(f) => f(counter),
        }
    }
}

impl From<Duration> for Period {
    fn from(delay: Duration) -> Self {
        Period::Fixed(delay)
    }
}

impl From<DelayFn> for Period {
    fn from(f: DelayFn) -> Self {
        Period::PerTick(f)
    }
}

impl fmt::Debug for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Period::PerTick(_) => f.debug_tuple("PerTick").field(&"..").finish(),
        }
    }
}

/// Always the same delay, regardless of the counter.
pub fn constant(value: Duration) -> DelayFn {
    Box::new(move |_| value)
}

/// Linearly growing delay: `initial + increment * counter`.
///
/// Arithmetic saturates rather than overflowing. A decreasing ramp is not
/// representable with an unsigned increment; use [`Period::per_tick`] with a
/// custom closure for that.
///
/// ```rust
/// use cadence::duration;
/// use std::time::Duration;
///
/// let mut delay = duration::linear(Duration::from_millis(100), Duration::from_millis(50));
/// assert_eq!(delay(1), Duration::from_millis(150));
/// assert_eq!(delay(2), Duration::from_millis(200));
/// ```
pub fn linear(initial: Duration, increment: Duration) -> DelayFn {
    Box::new(move |counter| initial.saturating_add(increment.saturating_mul(counter)))
}

/// Exponentially growing delay: `initial * 2^counter`, clamped to `max`.
///
/// ```rust
/// use cadence::duration;
/// use std::time::Duration;
///
/// let mut delay = duration::exponential(Duration::from_millis(100), None);
/// assert_eq!(delay(0), Duration::from_millis(100));
/// assert_eq!(delay(3), Duration::from_millis(800));
/// ```
pub fn exponential(initial: Duration, max: Option<Duration>) -> DelayFn {
    Box::new(move |counter| {
        let raw = initial.saturating_mul(2u32.saturating_pow(counter));
        match max {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    })
}

/// Fibonacci-style growth seeded with `initial` at indices 0 and 1.
///
/// Computed iteratively on each call; no state is carried between calls.
///
/// ```rust
/// use cadence::duration;
/// use std::time::Duration;
///
/// let mut delay = duration::fibonacci(Duration::from_millis(100));
/// assert_eq!(delay(0), Duration::from_millis(100));
/// assert_eq!(delay(1), Duration::from_millis(100));
/// assert_eq!(delay(2), Duration::from_millis(200));
/// assert_eq!(delay(3), Duration::from_millis(300));
/// assert_eq!(delay(4), Duration::from_millis(500));
/// ```
pub fn fibonacci(initial: Duration) -> DelayFn {
    Box::new(move |counter| {
        let (mut a, mut b) = (initial, initial);
        for _ in 0..counter {
            let next = a.saturating_add(b);
            a = b;
            b = next;
        }
        a
    })
}

/// Exponential backoff with proportional random noise.
///
/// Computes the [`exponential`] delay (clamped to `max`), then adds uniform
/// noise in `[-factor * base, +factor * base]`, floored at zero. A `factor`
/// of `0.1` (±10%) is the conventional choice.
///
/// ```rust
/// use cadence::duration;
/// use std::time::Duration;
///
/// let mut delay = duration::jittered(Duration::from_millis(100), None, 0.1);
/// let d = delay(0);
/// assert!(d >= Duration::from_millis(90) && d <= Duration::from_millis(110));
/// ```
pub fn jittered(initial: Duration, max: Option<Duration>, factor: f64) -> DelayFn {
    let mut base = exponential(initial, max);
    Box::new(move |counter| {
        let base = base(counter);
        let base_secs = base.as_secs_f64();
        let spread = base_secs * factor;
        if spread <= 0.0 {
            return base;
        }
        let noisy = base_secs + rand::rng().random_range(-spread..=spread);
        Duration::from_secs_f64(noisy.max(0.0))
    })
}

/// Decorrelated jitter: each delay drawn uniformly from `[0, previous * 3]`,
/// clamped to `max`.
///
/// Stateful - the drawn delay is remembered as `previous` for the next call,
/// seeded with `initial`. A single instance must drive a single schedule;
/// construct one per schedule (the type system enforces this, since
/// [`DelayFn`] cannot be cloned).
///
/// ```rust
/// use cadence::duration;
/// use std::time::Duration;
///
/// let max = Duration::from_secs(2);
/// let mut delay = duration::decorrelated_jitter(Duration::from_millis(100), max);
/// for counter in 0..20 {
///     assert!(delay(counter) <= max);
/// }
/// ```
pub fn decorrelated_jitter(initial: Duration, max: Duration) -> DelayFn {
    let mut previous = initial;
    Box::new(move |_| {
        let upper = previous.saturating_mul(3);
        let drawn = if upper.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(rand::rng().random_range(0.0..=upper.as_secs_f64()))
        };
        previous = drawn.min(max);
        previous
    })
}

/// Stepped delay: the duration of the greatest threshold ≤ counter.
///
/// The pairs may be listed in any order. A counter below every threshold
/// falls back to the **first-listed** pair's duration - insertion order is
/// significant only for that fallback.
///
/// # Panics
///
/// Panics if `pairs` is empty; a step policy with no steps is a
/// configuration bug, caught at construction.
///
/// ```rust
/// use cadence::duration;
/// use std::time::Duration;
///
/// let mut delay = duration::steps(vec![
///     (0, Duration::from_millis(100)),
///     (5, Duration::from_millis(500)),
///     (10, Duration::from_millis(1000)),
/// ]);
///
/// assert_eq!(delay(4), Duration::from_millis(100));
/// assert_eq!(delay(5), Duration::from_millis(500));
/// assert_eq!(delay(20), Duration::from_millis(1000));
/// ```
pub fn steps(pairs: Vec<(u32, Duration)>) -> DelayFn {
    assert!(
        !pairs.is_empty(),
        "steps requires at least one (threshold, duration) pair"
    );
    Box::new(move |counter| {
        pairs
            .iter()
            .filter(|(threshold, _)| *threshold <= counter)
            .max_by_key(|(threshold, _)| *threshold)
            .map(|(_, duration)| *duration)
            .unwrap_or(pairs[0].1)
    })
}
