use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::duration::Period;
use crate::schedule::{Completion, Schedule, StartMode, Tick};

use super::{built, slot_lock, start_fresh, RetryError, Slot};

/// Repeat a predicate until it yields a value, with an attempt budget.
///
/// Like [`until`](crate::until), but the predicate is invoked at most
/// `attempts` times; once the budget is exhausted without a value, the next
/// tick rejects with [`RetryError::AttemptLimitExceeded`]. A predicate error
/// rejects immediately with [`RetryError::Operation`]. Uses the default
/// start mode; see [`retry_with`] for an explicit one.
///
/// Pair with a [`duration`](crate::duration) backoff strategy to space out
/// the attempts.
///
/// # Examples
///
/// ```rust
/// use cadence::{retry, duration};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let mut attempts = vec![None, Some(42)].into_iter();
///
/// let value = retry(
///     move || {
///         let next = attempts.next().flatten();
///         async move { Ok::<_, String>(next) }
///     },
///     5,
///     duration::exponential(Duration::from_millis(1), Some(Duration::from_millis(4))),
/// )
/// .await
/// .unwrap();
///
/// assert_eq!(value, 42);
/// # });
/// ```
pub async fn retry<P, Fut, T, E>(
    predicate: P,
    attempts: u32,
    period: impl Into<Period>,
) -> Result<T, RetryError<E>>
where
    P: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    retry_with(predicate, attempts, period, StartMode::default()).await
}

/// [`retry`] with an explicit [`StartMode`].
pub async fn retry_with<P, Fut, T, E>(
    mut predicate: P,
    attempts: u32,
    period: impl Into<Period>,
    mode: StartMode,
) -> Result<T, RetryError<E>>
where
    P: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let slot: Slot<T> = Arc::new(Mutex::new(None));

    let schedule = built(Schedule::builder().period(period).start_mode(mode).work({
        let slot = slot.clone();
        move |counter| {
            // The budget check runs before the predicate, so exactly
            // `attempts` invocations occur.
            let outcome = if counter > attempts {
                None
            } else {
                Some(predicate())
            };
            let slot = slot.clone();
            async move {
                let Some(outcome) = outcome else {
                    return Err(RetryError::AttemptLimitExceeded { attempts });
                };
                match outcome.await {
                    Ok(Some(value)) => {
                        *slot_lock(&slot) = Some(value);
                        Ok(Tick::Stop)
                    }
                    Ok(None) => Ok(Tick::Continue),
                    Err(error) => Err(RetryError::Operation(error)),
                }
            }
        }
    }));

    start_fresh(&schedule);
    match schedule.done().await {
        Completion::Failed(error) => Err(error),
        _ => match slot_lock(&slot).take() {
            Some(value) => Ok(value),
            None => unreachable!("run settled without a recorded value"),
        },
    }
}
