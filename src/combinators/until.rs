use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::duration::Period;
use crate::schedule::{Completion, Schedule, StartMode, Tick};

use super::{built, slot_lock, start_fresh, Slot};

/// Repeat a predicate until it yields a value.
///
/// `Ok(None)` is the "no value yet" sentinel and continues; the first
/// `Ok(Some(value))` resolves with that value; `Err` rejects. Uses the
/// default start mode; see [`until_with`] for an explicit one.
///
/// # Examples
///
/// ```rust
/// use cadence::until;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let mut responses = vec![None, None, Some("ready")].into_iter();
///
/// let value = until(
///     move || {
///         let next = responses.next().flatten();
///         async move { Ok::<_, String>(next) }
///     },
///     Duration::from_millis(1),
/// )
/// .await
/// .unwrap();
///
/// assert_eq!(value, "ready");
/// # });
/// ```
pub async fn until<P, Fut, T, E>(predicate: P, period: impl Into<Period>) -> Result<T, E>
where
    P: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    until_with(predicate, period, StartMode::default()).await
}

/// [`until`] with an explicit [`StartMode`].
pub async fn until_with<P, Fut, T, E>(
    mut predicate: P,
    period: impl Into<Period>,
    mode: StartMode,
) -> Result<T, E>
where
    P: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let slot: Slot<T> = Arc::new(Mutex::new(None));

    let schedule = built(Schedule::builder().period(period).start_mode(mode).work({
        let slot = slot.clone();
        move |_| {
            let outcome = predicate();
            let slot = slot.clone();
            async move {
                match outcome.await? {
                    Some(value) => {
                        *slot_lock(&slot) = Some(value);
                        Ok(Tick::Stop)
                    }
                    None => Ok(Tick::Continue),
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
