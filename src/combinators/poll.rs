use std::future::Future;

use crate::duration::Period;
use crate::schedule::{Completion, Schedule, StartMode, Tick};

use super::{built, start_fresh};

/// Repeat a predicate until it reports `true`.
///
/// The predicate runs once per tick; `Ok(false)` continues, `Ok(true)`
/// resolves, `Err` rejects. Uses the default start mode; see [`poll_with`]
/// for an explicit one.
///
/// # Examples
///
/// ```rust
/// use cadence::poll;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let checks = Arc::new(AtomicU32::new(0));
///
/// poll(
///     {
///         let checks = checks.clone();
///         move || {
///             let n = checks.fetch_add(1, Ordering::SeqCst) + 1;
///             async move { Ok::<_, String>(n >= 2) }
///         }
///     },
///     Duration::from_millis(1),
/// )
/// .await
/// .unwrap();
///
/// assert_eq!(checks.load(Ordering::SeqCst), 2);
/// # });
/// ```
pub async fn poll<P, Fut, E>(predicate: P, period: impl Into<Period>) -> Result<(), E>
where
    P: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Send + 'static,
{
    poll_with(predicate, period, StartMode::default()).await
}

/// [`poll`] with an explicit [`StartMode`].
pub async fn poll_with<P, Fut, E>(
    mut predicate: P,
    period: impl Into<Period>,
    mode: StartMode,
) -> Result<(), E>
where
    P: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Send + 'static,
{
    let schedule = built(
        Schedule::builder()
            .period(period)
            .start_mode(mode)
            .work(move |_| {
                let outcome = predicate();
                async move {
                    Ok(if outcome.await? {
                        Tick::Stop
                    } else {
                        Tick::Continue
                    })
                }
            }),
    );

    start_fresh(&schedule);
    match schedule.done().await {
        Completion::Failed(error) => Err(error),
        _ => Ok(()),
    }
}
