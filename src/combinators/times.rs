use std::future::Future;

use crate::duration::Period;
use crate::schedule::{Completion, Schedule, StartMode, Tick};

use super::{built, start_fresh};

/// Run a predicate a fixed number of times, once per tick.
///
/// The predicate receives the tick counter, `1..=amount` in order. An
/// `amount` of zero resolves immediately without scheduling anything. Uses
/// the default start mode; see [`times_with`] for an explicit one.
///
/// # Examples
///
/// ```rust
/// use cadence::times;
/// use std::sync::Mutex;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// times(
///     {
///         let seen = seen.clone();
///         move |counter| {
///             seen.lock().unwrap().push(counter);
///             async { Ok::<_, String>(()) }
///         }
///     },
///     5,
///     Duration::from_millis(1),
/// )
/// .await
/// .unwrap();
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
/// # });
/// ```
pub async fn times<P, Fut, E>(predicate: P, amount: u32, period: impl Into<Period>) -> Result<(), E>
where
    P: FnMut(u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    times_with(predicate, amount, period, StartMode::default()).await
}

/// [`times`] with an explicit [`StartMode`].
pub async fn times_with<P, Fut, E>(
    mut predicate: P,
    amount: u32,
    period: impl Into<Period>,
    mode: StartMode,
) -> Result<(), E>
where
    P: FnMut(u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    if amount == 0 {
        return Ok(());
    }

    let schedule = built(
        Schedule::builder()
            .period(period)
            .start_mode(mode)
            .work(move |counter| {
                let outcome = predicate(counter);
                async move {
                    outcome.await?;
                    Ok(if counter >= amount {
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
