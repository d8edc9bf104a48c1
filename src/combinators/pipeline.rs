use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::duration::Period;
use crate::schedule::{Completion, Schedule, StartMode, Tick};

use super::{built, slot_lock, start_fresh, Slot};

/// One stage of a [`pipeline`]: receives the previous stage's output (`None`
/// for the first stage) and produces the next value.
///
/// Build one from a plain closure with [`step`].
pub type PipelineStep<T, E> = Box<dyn FnMut(Option<T>) -> BoxFuture<'static, Result<T, E>> + Send>;

/// Box a closure into a [`PipelineStep`].
pub fn step<F, Fut, T, E>(mut f: F) -> PipelineStep<T, E>
where
    F: FnMut(Option<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Box::new(move |input| f(input).boxed())
}

/// Run steps sequentially, one per tick, each fed the previous step's output.
///
/// The first step receives `None`; the run resolves with `Some` of the last
/// step's output, or immediately with `None` for an empty step list. A step
/// error rejects the whole pipeline. Uses the default start mode; see
/// [`pipeline_with`] for an explicit one.
///
/// # Examples
///
/// ```rust
/// use cadence::{pipeline, step};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let stages = vec![
///     step(|_: Option<i32>| async { Ok::<_, String>(1) }),
///     step(|x: Option<i32>| async move { Ok(x.unwrap_or(0) + 10) }),
///     step(|x: Option<i32>| async move { Ok(x.unwrap_or(0) * 2) }),
/// ];
///
/// let result = pipeline(stages, Duration::from_millis(1)).await;
/// assert_eq!(result, Ok(Some(22)));
/// # });
/// ```
pub async fn pipeline<T, E>(
    steps: Vec<PipelineStep<T, E>>,
    period: impl Into<Period>,
) -> Result<Option<T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pipeline_with(steps, period, StartMode::default()).await
}

/// [`pipeline`] with an explicit [`StartMode`].
pub async fn pipeline_with<T, E>(
    steps: Vec<PipelineStep<T, E>>,
    period: impl Into<Period>,
    mode: StartMode,
) -> Result<Option<T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    if steps.is_empty() {
        return Ok(None);
    }

    let mut queue = VecDeque::from(steps);
    let acc: Slot<T> = Arc::new(Mutex::new(None));

    let schedule = built(Schedule::builder().period(period).start_mode(mode).work({
        let acc = acc.clone();
        move |_| {
            let next = queue.pop_front();
            let last = queue.is_empty();
            let acc = acc.clone();
            async move {
                let Some(mut step) = next else {
                    // The queue drains exactly when the run auto-stops.
                    return Ok(Tick::Stop);
                };
                let input = slot_lock(&acc).take();
                let value = step(input).await?;
                *slot_lock(&acc) = Some(value);
                Ok(if last { Tick::Stop } else { Tick::Continue })
            }
        }
    }));

    start_fresh(&schedule);
    match schedule.done().await {
        Completion::Failed(error) => Err(error),
        _ => Ok(slot_lock(&acc).take()),
    }
}
