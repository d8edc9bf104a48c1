//! Engine tests: lifecycle transitions, result interpretation, error
//! recovery, and the serialization guarantee under paused time.

use super::*;
use crate::duration::Period;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// A schedule that ticks forever, for lifecycle tests.
fn idle_schedule() -> Schedule<String> {
    Schedule::builder()
        .work_sync(|_| Ok(Tick::Continue))
        .period(ms(10))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_start_twice_errors() {
    let schedule = idle_schedule();
    schedule.start().unwrap();
    assert_eq!(schedule.start().unwrap_err(), ScheduleError::AlreadyRunning);
    schedule.stop().unwrap();
}

#[tokio::test]
async fn test_stop_before_start_errors() {
    let schedule = idle_schedule();
    assert_eq!(schedule.stop().unwrap_err(), ScheduleError::NotRunning);
}

#[tokio::test]
async fn test_stop_twice_errors() {
    let schedule = idle_schedule();
    schedule.start().unwrap();
    schedule.stop().unwrap();
    assert_eq!(schedule.stop().unwrap_err(), ScheduleError::NotRunning);
}

#[tokio::test]
async fn test_is_running_reflects_lifecycle() {
    let schedule = idle_schedule();
    assert!(!schedule.is_running());
    schedule.start().unwrap();
    assert!(schedule.is_running());
    schedule.stop().unwrap();
    assert!(!schedule.is_running());
}

#[tokio::test]
async fn test_start_and_stop_are_chainable() {
    let schedule = idle_schedule();
    assert!(schedule.start().unwrap().is_running());
    assert!(!schedule.stop().unwrap().is_running());
}

#[tokio::test(start_paused = true)]
async fn test_auto_stop_on_nth_tick() {
    let counters = Arc::new(std::sync::Mutex::new(Vec::new()));

    let schedule = Schedule::builder()
        .work_sync({
            let counters = counters.clone();
            move |counter| {
                counters.lock().unwrap().push(counter);
                Ok::<_, String>(if counter == 3 { Tick::Stop } else { Tick::Continue })
            }
        })
        .period(ms(100))
        .build()
        .unwrap();

    schedule.start().unwrap();
    assert_eq!(schedule.done().await, Completion::Finished);
    assert!(!schedule.is_running());
    assert_eq!(*counters.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_error_without_hook_stops_and_surfaces() {
    let calls = Arc::new(AtomicU32::new(0));

    let schedule = Schedule::builder()
        .work_sync({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Tick, _>("boom".to_string())
            }
        })
        .period(ms(100))
        .build()
        .unwrap();

    schedule.start().unwrap();
    assert_eq!(schedule.done().await, Completion::Failed("boom".to_string()));
    assert!(!schedule.is_running());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hook_resume_recovers_repeatedly() {
    let work_calls = Arc::new(AtomicU32::new(0));
    let hook_calls = Arc::new(AtomicU32::new(0));

    let schedule = Schedule::builder()
        .work_sync({
            let work_calls = work_calls.clone();
            move |counter| {
                work_calls.fetch_add(1, Ordering::SeqCst);
                if counter <= 3 {
                    Err(format!("failure {counter}"))
                } else {
                    Ok(Tick::Stop)
                }
            }
        })
        .period(ms(50))
        .on_error_sync({
            let hook_calls = hook_calls.clone();
            move |_| {
                hook_calls.fetch_add(1, Ordering::SeqCst);
                Ok(Recovery::Resume)
            }
        })
        .build()
        .unwrap();

    schedule.start().unwrap();
    assert_eq!(schedule.done().await, Completion::Finished);
    // Three consecutive recoveries before the fourth tick completed the run.
    assert_eq!(hook_calls.load(Ordering::SeqCst), 3);
    assert_eq!(work_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_hook_halt_stops_after_one_error() {
    let work_calls = Arc::new(AtomicU32::new(0));

    let schedule = Schedule::builder()
        .work_sync({
            let work_calls = work_calls.clone();
            move |_| {
                work_calls.fetch_add(1, Ordering::SeqCst);
                Err::<Tick, _>("boom".to_string())
            }
        })
        .period(ms(50))
        .on_error_sync(|_| Ok(Recovery::Halt))
        .build()
        .unwrap();

    schedule.start().unwrap();
    // Halting counts as the run ending on its own, not as a failure.
    assert_eq!(schedule.done().await, Completion::Finished);
    assert_eq!(work_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hook_error_supersedes_original() {
    let schedule = Schedule::builder()
        .work_sync(|_| Err::<Tick, _>("original".to_string()))
        .period(ms(50))
        .on_error_sync(|_| Err("from the hook".to_string()))
        .build()
        .unwrap();

    schedule.start().unwrap();
    assert_eq!(
        schedule.done().await,
        Completion::Failed("from the hook".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_async_hook_is_awaited() {
    let schedule = Schedule::builder()
        .work_sync(|counter| {
            if counter == 1 {
                Err::<Tick, _>("transient".to_string())
            } else {
                Ok(Tick::Stop)
            }
        })
        .period(ms(50))
        .on_error(|_| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(Recovery::Resume)
        })
        .build()
        .unwrap();

    schedule.start().unwrap();
    assert_eq!(schedule.done().await, Completion::Finished);
}

#[tokio::test(start_paused = true)]
async fn test_async_work_serializes_ticks() {
    // 1000ms period, 1000ms of in-flight work: the next tick's timer must
    // not be armed until the work future settles, so invocations start
    // (at least) 2000ms apart.
    let starts = Arc::new(std::sync::Mutex::new(Vec::new()));

    let schedule = Schedule::builder()
        .work({
            let starts = starts.clone();
            move |counter| {
                let starts = starts.clone();
                async move {
                    starts.lock().unwrap().push(Instant::now());
                    tokio::time::sleep(Duration::from_millis(1000)).await;
                    Ok::<_, String>(if counter == 3 { Tick::Stop } else { Tick::Continue })
                }
            }
        })
        .period(ms(1000))
        .build()
        .unwrap();

    schedule.start().unwrap();
    assert_eq!(schedule.done().await, Completion::Finished);

    let starts = starts.lock().unwrap();
    assert_eq!(starts.len(), 3);
    assert!(starts[1] - starts[0] >= ms(2000));
    assert!(starts[2] - starts[1] >= ms(2000));
}

#[tokio::test(start_paused = true)]
async fn test_stop_makes_pending_tick_inert() {
    let calls = Arc::new(AtomicU32::new(0));

    let schedule = Schedule::builder()
        .work_sync({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Tick::Continue)
            }
        })
        .period(ms(1000))
        .start_mode(StartMode::Delayed)
        .build()
        .unwrap();

    schedule.start().unwrap();
    // Stop while the first tick is still sleeping out its delay.
    schedule.stop().unwrap();
    assert_eq!(schedule.done().await, Completion::Stopped);

    tokio::time::sleep(ms(5000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_result_discarded_after_stop() {
    let calls = Arc::new(AtomicU32::new(0));

    let schedule = Schedule::builder()
        .work({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Err::<Tick, _>("late failure".to_string())
                }
            }
        })
        .period(ms(1000))
        .build()
        .unwrap();

    schedule.start().unwrap();
    tokio::task::yield_now().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Stop with the first invocation still in flight; its error must be
    // discarded, never resurrecting the schedule or overwriting the outcome.
    schedule.stop().unwrap();
    assert_eq!(schedule.done().await, Completion::Stopped);

    tokio::time::sleep(ms(2000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!schedule.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_drop_disarms_running_schedule() {
    let calls = Arc::new(AtomicU32::new(0));

    let schedule = Schedule::builder()
        .work_sync({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Tick::Continue)
            }
        })
        .period(ms(100))
        .build()
        .unwrap();

    schedule.start().unwrap();
    tokio::time::sleep(ms(350)).await;
    let before = calls.load(Ordering::SeqCst);
    assert!(before >= 3);

    // Dropping the handle must end the driver task, not orphan it.
    drop(schedule);
    tokio::time::sleep(ms(2000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), before);
}

#[tokio::test(start_paused = true)]
async fn test_restart_never_overlaps_inflight_work() {
    let active = Arc::new(AtomicU32::new(0));
    let overlapped = Arc::new(AtomicBool::new(false));

    let schedule = Schedule::builder()
        .work({
            let active = active.clone();
            let overlapped = overlapped.clone();
            move |_| {
                let active = active.clone();
                let overlapped = overlapped.clone();
                async move {
                    if active.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlapped.store(true, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(Tick::Stop)
                }
            }
        })
        .period(ms(100))
        .build()
        .unwrap();

    schedule.start().unwrap();
    tokio::task::yield_now().await;
    assert_eq!(active.load(Ordering::SeqCst), 1);

    // Restart while the first invocation is still sleeping; the new run's
    // first tick must wait for it rather than overlap it.
    schedule.stop().unwrap();
    schedule.start().unwrap();
    assert_eq!(schedule.done().await, Completion::Finished);

    assert!(!overlapped.load(Ordering::SeqCst));
    assert_eq!(active.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_resets_counter() {
    let counters = Arc::new(std::sync::Mutex::new(Vec::new()));

    let schedule = Schedule::builder()
        .work_sync({
            let counters = counters.clone();
            move |counter| {
                counters.lock().unwrap().push(counter);
                Ok::<_, String>(if counter == 2 { Tick::Stop } else { Tick::Continue })
            }
        })
        .period(ms(10))
        .build()
        .unwrap();

    schedule.start().unwrap();
    assert_eq!(schedule.done().await, Completion::Finished);
    schedule.start().unwrap();
    assert_eq!(schedule.done().await, Completion::Finished);

    assert_eq!(*counters.lock().unwrap(), vec![1, 2, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_first_tick_has_zero_delay() {
    let epoch = Instant::now();
    let first = Arc::new(std::sync::Mutex::new(None));

    let schedule = Schedule::builder()
        .work_sync({
            let first = first.clone();
            move |_| {
                first.lock().unwrap().get_or_insert(Instant::now());
                Ok::<_, String>(Tick::Stop)
            }
        })
        .period(ms(500))
        .build()
        .unwrap();

    schedule.start().unwrap();
    schedule.done().await;
    assert_eq!(first.lock().unwrap().unwrap() - epoch, ms(0));
}

#[tokio::test(start_paused = true)]
async fn test_delayed_first_tick_waits_full_period() {
    let epoch = Instant::now();
    let first = Arc::new(std::sync::Mutex::new(None));

    let schedule = Schedule::builder()
        .work_sync({
            let first = first.clone();
            move |_| {
                first.lock().unwrap().get_or_insert(Instant::now());
                Ok::<_, String>(Tick::Stop)
            }
        })
        .period(ms(500))
        .start_mode(StartMode::Delayed)
        .build()
        .unwrap();

    schedule.start().unwrap();
    schedule.done().await;
    assert!(first.lock().unwrap().unwrap() - epoch >= ms(500));
}

#[tokio::test(start_paused = true)]
async fn test_period_evaluated_at_tick_counters() {
    // Under Immediate mode the first tick is free; the policy is consulted
    // from the second tick on, with the tick's own counter.
    let evaluated = Arc::new(std::sync::Mutex::new(Vec::new()));

    let schedule = Schedule::builder()
        .work_sync(|counter| {
            Ok::<_, String>(if counter == 3 { Tick::Stop } else { Tick::Continue })
        })
        .period(Period::per_tick({
            let evaluated = evaluated.clone();
            move |counter| {
                evaluated.lock().unwrap().push(counter);
                ms(10)
            }
        }))
        .build()
        .unwrap();

    schedule.start().unwrap();
    schedule.done().await;
    assert_eq!(*evaluated.lock().unwrap(), vec![2, 3]);
}

#[test]
fn test_builder_requires_work() {
    let result = Schedule::<String>::builder().period(ms(10)).build();
    assert_eq!(result.unwrap_err(), ScheduleError::MissingWork);
}

#[test]
fn test_builder_requires_period() {
    let result = Schedule::<String>::builder()
        .work_sync(|_| Ok(Tick::Continue))
        .build();
    assert_eq!(result.unwrap_err(), ScheduleError::MissingPeriod);
}

#[test]
fn test_debug_representations() {
    let schedule = Schedule::<String>::builder()
        .work_sync(|_| Ok(Tick::Continue))
        .period(ms(10))
        .build()
        .unwrap();
    assert!(format!("{schedule:?}").contains("running: false"));

    let builder = Schedule::<String>::builder().period(ms(10));
    let debug = format!("{builder:?}");
    assert!(debug.contains("work: false"));
    assert!(debug.contains("Immediate"));
}
