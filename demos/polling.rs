//! Polling Patterns
//!
//! Demonstrates the combinator helpers for the common "wait for something"
//! shapes:
//! - `poll` for a boolean readiness check
//! - `until` for a value-producing probe
//! - `times` for a fixed number of ticks
//! - `pipeline` for staged, value-threading work

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cadence::{pipeline, poll, step, times, until};

async fn example_poll() {
    println!("\n=== Example 1: poll ===");

    let checks = Arc::new(AtomicU32::new(0));
    poll(
        {
            let checks = checks.clone();
            move || {
                let n = checks.fetch_add(1, Ordering::SeqCst) + 1;
                println!("  readiness check #{n}");
                async move { Ok::<_, String>(n >= 3) }
            }
        },
        Duration::from_millis(50),
    )
    .await
    .expect("predicate never fails");
    println!("  ready after {} checks", checks.load(Ordering::SeqCst));
}

async fn example_until() {
    println!("\n=== Example 2: until ===");

    let mut probes = vec![None, None, Some("payload")].into_iter();
    let value = until(
        move || {
            let next = probes.next().flatten();
            println!("  probe -> {next:?}");
            async move { Ok::<_, String>(next) }
        },
        Duration::from_millis(50),
    )
    .await
    .expect("probe never fails");
    println!("  got: {value}");
}

async fn example_times() {
    println!("\n=== Example 3: times ===");

    times(
        |counter| {
            println!("  tick {counter}");
            async { Ok::<_, String>(()) }
        },
        4,
        Duration::from_millis(25),
    )
    .await
    .expect("tick never fails");
}

async fn example_pipeline() {
    println!("\n=== Example 4: pipeline ===");

    let result = pipeline(
        vec![
            step(|_: Option<i64>| async { Ok::<_, String>(7) }),
            step(|x: Option<i64>| async move { Ok(x.unwrap_or(0) * 6) }),
        ],
        Duration::from_millis(25),
    )
    .await
    .expect("steps never fail");
    println!("  pipeline produced {result:?}");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    example_poll().await;
    example_until().await;
    example_times().await;
    example_pipeline().await;
}
