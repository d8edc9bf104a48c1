//! Backoff Strategies
//!
//! Prints the delay tables of the stock duration strategies, then drives a
//! bare schedule with an exponential period and an error hook.

use std::time::Duration;

use cadence::{duration, Completion, Recovery, Schedule, Tick};

fn print_table(name: &str, mut delay: cadence::DelayFn) {
    let row: Vec<String> = (0..8).map(|c| format!("{:?}", delay(c))).collect();
    println!("{name:>20}: {}", row.join("  "));
}

#[tokio::main]
async fn main() {
    let ms = Duration::from_millis;

    println!("delay per counter 0..8\n");
    print_table("constant", duration::constant(ms(100)));
    print_table("linear", duration::linear(ms(100), ms(50)));
    print_table("exponential", duration::exponential(ms(100), Some(ms(2000))));
    print_table("fibonacci", duration::fibonacci(ms(100)));
    print_table("jittered", duration::jittered(ms(100), Some(ms(2000)), 0.1));
    print_table(
        "decorrelated_jitter",
        duration::decorrelated_jitter(ms(100), ms(2000)),
    );
    print_table(
        "steps",
        duration::steps(vec![(0, ms(100)), (3, ms(500)), (6, ms(1000))]),
    );

    println!("\n=== schedule with exponential backoff and a recovery hook ===");
    let schedule = Schedule::builder()
        .work_sync(|counter| {
            println!("  tick {counter}");
            if counter < 3 {
                Err(format!("transient failure on tick {counter}"))
            } else {
                Ok(Tick::Stop)
            }
        })
        .period(duration::exponential(ms(10), Some(ms(100))))
        .on_error_sync(|error: String| {
            println!("  recovering from: {error}");
            Ok(Recovery::Resume)
        })
        .build()
        .expect("work and period are set");

    schedule.start().expect("not yet running");
    match schedule.done().await {
        Completion::Finished => println!("  done"),
        other => println!("  unexpected outcome: {other:?}"),
    }
}
