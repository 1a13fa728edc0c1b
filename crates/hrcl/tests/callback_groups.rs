// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Callback group discipline under the multi-threaded executor.
//!
//! These scenarios use real `spin()` loops, which observe the process-wide
//! shutdown flag; a static lock serializes them and each one re-arms the
//! flag before starting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hrcl::{
    CallbackGroupKind, Context, EnvConfig, MultiThreadedExecutor, Node, QoS, SubscriptionOptions,
};

static PROCESS: Mutex<()> = Mutex::new(());

/// Re-arm the process shutdown flag left set by a previous scenario.
fn rearm() {
    let _ = hrcl::init_with_env(EnvConfig::default());
    assert!(hrcl::ok(), "shutdown flag should be clear before a scenario");
}

/// Two subscriptions in one group, 10 samples each, callbacks sleeping
/// `SLEEP` per sample. Returns the elapsed wall time until all 20 callbacks
/// ran.
fn run_group_scenario(kind: CallbackGroupKind) -> Duration {
    const SAMPLES: usize = 10;
    const SLEEP: Duration = Duration::from_millis(20);
    let total = 2 * SAMPLES;

    let context = Context::with_loopback(EnvConfig::default());
    let node = Node::builder("grouped")
        .context(Arc::clone(&context))
        .build()
        .expect("node creation should succeed");
    let group = node.create_callback_group(kind);

    let done = Arc::new(AtomicUsize::new(0));

    // The group holds subscriptions weakly; keep them alive here for the
    // whole scenario.
    let mut subscriptions = Vec::new();
    for topic in ["left", "right"] {
        let counter = Arc::clone(&done);
        let subscription = node
            .create_subscription_with_options(
                topic,
                QoS::default().keep_last(SAMPLES),
                move |_message: i64| {
                    std::thread::sleep(SLEEP);
                    if counter.fetch_add(1, Ordering::AcqRel) + 1 == total {
                        hrcl::shutdown();
                    }
                },
                SubscriptionOptions {
                    group: Some(Arc::clone(&group)),
                    ignore_local_publications: false,
                },
            )
            .expect("subscription creation should succeed");
        subscriptions.push(subscription);
    }

    for topic in ["left", "right"] {
        let publisher = node
            .create_publisher::<i64>(topic, QoS::default().keep_last(SAMPLES))
            .expect("publisher creation should succeed");
        for n in 0..SAMPLES as i64 {
            publisher.publish(n).expect("publish should succeed");
        }
    }

    let executor = MultiThreadedExecutor::with_number_of_threads(Arc::clone(&context), 2);
    executor.add_node(&node, false);

    let start = Instant::now();
    executor.spin().expect("spin should not fail");
    let elapsed = start.elapsed();

    assert_eq!(done.load(Ordering::Acquire), total);
    elapsed
}

#[test]
fn test_mutually_exclusive_group_serializes_callbacks() {
    let _guard = PROCESS.lock().unwrap_or_else(|e| e.into_inner());
    rearm();

    let elapsed = run_group_scenario(CallbackGroupKind::MutuallyExclusive);
    // 20 callbacks x 20ms, strictly one at a time.
    assert!(
        elapsed >= Duration::from_millis(400),
        "mutually-exclusive callbacks overlapped: {:?}",
        elapsed
    );
}

#[test]
fn test_reentrant_group_runs_callbacks_concurrently() {
    let _guard = PROCESS.lock().unwrap_or_else(|e| e.into_inner());
    rearm();

    let elapsed = run_group_scenario(CallbackGroupKind::Reentrant);
    // 20 callbacks x 20ms across 2 workers: ~200ms plus scheduling slack.
    assert!(
        elapsed >= Duration::from_millis(190),
        "twenty 20ms callbacks cannot finish faster than two workers allow: {:?}",
        elapsed
    );
    assert!(
        elapsed < Duration::from_millis(390),
        "reentrant callbacks did not overlap: {:?}",
        elapsed
    );
}

#[test]
fn test_reentrant_flag_ignored_on_read() {
    let _guard = PROCESS.lock().unwrap_or_else(|e| e.into_inner());
    rearm();

    let context = Context::with_loopback(EnvConfig::default());
    let node = Node::builder("reentrant")
        .context(Arc::clone(&context))
        .build()
        .expect("node creation should succeed");
    let group = node.create_callback_group(CallbackGroupKind::Reentrant);

    // Even with the token cleared, a reentrant group stays takeable.
    group
        .can_be_taken_from()
        .store(false, Ordering::Release);

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let timer = node
        .create_timer_in_group(
            Duration::from_millis(1),
            move || {
                counter.fetch_add(1, Ordering::Relaxed);
            },
            Some(group),
        )
        .expect("timer creation should succeed");

    std::thread::sleep(Duration::from_millis(5));

    let executor = hrcl::Executor::new(Arc::clone(&context));
    executor.add_node(&node, false);
    let executable = executor
        .get_next_executable(Some(Duration::from_millis(200)))
        .expect("selection should not fail")
        .expect("timer should be selectable despite the cleared token");
    executor
        .execute_any_executable(executable)
        .expect("dispatch should not fail");

    assert_eq!(fired.load(Ordering::Relaxed), 1);
    drop(timer);
}
