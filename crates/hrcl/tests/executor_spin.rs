// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Executor dispatch integration tests: timer cadence, selection priority
//! and ordering.
//!
//! These tests drive the base `Executor` selection loop directly so they
//! stay independent of the process-wide shutdown flag (exercised separately
//! in `shutdown.rs`).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hrcl::{Context, EnvConfig, Executor, Node, QoS};

fn test_context() -> Arc<Context> {
    Context::with_loopback(EnvConfig::default())
}

fn test_node(context: &Arc<Context>, name: &str) -> Arc<Node> {
    Node::builder(name)
        .context(Arc::clone(context))
        .build()
        .expect("node creation should succeed")
}

/// Single-threaded drive loop: dispatch until `deadline`.
fn spin_until(executor: &Executor, deadline: Instant) {
    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let next = executor
            .get_next_executable(Some(deadline - now))
            .expect("selection should not fail");
        if Instant::now() >= deadline {
            break;
        }
        if let Some(executable) = next {
            executor
                .execute_any_executable(executable)
                .expect("dispatch should not fail");
        }
    }
}

#[test]
fn test_periodic_timer_cadence() {
    let context = test_context();
    let executor = Executor::new(Arc::clone(&context));
    let node = test_node(&context, "cadence");
    executor.add_node(&node, false);

    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let _timer = node
        .create_timer(Duration::from_millis(50), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .expect("timer creation should succeed");

    spin_until(&executor, Instant::now() + Duration::from_millis(525));

    let fired = count.load(Ordering::Relaxed);
    assert!(
        (9..=11).contains(&fired),
        "expected ~10 firings in 525ms, got {}",
        fired
    );
}

#[test]
fn test_long_callback_does_not_queue_timer_firings() {
    let context = test_context();
    let executor = Executor::new(Arc::clone(&context));
    let node = test_node(&context, "busy");
    executor.add_node(&node, false);

    let timer_count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&timer_count);
    let _timer = node
        .create_timer(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .expect("timer creation should succeed");

    let _subscription = node
        .create_subscription("slow", QoS::default(), |_message: i64| {
            std::thread::sleep(Duration::from_millis(200));
        })
        .expect("subscription creation should succeed");
    let publisher = node
        .create_publisher::<i64>("slow", QoS::default())
        .expect("publisher creation should succeed");
    publisher.publish(1).expect("publish should succeed");

    // The subscription runs for 200ms; twenty timer deadlines pass during
    // the callback but the timer must not be queued for each of them.
    let first = executor
        .get_next_executable(Some(Duration::from_millis(500)))
        .expect("selection should not fail")
        .expect("an executable should be ready");
    executor
        .execute_any_executable(first)
        .expect("dispatch should not fail");

    let second = executor
        .get_next_executable(Some(Duration::from_millis(500)))
        .expect("selection should not fail")
        .expect("an executable should be ready");
    executor
        .execute_any_executable(second)
        .expect("dispatch should not fail");

    assert_eq!(
        timer_count.load(Ordering::Relaxed),
        1,
        "missed deadlines must collapse into one firing"
    );
}

#[test]
fn test_timer_dispatched_before_ready_subscription() {
    let context = test_context();
    let executor = Executor::new(Arc::clone(&context));
    let node = test_node(&context, "priority");
    executor.add_node(&node, false);

    let order = Arc::new(Mutex::new(Vec::new()));

    let record = Arc::clone(&order);
    let _timer = node
        .create_timer(Duration::from_millis(1), move || {
            record.lock().expect("order lock").push("timer");
        })
        .expect("timer creation should succeed");

    let record = Arc::clone(&order);
    let _subscription = node
        .create_subscription("data", QoS::default(), move |_message: i64| {
            record.lock().expect("order lock").push("subscription");
        })
        .expect("subscription creation should succeed");
    let publisher = node
        .create_publisher::<i64>("data", QoS::default())
        .expect("publisher creation should succeed");

    publisher.publish(1).expect("publish should succeed");
    std::thread::sleep(Duration::from_millis(5));

    // Both are ready; the timer must win.
    for _ in 0..2 {
        let executable = executor
            .get_next_executable(Some(Duration::from_millis(200)))
            .expect("selection should not fail")
            .expect("an executable should be ready");
        executor
            .execute_any_executable(executable)
            .expect("dispatch should not fail");
    }

    let order = order.lock().expect("order lock");
    assert_eq!(*order, vec!["timer", "subscription"]);
}

#[test]
fn test_same_priority_ties_broken_by_registration_order() {
    let context = test_context();
    let executor = Executor::new(Arc::clone(&context));
    let node = test_node(&context, "ties");
    executor.add_node(&node, false);

    let order = Arc::new(Mutex::new(Vec::new()));

    let record = Arc::clone(&order);
    let _first = node
        .create_subscription("data", QoS::default(), move |_message: i64| {
            record.lock().expect("order lock").push("first");
        })
        .expect("subscription creation should succeed");
    let record = Arc::clone(&order);
    let _second = node
        .create_subscription("data", QoS::default(), move |_message: i64| {
            record.lock().expect("order lock").push("second");
        })
        .expect("subscription creation should succeed");

    let publisher = node
        .create_publisher::<i64>("data", QoS::default())
        .expect("publisher creation should succeed");
    publisher.publish(1).expect("publish should succeed");

    for _ in 0..2 {
        let executable = executor
            .get_next_executable(Some(Duration::from_millis(200)))
            .expect("selection should not fail")
            .expect("an executable should be ready");
        executor
            .execute_any_executable(executable)
            .expect("dispatch should not fail");
    }

    let order = order.lock().expect("order lock");
    assert_eq!(*order, vec!["first", "second"]);
}

#[test]
fn test_wait_bounded_by_earliest_timer() {
    let context = test_context();
    let executor = Executor::new(Arc::clone(&context));
    let node = test_node(&context, "bound");
    executor.add_node(&node, false);

    let _timer = node
        .create_timer(Duration::from_millis(50), || {})
        .expect("timer creation should succeed");

    // A ten-second user timeout must be cut down to the timer deadline.
    let start = Instant::now();
    let executable = executor
        .get_next_executable(Some(Duration::from_secs(10)))
        .expect("selection should not fail");
    let elapsed = start.elapsed();

    assert!(executable.is_some(), "timer should come due");
    assert!(
        elapsed < Duration::from_secs(2),
        "wait should be bounded by the timer deadline, took {:?}",
        elapsed
    );
}

#[test]
fn test_wait_bounded_by_user_timeout() {
    let context = test_context();
    let executor = Executor::new(Arc::clone(&context));
    let node = test_node(&context, "bound2");
    executor.add_node(&node, false);

    let _timer = node
        .create_timer(Duration::from_secs(60), || {})
        .expect("timer creation should succeed");

    let start = Instant::now();
    let executable = executor
        .get_next_executable(Some(Duration::from_millis(30)))
        .expect("selection should not fail");
    let elapsed = start.elapsed();

    assert!(executable.is_none());
    assert!(elapsed >= Duration::from_millis(25));
    assert!(elapsed < Duration::from_secs(2));
}

#[test]
fn test_spin_node_once_dispatches_at_most_one() {
    let context = test_context();
    let executor = Executor::new(Arc::clone(&context));
    let node = test_node(&context, "once");

    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let _subscription = node
        .create_subscription("data", QoS::default(), move |_message: i64| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .expect("subscription creation should succeed");
    let publisher = node
        .create_publisher::<i64>("data", QoS::default())
        .expect("publisher creation should succeed");
    publisher.publish(1).expect("publish should succeed");
    publisher.publish(2).expect("publish should succeed");

    executor
        .spin_node_once(&node, Some(Duration::from_millis(200)))
        .expect("spin_node_once should not fail");
    assert_eq!(count.load(Ordering::Relaxed), 1);

    // The node was removed again: nothing more is dispatched without it.
    let idle = executor
        .get_next_executable(Some(Duration::from_millis(30)))
        .expect("selection should not fail");
    assert!(idle.is_none());
}

#[test]
fn test_node_destruction_stops_dispatch() {
    let context = test_context();
    let executor = Executor::new(Arc::clone(&context));
    let node = test_node(&context, "doomed");
    executor.add_node(&node, false);

    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let subscription = node
        .create_subscription("data", QoS::default(), move |_message: i64| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .expect("subscription creation should succeed");
    let publisher = node
        .create_publisher::<i64>("data", QoS::default())
        .expect("publisher creation should succeed");
    publisher.publish(1).expect("publish should succeed");

    drop(subscription);
    drop(node);

    // The sample is pending in the transport, but the owning node is gone.
    let next = executor
        .get_next_executable(Some(Duration::from_millis(50)))
        .expect("selection should not fail");
    assert!(next.is_none());
    assert_eq!(count.load(Ordering::Relaxed), 0);
}
