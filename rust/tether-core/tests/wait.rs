use std::time::{Duration, Instant};

use tether_core::transport::mem::MemTransport;
use tether_core::transport::EventId;
use tether_core::{Config, Context, WaitOutcome};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn context() -> Context<MemTransport> {
    Context::new(1, MemTransport::new(), Config::default())
}

#[test]
fn untriggered_wait_times_out_close_to_the_deadline() {
    init_tracing();
    let context = context();
    let guard = context.create_guard_condition().unwrap();
    let mut wait_set = context.create_wait_set();

    wait_set.attach(&guard);
    let start = Instant::now();
    let outcome = wait_set.wait(Some(Duration::from_millis(50))).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(elapsed >= Duration::from_millis(50), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "{:?}", elapsed);
}

#[test]
fn zero_timeout_polls() {
    init_tracing();
    let context = context();
    let guard = context.create_guard_condition().unwrap();
    let mut wait_set = context.create_wait_set();

    wait_set.attach(&guard);
    let start = Instant::now();
    assert_eq!(
        wait_set.wait(Some(Duration::ZERO)).unwrap(),
        WaitOutcome::TimedOut
    );
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn trigger_from_another_thread_wakes_an_indefinite_wait() {
    init_tracing();
    let context = context();
    let guard = context.create_guard_condition().unwrap();
    let mut wait_set = context.create_wait_set();

    wait_set.attach(&guard);
    std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(30));
            guard.trigger().unwrap();
        });
        match wait_set.wait(None).unwrap() {
            WaitOutcome::Triggered(ready) => assert!(ready.is_ready(&guard)),
            WaitOutcome::TimedOut => panic!("indefinite wait timed out"),
        }
    });
}

#[test]
fn concurrent_triggers_coalesce_into_one_wakeup() {
    init_tracing();
    let context = context();
    let guard = context.create_guard_condition().unwrap();
    let mut wait_set = context.create_wait_set();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| guard.trigger().unwrap());
        }
    });

    wait_set.attach(&guard);
    let WaitOutcome::Triggered(ready) = wait_set.wait(Some(Duration::ZERO)).unwrap() else {
        panic!("expected a wakeup");
    };
    assert_eq!(ready.len(), 1);

    wait_set.attach(&guard);
    assert_eq!(
        wait_set.wait(Some(Duration::ZERO)).unwrap(),
        WaitOutcome::TimedOut
    );
}

#[test]
fn publish_wakes_an_attached_subscriber() {
    init_tracing();
    let context = context();
    let node = context.create_node("listener", "").unwrap();
    let subscriber = node.create_subscriber("/wake", "u32").unwrap();
    let publisher = node.create_publisher("/wake", "u32").unwrap();
    let guard = context.create_guard_condition().unwrap();
    let mut wait_set = context.create_wait_set();

    wait_set.attach(&subscriber);
    wait_set.attach(&guard);
    std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(20));
            publisher.publish(&1u32.to_le_bytes()).unwrap();
        });
        match wait_set.wait(Some(Duration::from_secs(10))).unwrap() {
            WaitOutcome::Triggered(ready) => {
                assert!(ready.is_ready(&subscriber));
                assert!(!ready.is_ready(&guard));
            }
            WaitOutcome::TimedOut => panic!("publish did not wake the wait set"),
        }
    });

    let mut buf = [0u8; 4];
    assert_eq!(subscriber.take_copy(&mut buf).unwrap(), Some(4));
}

#[test]
fn override_ids_identify_the_trigger() {
    init_tracing();
    let context = context();
    let a = context.create_guard_condition().unwrap();
    let b = context.create_guard_condition().unwrap();
    let mut wait_set = context.create_wait_set();

    a.trigger_with(Some(EventId(1000))).unwrap();
    b.trigger_with(Some(EventId(2000))).unwrap();
    wait_set.attach(&a);
    wait_set.attach(&b);

    let WaitOutcome::Triggered(ready) = wait_set.wait(Some(Duration::ZERO)).unwrap() else {
        panic!("expected a wakeup");
    };
    let mut ids: Vec<EventId> = ready.event_ids().collect();
    ids.sort();
    assert_eq!(ids, vec![EventId(1000), EventId(2000)]);
}

#[test]
fn one_notification_wakes_every_wait_set_on_the_channel() {
    init_tracing();
    let context = context();
    let node = context.create_node("fanout", "").unwrap();
    let first = node.create_subscriber("/fanout", "u8").unwrap();
    let second = node.create_subscriber("/fanout", "u8").unwrap();
    let publisher = node.create_publisher("/fanout", "u8").unwrap();
    let guard = context.create_guard_condition().unwrap();
    let mut ws_first = context.create_wait_set();
    let mut ws_second = context.create_wait_set();

    // Build both listeners up front; they are reused below.
    for ws in [&mut ws_first, &mut ws_second] {
        ws.attach(&guard);
        assert_eq!(ws.wait(Some(Duration::ZERO)).unwrap(), WaitOutcome::TimedOut);
    }

    // A guard condition shared by two wait sets.
    guard.trigger().unwrap();
    for ws in [&mut ws_first, &mut ws_second] {
        ws.attach(&guard);
        let WaitOutcome::Triggered(ready) = ws.wait(Some(Duration::ZERO)).unwrap() else {
            panic!("trigger was consumed by another wait set");
        };
        assert!(ready.is_ready(&guard));
    }

    // One publish, two subscriptions, each blocked in its own wait set.
    ws_first.attach(&first);
    ws_second.attach(&second);
    for ws in [&mut ws_first, &mut ws_second] {
        assert_eq!(ws.wait(Some(Duration::ZERO)).unwrap(), WaitOutcome::TimedOut);
    }
    std::thread::scope(|s| {
        let a = s.spawn(|| {
            ws_first.attach(&first);
            ws_first.wait(Some(Duration::from_secs(10))).unwrap()
        });
        let b = s.spawn(|| {
            ws_second.attach(&second);
            ws_second.wait(Some(Duration::from_secs(10))).unwrap()
        });
        std::thread::sleep(Duration::from_millis(30));
        publisher.publish(&[1]).unwrap();

        let WaitOutcome::Triggered(ready) = a.join().unwrap() else {
            panic!("first wait set missed the publish");
        };
        assert!(ready.is_ready(&first));
        let WaitOutcome::Triggered(ready) = b.join().unwrap() else {
            panic!("second wait set missed the publish");
        };
        assert!(ready.is_ready(&second));
    });

    let mut buf = [0u8; 1];
    assert_eq!(first.take_copy(&mut buf).unwrap(), Some(1));
    assert_eq!(second.take_copy(&mut buf).unwrap(), Some(1));
}

#[test]
fn queued_data_keeps_a_subscriber_ready() {
    init_tracing();
    let context = context();
    let node = context.create_node("backlog", "").unwrap();
    let subscriber = node.create_subscriber("/backlog", "u8").unwrap();
    let publisher = node.create_publisher("/backlog", "u8").unwrap();
    let mut wait_set = context.create_wait_set();

    publisher.publish(&[1]).unwrap();
    publisher.publish(&[2]).unwrap();

    let mut buf = [0u8; 1];
    for expected in [1u8, 2] {
        wait_set.attach(&subscriber);
        let WaitOutcome::Triggered(ready) =
            wait_set.wait(Some(Duration::from_millis(50))).unwrap()
        else {
            panic!("sample {} was queued but the wait timed out", expected);
        };
        assert!(ready.is_ready(&subscriber));
        assert_eq!(subscriber.take_copy(&mut buf).unwrap(), Some(1));
        assert_eq!(buf, [expected]);
    }

    wait_set.attach(&subscriber);
    assert_eq!(
        wait_set.wait(Some(Duration::ZERO)).unwrap(),
        WaitOutcome::TimedOut
    );
}
