#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use fcache::cache::queue::RequestQueue;

#[test]
fn pops_in_enqueue_order_with_duplicates() {
    let queue = RequestQueue::new();
    for key in ["a", "b", "a", "c"] {
        queue.push(key.to_owned());
    }

    assert_eq!(queue.snapshot(), vec!["a", "b", "a", "c"]);
    assert_eq!(queue.len(), 4);

    let drained: Vec<_> = std::iter::from_fn(|| queue.try_pop()).collect();
    assert_eq!(drained, vec!["a", "b", "a", "c"]);
    assert!(queue.is_empty());
}

#[test]
fn pop_parks_until_a_request_arrives() {
    let queue = Arc::new(RequestQueue::new());
    let (tx, rx) = mpsc::channel();

    let consumer = {
        let queue = Arc::clone(&queue);
        std::thread::spawn(move || {
            tx.send(queue.pop()).unwrap();
        })
    };

    assert!(
        rx.recv_timeout(Duration::from_millis(100)).is_err(),
        "pop must not return while the queue is empty"
    );

    queue.push("late".to_owned());
    let popped = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(popped.as_deref(), Some("late"));
    consumer.join().expect("thread panicked");
}

#[test]
fn shutdown_wakes_a_parked_consumer() {
    let queue = Arc::new(RequestQueue::new());
    let consumer = {
        let queue = Arc::clone(&queue);
        std::thread::spawn(move || queue.pop())
    };

    std::thread::sleep(Duration::from_millis(50));
    queue.shutdown();

    assert_eq!(consumer.join().expect("thread panicked"), None);
    assert!(queue.is_shut_down());
}

#[test]
fn shutdown_abandons_pending_requests() {
    let queue = RequestQueue::new();
    queue.push("a".to_owned());
    queue.push("b".to_owned());

    queue.shutdown();

    assert_eq!(queue.pop(), None);
    assert_eq!(queue.try_pop(), None);
    assert_eq!(queue.len(), 2, "pending requests are left in place, not drained");
}

#[test]
fn many_producers_one_consumer_sees_every_request() {
    let queue = Arc::new(RequestQueue::new());

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for i in 0..250 {
                    queue.push(format!("{p}-{i}"));
                }
            })
        })
        .collect();

    let mut seen = Vec::new();
    while seen.len() < 1000 {
        seen.push(queue.pop().unwrap());
    }
    for h in producers {
        h.join().expect("thread panicked");
    }

    // Each producer's own requests keep their relative order.
    for p in 0..4 {
        let prefix = format!("{p}-");
        let mine: Vec<u32> = seen
            .iter()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(mine, (0..250).collect::<Vec<_>>());
    }
}
