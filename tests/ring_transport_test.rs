use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use tui_video::transport::{
    unique_region_name, RingConfig, RingConsumer, RingProducer, SendOutcome, SlotPool,
};

type Producer = RingProducer<UnixStream, UnixStream>;
type Consumer = RingConsumer<UnixStream, UnixStream>;

fn connect(config: RingConfig) -> (Producer, Consumer) {
    let name = unique_region_name();
    let owner = SlotPool::create(&name, config).unwrap();
    let attached = SlotPool::open(&name, config).unwrap();
    let (free_tx, free_rx) = UnixStream::pair().unwrap();
    let (ready_tx, ready_rx) = UnixStream::pair().unwrap();
    (
        RingProducer::new(attached, free_rx, ready_tx),
        RingConsumer::new(owner, ready_rx, free_tx),
    )
}

fn payload(i: usize) -> Vec<u8> {
    (0..(i * 7) % 50).map(|b| (b + i) as u8).collect()
}

#[test]
fn frames_arrive_intact_and_in_order() {
    let (mut producer, mut consumer) = connect(RingConfig {
        slot_size: 16,
        slot_count: 3,
    });
    consumer.seed_free().unwrap();

    let worker = thread::spawn(move || {
        for i in 0..40 {
            assert_eq!(producer.send_frame(&payload(i)).unwrap(), SendOutcome::Delivered);
        }
        producer.finish().unwrap();
    });

    let mut received = Vec::new();
    while let Some(frame) = consumer.recv_frame().unwrap() {
        received.push(frame);
    }
    worker.join().unwrap();

    assert_eq!(received.len(), 40);
    for (i, frame) in received.iter().enumerate() {
        assert_eq!(frame, &payload(i), "frame {i}");
    }
}

#[test]
fn slow_consumer_backpressures_without_deadlock() {
    let (mut producer, mut consumer) = connect(RingConfig {
        slot_size: 4,
        slot_count: 2,
    });
    consumer.seed_free().unwrap();

    // Every frame needs more slots than exist, so the producer must wait on
    // the consumer repeatedly.
    let worker = thread::spawn(move || {
        for i in 0..20u8 {
            producer.send_frame(&[i; 11]).unwrap();
        }
        producer.finish().unwrap();
    });

    let mut count = 0u8;
    let mut out = Vec::new();
    while consumer.recv_frame_into(&mut out).unwrap() {
        assert_eq!(out, vec![count; 11]);
        count += 1;
        if count % 5 == 0 {
            thread::sleep(Duration::from_millis(5));
        }
    }
    worker.join().unwrap();
    assert_eq!(count, 20);
}

#[test]
fn buffered_reports_waiting_frames() {
    let (mut producer, mut consumer) = connect(RingConfig {
        slot_size: 8,
        slot_count: 4,
    });
    consumer.seed_free().unwrap();
    for i in 0..3u8 {
        producer.send_frame(&[i]).unwrap();
    }
    assert_eq!(consumer.buffered(), 3);
    consumer.recv_frame().unwrap();
    assert_eq!(consumer.buffered(), 2);
}

#[test]
fn consumer_cancel_stops_a_blocked_producer() {
    let (mut producer, mut consumer) = connect(RingConfig {
        slot_size: 8,
        slot_count: 1,
    });
    consumer.seed_free().unwrap();

    let worker = thread::spawn(move || {
        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(producer.send_frame(b"abc").unwrap());
        }
        outcomes
    });

    // Take one frame, then give up; the producer is waiting for the only slot.
    assert!(consumer.recv_frame().unwrap().is_some());
    thread::sleep(Duration::from_millis(20));
    consumer.cancel();

    let outcomes = worker.join().unwrap();
    assert_eq!(outcomes[0], SendOutcome::Delivered);
    assert!(outcomes.contains(&SendOutcome::Cancelled));
}
