use std::os::unix::net::UnixStream;
use std::process::{Command, Stdio};
use std::thread;

use tui_video::core::VideoResult;
use tui_video::engine::{
    produce, FrameDiffEncoder, ProduceEnd, WorkerArgs, WORKER_SUBCOMMAND,
};
use tui_video::transport::{
    unique_region_name, RingConfig, RingConsumer, RingProducer, SlotPool,
};
use tui_video::types::{GridGeometry, Rgb, SourceFrame};

fn ring(config: RingConfig) -> (
    RingProducer<UnixStream, UnixStream>,
    RingConsumer<UnixStream, UnixStream>,
) {
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

#[test]
fn encoded_frames_cross_the_ring_as_deltas() {
    let geometry = GridGeometry::new(8, 4).unwrap();
    let (mut producer, mut consumer) = ring(RingConfig {
        slot_size: 32,
        slot_count: 2,
    });
    consumer.seed_free().unwrap();

    let worker = thread::spawn(move || {
        let black = SourceFrame::solid(8, 4, Rgb::BLACK);
        let mut lit = black.clone();
        lit.set_pixel(3, 3, Rgb::WHITE);
        let frames: Vec<VideoResult<SourceFrame>> =
            vec![Ok(black.clone()), Ok(black), Ok(lit)];
        let mut encoder = FrameDiffEncoder::new(geometry, 50).unwrap();
        produce(frames, &mut encoder, &mut producer).unwrap()
    });

    let mut frames = Vec::new();
    while let Some(frame) = consumer.recv_frame().unwrap() {
        frames.push(frame);
    }
    let summary = worker.join().unwrap();

    assert_eq!(summary.end, ProduceEnd::EndOfStream);
    assert_eq!(summary.frames, 3);
    assert_eq!(frames.len(), 3);
    // First frame paints everything; it is larger than one slot.
    assert!(frames[0].len() > 32);
    assert!(frames[1].is_empty());
    assert!(frames[2].starts_with(b"\x1b[2;4H"));
    assert_eq!(summary.bytes, frames.iter().map(|f| f.len() as u64).sum::<u64>());
}

#[test]
fn worker_process_ends_the_stream_when_the_source_is_missing() {
    let config = RingConfig {
        slot_size: 64,
        slot_count: 4,
    };
    let region = unique_region_name();
    let pool = SlotPool::create(&region, config).unwrap();

    let args = WorkerArgs {
        path: "/no/such/video.mp4".into(),
        geometry: GridGeometry::new(8, 4).unwrap(),
        threshold: 150,
        region,
        ring: config,
    };
    let log = std::env::temp_dir().join(format!("tui-video-test-{}.log", std::process::id()));
    let mut child = Command::new(env!("CARGO_BIN_EXE_tui-video"))
        .arg(WORKER_SUBCOMMAND)
        .args(args.to_cli_args())
        .env("TUI_VIDEO_LOG", &log)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let ready = child.stdout.take().unwrap();
    let free = child.stdin.take().unwrap();
    let mut consumer = RingConsumer::new(pool, ready, free);
    consumer.seed_free().unwrap();

    assert!(consumer.recv_frame().unwrap().is_none());
    assert!(consumer.is_ended());
    drop(consumer.into_pool());

    let status = child.wait().unwrap();
    assert!(!status.success());
    let _ = std::fs::remove_file(log);
}
