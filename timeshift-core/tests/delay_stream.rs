use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use timeshift_core::buffering::{create_capture_ring, Producer};
use timeshift_core::engine::session::{self, SessionContext, SessionDiagnostics};
use timeshift_core::{DelayBuffer, DelayConfig, ReadOutcome};
use tokio::sync::broadcast;

fn tagged_second(rate: u32, tag: f32) -> Vec<f32> {
    vec![tag; rate as usize]
}

#[test]
fn delayed_reads_follow_a_threaded_writer() {
    let rate = 1_000u32;
    let buf = DelayBuffer::new(DelayConfig::new(rate, 10, 2)).unwrap();
    let (mut writer, mut reader) = buf.split();

    let producer = thread::spawn(move || {
        for tag in 1..=30u32 {
            writer.write_chunk(&tagged_second(rate, tag as f32));
            thread::sleep(Duration::from_millis(2));
        }
        writer.stats().samples_written
    });

    // Whole seconds are published atomically, so every non-silent window is
    // a single tag. Tags may skip forward (re-anchor) but never go back.
    let mut tags: Vec<f32> = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline && tags.last() != Some(&30.0) {
        let window = reader.read_next_window();
        if window.is_silent() {
            thread::sleep(Duration::from_millis(1));
        } else {
            tags.push(window.samples[0]);
        }
    }

    let written = producer.join().expect("writer thread panicked");
    assert_eq!(written, u64::from(rate) * 30);
    assert!(!tags.is_empty(), "reader never saw data");
    assert!(
        tags.windows(2).all(|w| w[0] <= w[1]),
        "tags went backwards: {tags:?}"
    );
    assert!(tags.iter().all(|&t| (1.0..=30.0).contains(&t)));
}

#[test]
fn seeks_reposition_and_clamp() {
    let rate = 500u32;
    let buf = DelayBuffer::new(DelayConfig::new(rate, 12, 2)).unwrap();
    let (mut writer, mut reader) = buf.split();
    for tag in 0..10 {
        writer.write_chunk(&tagged_second(rate, tag as f32));
    }

    assert_eq!(reader.read_next_window().samples[0], 0.0);
    reader.seek_forward(3);
    assert_eq!(reader.read_next_window().samples[0], 4.0);
    reader.seek_backward(2);
    assert_eq!(reader.read_next_window().samples[0], 3.0);
    assert_eq!(reader.stats().clamped_seeks, 0);

    // Far past live: lands exactly at the margin behind the write cursor.
    reader.seek_forward(1_000);
    assert_eq!(reader.read_next_window().samples[0], 8.0);
    assert_eq!(reader.stats().clamped_seeks, 1);
}

#[test]
fn stalled_reader_re_anchors_behind_live() {
    let rate = 500u32;
    let buf = DelayBuffer::new(DelayConfig::new(rate, 10, 2)).unwrap();
    let (mut writer, mut reader) = buf.split();

    let producer = thread::spawn(move || {
        for tag in 0..15 {
            writer.write_chunk(&tagged_second(rate, tag as f32));
        }
    });
    producer.join().expect("writer thread panicked");

    // The reader slept through 15 s of a 10 s window; its position is long
    // overwritten. The next read recovers to margin past the oldest data.
    let mut frame = vec![0f32; rate as usize];
    assert_eq!(reader.read_frame_into(&mut frame), ReadOutcome::Recovered);
    assert!(frame.iter().all(|&s| s == 7.0));
    assert_eq!(reader.stats().re_anchors, 1);

    assert_eq!(reader.read_frame_into(&mut frame), ReadOutcome::Played);
    assert!(frame.iter().all(|&s| s == 8.0));
}

#[test]
fn ingest_session_passes_capture_audio_into_the_window() {
    let rate = 8_000u32;
    let buf = DelayBuffer::new(DelayConfig::new(rate, 10, 2)).unwrap();
    let (writer, mut reader) = buf.split();

    let (mut producer, consumer) = create_capture_ring();
    for tag in 1..=3u32 {
        let pushed = producer.push_slice(&tagged_second(rate, tag as f32));
        assert_eq!(pushed, rate as usize);
    }

    let running = Arc::new(AtomicBool::new(true));
    let (playhead_tx, mut playhead_rx) = broadcast::channel(16);
    let diagnostics = Arc::new(SessionDiagnostics::default());

    let ctx = SessionContext {
        capture_sample_rate: rate,
        buffer_sample_rate: rate,
        consumer,
        writer,
        running: Arc::clone(&running),
        playhead_tx,
        diagnostics: Arc::clone(&diagnostics),
    };
    let handle = thread::spawn(move || session::run(ctx));

    // Wait until the loop has drained everything into the delay buffer.
    let deadline = Instant::now() + Duration::from_secs(5);
    while reader.stats().samples_written < u64::from(rate) * 3 {
        assert!(Instant::now() < deadline, "ingest did not drain in time");
        thread::sleep(Duration::from_millis(2));
    }
    running.store(false, Ordering::SeqCst);
    handle.join().expect("session thread panicked");

    for tag in 1..=3u32 {
        let window = reader.read_next_window();
        assert!(
            window.samples.iter().all(|&s| s == tag as f32),
            "second {tag} was not preserved"
        );
    }

    let snapshot = diagnostics.snapshot();
    assert_eq!(snapshot.samples_written, rate as usize * 3);
    assert!(snapshot.chunks_in > 0);

    let event = playhead_rx.try_recv().expect("expected a playhead event");
    assert_relative_eq!(event.buffered_secs, 3.0, epsilon = 1e-6);
}
