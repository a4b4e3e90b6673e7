use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use transport_fade::drain::DrainCoordinator;
use transport_fade::params::{Durations, SharedDurations};
use transport_fade::ramp::RampDirection;
use transport_fade::stream::FadeStream;
use transport_fade::transport::{TransportEvent, TransportTracker};

fn no_sleep(_: Duration) {}

fn durations(start_ms: u32, stop_ms: u32, seek_ms: u32) -> SharedDurations {
    SharedDurations::new(Durations {
        start_ms,
        stop_ms,
        seek_ms,
    })
}

const EVENTS: [TransportEvent; 14] = [
    TransportEvent::SeekBegin,
    TransportEvent::SeekEnd,
    TransportEvent::Paused(true),
    TransportEvent::Paused(false),
    TransportEvent::TogglePause { playing: true },
    TransportEvent::TogglePause { playing: false },
    TransportEvent::Stop,
    TransportEvent::Pause,
    TransportEvent::PlayCurrent,
    TransportEvent::PlayNum,
    TransportEvent::PlayRandom,
    TransportEvent::Next,
    TransportEvent::Prev,
    TransportEvent::SongStarted,
];

#[test]
fn position_stays_in_range_for_any_event_sequence() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let shared = durations(37, 0, 3);
    let (_params, mut processor, tracker) = FadeStream::open(&shared).split();
    let tracker = TransportTracker::with_drain(
        tracker.envelope().clone(),
        shared.clone(),
        DrainCoordinator::with_sleep(no_sleep),
    );
    let mut samples = vec![0.0f32; 4096 * 2];
    for _ in 0..2000 {
        let event = EVENTS[rng.gen_range(0..EVENTS.len())];
        if rng.gen_bool(0.5) {
            tracker.notify(event);
        } else {
            tracker.apply(event);
        }
        let frames = rng.gen_range(0..4096);
        let sample_rate = [8000, 44100, 48000, 96000][rng.gen_range(0..4)];
        for sample in samples.iter_mut() {
            *sample = 1.0;
        }
        assert_eq!(
            processor.process(&mut samples, frames, 2, sample_rate),
            frames
        );
        let position = processor.envelope().position();
        assert!(position >= 0.0 && position <= 1.0, "{}", position);
        assert!(samples.iter().all(|s| s.is_finite() && *s >= 0.0 && *s <= 1.0));
    }
}

#[test]
fn half_second_fade_in_at_44100() {
    let shared = durations(500, 500, 100);
    let mut stream = FadeStream::open(&shared);
    let mut samples = vec![1.0f32; 22050];
    stream.processor().process(&mut samples, 22050, 1, 44100);
    assert_eq!(stream.envelope().position(), 1.0);
    assert_eq!(samples[22049], 1.0);
}

#[test]
fn zero_stop_duration_mutes_on_first_frame() {
    let shared = durations(0, 0, 100);
    let mut stream = FadeStream::open(&shared);
    let mut samples = vec![1.0f32; 256];
    stream.processor().process(&mut samples, 128, 2, 44100);
    assert_eq!(stream.envelope().position(), 1.0);

    stream.tracker().apply(TransportEvent::Stop);
    let mut samples = vec![1.0f32; 256];
    stream.processor().process(&mut samples, 128, 2, 44100);
    assert_eq!(stream.envelope().position(), 0.0);
    assert_eq!(samples[0], 0.0);
    assert_eq!(samples[1], 0.0);
}

#[test]
fn reversal_mid_ramp_is_continuous() {
    let shared = durations(100, 100, 100);
    let mut stream = FadeStream::open(&shared);
    let mut samples = vec![1.0f32; 4410];
    stream.processor().process(&mut samples, 4410, 1, 44100);

    stream.tracker().apply(TransportEvent::Pause);
    let mut samples = vec![1.0f32; 1000];
    stream.processor().process(&mut samples, 1000, 1, 44100);
    let before = stream.envelope().position();
    let last_gain = samples[999];

    stream.tracker().apply(TransportEvent::SongStarted);
    let mut samples = vec![1.0f32; 1000];
    stream.processor().process(&mut samples, 1000, 1, 44100);

    let step = 1.0 / 4410.0;
    assert!(before > 0.7 && before < 0.8);
    assert!((samples[0] - last_gain).abs() < 0.001);
    assert!((stream.envelope().position() - before - 1000.0 * step).abs() < 1e-6);
}

#[test]
fn seeks_only_use_seek_duration() {
    let shared = durations(5000, 5000, 20);
    let mut stream = FadeStream::open(&shared);
    stream.envelope().set_position(1.0);
    stream.envelope().set_direction(RampDirection::FadingOut);
    let mut samples = vec![1.0f32; 100];
    stream.processor().process(&mut samples, 100, 1, 48000);

    // a seek while still fading out from a stop
    stream.tracker().apply(TransportEvent::SeekBegin);
    let mut samples = vec![1.0f32; 960];
    stream.processor().process(&mut samples, 960, 1, 48000);
    assert_eq!(stream.envelope().position(), 0.0);

    stream.tracker().apply(TransportEvent::SeekEnd);
    stream.processor().process(&mut samples, 960, 1, 48000);
    assert_eq!(stream.envelope().position(), 1.0);
}

#[test]
fn stop_waits_for_fade_out_to_reach_silence() {
    let shared = durations(0, 500, 100);
    let (_params, mut processor, tracker) = FadeStream::open(&shared).split();

    let mut block = vec![1.0f32; 512 * 2];
    processor.process(&mut block, 512, 2, 44100);
    assert_eq!(processor.envelope().position(), 1.0);
    assert_eq!(processor.envelope().max_buffer_interval_ms(), 12);

    let running = Arc::new(AtomicBool::new(true));
    let audio = {
        let running = running.clone();
        thread::spawn(move || {
            let mut block = vec![1.0f32; 512 * 2];
            let mut stop_seen = false;
            while running.load(Ordering::Relaxed) {
                // one period of output latency before the fade-out starts
                if !stop_seen && !processor.envelope().direction().is_fading_in() {
                    stop_seen = true;
                    thread::sleep(Duration::from_millis(20));
                }
                for sample in block.iter_mut() {
                    *sample = 1.0;
                }
                processor.process(&mut block, 512, 2, 44100);
                thread::sleep(Duration::from_millis(5));
            }
        })
    };

    let started = Instant::now();
    let waited = tracker.notify(TransportEvent::Stop);
    let elapsed = started.elapsed();
    assert_eq!(tracker.envelope().position(), 0.0);

    running.store(false, Ordering::Relaxed);
    audio.join().unwrap();

    // 500 ms of ramp from full volume plus two 12 ms buffers
    assert_eq!(waited, Duration::from_millis(524));
    assert!(elapsed >= waited, "{:?}", elapsed);
    assert!(elapsed < waited + Duration::from_millis(10), "{:?}", elapsed);
}

#[test]
fn durations_changed_mid_stream_apply_to_open_streams() {
    let shared = durations(5000, 500, 100);
    let mut stream = FadeStream::open(&shared);
    let mut samples = vec![1.0f32; 441];
    stream.processor().process(&mut samples, 441, 1, 44100);
    assert!(stream.envelope().position() < 0.01);

    stream.params.set(0, "10");
    stream.processor().process(&mut samples, 441, 1, 44100);
    assert_eq!(stream.envelope().position(), 1.0);
    assert_eq!(shared.load().start_ms, 10);
}
