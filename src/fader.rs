use crate::curve;
use crate::params::{Durations, SharedDurations};
use crate::ramp::{Envelope, RampDirection};

/// Ramp duration for a direction: seeks always use the seek duration.
pub fn ramp_duration_ms(direction: RampDirection, durations: &Durations) -> u32 {
    if direction.is_seeking() {
        durations.seek_ms
    } else if direction.is_fading_in() {
        durations.start_ms
    } else {
        durations.stop_ms
    }
}

/// Position increment per frame, or `None` when the ramp is too short to
/// span a single frame and must jump straight to its bound.
fn step_per_frame(direction: RampDirection, duration_ms: u32, sample_rate: u32) -> Option<f64> {
    let interval_frames = (duration_ms as f64 * sample_rate as f64 / 1000.0).trunc();
    if interval_frames < 1.0 {
        None
    } else if direction.is_fading_in() {
        Some(1.0 / interval_frames)
    } else {
        Some(-1.0 / interval_frames)
    }
}

// Accumulated step error stays far below this; anything closer to a bound
// snaps to it so a full ramp lands exactly on 0.0 or 1.0.
const SNAP_EPSILON: f64 = 1e-9;

fn advance(position: f64, step: Option<f64>, fading_in: bool) -> f64 {
    let position = match step {
        Some(step) => position + step,
        None if fading_in => 1.0,
        None => 0.0,
    };
    if position >= 1.0 - SNAP_EPSILON {
        1.0
    } else if position <= SNAP_EPSILON {
        0.0
    } else {
        position
    }
}

/// Applies the envelope to a stream's audio, on the real-time thread.
///
/// Never blocks, allocates or logs.
pub struct FadeProcessor {
    envelope: Envelope,
    durations: SharedDurations,
}

impl FadeProcessor {
    pub fn new(envelope: Envelope, durations: SharedDurations) -> FadeProcessor {
        FadeProcessor {
            envelope,
            durations,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Fades `frames` interleaved frames of `samples` in place and returns
    /// the number of frames processed: `frames`, or fewer when `samples`
    /// holds fewer whole frames. Zero channels means nothing to process.
    ///
    /// The direction is read once per call, so a transport event arriving
    /// mid-buffer takes effect on the next buffer. The position advances
    /// once per frame, before that frame's gain is applied.
    pub fn process(
        &mut self,
        samples: &mut [f32],
        frames: usize,
        channels: usize,
        sample_rate: u32,
    ) -> usize {
        if channels == 0 {
            return 0;
        }
        let frames = frames.min(samples.len() / channels);
        if frames == 0 {
            return 0;
        }
        let direction = self.envelope.direction();
        let duration_ms = ramp_duration_ms(direction, &self.durations.load());
        let fading_in = direction.is_fading_in();

        let step = if sample_rate == 0 {
            None
        } else {
            let buffer_interval_ms = (frames as f64 / sample_rate as f64 * 1000.0).ceil();
            self.envelope
                .observe_buffer_interval_ms(buffer_interval_ms.min(u32::MAX as f64) as u32);
            step_per_frame(direction, duration_ms, sample_rate)
        };

        let mut position = self.envelope.position();
        for frame in samples[..frames * channels].chunks_mut(channels) {
            position = advance(position, step, fading_in);
            let gain = curve::gain(position);
            for sample in frame.iter_mut() {
                *sample *= gain;
            }
        }
        self.envelope.set_position(position);

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(durations: Durations) -> FadeProcessor {
        FadeProcessor::new(Envelope::new(), SharedDurations::new(durations))
    }

    fn durations(start_ms: u32, stop_ms: u32, seek_ms: u32) -> Durations {
        Durations {
            start_ms,
            stop_ms,
            seek_ms,
        }
    }

    #[test]
    fn duration_selection() {
        let d = durations(1, 2, 3);
        assert_eq!(ramp_duration_ms(RampDirection::FadingIn, &d), 1);
        assert_eq!(ramp_duration_ms(RampDirection::FadingOut, &d), 2);
        assert_eq!(ramp_duration_ms(RampDirection::SeekFadingIn, &d), 3);
        assert_eq!(ramp_duration_ms(RampDirection::SeekFadingOut, &d), 3);
    }

    #[test]
    fn full_fade_in_reaches_unity() {
        let mut fader = processor(durations(500, 500, 100));
        let mut samples = vec![1.0f32; 22050 * 2];
        assert_eq!(fader.process(&mut samples, 22050, 2, 44100), 22050);
        assert_eq!(fader.envelope().position(), 1.0);
        assert_eq!(samples[22049 * 2], 1.0);
        assert_eq!(samples[22049 * 2 + 1], 1.0);
        assert!(samples[0] > 0.0 && samples[0] < 0.001);
    }

    #[test]
    fn gain_rises_monotonically_during_fade_in() {
        let mut fader = processor(durations(100, 500, 100));
        let mut samples = vec![1.0f32; 4410];
        fader.process(&mut samples, 4410, 1, 44100);
        for pair in samples.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(samples[4409], 1.0);
    }

    #[test]
    fn channels_of_a_frame_share_gain() {
        let mut fader = processor(durations(10, 10, 10));
        let mut samples = vec![0.5f32; 300];
        fader.process(&mut samples, 100, 3, 44100);
        for frame in samples.chunks(3) {
            assert_eq!(frame[0], frame[1]);
            assert_eq!(frame[1], frame[2]);
        }
    }

    #[test]
    fn zero_stop_duration_mutes_instantly() {
        let mut fader = processor(durations(500, 0, 100));
        fader.envelope().set_position(1.0);
        fader.envelope().set_direction(RampDirection::FadingOut);
        let mut samples = vec![1.0f32; 64];
        fader.process(&mut samples, 32, 2, 48000);
        assert_eq!(fader.envelope().position(), 0.0);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_start_duration_is_instant_unity() {
        let mut fader = processor(durations(0, 500, 100));
        let mut samples = vec![0.25f32; 16];
        fader.process(&mut samples, 16, 1, 44100);
        assert_eq!(fader.envelope().position(), 1.0);
        assert!(samples.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn zero_sample_rate_does_not_poison_position() {
        let mut fader = processor(durations(500, 500, 100));
        let mut samples = vec![1.0f32; 8];
        fader.process(&mut samples, 8, 1, 0);
        let position = fader.envelope().position();
        assert!(!position.is_nan());
        assert_eq!(position, 1.0);
        assert_eq!(fader.envelope().max_buffer_interval_ms(), 0);
    }

    #[test]
    fn empty_buffer_changes_nothing() {
        let mut fader = processor(durations(500, 500, 100));
        fader.envelope().set_position(0.4);
        fader.envelope().set_direction(RampDirection::FadingOut);
        let mut samples: Vec<f32> = vec![];
        assert_eq!(fader.process(&mut samples, 0, 2, 44100), 0);
        assert_eq!(fader.envelope().position(), 0.4);
        assert_eq!(fader.envelope().direction(), RampDirection::FadingOut);
        assert_eq!(fader.envelope().max_buffer_interval_ms(), 0);
    }

    #[test]
    fn records_largest_buffer_interval() {
        let mut fader = processor(durations(500, 500, 100));
        let mut samples = vec![0.0f32; 4096];
        fader.process(&mut samples, 512, 2, 44100);
        assert_eq!(fader.envelope().max_buffer_interval_ms(), 12);
        fader.process(&mut samples, 2048, 2, 44100);
        assert_eq!(fader.envelope().max_buffer_interval_ms(), 47);
        fader.process(&mut samples, 256, 2, 44100);
        assert_eq!(fader.envelope().max_buffer_interval_ms(), 47);
    }

    #[test]
    fn reversal_continues_from_current_position() {
        let mut fader = processor(durations(100, 100, 100));
        let mut samples = vec![1.0f32; 2205];
        fader.process(&mut samples, 2205, 1, 44100);
        let midway = fader.envelope().position();
        assert!((midway - 0.5).abs() < 1e-6);

        fader.envelope().set_direction(RampDirection::FadingOut);
        let mut samples = vec![1.0f32; 1];
        fader.process(&mut samples, 1, 1, 44100);
        let step = 1.0 / 4410.0;
        assert!((fader.envelope().position() - (midway - step)).abs() < 1e-9);
    }

    #[test]
    fn seek_ramp_ignores_start_and_stop() {
        let mut fader = processor(durations(5000, 5000, 10));
        fader.envelope().set_position(1.0);
        fader.envelope().set_direction(RampDirection::SeekFadingOut);
        let mut samples = vec![1.0f32; 441];
        fader.process(&mut samples, 441, 1, 44100);
        assert_eq!(fader.envelope().position(), 0.0);
        fader.envelope().set_direction(RampDirection::SeekFadingIn);
        fader.process(&mut samples, 441, 1, 44100);
        assert_eq!(fader.envelope().position(), 1.0);
    }

    #[test]
    fn short_slice_processes_only_whole_frames() {
        let mut fader = processor(durations(1000, 500, 100));
        let mut samples = [1.0f32; 11];
        assert_eq!(fader.process(&mut samples, 1000, 2, 1000), 5);
        assert!((fader.envelope().position() - 0.005).abs() < 1e-12);
        assert_eq!(samples[10], 1.0);
        // 5 frames at 1 kHz
        assert_eq!(fader.envelope().max_buffer_interval_ms(), 5);
    }

    #[test]
    fn zero_channels_is_a_no_op() {
        let mut fader = processor(durations(500, 500, 100));
        let mut samples = [1.0f32; 4];
        assert_eq!(fader.process(&mut samples, 4, 0, 44100), 0);
        assert_eq!(samples, [1.0; 4]);
        assert_eq!(fader.envelope().position(), 0.0);
        assert_eq!(fader.envelope().max_buffer_interval_ms(), 0);
    }

    #[test]
    fn frames_beyond_slice_are_not_touched() {
        let mut fader = processor(durations(0, 0, 0));
        fader.envelope().set_direction(RampDirection::FadingOut);
        let mut samples = vec![1.0f32; 8];
        fader.process(&mut samples, 2, 2, 44100);
        assert_eq!(&samples[..4], &[0.0; 4]);
        assert_eq!(&samples[4..], &[1.0; 4]);
    }
}
