use crate::fader::ramp_duration_ms;
use crate::params::Durations;
use crate::ramp::Envelope;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// How long a fade-out from the envelope's current state needs before the
/// audio thread has certainly reached silence.
///
/// The remaining ramp plus two of the largest buffers seen, since the audio
/// thread advances the ramp asynchronously to the caller.
pub fn drain_wait(envelope: &Envelope, durations: &Durations) -> Duration {
    let position = envelope.position();
    if position <= 0.0 {
        return Duration::from_millis(0);
    }
    let ramp_ms = ramp_duration_ms(envelope.direction(), durations) as f64 * position;
    let pad_ms = 2.0 * envelope.max_buffer_interval_ms() as f64;
    Duration::from_micros(((ramp_ms + pad_ms) * 1000.0).round() as u64)
}

/// Blocks the event path until a fade-out has audibly finished.
///
/// Runs on the thread delivering transport events, never on the audio
/// thread. Once started a wait runs to completion.
pub struct DrainCoordinator {
    sleep: fn(Duration),
}

impl DrainCoordinator {
    pub fn new() -> DrainCoordinator {
        DrainCoordinator {
            sleep: thread::sleep,
        }
    }

    /// Uses `sleep` instead of `thread::sleep`.
    pub fn with_sleep(sleep: fn(Duration)) -> DrainCoordinator {
        DrainCoordinator { sleep }
    }

    /// Waits out the fade, then forces the envelope to silence. Returns the
    /// time waited.
    pub fn drain(&self, envelope: &Envelope, durations: &Durations) -> Duration {
        let wait = drain_wait(envelope, durations);
        if wait > Duration::from_millis(0) {
            debug!(
                "Draining fade-out from position {:.3} for {:?}",
                envelope.position(),
                wait
            );
            (self.sleep)(wait);
        }
        envelope.set_position(0.0);
        wait
    }
}

impl Default for DrainCoordinator {
    fn default() -> Self {
        DrainCoordinator::new()
    }
}
