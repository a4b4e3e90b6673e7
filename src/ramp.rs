use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Which way the envelope moves, and whether a seek caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampDirection {
    FadingIn,
    FadingOut,
    SeekFadingIn,
    SeekFadingOut,
}

impl RampDirection {
    pub fn is_fading_in(self) -> bool {
        matches!(self, RampDirection::FadingIn | RampDirection::SeekFadingIn)
    }

    pub fn is_seeking(self) -> bool {
        matches!(
            self,
            RampDirection::SeekFadingIn | RampDirection::SeekFadingOut
        )
    }

    fn to_bits(self) -> u8 {
        match self {
            RampDirection::FadingIn => 0,
            RampDirection::FadingOut => 1,
            RampDirection::SeekFadingIn => 2,
            RampDirection::SeekFadingOut => 3,
        }
    }

    fn from_bits(bits: u8) -> RampDirection {
        match bits {
            0 => RampDirection::FadingIn,
            1 => RampDirection::FadingOut,
            2 => RampDirection::SeekFadingIn,
            _ => RampDirection::SeekFadingOut,
        }
    }
}

struct EnvelopeState {
    direction: AtomicU8,
    position_bits: AtomicU64,
    max_buffer_interval_ms: AtomicU32,
}

/// Ramp state of one stream, shared between the audio thread and the
/// event thread.
///
/// Every field is a single word read and written without locks. Cloning
/// yields another handle to the same state.
#[derive(Clone)]
pub struct Envelope {
    state: Arc<EnvelopeState>,
}

impl Envelope {
    /// Silent, waiting to fade in.
    pub fn new() -> Envelope {
        Envelope {
            state: Arc::new(EnvelopeState {
                direction: AtomicU8::new(RampDirection::FadingIn.to_bits()),
                position_bits: AtomicU64::new(0f64.to_bits()),
                max_buffer_interval_ms: AtomicU32::new(0),
            }),
        }
    }

    pub fn direction(&self) -> RampDirection {
        RampDirection::from_bits(self.state.direction.load(Ordering::Acquire))
    }

    pub fn set_direction(&self, direction: RampDirection) {
        self.state
            .direction
            .store(direction.to_bits(), Ordering::Release);
    }

    /// Ramp position, 0.0 = silent, 1.0 = full volume.
    pub fn position(&self) -> f64 {
        f64::from_bits(self.state.position_bits.load(Ordering::Acquire))
    }

    pub fn set_position(&self, position: f64) {
        let position = if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, 1.0)
        };
        self.state
            .position_bits
            .store(position.to_bits(), Ordering::Release);
    }

    /// Largest buffer duration seen so far, in milliseconds.
    pub fn max_buffer_interval_ms(&self) -> u32 {
        self.state.max_buffer_interval_ms.load(Ordering::Relaxed)
    }

    /// Raises the high-water mark; never lowers it.
    pub fn observe_buffer_interval_ms(&self, interval_ms: u32) {
        self.state
            .max_buffer_interval_ms
            .fetch_max(interval_ms, Ordering::Relaxed);
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope::new()
    }
}
