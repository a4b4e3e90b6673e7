use crate::fader::FadeProcessor;
use crate::params::{FadeParams, SharedDurations};
use crate::ramp::Envelope;
use crate::transport::TransportTracker;
use tracing::debug;

pub static PLUGIN_ID: &str = "transport_fade";
pub static PLUGIN_NAME: &str = "Audio fade-in/fade-out";
pub static PLUGIN_DESCRIPTION: &str =
    "Fades audio in and out when playback starts, stops, pauses or seeks.";

/// Fade state of one open audio stream.
///
/// Opened silent and waiting to fade in; its parameters start from the
/// process-wide durations. Dropping it closes the stream.
pub struct FadeStream {
    pub params: FadeParams,
    processor: FadeProcessor,
    tracker: TransportTracker,
}

impl FadeStream {
    pub fn open(shared: &SharedDurations) -> FadeStream {
        let envelope = Envelope::new();
        let params = FadeParams::new(shared.clone());
        debug!("Opened fade stream with {:?}", params.durations());
        FadeStream {
            params,
            processor: FadeProcessor::new(envelope.clone(), shared.clone()),
            tracker: TransportTracker::new(envelope, shared.clone()),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        self.processor.envelope()
    }

    pub fn processor(&mut self) -> &mut FadeProcessor {
        &mut self.processor
    }

    pub fn tracker(&self) -> &TransportTracker {
        &self.tracker
    }

    /// Separates the audio-thread half from the event-thread half.
    pub fn split(self) -> (FadeParams, FadeProcessor, TransportTracker) {
        (self.params, self.processor, self.tracker)
    }

    pub fn close(self) {
        debug!("Closed fade stream");
    }
}
