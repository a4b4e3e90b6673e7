use crate::drain::DrainCoordinator;
use crate::params::SharedDurations;
use crate::ramp::{Envelope, RampDirection};
use crossbeam_channel as channel;
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Transport notifications from the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    SeekBegin,
    SeekEnd,
    Paused(bool),
    /// Pause toggled while the output was `playing` (or not).
    TogglePause { playing: bool },
    Stop,
    Pause,
    PlayCurrent,
    PlayNum,
    PlayRandom,
    Next,
    Prev,
    SongStarted,
}

impl TransportEvent {
    /// The direction this event leaves the envelope in.
    pub fn direction(self) -> RampDirection {
        match self {
            TransportEvent::SeekBegin => RampDirection::SeekFadingOut,
            TransportEvent::SeekEnd => RampDirection::SeekFadingIn,
            TransportEvent::Paused(true) => RampDirection::FadingOut,
            TransportEvent::Paused(false) => RampDirection::FadingIn,
            TransportEvent::TogglePause { playing: true } => RampDirection::FadingOut,
            TransportEvent::TogglePause { playing: false } => RampDirection::FadingIn,
            TransportEvent::Stop
            | TransportEvent::Pause
            | TransportEvent::PlayCurrent
            | TransportEvent::PlayNum
            | TransportEvent::PlayRandom
            | TransportEvent::Next
            | TransportEvent::Prev => RampDirection::FadingOut,
            TransportEvent::SongStarted => RampDirection::FadingIn,
        }
    }
}

impl fmt::Display for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportEvent::SeekBegin => "seek-begin",
            TransportEvent::SeekEnd => "seek-end",
            TransportEvent::Paused(true) => "paused",
            TransportEvent::Paused(false) => "unpaused",
            TransportEvent::TogglePause { playing: true } => "toggle-playing",
            TransportEvent::TogglePause { playing: false } => "toggle-paused",
            TransportEvent::Stop => "stop",
            TransportEvent::Pause => "pause",
            TransportEvent::PlayCurrent => "play-current",
            TransportEvent::PlayNum => "play-num",
            TransportEvent::PlayRandom => "play-random",
            TransportEvent::Next => "next",
            TransportEvent::Prev => "prev",
            TransportEvent::SongStarted => "song-started",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("unknown transport event \"{0}\"")]
pub struct ParseEventError(pub String);

impl FromStr for TransportEvent {
    type Err = ParseEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "seek-begin" | "seek" => Ok(TransportEvent::SeekBegin),
            "seek-end" | "seeked" => Ok(TransportEvent::SeekEnd),
            "paused" => Ok(TransportEvent::Paused(true)),
            "unpaused" | "resume" => Ok(TransportEvent::Paused(false)),
            "toggle-playing" => Ok(TransportEvent::TogglePause { playing: true }),
            "toggle-paused" => Ok(TransportEvent::TogglePause { playing: false }),
            "stop" => Ok(TransportEvent::Stop),
            "pause" => Ok(TransportEvent::Pause),
            "play-current" => Ok(TransportEvent::PlayCurrent),
            "play-num" => Ok(TransportEvent::PlayNum),
            "play-random" => Ok(TransportEvent::PlayRandom),
            "next" => Ok(TransportEvent::Next),
            "prev" => Ok(TransportEvent::Prev),
            "song-started" | "play" => Ok(TransportEvent::SongStarted),
            other => Err(ParseEventError(other.to_string())),
        }
    }
}

/// What the event-delivery thread receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Event(TransportEvent),
    /// Pause toggle from a source that cannot see the output state; resolved
    /// on delivery, after every earlier command has been applied.
    TogglePause,
}

impl From<TransportEvent> for TransportCommand {
    fn from(event: TransportEvent) -> Self {
        TransportCommand::Event(event)
    }
}

/// Turns transport notifications into the envelope's ramp direction.
pub struct TransportTracker {
    envelope: Envelope,
    durations: SharedDurations,
    drain: DrainCoordinator,
}

impl TransportTracker {
    pub fn new(envelope: Envelope, durations: SharedDurations) -> TransportTracker {
        TransportTracker::with_drain(envelope, durations, DrainCoordinator::new())
    }

    pub fn with_drain(
        envelope: Envelope,
        durations: SharedDurations,
        drain: DrainCoordinator,
    ) -> TransportTracker {
        TransportTracker {
            envelope,
            durations,
            drain,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Whether the envelope is headed for full volume.
    pub fn is_playing(&self) -> bool {
        self.envelope.direction().is_fading_in()
    }

    /// The event a command stands for, given the current direction.
    pub fn resolve(&self, command: TransportCommand) -> TransportEvent {
        match command {
            TransportCommand::Event(event) => event,
            TransportCommand::TogglePause => TransportEvent::TogglePause {
                playing: self.is_playing(),
            },
        }
    }

    /// Switches the direction without waiting. The latest event wins, and
    /// the ramp reverses from wherever it currently is.
    pub fn apply(&self, event: TransportEvent) -> RampDirection {
        let direction = event.direction();
        self.envelope.set_direction(direction);
        debug!("{} -> {:?}", event, direction);
        direction
    }

    /// Applies `event`; on a fade-out, blocks until the audio has gone
    /// silent. Returns the time spent waiting.
    pub fn notify(&self, event: TransportEvent) -> Duration {
        let direction = self.apply(event);
        if direction.is_fading_in() {
            Duration::from_millis(0)
        } else {
            self.drain.drain(&self.envelope, &self.durations.load())
        }
    }
}

/// Runs `tracker` on its own event-delivery thread. Commands sent on the
/// returned channel are delivered in order; the thread exits once every
/// sender is dropped.
pub fn spawn_delivery(
    tracker: TransportTracker,
) -> (channel::Sender<TransportCommand>, thread::JoinHandle<()>) {
    let (sender, receiver) = channel::unbounded::<TransportCommand>();
    let join = thread::spawn(move || {
        for command in receiver.iter() {
            let event = tracker.resolve(command);
            let waited = tracker.notify(event);
            if waited > Duration::from_millis(0) {
                info!("{}: faded out after {:?}", event, waited);
            }
        }
    });
    (sender, join)
}
