//! Fades a stream's audio in and out around playback transport events.
//!
//! One [`stream::FadeStream`] per open audio stream: its
//! [`fader::FadeProcessor`] runs on the real-time thread, its
//! [`transport::TransportTracker`] on the thread delivering transport events,
//! where a fade-out blocks until the audio has gone silent.

pub mod config;
pub mod curve;
pub mod drain;
pub mod error;
pub mod fader;
#[cfg(feature = "jack")]
pub mod jack_host;
pub mod params;
pub mod ramp;
pub mod render;
pub mod stream;
pub mod transport;

pub use error::Error;
