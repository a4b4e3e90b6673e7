use crate::params::SharedDurations;
use crate::stream::FadeStream;
use crate::transport::{ParseEventError, TransportEvent};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    WavError(#[from] hound::Error),

    #[error(transparent)]
    EventError(#[from] ParseEventError),

    #[error("invalid event time \"{0}\", expected <seconds>:<event>")]
    InvalidTime(String),
}

/// A transport event at a point of the input, `<seconds>:<event>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub at_secs: f64,
    pub event: TransportEvent,
}

impl FromStr for ScheduledEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (at, event) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidTime(s.to_string()))?;
        let at_secs = match at.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs >= 0.0 => secs,
            _ => return Err(Error::InvalidTime(s.to_string())),
        };
        Ok(ScheduledEvent {
            at_secs,
            event: event.parse()?,
        })
    }
}

pub struct RenderOptions {
    pub block_frames: usize,
    pub events: Vec<ScheduledEvent>,
    /// Stop on the last block boundary that leaves room for the whole stop
    /// fade before the input ends.
    pub fade_out_tail: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            block_frames: 512,
            events: vec![],
            fade_out_tail: true,
        }
    }
}

/// Fades interleaved `samples` in place, as a player would deliver them
/// block by block.
///
/// Events take effect at the start of the first block at or after their
/// time. Transitions are applied without the wall-clock drain, since
/// nothing plays in real time here.
pub fn render_samples(
    samples: &mut [f32],
    channels: usize,
    sample_rate: u32,
    shared: &SharedDurations,
    options: &RenderOptions,
) {
    let channels = channels.max(1);
    let block_frames = options.block_frames.max(1);
    let total_frames = samples.len() / channels;

    let mut schedule: Vec<(usize, TransportEvent)> = options
        .events
        .iter()
        .map(|e| ((e.at_secs * sample_rate as f64) as usize, e.event))
        .collect();
    if options.fade_out_tail {
        let stop_frames =
            (shared.load().stop_ms as f64 * sample_rate as f64 / 1000.0) as usize;
        let at = total_frames.saturating_sub(stop_frames) / block_frames * block_frames;
        schedule.push((at, TransportEvent::Stop));
    }
    schedule.sort_by_key(|&(frame, _)| frame);

    let mut stream = FadeStream::open(shared);
    let mut pending = schedule.into_iter().peekable();
    let mut frame_offset = 0;
    for block in samples.chunks_mut(block_frames * channels) {
        let block_end = frame_offset + block.len() / channels;
        while let Some(&(at, event)) = pending.peek() {
            // inside this block: takes effect on the next one
            if at > frame_offset {
                break;
            }
            debug!("frame {}: {}", frame_offset, event);
            stream.tracker().apply(event);
            pending.next();
        }
        let frames = block.len() / channels;
        stream.processor().process(block, frames, channels, sample_rate);
        frame_offset = block_end;
    }
    stream.close();
}

fn read_samples<R: std::io::Read>(reader: hound::WavReader<R>) -> Result<Vec<f32>, Error> {
    let spec = reader.spec();
    match spec.sample_format {
        hound::SampleFormat::Float => Ok(reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?),
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            Ok(reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?)
        }
    }
}

/// Reads `input`, fades it and writes a 32-bit float WAV to `output`.
/// Returns the number of frames written.
pub fn render(
    input: &Path,
    output: &Path,
    shared: &SharedDurations,
    options: &RenderOptions,
) -> Result<usize, Error> {
    let reader = hound::WavReader::open(input)?;
    let in_spec = reader.spec();
    let mut samples = read_samples(reader)?;
    let channels = in_spec.channels as usize;
    info!(
        "Rendering {} ({} Hz, {} channels, {} frames)",
        input.display(),
        in_spec.sample_rate,
        channels,
        samples.len() / channels.max(1)
    );

    render_samples(&mut samples, channels, in_spec.sample_rate, shared, options);

    let spec = hound::WavSpec {
        channels: in_spec.channels,
        sample_rate: in_spec.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, spec)?;
    for sample in samples.iter() {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    info!("Wrote {}", output.display());
    Ok(samples.len() / channels.max(1))
}
