use crate::fader::FadeProcessor;
use crate::params::{FadeParams, SharedDurations};
use crate::stream::{FadeStream, PLUGIN_ID};
use crate::transport::{self, TransportCommand, TransportEvent};
use std::io::BufRead;
use thiserror::Error;
use tracing::{error, info, warn};

// Longest stretch handed to the fader at once; longer periods are split.
const SCRATCH_FRAMES: usize = 8192;

struct FadeClient {
    in_a: jack::Port<jack::AudioIn>,
    in_b: jack::Port<jack::AudioIn>,
    out_a: jack::Port<jack::AudioOut>,
    out_b: jack::Port<jack::AudioOut>,
    sample_rate: u32,

    processor: FadeProcessor,
    scratch: Vec<f32>, // interleaved a/b
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    JackError(#[from] jack::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl FadeClient {
    fn new(client: &jack::Client, processor: FadeProcessor) -> Result<FadeClient, Error> {
        Ok(FadeClient {
            in_a: client.register_port("in_a", jack::AudioIn::default())?,
            in_b: client.register_port("in_b", jack::AudioIn::default())?,
            out_a: client.register_port("out_a", jack::AudioOut::default())?,
            out_b: client.register_port("out_b", jack::AudioOut::default())?,
            sample_rate: client.sample_rate() as u32,
            processor,
            scratch: vec![0.0; SCRATCH_FRAMES * 2],
        })
    }

    fn process(&mut self, ps: &jack::ProcessScope) -> jack::Control {
        let in_a = self.in_a.as_slice(ps);
        let in_b = self.in_b.as_slice(ps);
        let out_a = self.out_a.as_mut_slice(ps);
        let out_b = self.out_b.as_mut_slice(ps);

        let frames = in_a.len().min(in_b.len());
        let mut offset = 0;
        while offset < frames {
            let n = usize::min(frames - offset, SCRATCH_FRAMES);
            for (i, frame) in self.scratch.chunks_mut(2).take(n).enumerate() {
                frame[0] = in_a[offset + i];
                frame[1] = in_b[offset + i];
            }
            self.processor
                .process(&mut self.scratch[..n * 2], n, 2, self.sample_rate);
            for (i, frame) in self.scratch.chunks(2).take(n).enumerate() {
                out_a[offset + i] = frame[0];
                out_b[offset + i] = frame[1];
            }
            offset += n;
        }

        jack::Control::Continue
    }
}

fn handle_set(params: &mut FadeParams, args: &str) {
    let mut words = args.split_whitespace();
    match (words.next().map(str::parse::<usize>), words.next()) {
        (Some(Ok(index)), Some(value)) => {
            params.set(index, value);
            info!("{} = {}", crate::params::param_name(index), params.get(index));
        }
        _ => warn!("usage: set <index> <value>"),
    }
}

/// Runs a stereo JACK client that fades `in_a`/`in_b` into `out_a`/`out_b`.
///
/// Reads one command per line from `commands`: a transport event name,
/// `toggle`, `set <index> <value>` or `quit`. Fades out before returning.
pub fn run<R: BufRead>(shared: &SharedDurations, commands: R) -> Result<(), Error> {
    let (client, _status) = jack::Client::new(PLUGIN_ID, jack::ClientOptions::NO_START_SERVER)?;

    let (mut params, processor, tracker) = FadeStream::open(shared).split();
    let mut fade = FadeClient::new(&client, processor)?;

    let process = jack::ClosureProcessHandler::new(
        move |_: &jack::Client, ps: &jack::ProcessScope| -> jack::Control { fade.process(ps) },
    );
    let active_client = client.activate_async((), process)?;
    info!("JACK client {} running", PLUGIN_ID);

    let (events, delivery) = transport::spawn_delivery(tracker);
    for line in commands.lines() {
        let line = line?;
        let command = line.trim();
        let event = match command {
            "" => continue,
            "quit" => break,
            "toggle" => TransportCommand::TogglePause,
            _ if command.starts_with("set ") => {
                handle_set(&mut params, &command[4..]);
                continue;
            }
            _ => match command.parse::<TransportEvent>() {
                Ok(event) => event.into(),
                Err(err) => {
                    warn!("{}", err);
                    continue;
                }
            },
        };
        if events.send(event).is_err() {
            break;
        }
    }

    if events.send(TransportEvent::Stop.into()).is_err() {
        error!("Event delivery stopped before the final fade-out");
    }
    drop(events);
    if delivery.join().is_err() {
        error!("Event delivery thread panicked");
    }

    active_client.deactivate()?;
    info!("JACK client {} stopped", PLUGIN_ID);
    Ok(())
}
