use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport_fade::config::{self, Config};
use transport_fade::params::{self, FadeParams, SharedDurations};
use transport_fade::render::{self, RenderOptions, ScheduledEvent};
use transport_fade::stream;

#[derive(Parser, Debug)]
#[command(name = "transport_fade")]
#[command(about = "Fades audio in and out on playback start, stop, pause and seek")]
#[command(version)]
struct Args {
    /// Config file holding the fade durations
    #[arg(short, long, env = "TRANSPORT_FADE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fade a WAV file as if it were played, paused and seeked
    Render {
        input: PathBuf,
        output: PathBuf,

        /// Transport event at a point of the input, e.g. 2.5:pause
        #[arg(short, long = "event")]
        events: Vec<ScheduledEvent>,

        /// Frames per processed block
        #[arg(long, default_value = "512")]
        block_frames: usize,

        /// Do not fade out at the end of the input
        #[arg(long)]
        no_tail: bool,
    },

    /// List the parameters and their current values
    Params,

    /// Set a parameter by index and save it to the config file
    Set { index: usize, value: String },

    /// Fade a stereo JACK stream, reading transport events from stdin
    #[cfg(feature = "jack")]
    Run,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transport_fade=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config_file = args.config.unwrap_or_else(config::default_path);
    let config = Config::load(&config_file)
        .with_context(|| format!("Failed to load {}", config_file.display()))?;
    let shared = SharedDurations::new(config.durations);

    match args.command {
        Command::Render {
            input,
            output,
            events,
            block_frames,
            no_tail,
        } => {
            let options = RenderOptions {
                block_frames,
                events,
                fade_out_tail: !no_tail,
            };
            let frames = render::render(&input, &output, &shared, &options)
                .with_context(|| format!("Failed to render {}", input.display()))?;
            info!("Rendered {} frames", frames);
        }
        Command::Params => {
            let fade_params = FadeParams::new(shared);
            println!(
                "{} ({}): {}",
                stream::PLUGIN_NAME,
                stream::PLUGIN_ID,
                stream::PLUGIN_DESCRIPTION
            );
            for index in 0..params::num_params() {
                println!(
                    "{}: {} = {}",
                    index,
                    params::param_name(index),
                    fade_params.get(index)
                );
            }
            print!("{}", params::config_dialog());
        }
        Command::Set { index, value } => {
            let mut fade_params = FadeParams::new(shared);
            fade_params
                .try_set(index, &value)
                .map_err(transport_fade::Error::from)?;
            Config {
                durations: fade_params.durations(),
            }
            .save(&config_file)
            .with_context(|| format!("Failed to save {}", config_file.display()))?;
            println!("{} = {}", params::param_name(index), fade_params.get(index));
        }
        #[cfg(feature = "jack")]
        Command::Run => {
            let stdin = std::io::stdin();
            transport_fade::jack_host::run(&shared, stdin.lock())
                .map_err(transport_fade::Error::from)?;
        }
    }
    Ok(())
}
