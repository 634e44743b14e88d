// SPDX-License-Identifier: MPL-2.0

mod animated;
mod clock;
mod draw;
mod error;
mod frame_list;
mod playlist;
mod power;
mod scaler;
mod sink;
mod timer;

#[cfg(test)]
mod testing;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use animated::{FrameOptions, GifDecoder, Pacing, Playback, Stage, StoragePlan};
use calloop::{
    EventLoop, LoopSignal,
    signals::{Signal, Signals},
    timer::{TimeoutAction, Timer},
};
use clap::{Parser, error::ErrorKind};
use clock::SystemClock;
use eyre::WrapErr;
use gifpaper_config::{Config, Crop, DEFAULT_SLIDE_INTERVAL, DisplayMode};
use power::{Power, SYSFS_POWER_SUPPLY};
use sink::SoftwareSink;
use timer::SlideTimer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type Wallpaper = Playback<GifDecoder, SoftwareSink, SystemClock, Power, SlideTimer<State>>;

/// Draw animated GIFs as the desktop wallpaper.
#[derive(Debug, Parser)]
#[command(name = "gifpaper", version, about)]
struct Args {
    /// GIF to play, or a directory of GIFs to rotate through
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Frames displayed per second
    #[arg(short, long)]
    framerate: Option<u32>,

    /// Switch to the next GIF in PATH every SECONDS
    #[arg(short, long = "slideshow", value_name = "SECONDS")]
    slide_interval: Option<u64>,

    /// Crop every frame to the region "X Y WIDTH HEIGHT"
    #[arg(short, long, value_name = "\"X Y WIDTH HEIGHT\"")]
    crop: Option<Crop>,

    /// Show the whole animation on every output
    #[arg(short, long, conflicts_with = "extend")]
    replicate: bool,

    /// Stretch one animation across all outputs
    #[arg(short, long)]
    extend: bool,

    /// Pause animation while running on battery
    #[arg(short, long)]
    power_save: bool,

    /// Fraction of frames to keep realized, from 0 to 1
    #[arg(short = 'l', long, value_name = "RATIO")]
    memory_load: Option<f32>,

    /// Configuration file to use instead of the default one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

struct State {
    playback: Option<Wallpaper>,
    failure: Option<error::Error>,
    signal: LoopSignal,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(why) => {
            let _ = why.print();
            match why.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => std::process::exit(0),
                _ => std::process::exit(-1),
            }
        }
    };

    if let Err(why) = color_eyre::install() {
        eprintln!("failed to install error reporter: {why}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(why) = run(&args) {
        error!("{why:#}");
        std::process::exit(-1);
    }
}

/// Config file, then command line overrides.
fn configure(args: &Args) -> eyre::Result<Config> {
    let mut config = Config::load_or_default(args.config.as_deref()).wrap_err("failed to load config")?;

    if let Some(framerate) = args.framerate {
        config = config.framerate(framerate);
    }

    if let Some(seconds) = args.slide_interval {
        config = config.slide_interval(seconds);
    }

    if let Some(crop) = args.crop {
        config = config.crop(crop);
    }

    if args.replicate {
        config = config.display_mode(DisplayMode::Replicate);
    } else if args.extend {
        config = config.display_mode(DisplayMode::Extend);
    }

    if args.power_save {
        config = config.power_save(true);
    }

    if let Some(load) = args.memory_load {
        config = config.memory_load(load);
    }

    config.validate().wrap_err("invalid configuration")?;
    Ok(config)
}

/// A directory always rotates, at the default interval if none was set. A
/// single file plays on its own whatever the interval.
fn slide_interval(config: &Config, path: &Path) -> Option<Duration> {
    let interval = config.slide_duration();

    if !path.is_dir() {
        if let Some(interval) = interval {
            warn!(path = %path.display(), ?interval, "not a directory, ignoring the slide interval");
        }
        return None;
    }

    Some(interval.unwrap_or(Duration::from_secs(DEFAULT_SLIDE_INTERVAL)))
}

fn schedule(pacing: Pacing) -> TimeoutAction {
    TimeoutAction::ToDuration(pacing.delay())
}

fn run(args: &Args) -> eyre::Result<()> {
    let config = configure(args)?;

    let mut event_loop: EventLoop<'static, State> =
        EventLoop::try_new().wrap_err("failed to create event loop")?;

    let stage = Stage {
        sink: SoftwareSink::new(&config),
        clock: SystemClock,
        power: Power::new(config.power_save, SYSFS_POWER_SUPPLY),
        budget: config.frame_budget(),
    };

    let options = FrameOptions {
        plan: StoragePlan::from_memory_load(config.memory_load),
        crop: config.crop,
    };

    let playback = match slide_interval(&config, &args.path) {
        Some(interval) => {
            let handle = event_loop.handle();
            info!(dir = %args.path.display(), ?interval, "starting slideshow");
            Playback::slideshow(
                &args.path,
                config.sampling_method,
                GifDecoder,
                options,
                stage,
                move || SlideTimer::new(handle, interval),
            )?
        }
        None => Playback::single(&args.path, &GifDecoder, &options, stage)?,
    };

    info!(
        frames = playback.player().frames().len(),
        budget = ?config.frame_budget(),
        "playing"
    );

    event_loop
        .handle()
        .insert_source(Timer::immediate(), |_, _, state: &mut State| {
            let Some(playback) = state.playback.as_mut() else {
                return TimeoutAction::Drop;
            };

            match playback.step() {
                Ok(pacing) => schedule(pacing),
                Err(why) => {
                    state.failure = Some(why);
                    state.signal.stop();
                    TimeoutAction::Drop
                }
            }
        })
        .map_err(|why| why.error)
        .wrap_err("failed to schedule frames")?;

    let signals = Signals::new(&[Signal::SIGINT, Signal::SIGTERM]).wrap_err("failed to watch signals")?;
    event_loop
        .handle()
        .insert_source(signals, |event, _, state: &mut State| {
            info!(signal = ?event.signal(), "shutting down");
            state.signal.stop();
        })
        .map_err(|why| why.error)
        .wrap_err("failed to watch signals")?;

    let mut state = State {
        playback: Some(playback),
        failure: None,
        signal: event_loop.get_signal(),
    };

    event_loop
        .run(None, &mut state, |_| {})
        .wrap_err("event loop failed")?;

    if let Some(playback) = state.playback.take() {
        let stage = playback.release();
        info!(live = stage.sink.live_surfaces(), "released all frames");
    }

    match state.failure.take() {
        Some(why) => Err(why.into()),
        None => Ok(()),
    }
}
