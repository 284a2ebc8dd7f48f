//! Terminal video player (default binary).
//!
//! The same binary runs in two roles: the player (default), and the encoder
//! worker it re-executes with a hidden subcommand.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;

use tui_video::engine::{run_worker, PlaybackOptions, VideoDecoder, WorkerLauncher};
use tui_video::sync::{FfplayAudio, PlaybackLoop};
use tui_video::telemetry::{TelemetryConfig, TelemetrySender};
use tui_video::term::TerminalSession;
use tui_video::transport::RingConfig;
use tui_video::{logging, signal};

use cli::{Cli, Command};

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let log_path = logging::log_path();

    if let Some(Command::EncodeWorker(worker)) = cli.command.take() {
        if let Err(e) = logging::init_global(&log_path, false) {
            eprintln!("encoder worker: logging to {} disabled: {e}", log_path.display());
        }
        let args = worker.into_worker_args()?;
        run_worker(&args)
            .inspect_err(|e| tracing::error!("encoder worker failed: {e}"))
            .context("encoder worker failed")?;
        return Ok(());
    }

    // Reported before the terminal is taken over, so it stays visible.
    if let Err(e) = logging::init_global(&log_path, true) {
        eprintln!("logging to {} disabled: {e}", log_path.display());
    }
    signal::install_cancel_handlers();
    play(&cli)
}

fn play(cli: &Cli) -> Result<()> {
    let path = cli.path.as_deref().context("no video path given")?;
    let options = PlaybackOptions {
        resolution: cli.size,
        threshold: cli.threshold,
        ring: RingConfig::from_env(),
        ..PlaybackOptions::default()
    };

    // Fails on a bad source before the terminal is touched.
    let launcher = WorkerLauncher::current_exe()?;
    let mut stream = VideoDecoder::start(path, options, &launcher)
        .with_context(|| format!("cannot play {}", path.display()))?;

    let mut player = PlaybackLoop::new(stream.frame_rate(), stream.total_frames());
    if stream.has_audio() && !cli.mute {
        player = player.with_audio(
            FfplayAudio::new(path).with_start_latency(FfplayAudio::start_latency_from_env()),
        );
    }
    if cli.debug {
        match TelemetrySender::start(TelemetryConfig::from_env()) {
            Ok(telemetry) => player = player.with_telemetry(telemetry),
            Err(e) => tracing::warn!("telemetry disabled: {e}"),
        }
    }

    let mut term = TerminalSession::stdout();
    term.enter()?;

    let result = player.run(&mut stream, &mut term, signal::cancel_flag());

    // Always try to restore terminal state before reporting anything.
    let restored = term.restore();
    if let Err(e) = stream.shutdown() {
        tracing::warn!("shutdown: {e}");
    }

    let report = result.context("playback failed")?;
    restored?;
    tracing::info!(
        frames = report.frames_shown,
        cancelled = report.cancelled,
        "done"
    );
    Ok(())
}
