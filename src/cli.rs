use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use tui_video::engine::{WorkerArgs, WORKER_SUBCOMMAND};
use tui_video::transport::RingConfig;
use tui_video::types::{GridGeometry, DEFAULT_RESOLUTION, DEFAULT_THRESHOLD};

/// Play a video in the terminal with half-block characters.
#[derive(Parser, Debug)]
#[command(
    name = "tui-video",
    version,
    about,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Video file to play.
    #[arg(required = true)]
    pub path: Option<PathBuf>,

    /// Grid height in pixel rows (rounded up to even).
    #[arg(short, long, default_value_t = DEFAULT_RESOLUTION)]
    pub size: u16,

    /// Weighted color change a cell must exceed to be redrawn.
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: u32,

    /// Send per-frame stats as JSON over UDP (see TUI_VIDEO_DEBUG_HOST/PORT).
    #[arg(long)]
    pub debug: bool,

    /// Play without audio.
    #[arg(long)]
    pub mute: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = WORKER_SUBCOMMAND, hide = true)]
    EncodeWorker(WorkerCli),
}

#[derive(Args, Debug)]
pub struct WorkerCli {
    #[arg(long)]
    width: u16,
    #[arg(long)]
    height: u16,
    #[arg(long)]
    threshold: u32,
    #[arg(long)]
    region: String,
    #[arg(long)]
    slot_size: usize,
    #[arg(long)]
    slots: usize,
    path: PathBuf,
}

impl WorkerCli {
    pub fn into_worker_args(self) -> Result<WorkerArgs> {
        let geometry = GridGeometry::new(self.width, self.height)
            .with_context(|| format!("invalid grid {}x{}", self.width, self.height))?;
        Ok(WorkerArgs {
            path: self.path,
            geometry,
            threshold: self.threshold,
            region: self.region,
            ring: RingConfig {
                slot_size: self.slot_size,
                slot_count: self.slots,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_flags_parse_with_defaults() {
        let cli = Cli::try_parse_from(["tui-video", "clip.mp4"]).unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("clip.mp4")));
        assert_eq!(cli.size, 32);
        assert_eq!(cli.threshold, 150);
        assert!(!cli.debug && !cli.mute);
        assert!(cli.command.is_none());
    }

    #[test]
    fn path_is_required_for_playback() {
        assert!(Cli::try_parse_from(["tui-video"]).is_err());
    }

    #[test]
    fn worker_args_survive_the_command_line() {
        let args = WorkerArgs {
            path: PathBuf::from("/v/a b.mp4"),
            geometry: GridGeometry::new(57, 32).unwrap(),
            threshold: 90,
            region: "/tui-video-7-0-ab".into(),
            ring: RingConfig {
                slot_size: 1024,
                slot_count: 8,
            },
        };
        let mut argv: Vec<std::ffi::OsString> = vec!["tui-video".into(), WORKER_SUBCOMMAND.into()];
        argv.extend(args.to_cli_args());

        let cli = Cli::try_parse_from(argv).unwrap();
        let Some(Command::EncodeWorker(worker)) = cli.command else {
            panic!("expected worker subcommand");
        };
        assert_eq!(worker.into_worker_args().unwrap(), args);
    }
}
