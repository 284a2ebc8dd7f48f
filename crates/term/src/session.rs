//! TerminalSession: owns the terminal for the duration of playback.
//!
//! Entering hides the cursor, switches to the alternate screen and clears it
//! (scrollback included). Restoring undoes all of it. Restoration also runs
//! from `Drop`, so every exit path (early return, `?`, panic unwind) leaves
//! the terminal usable.

use std::io::{self, Write};

use crossterm::{
    cursor,
    style::{Attribute, ResetColor, SetAttribute},
    terminal, QueueableCommand,
};
use tui_video_core::VideoResult;

/// Destination for encoded frames.
pub trait FrameSink {
    /// Write one encoded frame at the fixed origin. Empty frames are a no-op.
    fn write_frame(&mut self, bytes: &[u8]) -> VideoResult<()>;
}

pub struct TerminalSession<W: Write = io::Stdout> {
    out: W,
    buf: Vec<u8>,
    active: bool,
}

impl TerminalSession<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSession<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: Vec::with_capacity(64 * 1024),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn enter(&mut self) -> VideoResult<()> {
        self.buf.clear();
        self.buf.queue(terminal::EnterAlternateScreen)?;
        self.buf.queue(cursor::Hide)?;
        self.buf.queue(terminal::DisableLineWrap)?;
        self.buf.queue(terminal::Clear(terminal::ClearType::All))?;
        self.buf.queue(terminal::Clear(terminal::ClearType::Purge))?;
        self.buf.queue(cursor::MoveTo(0, 0))?;
        self.flush_buf()?;
        self.active = true;
        Ok(())
    }

    /// Reset colors, clear, and show the cursor. Idempotent.
    pub fn restore(&mut self) -> VideoResult<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.buf.clear();
        self.buf.queue(ResetColor)?;
        self.buf.queue(SetAttribute(Attribute::Reset))?;
        self.buf.queue(terminal::Clear(terminal::ClearType::All))?;
        self.buf.queue(terminal::EnableLineWrap)?;
        self.buf.queue(cursor::Show)?;
        self.buf.queue(terminal::LeaveAlternateScreen)?;
        self.flush_buf()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        self.out.write_all(&self.buf)?;
        self.out.flush()
    }
}

impl<W: Write> FrameSink for TerminalSession<W> {
    fn write_frame(&mut self, bytes: &[u8]) -> VideoResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.buf.clear();
        self.buf.queue(cursor::MoveTo(0, 0))?;
        self.buf.extend_from_slice(bytes);
        self.flush_buf()?;
        Ok(())
    }
}

impl<W: Write> Drop for TerminalSession<W> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!("terminal restore failed: {e}");
        }
    }
}
