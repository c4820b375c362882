// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The OS boundary: termios, terminal size, signal flags, and stdin I/O.
//!
//! Everything that talks to the kernel lives here so the editor proper can be
//! driven entirely through injected bytes and an injected output sink.

// Attach sources.
pub mod raw_mode;
pub mod signals;

// Re-export the public API.
pub use raw_mode::*;
pub use signals::*;

use rustix::event::{PollFd, PollFlags};
use rustix::io::Errno;

/// Block until stdin is readable or a signal arrives.
///
/// `poll(2)` is never restarted by `SA_RESTART`, so a `SIGINT`/`SIGWINCH`
/// delivered mid-wait surfaces as [`Errno::INTR`] and the event loop gets to
/// look at its flags.
///
/// # Errors
///
/// Propagates the raw [`Errno`], including `INTR`.
pub fn wait_for_stdin_readable() -> Result<(), Errno> {
    let stdin = rustix::stdio::stdin();
    let mut fds = [PollFd::new(&stdin, PollFlags::IN)];
    rustix::event::poll(&mut fds, -1)?;
    Ok(())
}

/// Whether stdin has bytes ready right now (zero-timeout poll).
///
/// # Errors
///
/// Propagates the raw [`Errno`].
pub fn stdin_readable_now() -> Result<bool, Errno> {
    let stdin = rustix::stdio::stdin();
    let mut fds = [PollFd::new(&stdin, PollFlags::IN)];
    let ready = rustix::event::poll(&mut fds, 0)?;
    Ok(ready > 0)
}

/// Read raw bytes from stdin.
///
/// # Errors
///
/// Propagates the raw [`Errno`], including `INTR`.
pub fn read_stdin(buf: &mut [u8]) -> Result<usize, Errno> {
    rustix::io::read(rustix::stdio::stdin(), buf)
}
