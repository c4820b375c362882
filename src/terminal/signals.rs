// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Signal handling: flags only.
//!
//! The handlers registered here do nothing but set an [`AtomicBool`]; the
//! event loop notices the flags on its next iteration. No buffer, termios, or
//! allocator state is ever touched from signal context.

use miette::miette;
use signal_hook::consts::{SIGINT, SIGWINCH};
use signal_hook::SigId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct SignalFlags {
    interrupted: Arc<AtomicBool>,
    resized: Arc<AtomicBool>,
    signal_ids: [SigId; 2],
}

impl SignalFlags {
    /// Install `SIGINT` and `SIGWINCH` flag handlers.
    ///
    /// # Errors
    ///
    /// Returns a miette diagnostic when handler registration fails.
    pub fn register() -> miette::Result<Self> {
        let interrupted = Arc::new(AtomicBool::new(false));
        let resized = Arc::new(AtomicBool::new(false));

        let sigint_id = signal_hook::flag::register(SIGINT, interrupted.clone())
            .map_err(|e| miette!("failed to register SIGINT handler: {e}"))?;
        let sigwinch_id = signal_hook::flag::register(SIGWINCH, resized.clone())
            .map_err(|e| {
                signal_hook::low_level::unregister(sigint_id);
                miette!("failed to register SIGWINCH handler: {e}")
            })?;

        Ok(Self {
            interrupted,
            resized,
            signal_ids: [sigint_id, sigwinch_id],
        })
    }

    /// Consume the interrupt flag: returns `true` at most once per signal.
    #[must_use]
    pub fn take_interrupted(&self) -> bool {
        self.interrupted.swap(false, Ordering::Relaxed)
    }

    /// Consume the resize flag: returns `true` at most once per signal.
    #[must_use]
    pub fn take_resized(&self) -> bool {
        self.resized.swap(false, Ordering::Relaxed)
    }

    pub fn set_interrupted(&self) {
        self.interrupted.store(true, Ordering::Relaxed);
    }

    pub fn unregister(&self) {
        for id in self.signal_ids {
            signal_hook::low_level::unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_consumed_once() {
        let flags = SignalFlags::register().unwrap();
        assert!(!flags.take_interrupted());

        flags.set_interrupted();
        assert!(flags.take_interrupted());
        assert!(!flags.take_interrupted());

        flags.unregister();
    }
}
