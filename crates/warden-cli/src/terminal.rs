// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::io::{self, IsTerminal};
use warden_console::{SecretEcho, VisibleInput};

/// Picks the echo hook for this process's stdin.
pub fn secret_echo() -> Box<dyn SecretEcho> {
    if io::stdin().is_terminal() {
        return Box::new(TerminalEcho::default());
    }
    Box::new(VisibleInput)
}

/// Turns terminal echo off while the admin secret is typed. The newline is
/// still echoed so the frame starts on a fresh line.
#[derive(Default)]
pub struct TerminalEcho {
    #[cfg(unix)]
    saved: Option<rustix::termios::Termios>,
}

#[cfg(unix)]
impl SecretEcho for TerminalEcho {
    fn set_masked(&mut self, masked: bool) -> Result<()> {
        use anyhow::Context;
        use rustix::termios::{LocalModes, OptionalActions, tcgetattr, tcsetattr};

        let stdin = io::stdin();
        if masked {
            if self.saved.is_some() {
                return Ok(());
            }
            let original = tcgetattr(&stdin).context("read terminal mode")?;
            let mut hidden = original.clone();
            hidden.local_modes.remove(LocalModes::ECHO);
            hidden.local_modes.insert(LocalModes::ECHONL);
            tcsetattr(&stdin, OptionalActions::Now, &hidden).context("hide secret input")?;
            self.saved = Some(original);
        } else if let Some(original) = self.saved.take() {
            tcsetattr(&stdin, OptionalActions::Now, &original)
                .context("restore terminal echo")?;
        }
        Ok(())
    }
}

#[cfg(not(unix))]
impl SecretEcho for TerminalEcho {
    fn set_masked(&mut self, _masked: bool) -> Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for TerminalEcho {
    fn drop(&mut self) {
        if let Some(original) = self.saved.take() {
            let _ = rustix::termios::tcsetattr(
                io::stdin(),
                rustix::termios::OptionalActions::Now,
                &original,
            );
        }
    }
}
