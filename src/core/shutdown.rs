//! # Cross-platform OS termination signals.
//!
//! Provides [`Signal`] and [`subscribe`], which forwards every delivery of the
//! requested signals into one channel.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT`
//! - `SIGHUP`
//!
//! **Windows platforms:**
//! - Ctrl-C via [`tokio::signal::ctrl_c`], reported as [`Signal::Interrupt`];
//!   the other signals are accepted and never fire.

use std::fmt;

use tokio::sync::mpsc;

/// Process termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT`.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGQUIT`.
    Quit,
    /// `SIGHUP`.
    Hangup,
}

impl Signal {
    /// The signal set handled when no explicit list is configured.
    pub const DEFAULT_SET: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];

    /// POSIX name (`"SIGINT"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
            Signal::Hangup => "SIGHUP",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs one listener per signal and forwards deliveries into a channel.
///
/// Listeners live until the returned receiver is dropped.
/// Returns `Err` if any registration fails; nothing is installed in that case.
#[cfg(unix)]
pub fn subscribe(signals: &[Signal]) -> std::io::Result<mpsc::UnboundedReceiver<Signal>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut streams = Vec::with_capacity(signals.len());
    for &sig in signals {
        let kind = match sig {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Quit => SignalKind::quit(),
            Signal::Hangup => SignalKind::hangup(),
        };
        streams.push((sig, signal(kind)?));
    }

    let (tx, rx) = mpsc::unbounded_channel();
    for (sig, mut stream) in streams {
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    got = stream.recv() => match got {
                        Some(()) => {
                            if tx.send(sig).is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });
    }
    Ok(rx)
}

/// Installs one listener per signal and forwards deliveries into a channel.
///
/// Only Ctrl-C is observable here; it is reported as [`Signal::Interrupt`].
#[cfg(not(unix))]
pub fn subscribe(signals: &[Signal]) -> std::io::Result<mpsc::UnboundedReceiver<Signal>> {
    let (tx, rx) = mpsc::unbounded_channel();
    if signals.contains(&Signal::Interrupt) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    res = tokio::signal::ctrl_c() => {
                        if res.is_err() || tx.send(Signal::Interrupt).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Signal::Interrupt.to_string(), "SIGINT");
        assert_eq!(Signal::Terminate.as_str(), "SIGTERM");
        assert_eq!(Signal::DEFAULT_SET, [Signal::Interrupt, Signal::Terminate]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subscribe_installs_listeners() {
        let rx = subscribe(&[Signal::Hangup]);
        assert!(rx.is_ok());
    }
}
