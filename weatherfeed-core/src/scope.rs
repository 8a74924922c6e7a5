//! Lifecycle scope for weather operations.
//!
//! A [`Scope`] spans one resume/pause interval. Operations spawned in it
//! deliver their updates to a single [`Inbox`]; pausing cancels all of them
//! at once and guarantees that nothing they produced is handed to the
//! listener afterwards, even if it was already queued.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::error::TransportError;

/// Display surface an update is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Once,
    Interval,
    Pair,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Once => "once",
            Surface::Interval => "interval",
            Surface::Pair => "pair",
        }
    }

    pub const fn all() -> &'static [Surface] {
        &[Surface::Once, Surface::Interval, Surface::Pair]
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the listener receives.
#[derive(Debug)]
pub struct Update {
    pub surface: Surface,
    pub outcome: Result<String, TransportError>,
}

#[derive(Debug)]
struct Envelope {
    token: CancellationToken,
    update: Update,
}

#[derive(Debug)]
pub struct Scope {
    token: CancellationToken,
    tracker: TaskTracker,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Scope {
    pub fn new() -> (Self, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scope = Self { token: CancellationToken::new(), tracker: TaskTracker::new(), tx };
        (scope, Inbox { rx })
    }

    /// Token of the current lifecycle span.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn emitter(&self, surface: Surface) -> Emitter {
        Emitter { surface, token: self.token.clone(), tx: self.tx.clone() }
    }

    pub fn spawn<F>(&self, task: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Cancel every outstanding operation and start a fresh span.
    pub fn pause(&mut self) {
        if !self.token.is_cancelled() {
            tracing::debug!(tasks = self.tracker.len(), "pausing scope");
        }
        self.token.cancel();
        self.token = CancellationToken::new();
    }

    /// Pause, then wait for every spawned task to finish.
    pub async fn shutdown(mut self) {
        self.pause();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Sending half bound to one surface and one lifecycle span.
#[derive(Debug, Clone)]
pub struct Emitter {
    surface: Surface,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Emitter {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `false` when the span was cancelled or the listener is gone.
    pub fn emit(&self, outcome: Result<String, TransportError>) -> bool {
        if self.token.is_cancelled() {
            tracing::debug!(surface = %self.surface, "dropping update from cancelled operation");
            return false;
        }

        let update = Update { surface: self.surface, outcome };
        self.tx.send(Envelope { token: self.token.clone(), update }).is_ok()
    }
}

/// Receiving half; the single listener of a scope.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Inbox {
    /// Next update from a live span, or `None` once the scope is gone.
    pub async fn recv(&mut self) -> Option<Update> {
        while let Some(envelope) = self.rx.recv().await {
            if envelope.token.is_cancelled() {
                tracing::debug!(surface = %envelope.update.surface, "discarding stale update");
                continue;
            }
            return Some(envelope.update);
        }
        None
    }

    /// Non-blocking variant of [`Inbox::recv`].
    pub fn try_recv(&mut self) -> Option<Update> {
        while let Ok(envelope) = self.rx.try_recv() {
            if !envelope.token.is_cancelled() {
                return Some(envelope.update);
            }
        }
        None
    }
}
