//! Shutdown coordination.
//!
//! The signal task owns a `Shutdown` and triggers it; `HttpServer::run`
//! holds a receiver and stops accepting connections once it fires, letting
//! in-flight requests (and their login outcomes) finish.

use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for a server or helper task to await.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire once; receivers that already dropped are ignored.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Receivers still waiting, i.e. servers not yet stopped.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
