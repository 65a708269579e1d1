//! Output relay between sandbox processes and terminal surfaces.
//!
//! Chunks are appended in arrival order (raw, not line-buffered) and kept in
//! a replay buffer so a terminal attaching after output has started still
//! sees prior chunks. Writing never blocks the producing process.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

const LIVE_CHANNEL_CAPACITY: usize = 1024;

/// Cheap-to-clone handle to a shared, append-only output stream.
#[derive(Debug, Clone)]
pub struct OutputRelay {
    buffer: Arc<Mutex<Vec<String>>>,
    live: broadcast::Sender<String>,
}

impl Default for OutputRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputRelay {
    /// Creates an empty relay.
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            live,
        }
    }

    /// Appends a chunk and fans it out to live subscribers.
    ///
    /// Never blocks: subscribers that fall behind miss chunks on their live
    /// receiver but can always re-read the replay buffer.
    pub fn write(&self, chunk: impl Into<String>) {
        let chunk = chunk.into();
        self.lock().push(chunk.clone());
        let _ = self.live.send(chunk);
    }

    /// Attaches a consumer: everything written so far, plus a live receiver
    /// for what comes next.
    pub fn attach(&self) -> (Vec<String>, broadcast::Receiver<String>) {
        // Lock before subscribing so no chunk lands in neither the replay
        // nor the receiver.
        let buffer = self.lock();
        let receiver = self.live.subscribe();
        (buffer.clone(), receiver)
    }

    /// A copy of everything written so far.
    pub fn replay(&self) -> Vec<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }
}
