// src/progress.rs

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam::channel::Sender;

/// One-way sink for human-readable progress lines.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

impl ProgressSink for Sender<String> {
    fn report(&self, message: &str) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.send(message.to_string());
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str) {}
}

/// Cooperative cancellation flag shared between the caller and a running batch.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sets the token when the process receives SIGINT (Ctrl-C).
    pub fn cancel_on_interrupt(&self) -> std::io::Result<()> {
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&self.flag))?;
        Ok(())
    }
}
