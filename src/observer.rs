//! Re-render notification for UI units that displayed a placeholder text.

use tokio::sync::watch;

/// Something that can be asked to re-render.
pub trait Observer: Send + Sync {
    fn notify(&self);
}

impl<F> Observer for F
where
    F: Fn() + Send + Sync,
{
    fn notify(&self) {
        self()
    }
}

/// Observer backed by a watch channel carrying a revision counter.
/// Subscribers await `changed()` and re-read whatever they render.
pub struct WatchObserver {
    tx: watch::Sender<u64>,
}

impl WatchObserver {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for WatchObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for WatchObserver {
    fn notify(&self) {
        self.tx.send_modify(|rev| *rev += 1);
    }
}
