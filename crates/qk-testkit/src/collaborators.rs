use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use qk_model::{NotifyEvent, ParamData, WatchParam};
use qk_runtime::{BackendError, FeedSubscriber, Notifier, ParamSink};

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotifyEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<NotifyEvent> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &NotifyEvent) -> Result<(), BackendError> {
        self.sent.lock().push(event.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ParamSink
// ---------------------------------------------------------------------------

/// Keeps the latest snapshot per runner.
#[derive(Debug, Default)]
pub struct MemoryParamSink {
    saved: Mutex<BTreeMap<String, String>>,
    saves: Mutex<usize>,
}

impl MemoryParamSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packed(&self, runner: &str) -> Option<String> {
        self.saved.lock().get(runner).cloned()
    }

    /// The latest snapshot for `runner`, unpacked.
    pub fn restore(&self, runner: &str) -> Option<ParamData> {
        self.packed(runner)
            .and_then(|packed| ParamData::unpack(&packed).ok())
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl ParamSink for MemoryParamSink {
    fn save(&self, runner: &str, packed: &str) -> Result<(), BackendError> {
        self.saved
            .lock()
            .insert(runner.to_string(), packed.to_string());
        *self.saves.lock() += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FeedSubscriber
// ---------------------------------------------------------------------------

/// Accepts every watch type except those marked unsupported.
#[derive(Debug, Default)]
pub struct RecordingFeed {
    subscribed: Mutex<Vec<WatchParam>>,
    unsupported: BTreeSet<String>,
}

impl RecordingFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, watch_type: impl Into<String>) -> Self {
        self.unsupported.insert(watch_type.into());
        self
    }

    pub fn subscribed(&self) -> Vec<WatchParam> {
        self.subscribed.lock().clone()
    }
}

impl FeedSubscriber for RecordingFeed {
    fn subscribe(&self, watch: &WatchParam) -> Result<(), BackendError> {
        if self.unsupported.contains(&watch.watch_type) {
            return Err(BackendError::Unsupported(format!(
                "watch type {}",
                watch.watch_type
            )));
        }
        self.subscribed.lock().push(watch.clone());
        Ok(())
    }
}
