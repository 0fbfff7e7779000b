// ── Device registry ──
//
// Concurrent map of known devices keyed by device id, with a sorted
// snapshot pushed through a `watch` channel on every mutation. Discovery
// registers and refreshes entries; only `remove` ever drops one.

mod stream;

pub use stream::{DeviceStream, DeviceWatchStream};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::device::Device;

pub(crate) type Snapshot = Arc<Vec<Device>>;

pub(crate) struct DeviceRegistry {
    by_id: DashMap<String, Device>,
    snapshot: watch::Sender<Snapshot>,
}

impl DeviceRegistry {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, id: String, device: Device) -> bool {
        let is_new = self.by_id.insert(id, device).is_none();
        self.rebuild_snapshot();
        is_new
    }

    pub(crate) fn get(&self, id: &str) -> Option<Device> {
        self.by_id.get(id).map(|r| r.value().clone())
    }

    pub(crate) fn remove(&self, id: &str) -> Option<Device> {
        let removed = self.by_id.remove(id).map(|(_, d)| d);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    /// Re-publish after an in-place change (presence, address).
    pub(crate) fn touch(&self) {
        self.rebuild_snapshot();
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    fn rebuild_snapshot(&self) {
        let mut values: Vec<(String, Device)> = self
            .by_id
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        let devices = values.into_iter().map(|(_, d)| d).collect();
        self.snapshot.send_modify(|snap| *snap = Arc::new(devices));
    }
}
