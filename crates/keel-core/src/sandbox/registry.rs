//! Registry of processes the sandbox is currently running.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use jiff::Timestamp;
use log::debug;
use tokio::sync::Notify;

use crate::{
    error::{KeelError, Result},
    models::ProcessRecord,
};

#[derive(Debug)]
struct Entry {
    record: ProcessRecord,
    cancel: Arc<Notify>,
}

/// Running processes keyed by tracking ID.
///
/// Each entry carries a cancellation handle. [`ProcessRegistry::kill`] only
/// flags the record and fires the handle; the task waiting on the process
/// performs the actual termination. The entry lives as long as the
/// [`Registration`] returned by `register`.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly spawned process until the returned registration is
    /// dropped.
    pub(crate) fn register(
        &self,
        tracking_id: &str,
        pid: u32,
        command: &str,
        work_dir: PathBuf,
    ) -> Registration<'_> {
        let cancel = Arc::new(Notify::new());
        let record = ProcessRecord {
            tracking_id: tracking_id.to_string(),
            pid,
            command: command.to_string(),
            work_dir,
            started_at: Timestamp::now(),
            killed: false,
        };
        debug!("Registered process {pid} as {tracking_id}");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                tracking_id.to_string(),
                Entry {
                    record,
                    cancel: Arc::clone(&cancel),
                },
            );
        Registration {
            registry: self,
            tracking_id: tracking_id.to_string(),
            cancel,
        }
    }

    fn unregister(&self, tracking_id: &str) {
        if self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tracking_id)
            .is_some()
        {
            debug!("Unregistered process {tracking_id}");
        }
    }

    /// Running processes, oldest first.
    pub fn list(&self) -> Vec<ProcessRecord> {
        let mut records: Vec<ProcessRecord> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.tracking_id.cmp(&b.tracking_id))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Request termination of a process by tracking ID or OS pid.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::ProcessNotFound` if nothing running matches.
    pub fn kill(&self, target: &str) -> Result<ProcessRecord> {
        let target = target.trim();
        let pid = target.parse::<u32>().ok();

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .values_mut()
            .find(|entry| entry.record.tracking_id == target || Some(entry.record.pid) == pid)
            .ok_or_else(|| KeelError::ProcessNotFound {
                target: target.to_string(),
            })?;

        entry.record.killed = true;
        // A stored permit survives until the waiting task polls for it
        entry.cancel.notify_one();
        Ok(entry.record.clone())
    }
}

/// A registry entry for one running process, removed on drop.
#[derive(Debug)]
pub(crate) struct Registration<'a> {
    registry: &'a ProcessRegistry,
    tracking_id: String,
    cancel: Arc<Notify>,
}

impl Registration<'_> {
    /// Fires when the process is killed through the registry.
    pub fn cancel(&self) -> &Notify {
        &self.cancel
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.unregister(&self.tracking_id);
    }
}
