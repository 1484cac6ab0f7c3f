//! Name-keyed map of live [`ProcessSupervisor`]s, grounded on the
//! `Mutex<HashMap<u64, ModuleHost>>` shape `host_controller.rs`'s
//! `HostController` uses for its own instance table, generalized to string
//! names and to the creation/deletion lifecycle spec §3 describes for
//! `Registry`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SupervisorError;
use crate::supervisor::ProcessSupervisor;

/// Registered process names must match this character set. Stricter than
/// `original_source/app/config.py`'s `\w+` (which is Unicode-aware under
/// Python's `re`): spec.md pins this down to ASCII, so that wins.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Owns every supervisor known to this host, keyed by process name.
///
/// A name is a stable handle: once created, a supervisor is never replaced
/// in place, only removed (and only while its process isn't running).
#[derive(Default)]
pub struct Registry {
    supervisors: Mutex<HashMap<String, Arc<ProcessSupervisor>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a new supervisor for `name` running `command`.
    /// Does not start the process; callers call `start()` separately.
    pub fn create(&self, name: &str, command: Vec<String>) -> Result<Arc<ProcessSupervisor>, SupervisorError> {
        if !is_valid_name(name) {
            return Err(SupervisorError::InvalidName(name.to_string()));
        }
        if command.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }
        let mut supervisors = self.supervisors.lock();
        if supervisors.contains_key(name) {
            return Err(SupervisorError::AlreadyExists(name.to_string()));
        }
        let supervisor = Arc::new(ProcessSupervisor::new(name.to_string(), command));
        supervisors.insert(name.to_string(), supervisor.clone());
        Ok(supervisor)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ProcessSupervisor>> {
        self.supervisors.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.supervisors.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn list(&self) -> Vec<Arc<ProcessSupervisor>> {
        self.supervisors.lock().values().cloned().collect()
    }

    /// Remove `name` from the registry, refusing while its process is still
    /// running (returncode undefined). The caller must `stop()` first.
    pub async fn delete(&self, name: &str) -> Result<(), SupervisorError> {
        let supervisor = {
            let supervisors = self.supervisors.lock();
            supervisors.get(name).cloned().ok_or_else(|| SupervisorError::NotFound(name.to_string()))?
        };
        if !supervisor.status().await.deletable() {
            return Err(SupervisorError::StillRunning);
        }
        self.supervisors.lock().remove(name);
        Ok(())
    }
}
