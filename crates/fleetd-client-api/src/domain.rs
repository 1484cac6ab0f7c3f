//! JSON-facing shapes. `fleetd_core` deliberately carries no `Serialize` for
//! its process state (only `LogRecord` does, since it crosses into
//! `fleetd-core`'s own tests); the process descriptor shown to callers is
//! assembled here from a supervisor's name/command/status.

use std::sync::Arc;

use fleetd_core::ProcessSupervisor;
use serde::{Deserialize, Serialize};

/// `{name, command, pid, returncode, running}` — the `running` field is a
/// convenience derived from `pid`/`returncode`, not present in spec.md's
/// literal JSON shape but added per SPEC_FULL.md so callers don't have to
/// reimplement the "pid set and no returncode yet" check themselves.
#[derive(Serialize)]
pub struct ProcessDescriptor {
    pub name: String,
    pub command: Vec<String>,
    pub pid: Option<u32>,
    pub returncode: Option<i32>,
    pub running: bool,
}

impl ProcessDescriptor {
    pub async fn from_supervisor(supervisor: &ProcessSupervisor) -> Self {
        let status = supervisor.status().await;
        Self {
            name: supervisor.name().to_string(),
            command: supervisor.command().to_vec(),
            pid: status.pid,
            returncode: status.returncode,
            running: status.running(),
        }
    }

    pub async fn from_supervisors(supervisors: &[Arc<ProcessSupervisor>]) -> Vec<Self> {
        let mut out = Vec::with_capacity(supervisors.len());
        for supervisor in supervisors {
            out.push(Self::from_supervisor(supervisor).await);
        }
        out
    }
}

/// Body of `POST /procs`.
#[derive(Deserialize)]
pub struct CreateProcessRequest {
    pub name: String,
    pub command: Vec<String>,
}
