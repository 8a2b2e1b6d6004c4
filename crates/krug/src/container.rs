//! Container record and handle.

use std::path::PathBuf;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use krug_common::ContainerId;
use krug_network::{HostNetworkSpec, NetworkSettings};

use crate::state::ContainerStatus;

/// The mutable, persisted portion of a container's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    /// Container ID.
    pub id: String,
    /// Container name.
    pub name: String,
    /// Container status.
    pub status: ContainerStatus,
    /// Process ID of the container init process, when running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Configured or synthesized hostname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Path of the container's hostname file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname_path: Option<PathBuf>,
    /// Path of the container's hosts file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts_path: Option<PathBuf>,
    /// Path of the container's resolv.conf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolv_conf_path: Option<PathBuf>,
    /// Networks the container is attached to; created lazily on first
    /// successful attach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_settings: Option<NetworkSettings>,
}

impl ContainerRecord {
    /// Create a fresh record for a container that has not been started.
    #[must_use]
    pub fn new(id: &ContainerId, name: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            name: name.into(),
            status: ContainerStatus::Created,
            pid: None,
            hostname: None,
            hostname_path: None,
            hosts_path: None,
            resolv_conf_path: None,
            network_settings: None,
        }
    }
}

/// A container as the network subsystem sees it.
///
/// The host network specification is immutable for the lifetime of the
/// container; the record behind the lock is shared with every caller
/// operating on this container ID.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    host_spec: HostNetworkSpec,
    record: RwLock<ContainerRecord>,
}

impl Container {
    /// Create a container handle with a fresh record.
    #[must_use]
    pub fn new(id: ContainerId, name: impl Into<String>, host_spec: HostNetworkSpec) -> Self {
        let record = ContainerRecord::new(&id, name);
        Self {
            id,
            host_spec,
            record: RwLock::new(record),
        }
    }

    /// Rebuild a container handle from a persisted record.
    #[must_use]
    pub fn from_record(id: ContainerId, host_spec: HostNetworkSpec, record: ContainerRecord) -> Self {
        Self {
            id,
            host_spec,
            record: RwLock::new(record),
        }
    }

    /// ID accessor.
    #[must_use]
    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// The host-level network specification.
    #[must_use]
    pub fn host_spec(&self) -> &HostNetworkSpec {
        &self.host_spec
    }

    /// Borrow the record for reading.
    pub fn read_record(&self) -> RwLockReadGuard<'_, ContainerRecord> {
        self.record.read()
    }

    /// Borrow the record for exclusive mutation.
    pub fn lock_record(&self) -> RwLockWriteGuard<'_, ContainerRecord> {
        self.record.write()
    }

    /// Snapshot of the record.
    #[must_use]
    pub fn record(&self) -> ContainerRecord {
        self.record.read().clone()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ContainerStatus {
        self.record.read().status
    }

    /// Current init-process PID, when running.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.record.read().pid
    }

    /// Mark the container running with the given init PID.
    pub fn set_running(&self, pid: u32) {
        let mut record = self.record.write();
        record.status = ContainerStatus::Running;
        record.pid = Some(pid);
    }

    /// Update the container status.
    pub fn set_status(&self, status: ContainerStatus) {
        self.record.write().status = status;
    }
}
