//! Snapshot & Input Shapes
//!
//! Everything the ensemble consumes is an already-collected value: a file
//! path, a process/connection snapshot, a network observation window or a
//! communication bundle. Collection happens before detection runs; the
//! scoring side never reaches out to the live system on its own.
//!
//! [`SnapshotSource`] is the seam for callers that do want live data:
//! `SysinfoSource` enumerates running processes, `StaticSource` wraps a
//! snapshot collected elsewhere (or built by hand in tests).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use sysinfo::System;

// ============================================================================
// SYSTEM SNAPSHOT
// ============================================================================

/// One running process at snapshot time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub cmdline: Vec<String>,
}

impl ProcessEntry {
    pub fn new(pid: u32, name: &str) -> Self {
        Self {
            pid,
            name: name.to_string(),
            cmdline: Vec::new(),
        }
    }

    pub fn with_cmdline(mut self, cmdline: &[&str]) -> Self {
        self.cmdline = cmdline.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// One observed socket at snapshot time. Addresses render as `host:port`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub local_address: Option<String>,
    pub remote_address: Option<String>,
    pub status: String,
    pub pid: Option<u32>,
}

impl ConnectionEntry {
    /// Port parsed from the trailing segment of the remote address.
    pub fn remote_port(&self) -> Option<u16> {
        let addr = self.remote_address.as_deref()?;
        let (_, port) = addr.rsplit_once(':')?;
        port.parse().ok()
    }
}

/// Processes and connections collected at one instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub processes: Vec<ProcessEntry>,
    pub connections: Vec<ConnectionEntry>,
}

impl SystemSnapshot {
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty() && self.connections.is_empty()
    }
}

// ============================================================================
// NETWORK OBSERVATION
// ============================================================================

/// One connection seen over the observation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedConnection {
    pub port: u16,
    pub endpoint: Option<String>,
}

impl ObservedConnection {
    pub fn to_port(port: u16) -> Self {
        Self {
            port,
            endpoint: None,
        }
    }
}

/// TLS hosts, DNS queries and connections observed over a window.
///
/// The observation window itself belongs to whoever collected the data; the
/// detectors score whatever lists they receive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkObservation {
    pub tls_hosts: Vec<String>,
    pub dns_queries: Vec<String>,
    pub connections: Vec<ObservedConnection>,
}

// ============================================================================
// COMMUNICATION BUNDLE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailMessage {
    pub subject: String,
    pub sender: String,
    pub content: String,
}

/// Up to three optional parts: an email, a URL list and free-form text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunicationBundle {
    pub email: Option<EmailMessage>,
    pub urls: Vec<String>,
    pub content: Option<String>,
}

impl CommunicationBundle {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.urls.is_empty() && self.content.is_none()
    }
}

// ============================================================================
// INPUT BUNDLE
// ============================================================================

/// The full input to one detection request.
///
/// Every part is optional; a missing part means the corresponding modules
/// are skipped rather than failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputBundle {
    pub file_path: Option<PathBuf>,
    pub system: Option<SystemSnapshot>,
    pub network: Option<NetworkObservation>,
    pub communication: Option<CommunicationBundle>,
}

impl InputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_system(mut self, snapshot: SystemSnapshot) -> Self {
        self.system = Some(snapshot);
        self
    }

    pub fn with_network(mut self, observation: NetworkObservation) -> Self {
        self.network = Some(observation);
        self
    }

    pub fn with_communication(mut self, communication: CommunicationBundle) -> Self {
        self.communication = Some(communication);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.file_path.is_none()
            && self.system.is_none()
            && self.network.is_none()
            && self.communication.is_none()
    }
}

// ============================================================================
// SNAPSHOT SOURCES
// ============================================================================

/// Supplier of process/connection snapshots.
///
/// Selected at composition time so deployments without live telemetry can
/// run with reduced capability instead of failing.
pub trait SnapshotSource: Send + Sync {
    fn collect(&self) -> SystemSnapshot;
}

/// Live snapshot source backed by `sysinfo`.
///
/// Only process telemetry is available from this source; socket enumeration
/// needs an external observer, so the connection list comes back empty and
/// behavioral scoring degrades to process-only.
pub struct SysinfoSource;

impl SysinfoSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for SysinfoSource {
    fn collect(&self) -> SystemSnapshot {
        let mut system = System::new_all();
        system.refresh_all();

        let processes = system
            .processes()
            .values()
            .map(|proc| ProcessEntry {
                pid: proc.pid().as_u32(),
                name: proc.name().to_string(),
                cmdline: proc.cmd().to_vec(),
            })
            .collect();

        SystemSnapshot {
            processes,
            connections: Vec::new(),
        }
    }
}

/// Pre-collected snapshot source, for callers that gather telemetry through
/// their own channel (or tests that build snapshots by hand).
pub struct StaticSource {
    snapshot: SystemSnapshot,
}

impl StaticSource {
    pub fn new(snapshot: SystemSnapshot) -> Self {
        Self { snapshot }
    }
}

impl SnapshotSource for StaticSource {
    fn collect(&self) -> SystemSnapshot {
        self.snapshot.clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_port_parsing() {
        let conn = ConnectionEntry {
            remote_address: Some("10.0.0.5:4444".to_string()),
            ..Default::default()
        };
        assert_eq!(conn.remote_port(), Some(4444));

        let no_port = ConnectionEntry {
            remote_address: Some("10.0.0.5".to_string()),
            ..Default::default()
        };
        assert_eq!(no_port.remote_port(), None);

        let absent = ConnectionEntry::default();
        assert_eq!(absent.remote_port(), None);
    }

    #[test]
    fn test_bundle_builders() {
        let bundle = InputBundle::new()
            .with_file("/tmp/sample.ps1")
            .with_network(NetworkObservation::default());
        assert!(!bundle.is_empty());
        assert!(bundle.system.is_none());
        assert!(bundle.communication.is_none());

        assert!(InputBundle::new().is_empty());
    }

    #[test]
    fn test_sysinfo_source_collects_processes() {
        let snapshot = SysinfoSource::new().collect();
        // The test process itself is always visible.
        assert!(!snapshot.processes.is_empty());
        assert!(snapshot.connections.is_empty());
    }

    #[test]
    fn test_static_source_round_trip() {
        let snapshot = SystemSnapshot {
            processes: vec![ProcessEntry::new(42, "cmd.exe")],
            connections: Vec::new(),
        };
        let collected = StaticSource::new(snapshot).collect();
        assert_eq!(collected.processes.len(), 1);
        assert_eq!(collected.processes[0].name, "cmd.exe");
    }
}
