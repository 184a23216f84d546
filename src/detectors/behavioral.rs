//! Behavioral Analysis Module
//!
//! Scores an already-collected process/connection snapshot. Three finding
//! categories, each with a fixed risk increment:
//! - suspicious process names (0.2 per match)
//! - suspicious command-line substrings (0.3 per match)
//! - connections to known malicious ports (0.1 per match)

use serde_json::json;

use super::types::{
    BehaviorReport, BehaviorSummary, DetectorError, ModuleKind, RiskLevel, ThreatRecord,
};
use super::Detector;
use crate::snapshot::SystemSnapshot;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Script hosts and LOLBins that rarely run outside admin sessions.
const SUSPICIOUS_PROCESSES: &[&str] = &[
    "powershell.exe",
    "cmd.exe",
    "wscript.exe",
    "cscript.exe",
    "mshta.exe",
    "regsvr32.exe",
    "rundll32.exe",
];

/// Command-line fragments typical of download cradles and recon.
const SUSPICIOUS_COMMANDS: &[&str] = &[
    "DownloadString",
    "Invoke-Expression",
    "IEX",
    "Invoke-WebRequest",
    "net user",
    "net group",
    "wmic",
    "schtasks",
];

/// Remote ports commonly used by malware.
const MALICIOUS_PORTS: &[u16] = &[
    4444, // Metasploit default
    8080, // HTTP alt
    9999, // Common backdoor
    1337, // Leet
];

const PROCESS_INCREMENT: f64 = 0.2;
const COMMAND_INCREMENT: f64 = 0.3;
const CONNECTION_INCREMENT: f64 = 0.1;

/// Thresholds applied to the raw fractional sum, before the x10 scaling.
const HIGH_THRESHOLD: f64 = 0.7;
const MEDIUM_THRESHOLD: f64 = 0.4;

// ============================================================================
// DETECTOR
// ============================================================================

pub struct BehavioralAnalyzer;

impl BehavioralAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BehavioralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for BehavioralAnalyzer {
    type Input = SystemSnapshot;
    type Report = BehaviorReport;

    fn score(&self, snapshot: &SystemSnapshot) -> Result<BehaviorReport, DetectorError> {
        let mut threats = Vec::new();
        let mut threat_types = Vec::new();
        let mut risk_score = 0.0;

        // Process names
        let suspicious_processes: Vec<_> = snapshot
            .processes
            .iter()
            .filter(|proc| {
                let name = proc.name.to_lowercase();
                SUSPICIOUS_PROCESSES.iter().any(|p| name == *p)
            })
            .cloned()
            .collect();
        risk_score += suspicious_processes.len() as f64 * PROCESS_INCREMENT;

        if !suspicious_processes.is_empty() {
            threats.push(ThreatRecord {
                kind: "Suspicious Process".to_string(),
                module: ModuleKind::Behavioral,
                risk_level: RiskLevel::Medium,
                details: serde_json::to_value(&suspicious_processes).unwrap_or_default(),
            });
            threat_types.push("Suspicious Process".to_string());
        }

        // Command lines
        let mut suspicious_commands = Vec::new();
        for proc in &snapshot.processes {
            let cmdline = proc.cmdline.join(" ");
            let cmdline_lower = cmdline.to_lowercase();
            for command in SUSPICIOUS_COMMANDS {
                if cmdline_lower.contains(&command.to_lowercase()) {
                    suspicious_commands.push(json!({
                        "process": proc.name,
                        "command": command,
                        "full_cmdline": cmdline,
                    }));
                    risk_score += COMMAND_INCREMENT;
                }
            }
        }

        if !suspicious_commands.is_empty() {
            threats.push(ThreatRecord {
                kind: "Suspicious Commands".to_string(),
                module: ModuleKind::Behavioral,
                risk_level: RiskLevel::High,
                details: serde_json::Value::Array(suspicious_commands.clone()),
            });
            threat_types.push("Suspicious Commands".to_string());
        }

        // Remote ports
        let suspicious_connections: Vec<_> = snapshot
            .connections
            .iter()
            .filter(|conn| {
                conn.remote_port()
                    .map(|port| MALICIOUS_PORTS.contains(&port))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        risk_score += suspicious_connections.len() as f64 * CONNECTION_INCREMENT;

        if !suspicious_connections.is_empty() {
            threats.push(ThreatRecord {
                kind: "Suspicious Network".to_string(),
                module: ModuleKind::Behavioral,
                risk_level: RiskLevel::Medium,
                details: serde_json::to_value(&suspicious_connections).unwrap_or_default(),
            });
            threat_types.push("Suspicious Network".to_string());
        }

        let threat_level = if risk_score >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if risk_score >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Ok(BehaviorReport {
            threats,
            threat_types,
            threat_level,
            risk_score: (risk_score * 10.0).min(10.0),
            summary: BehaviorSummary {
                suspicious_processes: suspicious_processes.len(),
                suspicious_commands: suspicious_commands.len(),
                suspicious_connections: suspicious_connections.len(),
            },
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
