//! Encrypted Traffic Module
//!
//! Scores a network observation window without touching payloads: TLS host
//! names against a suspicious-domain list, DNS queries against DGA shapes,
//! connection ports against a known-bad set. A separate advisory check
//! scores command-and-control likelihood from volume and port indicators.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::types::{
    C2Report, DetectorError, EncryptedReport, EncryptedSummary, ModuleKind, RiskLevel,
    ThreatRecord,
};
use super::Detector;
use crate::snapshot::NetworkObservation;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Substrings flagged in TLS host names.
const SUSPICIOUS_DOMAINS: &[&str] = &["malware.com", "evil.org", "bad.net", "suspicious.info"];

/// Ports commonly used for C2 channels.
const SUSPICIOUS_PORTS: &[u16] = &[
    4444,  // Metasploit default
    8080,  // HTTP alt
    9999,  // Common backdoor
    1337,  // Leet
    31337, // Elite/leet
];

/// Domain shapes typical of generation algorithms: a long all-lowercase
/// label before .com, or a mixed alphanumeric label before .net.
static DGA_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"[a-z]{8,}\.com", r"[a-z]{4,}\d{4,}\.net"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

const TLS_HOST_INCREMENT: f64 = 0.2;
const DGA_INCREMENT: f64 = 0.3;
const CONNECTION_INCREMENT: f64 = 0.1;

/// Thresholds applied to the raw sum, before the x10 scaling.
const HIGH_THRESHOLD: f64 = 0.6;
const MEDIUM_THRESHOLD: f64 = 0.3;

// C2 check indicators
const C2_CONNECTION_COUNT: usize = 10;
const C2_DNS_QUERY_COUNT: usize = 20;
const C2_VOLUME_INCREMENT: f64 = 0.2;
const C2_PORT_INCREMENT: f64 = 0.3;

// ============================================================================
// DETECTOR
// ============================================================================

pub struct EncryptedTrafficDetector;

impl EncryptedTrafficDetector {
    pub fn new() -> Self {
        Self
    }

    /// Advisory command-and-control check, scored independently of the
    /// threat scan: volume of connections, suspicious ports, DNS query
    /// volume. Not consumed by the weighted ensemble verdict.
    pub fn check_c2(&self, observation: &NetworkObservation) -> C2Report {
        let mut indicators = Vec::new();
        let mut risk_score = 0.0;

        if observation.connections.len() > C2_CONNECTION_COUNT {
            indicators.push("High connection count".to_string());
            risk_score += C2_VOLUME_INCREMENT;
        }

        for conn in &observation.connections {
            if SUSPICIOUS_PORTS.contains(&conn.port) {
                indicators.push(format!("Suspicious port: {}", conn.port));
                risk_score += C2_PORT_INCREMENT;
            }
        }

        if observation.dns_queries.len() > C2_DNS_QUERY_COUNT {
            indicators.push("High DNS query count".to_string());
            risk_score += C2_VOLUME_INCREMENT;
        }

        C2Report {
            c2_detected: !indicators.is_empty(),
            indicators,
            risk_score: (risk_score * 10.0).min(10.0),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl Default for EncryptedTrafficDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn is_suspicious_domain(host: &str) -> bool {
    let host = host.to_lowercase();
    SUSPICIOUS_DOMAINS.iter().any(|d| host.contains(d))
}

fn is_dga_domain(query: &str) -> bool {
    let query = query.to_lowercase();
    DGA_PATTERNS.iter().any(|re| re.is_match(&query))
}

impl Detector for EncryptedTrafficDetector {
    type Input = NetworkObservation;
    type Report = EncryptedReport;

    fn score(&self, observation: &NetworkObservation) -> Result<EncryptedReport, DetectorError> {
        let mut threats = Vec::new();
        let mut threat_types = Vec::new();
        let mut risk_score = 0.0;

        for host in &observation.tls_hosts {
            if is_suspicious_domain(host) {
                threats.push(ThreatRecord {
                    kind: "Suspicious TLS Host".to_string(),
                    module: ModuleKind::Encrypted,
                    risk_level: RiskLevel::Medium,
                    details: json!({ "host": host }),
                });
                threat_types.push("Suspicious TLS Host".to_string());
                risk_score += TLS_HOST_INCREMENT;
            }
        }

        for query in &observation.dns_queries {
            if is_dga_domain(query) {
                threats.push(ThreatRecord {
                    kind: "DGA Domain".to_string(),
                    module: ModuleKind::Encrypted,
                    risk_level: RiskLevel::High,
                    details: json!({ "domain": query }),
                });
                threat_types.push("DGA Domain".to_string());
                risk_score += DGA_INCREMENT;
            }
        }

        for conn in &observation.connections {
            if SUSPICIOUS_PORTS.contains(&conn.port) {
                threats.push(ThreatRecord {
                    kind: "Suspicious Connection".to_string(),
                    module: ModuleKind::Encrypted,
                    risk_level: RiskLevel::Medium,
                    details: serde_json::to_value(conn).unwrap_or_default(),
                });
                threat_types.push("Suspicious Connection".to_string());
                risk_score += CONNECTION_INCREMENT;
            }
        }

        let threat_level = if risk_score >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if risk_score >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Ok(EncryptedReport {
            threats,
            threat_types,
            threat_level,
            risk_score: (risk_score * 10.0).min(10.0),
            summary: EncryptedSummary {
                tls_hosts_analyzed: observation.tls_hosts.len(),
                dns_queries_analyzed: observation.dns_queries.len(),
                connections_analyzed: observation.connections.len(),
            },
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ObservedConnection;

    #[test]
    fn test_dga_shapes() {
        assert!(is_dga_domain("qwertzuiop.com"));
        assert!(is_dga_domain("abcd1234.net"));
        assert!(!is_dga_domain("news.example.org"));
        assert!(!is_dga_domain("abc.com"));
        assert!(!is_dga_domain("abcd123.net"));
    }

    #[test]
    fn test_tls_host_substring_match() {
        let observation = NetworkObservation {
            tls_hosts: vec![
                "cdn.example.com".to_string(),
                "api.malware.com".to_string(),
            ],
            ..Default::default()
        };

        let report = EncryptedTrafficDetector::new().score(&observation).unwrap();
        assert_eq!(report.threats.len(), 1);
        assert_eq!(report.threat_types, vec!["Suspicious TLS Host"]);
        assert!((report.risk_score - 2.0).abs() < 1e-9);
        assert_eq!(report.threat_level, RiskLevel::Low);
    }

    #[test]
    fn test_two_dga_queries_reach_high() {
        let observation = NetworkObservation {
            dns_queries: vec![
                "xkqjvbnmas.com".to_string(),
                "beacon9041.net".to_string(),
                "mail.example.org".to_string(),
            ],
            ..Default::default()
        };

        let report = EncryptedTrafficDetector::new().score(&observation).unwrap();
        assert_eq!(report.summary.dns_queries_analyzed, 3);
        // Two DGA hits: raw 0.6, exactly at the high boundary.
        assert_eq!(report.threat_level, RiskLevel::High);
        assert!((report.risk_score - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_c2_indicators() {
        let mut connections: Vec<_> = (0..14).map(|_| ObservedConnection::to_port(443)).collect();
        connections.push(ObservedConnection::to_port(4444));
        let observation = NetworkObservation {
            dns_queries: (0..25).map(|i| format!("host{}.example.org", i)).collect(),
            connections,
            ..Default::default()
        };

        let report = EncryptedTrafficDetector::new().check_c2(&observation);
        assert!(report.c2_detected);
        assert!(report
            .indicators
            .contains(&"High connection count".to_string()));
        assert!(report.indicators.contains(&"Suspicious port: 4444".to_string()));
        assert!(report.indicators.contains(&"High DNS query count".to_string()));
        // 0.2 + 0.3 + 0.2 raw
        assert!((report.risk_score - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_quiet_window_has_no_c2() {
        let observation = NetworkObservation {
            connections: vec![ObservedConnection::to_port(443)],
            dns_queries: vec!["example.org".to_string()],
            ..Default::default()
        };

        let report = EncryptedTrafficDetector::new().check_c2(&observation);
        assert!(!report.c2_detected);
        assert!(report.indicators.is_empty());
        assert_eq!(report.risk_score, 0.0);
    }
}
