//! Detector Types - Shared types for the detection modules

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// MODULE IDENTITY
// ============================================================================

/// Identity of a detection module inside the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Signature,
    FileAnalysis,
    Behavioral,
    Encrypted,
    SocialEngineering,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Signature => "signature",
            ModuleKind::FileAnalysis => "file_analysis",
            ModuleKind::Behavioral => "behavioral",
            ModuleKind::Encrypted => "encrypted",
            ModuleKind::SocialEngineering => "social_engineering",
        }
    }

    /// All modules, in invocation order.
    pub fn all() -> &'static [ModuleKind] {
        &[
            ModuleKind::Signature,
            ModuleKind::FileAnalysis,
            ModuleKind::Behavioral,
            ModuleKind::Encrypted,
            ModuleKind::SocialEngineering,
        ]
    }
}

/// Risk tier attached to a threat record or a module verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

// ============================================================================
// THREAT RECORDS
// ============================================================================

/// One detected threat instance.
///
/// Records accumulate across all modules invoked for one request, in module
/// invocation order (signature, file, behavioral, encrypted, social).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatRecord {
    /// Free-form classification, e.g. "Suspicious Process".
    pub kind: String,
    /// Module that produced the record.
    pub module: ModuleKind,
    pub risk_level: RiskLevel,
    /// Opaque payload describing what matched.
    pub details: serde_json::Value,
}

// ============================================================================
// SIGNATURE MODULE
// ============================================================================

/// How a signature verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// Exact content-hash match against the signature table.
    #[serde(rename = "signature")]
    Signature,
    /// Secondary suspicious-string rule check.
    #[serde(rename = "rule-match")]
    RuleMatch,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Signature => "signature",
            DetectionMethod::RuleMatch => "rule-match",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureReport {
    pub detected: bool,
    /// Threat label from the signature table, or a synthetic rule label.
    pub threat_type: String,
    pub confidence: f64,
    pub method: DetectionMethod,
    pub details: serde_json::Value,
}

// ============================================================================
// FILE ANALYSIS MODULE
// ============================================================================

/// Classification produced by the file analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileVerdict {
    Benign,
    Suspicious,
    Malicious,
}

impl FileVerdict {
    /// Whether this verdict counts toward the weighted ensemble risk.
    pub fn is_positive(&self) -> bool {
        matches!(self, FileVerdict::Malicious | FileVerdict::Suspicious)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileVerdict::Benign => "benign",
            FileVerdict::Suspicious => "suspicious",
            FileVerdict::Malicious => "malicious",
        }
    }
}

/// Features extracted while classifying a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFeatures {
    pub file_size: u64,
    pub extension: String,
    pub is_binary: bool,
    pub matched_patterns: Vec<String>,
    /// Fraction of the fixed pattern list found in the content.
    pub threat_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub prediction: FileVerdict,
    pub confidence: f64,
    pub threat_type: String,
    pub features: FileFeatures,
}

// ============================================================================
// BEHAVIORAL MODULE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorSummary {
    pub suspicious_processes: usize,
    pub suspicious_commands: usize,
    pub suspicious_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorReport {
    pub threats: Vec<ThreatRecord>,
    pub threat_types: Vec<String>,
    pub threat_level: RiskLevel,
    /// Scaled to 0-10.
    pub risk_score: f64,
    pub summary: BehaviorSummary,
}

// ============================================================================
// ENCRYPTED TRAFFIC MODULE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptedSummary {
    pub tls_hosts_analyzed: usize,
    pub dns_queries_analyzed: usize,
    pub connections_analyzed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedReport {
    pub threats: Vec<ThreatRecord>,
    pub threat_types: Vec<String>,
    pub threat_level: RiskLevel,
    /// Scaled to 0-10.
    pub risk_score: f64,
    pub summary: EncryptedSummary,
}

/// Result of the advisory command-and-control check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct C2Report {
    pub c2_detected: bool,
    pub indicators: Vec<String>,
    /// Scaled to 0-10.
    pub risk_score: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// SOCIAL ENGINEERING MODULE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialSummary {
    pub email_analyzed: bool,
    pub urls_analyzed: usize,
    pub content_analyzed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialReport {
    pub threats: Vec<ThreatRecord>,
    pub threat_types: Vec<String>,
    pub threat_level: RiskLevel,
    /// Scaled to 0-10.
    pub risk_score: f64,
    pub summary: SocialSummary,
}

// ============================================================================
// ERRORS
// ============================================================================

/// Failure of one detector operation.
///
/// Failures never cross the ensemble boundary as panics; the coordinator
/// stores them as data in the failed module's slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DetectorError {
    /// Input file does not exist.
    NotFound { path: PathBuf },
    /// Input file exists but could not be read.
    Unreadable { path: PathBuf, reason: String },
    /// Unexpected fault inside a module.
    Unexpected { message: String },
}

impl std::fmt::Display for DetectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorError::NotFound { path } => {
                write!(f, "file not found: {}", path.display())
            }
            DetectorError::Unreadable { path, reason } => {
                write!(f, "cannot read {}: {}", path.display(), reason)
            }
            DetectorError::Unexpected { message } => {
                write!(f, "module failure: {}", message)
            }
        }
    }
}

impl std::error::Error for DetectorError {}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_kind_names() {
        assert_eq!(ModuleKind::Signature.as_str(), "signature");
        assert_eq!(ModuleKind::FileAnalysis.as_str(), "file_analysis");
        assert_eq!(ModuleKind::SocialEngineering.as_str(), "social_engineering");
        assert_eq!(ModuleKind::all().len(), 5);
    }

    #[test]
    fn test_module_kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&ModuleKind::FileAnalysis).unwrap();
        assert_eq!(json, "\"file_analysis\"");

        let back: ModuleKind = serde_json::from_str("\"social_engineering\"").unwrap();
        assert_eq!(back, ModuleKind::SocialEngineering);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn test_detector_error_display() {
        let err = DetectorError::NotFound {
            path: PathBuf::from("/tmp/missing.bin"),
        };
        assert!(err.to_string().contains("/tmp/missing.bin"));

        let err = DetectorError::Unexpected {
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "module failure: boom");
    }
}
