//! Ensemble Types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detectors::types::{
    BehaviorReport, DetectorError, EncryptedReport, FileReport, ModuleKind, RiskLevel,
    SignatureReport, SocialReport, ThreatRecord,
};

// ============================================================================
// MODULE RECORDS
// ============================================================================

/// What one module produced for one request.
///
/// The variants form a closed set, so the aggregation match is checked
/// exhaustively and a faulted module is just another piece of data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModuleOutcome {
    Signature(SignatureReport),
    FileAnalysis(FileReport),
    Behavioral(BehaviorReport),
    Encrypted(EncryptedReport),
    SocialEngineering(SocialReport),
    Failed { error: DetectorError },
}

/// One module's slot in the verdict: outcome plus the moment it was scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub timestamp: DateTime<Utc>,
    pub outcome: ModuleOutcome,
}

impl ModuleRecord {
    pub fn new(outcome: ModuleOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome,
        }
    }

    pub fn failed(error: DetectorError) -> Self {
        Self::new(ModuleOutcome::Failed { error })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ModuleOutcome::Failed { .. })
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// The combined result of one detection request.
///
/// Created fresh per request and never mutated after return; the only state
/// the ensemble keeps between requests is its weight table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleVerdict {
    /// Request id for audit correlation.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// All detected threats, in module invocation order.
    pub threats: Vec<ThreatRecord>,
    /// Classification strings parallel to `threats`.
    pub threat_types: Vec<String>,
    pub threat_count: usize,
    /// Weighted aggregate, 0.0 to 10.0.
    pub overall_risk_score: f64,
    pub threat_level: RiskLevel,
    /// Weighted aggregate, 0.0 to 1.0.
    pub confidence: f64,
    /// Per-module outcomes; a module skipped for lack of input has no key.
    pub module_results: HashMap<ModuleKind, ModuleRecord>,
}

// ============================================================================
// ADVANCED DETECTION
// ============================================================================

/// Special threat categories flagged by the advisory pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvancedThreatKind {
    ZeroDay,
    FilelessMalware,
    EncryptedMalware,
}

impl AdvancedThreatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvancedThreatKind::ZeroDay => "Zero-day Exploit",
            AdvancedThreatKind::FilelessMalware => "Fileless Malware",
            AdvancedThreatKind::EncryptedMalware => "Encrypted Malware",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedThreat {
    pub kind: AdvancedThreatKind,
    /// Fixed per-category confidence, not weighted.
    pub confidence: f64,
    pub indicators: serde_json::Value,
}

/// Result of [`detect_advanced`](crate::ensemble::EnsembleDetector::detect_advanced).
/// Advisory only; never feeds back into the primary verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedReport {
    pub threats: Vec<AdvancedThreat>,
    pub threat_count: usize,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// TESTS
// ============================================================================
