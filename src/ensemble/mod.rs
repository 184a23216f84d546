//! Ensemble Coordinator
//!
//! Dispatches an input bundle to whichever detection modules apply, isolates
//! per-module failures, and reduces the surviving results into one weighted
//! verdict.
//!
//! - `weights.rs`: normalized per-module weight table
//! - `types.rs`: module records, verdict and advanced-report shapes

pub mod types;
pub mod weights;

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use serde_json::json;
use uuid::Uuid;

use crate::detectors::types::{
    BehaviorReport, DetectorError, EncryptedReport, FileReport, ModuleKind, RiskLevel,
    SignatureReport, SocialReport, ThreatRecord,
};
use crate::detectors::{
    BehavioralAnalyzer, Detector, EncryptedTrafficDetector, FileAnalyzer, SignatureDetector,
    SocialEngineeringDetector,
};
use crate::snapshot::{CommunicationBundle, InputBundle, NetworkObservation, SystemSnapshot};

pub use types::{AdvancedReport, AdvancedThreat, AdvancedThreatKind, EnsembleVerdict};
pub use types::{ModuleOutcome, ModuleRecord};
pub use weights::{DetectionWeights, DEFAULT_WEIGHTS};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Weighted risk at or above this is a high-level verdict.
const ENSEMBLE_HIGH_THRESHOLD: f64 = 7.0;

/// Weighted risk at or above this is a medium-level verdict.
const ENSEMBLE_MEDIUM_THRESHOLD: f64 = 4.0;

/// Script hosts whose mere presence flags possible fileless malware.
const SCRIPT_HOSTS: &[&str] = &["powershell.exe", "wscript.exe", "cscript.exe"];

const ZERO_DAY_CONFIDENCE: f64 = 0.7;
const FILELESS_CONFIDENCE: f64 = 0.6;
const ENCRYPTED_MALWARE_CONFIDENCE: f64 = 0.8;

// ============================================================================
// COORDINATOR
// ============================================================================

type SignatureAdapter = Box<dyn Detector<Input = Path, Report = SignatureReport>>;
type FileAdapter = Box<dyn Detector<Input = Path, Report = FileReport>>;
type BehavioralAdapter = Box<dyn Detector<Input = SystemSnapshot, Report = BehaviorReport>>;
type EncryptedAdapter = Box<dyn Detector<Input = NetworkObservation, Report = EncryptedReport>>;
type SocialAdapter = Box<dyn Detector<Input = CommunicationBundle, Report = SocialReport>>;

/// Combines the five detection modules into one verdict per request.
///
/// The coordinator is synchronous and request-scoped: one call to
/// [`detect`](Self::detect) completes before returning and shares nothing
/// across requests except the read-mostly weight table. Callers replacing
/// weights concurrently with in-flight requests must serialize their own
/// writes.
pub struct EnsembleDetector {
    signature: SignatureAdapter,
    file_analysis: FileAdapter,
    behavioral: BehavioralAdapter,
    encrypted: EncryptedAdapter,
    social: SocialAdapter,
    weights: RwLock<DetectionWeights>,
}

impl EnsembleDetector {
    pub fn new() -> Self {
        Self::with_weights(DetectionWeights::default())
    }

    pub fn with_weights(weights: DetectionWeights) -> Self {
        Self {
            signature: Box::new(SignatureDetector::new()),
            file_analysis: Box::new(FileAnalyzer::new()),
            behavioral: Box::new(BehavioralAnalyzer::new()),
            encrypted: Box::new(EncryptedTrafficDetector::new()),
            social: Box::new(SocialEngineeringDetector::new()),
            weights: RwLock::new(weights),
        }
    }

    // Adapter injection points, for deployments that swap a module for a
    // reduced-capability or instrumented variant.

    pub fn with_signature_adapter(mut self, adapter: SignatureAdapter) -> Self {
        self.signature = adapter;
        self
    }

    pub fn with_file_adapter(mut self, adapter: FileAdapter) -> Self {
        self.file_analysis = adapter;
        self
    }

    pub fn with_behavioral_adapter(mut self, adapter: BehavioralAdapter) -> Self {
        self.behavioral = adapter;
        self
    }

    pub fn with_encrypted_adapter(mut self, adapter: EncryptedAdapter) -> Self {
        self.encrypted = adapter;
        self
    }

    pub fn with_social_adapter(mut self, adapter: SocialAdapter) -> Self {
        self.social = adapter;
        self
    }

    /// Runs every applicable module and reduces the results into a verdict.
    ///
    /// A bundle part that is absent skips its modules entirely; a module
    /// that fails lands as an error marker in its own slot and the rest of
    /// the ensemble still contributes.
    pub fn detect(&self, bundle: &InputBundle) -> EnsembleVerdict {
        let mut module_results: HashMap<ModuleKind, ModuleRecord> = HashMap::new();
        let mut threats: Vec<ThreatRecord> = Vec::new();
        let mut threat_types: Vec<String> = Vec::new();

        if let Some(path) = &bundle.file_path {
            match self.signature.score(path) {
                Ok(report) => {
                    if report.detected {
                        threats.push(ThreatRecord {
                            kind: "Signature Match".to_string(),
                            module: ModuleKind::Signature,
                            risk_level: RiskLevel::High,
                            details: serde_json::to_value(&report).unwrap_or_default(),
                        });
                        threat_types.push("Signature Match".to_string());
                    }
                    module_results.insert(
                        ModuleKind::Signature,
                        ModuleRecord::new(ModuleOutcome::Signature(report)),
                    );
                }
                Err(err) => {
                    record_failure(&mut module_results, ModuleKind::Signature, err);
                }
            }

            match self.file_analysis.score(path) {
                Ok(report) => {
                    if report.prediction.is_positive() {
                        let risk_level = match report.prediction {
                            crate::detectors::types::FileVerdict::Malicious => RiskLevel::High,
                            _ => RiskLevel::Medium,
                        };
                        threats.push(ThreatRecord {
                            kind: "File-based Threat".to_string(),
                            module: ModuleKind::FileAnalysis,
                            risk_level,
                            details: serde_json::to_value(&report).unwrap_or_default(),
                        });
                        threat_types.push("File-based Threat".to_string());
                    }
                    module_results.insert(
                        ModuleKind::FileAnalysis,
                        ModuleRecord::new(ModuleOutcome::FileAnalysis(report)),
                    );
                }
                Err(err) => {
                    record_failure(&mut module_results, ModuleKind::FileAnalysis, err);
                }
            }
        }

        if let Some(snapshot) = &bundle.system {
            match self.behavioral.score(snapshot) {
                Ok(report) => {
                    threats.extend(report.threats.iter().cloned());
                    threat_types.extend(report.threat_types.iter().cloned());
                    module_results.insert(
                        ModuleKind::Behavioral,
                        ModuleRecord::new(ModuleOutcome::Behavioral(report)),
                    );
                }
                Err(err) => {
                    record_failure(&mut module_results, ModuleKind::Behavioral, err);
                }
            }
        }

        if let Some(observation) = &bundle.network {
            match self.encrypted.score(observation) {
                Ok(report) => {
                    threats.extend(report.threats.iter().cloned());
                    threat_types.extend(report.threat_types.iter().cloned());
                    module_results.insert(
                        ModuleKind::Encrypted,
                        ModuleRecord::new(ModuleOutcome::Encrypted(report)),
                    );
                }
                Err(err) => {
                    record_failure(&mut module_results, ModuleKind::Encrypted, err);
                }
            }
        }

        if let Some(communication) = &bundle.communication {
            match self.social.score(communication) {
                Ok(report) => {
                    threats.extend(report.threats.iter().cloned());
                    threat_types.extend(report.threat_types.iter().cloned());
                    module_results.insert(
                        ModuleKind::SocialEngineering,
                        ModuleRecord::new(ModuleOutcome::SocialEngineering(report)),
                    );
                }
                Err(err) => {
                    record_failure(&mut module_results, ModuleKind::SocialEngineering, err);
                }
            }
        }

        let weights = self.weights.read().clone();
        let (total_risk, total_confidence) = aggregate(&weights, &module_results);

        let threat_level = if total_risk >= ENSEMBLE_HIGH_THRESHOLD {
            RiskLevel::High
        } else if total_risk >= ENSEMBLE_MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let verdict = EnsembleVerdict {
            id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            threat_count: threats.len(),
            threats,
            threat_types,
            overall_risk_score: total_risk.min(10.0),
            threat_level,
            confidence: total_confidence.min(1.0),
            module_results,
        };

        log::debug!(
            "verdict {}: risk {:.2}, level {}, {} threats",
            verdict.id,
            verdict.overall_risk_score,
            verdict.threat_level.as_str(),
            verdict.threat_count
        );

        verdict
    }

    /// Advisory pass for special threat categories, scored with fixed
    /// confidences instead of the weight table. Results never feed back
    /// into [`detect`](Self::detect).
    pub fn detect_advanced(&self, bundle: &InputBundle) -> AdvancedReport {
        let mut advanced: Vec<AdvancedThreat> = Vec::new();

        if let Some(snapshot) = &bundle.system {
            match self.behavioral.score(snapshot) {
                Ok(report) => {
                    if report.threat_level == RiskLevel::High {
                        advanced.push(AdvancedThreat {
                            kind: AdvancedThreatKind::ZeroDay,
                            confidence: ZERO_DAY_CONFIDENCE,
                            indicators: serde_json::to_value(&report.threats)
                                .unwrap_or_default(),
                        });
                    }
                }
                Err(err) => {
                    log::warn!("behavioral module skipped in advanced pass: {}", err);
                }
            }

            // Script hosts count as fileless indicators regardless of what
            // the behavioral scoring concluded.
            for proc in &snapshot.processes {
                let name = proc.name.to_lowercase();
                if SCRIPT_HOSTS.contains(&name.as_str()) {
                    advanced.push(AdvancedThreat {
                        kind: AdvancedThreatKind::FilelessMalware,
                        confidence: FILELESS_CONFIDENCE,
                        indicators: json!([{
                            "process": proc.name,
                            "cmdline": proc.cmdline,
                        }]),
                    });
                }
            }
        }

        if let Some(observation) = &bundle.network {
            match self.encrypted.score(observation) {
                Ok(report) => {
                    if report.threat_level == RiskLevel::High {
                        advanced.push(AdvancedThreat {
                            kind: AdvancedThreatKind::EncryptedMalware,
                            confidence: ENCRYPTED_MALWARE_CONFIDENCE,
                            indicators: serde_json::to_value(&report.threats)
                                .unwrap_or_default(),
                        });
                    }
                }
                Err(err) => {
                    log::warn!("encrypted module skipped in advanced pass: {}", err);
                }
            }
        }

        AdvancedReport {
            threat_count: advanced.len(),
            threats: advanced,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Replaces the weight table wholesale. Degenerate input (sum of zero or
    /// less) resets to the built-in defaults instead of normalizing.
    pub fn update_weights(&self, raw: HashMap<ModuleKind, f64>) {
        *self.weights.write() = DetectionWeights::normalized(raw);
    }

    /// Snapshot of the current weight table.
    pub fn weights(&self) -> DetectionWeights {
        self.weights.read().clone()
    }
}

impl Default for EnsembleDetector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

fn record_failure(
    module_results: &mut HashMap<ModuleKind, ModuleRecord>,
    kind: ModuleKind,
    err: DetectorError,
) {
    log::warn!("{} module failed: {}", kind.as_str(), err);
    module_results.insert(kind, ModuleRecord::failed(err));
}

/// Weighted reduction over the module outcomes.
///
/// Signature and file analysis contribute `confidence x 10` only on a
/// positive verdict; the snapshot-scoring modules contribute their own
/// 0-10 risk score. Failed modules contribute nothing. Only modules present
/// in the weight table are considered.
fn aggregate(
    weights: &DetectionWeights,
    module_results: &HashMap<ModuleKind, ModuleRecord>,
) -> (f64, f64) {
    let mut total_risk = 0.0;
    let mut total_confidence = 0.0;

    for (kind, weight) in weights.iter() {
        let Some(record) = module_results.get(&kind) else {
            continue;
        };

        match &record.outcome {
            ModuleOutcome::Signature(report) => {
                if report.detected {
                    total_risk += weight * report.confidence * 10.0;
                    total_confidence += weight * report.confidence;
                }
            }
            ModuleOutcome::FileAnalysis(report) => {
                if report.prediction.is_positive() {
                    total_risk += weight * report.confidence * 10.0;
                    total_confidence += weight * report.confidence;
                }
            }
            ModuleOutcome::Behavioral(report) => {
                total_risk += weight * report.risk_score;
                total_confidence += weight * report.risk_score / 10.0;
            }
            ModuleOutcome::Encrypted(report) => {
                total_risk += weight * report.risk_score;
                total_confidence += weight * report.risk_score / 10.0;
            }
            ModuleOutcome::SocialEngineering(report) => {
                total_risk += weight * report.risk_score;
                total_confidence += weight * report.risk_score / 10.0;
            }
            ModuleOutcome::Failed { .. } => {}
        }
    }

    (total_risk, total_confidence)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ObservedConnection, ProcessEntry};
    use std::io::Write;

    /// Adapter stub that always faults, standing in for a module hitting an
    /// unexpected internal failure.
    struct FailingAdapter;

    impl Detector for FailingAdapter {
        type Input = SystemSnapshot;
        type Report = BehaviorReport;

        fn score(&self, _input: &SystemSnapshot) -> Result<BehaviorReport, DetectorError> {
            Err(DetectorError::Unexpected {
                message: "simulated fault".to_string(),
            })
        }
    }

    fn rule_match_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"cmd.exe powershell").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_empty_bundle_yields_empty_verdict() {
        let detector = EnsembleDetector::new();
        let verdict = detector.detect(&InputBundle::new());

        assert!(verdict.threats.is_empty());
        assert!(verdict.threat_types.is_empty());
        assert_eq!(verdict.threat_count, 0);
        assert_eq!(verdict.overall_risk_score, 0.0);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.threat_level, RiskLevel::Low);
        assert!(verdict.module_results.is_empty());
    }

    #[test]
    fn test_module_failure_does_not_block_others() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut snapshot = SystemSnapshot::default();
        snapshot.processes.push(ProcessEntry::new(10, "safe.exe"));

        let observation = NetworkObservation {
            connections: vec![ObservedConnection::to_port(4444)],
            ..Default::default()
        };

        let detector = EnsembleDetector::new().with_behavioral_adapter(Box::new(FailingAdapter));
        let bundle = InputBundle::new()
            .with_system(snapshot)
            .with_network(observation);
        let verdict = detector.detect(&bundle);

        // The faulted module shows an error marker in its own slot.
        let behavioral = verdict
            .module_results
            .get(&ModuleKind::Behavioral)
            .unwrap();
        assert!(behavioral.is_error());

        // The encrypted module still contributed its finding.
        assert!(verdict
            .threat_types
            .contains(&"Suspicious Connection".to_string()));
        let encrypted = verdict.module_results.get(&ModuleKind::Encrypted).unwrap();
        assert!(!encrypted.is_error());
        assert!(verdict.overall_risk_score > 0.0);
    }

    #[test]
    fn test_network_only_bundle() {
        let mut connections: Vec<_> = (0..14).map(|_| ObservedConnection::to_port(443)).collect();
        connections.push(ObservedConnection::to_port(4444));
        let observation = NetworkObservation {
            dns_queries: (0..25).map(|i| format!("host{}.example.org", i)).collect(),
            connections,
            ..Default::default()
        };

        let detector = EnsembleDetector::new();
        let verdict = detector.detect(&InputBundle::new().with_network(observation.clone()));

        // Only the encrypted module ran.
        assert_eq!(verdict.module_results.len(), 1);
        assert!(verdict.module_results.contains_key(&ModuleKind::Encrypted));
        assert!(verdict
            .threat_types
            .contains(&"Suspicious Connection".to_string()));

        // The advisory C2 check fires on the same window.
        let c2 = EncryptedTrafficDetector::new().check_c2(&observation);
        assert!(c2.c2_detected);
        assert_eq!(c2.indicators.len(), 3);
    }

    #[test]
    fn test_weighted_signature_contribution() {
        // Empty file: hash match at confidence 0.95.
        let file = tempfile::NamedTempFile::new().unwrap();
        let detector = EnsembleDetector::new();
        let verdict = detector.detect(&InputBundle::new().with_file(file.path()));

        // signature 0.25 * 0.95 * 10, file analysis contributes nothing
        // (benign empty file).
        assert!((verdict.overall_risk_score - 2.375).abs() < 1e-9);
        assert!((verdict.confidence - 0.2375).abs() < 1e-9);
        assert_eq!(verdict.threat_level, RiskLevel::Low);
        assert_eq!(verdict.threat_types, vec!["Signature Match"]);
    }

    #[test]
    fn test_updated_weights_change_the_verdict() {
        let file = rule_match_file();
        let detector = EnsembleDetector::new();

        // All weight on the signature module: rule match at 0.8 becomes
        // 1.0 * 0.8 * 10 = 8.0 risk.
        detector.update_weights(HashMap::from([(ModuleKind::Signature, 2.0)]));
        let verdict = detector.detect(&InputBundle::new().with_file(file.path()));

        assert!((verdict.overall_risk_score - 8.0).abs() < 1e-9);
        assert_eq!(verdict.threat_level, RiskLevel::High);
        assert!((verdict.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_weight_update_falls_back() {
        let detector = EnsembleDetector::new();
        detector.update_weights(HashMap::from([(ModuleKind::Signature, 0.0)]));

        let weights = detector.weights();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert_eq!(weights.get(ModuleKind::SocialEngineering), 0.20);
    }

    #[test]
    fn test_detect_advanced_flags_fileless_and_zero_day() {
        // Three script hosts plus a download cradle: raw 0.2*3 + 0.3 = 0.9,
        // a high behavioral level.
        let snapshot = SystemSnapshot {
            processes: vec![
                ProcessEntry::new(1, "powershell.exe").with_cmdline(&[
                    "powershell.exe",
                    "-c",
                    "IEX something",
                ]),
                ProcessEntry::new(2, "wscript.exe"),
                ProcessEntry::new(3, "cscript.exe"),
                ProcessEntry::new(4, "notepad.exe"),
            ],
            connections: Vec::new(),
        };

        let detector = EnsembleDetector::new();
        let report = detector.detect_advanced(&InputBundle::new().with_system(snapshot));

        let zero_days: Vec<_> = report
            .threats
            .iter()
            .filter(|t| t.kind == AdvancedThreatKind::ZeroDay)
            .collect();
        assert_eq!(zero_days.len(), 1);
        assert_eq!(zero_days[0].confidence, 0.7);

        let fileless: Vec<_> = report
            .threats
            .iter()
            .filter(|t| t.kind == AdvancedThreatKind::FilelessMalware)
            .collect();
        assert_eq!(fileless.len(), 3);
        assert!(fileless.iter().all(|t| t.confidence == 0.6));

        assert_eq!(report.threat_count, report.threats.len());
    }

    #[test]
    fn test_detect_advanced_flags_encrypted_malware() {
        let observation = NetworkObservation {
            dns_queries: vec![
                "xkqjvbnmas.com".to_string(),
                "beacon9041.net".to_string(),
            ],
            ..Default::default()
        };

        let detector = EnsembleDetector::new();
        let report = detector.detect_advanced(&InputBundle::new().with_network(observation));

        assert_eq!(report.threat_count, 1);
        assert_eq!(report.threats[0].kind, AdvancedThreatKind::EncryptedMalware);
        assert_eq!(report.threats[0].confidence, 0.8);
    }

    #[test]
    fn test_verdict_serializes_with_module_keys() {
        let file = rule_match_file();
        let detector = EnsembleDetector::new();
        let verdict = detector.detect(&InputBundle::new().with_file(file.path()));

        let value = serde_json::to_value(&verdict).unwrap();
        assert!(value["module_results"]["signature"].is_object());
        assert!(value["module_results"]["file_analysis"].is_object());
        assert_eq!(value["threat_level"], "low");
        assert!(value["id"].as_str().is_some());
    }
}
