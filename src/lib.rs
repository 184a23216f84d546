//! ThreatSense Core - Ensemble Threat Detection
//!
//! Heuristic threat classification over four kinds of input: a file path, a
//! process/connection snapshot, a network observation window, and a
//! communication bundle (email, URLs, free text). Five independent modules
//! score whatever parts of the input are present; the ensemble coordinator
//! reduces their results into one weighted verdict.
//!
//! ## Components
//! - `detectors/`: the five scoring modules and their shared types
//! - `ensemble/`: coordinator, weight table, verdict shapes
//! - `snapshot.rs`: input shapes and snapshot sources
//!
//! ## Example
//! ```no_run
//! use threatsense_core::{EnsembleDetector, InputBundle};
//!
//! let detector = EnsembleDetector::new();
//! let verdict = detector.detect(&InputBundle::new().with_file("/tmp/sample.ps1"));
//! println!("{} ({:.1})", verdict.threat_level.as_str(), verdict.overall_risk_score);
//! ```
//!
//! Scoring is synchronous and request-scoped. The only state shared between
//! requests is the weight table, replaceable through
//! [`EnsembleDetector::update_weights`].

pub mod detectors;
pub mod ensemble;
pub mod snapshot;

pub use detectors::types::{
    BehaviorReport, C2Report, DetectionMethod, DetectorError, EncryptedReport, FileReport,
    FileVerdict, ModuleKind, RiskLevel, SignatureReport, SocialReport, ThreatRecord,
};
pub use detectors::{
    BehavioralAnalyzer, Detector, EncryptedTrafficDetector, FileAnalyzer, SignatureDetector,
    SocialEngineeringDetector,
};
pub use ensemble::{
    AdvancedReport, AdvancedThreat, AdvancedThreatKind, DetectionWeights, EnsembleDetector,
    EnsembleVerdict, ModuleOutcome, ModuleRecord,
};
pub use snapshot::{
    CommunicationBundle, ConnectionEntry, EmailMessage, InputBundle, NetworkObservation,
    ObservedConnection, ProcessEntry, SnapshotSource, StaticSource, SysinfoSource,
    SystemSnapshot,
};
