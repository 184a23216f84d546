//! Detection Modules
//!
//! Five independent heuristic detectors, each scoring one kind of input:
//!
//! - `signature.rs`: content-hash and suspicious-string lookup on files
//! - `file_analysis.rs`: extension/content/size file classification
//! - `behavioral.rs`: process and connection snapshot scoring
//! - `encrypted.rs`: TLS/DNS/connection scoring plus a C2 check
//! - `social.rs`: email, URL and free-text social-engineering scoring
//!
//! Every module implements [`Detector`] and is composed by the ensemble
//! coordinator. A module never panics across its boundary: expected failure
//! modes come back as [`types::DetectorError`] values.

pub mod behavioral;
pub mod encrypted;
pub mod file_analysis;
pub mod signature;
pub mod social;
pub mod types;

pub use behavioral::BehavioralAnalyzer;
pub use encrypted::EncryptedTrafficDetector;
pub use file_analysis::FileAnalyzer;
pub use signature::SignatureDetector;
pub use social::SocialEngineeringDetector;

use types::DetectorError;

/// Capability interface shared by all detection modules.
///
/// Each module accepts its own input shape and produces its own report
/// type; the coordinator holds modules as trait objects and matches on the
/// report when aggregating. Implementations are stateless after
/// construction, so one instance can score any number of requests.
pub trait Detector: Send + Sync {
    type Input: ?Sized;
    type Report;

    fn score(&self, input: &Self::Input) -> Result<Self::Report, DetectorError>;
}
