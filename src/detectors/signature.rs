//! Signature Detection Module
//!
//! Two-stage lookup on a file:
//! 1. SHA-256 the content and look the digest up in the signature table
//! 2. On a miss, count fixed suspicious strings in the decoded text; two or
//!    more matches trigger a rule detection at lower confidence

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::types::{DetectionMethod, DetectorError, SignatureReport};
use super::Detector;

// ============================================================================
// SIGNATURE TABLE
// ============================================================================

/// Known-bad content digests mapped to their threat labels.
static SIGNATURE_TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            "Trojan.Generic",
        ),
        ("d41d8cd98f00b204e9800998ecf8427e", "Malware.Sample"),
        ("5d41402abc4b2a76b9719d911017c592", "Virus.Test"),
    ])
});

/// Secondary rule: suspicious strings searched in the decoded content.
const RULE_NAME: &str = "suspicious_strings";
const RULE_STRINGS: &[&str] = &["cmd.exe", "powershell", "DownloadString"];

/// Minimum string matches for a rule detection.
const RULE_MIN_MATCHES: usize = 2;

const HASH_CONFIDENCE: f64 = 0.95;
const RULE_CONFIDENCE: f64 = 0.8;

// ============================================================================
// DETECTOR
// ============================================================================

pub struct SignatureDetector;

impl SignatureDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SignatureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SignatureDetector {
    type Input = Path;
    type Report = SignatureReport;

    fn score(&self, path: &Path) -> Result<SignatureReport, DetectorError> {
        if !path.exists() {
            return Err(DetectorError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path).map_err(|e| DetectorError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let digest = hex::encode(Sha256::digest(&bytes));

        if let Some(label) = SIGNATURE_TABLE.get(digest.as_str()) {
            return Ok(SignatureReport {
                detected: true,
                threat_type: label.to_string(),
                confidence: HASH_CONFIDENCE,
                method: DetectionMethod::Signature,
                details: json!({
                    "hash": digest,
                    "signature_match": true,
                }),
            });
        }

        // Hash miss: fall through to the suspicious-string rule.
        let content = String::from_utf8_lossy(&bytes).to_lowercase();
        let matches = RULE_STRINGS
            .iter()
            .filter(|s| content.contains(&s.to_lowercase()))
            .count();

        if matches >= RULE_MIN_MATCHES {
            return Ok(SignatureReport {
                detected: true,
                threat_type: format!("Rule: {}", RULE_NAME),
                confidence: RULE_CONFIDENCE,
                method: DetectionMethod::RuleMatch,
                details: json!({
                    "rule": RULE_NAME,
                    "matches": matches,
                }),
            });
        }

        Ok(SignatureReport {
            detected: false,
            threat_type: "Clean".to_string(),
            confidence: 0.0,
            method: DetectionMethod::Signature,
            details: json!({
                "hash": digest,
                "signature_match": false,
            }),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
