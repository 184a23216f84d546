//! File Analysis Module
//!
//! Classifies a file into benign / suspicious / malicious from three cheap
//! signals: extension membership, fixed malicious substrings in the decoded
//! text, and size when the content is not text.

use std::fs;
use std::path::Path;

use super::types::{DetectorError, FileFeatures, FileReport, FileVerdict};
use super::Detector;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Substrings counted toward the content threat score.
const MALICIOUS_PATTERNS: &[&str] = &[
    "cmd.exe",
    "powershell",
    "DownloadString",
    "Invoke-Expression",
    "regsvr32",
    "rundll32",
    "wscript",
    "cscript",
    "mshta",
];

const SUSPICIOUS_EXTENSIONS: &[&str] = &[".exe", ".bat", ".cmd", ".ps1", ".vbs", ".js"];

/// Binary files above this size with a suspicious extension are flagged.
const BINARY_SIZE_THRESHOLD: u64 = 1024;

/// Content score above this is malicious (strictly greater).
const MALICIOUS_SCORE_THRESHOLD: f64 = 0.3;

/// Content score above this is suspicious (strictly greater).
const SUSPICIOUS_SCORE_THRESHOLD: f64 = 0.1;

// ============================================================================
// DETECTOR
// ============================================================================

pub struct FileAnalyzer;

impl FileAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Verdict for a text file at the given content threat score.
///
/// Both boundaries are strictly greater-than: a score of exactly 0.3 is
/// suspicious, exactly 0.1 is benign.
pub(crate) fn classify_score(threat_score: f64) -> (FileVerdict, f64, &'static str) {
    if threat_score > MALICIOUS_SCORE_THRESHOLD {
        let confidence = (0.5 + threat_score * 0.4).min(0.9);
        (FileVerdict::Malicious, confidence, "Script-based Malware")
    } else if threat_score > SUSPICIOUS_SCORE_THRESHOLD {
        (FileVerdict::Suspicious, 0.6, "Potentially Suspicious")
    } else {
        (FileVerdict::Benign, 0.8, "Clean File")
    }
}

impl Detector for FileAnalyzer {
    type Input = Path;
    type Report = FileReport;

    fn score(&self, path: &Path) -> Result<FileReport, DetectorError> {
        if !path.exists() {
            return Err(DetectorError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path).map_err(|e| DetectorError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let file_size = bytes.len() as u64;
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let suspicious_extension = SUSPICIOUS_EXTENSIONS.contains(&extension.as_str());

        let content = match String::from_utf8(bytes) {
            Ok(text) => text.to_lowercase(),
            Err(_) => {
                // Not decodable as text: classify on size and extension alone.
                return Ok(binary_report(file_size, extension, suspicious_extension));
            }
        };

        let matched_patterns: Vec<String> = MALICIOUS_PATTERNS
            .iter()
            .filter(|p| content.contains(&p.to_lowercase()))
            .map(|p| p.to_string())
            .collect();

        let threat_score = matched_patterns.len() as f64 / MALICIOUS_PATTERNS.len() as f64;
        let (prediction, confidence, threat_type) = classify_score(threat_score);

        Ok(FileReport {
            prediction,
            confidence,
            threat_type: threat_type.to_string(),
            features: FileFeatures {
                file_size,
                extension,
                is_binary: false,
                matched_patterns,
                threat_score,
            },
        })
    }
}

fn binary_report(file_size: u64, extension: String, suspicious_extension: bool) -> FileReport {
    let (prediction, confidence, threat_type) =
        if suspicious_extension && file_size > BINARY_SIZE_THRESHOLD {
            (FileVerdict::Suspicious, 0.6, "Suspicious Binary")
        } else {
            (FileVerdict::Benign, 0.8, "Clean File")
        };

    FileReport {
        prediction,
        confidence,
        threat_type: threat_type.to_string(),
        features: FileFeatures {
            file_size,
            extension,
            is_binary: true,
            matched_patterns: Vec::new(),
            threat_score: 0.0,
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================
