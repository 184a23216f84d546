//! Social Engineering Module
//!
//! Scores a communication bundle part by part. Emails and free text get the
//! same three keyword checks (urgency, claimed authority, phishing wording);
//! emails additionally check the sender domain, URLs get shortener,
//! typosquatting and TLD checks. Increments are flat per category, so ten
//! urgency keywords weigh the same as one.

use serde::{Deserialize, Serialize};

use super::types::{
    DetectorError, ModuleKind, RiskLevel, SocialReport, SocialSummary, ThreatRecord,
};
use super::Detector;
use crate::snapshot::{CommunicationBundle, EmailMessage};

// ============================================================================
// KEYWORD TABLES
// ============================================================================

const URGENCY_KEYWORDS: &[&str] = &[
    "urgent",
    "immediately",
    "asap",
    "expires",
    "limited time",
    "act now",
    "don't wait",
    "last chance",
    "final notice",
];

const AUTHORITY_KEYWORDS: &[&str] = &[
    "bank",
    "paypal",
    "amazon",
    "microsoft",
    "apple",
    "google",
    "irs",
    "fbi",
    "police",
    "court",
    "legal",
    "official",
];

const PHISHING_INDICATORS: &[&str] = &[
    "verify account",
    "update information",
    "suspended account",
    "security breach",
    "unusual activity",
    "click here",
];

/// URL shortening services that hide the real destination.
const SHORTENER_SERVICES: &[&str] = &["bit.ly", "tinyurl.com", "goo.gl", "t.co", "short.link"];

/// Misspelled brand fragments seen in typosquatted URLs.
const TYPOSQUAT_PATTERNS: &[&str] = &["goog1e", "amaz0n", "paypa1", "micr0soft", "app1e"];

const SUSPICIOUS_TLDS: &[&str] = &[".tk", ".ml", ".ga", ".cf"];

/// Freemail domains commonly spoofed in sender addresses.
const SPOOFED_SENDER_DOMAINS: &[&str] = &["gmail.com", "yahoo.com", "hotmail.com", "outlook.com"];

const URGENCY_INCREMENT: f64 = 0.2;
const AUTHORITY_INCREMENT: f64 = 0.2;
const PHISHING_INCREMENT: f64 = 0.3;
const SENDER_DOMAIN_INCREMENT: f64 = 0.2;
const SHORTENER_INCREMENT: f64 = 0.3;
const TYPOSQUAT_INCREMENT: f64 = 0.4;
const TLD_INCREMENT: f64 = 0.2;

/// A part is suspicious above this raw score (strictly greater).
const SUSPICIOUS_THRESHOLD: f64 = 0.3;

/// Per-part risk tiers, strictly greater.
const PART_HIGH_THRESHOLD: f64 = 0.6;

/// Overall tiers on the raw sum of suspicious parts, inclusive.
const OVERALL_HIGH_THRESHOLD: f64 = 0.6;
const OVERALL_MEDIUM_THRESHOLD: f64 = 0.3;

// ============================================================================
// PART ANALYSIS
// ============================================================================

/// Outcome of scoring one bundle part (email, one URL, or free text).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartAnalysis {
    pub suspicious: bool,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub indicators: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PartAnalysis {
    fn from_score(risk_score: f64, indicators: Vec<String>) -> Self {
        let risk_level = if risk_score > PART_HIGH_THRESHOLD {
            RiskLevel::High
        } else if risk_score > SUSPICIOUS_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        Self {
            suspicious: risk_score > SUSPICIOUS_THRESHOLD,
            risk_score,
            risk_level,
            indicators,
            url: None,
        }
    }
}

fn count_keywords(haystacks: &[&str], keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|k| haystacks.iter().any(|h| h.contains(*k)))
        .count()
}

fn analyze_email(email: &EmailMessage) -> PartAnalysis {
    let subject = email.subject.to_lowercase();
    let content = email.content.to_lowercase();
    let sender = email.sender.to_lowercase();

    let mut risk_score = 0.0;
    let mut indicators = Vec::new();

    let urgency = count_keywords(&[content.as_str(), subject.as_str()], URGENCY_KEYWORDS);
    if urgency > 0 {
        indicators.push(format!("Urgency detected ({} keywords)", urgency));
        risk_score += URGENCY_INCREMENT;
    }

    let authority = count_keywords(&[content.as_str(), subject.as_str()], AUTHORITY_KEYWORDS);
    if authority > 0 {
        indicators.push(format!("Authority claimed ({} keywords)", authority));
        risk_score += AUTHORITY_INCREMENT;
    }

    let phishing = count_keywords(&[content.as_str()], PHISHING_INDICATORS);
    if phishing > 0 {
        indicators.push(format!("Phishing indicators ({} found)", phishing));
        risk_score += PHISHING_INCREMENT;
    }

    if let Some((_, domain)) = sender.split_once('@') {
        if SPOOFED_SENDER_DOMAINS.contains(&domain) {
            indicators.push("Suspicious sender domain".to_string());
            risk_score += SENDER_DOMAIN_INCREMENT;
        }
    }

    PartAnalysis::from_score(risk_score, indicators)
}

fn analyze_url(url: &str) -> PartAnalysis {
    let url_lower = url.to_lowercase();
    let mut risk_score = 0.0;
    let mut indicators = Vec::new();

    if SHORTENER_SERVICES.iter().any(|s| url_lower.contains(s)) {
        indicators.push("Shortened URL detected".to_string());
        risk_score += SHORTENER_INCREMENT;
    }

    if TYPOSQUAT_PATTERNS.iter().any(|p| url_lower.contains(p)) {
        indicators.push("Possible typosquatting".to_string());
        risk_score += TYPOSQUAT_INCREMENT;
    }

    if SUSPICIOUS_TLDS.iter().any(|tld| url_lower.ends_with(tld)) {
        indicators.push("Suspicious TLD".to_string());
        risk_score += TLD_INCREMENT;
    }

    let mut analysis = PartAnalysis::from_score(risk_score, indicators);
    analysis.url = Some(url.to_string());
    analysis
}

fn analyze_content(content: &str) -> PartAnalysis {
    let content = content.to_lowercase();
    let mut risk_score = 0.0;
    let mut indicators = Vec::new();

    let urgency = count_keywords(&[content.as_str()], URGENCY_KEYWORDS);
    if urgency > 0 {
        indicators.push(format!("Urgency detected ({} keywords)", urgency));
        risk_score += URGENCY_INCREMENT;
    }

    let authority = count_keywords(&[content.as_str()], AUTHORITY_KEYWORDS);
    if authority > 0 {
        indicators.push(format!("Authority claimed ({} keywords)", authority));
        risk_score += AUTHORITY_INCREMENT;
    }

    let phishing = count_keywords(&[content.as_str()], PHISHING_INDICATORS);
    if phishing > 0 {
        indicators.push(format!("Phishing indicators ({} found)", phishing));
        risk_score += PHISHING_INCREMENT;
    }

    PartAnalysis::from_score(risk_score, indicators)
}

// ============================================================================
// DETECTOR
// ============================================================================

pub struct SocialEngineeringDetector;

impl SocialEngineeringDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SocialEngineeringDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SocialEngineeringDetector {
    type Input = CommunicationBundle;
    type Report = SocialReport;

    fn score(&self, bundle: &CommunicationBundle) -> Result<SocialReport, DetectorError> {
        let mut threats = Vec::new();
        let mut threat_types = Vec::new();
        let mut risk_score = 0.0;

        if let Some(email) = &bundle.email {
            let analysis = analyze_email(email);
            if analysis.suspicious {
                risk_score += analysis.risk_score;
                threat_types.push("Suspicious Email".to_string());
                threats.push(ThreatRecord {
                    kind: "Suspicious Email".to_string(),
                    module: ModuleKind::SocialEngineering,
                    risk_level: analysis.risk_level,
                    details: serde_json::to_value(&analysis).unwrap_or_default(),
                });
            }
        }

        for url in &bundle.urls {
            let analysis = analyze_url(url);
            if analysis.suspicious {
                risk_score += analysis.risk_score;
                threat_types.push("Suspicious URL".to_string());
                threats.push(ThreatRecord {
                    kind: "Suspicious URL".to_string(),
                    module: ModuleKind::SocialEngineering,
                    risk_level: analysis.risk_level,
                    details: serde_json::to_value(&analysis).unwrap_or_default(),
                });
            }
        }

        if let Some(content) = &bundle.content {
            let analysis = analyze_content(content);
            if analysis.suspicious {
                risk_score += analysis.risk_score;
                threat_types.push("Suspicious Content".to_string());
                threats.push(ThreatRecord {
                    kind: "Suspicious Content".to_string(),
                    module: ModuleKind::SocialEngineering,
                    risk_level: analysis.risk_level,
                    details: serde_json::to_value(&analysis).unwrap_or_default(),
                });
            }
        }

        let threat_level = if risk_score >= OVERALL_HIGH_THRESHOLD {
            RiskLevel::High
        } else if risk_score >= OVERALL_MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Ok(SocialReport {
            threats,
            threat_types,
            threat_level,
            risk_score: (risk_score * 10.0).min(10.0),
            summary: SocialSummary {
                email_analyzed: bundle.email.is_some(),
                urls_analyzed: bundle.urls.len(),
                content_analyzed: bundle.content.is_some(),
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

    fn phishing_email() -> EmailMessage {
        EmailMessage {
            subject: "URGENT: Verify your PayPal account immediately".to_string(),
            sender: "user@gmail.com".to_string(),
            content: "Please verify account details or it will be suspended.".to_string(),
        }
    }

    #[test]
    fn test_phishing_email_scores_high() {
        let analysis = analyze_email(&phishing_email());

        // urgency 0.2 + authority 0.2 + phishing 0.3 + sender domain 0.2
        assert!((analysis.risk_score - 0.9).abs() < 1e-9);
        assert!(analysis.suspicious);
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert_eq!(analysis.indicators.len(), 4);
    }

    #[test]
    fn test_phishing_email_report() {
        let bundle = CommunicationBundle {
            email: Some(phishing_email()),
            ..Default::default()
        };

        let report = SocialEngineeringDetector::new().score(&bundle).unwrap();
        assert_eq!(report.threat_level, RiskLevel::High);
        assert!((report.risk_score - 9.0).abs() < 1e-9);
        assert_eq!(report.threat_types, vec!["Suspicious Email"]);
        assert!(report.summary.email_analyzed);
    }

    #[test]
    fn test_corporate_sender_skips_domain_penalty() {
        let mut email = phishing_email();
        email.sender = "billing@example-corp.com".to_string();

        let analysis = analyze_email(&email);
        assert!((analysis.risk_score - 0.7).abs() < 1e-9);
        assert_eq!(analysis.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_shortener_alone_is_not_suspicious() {
        // 0.3 exactly does not cross the strict suspicious boundary.
        let analysis = analyze_url("https://bit.ly/3xyzzy");
        assert!(!analysis.suspicious);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert!((analysis.risk_score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_typosquat_with_bad_tld() {
        let analysis = analyze_url("http://paypa1-secure.tk");
        // typosquat 0.4 + TLD 0.2
        assert!(analysis.suspicious);
        assert!((analysis.risk_score - 0.6).abs() < 1e-9);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(analysis.url.as_deref(), Some("http://paypa1-secure.tk"));
    }

    #[test]
    fn test_content_part_accumulates() {
        let bundle = CommunicationBundle {
            content: Some(
                "Act now, unusual activity was found on your bank account. Click here."
                    .to_string(),
            ),
            ..Default::default()
        };

        let report = SocialEngineeringDetector::new().score(&bundle).unwrap();
        // urgency 0.2 + authority 0.2 + phishing 0.3 = 0.7
        assert_eq!(report.threat_level, RiskLevel::High);
        assert!((report.risk_score - 7.0).abs() < 1e-9);
        assert_eq!(report.threat_types, vec!["Suspicious Content"]);
    }

    #[test]
    fn test_benign_bundle() {
        let bundle = CommunicationBundle {
            email: Some(EmailMessage {
                subject: "Lunch on Friday?".to_string(),
                sender: "colleague@example-corp.com".to_string(),
                content: "Shall we try the new place around the corner?".to_string(),
            }),
            urls: vec!["https://example.org/menu".to_string()],
            content: None,
        };

        let report = SocialEngineeringDetector::new().score(&bundle).unwrap();
        assert_eq!(report.threat_level, RiskLevel::Low);
        assert_eq!(report.risk_score, 0.0);
        assert!(report.threats.is_empty());
    }
}
