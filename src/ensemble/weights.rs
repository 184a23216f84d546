//! Detection Weights
//!
//! Per-module weights for the ensemble aggregate. The table always sums to
//! 1.0: construction normalizes positive input and falls back to the
//! built-in defaults when the supplied set is degenerate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detectors::types::ModuleKind;

/// Built-in weight table, applied at construction and as the fallback for
/// degenerate operator input.
pub const DEFAULT_WEIGHTS: &[(ModuleKind, f64)] = &[
    (ModuleKind::Signature, 0.25),
    (ModuleKind::FileAnalysis, 0.20),
    (ModuleKind::Behavioral, 0.20),
    (ModuleKind::Encrypted, 0.15),
    (ModuleKind::SocialEngineering, 0.20),
];

/// Normalized per-module weight table.
///
/// Replaced wholesale via [`DetectionWeights::normalized`], never mutated in
/// place. Modules absent from the table weigh zero and are excluded from
/// aggregation. Entries are expected non-negative; a set summing to zero or
/// less resets to [`DEFAULT_WEIGHTS`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionWeights {
    table: HashMap<ModuleKind, f64>,
}

impl DetectionWeights {
    /// Builds a weight table normalized to sum 1.0.
    pub fn normalized(raw: HashMap<ModuleKind, f64>) -> Self {
        let sum: f64 = raw.values().sum();
        if sum > 0.0 {
            Self {
                table: raw.into_iter().map(|(k, w)| (k, w / sum)).collect(),
            }
        } else {
            log::warn!(
                "degenerate detection weight set (sum {:.3}); resetting to defaults",
                sum
            );
            Self::default()
        }
    }

    /// Weight for one module; zero when the module is not in the table.
    pub fn get(&self, kind: ModuleKind) -> f64 {
        self.table.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleKind, f64)> + '_ {
        self.table.iter().map(|(kind, weight)| (*kind, *weight))
    }

    pub fn sum(&self) -> f64 {
        self.table.values().sum()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for DetectionWeights {
    fn default() -> Self {
        Self {
            table: DEFAULT_WEIGHTS.iter().copied().collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
