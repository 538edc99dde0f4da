//! Risk tier classification.
//!
//! Maps a risk probability in `[0, 1]` to one of three tiers. Thresholds are
//! strict: a probability exactly on a boundary belongs to the lower tier.

use serde::Serialize;

// ANSI styles for terminal rendering
const RED: &str = "\x1b[91m";
const ORANGE: &str = "\x1b[38;5;208m";
const GREEN: &str = "\x1b[92m";

/// Probability above which a point is high risk.
pub const HIGH_THRESHOLD: f64 = 0.7;

/// Probability above which a point is medium risk.
pub const MEDIUM_THRESHOLD: f64 = 0.3;

/// Discrete risk bucket derived from a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// p > 0.7
    High,
    /// 0.3 < p <= 0.7
    Medium,
    /// p <= 0.3
    Low,
}

/// Classify a probability into a risk tier.
#[must_use]
pub fn classify(probability: f64) -> RiskTier {
    if probability > HIGH_THRESHOLD {
        RiskTier::High
    } else if probability > MEDIUM_THRESHOLD {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Format a probability as a percentage with one decimal, e.g. `80.0%`.
#[must_use]
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

impl RiskTier {
    /// All tiers, highest first (legend order).
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Marker fill color.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::High => "#e74c3c",
            Self::Medium => "#f39c12",
            Self::Low => "#27ae60",
        }
    }

    /// Style class name.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::High => "high-risk",
            Self::Medium => "medium-risk",
            Self::Low => "low-risk",
        }
    }

    /// Legend label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High (>70%)",
            Self::Medium => "Medium (30-70%)",
            Self::Low => "Low (<30%)",
        }
    }

    /// Short name, as the risk service spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// ANSI escape used when drawing this tier in a terminal.
    #[must_use]
    pub const fn ansi(self) -> &'static str {
        match self {
            Self::High => RED,
            Self::Medium => ORANGE,
            Self::Low => GREEN,
        }
    }
}

impl std::str::FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("unknown risk tier: {s}")),
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
