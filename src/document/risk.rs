//! Weighted risk scoring, display bands, and the library's risk filter.

use super::RiskLevel;
use serde::Serialize;

const MAX_RISK_SCORE: u32 = 100;

fn severity_weight(level: RiskLevel) -> u32 {
    match level {
        RiskLevel::Critical => 25,
        RiskLevel::High => 15,
        RiskLevel::Medium => 8,
        RiskLevel::Low => 3,
    }
}

/// Sum severity weights (critical 25, high 15, medium 8, low 3), capped at 100.
pub fn calculate_risk_score<I>(severities: I) -> u8
where
    I: IntoIterator<Item = RiskLevel>,
{
    let total: u32 = severities.into_iter().map(severity_weight).sum();
    total.min(MAX_RISK_SCORE) as u8
}

/// Display band for a 0-100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    /// Below 25.
    Low,
    /// 25 to 49.
    Medium,
    /// 50 to 74.
    High,
    /// 75 and above.
    Critical,
}

impl RiskBand {
    /// Classify a score.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => Self::Low,
            25..=49 => Self::Medium,
            50..=74 => Self::High,
            _ => Self::Critical,
        }
    }

    /// Hex colour used by clients rendering the score.
    pub fn color(self) -> &'static str {
        match self {
            Self::Low => "#44AA44",
            Self::Medium => "#FFCC00",
            Self::High => "#FF8800",
            Self::Critical => "#FF4444",
        }
    }
}

/// Library filter buckets over the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskFilter {
    /// 0 to 30.
    Low,
    /// 31 to 60.
    Medium,
    /// Above 60.
    High,
}

impl RiskFilter {
    /// Whether `score` falls in this bucket.
    pub fn matches(self, score: u8) -> bool {
        match self {
            Self::Low => score <= 30,
            Self::Medium => (31..=60).contains(&score),
            Self::High => score > 60,
        }
    }
}

/// Scores above this count as high risk in library statistics.
pub const HIGH_RISK_THRESHOLD: u8 = 60;
