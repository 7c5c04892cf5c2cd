use serde::{Deserialize, Serialize};

/// Fixed trailing window rendered by the trend chart: three weekly
/// lookbacks plus today. Normalized records always carry exactly one
/// point per label.
pub const CHART_LABELS: [&str; 4] = ["-21d", "-14d", "-7d", "Today"];

/// Chart values used when the analysis payload carries no usable series.
pub const DEFAULT_CHART_VALUES: [f64; 4] = [10.0, 20.0, 30.0, 40.0];

/// Prescriptive merchandising action for a tracked license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Test,
    Scale,
    Hold,
    Avoid,
    Kill,
}

impl ActionType {
    /// Lenient parse for model output: trimmed, case-insensitive.
    /// Unknown strings yield `None` so callers can fall back.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEST" => Some(Self::Test),
            "SCALE" => Some(Self::Scale),
            "HOLD" => Some(Self::Hold),
            "AVOID" => Some(Self::Avoid),
            "KILL" => Some(Self::Kill),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Search,
    News,
    Social,
}

impl SignalKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Some(Self::Search),
            "news" => Some(Self::News),
            "social" => Some(Self::Social),
            _ => None,
        }
    }
}

/// One piece of supporting evidence behind a trend score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub source: String,
    pub description: String,
    pub intensity: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Citation returned by a search-grounded analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// A single tracked merchandising opportunity. Created by seed data or a
/// discovery sensing run; mutated only by a refresh sensing run. Never
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub trend_score: f64,
    pub impact_level: ImpactLevel,
    pub recommended_action: ActionType,
    pub confidence: f64,
    pub reasoning: String,
    /// Remaining weeks of peak demand.
    pub time_sensitivity_weeks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_analog: Option<String>,
    pub signals: Vec<Signal>,
    /// Always 4 entries after normalization, one per `CHART_LABELS` slot.
    pub chart_points: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_sources: Option<Vec<GroundingSource>>,
}

/// The default chart series, labeled.
pub fn default_chart_points() -> Vec<ChartPoint> {
    CHART_LABELS
        .iter()
        .zip(DEFAULT_CHART_VALUES)
        .map(|(label, value)| ChartPoint {
            label: (*label).to_string(),
            value,
        })
        .collect()
}
