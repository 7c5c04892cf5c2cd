use crate::domain::trend::{
    default_chart_points, ActionType, ChartPoint, GroundingSource, ImpactLevel, Signal,
    SignalKind, TrendRecord, CHART_LABELS,
};
use serde_json::{Map, Value};

const DISCOVERY_REASONING: &str = "Real-time discovery triggered via sensing engine.";
const DISCOVERY_CATEGORY: &str = "Uncategorized";

/// What the payload falls back to when a field is absent or unusable.
/// Refresh overlays onto the previous record; discovery starts from the
/// search query and fixed defaults.
#[derive(Debug, Clone, Copy)]
pub enum SenseContext<'a> {
    Refresh { previous: &'a TrendRecord },
    Discovery { query: &'a str },
}

impl<'a> SenseContext<'a> {
    fn previous(&self) -> Option<&'a TrendRecord> {
        match self {
            Self::Refresh { previous } => Some(previous),
            Self::Discovery { .. } => None,
        }
    }

    // Numeric defaults differ by mode: a refresh that loses a score shows
    // 0 (stale data is visibly stale), a discovery starts mid-scale.
    fn default_score(&self) -> f64 {
        match self {
            Self::Refresh { .. } => 0.0,
            Self::Discovery { .. } => 50.0,
        }
    }

    fn default_weeks(&self) -> u32 {
        match self {
            Self::Refresh { .. } => 0,
            Self::Discovery { .. } => 4,
        }
    }
}

/// Maps a loosely-typed analysis payload onto the domain model. Best-effort
/// by contract: once the payload is a JSON object this cannot fail, it only
/// degrades field by field toward the fallback or fixed defaults. The `id`
/// is never assigned here; that belongs to the state reconciler.
pub fn normalize(raw: &Map<String, Value>, ctx: SenseContext<'_>) -> TrendRecord {
    let prev = ctx.previous();

    let name = non_empty_string(raw.get("name"))
        .or_else(|| prev.map(|p| p.name.clone()))
        .unwrap_or_else(|| match ctx {
            SenseContext::Discovery { query } => query.to_string(),
            // Unreachable in practice; refresh always has a previous name.
            SenseContext::Refresh { previous } => previous.name.clone(),
        });

    let category = non_empty_string(raw.get("category"))
        .or_else(|| prev.map(|p| p.category.clone()))
        .unwrap_or_else(|| DISCOVERY_CATEGORY.to_string());

    let recommended_action = raw
        .get("action")
        .and_then(Value::as_str)
        .and_then(ActionType::parse)
        .or(prev.map(|p| p.recommended_action))
        .unwrap_or(ActionType::Test);

    let impact_level = raw
        .get("impact")
        .and_then(Value::as_str)
        .and_then(ImpactLevel::parse)
        .or(prev.map(|p| p.impact_level))
        .unwrap_or(ImpactLevel::Low);

    let reasoning = non_empty_string(raw.get("reasoning"))
        .or_else(|| prev.map(|p| p.reasoning.clone()))
        .unwrap_or_else(|| DISCOVERY_REASONING.to_string());

    let confidence = coerce_number(raw.get("confidence"))
        .map(clamp_score)
        .unwrap_or_else(|| ctx.default_score());

    let trend_score = coerce_number(raw.get("trendScore"))
        .map(clamp_score)
        .unwrap_or_else(|| ctx.default_score());

    let time_sensitivity_weeks = coerce_number(raw.get("sensitivity"))
        .map(|n| n.max(0.0).round() as u32)
        .unwrap_or_else(|| ctx.default_weeks());

    let historical_analog =
        non_empty_string(raw.get("analog")).or_else(|| prev.and_then(|p| p.historical_analog.clone()));

    let signals = normalize_signals(raw.get("awarenessSignals"))
        .filter(|s| !s.is_empty())
        .or_else(|| prev.map(|p| p.signals.clone()))
        .unwrap_or_default();

    let grounding_sources = normalize_grounding(raw.get("groundingSources"))
        .or_else(|| prev.and_then(|p| p.grounding_sources.clone()));

    let chart_points = normalize_chart_points(raw.get("points"));

    TrendRecord {
        id: String::new(),
        name,
        category,
        trend_score,
        impact_level,
        recommended_action,
        confidence,
        reasoning,
        time_sensitivity_weeks,
        historical_analog,
        signals,
        chart_points,
        grounding_sources,
    }
}

fn clamp_score(n: f64) -> f64 {
    n.clamp(0.0, 100.0)
}

fn non_empty_string(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// Accepts JSON numbers and numeric strings; anything else is "absent".
fn coerce_number(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Positional mapping of the payload `points` array onto the fixed chart
/// labels. Extra entries are dropped; short series are padded by repeating
/// the last value; no usable array yields the default series.
fn normalize_chart_points(v: Option<&Value>) -> Vec<ChartPoint> {
    let values: Vec<f64> = match v.and_then(Value::as_array) {
        Some(arr) => arr
            .iter()
            .filter_map(|p| coerce_number(Some(p)))
            .take(CHART_LABELS.len())
            .collect(),
        None => Vec::new(),
    };

    if values.is_empty() {
        return default_chart_points();
    }

    let last = *values.last().unwrap_or(&0.0);
    CHART_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| ChartPoint {
            label: (*label).to_string(),
            value: values.get(i).copied().unwrap_or(last),
        })
        .collect()
}

// A wire signal without a recognizable kind is dropped rather than guessed.
fn normalize_signals(v: Option<&Value>) -> Option<Vec<Signal>> {
    let arr = v?.as_array()?;
    let signals = arr.iter().filter_map(signal_from_value).collect();
    Some(signals)
}

fn signal_from_value(v: &Value) -> Option<Signal> {
    let obj = v.as_object()?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(SignalKind::parse)?;

    Some(Signal {
        kind,
        source: non_empty_string(obj.get("source")).unwrap_or_else(|| "Unknown".to_string()),
        description: non_empty_string(obj.get("description")).unwrap_or_default(),
        intensity: coerce_number(obj.get("intensity"))
            .map(clamp_score)
            .unwrap_or(0.0),
        timestamp: non_empty_string(obj.get("timestamp")).unwrap_or_default(),
    })
}

fn normalize_grounding(v: Option<&Value>) -> Option<Vec<GroundingSource>> {
    let arr = v?.as_array()?;
    let sources: Vec<GroundingSource> = arr
        .iter()
        .filter_map(|s| {
            let obj = s.as_object()?;
            let uri = non_empty_string(obj.get("uri"))?;
            Some(GroundingSource {
                title: non_empty_string(obj.get("title")).unwrap_or_else(|| "Source".to_string()),
                uri,
            })
        })
        .collect();

    if sources.is_empty() {
        None
    } else {
        Some(sources)
    }
}
