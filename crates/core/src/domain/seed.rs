use crate::domain::trend::{
    ActionType, ChartPoint, ImpactLevel, Signal, SignalKind, TrendRecord,
};

fn chart(values: [f64; 4]) -> Vec<ChartPoint> {
    ["Jan 05", "Jan 12", "Jan 19", "Jan 26"]
        .iter()
        .zip(values)
        .map(|(label, value)| ChartPoint {
            label: (*label).to_string(),
            value,
        })
        .collect()
}

fn signal(kind: SignalKind, source: &str, description: &str, intensity: f64, ts: &str) -> Signal {
    Signal {
        kind,
        source: source.to_string(),
        description: description.to_string(),
        intensity,
        timestamp: ts.to_string(),
    }
}

/// Bootstrap portfolio shown before the first sensing run.
pub fn seed_trends() -> Vec<TrendRecord> {
    vec![
        TrendRecord {
            id: "1".to_string(),
            name: "Cyberpunk Edgerunners S2".to_string(),
            category: "Anime".to_string(),
            trend_score: 88.0,
            impact_level: ImpactLevel::High,
            recommended_action: ActionType::Scale,
            confidence: 92.0,
            reasoning: "Keyword velocity for \"Cyberpunk\" has spiked following recent project \
                        leaks and studio announcements. High demand for premium streetwear."
                .to_string(),
            time_sensitivity_weeks: 4,
            historical_analog: Some("Arcane Season 1".to_string()),
            signals: vec![
                signal(
                    SignalKind::News,
                    "Deadline",
                    "Studio Trigger confirms new project timeline for late 2025",
                    95.0,
                    "2025-01-20",
                ),
                signal(
                    SignalKind::Search,
                    "Google Trends",
                    "\"Cyberpunk apparel\" searches up 300% in US/UK markets",
                    80.0,
                    "2025-01-24",
                ),
            ],
            chart_points: chart([20.0, 25.0, 35.0, 88.0]),
            grounding_sources: None,
        },
        TrendRecord {
            id: "4".to_string(),
            name: "Stranger Things 5".to_string(),
            category: "Entertainment".to_string(),
            trend_score: 94.0,
            impact_level: ImpactLevel::High,
            recommended_action: ActionType::Scale,
            confidence: 96.0,
            reasoning: "Final season production wrap and Netflix teaser drops have triggered a \
                        massive surge in 80s nostalgia and character-specific apparel intent."
                .to_string(),
            time_sensitivity_weeks: 8,
            historical_analog: Some("Stranger Things S4".to_string()),
            signals: vec![
                signal(
                    SignalKind::News,
                    "Variety",
                    "Netflix releases \"Stranger Things 5\" behind-the-scenes footage; 2025 \
                     release confirmed",
                    98.0,
                    "2025-01-15",
                ),
                signal(
                    SignalKind::Social,
                    "TikTok",
                    "#StrangerThings5 theories generating 500M+ weekly views",
                    92.0,
                    "2025-01-25",
                ),
            ],
            chart_points: chart([45.0, 55.0, 75.0, 94.0]),
            grounding_sources: None,
        },
        TrendRecord {
            id: "2".to_string(),
            name: "Genshin Impact x Collab".to_string(),
            category: "Gaming".to_string(),
            trend_score: 65.0,
            impact_level: ImpactLevel::Medium,
            recommended_action: ActionType::Test,
            confidence: 78.0,
            reasoning: "Consistent engagement baseline. New region expansion driving sustained \
                        social volume."
                .to_string(),
            time_sensitivity_weeks: 12,
            historical_analog: None,
            signals: vec![signal(
                SignalKind::Social,
                "Reddit",
                "Leaked images of new character skin sets trending on gaming subs",
                70.0,
                "2025-01-22",
            )],
            chart_points: chart([55.0, 60.0, 58.0, 65.0]),
            grounding_sources: None,
        },
        TrendRecord {
            id: "3".to_string(),
            name: "Marvel: Avengers Doomsday".to_string(),
            category: "Entertainment".to_string(),
            trend_score: 45.0,
            impact_level: ImpactLevel::High,
            recommended_action: ActionType::Hold,
            confidence: 85.0,
            reasoning: "IP in early awareness phase. High news volume but limited immediate \
                        apparel intent signals."
                .to_string(),
            time_sensitivity_weeks: 52,
            historical_analog: None,
            signals: vec![signal(
                SignalKind::News,
                "Variety",
                "Production updates and casting rumors driving 2026 hype",
                60.0,
                "2025-01-25",
            )],
            chart_points: chart([10.0, 15.0, 40.0, 45.0]),
            grounding_sources: None,
        },
    ]
}
