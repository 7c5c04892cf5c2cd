use crate::domain::trend::TrendRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Snapshot of everything the dashboard renders. Owned by the API layer;
/// the reconciler functions below take a snapshot and return the next one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub trends: Vec<TrendRecord>,
    pub selected_id: Option<String>,
    pub is_sensing: bool,
    pub last_synced_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl DashboardState {
    pub fn bootstrap(trends: Vec<TrendRecord>, now: DateTime<Utc>) -> Self {
        let selected_id = trends.first().map(|t| t.id.clone());
        Self {
            trends,
            selected_id,
            is_sensing: false,
            last_synced_at: now,
            last_error: None,
        }
    }

    pub fn trend(&self, id: &str) -> Option<&TrendRecord> {
        self.trends.iter().find(|t| t.id == id)
    }
}

/// Marks a sensing operation in flight and clears any stale error.
pub fn begin_sensing(mut state: DashboardState) -> DashboardState {
    state.is_sensing = true;
    state.last_error = None;
    state
}

/// Replaces the record at `target_id` with the normalized result of a
/// refresh run. The existing id survives; the normalizer never assigns
/// one. An unknown target leaves the collection untouched and only clears
/// the busy flag.
pub fn apply_refresh(
    mut state: DashboardState,
    target_id: &str,
    record: TrendRecord,
    now: DateTime<Utc>,
) -> DashboardState {
    state.is_sensing = false;

    let Some(slot) = state.trends.iter_mut().find(|t| t.id == target_id) else {
        return state;
    };

    *slot = TrendRecord {
        id: target_id.to_string(),
        ..record
    };
    state.last_synced_at = now;
    state.last_error = None;
    state
}

/// Inserts a newly discovered record at the top of the collection under a
/// fresh unique id and selects it.
pub fn apply_discovery(
    mut state: DashboardState,
    record: TrendRecord,
    now: DateTime<Utc>,
) -> DashboardState {
    let id = Uuid::new_v4().to_string();
    state.trends.insert(
        0,
        TrendRecord {
            id: id.clone(),
            ..record
        },
    );
    state.selected_id = Some(id);
    state.is_sensing = false;
    state.last_synced_at = now;
    state.last_error = None;
    state
}

/// Records a failed sensing operation. The collection is never mutated on
/// failure.
pub fn apply_failure(mut state: DashboardState, message: String) -> DashboardState {
    state.is_sensing = false;
    state.last_error = Some(message);
    state
}

/// Selection change from the dashboard; unknown ids are ignored.
pub fn apply_selection(mut state: DashboardState, id: &str) -> DashboardState {
    if state.trend(id).is_some() {
        state.selected_id = Some(id.to_string());
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::seed::seed_trends;
    use crate::sensing::json::parse_payload;
    use crate::sensing::normalize::{normalize, SenseContext};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 27, 12, 0, 0).unwrap()
    }

    fn seeded() -> DashboardState {
        DashboardState::bootstrap(seed_trends(), now())
    }

    #[test]
    fn bootstrap_selects_first_record() {
        let state = seeded();
        assert_eq!(state.selected_id.as_deref(), Some("1"));
        assert!(!state.is_sensing);
    }

    #[test]
    fn refresh_replaces_target_and_preserves_id() {
        let state = seeded();
        let previous = state.trend("1").unwrap().clone();
        let payload = parse_payload(r#"{"trendScore": 99, "points": [1, 2, 3, 4]}"#).unwrap();
        let record = normalize(&payload, SenseContext::Refresh { previous: &previous });

        let next = apply_refresh(state, "1", record, now());
        let refreshed = next.trend("1").unwrap();
        assert_eq!(refreshed.trend_score, 99.0);
        assert_eq!(refreshed.name, "Cyberpunk Edgerunners S2");
        let values: Vec<f64> = refreshed.chart_points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(next.trends.len(), 4);
        assert!(!next.is_sensing);
        assert!(next.last_error.is_none());
    }

    #[test]
    fn refresh_is_idempotent() {
        let state = seeded();
        let previous = state.trend("1").unwrap().clone();
        let payload = parse_payload(r#"{"trendScore": 80, "action": "HOLD"}"#).unwrap();
        let record = normalize(&payload, SenseContext::Refresh { previous: &previous });

        let once = apply_refresh(state, "1", record.clone(), now());
        let twice = apply_refresh(once.clone(), "1", record, now());
        assert_eq!(once.trends, twice.trends);
        assert_eq!(once.selected_id, twice.selected_id);
        assert_eq!(once.last_synced_at, twice.last_synced_at);
    }

    #[test]
    fn refresh_of_unknown_target_only_clears_busy() {
        let state = begin_sensing(seeded());
        let previous = state.trend("1").unwrap().clone();
        let record = normalize(
            &parse_payload("{}").unwrap(),
            SenseContext::Refresh { previous: &previous },
        );

        let before_trends = state.trends.clone();
        let before_synced = state.last_synced_at;
        let next = apply_refresh(state, "does-not-exist", record, now());
        assert_eq!(next.trends, before_trends);
        assert_eq!(next.last_synced_at, before_synced);
        assert!(!next.is_sensing);
    }

    #[test]
    fn discovery_prepends_selects_and_assigns_id() {
        let state = seeded();
        let record = normalize(
            &parse_payload(r#"{"name": "Chainsaw Man Movie"}"#).unwrap(),
            SenseContext::Discovery { query: "chainsaw man" },
        );

        let next = apply_discovery(state, record, now());
        assert_eq!(next.trends.len(), 5);
        assert_eq!(next.trends[0].name, "Chainsaw Man Movie");
        assert!(!next.trends[0].id.is_empty());
        assert_eq!(next.selected_id.as_deref(), Some(next.trends[0].id.as_str()));
    }

    #[test]
    fn discovery_ids_are_unique_in_immediate_succession() {
        let record = normalize(
            &parse_payload("{}").unwrap(),
            SenseContext::Discovery { query: "q" },
        );

        let state = apply_discovery(seeded(), record.clone(), now());
        let state = apply_discovery(state, record, now());
        assert_ne!(state.trends[0].id, state.trends[1].id);
    }

    #[test]
    fn failure_sets_error_and_leaves_collection_alone() {
        let state = begin_sensing(seeded());
        let before = state.trends.clone();
        let next = apply_failure(state, "Sensing engine unavailable: timeout".to_string());
        assert_eq!(next.trends, before);
        assert!(!next.is_sensing);
        assert_eq!(
            next.last_error.as_deref(),
            Some("Sensing engine unavailable: timeout")
        );
    }

    #[test]
    fn begin_sensing_clears_previous_error() {
        let state = apply_failure(seeded(), "old error".to_string());
        let state = begin_sensing(state);
        assert!(state.is_sensing);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn selection_ignores_unknown_ids() {
        let state = seeded();
        let state = apply_selection(state, "2");
        assert_eq!(state.selected_id.as_deref(), Some("2"));
        let state = apply_selection(state, "ghost");
        assert_eq!(state.selected_id.as_deref(), Some("2"));
    }

    // End-to-end: raw text through parse -> normalize -> refresh.
    #[test]
    fn sensing_round_trip_updates_only_sensed_fields() {
        let mut seed = seed_trends();
        seed.truncate(1);
        seed[0].id = "1".to_string();
        seed[0].name = "X".to_string();
        seed[0].trend_score = 10.0;
        let state = DashboardState::bootstrap(seed, now());

        let raw = "```json\n{\"trendScore\": 99, \"points\": [1, 2, 3, 4]}\n```\nSources: [1]";
        let payload = parse_payload(raw).unwrap();
        let previous = state.trend("1").unwrap().clone();
        let record = normalize(&payload, SenseContext::Refresh { previous: &previous });
        let next = apply_refresh(state, "1", record, now());

        let trend = next.trend("1").unwrap();
        assert_eq!(trend.trend_score, 99.0);
        assert_eq!(trend.name, "X");
        let values: Vec<f64> = trend.chart_points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
