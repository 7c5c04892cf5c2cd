use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_core::domain::kpi::kpi_definitions;
use pulse_core::domain::seed::seed_trends;
use pulse_core::domain::trend::TrendRecord;
use pulse_core::sensing::error::SenseError;
use pulse_core::sensing::gemini::GeminiClient;
use pulse_core::sensing::normalize::SenseContext;
use pulse_core::sensing::{run_sensing, AnalysisClient};
use pulse_core::state::{
    apply_discovery, apply_failure, apply_refresh, apply_selection, begin_sensing, DashboardState,
};

const MIN_DISCOVERY_QUERY_LEN: usize = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = pulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    // Missing key starts the API in degraded mode: the dashboard renders
    // seed data, sensing requests surface the credential error.
    let client: Option<Arc<dyn AnalysisClient>> = match GeminiClient::from_settings(&settings) {
        Ok(c) => Some(Arc::new(c)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "sensing client unavailable; starting API in degraded mode");
            None
        }
    };

    let state = AppState {
        dashboard: Arc::new(Mutex::new(DashboardState::bootstrap(
            seed_trends(),
            Utc::now(),
        ))),
        client,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/state", get(get_state))
        .route("/kpis", get(get_kpis))
        .route("/trends", get(get_trends))
        .route("/trends/:id", get(get_trend))
        .route("/trends/:id/select", post(select_trend))
        .route("/trends/:id/refresh", post(refresh_trend))
        .route("/discover", post(discover_trend))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    dashboard: Arc<Mutex<DashboardState>>,
    client: Option<Arc<dyn AnalysisClient>>,
}

async fn get_state(State(state): State<AppState>) -> Json<DashboardState> {
    Json(state.dashboard.lock().await.clone())
}

async fn get_kpis() -> Json<&'static [pulse_core::domain::kpi::KpiDefinition]> {
    Json(kpi_definitions())
}

async fn get_trends(State(state): State<AppState>) -> Json<Vec<TrendRecord>> {
    Json(state.dashboard.lock().await.trends.clone())
}

async fn get_trend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrendRecord>, StatusCode> {
    let dashboard = state.dashboard.lock().await;
    dashboard
        .trend(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn select_trend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DashboardState>, StatusCode> {
    let mut dashboard = state.dashboard.lock().await;
    if dashboard.trend(&id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    *dashboard = apply_selection(dashboard.clone(), &id);
    Ok(Json(dashboard.clone()))
}

async fn refresh_trend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrendRecord>, (StatusCode, String)> {
    // Detached task: axum drops the handler future when the HTTP client
    // disconnects, and a cancelled await between begin_sensing and
    // apply_* would strand is_sensing=true forever. The spawned task
    // always runs to completion and clears the flag.
    tokio::spawn(run_refresh(state, id))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("sensing task failed: {e}")))?
}

async fn run_refresh(
    state: AppState,
    id: String,
) -> Result<Json<TrendRecord>, (StatusCode, String)> {
    // Snapshot the target and flip the busy flag under one lock hold so a
    // second sensing request cannot slip in between.
    let previous = {
        let mut dashboard = state.dashboard.lock().await;
        if dashboard.is_sensing {
            return Err((
                StatusCode::CONFLICT,
                "A sensing operation is already in progress.".to_string(),
            ));
        }
        let Some(previous) = dashboard.trend(&id).cloned() else {
            return Err((StatusCode::NOT_FOUND, format!("unknown trend id {id}")));
        };
        *dashboard = begin_sensing(dashboard.clone());
        previous
    };

    let result = match &state.client {
        Some(client) => {
            run_sensing(
                client.as_ref(),
                &previous.name,
                &previous.category,
                SenseContext::Refresh {
                    previous: &previous,
                },
            )
            .await
        }
        None => Err(SenseError::MissingCredential),
    };

    let mut dashboard = state.dashboard.lock().await;
    match result {
        Ok(record) => {
            *dashboard = apply_refresh(dashboard.clone(), &id, record, Utc::now());
            tracing::info!(trend_id = %id, "refresh sensing applied");
            dashboard
                .trend(&id)
                .cloned()
                .map(Json)
                .ok_or((StatusCode::NOT_FOUND, format!("unknown trend id {id}")))
        }
        Err(err) => {
            tracing::warn!(trend_id = %id, error = %err, "refresh sensing failed");
            let message = err.user_message();
            *dashboard = apply_failure(dashboard.clone(), message.clone());
            Err((sense_status(&err), message))
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverRequest {
    query: String,
}

async fn discover_trend(
    State(state): State<AppState>,
    Json(req): Json<DiscoverRequest>,
) -> Result<Json<TrendRecord>, (StatusCode, String)> {
    // Same disconnect hazard as refresh_trend.
    tokio::spawn(run_discovery(state, req))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("sensing task failed: {e}")))?
}

async fn run_discovery(
    state: AppState,
    req: DiscoverRequest,
) -> Result<Json<TrendRecord>, (StatusCode, String)> {
    let query = req.query.trim().to_string();
    if query.len() < MIN_DISCOVERY_QUERY_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            "discovery query must be at least 2 characters".to_string(),
        ));
    }

    {
        let mut dashboard = state.dashboard.lock().await;
        if dashboard.is_sensing {
            return Err((
                StatusCode::CONFLICT,
                "A sensing operation is already in progress.".to_string(),
            ));
        }
        *dashboard = begin_sensing(dashboard.clone());
    }

    let result = match &state.client {
        Some(client) => {
            run_sensing(
                client.as_ref(),
                &query,
                "Discovery",
                SenseContext::Discovery { query: &query },
            )
            .await
        }
        None => Err(SenseError::MissingCredential),
    };

    let mut dashboard = state.dashboard.lock().await;
    match result {
        Ok(record) => {
            *dashboard = apply_discovery(dashboard.clone(), record, Utc::now());
            let discovered = dashboard.trends[0].clone();
            tracing::info!(trend_id = %discovered.id, "discovery sensing applied");
            Ok(Json(discovered))
        }
        Err(err) => {
            tracing::warn!(%query, error = %err, "discovery sensing failed");
            let message = err.user_message();
            *dashboard = apply_failure(dashboard.clone(), message.clone());
            Err((sense_status(&err), message))
        }
    }
}

fn sense_status(err: &SenseError) -> StatusCode {
    match err {
        SenseError::MissingCredential | SenseError::UnsupportedRegion { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SenseError::Transport { .. }
        | SenseError::EmptyResponse
        | SenseError::InvalidPayload(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &pulse_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::sensing::AnalysisOutcome;
    use std::time::Duration;

    // Answers after a delay long enough for the test to drop the handler
    // future mid-call.
    struct SlowClient;

    #[async_trait::async_trait]
    impl AnalysisClient for SlowClient {
        fn provider_name(&self) -> &'static str {
            "slow"
        }

        async fn analyze(
            &self,
            _subject: &str,
            _category: &str,
        ) -> Result<AnalysisOutcome, SenseError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(AnalysisOutcome {
                text: "{\"trendScore\": 70}".to_string(),
                grounding_sources: Vec::new(),
            })
        }
    }

    fn test_state(client: Option<Arc<dyn AnalysisClient>>) -> AppState {
        AppState {
            dashboard: Arc::new(Mutex::new(DashboardState::bootstrap(
                seed_trends(),
                Utc::now(),
            ))),
            client,
        }
    }

    #[tokio::test]
    async fn disconnect_mid_sense_still_completes_and_releases_busy_flag() {
        let state = test_state(Some(Arc::new(SlowClient)));

        // A client disconnect drops the handler future while the analysis
        // call is in flight.
        let fut = refresh_trend(State(state.clone()), Path("1".to_string()));
        assert!(tokio::time::timeout(Duration::from_millis(5), fut)
            .await
            .is_err());

        // The detached task finishes the operation and clears the flag.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let dashboard = state.dashboard.lock().await;
        assert!(!dashboard.is_sensing);
        assert!(dashboard.last_error.is_none());
        assert_eq!(dashboard.trend("1").unwrap().trend_score, 70.0);
    }

    #[tokio::test]
    async fn concurrent_sensing_is_rejected_with_conflict() {
        let state = test_state(Some(Arc::new(SlowClient)));
        {
            let mut dashboard = state.dashboard.lock().await;
            *dashboard = begin_sensing(dashboard.clone());
        }

        let (status, _) = refresh_trend(State(state.clone()), Path("1".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = discover_trend(
            State(state.clone()),
            Json(DiscoverRequest {
                query: "chainsaw man".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);

        // The rejected requests must not clear the other operation's flag.
        assert!(state.dashboard.lock().await.is_sensing);
    }

    #[tokio::test]
    async fn missing_client_surfaces_credential_error_and_clears_flag() {
        let state = test_state(None);

        let (status, message) = refresh_trend(State(state.clone()), Path("1".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(message.contains("API key"));

        let dashboard = state.dashboard.lock().await;
        assert!(!dashboard.is_sensing);
        assert_eq!(dashboard.last_error.as_deref(), Some(message.as_str()));
    }
}
