use crate::config::Settings;
use crate::domain::trend::GroundingSource;
use crate::sensing::error::SenseError;
use crate::sensing::{AnalysisClient, AnalysisOutcome};
use anyhow::Context;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn headers(&self) -> Result<HeaderMap, SenseError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&self.api_key).map_err(|_| {
            // A key that cannot be a header value is as good as no key.
            SenseError::MissingCredential
        })?;
        headers.insert("x-goog-api-key", value);
        Ok(headers)
    }

    fn prompt(subject: &str, category: &str) -> String {
        let category = if category.trim().is_empty() {
            "General"
        } else {
            category
        };
        let current_month = Utc::now().format("%B %Y");

        format!(
            "Perform real-time demand sensing for the license: \"{subject}\" (Category: {category}).\n\
             Current Date: {current_month}.\n\n\
             Task:\n\
             1. Use Google Search to find specific news from the last 14 days (trailers, release dates, leaks, social spikes).\n\
             2. Provide a detailed demand analysis.\n\
             3. Output your findings STRICTLY as a JSON block.\n\n\
             The JSON block must have this exact structure:\n\
             {{\n\
               \"name\": \"Confirmed official name\",\n\
               \"category\": \"Anime/Gaming/Entertainment/etc\",\n\
               \"action\": \"TEST, SCALE, HOLD, AVOID, or KILL\",\n\
               \"impact\": \"LOW, MEDIUM, or HIGH\",\n\
               \"reasoning\": \"Merchandising logic based on search signals\",\n\
               \"confidence\": number (0-100),\n\
               \"trendScore\": number (0-100),\n\
               \"sensitivity\": number (estimated weeks of peak demand remaining),\n\
               \"analog\": \"Similar past property name\",\n\
               \"points\": [number, number, number, number], (4 numbers representing demand over the last 30 days)\n\
               \"awarenessSignals\": [\n\
                 {{ \"type\": \"search\"|\"news\"|\"social\", \"source\": \"e.g. Google Trends\", \"description\": \"brief description\", \"intensity\": 0-100, \"timestamp\": \"YYYY-MM-DD\" }}\n\
               ]\n\
             }}\n\n\
             Ensure accuracy for recent events."
        )
    }

    fn request_body(prompt: String) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            // Search grounding appends citation text to the output, so the
            // response is deliberately NOT requested as strict JSON; the
            // parser extracts the JSON block instead.
            tools: vec![Tool {
                google_search: serde_json::json!({}),
            }],
        }
    }

    fn response_text(res: &GenerateContentResponse) -> String {
        let mut out = String::new();
        for candidate in &res.candidates {
            for part in &candidate.content.parts {
                if part.text.is_empty() {
                    continue;
                }
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&part.text);
            }
        }
        out
    }

    fn grounding_sources(res: &GenerateContentResponse) -> Vec<GroundingSource> {
        let Some(candidate) = res.candidates.first() else {
            return Vec::new();
        };

        candidate
            .grounding_metadata
            .grounding_chunks
            .iter()
            .filter_map(|chunk| {
                let web = chunk.web.as_ref()?;
                let uri = web.uri.clone()?;
                Some(GroundingSource {
                    title: web
                        .title
                        .clone()
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| "Source".to_string()),
                    uri,
                })
            })
            .collect()
    }

    fn classify_http_failure(status: StatusCode, body: &str) -> SenseError {
        let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
        let (api_status, message) = parsed
            .map(|e| (e.error.status, e.error.message))
            .unwrap_or_default();

        let lowered = message.to_ascii_lowercase();
        if api_status == "FAILED_PRECONDITION" || lowered.contains("location is not supported") {
            return SenseError::UnsupportedRegion { detail: message };
        }
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || lowered.contains("api key")
        {
            return SenseError::MissingCredential;
        }
        SenseError::Transport {
            detail: if message.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {message}")
            },
        }
    }
}

#[async_trait::async_trait]
impl AnalysisClient for GeminiClient {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze(
        &self,
        subject: &str,
        category: &str,
    ) -> Result<AnalysisOutcome, SenseError> {
        let body = Self::request_body(Self::prompt(subject, category));

        let res = self
            .http
            .post(self.url())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| SenseError::Transport {
                detail: e.to_string(),
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| SenseError::Transport {
            detail: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            let err = Self::classify_http_failure(status, &text);
            tracing::warn!(%status, error = %err, "analysis request failed");
            return Err(err);
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&text).map_err(|e| {
            SenseError::Transport {
                detail: format!("unexpected response shape: {e}"),
            }
        })?;

        let out = Self::response_text(&parsed);
        if out.trim().is_empty() {
            return Err(SenseError::EmptyResponse);
        }

        Ok(AnalysisOutcome {
            text: out,
            grounding_sources: Self::grounding_sources(&parsed),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    #[serde(rename = "google_search")]
    google_search: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
    #[serde(default, rename = "groundingMetadata")]
    grounding_metadata: GroundingMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GroundingMetadata {
    #[serde(default, rename = "groundingChunks")]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Clone, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApiErrorEnvelope {
    #[serde(default)]
    error: ApiError,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}
