use crate::domain::trend::{GroundingSource, TrendRecord};
use crate::sensing::error::SenseError;
use crate::sensing::normalize::SenseContext;

pub mod error;
pub mod gemini;
pub mod json;
pub mod normalize;

/// Raw result of one analysis call: the model text (expected to contain a
/// JSON block) plus any citations surfaced by search grounding.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub text: String,
    pub grounding_sources: Vec<GroundingSource>,
}

#[async_trait::async_trait]
pub trait AnalysisClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn analyze(&self, subject: &str, category: &str)
        -> Result<AnalysisOutcome, SenseError>;
}

/// One full sensing operation: call the analysis service, extract and
/// decode the JSON payload, normalize onto the domain model, and attach
/// grounding citations when the call produced any.
pub async fn run_sensing(
    client: &dyn AnalysisClient,
    subject: &str,
    category: &str,
    ctx: SenseContext<'_>,
) -> Result<TrendRecord, SenseError> {
    let outcome = client.analyze(subject, category).await?;
    let payload = json::parse_payload(&outcome.text)?;
    let mut record = normalize::normalize(&payload, ctx);
    if !outcome.grounding_sources.is_empty() {
        record.grounding_sources = Some(outcome.grounding_sources);
    }
    Ok(record)
}
