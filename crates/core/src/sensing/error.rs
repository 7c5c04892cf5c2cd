use crate::sensing::json::ParseError;
use std::fmt;

/// Everything that can go wrong between "user pressed sense" and a usable
/// payload. Raw model output stays attached for diagnostics; only
/// `user_message` strings are surfaced to the dashboard.
#[derive(Debug, Clone)]
pub enum SenseError {
    /// No API key configured for the analysis service.
    MissingCredential,
    /// Network or service-side failure, detail passed through.
    Transport { detail: String },
    /// Call succeeded but the model returned no text.
    EmptyResponse,
    /// Search-grounded analysis is disabled for the caller's locale.
    UnsupportedRegion { detail: String },
    /// Model text arrived but carried no decodable JSON object.
    InvalidPayload(ParseError),
}

impl SenseError {
    /// Short message safe to show on the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential => {
                "Sensing engine API key is not configured.".to_string()
            }
            Self::Transport { detail } => format!("Sensing engine unavailable: {detail}"),
            Self::EmptyResponse => "Sensing engine returned an empty response.".to_string(),
            Self::UnsupportedRegion { .. } => {
                "Live sensing is not available in your region.".to_string()
            }
            Self::InvalidPayload(_) => {
                "Sensing engine returned an unreadable report. Try again.".to_string()
            }
        }
    }

    /// Whether re-invoking the operation can plausibly succeed without a
    /// configuration change.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MissingCredential | Self::UnsupportedRegion { .. } => false,
            Self::Transport { .. } | Self::EmptyResponse | Self::InvalidPayload(_) => true,
        }
    }
}

impl fmt::Display for SenseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "missing analysis service credential"),
            Self::Transport { detail } => write!(f, "analysis transport failure: {detail}"),
            Self::EmptyResponse => write!(f, "analysis returned an empty response"),
            Self::UnsupportedRegion { detail } => {
                write!(f, "analysis unsupported in region: {detail}")
            }
            Self::InvalidPayload(e) => write!(f, "invalid analysis payload: {e}"),
        }
    }
}

impl std::error::Error for SenseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPayload(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for SenseError {
    fn from(e: ParseError) -> Self {
        Self::InvalidPayload(e)
    }
}
