use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_core::domain::seed::seed_trends;
use pulse_core::sensing::gemini::GeminiClient;
use pulse_core::sensing::json::parse_payload;
use pulse_core::sensing::normalize::{normalize, SenseContext};
use pulse_core::sensing::AnalysisClient;

/// One-shot sensing run for prompt debugging and ad-hoc discovery.
#[derive(Debug, Parser)]
#[command(name = "pulse_worker")]
struct Args {
    /// License or property to sense.
    #[arg(long)]
    subject: String,

    /// Category hint passed to the analysis prompt.
    #[arg(long, default_value = "Discovery")]
    category: String,

    /// Force the discovery path even when the subject matches a seed record.
    #[arg(long)]
    discover: bool,

    /// Also print the raw model text to stderr.
    #[arg(long)]
    raw: bool,
}

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

    let args = Args::parse();

    let client = GeminiClient::from_settings(&settings)?;

    let outcome = match client.analyze(&args.subject, &args.category).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    };

    if args.raw {
        eprintln!("{}", outcome.text);
    }

    let payload = parse_payload(&outcome.text)?;

    // When the subject matches a seed record, run the refresh overlay so
    // the output mirrors what the dashboard would show; --discover skips
    // the match and always treats the subject as new.
    let seeds = seed_trends();
    let previous = if args.discover {
        None
    } else {
        seeds
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(args.subject.trim()))
    };

    let mut record = match previous {
        Some(previous) => normalize(&payload, SenseContext::Refresh { previous }),
        None => normalize(
            &payload,
            SenseContext::Discovery {
                query: &args.subject,
            },
        ),
    };
    if !outcome.grounding_sources.is_empty() {
        record.grounding_sources = Some(outcome.grounding_sources);
    }

    tracing::info!(
        subject = %args.subject,
        refresh = previous.is_some(),
        signals = record.signals.len(),
        "sensing run complete"
    );

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
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
