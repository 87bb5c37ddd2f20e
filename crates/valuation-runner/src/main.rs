//! valuation-runner: value a batch of company snapshots and print the results as JSON.
//!
//! Usage:
//!   cargo run -p valuation-runner -- --input companies.json
//!   cargo run -p valuation-runner -- --input companies.json --concurrency 4 --pretty
//!   cargo run -p valuation-runner -- --input companies.json --screen graham --limit 10

use analysis_core::Persona;
use analysis_orchestrator::{AnalysisOrchestrator, CompanySnapshot, DEFAULT_CONCURRENCY};
use anyhow::{Context, Result};
use growth_advisor::{estimator_from_config, AdvisorConfig};
use persona_scoring::ScoringConfig;
use serde::Serialize;
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 20;

#[derive(Serialize)]
struct BatchEntry<T: Serialize> {
    ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  valuation-runner --input FILE           JSON array of company snapshots");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --concurrency N    Max parallel companies (default: {})", DEFAULT_CONCURRENCY);
    eprintln!("  --screen PERSONA   Only print companies qualifying for a persona");
    eprintln!("                     (buffett, graham, lynch, dividend_income)");
    eprintln!("  --limit N          Max screen matches (default: {})", DEFAULT_LIMIT);
    eprintln!("  --pretty           Pretty-print JSON output");
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "valuation_runner=info,analysis_orchestrator=info,growth_advisor=warn".into()
            }),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let pretty = args.iter().any(|a| a == "--pretty");

    let Some(input_path) = arg_value(&args, "--input") else {
        print_usage();
        std::process::exit(1);
    };

    let concurrency: usize = arg_value(&args, "--concurrency")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CONCURRENCY);

    let limit: usize = arg_value(&args, "--limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_LIMIT);

    let screen_persona = arg_value(&args, "--screen")
        .map(|p| p.parse::<Persona>().map_err(anyhow::Error::msg))
        .transpose()?;

    let raw = std::fs::read_to_string(input_path)
        .with_context(|| format!("Failed to read {}", input_path))?;
    let snapshots: Vec<CompanySnapshot> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of company snapshots", input_path))?;

    let advisor_config = AdvisorConfig::from_env()?;
    let orchestrator = Arc::new(AnalysisOrchestrator::new(estimator_from_config(
        advisor_config,
    )));

    tracing::info!(
        "Valuing {} companies (concurrency {})",
        snapshots.len(),
        concurrency
    );

    if let Some(persona) = screen_persona {
        let config = ScoringConfig::from_env()?;
        let screener = analysis_orchestrator::PersonaScreener::new(orchestrator, config);
        let result = screener
            .screen(snapshots, persona, limit, concurrency)
            .await?;
        return print_json(&result, pretty);
    }

    let results = orchestrator.analyze_batch(snapshots, concurrency).await;
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();

    let entries: Vec<_> = results
        .into_iter()
        .map(|(ticker, result)| match result {
            Ok(analysis) => BatchEntry {
                ticker,
                analysis: Some(analysis),
                error: None,
            },
            Err(e) => BatchEntry {
                ticker,
                analysis: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    tracing::info!("Done! {} companies ({} failed)", entries.len(), failed);
    print_json(&entries, pretty)
}
