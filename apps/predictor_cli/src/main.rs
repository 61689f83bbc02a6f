use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{config::load_settings, HttpPredictionClient, PredictionSession, SubmitError};
use shared::{
    domain::{field_spec, STUDENT_STRESS_FIELDS},
    protocol::PredictionResult,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Predict a student's stress level with a remote prediction service")]
struct Cli {
    /// Prediction service base URL, overrides predictor.toml and environment.
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List form fields with their defaults and constraints.
    Fields,
    /// Fill in the form and request a prediction.
    Predict {
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long, value_name = "NAME")]
        check: Vec<String>,
        #[arg(long, value_name = "NAME")]
        uncheck: Vec<String>,
    },
    /// Probe the prediction service.
    Health,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(secs) = cli.timeout_secs {
        if secs == 0 {
            bail!("--timeout-secs must be positive");
        }
        settings.request_timeout = Duration::from_secs(secs);
    }

    match cli.command {
        Command::Fields => print_fields(),
        Command::Health => {
            let client = HttpPredictionClient::new(&settings)?;
            let health = client
                .health()
                .await
                .with_context(|| format!("health check against {} failed", client.base_url()))?;
            println!("{}: {}", client.base_url(), health.status);
            if !health.is_healthy() {
                bail!("prediction service reports status '{}'", health.status);
            }
        }
        Command::Predict {
            set,
            check,
            uncheck,
        } => {
            let client = HttpPredictionClient::new(&settings)?;
            info!(
                base_url = client.base_url(),
                timeout = ?client.request_timeout(),
                "using prediction service"
            );
            let session = PredictionSession::new(Arc::new(client));

            for (name, value) in set {
                session.set_field(&name, value)?;
            }
            for name in check {
                session.set_field(&name, true)?;
            }
            for name in uncheck {
                session.set_field(&name, false)?;
            }

            let outcome = session.submit().await;
            session.close();
            match outcome {
                Ok(result) => print_result(&result),
                Err(SubmitError::Validation(error)) => {
                    println!("The form has invalid fields:");
                    for violation in error.violations() {
                        let label = field_spec(violation.field)
                            .map(|spec| spec.label)
                            .unwrap_or(violation.field);
                        println!("  - {label} ({}): {}", violation.field, violation.violation);
                    }
                    return Err(error.into());
                }
                Err(SubmitError::Request(error)) => {
                    if let Some(detail) = error.detail() {
                        println!("Service said: {detail}");
                    }
                    if error.is_retryable() {
                        println!("Failed to predict stress level. Please try again.");
                    }
                    return Err(error.into());
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    Ok(())
}

fn print_fields() {
    for spec in STUDENT_STRESS_FIELDS.iter() {
        println!(
            "{:<24} {:<34} default={:<12} {}",
            spec.name,
            spec.label,
            spec.default.to_string(),
            spec.describe_constraint()
        );
    }
}

fn print_result(result: &PredictionResult) {
    println!(
        "Predicted stress level: {} ({})",
        result.label,
        result.level()
    );
    println!("Confidence: {}", result.confidence_percent());
    if result.recommendations.is_empty() {
        return;
    }
    println!("Recommendations:");
    for (idx, recommendation) in result.recommendations.iter().enumerate() {
        println!("  {}. {recommendation}", idx + 1);
    }
}
