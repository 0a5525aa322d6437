mod application;
mod cli;
mod config;
mod domain;
mod infrastructure;

pub use application::{agent, tooling};
pub use domain::types;
pub use infrastructure::model;

use agent::{AgentError, AgentOptions, AgentRunner};
use clap::Parser;
use cli::{Cli, RunMode};
use config::AppConfig;
use model::ProviderFactory;
use serde_json::json;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tooling::{builtin_registry, RetrievalClient};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    init_tracing();
    info!("Starting reagent");
    let cli = Cli::parse();
    debug!(?cli.mode, config = ?cli.config, model = ?cli.model, "CLI arguments parsed");
    let config_path = cli.config.as_deref().map(Path::new);
    let mut app_config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path or defaults");
    }
    if let Some(model) = cli.model.clone() {
        info!(model = %model, "Overriding configured model from CLI");
        app_config.provider.model = model;
    }

    let provider = ProviderFactory::create(&app_config.provider);
    let retrieval = RetrievalClient::new(&app_config.retrieval);
    let registry = Arc::new(builtin_registry(retrieval)?);
    info!(
        provider = app_config.provider.kind.as_str(),
        model = %app_config.provider.model,
        tools = registry.len(),
        "Agent assembled"
    );

    let options = AgentOptions {
        max_iterations: app_config.agent.max_iterations,
        max_attempts: app_config.agent.max_attempts,
        stop_words: app_config.agent.stop_words.clone(),
    };

    info!(mode = ?cli.mode, "Running agent in selected mode");
    match cli.mode {
        RunMode::Repl => {
            let cancellation = CancellationToken::new();
            let signal_token = cancellation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received; cancelling agent runs");
                    signal_token.cancel();
                }
            });
            let runner = AgentRunner::new(provider, registry, options)
                .with_cancellation(cancellation.clone());
            run_repl(&runner, app_config.agent.history_window, cancellation).await?;
        }
        RunMode::Once => {
            let query = cli.query.join(" ");
            let query = query.trim();
            if query.is_empty() {
                warn!("Query not provided via arguments");
                return Err("query required via arguments in once mode".into());
            }
            let runner = AgentRunner::new(provider, registry, options);
            let mut chat_history = Vec::new();
            match runner.execute_with_retry(query, &mut chat_history).await {
                Ok(outcome) => {
                    let output = json!({
                        "answer": outcome.answer,
                        "tool_steps": outcome.steps,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                Err(error) => println!("{}", error.user_message()),
            }
        }
    }
    info!("reagent finished");
    Ok(())
}

async fn run_repl(
    runner: &AgentRunner,
    history_window: usize,
    cancellation: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut chat_history: Vec<(String, String)> = Vec::new();

    loop {
        stdout.write_all(b"query:").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            _ = cancellation.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" {
            break;
        }

        match runner.execute_with_retry(query, &mut chat_history).await {
            Ok(outcome) => {
                debug!(
                    steps = outcome.steps.len(),
                    scratchpad_chars = outcome.scratchpad.len(),
                    "Agent query answered"
                );
                println!("{}", outcome.answer);
            }
            Err(error) => {
                warn!(%error, "Agent query failed");
                println!("{}", error.user_message());
                if matches!(error, AgentError::Cancelled) {
                    break;
                }
            }
        }
        trim_history(&mut chat_history, history_window);
    }

    info!("Interactive session ended");
    Ok(())
}

/// Keeps only the newest `window` rounds so the prompt stays bounded.
fn trim_history(history: &mut Vec<(String, String)>, window: usize) {
    if history.len() > window {
        let excess = history.len() - window;
        history.drain(..excess);
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::trim_history;

    #[test]
    fn keeps_only_the_newest_entries() {
        let mut history: Vec<(String, String)> = (0..12)
            .map(|i| (format!("q{i}"), format!("a{i}")))
            .collect();
        trim_history(&mut history, 10);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].0, "q2");
        assert_eq!(history[9].0, "q11");
    }

    #[test]
    fn shorter_history_is_untouched() {
        let mut history = vec![("q".to_string(), "a".to_string())];
        trim_history(&mut history, 10);
        assert_eq!(history.len(), 1);
    }
}
