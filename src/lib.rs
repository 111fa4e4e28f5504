pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, client, repl, stdio, tooling};
pub use cli::{Cli, RunMode};
pub use config::AppConfig;
pub use domain::types;
pub use infrastructure::{model, server};

use application::client::{ChatClient, ChatRequest, ClientConfig};
use application::tooling::{ToolRegistry, builtin};
use infrastructure::model::OllamaClient;
use serde_json::json;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let quiet_mode = matches!(cli.mode, RunMode::Stdio);
    init_tracing(quiet_mode);
    if dotenvy::dotenv().is_ok() {
        debug!("Loaded environment from .env");
    }
    info!("Starting astrolabe");
    debug!(
        mode = ?cli.mode,
        config = ?cli.config,
        system = ?cli.system,
        "CLI arguments parsed"
    );

    let config_path = cli.config.as_deref().map(Path::new);
    let file_config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration from default path");
    }

    let registry = Arc::new(ToolRegistry::new(builtin::all(
        file_config.etherscan.clone(),
    ))?);
    info!(tool_count = registry.len(), "Builtin tools registered");

    debug!(ollama_url = %cli.ollama_url, "Creating Ollama provider");
    let provider = OllamaClient::new(cli.ollama_url.clone());
    let mut client_config =
        ClientConfig::new(cli.model.clone().unwrap_or_else(|| file_config.model.clone()))
            .with_max_steps(file_config.max_tool_steps)
            .with_continuation(file_config.continuation)
            .with_thinking(file_config.thinking)
            .with_sampling(file_config.sampling.clone())
            .with_step_timeout(
                file_config
                    .step_timeout_secs
                    .map(std::time::Duration::from_secs),
            );
    if let Some(system_prompt) = cli.system.clone().or_else(|| file_config.system_prompt.clone()) {
        client_config = client_config.with_system_prompt(system_prompt);
    }
    let client = Arc::new(ChatClient::new(provider, registry, client_config));

    if !cli.prompt.is_empty() {
        let prompt = cli.prompt.join(" ");
        info!("Dispatching one-shot prompt");
        let mut request = ChatRequest::prompt(prompt.trim());
        request.session_id = cli.session.clone();
        let result = client.chat(request).await?;
        let output = json!({
            "session_id": result.session_id,
            "content": result.content,
            "termination": result.termination,
            "tool_steps": result.steps,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    info!(mode = ?cli.mode, "Running client in selected mode");
    match cli.mode {
        RunMode::Repl => {
            info!("Launching interactive conversation");
            repl::run(client.clone()).await?;
        }
        RunMode::Stdio => {
            stdio::run(client.clone()).await?;
        }
        RunMode::Rest => {
            info!(addr = %cli.rest_addr, "Starting REST server");
            server::serve(client.clone(), cli.rest_addr).await?;
        }
    }
    info!("Client execution finished");
    Ok(())
}

fn init_tracing(quiet: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = if quiet {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
