use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use convoy_agent::AgentRunner;
use convoy_batch::{BatchOrchestrator, ClientAdapter, HttpClientAdapter, PriceTable, SubmitOptions};
use convoy_config::AppConfig;
use convoy_llm::{HttpProvider, HttpProviderConfig, Message, PromptRequest};
use convoy_tools::{ToolBudget, ToolConstraints, ToolLimit, ToolRegistry};

#[derive(Debug, Parser)]
#[command(name = "convoy", version, about = "Synchronous agent runs and batch orchestration over a Responses-style API")]
struct Cli {
    #[arg(long, global = true, default_value = "convoy.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the synchronous agent against a single prompt.
    Run {
        /// Prompt text. Reads from stdin when omitted.
        prompt: Option<String>,
    },
    /// Batch job operations.
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },
}

#[derive(Debug, Subcommand)]
enum BatchCommands {
    /// Submit a newline-delimited JSON file of requests.
    Submit {
        /// Path to a JSON-Lines file, one `{custom_id, method, url, body}` per line.
        input: String,
        /// Poll until the job reaches a terminal status before returning.
        #[arg(long)]
        wait: bool,
    },
    /// Fetch the current status of a job.
    Status { job_id: String },
    /// Fetch and aggregate the results of a completed job.
    Results { job_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.telemetry.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Commands::Run { prompt } => run_agent(config, prompt).await,
        Commands::Batch { command } => run_batch(config, command).await,
    }
}

fn build_provider(config: &AppConfig) -> Result<HttpProvider> {
    let provider = HttpProvider::new(HttpProviderConfig {
        base_url: config.provider.base_url.clone(),
        api_key: config.provider.api_key.clone(),
        organization_id: config.provider.organization_id.clone(),
        project_id: config.provider.project_id.clone(),
        max_retries: 5,
    })?;
    Ok(provider)
}

async fn run_agent(config: AppConfig, prompt: Option<String>) -> Result<()> {
    let prompt = match prompt {
        Some(p) => p,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading prompt from stdin")?;
            buf
        }
    };
    if prompt.trim().is_empty() {
        bail!("no prompt provided (pass as an argument or via stdin)");
    }

    let provider = Arc::new(build_provider(&config)?);
    let runner = AgentRunner::with_max_turns(provider, config.agent.max_turns);

    let registry = ToolRegistry::new();
    let mut constraints = ToolConstraints::new();
    for (name, budget) in &config.agent.tool_budgets {
        constraints = constraints.with_limit(
            name.as_str().into(),
            ToolLimit { min_calls: budget.min_calls, max_calls: budget.max_calls },
        );
    }
    let mut budget = ToolBudget::new(constraints);

    let request = PromptRequest::new(config.provider.model.clone(), vec![Message::user(prompt)]);
    let result = runner.run(&request, &registry, &mut budget).await?;

    println!("{}", result.content);
    eprintln!(
        "tokens: {} in / {} out / {} total",
        result.usage.input_tokens, result.usage.output_tokens, result.usage.total_tokens
    );
    Ok(())
}

async fn run_batch(config: AppConfig, command: BatchCommands) -> Result<()> {
    let client = Arc::new(HttpClientAdapter::new(config.provider.base_url.clone(), config.provider.api_key.clone()));
    let orchestrator = BatchOrchestrator::new(client.clone())
        .with_poll_interval(Duration::from_secs(config.batch.poll_interval_secs))
        .with_price_table(PriceTable::default())
        .with_cost_optimize(config.batch.cost_optimize);

    match command {
        BatchCommands::Submit { input, wait } => {
            let raw = std::fs::read_to_string(&input).with_context(|| format!("reading {input}"))?;
            let requests: Vec<convoy_batch::BatchRequest> = raw
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| serde_json::from_str(line).with_context(|| format!("parsing line: {line}")))
                .collect::<Result<_>>()?;

            if let Some(estimate) = orchestrator.estimate(&requests) {
                eprintln!(
                    "estimated cost: ${:.4} ({} tokens in, {} tokens out, {:.0}% savings vs sync)",
                    estimate.estimated_cost,
                    estimate.tokens_in,
                    estimate.tokens_out,
                    estimate.savings_vs_sync * 100.0
                );
            }

            let job = orchestrator.submit(&requests, &SubmitOptions::default(), wait).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        BatchCommands::Status { job_id } => {
            let job = client.status(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        BatchCommands::Results { job_id } => {
            let aggregated = orchestrator.results(&job_id).await?;
            println!(
                "{} succeeded, {} failed",
                aggregated.successes(),
                aggregated.failures()
            );
            for (custom_id, content) in &aggregated.content {
                println!("--- {custom_id} ---\n{content}");
            }
            for (custom_id, error) in &aggregated.errors {
                eprintln!("--- {custom_id} (error) ---\n{error}");
            }
        }
    }
    Ok(())
}
