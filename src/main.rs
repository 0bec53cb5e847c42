use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use quantumflow::engine::{EngineConfig, StateMap};
use quantumflow::flow::server;
use quantumflow::flow::steps::prism;
use quantumflow::flow::workflow::graph::GraphExecutor;
use quantumflow::flow::workflow::loader::GraphLoader;
use quantumflow::flow::workflow::registry::StepRegistry;
use quantumflow::flow::workflow::run::RunStatus;
use quantumflow::flow::workflow::state::MemoryStore;

use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides QUANTUMFLOW_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides QUANTUMFLOW_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a graph definition from a YAML or JSON file
    Run {
        /// Path to the graph file
        #[arg(short, long)]
        file: String,

        /// Initial state as a JSON object
        #[arg(short, long, default_value = "{}")]
        state: String,
    },
    /// Review a source file with the Code Prism workflow
    Prism {
        /// Path to the source file
        #[arg(short, long)]
        file: String,

        /// Quality score that ends the review
        #[arg(short, long, default_value_t = prism::DEFAULT_THRESHOLD)]
        threshold: i64,

        /// Review passes before giving up
        #[arg(short, long, default_value_t = prism::DEFAULT_MAX_ITERATIONS)]
        max_iterations: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let mut config = EngineConfig::from_env()?;

    let registry = StepRegistry::new();
    prism::register_prism_steps(&registry).await?;

    let store = Arc::new(MemoryStore::new());

    match args.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let executor =
                Arc::new(GraphExecutor::new(registry, store).with_max_steps(config.max_steps));
            server::serve(executor, &config).await?;
        }
        Commands::Run { file, state } => {
            let initial_state: StateMap =
                serde_json::from_str(&state).context("--state must be a JSON object")?;
            let definition = GraphLoader::new()
                .load_graph(&file)
                .with_context(|| format!("Failed to load graph from {}", file))?;

            let executor = GraphExecutor::new(registry, store).with_max_steps(config.max_steps);
            let graph_id = executor.register_graph(definition).await?;

            println!("Running graph: {}", graph_id);
            let run = executor.execute(&graph_id, initial_state).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);

            if run.status == RunStatus::Failed {
                anyhow::bail!(run.error.unwrap_or_else(|| "run failed".to_string()));
            }
        }
        Commands::Prism {
            file,
            threshold,
            max_iterations,
        } => {
            let code = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file))?;

            let executor = GraphExecutor::new(registry, store).with_max_steps(config.max_steps);
            let graph_id = executor.register_graph(prism::prism_graph()).await?;
            let run = executor
                .execute(
                    &graph_id,
                    prism::initial_state(&code, threshold, max_iterations),
                )
                .await?;

            println!("Status: {}", run.status);
            for key in ["quality_score", "iteration", "function_count"] {
                if let Some(value) = run.state.get(key) {
                    println!("{}: {}", key, value);
                }
            }
            if let Some(suggestions) = run.state.get("suggestions").and_then(|v| v.as_array()) {
                println!("Suggestions:");
                for suggestion in suggestions {
                    println!("  - {}", suggestion.as_str().unwrap_or_default());
                }
            }
            if let Some(error) = run.error {
                anyhow::bail!(error);
            }
        }
    }

    Ok(())
}
