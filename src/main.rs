use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;

use tdq::config::Config;
use tdq::core::{collect_all_nodes, TaskNode};
use tdq::llm::OpenAiClient;
use tdq::orchestration::{LoopEvent, Optimizer, TaskGenerator};
use tdq::{tlog, Error, Result, TdqEvaluator};

/// tdq - score and improve hierarchical task decompositions
#[derive(Parser, Debug)]
#[command(name = "tdq")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    TDQ_API_KEY / OPENAI_API_KEY   Provider API key\n    TDQ_BASE_URL                   Provider base URL\n    TDQ_CHAT_MODEL                 Chat model name\n    TDQ_EMBEDDING_MODEL            Embedding model name\n    TDQ_DEBUG=1                    Enable debug logging (alternative to --debug)\n    TDQ_LOG=<level>                Log level (error, warn, info, debug, trace)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.tdq/tdq.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Config file to use instead of ~/.tdq/tdq.toml
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Score a task tree read from a JSON file
    Evaluate {
        /// Path to the tree JSON
        tree: PathBuf,
    },

    /// Generate a tree for a request and refine it toward the target score
    Optimize {
        /// The goal in natural language
        request: String,

        /// Stop once the composite score reaches this value
        #[arg(long)]
        target: Option<f64>,

        /// Maximum number of evaluations
        #[arg(long)]
        max_iterations: Option<usize>,
    },

    /// Break one task of a tree into subtasks
    Decompose {
        /// Path to the tree JSON
        tree: PathBuf,

        /// Id of the task to decompose
        node_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tdq::log::init(cli.debug);

    let config = load_config(cli.config.as_deref())?;
    let client = Arc::new(OpenAiClient::from_config(&config.provider)?);
    tlog!(
        "tdq starting: chat_model={} embedding_model={}",
        client.chat_model(),
        client.embedding_model()
    );

    match cli.command {
        Command::Evaluate { tree } => {
            let tree = read_tree(&tree)?;
            let evaluator = TdqEvaluator::new(client.clone(), client, config.evaluation);
            print_json(&evaluator.evaluate(&tree).await?)
        }
        Command::Optimize {
            request,
            target,
            max_iterations,
        } => {
            let mut optimization = config.optimization;
            if let Some(target) = target {
                optimization.target_score = target;
            }
            if let Some(max) = max_iterations {
                if max == 0 {
                    return Err(Error::Validation(
                        "--max-iterations must be at least 1".to_string(),
                    ));
                }
                optimization.max_iterations = max;
            }

            let (event_tx, event_rx) = mpsc::channel(64);
            let progress = tokio::spawn(report_progress(event_rx));

            let optimizer = Optimizer::new(
                TaskGenerator::new(client.clone()),
                TdqEvaluator::new(client.clone(), client, config.evaluation),
                optimization,
            )
            .with_events(event_tx);

            let outcome = optimizer.optimize(&request).await;
            drop(optimizer);
            let _ = progress.await;
            print_json(&outcome?)
        }
        Command::Decompose { tree, node_id } => {
            let tree = read_tree(&tree)?;
            let nodes = collect_all_nodes(&tree);
            let node = nodes
                .get(&node_id)
                .ok_or_else(|| Error::Validation(format!("no task with id '{}'", node_id)))?;
            let subtasks = TaskGenerator::new(client).decompose(node).await?;
            print_json(&subtasks)
        }
    }
}

/// `~/.tdq/tdq.toml` unless `--config` names a file, which must exist.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Config::load();
    };
    if !path.exists() {
        return Err(Error::Configuration(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let mut config = Config::load_from(path)?;
    config.apply_env_with(|key| std::env::var(key).ok());
    Ok(config)
}

fn read_tree(path: &Path) -> Result<TaskNode> {
    let tree: TaskNode = serde_json::from_str(&fs::read_to_string(path)?)?;
    tlog!(
        "loaded tree '{}' from {} ({} nodes)",
        tree.id,
        path.display(),
        tree.subtree_size()
    );
    Ok(tree)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print loop progress to stderr until the optimizer drops its sender.
async fn report_progress(mut events: mpsc::Receiver<LoopEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            LoopEvent::Transition { to, .. } => eprintln!("[{}]", to),
            LoopEvent::Evaluated {
                iteration,
                score,
                issues,
            } => eprintln!(
                "  iteration {}: score {:.3}, {} issue(s)",
                iteration, score, issues
            ),
            LoopEvent::Completed { iterations, score } => eprintln!(
                "  finished after {} iteration(s) with score {:.3}",
                iterations, score
            ),
        }
    }
}
