//! Decision Kernel - offline replay of a decision cycle
//!
//! Usage: `decision-kernel <context.json|yaml> [response.txt] [--config path]`
//!
//! Without a response file the rendered prompts are printed. With one, the
//! file contents stand in for the model reply and the resulting
//! `FullDecision` is printed as JSON.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info};

use decision_kernel::{DecisionModel, DecisionPipeline, KernelConfig, PromptBuilder, TradingContext};

/// Model stand-in that answers with a recorded reply
struct ReplayModel {
    response: String,
}

#[async_trait]
impl DecisionModel for ReplayModel {
    async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
        Ok(self.response.clone())
    }
}

struct Args {
    context: PathBuf,
    response: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
            config = Some(PathBuf::from(path));
        } else {
            positional.push(PathBuf::from(arg));
        }
    }

    let mut positional = positional.into_iter();
    let context = positional.next().ok_or_else(|| {
        anyhow::anyhow!("usage: decision-kernel <context.json> [response.txt] [--config path]")
    })?;

    Ok(Args {
        context,
        response: positional.next(),
        config,
    })
}

fn load_context(path: &Path) -> anyhow::Result<TradingContext> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read context {}: {}", path.display(), e))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let context = if is_yaml {
        serde_yaml::from_str(&text).map_err(|e| anyhow::anyhow!("Invalid context YAML: {}", e))?
    } else {
        serde_json::from_str(&text).map_err(|e| anyhow::anyhow!("Invalid context JSON: {}", e))?
    };
    Ok(context)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = parse_args()?;
    let config = KernelConfig::load(args.config.as_deref())?;
    let context = load_context(&args.context)?;
    info!(
        "Loaded context from {} ({} positions, {} candidates)",
        args.context.display(),
        context.positions.len(),
        context.candidate_coins.len()
    );

    let Some(response_path) = args.response else {
        let prompts = PromptBuilder::new(&config.risk, &config.prompt).render(&context);
        println!("===== SYSTEM =====\n{}\n===== USER =====\n{}", prompts.system, prompts.user);
        return Ok(());
    };

    let response = std::fs::read_to_string(&response_path)
        .map_err(|e| anyhow::anyhow!("Failed to read response {}: {}", response_path.display(), e))?;
    let model = ReplayModel { response };

    match DecisionPipeline::new(config).run_cycle(&context, &model).await {
        Ok(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Err(e) => {
            if let Some(partial) = e.partial() {
                println!("{}", serde_json::to_string_pretty(partial)?);
            }
            error!("Replay failed: {}", e);
            Err(e.into())
        }
    }
}
