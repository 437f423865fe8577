use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_contracts::bracket::{build_with, Bracket, BracketError, LayoutOptions};
use relay_contracts::config::{RelayConfig, DEFAULT_VERTICAL_SPACING};
use relay_engine::{
    BracketRenderer, ChatModel, DryrunChatModel, OpenAiChatModel, RasterRenderer, Relay,
};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Debug, Parser)]
#[command(name = "relay-bot", version, about = "Chat relay webhook with bracket images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the webhook server.
    Serve(ServeArgs),
    /// Lay out a bracket and print it as JSON.
    Bracket(BracketArgs),
    /// Send one prompt to the chat model.
    Chat(ChatArgs),
}

#[derive(Debug, Parser)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: String,
    /// Directory served under /images and used as the local image host.
    #[arg(long)]
    images_dir: Option<PathBuf>,
    #[arg(long)]
    text_model: Option<String>,
    #[arg(long)]
    stream: bool,
    /// Echo prompts instead of calling the chat model.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Parser)]
struct BracketArgs {
    #[arg(long, allow_hyphen_values = true)]
    participants: i64,
    #[arg(long, default_value_t = DEFAULT_VERTICAL_SPACING)]
    spacing: f64,
    /// Advance unpaired entrants instead of requiring a power of two.
    #[arg(long)]
    byes: bool,
    /// Also render the bracket to this PNG file.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    text_model: Option<String>,
    #[arg(long)]
    stream: bool,
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("relay-bot error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => run_serve(args),
        Command::Bracket(args) => run_bracket(args),
        Command::Chat(args) => run_chat(args),
    }
}

fn resolve_config(
    mut config: RelayConfig,
    text_model: Option<String>,
    stream: bool,
) -> RelayConfig {
    if let Some(model) = text_model.filter(|value| !value.trim().is_empty()) {
        config.text_model = model;
    }
    if stream {
        config.stream = true;
    }
    config
}

fn run_serve(args: ServeArgs) -> Result<i32> {
    let config = resolve_config(RelayConfig::from_env(), args.text_model, args.stream);
    config.validate_for_serve(args.dry_run)?;

    // Blocking HTTP clients are built and finally dropped outside the runtime.
    let relay = Arc::new(Relay::from_config(
        config,
        args.dry_run,
        args.images_dir.clone(),
    )?);
    let images_dir = args
        .images_dir
        .filter(|_| relay.image_host_name() == Some("local"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(server::serve(relay.clone(), images_dir, &args.bind))?;
    info!("webhook server stopped");
    Ok(0)
}

fn run_bracket(args: BracketArgs) -> Result<i32> {
    let mut options = LayoutOptions::new(args.spacing);
    if args.byes {
        options = options.with_byes();
    }
    let bracket = match build_with(args.participants, options) {
        Ok(bracket) => bracket,
        Err(BracketError::InvalidInput(reason)) => {
            eprintln!("rejected: {reason}");
            return Ok(2);
        }
    };

    let mut layout = bracket_layout_json(&bracket);
    if let Some(out) = args.out {
        let png = RasterRenderer::default().render(&bracket)?;
        fs::write(&out, png).with_context(|| format!("failed to write {}", out.display()))?;
        layout["image"] = json!(out.to_string_lossy());
    }
    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(0)
}

fn run_chat(args: ChatArgs) -> Result<i32> {
    let config = resolve_config(RelayConfig::from_env(), args.text_model, args.stream);
    let reply = if args.dry_run {
        DryrunChatModel.complete(&config.system_prompt, &args.prompt)?
    } else {
        OpenAiChatModel::from_config(&config)?.complete(&config.system_prompt, &args.prompt)?
    };
    println!("{reply}");
    Ok(0)
}

fn bracket_layout_json(bracket: &Bracket) -> Value {
    let nodes: Vec<Value> = bracket
        .positions()
        .iter()
        .map(|(node, point)| {
            json!({
                "id": node.to_string(),
                "round": node.round(),
                "x": point.x,
                "y": point.y,
            })
        })
        .collect();
    let edges: Vec<Value> = bracket
        .routes()
        .into_iter()
        .map(|(from, to, path)| {
            json!({
                "from": from.to_string(),
                "to": to.to_string(),
                "path": path.points().map(|point| [point.x, point.y]),
            })
        })
        .collect();
    let rounds: Vec<Value> = bracket
        .rounds()
        .iter()
        .map(|round| {
            json!({
                "round": round.round,
                "spacing_factor": round.spacing_factor,
                "matches": round.matches,
                "byes": round.byes,
            })
        })
        .collect();
    json!({
        "participants": bracket.participants(),
        "champion": bracket.champion().map(|node| node.to_string()),
        "rounds": rounds,
        "nodes": nodes,
        "edges": edges,
    })
}
