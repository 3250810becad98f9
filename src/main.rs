//! Skirmish CLI - serve the match API or inspect generated worlds.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use skirmish::engine::{Engine, EngineConfig};
use skirmish::grid::GridSize;
use skirmish::server::{AppState, build_router};
use skirmish::store::{
    FilePolicyStore, MemoryMatchStore, MemoryPolicyStore, MemoryUserStore, PolicyStore,
    StaticTokenValidator,
};
use skirmish::worldgen;

/// Skirmish - a turn-based tactical combat server
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the match API server
    Serve {
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// Directory for per-player AI policy checkpoints
        /// (in-memory when omitted)
        #[arg(long)]
        policy_dir: Option<PathBuf>,

        /// Fixed seed for the AI exploration coin (reproducible runs)
        #[arg(long)]
        ai_seed: Option<u32>,
    },

    /// Generate a world and print it as JSON
    Generate {
        /// World seed
        #[arg(short, long)]
        seed: String,

        /// Grid width (default: 16)
        #[arg(long, default_value = "16")]
        width: u16,

        /// Grid height (default: 16)
        #[arg(long, default_value = "16")]
        height: u16,

        /// Skill rating driving placement bias (default: 1200)
        #[arg(short, long, default_value = "1200")]
        elo: i32,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command {
        Commands::Serve {
            bind,
            policy_dir,
            ai_seed,
        } => serve(bind, policy_dir, ai_seed),
        Commands::Generate {
            seed,
            width,
            height,
            elo,
        } => generate(&seed, width, height, elo),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn serve(bind: SocketAddr, policy_dir: Option<PathBuf>, ai_seed: Option<u32>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "skirmish=info,tower_http=info".to_string()),
        )
        .init();

    let policies: Arc<dyn PolicyStore> = match policy_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "using file-backed policy store");
            Arc::new(FilePolicyStore::open(dir)?)
        }
        None => Arc::new(MemoryPolicyStore::new()),
    };

    // Dev token table: SKIRMISH_TOKENS="token=user:handle;token2=user2:handle2"
    let tokens = std::env::var("SKIRMISH_TOKENS")
        .map(|pairs| StaticTokenValidator::from_pairs(&pairs))
        .unwrap_or_default();

    let engine = Engine::new(
        Arc::new(MemoryMatchStore::new()),
        policies,
        Arc::new(MemoryUserStore::new()),
        EngineConfig {
            ai_seed,
            ..EngineConfig::default()
        },
    );
    let state = AppState {
        engine: Arc::new(engine),
        tokens: Arc::new(tokens),
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(async move {
        let app = build_router(state);
        tracing::info!(%bind, "skirmish listening");
        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .context("failed to bind")?;
        axum::serve(listener, app).await.context("server error")
    })
}

fn generate(seed: &str, width: u16, height: u16, elo: i32) -> anyhow::Result<()> {
    let world = worldgen::generate(seed, GridSize::new(width, height), elo)?;

    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct WorldDump<'a> {
        seed_key: &'a str,
        spawn: &'a skirmish::game::Spawn,
        constraints: &'a skirmish::game::GenConstraints,
        resources: &'a skirmish::game::Resources,
        loot: &'a [skirmish::game::WorldLoot],
    }

    let dump = WorldDump {
        seed_key: &world.seed_key,
        spawn: &world.spawn,
        constraints: &world.constraints,
        resources: &world.resources,
        loot: &world.loot,
    };
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}
