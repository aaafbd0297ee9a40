use anyhow::{Context as AnyhowContext, Result};
use assembly_bridge::{
    AmbiguityPolicy, CommandBackend, DisabledBackend, Engine, EngineConfig, GenerativeBackend,
};
use assembly_indexer::{index_path_for_root, load_index, save_index};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

mod report;

use report::{IndexReport, QueryReport};

#[derive(Parser)]
#[command(name = "assembly")]
#[command(about = "Retrieve and assemble Python calls from indexed signatures", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a project directory and print statistics
    Index(IndexArgs),

    /// Answer one query and print the assembled code
    Query(QueryArgs),

    /// Read queries line by line from stdin
    Repl(ReplArgs),
}

#[derive(Args)]
struct EngineArgs {
    /// Project root to index (defaults to current directory)
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Parse worker count (overrides config, not ASSEMBLY_INDEX_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Use the saved index under .assembly/ instead of re-indexing
    #[arg(long)]
    cached: bool,

    /// Try the generative backend before deterministic assembly
    #[arg(long)]
    generate: bool,

    /// Generator program, e.g. "python3 bridge.py"
    #[arg(long)]
    backend_command: Option<String>,

    /// Backend timeout per attempt
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Extra generation attempts after a rejection
    #[arg(long)]
    max_retries: Option<usize>,

    /// How tied top candidates are handled
    #[arg(long, value_enum)]
    ambiguity: Option<AmbiguityArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AmbiguityArg {
    Report,
    Reject,
}

impl From<AmbiguityArg> for AmbiguityPolicy {
    fn from(arg: AmbiguityArg) -> Self {
        match arg {
            AmbiguityArg::Report => AmbiguityPolicy::Report,
            AmbiguityArg::Reject => AmbiguityPolicy::Reject,
        }
    }
}

#[derive(Args)]
struct IndexArgs {
    /// Project directory to index (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Write the index to .assembly/index.json
    #[arg(long)]
    save: bool,

    /// Parse worker count
    #[arg(long)]
    concurrency: Option<usize>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// Query: function name tokens followed by literal arguments
    #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
    query: Vec<String>,

    #[command(flatten)]
    engine: EngineArgs,

    /// Also write the code to this file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Output JSON (artifact, trace, warnings)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReplArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Output one JSON object per query
    #[arg(long)]
    json: bool,
}

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Index(args) => run_index(args).await,
        Commands::Query(args) => run_query(args).await,
        Commands::Repl(args) => run_repl(args).await,
    }
}

fn canonical_root(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Invalid project path: {}", path.display()))
}

fn load_config(root: &Path) -> Result<EngineConfig> {
    EngineConfig::load(root).with_context(|| {
        format!(
            "Failed to load {}",
            EngineConfig::path_for_root(root).display()
        )
    })
}

async fn run_index(args: IndexArgs) -> Result<()> {
    let root = canonical_root(&args.path)?;
    let mut config = load_config(&root)?;
    if args.concurrency.is_some() {
        config.indexer.concurrency = args.concurrency;
    }

    let engine = Engine::new(config, Arc::new(DisabledBackend))?;
    let (version, stats) = engine
        .index_dir(&root)
        .await
        .with_context(|| format!("Failed to index {}", root.display()))?;

    let saved_to = if args.save {
        let path = index_path_for_root(&root);
        save_index(&path, &engine.snapshot().index)
            .await
            .with_context(|| format!("Failed to save index to {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    let report = IndexReport {
        root: &root,
        version,
        stats: &stats,
        fingerprint: engine.snapshot().index.fingerprint().to_string(),
        saved_to: saved_to.as_deref(),
    };
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&report)?)?;
    } else {
        print_stdout(&report.render())?;
    }
    Ok(())
}

/// Build the engine for `args` and publish an index (fresh or cached)
async fn prepare_engine(args: &EngineArgs) -> Result<(PathBuf, Engine)> {
    let root = canonical_root(&args.root)?;
    let mut config = load_config(&root)?;

    if args.concurrency.is_some() {
        config.indexer.concurrency = args.concurrency;
    }
    if args.generate {
        config.bridge.enabled = true;
    }
    if let Some(command) = &args.backend_command {
        config.bridge.backend_command = Some(command.clone());
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.bridge.timeout_ms = timeout_ms;
    }
    if let Some(max_retries) = args.max_retries {
        config.bridge.max_retries = max_retries;
    }
    if let Some(policy) = args.ambiguity {
        config.bridge.ambiguity_policy = policy.into();
    }
    config.validate().context("Invalid configuration")?;

    let backend = select_backend(&config)?;
    let engine = Engine::new(config, backend)?;

    let cached = if args.cached {
        let path = index_path_for_root(&root);
        load_index(&path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        None
    };
    match cached {
        Some(index) => {
            let version = engine.publish_index(index);
            log::info!("Using saved index (v{version})");
        }
        None => {
            if args.cached {
                log::warn!("No saved index under {}, indexing now", root.display());
            }
            engine
                .index_dir(&root)
                .await
                .with_context(|| format!("Failed to index {}", root.display()))?;
        }
    }

    Ok((root, engine))
}

fn select_backend(config: &EngineConfig) -> Result<Arc<dyn GenerativeBackend>> {
    if !config.bridge.enabled {
        return Ok(Arc::new(DisabledBackend));
    }
    match &config.bridge.backend_command {
        Some(command) => {
            let backend = CommandBackend::from_command_line(command)
                .context("Invalid backend command")?;
            log::info!("Generation enabled via {}", backend.program());
            Ok(Arc::new(backend))
        }
        None => {
            log::warn!(
                "Generation enabled but no backend command configured; using deterministic assembly"
            );
            Ok(Arc::new(DisabledBackend))
        }
    }
}

async fn run_query(args: QueryArgs) -> Result<()> {
    let (_root, engine) = prepare_engine(&args.engine).await?;
    let line = args.query.join(" ");

    let outcome = engine.query(&line).await;
    let report = QueryReport::from_outcome(&outcome);

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&report)?)?;
    } else {
        report.print_warnings();
        if let Some(artifact) = outcome.artifact() {
            print_stdout(&artifact.code_text)?;
        }
    }

    let artifact = outcome
        .into_result()
        .with_context(|| format!("Query '{line}' failed"))?;

    if let Some(path) = args.output {
        tokio::fs::write(&path, &artifact.code_text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

async fn run_repl(args: ReplArgs) -> Result<()> {
    let (root, engine) = prepare_engine(&args.engine).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    log::info!("Ready. Type a query, ':reindex' to rebuild, or 'exit' to quit.");
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "exit" | "quit" | "q" => break,
            ":reindex" => {
                match engine.index_dir(&root).await {
                    Ok((version, stats)) => print_stdout(&format!("index v{version}: {stats}"))?,
                    Err(err) => log::error!("Re-index failed: {err}"),
                }
                continue;
            }
            _ => {}
        }

        let outcome = engine.query(line).await;
        let report = QueryReport::from_outcome(&outcome);
        if args.json {
            print_stdout(&serde_json::to_string(&report)?)?;
        } else {
            print_stdout(&report.render())?;
        }
    }
    Ok(())
}
