//! Command-line front end for corpus generation and post-processing.
//!
//! Usage:
//!   chess-corpus build --pgn 'archives/*.pgn.zst' --band low --seed 42
//!   chess-corpus rerank --input low_val.jsonl --output low_val_ranked.jsonl --engine stockfish
//!   chess-corpus strip-sequence --input low_val.jsonl --output low_val_noseq.jsonl

use anyhow::{Context, Result};
use chess_corpus::chess::config::parse_engine_option;
use chess_corpus::chess::reader::{CompressionMode, read_games, resolve_paths};
use chess_corpus::chess::{corpus, jsonl, rerank};
use chess_corpus::{CorpusConfig, EloBand, EngineConfig};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "chess-corpus", about = "Build move-prediction corpora from PGN archives")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read games, select one Elo band and write training/validation JSONL
    Build(BuildArgs),
    /// Reorder each record's legal moves by engine evaluation
    Rerank(RerankArgs),
    /// Remove the `Game Sequence:` line from every record
    StripSequence(StripArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// PGN file or glob pattern
    #[arg(long)]
    pgn: String,

    /// Force a compression mode (`zstd` or `plain`); detected from the extension otherwise
    #[arg(long)]
    compression: Option<String>,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Named Elo band from the configuration
    #[arg(long, default_value = "low", conflicts_with_all = ["min_elo", "max_elo"])]
    band: String,

    /// Custom band lower bound (inclusive)
    #[arg(long, requires = "max_elo")]
    min_elo: Option<f64>,

    /// Custom band upper bound (inclusive)
    #[arg(long, requires = "min_elo")]
    max_elo: Option<f64>,

    /// Games read from the archive; 0 reads everything
    #[arg(long)]
    max_games: Option<usize>,

    #[arg(long)]
    validation_games: Option<usize>,

    #[arg(long)]
    max_train: Option<usize>,

    #[arg(long)]
    max_val: Option<usize>,

    /// Random legal plies appended after each game
    #[arg(long)]
    extension: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// TOML file with corpus settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct RerankArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    output: PathBuf,

    /// UCI engine binary
    #[arg(long)]
    engine: PathBuf,

    /// Search time per candidate move
    #[arg(long, default_value_t = 50)]
    movetime_ms: u64,

    /// Engine option as NAME=VALUE, repeatable
    #[arg(long = "engine-option")]
    engine_options: Vec<String>,
}

#[derive(Args)]
struct StripArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    output: PathBuf,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("CHESS_LOG", "warn"))
        .format_timestamp(None)
        .init();
}

fn open_reader(path: &Path) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn resolve_config(args: &BuildArgs) -> Result<(CorpusConfig, EloBand)> {
    let mut config = match &args.config {
        Some(path) => CorpusConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => CorpusConfig::default(),
    };

    if let Some(n) = args.max_games {
        config.max_games = (n > 0).then_some(n);
    }
    if let Some(k) = args.validation_games {
        config.validation_games = k;
    }
    if let Some(n) = args.max_train {
        config.max_train_samples = n;
    }
    if let Some(n) = args.max_val {
        config.max_val_samples = n;
    }
    if let Some(n) = args.extension {
        config.random_extension = n;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let band = match (args.min_elo, args.max_elo) {
        (Some(min), Some(max)) => EloBand::new("custom", min, max),
        _ => config.band(&args.band)?.clone(),
    };
    if band.min > band.max {
        anyhow::bail!("Elo band '{}' has min {} above max {}", band.name, band.min, band.max);
    }
    Ok((config, band))
}

fn run_build(args: BuildArgs) -> Result<()> {
    let (config, band) = resolve_config(&args)?;
    let compression = args
        .compression
        .as_deref()
        .map(CompressionMode::parse)
        .transpose()?;

    let paths = resolve_paths(&args.pgn)?;
    log::info!("Reading {} archive(s) matching '{}'", paths.len(), args.pgn);
    let games = read_games(&paths, compression, config.max_games)?;

    let mut rng = match config.seed {
        Some(seed) => {
            log::info!("Using seed: {seed}");
            ChaCha8Rng::seed_from_u64(seed)
        }
        None => ChaCha8Rng::from_os_rng(),
    };

    let split = corpus::assemble(games, &config, &band, &mut rng);
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
    let (train_path, val_path) = jsonl::export_split(&split, &args.out_dir)?;

    println!(
        "{} games in band '{}': {} training samples -> {}, {} validation samples -> {}",
        split.games,
        band.name,
        split.train.len(),
        train_path.display(),
        split.validation.len(),
        val_path.display()
    );
    Ok(())
}

fn run_rerank(args: RerankArgs) -> Result<()> {
    let mut engine_config = EngineConfig::new(&args.engine);
    engine_config.move_time = Duration::from_millis(args.movetime_ms);
    engine_config.options = args
        .engine_options
        .iter()
        .map(|raw| parse_engine_option(raw))
        .collect::<Result<_, _>>()?;

    let stats = rerank::rerank_file(&args.input, &args.output, &engine_config)
        .with_context(|| format!("Failed to rerank {}", args.input.display()))?;

    println!(
        "{} records: {} reranked, {} passed through, {} moves dropped -> {}",
        stats.records,
        stats.reranked,
        stats.passed_through,
        stats.dropped_moves,
        args.output.display()
    );
    Ok(())
}

fn run_strip(args: StripArgs) -> Result<()> {
    let reader = open_reader(&args.input)?;
    let writer = create_writer(&args.output)?;
    let written = jsonl::strip_jsonl(reader, writer)?;
    println!("{written} records -> {}", args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Rerank(args) => run_rerank(args),
        Command::StripSequence(args) => run_strip(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
