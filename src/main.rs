//! Gomoku analysis CLI
//!
//! Reviews a move list or recommends a move, printing JSON to stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use gomoku::analysis::{Analyzer, MoveInput};
use gomoku::config::{EngineConfig, EngineConfigFile, Tier};
use gomoku::error::ConfigError;
use gomoku::Player;

#[derive(Parser, Debug)]
#[command(name = "gomoku-analyze", author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review every move of a game
    Analyze {
        #[command(flatten)]
        game: GameArgs,
    },
    /// Recommend a move for the side to move
    BestMove {
        #[command(flatten)]
        game: GameArgs,

        /// Search time budget in milliseconds
        #[arg(long, default_value_t = 1000)]
        time_ms: u64,

        /// Side to move (defaults to alternation from Black)
        #[arg(long, value_enum)]
        player: Option<PlayerArg>,
    },
}

#[derive(Args, Debug)]
struct GameArgs {
    /// Space- or comma-separated moves, e.g. "H8 I9 H9"
    #[arg(long, conflicts_with = "input")]
    moves: Option<String>,

    /// JSON file holding an array of coordinates or {coord, player} objects
    #[arg(long)]
    input: Option<PathBuf>,

    /// Board dimension
    #[arg(long)]
    size: Option<usize>,

    /// Stones in a row needed to win
    #[arg(long)]
    win_length: Option<usize>,

    /// Analysis tier: basic or deep
    #[arg(long)]
    tier: Option<Tier>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PlayerArg {
    Black,
    White,
}

impl From<PlayerArg> for Player {
    fn from(p: PlayerArg) -> Self {
        match p {
            PlayerArg::Black => Player::Black,
            PlayerArg::White => Player::White,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputMove {
    Coord(String),
    Full(MoveInput),
}

fn main() {
    let cli = Cli::parse();

    use std::io::Write;
    let log_level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
    .write_style(env_logger::WriteStyle::Never)
    .target(env_logger::Target::Stderr)
    .init();

    if let Err(e) = run(cli) {
        log::error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze { game } => {
            let config = build_config(&game)?;
            let moves = read_moves(&game)?;
            let result = Analyzer::new(config).analyze(&moves)?;
            print_json(&result, cli.pretty)
        }
        Command::BestMove {
            game,
            time_ms,
            player,
        } => {
            let analyzer = Analyzer::new(build_config(&game)?);
            let moves = read_moves(&game)?;
            let board = analyzer.replay(&moves)?;
            let player = player.map(Player::from).unwrap_or_else(|| board.side_to_move());
            match analyzer.best_move(&board, player, Duration::from_millis(time_ms)) {
                Some(best) => print_json(&best, cli.pretty),
                None => print_json(&serde_json::Value::Null, cli.pretty),
            }
        }
    }
}

fn build_config(game: &GameArgs) -> Result<EngineConfig> {
    let file = match &game.config {
        Some(path) => EngineConfigFile::load(path)?,
        None => EngineConfigFile::default(),
    };
    let config = merge_flags(game, file)?;
    log::debug!("configuration: {config:?}");
    Ok(config)
}

/// Command-line flags replace the file's tier and dimensions; the file's
/// `[profile]` overrides then apply to whichever tier wins.
fn merge_flags(game: &GameArgs, mut file: EngineConfigFile) -> Result<EngineConfig, ConfigError> {
    file.board_size = game.size.or(file.board_size);
    file.win_length = game.win_length.or(file.win_length);
    file.tier = game.tier.or(file.tier);
    file.resolve()
}

fn read_moves(game: &GameArgs) -> Result<Vec<MoveInput>> {
    match (&game.moves, &game.input) {
        (Some(text), _) => Ok(parse_move_text(text)),
        (None, Some(path)) => read_move_file(path),
        (None, None) => bail!("either --moves or --input is required"),
    }
}

fn parse_move_text(text: &str) -> Vec<MoveInput> {
    MoveInput::alternating(
        text.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty()),
    )
}

fn read_move_file(path: &Path) -> Result<Vec<MoveInput>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let moves: Vec<InputMove> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse moves from {}", path.display()))?;
    Ok(moves
        .into_iter()
        .map(|m| match m {
            InputMove::Coord(coord) => MoveInput::new(coord),
            InputMove::Full(input) => input,
        })
        .collect())
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
