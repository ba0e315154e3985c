use anyhow::{Context, Result};
use chess_opponent::core::config::default_config_path;
use chess_opponent::core::AppConfig;
use chess_opponent::game::ai::{MoveCoordinator, Pacing};
use chess_opponent::game::resources::{format_clock, GameClock};
use chess_opponent::game::rules::ShakmatyRules;
use chess_opponent::game::types::{Color, TimeControl};
use chess_opponent::game::{GameHandle, GameRunner, GameSession, Intent, SessionSnapshot};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uci_client::{Difficulty, EngineClient, Square};

/// Play chess against a UCI engine from the terminal
#[derive(Debug, Parser)]
#[command(name = "chess-opponent", version)]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Portable engine binary
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Engine build that needs AVX2, preferred when the CPU supports it
    #[arg(long)]
    engine_accelerated: Option<PathBuf>,

    /// Opponent strength, 1-10
    #[arg(long, value_parser = parse_difficulty)]
    difficulty: Option<Difficulty>,

    /// Colour you play: white or black
    #[arg(long)]
    color: Option<Color>,

    /// Base time per side in minutes
    #[arg(long)]
    minutes: Option<u32>,

    /// Increment per move in seconds
    #[arg(long)]
    increment: Option<u32>,

    /// Play without a clock
    #[arg(long, conflicts_with_all = ["minutes", "increment"])]
    unlimited: bool,

    /// Answer as fast as the engine does
    #[arg(long)]
    no_pacing: bool,

    /// Write the effective config to the config path and exit
    #[arg(long)]
    save_config: bool,

    /// Log filter, e.g. `info` or `uci_client=debug`
    #[arg(long)]
    log: Option<String>,
}

fn parse_difficulty(value: &str) -> Result<Difficulty, String> {
    let level: u8 = value.parse().map_err(|e| format!("{e}"))?;
    Difficulty::try_from(level)
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.engine {
            config.engine.path = path.clone();
        }
        if let Some(path) = &self.engine_accelerated {
            config.engine.accelerated_path = Some(path.clone());
        }
        if let Some(difficulty) = self.difficulty {
            config.session.difficulty = difficulty;
        }
        if let Some(color) = self.color {
            config.session.human_color = color;
        }
        if self.unlimited {
            config.session.time_control = None;
        } else if self.minutes.is_some() || self.increment.is_some() {
            let base = config.session.time_control.unwrap_or_default();
            config.session.time_control = Some(TimeControl::new(
                self.minutes.unwrap_or(base.initial_minutes),
                self.increment.unwrap_or(base.increment_seconds),
            ));
        }
        if self.no_pacing {
            config.session.pacing = false;
        }
        if let Some(filter) = &self.log {
            config.log_filter = Some(filter.clone());
        }
    }
}

/// `--log` wins over the config file's `log_filter`; the file is read without logging
fn log_filter(cli: &Cli, config_path: &Path) -> Option<String> {
    cli.log.clone().or_else(|| {
        AppConfig::load_from(config_path)
            .ok()
            .and_then(|config| config.log_filter)
    })
}

fn init_tracing(filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or("info")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    init_tracing(log_filter(&cli, &config_path).as_deref());
    let mut config = AppConfig::load_or_default(Some(&config_path));
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    if cli.save_config {
        config
            .save(&config_path)
            .with_context(|| format!("failed to save config to {}", config_path.display()))?;
        println!("Saved {}", config_path.display());
        return Ok(());
    }

    let client = EngineClient::launch(&config.engine)
        .with_context(|| format!("failed to start engine {}", config.engine.path.display()))?;
    if let Err(e) = client.wait_ready(config.engine.ready_wait()).await {
        warn!("[ENGINE] Engine not ready yet: {}", e);
    }

    let coordinator =
        MoveCoordinator::with_pacing(client.clone(), Pacing::enabled(config.session.pacing));
    let session = GameSession::new(ShakmatyRules::new(), config.session.clone());
    let (handle, runner) = GameRunner::spawn(session, coordinator);

    print_help();
    let printer = tokio::spawn(print_updates(handle.clone()));
    let outcome = read_commands(&handle).await;

    if let Err(e) = handle.shutdown().await {
        warn!("[GAME] Runner already stopped: {}", e);
    }
    printer.abort();
    if let Err(e) = runner.await {
        warn!("[GAME] Runner ended abnormally: {}", e);
    }
    client.dispose().await;
    info!("Goodbye");
    outcome
}

async fn read_commands(handle: &GameHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        let intent = match line {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            "show" => {
                print_snapshot(&handle.snapshot());
                continue;
            }
            "new" => Intent::NewGame { human_color: None },
            "new white" => Intent::NewGame {
                human_color: Some(Color::White),
            },
            "new black" => Intent::NewGame {
                human_color: Some(Color::Black),
            },
            "flip" => Intent::FlipColor,
            "resign" => Intent::Resign,
            "draw" => Intent::OfferDraw,
            "retry" => Intent::RetryOpponent,
            other => match parse_command(other) {
                Ok(intent) => intent,
                Err(message) => {
                    println!("{message}");
                    continue;
                }
            },
        };

        if let Err(e) = handle.send(intent).await {
            println!("{e}");
        }
    }
    Ok(())
}

/// `level N`, `select <square>`, or a move token
fn parse_command(line: &str) -> Result<Intent, String> {
    if let Some(level) = line.strip_prefix("level ") {
        return parse_difficulty(level.trim()).map(Intent::SetDifficulty);
    }
    if let Some(name) = line.strip_prefix("select ") {
        let name = name.trim();
        return Square::parse(name)
            .map(Intent::SelectSquare)
            .ok_or_else(|| format!("'{name}' is not a square"));
    }
    Ok(Intent::MakeMove(line.to_string()))
}

async fn print_updates(handle: GameHandle) {
    let mut updates = handle.subscribe();
    let mut last_seen = None;
    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        let key = (
            snapshot.generation,
            snapshot.ply,
            snapshot.status,
            snapshot.last_error.clone(),
            snapshot.selected,
        );
        if last_seen.as_ref() == Some(&key) {
            continue;
        }
        last_seen = Some(key);
        print_snapshot(&snapshot);
    }
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    println!();
    println!("{}", snapshot.position_fen);
    if let Some(last) = &snapshot.last_opponent_move {
        println!(
            "Opponent played {} ({}) in {:.1}s",
            last.san,
            last.uci,
            Duration::from_millis(last.thinking_time_ms).as_secs_f32()
        );
    }
    println!("{}", opponent_line(snapshot));
    if let Some(clock) = &snapshot.clock {
        println!("{}", clock_line(clock));
    }
    if let Some(square) = snapshot.selected {
        let targets: Vec<String> = snapshot.legal_targets.iter().map(Square::to_string).collect();
        println!("Selected {}: {}", square, targets.join(" "));
    }
    if let Some(error) = &snapshot.last_error {
        println!("Error: {error}");
    }
    match snapshot.result_message {
        Some(message) => println!("{message}  (type `new` to play again)"),
        None if snapshot.in_check => println!("{} to move, in check", snapshot.active_color),
        None => println!("{} to move", snapshot.active_color),
    }
}

fn opponent_line(snapshot: &SessionSnapshot) -> String {
    let mut line = format!(
        "Opponent: {} ({})",
        snapshot.difficulty,
        snapshot.difficulty.category()
    );
    if let Some(average) = snapshot.opponent_stats.average_thinking_ms() {
        line.push_str(&format!(
            ", {:.1}s per move",
            Duration::from_millis(average).as_secs_f32()
        ));
    }
    line
}

fn clock_line(clock: &GameClock) -> String {
    let side = |color: Color| {
        let flag = if clock.is_expired(color) { " (flag)" } else { "" };
        format!("{} {}{}", color, format_clock(clock.remaining_ms(color)), flag)
    };
    format!("{}  {}", side(Color::White), side(Color::Black))
}

fn print_help() {
    println!("Moves in UCI notation (e2e4, e7e8q). Commands: select <square>, new [white|black], flip, resign, draw, retry, level <1-10>, show, help, quit");
}
