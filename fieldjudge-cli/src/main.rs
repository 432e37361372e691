//! Fieldjudge CLI: officiate a field event from the command line.
//!
//! Every session command resumes the event from its JSONL store, applies one
//! instruction, flushes any pending writes and prints what happened.
//!
//! Commands:
//! - `record`, `undo`, `retire`, `raise`, `jump` for vertical events
//! - `mark`, `foul`, `pass`, `undo-mark`, `withdraw`, `close-round` for
//!   horizontal events
//! - `next`, `standings`, `compact` for either
//! - `simulate` runs a seeded vertical competition without any files

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use fieldjudge_core::domain::{AthleteId, AttemptOutcome, Height};
use fieldjudge_core::engine::{Command, EngineEvent, Progress, VerticalConfig};
use fieldjudge_core::horizontal::{HorizontalAttempt, HorizontalStanding};
use fieldjudge_core::persistence::{AttemptStore, SaveError};
use fieldjudge_core::simulate::{self, SimulationConfig};
use fieldjudge_core::standings::{rank, Classification, Standing};
use fieldjudge_runner::{
    open_horizontal, open_vertical, Applied, Discipline, HorizontalSession, JsonlAttemptStore,
    OfficiatingSession, SessionConfig, SessionError,
};

#[derive(Parser)]
#[command(name = "fieldjudge", about = "Fieldjudge: field event officiating")]
struct Cli {
    /// Session config TOML. Not needed for `simulate`.
    #[arg(long, global = true, default_value = "session.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a vertical attempt: O, X, - or r.
    Record { athlete: String, outcome: AttemptOutcome },
    /// Remove the athlete's latest vertical attempt.
    Undo {
        athlete: String,
        /// Height in cm. Defaults to the athlete's latest height.
        #[arg(long)]
        height: Option<u32>,
    },
    /// Withdraw an athlete from a vertical event.
    Retire { athlete: String },
    /// Raise the bar to the next height.
    Raise,
    /// Move the bar to a height in cm.
    Jump {
        height: u32,
        /// Allow moving the bar down to correct a mistake.
        #[arg(long, default_value_t = false)]
        allow_lower: bool,
    },
    /// Record a valid horizontal mark in cm.
    Mark { athlete: String, cm: u32 },
    /// Record a horizontal foul.
    Foul { athlete: String },
    /// Record a horizontal pass.
    Pass { athlete: String },
    /// Remove the athlete's attempt in the current round.
    UndoMark { athlete: String },
    /// Withdraw an athlete from the remaining horizontal rounds.
    Withdraw { athlete: String },
    /// Close the current horizontal round.
    CloseRound,
    /// Show who is up next.
    Next,
    /// Print standings.
    Standings,
    /// Rewrite the attempt store without superseded lines.
    Compact,
    /// Run a seeded simulated vertical competition.
    Simulate {
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 12)]
        athletes: usize,

        /// Opening height in cm.
        #[arg(long, default_value_t = 120)]
        start: u32,

        #[arg(long, default_value_t = 5)]
        increment: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Simulate {
        seed,
        athletes,
        start,
        increment,
    } = cli.command
    {
        return run_simulate(seed, athletes, start, increment);
    }

    let config = SessionConfig::from_file(&cli.config)
        .with_context(|| format!("loading session config {}", cli.config.display()))?;
    info!(event = %config.event_id, discipline = ?config.discipline, "session config loaded");

    if let Commands::Compact = cli.command {
        return run_compact(&config);
    }

    match config.discipline {
        Discipline::Vertical => {
            let session = open_vertical(&config).context("opening vertical event")?;
            run_vertical(session, cli.command)
        }
        Discipline::Horizontal => {
            let session = open_horizontal(&config).context("opening horizontal event")?;
            run_horizontal(session, cli.command)
        }
    }
}

// ── Vertical ─────────────────────────────────────────────────────────

fn run_vertical(
    mut session: OfficiatingSession<JsonlAttemptStore>,
    command: Commands,
) -> Result<()> {
    let command = match command {
        Commands::Record { athlete, outcome } => Command::Record {
            athlete: AthleteId::new(athlete),
            outcome,
        },
        Commands::Undo { athlete, height } => {
            let athlete = AthleteId::new(athlete);
            let height = match height {
                Some(cm) => Height(cm),
                None => session
                    .state()
                    .athlete(&athlete)
                    .and_then(|a| a.latest_height())
                    .with_context(|| format!("{athlete} has no attempts to undo"))?,
            };
            Command::Undo { athlete, height }
        }
        Commands::Retire { athlete } => Command::Retire {
            athlete: AthleteId::new(athlete),
        },
        Commands::Raise => Command::Raise,
        Commands::Jump {
            height,
            allow_lower,
        } => Command::JumpTo {
            height: Height(height),
            allow_lower,
        },
        Commands::Next => {
            print_progress(&session);
            return Ok(());
        }
        Commands::Standings => {
            print_standings(&session.standings());
            return Ok(());
        }
        other => bail!("{} is not a vertical command", name_of(&other)),
    };

    let applied = session.apply(command)?;
    for event in &applied.events {
        println!("{}", describe(event));
    }
    finish(&applied, session.flush_dirty().map(|_| ()))?;
    print_progress(&session);
    Ok(())
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::AttemptRecorded {
            athlete,
            height,
            attempt_number,
            outcome,
        } => format!("{athlete} {outcome} at {height} (attempt {attempt_number})"),
        EngineEvent::AttemptUndone {
            athlete,
            height,
            outcome,
            status,
        } => format!("{athlete} {outcome} at {height} undone, now {status}"),
        EngineEvent::AthleteFinished {
            athlete,
            height,
            outcome,
        } => format!("{athlete} done at {height}: {outcome:?}"),
        EngineEvent::AthleteRetired { athlete, status, .. } => {
            format!("{athlete} withdrew: {status}")
        }
        EngineEvent::HeightChanged { from, to, automatic } => {
            let how = if *automatic { "auto" } else { "official" };
            format!("bar {from} -> {to} ({how})")
        }
        EngineEvent::CompetitionOver => "competition over".to_string(),
    }
}

fn print_progress(session: &OfficiatingSession<JsonlAttemptStore>) {
    let height = session.state().current_height();
    match session.next() {
        Progress::Next(athlete) => println!("next: {athlete} at {height}"),
        Progress::HeightExhausted => println!("nobody left at {height}; raise the bar"),
        Progress::CompetitionOver => println!("competition over"),
    }
}

fn print_standings(standings: &[Standing]) {
    println!(
        "{:>5}  {:<8} {:<20} {:>7} {:>4} {:>4}  SHEET",
        "PLACE", "ID", "NAME", "BEST", "F@B", "TF"
    );
    for s in standings {
        let best = s.best_height.map_or("-".to_string(), |h| h.to_string());
        let sheet: Vec<String> = s
            .scoresheet
            .iter()
            .map(|(h, marks)| format!("{}:{marks}", h.as_cm()))
            .collect();
        println!(
            "{:>5}  {:<8} {:<20} {:>7} {:>4} {:>4}  {}",
            place_label(s.place, s.classification),
            s.athlete,
            s.name,
            best,
            s.failures_at_best,
            s.total_failures,
            sheet.join(" ")
        );
    }
}

// ── Horizontal ───────────────────────────────────────────────────────

fn run_horizontal(
    mut session: HorizontalSession<JsonlAttemptStore>,
    command: Commands,
) -> Result<()> {
    let (athlete, attempt) = match command {
        Commands::Mark { athlete, cm } => (athlete, HorizontalAttempt::Mark(cm)),
        Commands::Foul { athlete } => (athlete, HorizontalAttempt::Foul),
        Commands::Pass { athlete } => (athlete, HorizontalAttempt::Pass),
        Commands::UndoMark { athlete } => {
            let athlete = AthleteId::new(athlete);
            let applied = session.undo_last(&athlete)?;
            println!("{athlete} round {} undone", session.event().current_round());
            finish(&applied, session.flush_dirty().map(|_| ()))?;
            return Ok(());
        }
        Commands::Withdraw { athlete } => {
            let athlete = AthleteId::new(athlete);
            let applied = session.withdraw(&athlete)?;
            println!("{athlete} withdrawn from round {}", applied.events[0]);
            finish(&applied, session.flush_dirty().map(|_| ()))?;
            print_next_horizontal(&session);
            return Ok(());
        }
        Commands::CloseRound => {
            match session.close_round()? {
                Some(round) => println!("round {round} open"),
                None => println!("final round closed"),
            }
            return Ok(());
        }
        Commands::Next => {
            print_next_horizontal(&session);
            return Ok(());
        }
        Commands::Standings => {
            print_horizontal_standings(&session.standings());
            return Ok(());
        }
        other => bail!("{} is not a horizontal command", name_of(&other)),
    };

    let athlete = AthleteId::new(athlete);
    let applied = session.record(&athlete, attempt)?;
    println!("{athlete} round {}: {}", applied.events[0], attempt_label(attempt));
    finish(&applied, session.flush_dirty().map(|_| ()))?;
    print_next_horizontal(&session);
    Ok(())
}

fn attempt_label(attempt: HorizontalAttempt) -> String {
    match attempt {
        HorizontalAttempt::Mark(cm) => Height(cm).to_string(),
        HorizontalAttempt::Foul => "X".to_string(),
        HorizontalAttempt::Pass => "-".to_string(),
    }
}

fn print_next_horizontal(session: &HorizontalSession<JsonlAttemptStore>) {
    let event = session.event();
    if event.is_complete() {
        println!("event complete");
        return;
    }
    match session.next() {
        Some(athlete) => println!("next: {athlete} (round {})", event.current_round()),
        None => println!("round {} finished; close it", event.current_round()),
    }
}

fn print_horizontal_standings(standings: &[HorizontalStanding]) {
    println!("{:>5}  {:<8} {:<20} {:>7}", "PLACE", "ID", "NAME", "BEST");
    for s in standings {
        let best = s.best_mark.map_or("-".to_string(), |cm| Height(cm).to_string());
        println!(
            "{:>5}  {:<8} {:<20} {:>7}",
            place_label(s.place, s.classification),
            s.athlete,
            s.name,
            best
        );
    }
}

// ── Shared ───────────────────────────────────────────────────────────

fn place_label(place: Option<u32>, classification: Classification) -> String {
    match (place, classification) {
        (Some(p), _) => p.to_string(),
        (None, Classification::DidNotStart) => "DNS".to_string(),
        (None, _) => "NM".to_string(),
    }
}

/// Report a save failure, then the outcome of the follow-up flush.
fn finish<E>(applied: &Applied<E>, flushed: Result<(), SessionError>) -> Result<()> {
    if let Some(err) = &applied.save_error {
        report_save(err);
    }
    flushed.context("the change was applied but not written; repeat it once the store is back")
}

fn report_save(err: &SaveError) {
    let kind = if err.retryable { "retrying" } else { "not retryable" };
    eprintln!("warning: {err} ({kind})");
}

fn run_compact(config: &SessionConfig) -> Result<()> {
    let store = JsonlAttemptStore::new(&config.store);
    let dropped = store
        .compact()
        .with_context(|| format!("compacting {}", store.path().display()))?;
    let rows = store.load_attempts(&config.event_id)?.len();
    println!("{}: {rows} rows kept, {dropped} lines dropped", store.path().display());
    Ok(())
}

fn run_simulate(seed: u64, athletes: usize, start: u32, increment: u32) -> Result<()> {
    let config = SimulationConfig {
        seed,
        athletes,
        vertical: VerticalConfig::new(Height(start), increment),
        ..SimulationConfig::default()
    };
    let report = simulate::run(&config)?;
    println!(
        "event {} simulated in {} steps (seed {seed}), digest {}",
        report.state.event_id(),
        report.steps,
        report.state.log_digest()
    );
    print_standings(&rank(&report.state));
    Ok(())
}

fn name_of(command: &Commands) -> &'static str {
    match command {
        Commands::Record { .. } => "record",
        Commands::Undo { .. } => "undo",
        Commands::Retire { .. } => "retire",
        Commands::Raise => "raise",
        Commands::Jump { .. } => "jump",
        Commands::Mark { .. } => "mark",
        Commands::Foul { .. } => "foul",
        Commands::Pass { .. } => "pass",
        Commands::UndoMark { .. } => "undo-mark",
        Commands::Withdraw { .. } => "withdraw",
        Commands::CloseRound => "close-round",
        Commands::Next => "next",
        Commands::Standings => "standings",
        Commands::Compact => "compact",
        Commands::Simulate { .. } => "simulate",
    }
}
