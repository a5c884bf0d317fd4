//! Command line for the `fairway-harness` binary.
//!
//! ```sh
//! fairway-harness replay script.jsonl --local you > views.jsonl
//! fairway-harness simulate --seed 7 --opponents 3 --rules knock-early,jokers
//! ```
//!
//! Views go to stdout as JSONL, the run summary to stderr.

use std::fmt;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fairway_core::geometry::Rect;
use fairway_core::snapshot::{PlayerId, RuleFlags};
use fairway_runtime::config::{ChoreographyConfig, ConfigError};
use web_time::Duration;

use crate::replay::{ReplayOptions, ScriptError, ViewWriter, parse_script, replay};
use crate::simulation::{Simulation, SimulationSpec};

#[derive(Debug, Parser)]
#[command(
    name = "fairway-harness",
    about = "Headless replay and simulation driver for Fairway sessions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Feed a JSONL script of frames and local actions through a session.
    Replay(ReplayArgs),

    /// Play a seeded round against the scripted authority.
    Simulate(SimulateArgs),
}

/// Viewport, configuration and output options shared by both commands.
#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u16).range(1..))]
    pub width: u16,

    #[arg(long, default_value_t = 40, value_parser = clap::value_parser!(u16).range(1..))]
    pub height: u16,

    /// Choreography config; `.json` loads JSON, anything else TOML.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write every frame, not only those whose view changed.
    #[arg(long = "every-frame")]
    pub every_frame: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// Script to replay.
    pub script: PathBuf,

    /// Seat id of the local player.
    #[arg(long)]
    pub local: Option<String>,

    #[arg(long = "frame-ms", default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    pub frame_ms: u64,

    /// Keep stepping this long after the last step while effects play.
    #[arg(long = "tail-ms", default_value_t = 10_000)]
    pub tail_ms: u64,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Debug, Clone, Args)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Computer-controlled opponents.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub opponents: u8,

    #[arg(long = "frame-ms", default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    pub frame_ms: u64,

    /// Pause between computer moves.
    #[arg(long = "think-ms", default_value_t = 500)]
    pub think_ms: u64,

    /// Comma-separated rule names, e.g. `knock-early,jokers`.
    #[arg(long, value_delimiter = ',', value_parser = parse_rule)]
    pub rules: Vec<RuleFlags>,

    /// Give up if the round has not finished after this long.
    #[arg(long = "limit-ms", default_value_t = 600_000)]
    pub limit_ms: u64,

    #[command(flatten)]
    pub view: ViewArgs,
}

fn parse_rule(name: &str) -> Result<RuleFlags, String> {
    RuleFlags::from_rule_token(name.trim()).ok_or_else(|| format!("unknown rule: {name}"))
}

/// Why a command failed.
#[derive(Debug)]
pub enum CliError {
    Read { path: PathBuf, source: io::Error },
    Script { path: PathBuf, source: ScriptError },
    Config { path: PathBuf, source: ConfigError },
    Output(io::Error),
    Unsettled { limit: Duration },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Script { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Config { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Output(e) => write!(f, "writing views: {e}"),
            Self::Unsettled { limit } => {
                write!(f, "round did not finish within {}ms", limit.as_millis())
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Script { source, .. } => Some(source),
            Self::Config { source, .. } => Some(source),
            Self::Output(e) => Some(e),
            Self::Unsettled { .. } => None,
        }
    }
}

impl ViewArgs {
    fn viewport(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn load_config(&self) -> Result<ChoreographyConfig, CliError> {
        let Some(path) = &self.config else {
            return Ok(ChoreographyConfig::default());
        };
        load_config(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })
    }
}

fn load_config(path: &Path) -> Result<ChoreographyConfig, ConfigError> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    {
        ChoreographyConfig::from_json_file(path)
    } else {
        ChoreographyConfig::from_toml_file(path)
    }
}

impl SimulateArgs {
    /// The simulation these arguments describe.
    #[must_use]
    pub fn spec(&self) -> SimulationSpec {
        SimulationSpec {
            seed: self.seed,
            opponents: usize::from(self.opponents),
            rules: self
                .rules
                .iter()
                .fold(RuleFlags::empty(), |acc, flag| acc | *flag),
            viewport: self.view.viewport(),
            computer_think: Duration::from_millis(self.think_ms),
        }
    }
}

impl ReplayArgs {
    #[must_use]
    pub fn options(&self) -> ReplayOptions {
        ReplayOptions {
            frame: Duration::from_millis(self.frame_ms),
            local: self.local.as_deref().map(PlayerId::new),
            viewport: self.view.viewport(),
            tail: Duration::from_millis(self.tail_ms),
            every_frame: self.view.every_frame,
        }
    }
}

pub fn run_from_env() -> Result<(), CliError> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Replay(args) => run_replay(&args),
        Commands::Simulate(args) => run_simulate(&args),
    }
}

fn run_replay(args: &ReplayArgs) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&args.script).map_err(|source| CliError::Read {
        path: args.script.clone(),
        source,
    })?;
    let steps = parse_script(&text).map_err(|source| CliError::Script {
        path: args.script.clone(),
        source,
    })?;
    let config = args.view.load_config()?;
    let stdout = io::stdout();
    let summary = replay(&steps, config, &args.options(), BufWriter::new(stdout.lock()))
        .map_err(CliError::Output)?;
    eprintln!("{}", summary.to_jsonl());
    Ok(())
}

fn run_simulate(args: &SimulateArgs) -> Result<(), CliError> {
    let spec = args.spec();
    let frame = Duration::from_millis(args.frame_ms);
    let limit = Duration::from_millis(args.limit_ms);

    let mut sim = Simulation::new(&spec, args.view.load_config()?);
    let stdout = io::stdout();
    let mut writer = ViewWriter::new(BufWriter::new(stdout.lock()), args.view.every_frame);
    let mut settled = false;
    while sim.elapsed() < limit {
        sim.step(frame);
        writer
            .write(sim.elapsed(), sim.view())
            .map_err(CliError::Output)?;
        if sim.is_settled() {
            settled = true;
            break;
        }
    }
    let written = writer.written();
    writer.into_inner().flush().map_err(CliError::Output)?;

    eprintln!(
        r#"{{"schema":"simulate-summary-v1","seed":{},"settled":{},"frames_written":{},"elapsed_ms":{},"counters":{}}}"#,
        spec.seed,
        settled,
        written,
        sim.elapsed().as_millis(),
        sim.session().counters().to_jsonl(),
    );
    if settled {
        Ok(())
    } else {
        Err(CliError::Unsettled { limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("fairway-harness").chain(args.iter().copied()))
    }

    #[test]
    fn simulate_defaults() {
        let Commands::Simulate(args) = parse(&["simulate"]).unwrap().command else {
            panic!("expected simulate");
        };
        let spec = args.spec();
        assert_eq!(spec.seed, 1);
        assert_eq!(spec.opponents, 2);
        assert!(spec.rules.is_empty());
        assert_eq!(spec.viewport, Rect::new(0, 0, 120, 40));
        assert_eq!(spec.computer_think, Duration::from_millis(500));
        assert_eq!(args.limit_ms, 600_000);
        assert!(!args.view.every_frame);
    }

    #[test]
    fn rules_are_comma_separated_wire_names() {
        let Commands::Simulate(args) =
            parse(&["simulate", "--rules", "knock-early,jokers", "--seed", "9"])
                .unwrap()
                .command
        else {
            panic!("expected simulate");
        };
        let spec = args.spec();
        assert_eq!(spec.rules, RuleFlags::KNOCK_EARLY | RuleFlags::JOKERS);
        assert_eq!(spec.seed, 9);
    }

    #[test]
    fn bad_values_are_rejected_by_the_parser() {
        assert!(parse(&["simulate", "--rules", "wolfpack"]).is_err());
        assert!(parse(&["simulate", "--opponents", "0"]).is_err());
        assert!(parse(&["simulate", "--opponents", "6"]).is_err());
        assert!(parse(&["simulate", "--width", "0"]).is_err());
        assert!(parse(&["replay"]).is_err());
        assert!(parse(&["replay", "a.jsonl", "--frame-ms", "0"]).is_err());
        assert!(parse(&["shuffle"]).is_err());
    }

    #[test]
    fn replay_options_follow_the_flags() {
        let Commands::Replay(args) = parse(&[
            "replay",
            "round.jsonl",
            "--local",
            "you",
            "--frame-ms",
            "8",
            "--height",
            "30",
            "--every-frame",
        ])
        .unwrap()
        .command
        else {
            panic!("expected replay");
        };
        assert_eq!(args.script, PathBuf::from("round.jsonl"));
        let options = args.options();
        assert_eq!(options.local, Some(PlayerId::new("you")));
        assert_eq!(options.frame, Duration::from_millis(8));
        assert_eq!(options.viewport, Rect::new(0, 0, 120, 30));
        assert_eq!(options.tail, Duration::from_millis(10_000));
        assert!(options.every_frame);
    }

    #[test]
    fn missing_script_is_a_read_error() {
        let cli = parse(&["replay", "/nonexistent/fairway/round.jsonl"]).unwrap();
        let err = run(cli).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn config_extension_selects_the_format() {
        let cli = parse(&["simulate", "--config", "/nonexistent/fairway.json"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let err = args.view.load_config().unwrap_err();
        assert!(err.to_string().starts_with("/nonexistent/fairway.json: "));
        assert!(matches!(
            err,
            CliError::Config {
                source: ConfigError::Io(_),
                ..
            }
        ));
    }
}
