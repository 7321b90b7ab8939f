use std::path::PathBuf;
use std::time::Duration;

use bgconfig::{ClockSetting, SurfaceDimensions};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "iridescence",
    author,
    version,
    about = "Animated iridescence shader background",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Config file to read instead of the discovered one.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Colour multiplier as `R,G,B` (e.g. `1,0.8,0.9`).
    #[arg(long, value_name = "R,G,B", value_parser = parse_tint)]
    pub tint: Option<[f64; 3]>,

    /// Strength of the pointer-driven distortion.
    #[arg(long, value_name = "AMOUNT", allow_negative_numbers = true)]
    pub amplitude: Option<f64>,

    /// Animation rate multiplier.
    #[arg(long, value_name = "FACTOR", allow_negative_numbers = true)]
    pub speed: Option<f64>,

    /// Host surface id; also used as the window title.
    #[arg(long, value_name = "ID")]
    pub surface: Option<String>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<SurfaceDimensions>,

    /// Frame rate cap (0 = render on every refresh).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f64>,

    /// Animation clock: `wall` or `frame` (fixed step per rendered frame).
    #[arg(long, value_name = "CLOCK")]
    pub clock: Option<ClockSetting>,

    /// Render a single still frame at this time (seconds) instead of animating.
    #[arg(long, value_name = "SECONDS")]
    pub still: Option<f32>,

    /// Stop and exit after this long (e.g. `30s`, `5m`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub run_for: Option<Duration>,

    /// Prefer the high-performance GPU adapter.
    #[arg(long)]
    pub high_performance: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message to the chat backend and print the reply.
    Chat(ChatArgs),
    /// Inspect the configuration file.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Message text.
    #[arg(value_name = "MESSAGE")]
    pub message: String,

    /// Base URL of the chat backend.
    #[arg(
        long,
        value_name = "URL",
        env = "IRIDESCENCE_CHAT_ENDPOINT",
        default_value = chat::DEFAULT_ENDPOINT
    )]
    pub endpoint: String,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the path of the config file that would be read.
    Where,
    /// Print the effective settings, file plus flags, as TOML.
    Show,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_tint(value: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let &[r, g, b] = parts.as_slice() else {
        return Err(format!(
            "invalid tint '{value}'; expected three comma-separated numbers"
        ));
    };
    let parse = |part: &str| {
        part.parse::<f64>()
            .map_err(|err| format!("invalid tint component '{part}': {err}"))
    };
    Ok([parse(r)?, parse(g)?, parse(b)?])
}

pub fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value.trim())
        .map_err(|err| format!("invalid duration '{value}': {err}"))
}
