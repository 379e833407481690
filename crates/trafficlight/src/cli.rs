use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lampconfig::{PausePolicySetting, TouchMappingSetting};

#[derive(Parser, Debug)]
#[command(
    name = "trafficlight",
    author,
    version,
    about = "Traffic-light indicator driven by touch and a wireless control link"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    /// Raise the default log level to `debug` (RUST_LOG still wins).
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the window size (e.g. `720x1280`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Override the blink interval in milliseconds.
    #[arg(long, value_name = "MILLISECONDS", value_parser = parse_blink_ms)]
    pub blink_ms: Option<u64>,

    /// How touches map to states: `banded` or `cycle`.
    #[arg(long, value_name = "MAPPING", value_parser = parse_touch_mapping)]
    pub touch_mapping: Option<TouchMappingSetting>,

    /// GPU resources on pause: `preserve` or `teardown`.
    #[arg(long, value_name = "POLICY", value_parser = parse_pause_policy)]
    pub pause_policy: Option<PausePolicySetting>,

    /// Do not read control messages from standard input.
    #[arg(long)]
    pub no_control: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay control messages headlessly and print acks and lamp state.
    Simulate(SimulateArgs),
    /// Compile and link the built-in shaders, then report the resolved slots.
    CheckShaders,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Configuration file (TOML).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Simulated milliseconds between script lines.
    #[arg(long, value_name = "MILLISECONDS", default_value_t = 100)]
    pub tick_ms: u64,

    /// Script to replay; standard input when omitted.
    #[arg(value_name = "SCRIPT")]
    pub script: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in window size".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in window size".to_string())?;
    if width == 0 || height == 0 {
        return Err("window size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_blink_ms(value: &str) -> Result<u64, String> {
    let millis: u64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid blink interval '{value}'"))?;
    if millis == 0 {
        return Err("blink interval must be greater than zero".into());
    }
    Ok(millis)
}

pub fn parse_touch_mapping(value: &str) -> Result<TouchMappingSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "banded" | "bands" => Ok(TouchMappingSetting::Banded),
        "cycle" => Ok(TouchMappingSetting::Cycle),
        other => Err(format!(
            "unknown touch mapping '{other}'; expected banded or cycle"
        )),
    }
}

pub fn parse_pause_policy(value: &str) -> Result<PausePolicySetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "preserve" | "keep" => Ok(PausePolicySetting::Preserve),
        "teardown" | "release" => Ok(PausePolicySetting::Teardown),
        other => Err(format!(
            "unknown pause policy '{other}'; expected preserve or teardown"
        )),
    }
}
