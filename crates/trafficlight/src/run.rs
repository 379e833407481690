use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::unbounded;
use lampconfig::{LampConfig, PausePolicySetting, ShaderModelSetting, TouchMappingSetting};
use lampstate::{FixedTimeSource, TimeSource, TouchInput, TouchMapping, WirelessAdapter};
use renderer::{
    LampPalette, PausePolicy, RendererConfig, ShaderModelLevel, ShaderProgram, SurfaceSize,
    WindowRuntime,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{RunArgs, SimulateArgs};
use crate::control::ControlLink;

pub fn initialise_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Standard output carries the acknowledgment stream.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let renderer_config = renderer_config(&config);
    tracing::info!(
        width = renderer_config.surface_size.width,
        height = renderer_config.surface_size.height,
        blink_ms = config.blink_interval.as_millis() as u64,
        touch_mapping = ?renderer_config.touch_mapping,
        pause_policy = %renderer_config.pause_policy,
        min_shader_model = %renderer_config.min_shader_model,
        "starting traffic light"
    );

    let controller = renderer_config.signal_controller();
    let publisher = controller.publisher();
    let runtime = WindowRuntime::spawn(renderer_config, controller)?;

    let control = if args.no_control {
        tracing::info!("control link disabled");
        None
    } else {
        Some(ControlLink::spawn(publisher)?)
    };

    runtime.wait()?;
    if let Some(link) = control {
        link.finish()?;
    }
    tracing::info!("traffic light stopped");
    Ok(())
}

/// Replays a script of control lines without opening a window.
///
/// Every processed line advances simulated time by `--tick-ms` (or by the
/// amount given to `wait`) and runs one controller tick, then prints any
/// acknowledgments followed by the lamp state.
pub fn simulate(args: SimulateArgs) -> Result<()> {
    let config = LampConfig::load_or_default(args.config.as_deref())?;
    let reader: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open script {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let stdout = io::stdout();
    simulate_script(&config, args.tick_ms, reader, stdout.lock())
}

pub fn simulate_script<R: BufRead, W: Write>(
    config: &LampConfig,
    tick_ms: u64,
    reader: R,
    mut out: W,
) -> Result<()> {
    let mut controller = renderer_config(config).signal_controller();
    let touch = TouchInput::new(touch_mapping(config.touch_mapping), controller.publisher());
    let (ack_tx, ack_rx) = unbounded();
    let mut adapter = WirelessAdapter::new(controller.publisher(), ack_tx);
    let mut clock = FixedTimeSource::new(0);
    let mut now_ms = 0u64;

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("failed to read script")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let advance = match ScriptLine::parse(line) {
            Ok(ScriptLine::Wait(millis)) => millis,
            Ok(ScriptLine::Touch { y, height }) => {
                if touch.on_pointer_up(y, height).is_none() {
                    tracing::warn!(line = index + 1, y, height, "touch outside the surface");
                }
                tick_ms
            }
            Ok(ScriptLine::Control(text)) => {
                let _ = adapter.handle_line(text);
                tick_ms
            }
            Err(err) => {
                tracing::warn!(line = index + 1, error = %err, "skipping script line");
                tick_ms
            }
        };

        for ack in ack_rx.try_iter() {
            serde_json::to_writer(&mut out, &ack).context("failed to encode acknowledgment")?;
            writeln!(out)?;
        }

        now_ms = now_ms.saturating_add(advance);
        clock.set(now_ms);
        let sample = clock.sample();
        let tick = controller.tick(sample.millis);
        writeln!(
            out,
            "t={} state={} displayed={}",
            sample.millis, tick.state, tick.displayed
        )?;
    }

    out.flush()?;
    tracing::debug!(messages = adapter.received(), "simulation finished");
    Ok(())
}

#[derive(Debug, PartialEq)]
enum ScriptLine<'a> {
    Wait(u64),
    Touch { y: f64, height: f64 },
    Control(&'a str),
}

impl<'a> ScriptLine<'a> {
    fn parse(line: &'a str) -> Result<Self> {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("wait") => {
                let millis: u64 = words
                    .next()
                    .ok_or_else(|| anyhow!("wait needs a duration in milliseconds"))?
                    .parse()
                    .context("invalid wait duration")?;
                Ok(ScriptLine::Wait(millis))
            }
            Some("touch") => {
                let (Some(y), Some(height)) = (words.next(), words.next()) else {
                    bail!("touch needs a y position and a surface height");
                };
                Ok(ScriptLine::Touch {
                    y: y.parse().context("invalid touch position")?,
                    height: height.parse().context("invalid surface height")?,
                })
            }
            _ => Ok(ScriptLine::Control(line)),
        }
    }
}

/// Compiles and links the built-in shaders and prints what the renderer
/// will bind.
pub fn check_shaders() -> Result<()> {
    let program = ShaderProgram::builtin()?;
    let slot = program.mvp_slot();
    println!(
        "u_MVPMatrix: group={} binding={} offset={}",
        slot.group, slot.binding, slot.offset
    );
    println!("a_Position: location={}", program.position_location());
    println!("a_Color: location={}", program.color_location());
    Ok(())
}

/// Loads the configuration file and applies command-line overrides.
pub fn resolve_config(args: &RunArgs) -> Result<LampConfig> {
    let mut config = LampConfig::load_or_default(args.config.as_deref())?;
    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(millis) = args.blink_ms {
        config.blink_interval = Duration::from_millis(millis);
    }
    if let Some(mapping) = args.touch_mapping {
        config.touch_mapping = mapping;
    }
    if let Some(policy) = args.pause_policy {
        config.pause_policy = policy;
    }
    config.validate()?;
    Ok(config)
}

pub fn renderer_config(config: &LampConfig) -> RendererConfig {
    let palette = &config.palette;
    RendererConfig {
        surface_size: SurfaceSize::new(config.window.width, config.window.height),
        title: config.window.title.clone(),
        palette: LampPalette {
            background: palette.background,
            red: palette.red,
            green: palette.green,
            blink: palette.blink,
        },
        blink_interval: config.blink_interval,
        touch_mapping: touch_mapping(config.touch_mapping),
        pause_policy: match config.pause_policy {
            PausePolicySetting::Preserve => PausePolicy::Preserve,
            PausePolicySetting::Teardown => PausePolicy::Teardown,
        },
        min_shader_model: match config.min_shader_model {
            ShaderModelSetting::Sm2 => ShaderModelLevel::Sm2,
            ShaderModelSetting::Sm4 => ShaderModelLevel::Sm4,
            ShaderModelSetting::Sm5 => ShaderModelLevel::Sm5,
        },
    }
}

fn touch_mapping(setting: TouchMappingSetting) -> TouchMapping {
    match setting {
        TouchMappingSetting::Banded => TouchMapping::Banded,
        TouchMappingSetting::Cycle => TouchMapping::Cycle,
    }
}
