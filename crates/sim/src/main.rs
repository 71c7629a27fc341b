//! Runs the plotter firmware's control loop against a simulated machine.
//!
//! The host side of the protocol is played from a script, and whatever the
//! pen draws is written out as an SVG.

use std::{
    fs::File,
    io::{BufWriter, Read as _},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context as _};
use clap::Parser;
use xyplot_control::Plotter;
use xyplot_geom::{Position, XY};
use xyplot_motion::{AnalogLimit, MachineConfig, Microstep, MotionController, Pen, StepDir};
use xyplot_protocol::Phase;

use crate::bench::{AxisName, Bench, FixedLevel, PinRole, Shared, SimChannel, SimDelay, SimPin, SimServo};
use crate::host::ScriptedHost;

mod bench;
mod host;
mod svg;

#[derive(Parser)]
struct Args {
    /// The host's side of the conversation. Reads stdin if not given.
    script: Option<PathBuf>,

    /// Where to write the drawing.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Machine configuration, as JSON. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the calibration knob is turned to (0 to 1023).
    #[arg(long, default_value_t = 1023)]
    pen_level: u16,

    /// Travel in steps before the far limit switch closes.
    #[arg(long, default_value_t = 2000)]
    width: i32,

    #[arg(long, default_value_t = 2000)]
    height: i32,

    /// Where the carriage is at power-on, in steps from the home switches.
    #[arg(long, default_value_t = 1)]
    start_x: i32,

    #[arg(long, default_value_t = 1)]
    start_y: i32,

    /// Home before talking to the host.
    #[arg(long)]
    home_first: bool,

    /// Overrides the configured step pulse half-period, in milliseconds.
    #[arg(long)]
    step_delay: Option<u32>,

    /// Overrides how long the servo takes per degree, in milliseconds.
    #[arg(long)]
    servo_delay: Option<u32>,

    /// Overrides the pause between homing steps, in milliseconds.
    #[arg(long)]
    home_delay: Option<u32>,

    /// Overrides the microstep divisor (1, 2, 4 or 8).
    #[arg(long)]
    microstep: Option<u8>,
}

struct Options {
    pen_level: u16,
    extent: XY<i32>,
    start: XY<i32>,
    home_first: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            pen_level: 1023,
            extent: XY::new(2000, 2000),
            start: XY::new(1, 1),
            home_first: false,
        }
    }
}

struct Outcome {
    bench: Shared,
    host: ScriptedHost,
    position: Position,
}

fn load_config(path: &Path) -> anyhow::Result<MachineConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_config(&data)
}

fn parse_config(data: &str) -> anyhow::Result<MachineConfig> {
    Ok(serde_json::from_str(data)?)
}

fn machine_config(args: &Args) -> anyhow::Result<MachineConfig> {
    let base = match &args.config {
        Some(path) => load_config(path)?,
        None => MachineConfig::default(),
    };
    let mut builder = base.to_builder();
    if let Some(ms) = args.step_delay {
        builder.with_step_delay(ms);
    }
    if let Some(ms) = args.servo_delay {
        builder.with_servo_delay(ms);
    }
    if let Some(ms) = args.home_delay {
        builder.with_home_delay(ms);
    }
    if let Some(divisor) = args.microstep {
        builder
            .with_microstep(divisor)
            .with_context(|| format!("drivers can't split a step into {divisor} parts"))?;
    }
    Ok(builder.build())
}

fn simulate(script: &str, config: &MachineConfig, opts: &Options) -> anyhow::Result<Outcome> {
    let microstep = Microstep::from_divisor(config.microstep)
        .with_context(|| format!("drivers can't split a step into {} parts", config.microstep))?;
    let bench = Bench::new(config, opts.extent, opts.start);

    let driver = |axis, inverted| {
        let pin = |role| SimPin {
            bench: bench.clone(),
            axis,
            role,
        };
        let mut driver = StepDir::new(
            pin(PinRole::Step),
            pin(PinRole::Dir),
            pin(PinRole::Enable),
            SimDelay(bench.clone()),
            config.step_delay_ms,
            inverted,
        )
        .with_microstep_pins(pin(PinRole::Ms1), pin(PinRole::Ms2));
        driver.set_microstep(microstep);
        driver
    };
    let limit = |axis| {
        AnalogLimit::new(
            SimChannel {
                bench: bench.clone(),
                axis,
            },
            config.thresholds(),
        )
    };
    let pen = Pen::new(
        SimServo(bench.clone()),
        SimDelay(bench.clone()),
        config.servo_delay_ms,
        config.pen_up_angle,
        config.pen_down_angle,
    );

    let mut machine = MotionController::new(
        XY::new(
            driver(AxisName::X, config.invert_x),
            driver(AxisName::Y, config.invert_y),
        ),
        XY::new(limit(AxisName::X), limit(AxisName::Y)),
        pen,
        SimDelay(bench.clone()),
        config,
    );
    if opts.home_first {
        machine.home();
    }

    let mut plotter = Plotter::new(ScriptedHost::new(script), FixedLevel(opts.pen_level), machine);
    loop {
        match plotter.step() {
            Phase::Done => break,
            phase if phase.is_receiving() && plotter.host().is_stalled() => {
                bail!("the script ran out while the device was {phase}");
            }
            _ => {}
        }
    }

    let (host, _, machine) = plotter.into_parts();
    Ok(Outcome {
        bench,
        host,
        position: machine.current_position(),
    })
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let mut script = String::new();
    match &args.script {
        Some(path) => {
            script = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            std::io::stdin().read_to_string(&mut script)?;
        }
    }
    let config = machine_config(&args)?;
    let opts = Options {
        pen_level: args.pen_level,
        extent: XY::new(args.width, args.height),
        start: XY::new(args.start_x, args.start_y),
        home_first: args.home_first,
    };

    let outcome = simulate(&script, &config, &opts)?;
    let bench = outcome.bench.borrow();
    println!(
        "drew {} strokes with {} x steps and {} y steps, taking {:.1}s",
        bench.strokes.len(),
        bench.steps.x,
        bench.steps.y,
        bench.elapsed_ms as f64 / 1000.0
    );
    println!(
        "finished at {} (carriage at {}), pausing {} times for a full batch",
        outcome.position,
        bench.pen_position(),
        outcome.host.waits
    );

    if let Some(path) = &args.svg {
        let out = BufWriter::new(File::create(path)?);
        svg::write(out, &bench.strokes, bench.extent)?;
    }
    Ok(())
}
