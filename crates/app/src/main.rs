use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use gvm_core::{Bpm, Clock, Easing, GvmError, ManualClock, SketchConfig, SystemClock};
use tracing_subscriber::EnvFilter;

fn main() -> gvm_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref(), cli.bpm)?;

    match cli.command {
        Commands::Phase {
            duration_ms,
            step_ms,
            cycle,
            ease,
            easing,
            seed,
        } => {
            let mut config = config;
            if let Some(cycle) = cycle {
                config.phase.cycle_length = cycle;
            }
            if let Some(ease) = ease {
                config.phase.ease_duration = ease;
            }
            if let Some(easing) = easing {
                config.phase.easing = easing;
            }
            run_phase(&config, duration_ms, step_ms, &seed)
        }
        Commands::Easings { steps } => run_easings(steps),
        Commands::Tap => run_tap(&config),
    }
}

fn load_config(path: Option<&PathBuf>, bpm: Option<f64>) -> gvm_core::Result<SketchConfig> {
    let mut config = match path {
        Some(path) => SketchConfig::from_path(path)?,
        None => SketchConfig::default(),
    };

    if let Some(bpm) = bpm {
        config.bpm = Bpm::new(bpm)?;
    }

    tracing::info!(
        bpm = config.bpm.get(),
        easing = %config.phase.easing,
        "configuration ready"
    );
    Ok(config)
}

/// Steps a manual clock through `duration_ms` and prints the beat values seen
/// at each step.
fn run_phase(
    config: &SketchConfig,
    duration_ms: f64,
    step_ms: f64,
    seed: &[f64],
) -> gvm_core::Result<()> {
    if !(step_ms.is_finite() && step_ms > 0.0) {
        return Err(GvmError::validation("step must be a positive number of milliseconds"));
    }
    if !(duration_ms.is_finite() && duration_ms >= 0.0) {
        return Err(GvmError::validation(
            "duration must be a non-negative number of milliseconds",
        ));
    }

    let clock = ManualClock::new();
    let mut beat = config.build_clock(clock.clone())?;
    let steps = (duration_ms / step_ms).floor() as u64;

    tracing::info!(steps, step_ms, "rendering phase table");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{:>10} {:>10} {:>10} {:>10}", "time_ms", "count", "phase", "noise")?;

    for step in 0..=steps {
        clock.set(step as f64 * step_ms);
        let count = beat.count();
        let phase = beat.phase();
        let noise = beat.leap_noise(seed)?;
        writeln!(
            out,
            "{:>10.1} {:>10.4} {:>10.4} {:>10.4}",
            clock.now_ms(),
            count,
            phase,
            noise
        )?;
    }

    Ok(())
}

fn run_easings(steps: usize) -> gvm_core::Result<()> {
    if steps == 0 {
        return Err(GvmError::validation("at least one step is required"));
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for easing in Easing::ALL {
        let samples: Vec<String> = (0..=steps)
            .map(|i| format!("{:.3}", easing.apply(i as f64 / steps as f64)))
            .collect();
        writeln!(out, "{:<14} {}", easing.name(), samples.join(" "))?;
    }

    Ok(())
}

/// Reads taps from stdin: every line is a tap, `q` quits.
fn run_tap(config: &SketchConfig) -> gvm_core::Result<()> {
    let mut beat = config.build_clock(SystemClock::start())?;
    tracing::info!(
        taps = config.tap.record_interval,
        "press enter to tap, `q` to quit"
    );

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        match beat.tap_tempo() {
            Ok(Some(bpm)) => println!("{bpm}"),
            Ok(None) => println!(
                "{}/{} taps",
                beat.tap_history().len(),
                config.tap.record_interval
            ),
            Err(err) if err.is_validation() => tracing::warn!(%err, "tap ignored"),
            Err(err) => return Err(err),
        }
    }

    tracing::info!(bpm = beat.bpm(), "final tempo");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Beat clock and leap noise toolkit for generative sketches",
    long_about = None
)]
struct Cli {
    /// JSON sketch configuration to load.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the configured tempo.
    #[arg(short, long, global = true)]
    bpm: Option<f64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print count, phase and leap noise over a simulated time span.
    Phase {
        /// Length of the simulated span.
        #[arg(long, default_value_t = 8_000.0)]
        duration_ms: f64,
        /// Clock advance between rows.
        #[arg(long, default_value_t = 250.0)]
        step_ms: f64,
        /// Cycle length in beats.
        #[arg(long)]
        cycle: Option<f64>,
        /// Ease window length in beats.
        #[arg(long)]
        ease: Option<f64>,
        /// Easing curve, e.g. `in-out-sine`.
        #[arg(long)]
        easing: Option<Easing>,
        /// The two noise seed coordinates.
        #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = vec![0.0, 0.0])]
        seed: Vec<f64>,
    },
    /// Sample every easing curve over [0, 1].
    Easings {
        #[arg(long, default_value_t = 10)]
        steps: usize,
    },
    /// Estimate a tempo from taps on stdin.
    Tap,
}
