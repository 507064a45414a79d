use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use vitals_sim::alarms;
use vitals_sim::infusion::{self, InfusionOrder, InfusionTrainer};
use vitals_sim::invariants;
use vitals_sim::simulator;
use vitals_sim::types::*;
use vitals_sim::{SimConfig, SimulationClock};

#[derive(Parser)]
#[command(name = "vitals-sim", about = "Patient monitor and IV infusion trainer")]
struct Cli {
    /// TOML config overriding the built-in timings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario for a stretch of simulated time and print the monitor
    Run {
        #[arg(long, default_value = "normal")]
        scenario: String,
        #[arg(long, default_value_t = 30)]
        seconds: u64,
        #[arg(long)]
        seed: Option<u64>,
        /// NIBP auto-cycle interval in minutes
        #[arg(long)]
        auto_cycle: Option<u32>,
        /// Take a manual NIBP reading at start
        #[arg(long)]
        nibp: bool,
        #[arg(long, value_enum)]
        intervention: Option<InterventionArg>,
        #[arg(long)]
        json: bool,
    },
    /// Drive the monitor with random commands and check invariants
    Explore {
        #[arg(long, default_value_t = 20)]
        max_steps: usize,
        #[arg(long, default_value_t = 1000)]
        max_samples: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Compute drip rates and run an IV infusion to completion
    Infusion {
        #[arg(long, default_value_t = 1000)]
        volume: u32,
        #[arg(long, default_value_t = 480)]
        minutes: u32,
        #[arg(long, default_value_t = 15)]
        drop_factor: u32,
        #[arg(long)]
        json: bool,
    },
    /// List preset scenarios
    Scenarios,
}

#[derive(Clone, Copy, ValueEnum)]
enum InterventionArg {
    Oxygen,
    Epinephrine,
    Saline,
}

impl From<InterventionArg> for Intervention {
    fn from(arg: InterventionArg) -> Self {
        match arg {
            InterventionArg::Oxygen => Intervention::Oxygen,
            InterventionArg::Epinephrine => Intervention::Epinephrine,
            InterventionArg::Saline => Intervention::Saline,
        }
    }
}

#[derive(Serialize)]
struct InfusionReport {
    order: InfusionOrder,
    ml_per_hour: u32,
    drops_per_minute: u32,
    drip_interval_secs: Option<f64>,
    completed_after_secs: f64,
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        if let Ok(d) = "vitals_sim=info".parse() {
            filter = filter.add_directive(d);
        }
    }
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn seed_or_now(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    })
}

fn seconds_to_ms(seconds: u64) -> anyhow::Result<Millis> {
    seconds
        .checked_mul(1000)
        .with_context(|| format!("--seconds {} is too large", seconds))
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = SimConfig::load(cli.config.as_deref())
        .with_context(|| format!("loading config {:?}", cli.config))?;

    match cli.cmd {
        Commands::Run {
            scenario,
            seconds,
            seed,
            auto_cycle,
            nibp,
            intervention,
            json,
        } => {
            let scenario: Scenario = scenario.parse()?;
            let duration_ms = seconds_to_ms(seconds)?;
            let seed = seed_or_now(seed);
            let mut clock = SimulationClock::new(config, StdRng::seed_from_u64(seed));

            if scenario != Scenario::Normal {
                clock.dispatch(&Command::SelectScenario { scenario });
            }
            if let Some(minutes) = auto_cycle {
                clock.dispatch(&Command::SetAutoCycle { minutes });
            }
            if nibp {
                clock.dispatch(&Command::StartNibp);
            }
            if let Some(intervention) = intervention {
                clock.dispatch(&Command::Administer {
                    intervention: intervention.into(),
                });
            }
            clock.advance(duration_ms);

            let state = clock.into_state();
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
                return Ok(());
            }

            println!("Patient Monitor ({} s simulated, seed {})", seconds, seed);
            println!("======================");
            println!("{}", state);
            println!();
            for vital in MONITORED_VITALS {
                println!(
                    "  {:<5} limits {:<8} {}{}",
                    vital.to_string(),
                    alarms::limits_label(*vital),
                    state.alarms.get(*vital),
                    if state.is_audible(*vital) { " (sounding)" } else { "" },
                );
            }
            println!();
            println!("Event log (newest first):");
            for entry in state.log.iter().take(15) {
                println!("  [{:>7.1}s] {}", entry.at as f64 / 1000.0, entry.message);
            }
            if let Err(violated) = invariants::check_invariants(&state) {
                println!("!!! INVARIANT VIOLATION: {}", violated);
            }
        }
        Commands::Explore {
            max_steps,
            max_samples,
            seed,
            verbose,
        } => {
            let seed = seed_or_now(seed);
            println!("Vitals Monitor Explorer");
            println!("=======================");
            println!(
                "Running {} traces of {} steps each (seed: {})",
                max_samples, max_steps, seed
            );
            if verbose {
                println!("Verbose mode: showing first trace\n");
            }

            println!("Checking invariants:");
            for (name, _) in invariants::ALL_INVARIANTS {
                println!("  - {}", name);
            }

            let result = simulator::run_simulation(&config, max_steps, max_samples, seed, verbose);
            println!("{}", result);
            if !result.passed() {
                anyhow::bail!("invariant violated");
            }
        }
        Commands::Infusion {
            volume,
            minutes,
            drop_factor,
            json,
        } => {
            let order = InfusionOrder {
                volume_ml: volume,
                minutes,
                drop_factor,
            };
            let mut trainer = InfusionTrainer::new(config.infusion.clone(), order)?;
            let rates = trainer.rates();
            let elapsed_ms = trainer.run_to_completion();
            let report = InfusionReport {
                order,
                ml_per_hour: rates.ml_per_hour,
                drops_per_minute: rates.drops_per_minute,
                drip_interval_secs: infusion::drip_interval_secs(&rates),
                completed_after_secs: elapsed_ms as f64 / 1000.0,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("IV Infusion");
                println!("===========");
                println!(
                    "  order:      {} mL over {} min ({} gtt/mL)",
                    volume, minutes, drop_factor
                );
                println!("  rate:       {} mL/h", report.ml_per_hour);
                println!("  drip rate:  {} gtt/min", report.drops_per_minute);
                if let Some(secs) = report.drip_interval_secs {
                    println!("  one drop every {:.2} s", secs);
                }
                println!(
                    "  complete after {:.1} min, then KVO at {} mL/h",
                    report.completed_after_secs / 60.0,
                    trainer.rates().ml_per_hour
                );
            }
        }
        Commands::Scenarios => {
            for scenario in ALL_SCENARIOS {
                let v = scenario.definition().vitals;
                println!(
                    "{:<22} {:<22} HR {:>3.0}  SpO2 {:>3.0}  BP {:>7}  RR {:>2.0}  T {:.1}",
                    scenario.key(),
                    scenario.definition().name,
                    v.hr,
                    v.spo2,
                    v.bp.to_string(),
                    v.rr,
                    v.temp
                );
            }
            println!();
            println!("Practice infusions:");
            for practice in infusion::PRACTICE_SCENARIOS {
                println!("  {}", practice.label);
            }
        }
    }

    Ok(())
}
