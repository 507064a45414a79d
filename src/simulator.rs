// Random exploration: drive the monitor with randomly chosen operator commands
// and check every invariant after each step.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::clock::SimulationClock;
use crate::config::SimConfig;
use crate::constants::*;
use crate::invariants;
use crate::state::SimState;
use crate::types::*;

/// Command families the explorer chooses from.
#[derive(Debug, Clone, Copy)]
pub enum Action {
    Advance,
    SelectScenario,
    AdjustVital,
    Administer,
    SilenceAlarms,
    CodeBlue,
    StartNibp,
    SetAutoCycle,
}

const ALL_ACTIONS: &[Action] = &[
    Action::Advance,
    Action::SelectScenario,
    Action::AdjustVital,
    Action::Administer,
    Action::SilenceAlarms,
    Action::CodeBlue,
    Action::StartNibp,
    Action::SetAutoCycle,
];

const ADVANCE_CHOICES: &[Millis] = &[100, 250, 500, 1_000, 5_000, 15_000, 65_000];

const MANUAL_STEPS: &[(VitalField, f64)] = &[
    (VitalField::HeartRate, HR_MANUAL_STEP),
    (VitalField::SpO2, SPO2_MANUAL_STEP),
    (VitalField::Systolic, SYSTOLIC_MANUAL_STEP),
    (VitalField::RespiratoryRate, RR_MANUAL_STEP),
];

/// Resolve an action family into a concrete command.
fn pick_command(action: Action, rng: &mut impl Rng) -> Command {
    match action {
        Action::Advance => Command::Advance {
            ms: *ADVANCE_CHOICES.choose(rng).unwrap_or(&TICK_INTERVAL_MS),
        },
        Action::SelectScenario => Command::SelectScenario {
            scenario: *ALL_SCENARIOS.choose(rng).unwrap_or(&Scenario::Normal),
        },
        Action::AdjustVital => {
            let (field, step) = *MANUAL_STEPS
                .choose(rng)
                .unwrap_or(&(VitalField::HeartRate, HR_MANUAL_STEP));
            let magnitude = rng.gen_range(1..=10) as f64;
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let delta = sign * step * magnitude;
            Command::AdjustVital { field, delta }
        }
        Action::Administer => Command::Administer {
            intervention: *ALL_INTERVENTIONS.choose(rng).unwrap_or(&Intervention::Oxygen),
        },
        Action::SilenceAlarms => Command::SilenceAlarms,
        Action::CodeBlue => Command::CodeBlue,
        Action::StartNibp => Command::StartNibp,
        Action::SetAutoCycle => Command::SetAutoCycle {
            minutes: *NIBP_AUTO_CYCLE_CHOICES.choose(rng).unwrap_or(&0),
        },
    }
}

/// One random step: shuffle the action families and run the first command the
/// monitor accepts. Returns the command that ran, if any.
pub fn step<R: Rng>(clock: &mut SimulationClock<R>, rng: &mut impl Rng) -> Option<Command> {
    let mut actions: Vec<Action> = ALL_ACTIONS.to_vec();
    actions.shuffle(rng);

    for action in &actions {
        let command = pick_command(*action, rng);
        if clock.dispatch(&command) {
            return Some(command);
        }
    }
    None
}

/// Result of running one simulation trace.
pub struct TraceResult {
    pub steps: usize,
    pub violation: Option<(&'static str, usize, SimState)>,
    pub final_state: SimState,
}

/// Run a single trace for up to `max_steps`, checking invariants after each step.
pub fn run_trace(
    config: &SimConfig,
    max_steps: usize,
    rng: &mut impl Rng,
    verbose: bool,
) -> TraceResult {
    let monitor_rng = StdRng::seed_from_u64(rng.gen());
    let mut clock = SimulationClock::new(config.clone(), monitor_rng);

    if verbose {
        println!("[State 0] init");
        println!("{}\n", clock.state());
    }

    if let Err(violated) = invariants::check_invariants(clock.state()) {
        return TraceResult {
            steps: 0,
            violation: Some((violated, 0, clock.state().clone())),
            final_state: clock.state().clone(),
        };
    }

    for step_num in 1..=max_steps {
        let command = step(&mut clock, rng);

        if verbose {
            if let Some(command) = command {
                println!("[State {}] {}", step_num, command);
                println!("{}\n", clock.state());
            }
        }

        if let Err(violated) = invariants::check_invariants(clock.state()) {
            if verbose {
                println!("!!! INVARIANT VIOLATION: {} at step {}", violated, step_num);
            }
            return TraceResult {
                steps: step_num,
                violation: Some((violated, step_num, clock.state().clone())),
                final_state: clock.state().clone(),
            };
        }
    }

    clock.teardown();
    TraceResult {
        steps: max_steps,
        violation: None,
        final_state: clock.state().clone(),
    }
}

/// Run many traces from one seed.
pub fn run_simulation(
    config: &SimConfig,
    max_steps: usize,
    max_samples: usize,
    seed: u64,
    verbose: bool,
) -> SimulationResult {
    let mut rng = StdRng::seed_from_u64(seed);

    let start = std::time::Instant::now();
    let mut violation = None;

    for trace_num in 0..max_samples {
        let result = run_trace(config, max_steps, &mut rng, verbose && trace_num == 0);

        if let Some((inv_name, step, state)) = result.violation {
            violation = Some(ViolationInfo {
                invariant: inv_name,
                trace: trace_num,
                step,
                state,
            });
            break;
        }
    }

    let elapsed = start.elapsed();

    SimulationResult {
        max_steps,
        max_samples,
        seed,
        elapsed,
        violation,
    }
}

pub struct ViolationInfo {
    pub invariant: &'static str,
    pub trace: usize,
    pub step: usize,
    pub state: SimState,
}

pub struct SimulationResult {
    pub max_steps: usize,
    pub max_samples: usize,
    pub seed: u64,
    pub elapsed: std::time::Duration,
    pub violation: Option<ViolationInfo>,
}

impl SimulationResult {
    pub fn passed(&self) -> bool {
        self.violation.is_none()
    }
}

impl std::fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let traces_per_sec = self.max_samples as f64 / self.elapsed.as_secs_f64().max(1e-9);
        writeln!(f)?;
        match &self.violation {
            None => {
                writeln!(
                    f,
                    "[ok] No violation found ({:.0}ms at {:.0} traces/second).",
                    self.elapsed.as_millis(),
                    traces_per_sec,
                )?;
                writeln!(
                    f,
                    "Checked {} traces of {} steps each.",
                    self.max_samples, self.max_steps,
                )?;
            }
            Some(v) => {
                writeln!(
                    f,
                    "[VIOLATION] Invariant '{}' violated at trace {} step {}.",
                    v.invariant, v.trace, v.step,
                )?;
                writeln!(f, "State at violation:")?;
                writeln!(f, "{}", v.state)?;
            }
        }
        writeln!(f, "Seed: {} ", self.seed)
    }
}
