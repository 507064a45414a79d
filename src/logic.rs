// Pure reducers: every function takes a snapshot and returns the next one.
// The scheduler in `clock` is the only caller that threads state between them.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::alarms;
use crate::config::SimConfig;
use crate::constants::*;
use crate::nibp;
use crate::state::SimState;
use crate::types::*;

/// Result of a handler that may be refused.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub success: bool,
    pub new_state: SimState,
}

impl TransitionResult {
    fn ok(new_state: SimState) -> Self {
        TransitionResult {
            success: true,
            new_state,
        }
    }

    fn rejected(state: &SimState) -> Self {
        TransitionResult {
            success: false,
            new_state: state.clone(),
        }
    }
}

/// Per-tick effect of an intervention, bounded by its ceiling.
pub fn apply_intervention(vitals: &Vitals, intervention: Intervention) -> Vitals {
    match intervention {
        Intervention::Oxygen => {
            vitals.raised(VitalField::SpO2, OXYGEN_SPO2_PER_TICK, OXYGEN_SPO2_CEILING)
        }
        Intervention::Epinephrine => vitals
            .raised(VitalField::HeartRate, EPINEPHRINE_HR_PER_TICK, EPINEPHRINE_HR_CEILING)
            .raised(
                VitalField::Systolic,
                EPINEPHRINE_SYSTOLIC_PER_TICK,
                SYSTOLIC_INTERVENTION_CEILING,
            ),
        Intervention::Saline => vitals.raised(
            VitalField::Systolic,
            SALINE_SYSTOLIC_PER_TICK,
            SYSTOLIC_INTERVENTION_CEILING,
        ),
    }
}

/// Recompute alarms and log each new onset.
fn refresh_alarms(state: &mut SimState) {
    let next = alarms::evaluate_all(&state.vitals, &state.nibp.last_reading);
    for (vital, severity) in alarms::onsets(&state.alarms, &next) {
        if severity == Severity::Crisis {
            warn!(%vital, "crisis alarm");
        } else {
            debug!(%vital, "warning alarm");
        }
        state.log.push(state.now, format!("Alarm: {} {}", vital, severity));
    }
    state.alarms = next;
}

fn restart_waveforms<R: Rng + ?Sized>(cfg: &SimConfig, state: &mut SimState, rng: &mut R) {
    let tick_ms = cfg.simulation.tick_interval_ms;
    let irregular = state.scenario.is_irregular();
    let vitals = state.vitals;
    state.ecg.restart(&vitals, irregular, tick_ms, rng);
    state.pleth.restart(&vitals, irregular, tick_ms, rng);
    state.resp.restart(&vitals, irregular, tick_ms, rng);
}

/// One main tick, in order: intervention effect, NIBP auto-cycle, waveforms,
/// alarms. Re-arms itself one interval later.
pub fn tick<R: Rng + ?Sized>(cfg: &SimConfig, state: &SimState, rng: &mut R) -> SimState {
    let mut next = state.clone();

    if let Some(intervention) = state.intervention {
        next.vitals = apply_intervention(&next.vitals, intervention);
    }

    if nibp::auto_cycle_due(&next.nibp, next.now) {
        debug!(now = next.now, "NIBP auto-cycle due");
        next = start_nibp(cfg, &next, false).new_state;
    }

    let tick_ms = cfg.simulation.tick_interval_ms;
    let irregular = next.scenario.is_irregular();
    let vitals = next.vitals;
    next.ecg.advance(&vitals, irregular, tick_ms, rng);
    next.pleth.advance(&vitals, irregular, tick_ms, rng);
    next.resp.advance(&vitals, irregular, tick_ms, rng);

    refresh_alarms(&mut next);
    next.timers.tick = Some(next.now + tick_ms);
    next
}

/// Load a preset. Overwrites vitals and the NIBP reading, ends any
/// intervention, silence or cuff cycle, and drops every pending deadline
/// before restarting the main tick.
pub fn select_scenario<R: Rng + ?Sized>(
    cfg: &SimConfig,
    state: &SimState,
    scenario: Scenario,
    rng: &mut R,
) -> SimState {
    let def = scenario.definition();
    info!(scenario = scenario.key(), "scenario changed");

    let mut next = state.clone();
    next.scenario = ActiveScenario::Preset(scenario);
    next.vitals = def.vitals;
    next.nibp = NibpState {
        last_reading: def.vitals.bp,
        ..nibp::cancel(&state.nibp)
    };
    next.intervention = None;
    if next.alarms_silenced {
        next.alarms_silenced = false;
        next.log.push(next.now, "Alarms re-enabled.");
    }
    next.timers = Timers {
        tick: state
            .timers
            .tick
            .map(|_| next.now + cfg.simulation.tick_interval_ms),
        ..Timers::default()
    };
    restart_waveforms(cfg, &mut next, rng);
    next.log.push(next.now, format!("Scenario changed: {}", def.name));
    refresh_alarms(&mut next);
    next
}

pub fn code_blue<R: Rng + ?Sized>(cfg: &SimConfig, state: &SimState, rng: &mut R) -> SimState {
    let mut next = select_scenario(cfg, state, Scenario::CardiacArrest, rng);
    next.log.push(next.now, "CODE BLUE activated.");
    next
}

/// Manual nudge of one vital. The first nudge after a preset switches to the
/// custom scenario.
pub fn adjust_vital(state: &SimState, field: VitalField, delta: f64) -> SimState {
    let mut next = state.clone();
    if next.scenario != ActiveScenario::Custom {
        next.scenario = ActiveScenario::Custom;
        next.log
            .push(next.now, "Switched to Custom Scenario due to manual input.");
    }
    next.vitals = next.vitals.with_field(field, next.vitals.get(field) + delta);
    debug!(?field, value = next.vitals.get(field), "vital adjusted");
    refresh_alarms(&mut next);
    next
}

/// Start an intervention, replacing any active one and its deadline.
pub fn administer(cfg: &SimConfig, state: &SimState, intervention: Intervention) -> SimState {
    info!(%intervention, "intervention started");
    let mut next = state.clone();
    next.intervention = Some(intervention);
    next.timers.intervention_off = Some(next.now + cfg.interventions.duration_ms);
    next.log
        .push(next.now, format!("Intervention: Administer {}", intervention));
    next
}

pub fn end_intervention(state: &SimState) -> SimState {
    debug!(intervention = ?state.intervention, "intervention expired");
    let mut next = state.clone();
    next.intervention = None;
    next.timers.intervention_off = None;
    next
}

pub fn silence_alarms(cfg: &SimConfig, state: &SimState) -> SimState {
    let mut next = state.clone();
    next.alarms_silenced = true;
    next.timers.silence_off = Some(next.now + cfg.alarms.silence_ms);
    next.log.push(
        next.now,
        format!("Alarms silenced for {} seconds.", cfg.alarms.silence_ms / 1000),
    );
    next
}

pub fn end_silence(state: &SimState) -> SimState {
    let mut next = state.clone();
    next.alarms_silenced = false;
    next.timers.silence_off = None;
    next.log.push(next.now, "Alarms re-enabled.");
    next
}

/// Start a cuff cycle. Refused while one is in progress.
pub fn start_nibp(cfg: &SimConfig, state: &SimState, manual: bool) -> TransitionResult {
    let t = nibp::start(&cfg.nibp, &state.nibp, state.now);
    if !t.success {
        return TransitionResult::rejected(state);
    }
    let mut next = state.clone();
    next.nibp = t.state;
    next.timers.nibp_step = t.step_at;
    next.timers.nibp_settle = t.settle_at;
    if manual {
        next.log.push(next.now, "NIBP cycle started...");
    }
    TransitionResult::ok(next)
}

pub fn nibp_step(cfg: &SimConfig, state: &SimState) -> SimState {
    let t = nibp::step(&cfg.nibp, &state.nibp, state.now);
    let mut next = state.clone();
    next.nibp = t.state;
    next.timers.nibp_step = t.step_at;
    next.timers.nibp_settle = t.settle_at;
    next
}

/// Capture the reading from the live blood pressure at the moment the cuff settles.
pub fn nibp_settle<R: Rng + ?Sized>(cfg: &SimConfig, state: &SimState, rng: &mut R) -> SimState {
    let t = nibp::settle(&cfg.nibp, &state.nibp, &state.vitals.bp, state.now, rng);
    let mut next = state.clone();
    next.timers.nibp_step = None;
    next.timers.nibp_settle = None;
    if !t.success {
        return next;
    }
    next.nibp = t.state;
    next.log.push(
        next.now,
        format!("NIBP Reading: {} mmHg", next.nibp.last_reading),
    );
    refresh_alarms(&mut next);
    next
}

pub fn set_auto_cycle(cfg: &SimConfig, state: &SimState, minutes: u32) -> SimState {
    let mut next = state.clone();
    next.nibp = nibp::set_auto_cycle(&cfg.nibp, &state.nibp, minutes, state.now);
    let message = if minutes > 0 {
        format!("NIBP auto-cycle set to {} min.", minutes)
    } else {
        "NIBP auto-cycle turned OFF.".to_string()
    };
    next.log.push(next.now, message);
    next
}

/// Stop the monitor: every deadline is dropped, so nothing fires afterwards.
pub fn teardown(state: &SimState) -> SimState {
    info!(now = state.now, "simulator stopped");
    let mut next = state.clone();
    next.timers = Timers::default();
    next.intervention = None;
    next.alarms_silenced = false;
    next.nibp = nibp::cancel(&state.nibp);
    next
}

/// Fire the deadline `kind` due at `at`.
pub fn fire_timer<R: Rng + ?Sized>(
    cfg: &SimConfig,
    state: &SimState,
    kind: TimerKind,
    at: Millis,
    rng: &mut R,
) -> SimState {
    let mut due = state.clone();
    due.now = at;
    match kind {
        TimerKind::Tick => {
            due.timers.tick = None;
            tick(cfg, &due, rng)
        }
        TimerKind::NibpStep => {
            due.timers.nibp_step = None;
            nibp_step(cfg, &due)
        }
        TimerKind::NibpSettle => {
            due.timers.nibp_settle = None;
            nibp_settle(cfg, &due, rng)
        }
        TimerKind::InterventionOff => end_intervention(&due),
        TimerKind::SilenceOff => end_silence(&due),
    }
}

/// Apply a user command other than [`Command::Advance`], which the scheduler owns.
pub fn apply_command<R: Rng + ?Sized>(
    cfg: &SimConfig,
    state: &SimState,
    command: &Command,
    rng: &mut R,
) -> TransitionResult {
    match command {
        Command::Advance { .. } => TransitionResult::rejected(state),
        Command::SelectScenario { scenario } => {
            TransitionResult::ok(select_scenario(cfg, state, *scenario, rng))
        }
        Command::AdjustVital { field, delta } => {
            TransitionResult::ok(adjust_vital(state, *field, *delta))
        }
        Command::Administer { intervention } => {
            TransitionResult::ok(administer(cfg, state, *intervention))
        }
        Command::SilenceAlarms => TransitionResult::ok(silence_alarms(cfg, state)),
        Command::CodeBlue => TransitionResult::ok(code_blue(cfg, state, rng)),
        Command::StartNibp => start_nibp(cfg, state, true),
        Command::SetAutoCycle { minutes } => {
            TransitionResult::ok(set_auto_cycle(cfg, state, *minutes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::init_state;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (SimConfig, SimState, StdRng) {
        let cfg = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let state = init_state(&cfg, &mut rng);
        (cfg, state, rng)
    }

    fn run_ticks(cfg: &SimConfig, state: &SimState, n: usize, rng: &mut StdRng) -> SimState {
        let mut s = state.clone();
        for _ in 0..n {
            let at = s.timers.tick.unwrap();
            s = fire_timer(cfg, &s, TimerKind::Tick, at, rng);
        }
        s
    }

    #[test]
    fn init_state_is_quiet_and_logged() {
        let (_, state, _) = setup();
        assert_eq!(state.alarms, AlarmState::default());
        assert_eq!(state.log.len(), 1);
        assert_eq!(state.log.latest().unwrap().message, "Simulator started.");
        assert_eq!(state.timers.tick, Some(100));
        assert_eq!(state.ecg.buffer.len(), 150);
    }

    #[test]
    fn oxygen_raises_spo2_until_100() {
        let vitals = Scenario::Normal.definition().vitals;
        let once = apply_intervention(&vitals, Intervention::Oxygen);
        assert!((once.spo2 - 98.1).abs() < 1e-9);
        let mut v = vitals;
        for _ in 0..100 {
            v = apply_intervention(&v, Intervention::Oxygen);
        }
        assert_eq!(v.spo2, 100.0);
    }

    #[test]
    fn epinephrine_and_saline_effects() {
        let vitals = Scenario::Normal.definition().vitals;
        let epi = apply_intervention(&vitals, Intervention::Epinephrine);
        assert_eq!(epi.hr, 76.0);
        assert_eq!(epi.bp.systolic, 121.0);
        let saline = apply_intervention(&vitals, Intervention::Saline);
        assert_eq!(saline.hr, 75.0);
        assert!((saline.bp.systolic - 120.2).abs() < 1e-9);
        assert_eq!(saline.bp.diastolic, 80.0);
    }

    #[test]
    fn scenario_overwrites_vitals_and_clears_intervention() {
        let (cfg, state, mut rng) = setup();
        let state = administer(&cfg, &state, Intervention::Epinephrine);
        let state = run_ticks(&cfg, &state, 3, &mut rng);
        let next = select_scenario(&cfg, &state, Scenario::Tachycardia, &mut rng);

        assert_eq!(next.vitals.hr, 110.0);
        assert_eq!(next.vitals.spo2, 99.0);
        assert_eq!(next.vitals.bp.systolic, 125.0);
        assert_eq!(next.vitals.bp.diastolic, 82.0);
        assert_eq!(next.vitals.rr, 18.0);
        assert_eq!(next.intervention, None);
        assert_eq!(next.timers.intervention_off, None);
        assert_eq!(next.nibp.last_reading, next.vitals.bp);
        assert_eq!(next.timers.tick, Some(state.now + 100));
        assert_eq!(
            next.log.latest().unwrap().message,
            "Scenario changed: Sinus Tachycardia"
        );
    }

    #[test]
    fn scenario_change_cancels_cuff_and_silence() {
        let (cfg, state, mut rng) = setup();
        let state = start_nibp(&cfg, &state, true).new_state;
        let state = silence_alarms(&cfg, &state);
        let next = select_scenario(&cfg, &state, Scenario::Sepsis, &mut rng);
        assert_eq!(next.nibp.phase, NibpPhase::Idle);
        assert_eq!(next.nibp.cuff_pressure, 0);
        assert!(!next.alarms_silenced);
        assert_eq!(next.timers.nibp_step, None);
        assert_eq!(next.timers.silence_off, None);
    }

    #[test]
    fn sustained_warning_logs_once() {
        let (cfg, state, mut rng) = setup();
        // RR 26 is a warning
        let state = adjust_vital(&state, VitalField::RespiratoryRate, 10.0);
        assert_eq!(state.alarms.rr, Severity::Warning);
        let after = run_ticks(&cfg, &state, 5, &mut rng);
        assert_eq!(after.alarms.rr, Severity::Warning);
        assert_eq!(after.log.count_matching("Alarm: RR"), 1);
    }

    #[test]
    fn alarm_relogs_after_reset() {
        let (cfg, state, mut rng) = setup();
        let s = adjust_vital(&state, VitalField::HeartRate, 55.0); // 130 -> warning
        let s = run_ticks(&cfg, &s, 2, &mut rng);
        let s = adjust_vital(&s, VitalField::HeartRate, -55.0); // back to 75
        let s = run_ticks(&cfg, &s, 2, &mut rng);
        let s = adjust_vital(&s, VitalField::HeartRate, 70.0); // 145 -> crisis
        assert_eq!(s.alarms.hr, Severity::Crisis);
        assert_eq!(s.log.count_matching("Alarm: HR"), 2);
        assert_eq!(s.log.latest().unwrap().message, "Alarm: HR crisis");
    }

    #[test]
    fn manual_adjust_switches_to_custom_once() {
        let (_, state, _) = setup();
        let s = adjust_vital(&state, VitalField::SpO2, -1.0);
        let s = adjust_vital(&s, VitalField::SpO2, -1.0);
        assert_eq!(s.scenario, ActiveScenario::Custom);
        assert_eq!(s.vitals.spo2, 96.0);
        assert_eq!(s.log.count_matching("Switched to Custom"), 1);
    }

    #[test]
    fn manual_adjust_is_clamped() {
        let (_, state, _) = setup();
        let s = adjust_vital(&state, VitalField::SpO2, 50.0);
        assert_eq!(s.vitals.spo2, 100.0);
        let s = adjust_vital(&s, VitalField::RespiratoryRate, -100.0);
        assert_eq!(s.vitals.rr, 0.0);
    }

    #[test]
    fn vanishing_heart_rate_draws_flatline() {
        let (cfg, state, mut rng) = setup();
        let s = adjust_vital(&state, VitalField::HeartRate, -75.0);
        let s = adjust_vital(&s, VitalField::HeartRate, 1e-300);
        assert!(s.vitals.hr > 0.0);
        assert!(s.vitals.within_bounds());
        let s = run_ticks(&cfg, &s, 20, &mut rng);
        assert_eq!(s.ecg.cycle(), FLATLINE_PATTERN);
        assert_eq!(s.pleth.cycle(), FLATLINE_PATTERN);
        assert_eq!(s.ecg.buffer.len(), 150);
    }

    #[test]
    fn new_intervention_replaces_deadline() {
        let (cfg, state, mut rng) = setup();
        let s = administer(&cfg, &state, Intervention::Oxygen);
        assert_eq!(s.timers.intervention_off, Some(10_000));
        let s = run_ticks(&cfg, &s, 20, &mut rng);
        let s = administer(&cfg, &s, Intervention::Saline);
        assert_eq!(s.intervention, Some(Intervention::Saline));
        assert_eq!(s.timers.intervention_off, Some(s.now + 10_000));
    }

    #[test]
    fn tick_applies_intervention_before_alarms() {
        let (cfg, state, mut rng) = setup();
        let s = adjust_vital(&state, VitalField::SpO2, -8.05);
        assert_eq!(s.alarms.spo2, Severity::Warning);
        let s = administer(&cfg, &s, Intervention::Oxygen);
        let s = run_ticks(&cfg, &s, 1, &mut rng);
        assert!((s.vitals.spo2 - 90.05).abs() < 1e-9);
        assert_eq!(s.alarms.spo2, Severity::None);
    }

    #[test]
    fn code_blue_flatlines() {
        let (cfg, state, mut rng) = setup();
        let s = code_blue(&cfg, &state, &mut rng);
        assert_eq!(s.scenario, ActiveScenario::Preset(Scenario::CardiacArrest));
        assert_eq!(s.log.latest().unwrap().message, "CODE BLUE activated.");
        assert_eq!(s.alarms.hr, Severity::Crisis);
        assert_eq!(s.ecg.cycle(), FLATLINE_PATTERN);
    }

    #[test]
    fn second_manual_nibp_is_rejected() {
        let (cfg, state, _) = setup();
        let first = start_nibp(&cfg, &state, true);
        assert!(first.success);
        let second = start_nibp(&cfg, &first.new_state, true);
        assert!(!second.success);
        assert_eq!(second.new_state, first.new_state);
    }

    #[test]
    fn teardown_clears_every_deadline() {
        let (cfg, state, _) = setup();
        let s = administer(&cfg, &state, Intervention::Oxygen);
        let s = silence_alarms(&cfg, &s);
        let s = start_nibp(&cfg, &s, true).new_state;
        let s = teardown(&s);
        assert!(s.timers.is_empty());
        assert!(!s.is_running());
    }
}
