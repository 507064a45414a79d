// Integration tests: deterministic replay of operator command sequences.
// Each test replays a hardcoded command list on a seeded monitor and asserts the result.

use vitals_sim::constants::*;
use vitals_sim::mbt::{replay_final, replay_trace};
use vitals_sim::types::*;
use vitals_sim::SimConfig;

fn advance(ms: Millis) -> Command {
    Command::Advance { ms }
}

/// 1. Tachycardia preset: vitals overwritten wholesale, no alarms, intervention cleared.
#[test]
fn trace_tachycardia_scenario() {
    let commands = vec![
        Command::Administer {
            intervention: Intervention::Epinephrine,
        },
        advance(2_000),
        Command::SelectScenario {
            scenario: Scenario::Tachycardia,
        },
    ];

    let state = replay_final(1, &commands);

    assert_eq!(state.vitals.hr, 110.0);
    assert_eq!(state.vitals.spo2, 99.0);
    assert_eq!(state.vitals.bp.systolic, 125.0);
    assert_eq!(state.vitals.bp.diastolic, 82.0);
    assert_eq!(state.vitals.rr, 18.0);
    assert_eq!(state.intervention, None);
    assert_eq!(state.alarms, AlarmState::default());
}

/// 2. Manual NIBP: one reading after the cuff passes the ceiling and settles.
#[test]
fn trace_manual_nibp_cycle() {
    let commands = vec![
        Command::SelectScenario {
            scenario: Scenario::Hypotension,
        },
        Command::StartNibp,
        advance(1_000),
        advance(3_000),
    ];

    let trace = replay_trace(SimConfig::default(), 2, &commands);

    let started = &trace[1].1;
    assert_eq!(started.nibp.phase, NibpPhase::Cycling);
    assert_eq!(started.nibp.cuff_pressure, 50);
    assert_eq!(started.nibp_display(), "--/--");

    let mid = &trace[2].1;
    assert_eq!(mid.nibp.cuff_pressure, 90);

    let done = &trace[3].1;
    assert_eq!(done.nibp.phase, NibpPhase::Idle);
    assert_eq!(done.nibp.cuff_pressure, 0);
    assert_eq!(done.log.count_matching("NIBP Reading"), 1);
    assert!((done.nibp.last_reading.systolic - 85.0).abs() <= 2.0);
    assert!((done.nibp.last_reading.diastolic - 55.0).abs() <= 2.0);
}

/// 3. Hypotension: the NIBP alarm follows the cuff reading, not live pressure.
#[test]
fn trace_saline_bolus_resolves_after_next_reading() {
    let commands = vec![
        Command::SelectScenario {
            scenario: Scenario::Hypotension,
        },
        Command::Administer {
            intervention: Intervention::Saline,
        },
        advance(10_000),
    ];
    let trace = replay_trace(SimConfig::default(), 3, &commands);
    let after_bolus = &trace[2].1;
    // 99 ticks of +0.2 before the drug wears off
    assert!((after_bolus.vitals.bp.systolic - (85.0 + 99.0 * 0.2)).abs() < 1e-6);
    assert_eq!(after_bolus.intervention, None);
    // Reading still the scenario's 85 systolic: warning stays up.
    assert_eq!(after_bolus.alarms.nibp, Severity::Warning);

    let mut commands = commands;
    commands.push(Command::StartNibp);
    commands.push(advance(4_000));
    let state = replay_final(3, &commands);
    assert!(state.nibp.last_reading.systolic >= 102.0);
    assert_eq!(state.alarms.nibp, Severity::None);
}

/// 4. Respiratory distress: oxygen clears the SpO2 warning, which was logged once.
#[test]
fn trace_oxygen_clears_desaturation() {
    let commands = vec![
        Command::SelectScenario {
            scenario: Scenario::RespiratoryDistress,
        },
        advance(500),
        Command::Administer {
            intervention: Intervention::Oxygen,
        },
        advance(3_000),
    ];
    let trace = replay_trace(SimConfig::default(), 4, &commands);

    let desaturated = &trace[1].1;
    assert_eq!(desaturated.alarms.spo2, Severity::Warning);
    assert_eq!(desaturated.log.count_matching("Alarm: SpO2 warning"), 1);

    let treated = &trace[3].1;
    // 88 + 30 * 0.1
    assert!((treated.vitals.spo2 - 91.0).abs() < 1e-6);
    assert_eq!(treated.alarms.spo2, Severity::None);
    assert_eq!(treated.log.count_matching("Alarm: SpO2"), 1);
}

/// 5. Code blue flatlines every waveform and raises crisis alarms.
#[test]
fn trace_code_blue() {
    let commands = vec![Command::CodeBlue, advance(3_000)];
    let state = replay_final(5, &commands);

    assert_eq!(state.scenario, ActiveScenario::Preset(Scenario::CardiacArrest));
    assert_eq!(state.alarms.hr, Severity::Crisis);
    assert_eq!(state.alarms.spo2, Severity::Crisis);
    assert_eq!(state.alarms.rr, Severity::Crisis);
    assert_eq!(state.alarms.nibp, Severity::Crisis);
    for chan in state.channels() {
        assert_eq!(chan.cycle(), FLATLINE_PATTERN);
        // Last 30 samples are pure jitter around zero.
        let tail: Vec<f64> = chan.buffer.samples().skip(120).collect();
        assert!(tail.iter().all(|s| s.abs() <= chan.channel.noise()));
    }
    assert_eq!(state.log.count_matching("CODE BLUE activated."), 1);
}

/// 6. Silencing keeps alarms computed but inaudible, then re-enables after 60s.
#[test]
fn trace_silence_alarms() {
    let commands = vec![
        Command::SelectScenario {
            scenario: Scenario::Sepsis,
        },
        Command::SilenceAlarms,
        advance(30_000),
        advance(30_000),
    ];
    let trace = replay_trace(SimConfig::default(), 6, &commands);

    let silenced = &trace[2].1;
    assert_eq!(silenced.alarms.hr, Severity::Warning);
    assert!(!silenced.is_audible(MonitoredVital::HeartRate));

    let restored = &trace[3].1;
    assert!(restored.is_audible(MonitoredVital::HeartRate));
    assert_eq!(restored.log.count_matching("Alarms re-enabled."), 1);
}

/// 7. Auto-cycle every 5 minutes over 11 minutes gives three readings.
#[test]
fn trace_auto_cycle_readings() {
    let commands = vec![Command::SetAutoCycle { minutes: 5 }, advance(11 * 60_000)];
    let state = replay_final(7, &commands);
    // First at ~5s, then ~5m9s, then ~10m13s.
    assert_eq!(state.log.count_matching("NIBP Reading"), 3);
    assert_eq!(state.log.count_matching("NIBP cycle started"), 0);
}

/// 8. Long runs keep buffers at capacity and the log capped.
#[test]
fn trace_bounded_buffers() {
    let mut commands = Vec::new();
    for i in 0..250 {
        commands.push(Command::AdjustVital {
            field: VitalField::HeartRate,
            delta: if i % 2 == 0 { 60.0 } else { -60.0 },
        });
        commands.push(advance(200));
    }
    let state = replay_final(8, &commands);

    assert_eq!(state.scenario, ActiveScenario::Custom);
    assert_eq!(state.log.len(), EVENT_LOG_CAPACITY);
    for chan in state.channels() {
        assert_eq!(chan.buffer.len(), WAVEFORM_CAPACITY);
    }
}
