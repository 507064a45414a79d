// Constants: scenario table, alarm limits, waveform patterns and default timings.

use crate::types::{BloodPressure, Scenario, ScenarioDefinition, ThresholdBand, Vitals};

// Scheduler timings (ms)
pub const TICK_INTERVAL_MS: u64 = 100;
pub const NIBP_STEP_INTERVAL_MS: u64 = 500;
pub const NIBP_SETTLE_DELAY_MS: u64 = 1_000;
pub const NIBP_FIRST_AUTO_DELAY_MS: u64 = 5_000;
pub const INTERVENTION_DURATION_MS: u64 = 10_000;
pub const ALARM_SILENCE_MS: u64 = 60_000;
pub const MS_PER_MINUTE: u64 = 60_000;

// Display buffers
pub const WAVEFORM_CAPACITY: usize = 150;
pub const EVENT_LOG_CAPACITY: usize = 100;

// NIBP cuff (mmHg)
pub const NIBP_INITIAL_CUFF: u32 = 50;
pub const NIBP_CUFF_STEP: u32 = 20;
pub const NIBP_CUFF_CEILING: u32 = 160;
pub const NIBP_READING_NOISE: f64 = 2.0;
pub const NIBP_AUTO_CYCLE_CHOICES: &[u32] = &[5, 10, 15, 0];

// Hard bounds (min, max)
pub const HR_BOUNDS: (f64, f64) = (0.0, 250.0);
pub const SPO2_BOUNDS: (f64, f64) = (0.0, 100.0);
pub const SYSTOLIC_BOUNDS: (f64, f64) = (0.0, 300.0);
pub const DIASTOLIC_BOUNDS: (f64, f64) = (0.0, 200.0);
pub const RR_BOUNDS: (f64, f64) = (0.0, 60.0);
pub const TEMP_BOUNDS: (f64, f64) = (25.0, 45.0);

// Per-tick intervention effects and their ceilings
pub const OXYGEN_SPO2_PER_TICK: f64 = 0.1;
pub const OXYGEN_SPO2_CEILING: f64 = 100.0;
pub const EPINEPHRINE_HR_PER_TICK: f64 = 1.0;
pub const EPINEPHRINE_HR_CEILING: f64 = 200.0;
pub const EPINEPHRINE_SYSTOLIC_PER_TICK: f64 = 1.0;
pub const SALINE_SYSTOLIC_PER_TICK: f64 = 0.2;
pub const SYSTOLIC_INTERVENTION_CEILING: f64 = 220.0;

// Manual control step sizes
pub const HR_MANUAL_STEP: f64 = 5.0;
pub const SPO2_MANUAL_STEP: f64 = 1.0;
pub const SYSTOLIC_MANUAL_STEP: f64 = 5.0;
pub const RR_MANUAL_STEP: f64 = 1.0;

// Alarm limits
pub const HR_LIMITS: ThresholdBand = ThresholdBand {
    low_crisis: 40.0,
    low_warning: 50.0,
    high_warning: Some(120.0),
    high_crisis: Some(140.0),
};
pub const SPO2_LIMITS: ThresholdBand = ThresholdBand {
    low_crisis: 85.0,
    low_warning: 90.0,
    high_warning: None,
    high_crisis: None,
};
pub const SYSTOLIC_LIMITS: ThresholdBand = ThresholdBand {
    low_crisis: 70.0,
    low_warning: 90.0,
    high_warning: Some(160.0),
    high_crisis: Some(180.0),
};
pub const RR_LIMITS: ThresholdBand = ThresholdBand {
    low_crisis: 8.0,
    low_warning: 12.0,
    high_warning: Some(24.0),
    high_crisis: Some(30.0),
};

// Waveform patterns: one physiological cycle of relative amplitudes
pub const ECG_PATTERN: &[f64] = &[
    0.0, 0.0, 0.0, 0.1, 0.3, 0.1, 0.0, -0.2, -0.4, 2.5, -1.0, 0.2, 0.4, 0.2, 0.0,
];
pub const PLETH_PATTERN: &[f64] = &[
    0.8, 0.9, 1.0, 0.95, 0.8, 0.6, 0.4, 0.2, 0.1, 0.2, 0.4, 0.6, 0.7,
];
pub const RESP_PATTERN: &[f64] = &[
    0.0, 0.2, 0.5, 0.8, 1.0, 0.8, 0.5, 0.2, 0.0, -0.1, -0.2, -0.1,
];
pub const FLATLINE_PATTERN: &[f64] = &[0.0; 10];
// Below one cycle per minute a channel draws flatline
pub const MIN_WAVEFORM_RATE: f64 = 1.0;
pub const ECG_BASELINE: f64 = 0.0;
pub const PLETH_BASELINE: f64 = 0.0;
pub const RESP_BASELINE: f64 = -0.1;
pub const ECG_NOISE: f64 = 0.05;
pub const PLETH_NOISE: f64 = 0.02;
pub const RESP_NOISE: f64 = 0.01;

// Irregular rhythm cycle-length multiplier, [min, max)
pub const IRREGULAR_MIN: f64 = 0.7;
pub const IRREGULAR_MAX: f64 = 1.3;

const fn vitals(hr: f64, spo2: f64, systolic: f64, diastolic: f64, rr: f64, temp: f64) -> Vitals {
    Vitals {
        hr,
        spo2,
        bp: BloodPressure {
            systolic,
            diastolic,
        },
        rr,
        temp,
    }
}

const NORMAL: ScenarioDefinition = ScenarioDefinition {
    name: "Normal Sinus Rhythm",
    vitals: vitals(75.0, 98.0, 120.0, 80.0, 16.0, 37.0),
};
const TACHYCARDIA: ScenarioDefinition = ScenarioDefinition {
    name: "Sinus Tachycardia",
    vitals: vitals(110.0, 99.0, 125.0, 82.0, 18.0, 37.1),
};
const BRADYCARDIA: ScenarioDefinition = ScenarioDefinition {
    name: "Sinus Bradycardia",
    vitals: vitals(50.0, 97.0, 110.0, 75.0, 14.0, 36.9),
};
const ATRIAL_FIBRILLATION: ScenarioDefinition = ScenarioDefinition {
    name: "Atrial Fibrillation",
    vitals: vitals(140.0, 95.0, 115.0, 78.0, 22.0, 37.0),
};
const HYPOTENSION: ScenarioDefinition = ScenarioDefinition {
    name: "Hypotension",
    vitals: vitals(105.0, 96.0, 85.0, 55.0, 20.0, 36.8),
};
const RESPIRATORY_DISTRESS: ScenarioDefinition = ScenarioDefinition {
    name: "Respiratory Distress",
    vitals: vitals(120.0, 88.0, 140.0, 90.0, 28.0, 37.5),
};
const SEPSIS: ScenarioDefinition = ScenarioDefinition {
    name: "Sepsis",
    vitals: vitals(125.0, 93.0, 88.0, 50.0, 26.0, 38.5),
};
const CARDIAC_ARREST: ScenarioDefinition = ScenarioDefinition {
    name: "Cardiac Arrest",
    vitals: vitals(0.0, 0.0, 0.0, 0.0, 0.0, 36.0),
};

pub fn scenario_definition(scenario: Scenario) -> &'static ScenarioDefinition {
    match scenario {
        Scenario::Normal => &NORMAL,
        Scenario::Tachycardia => &TACHYCARDIA,
        Scenario::Bradycardia => &BRADYCARDIA,
        Scenario::AtrialFibrillation => &ATRIAL_FIBRILLATION,
        Scenario::Hypotension => &HYPOTENSION,
        Scenario::RespiratoryDistress => &RESPIRATORY_DISTRESS,
        Scenario::Sepsis => &SEPSIS,
        Scenario::CardiacArrest => &CARDIAC_ARREST,
    }
}

// IV infusion trainer
pub const INFUSION_TICK_INTERVAL_MS: u64 = 250;
pub const KVO_RATE_ML_PER_HOUR: f64 = 20.0;
pub const DROP_FACTORS: &[u32] = &[10, 15, 20, 60];
pub const INFUSION_VOLUME_RANGE: (u32, u32) = (1, 5_000);
pub const INFUSION_MINUTES_RANGE: (u32, u32) = (1, 1_440);
