// Types: vitals, scenarios, alarms, NIBP and the command labels that drive the monitor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::SimError;

/// Simulated time in milliseconds since the monitor was started.
pub type Millis = u64;

/// Arterial blood pressure in mmHg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
}

/// Live patient vitals. Every field is kept inside its hard bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub hr: f64,
    pub spo2: f64,
    pub bp: BloodPressure,
    pub rr: f64,
    pub temp: f64,
}

/// Field path into [`Vitals`] used by structured updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VitalField {
    HeartRate,
    SpO2,
    Systolic,
    Diastolic,
    RespiratoryRate,
    Temperature,
}

impl VitalField {
    /// Hard physiological bounds `(min, max)` for this field.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            VitalField::HeartRate => HR_BOUNDS,
            VitalField::SpO2 => SPO2_BOUNDS,
            VitalField::Systolic => SYSTOLIC_BOUNDS,
            VitalField::Diastolic => DIASTOLIC_BOUNDS,
            VitalField::RespiratoryRate => RR_BOUNDS,
            VitalField::Temperature => TEMP_BOUNDS,
        }
    }

    pub fn clamp(self, value: f64) -> f64 {
        let (min, max) = self.bounds();
        value.clamp(min, max)
    }
}

impl Vitals {
    pub fn get(&self, field: VitalField) -> f64 {
        match field {
            VitalField::HeartRate => self.hr,
            VitalField::SpO2 => self.spo2,
            VitalField::Systolic => self.bp.systolic,
            VitalField::Diastolic => self.bp.diastolic,
            VitalField::RespiratoryRate => self.rr,
            VitalField::Temperature => self.temp,
        }
    }

    /// Returns a copy with `field` set to `value`, clamped to the field's bounds.
    pub fn with_field(&self, field: VitalField, value: f64) -> Vitals {
        let value = field.clamp(value);
        let mut next = *self;
        match field {
            VitalField::HeartRate => next.hr = value,
            VitalField::SpO2 => next.spo2 = value,
            VitalField::Systolic => next.bp.systolic = value,
            VitalField::Diastolic => next.bp.diastolic = value,
            VitalField::RespiratoryRate => next.rr = value,
            VitalField::Temperature => next.temp = value,
        }
        next
    }

    /// Like [`Vitals::with_field`] but never exceeds `ceiling` when raising.
    pub fn raised(&self, field: VitalField, delta: f64, ceiling: f64) -> Vitals {
        let current = self.get(field);
        self.with_field(field, (current + delta).min(ceiling.max(current)))
    }

    pub fn within_bounds(&self) -> bool {
        ALL_VITAL_FIELDS.iter().all(|field| {
            let (min, max) = field.bounds();
            let value = self.get(*field);
            value >= min && value <= max
        })
    }
}

pub const ALL_VITAL_FIELDS: &[VitalField] = &[
    VitalField::HeartRate,
    VitalField::SpO2,
    VitalField::Systolic,
    VitalField::Diastolic,
    VitalField::RespiratoryRate,
    VitalField::Temperature,
];

/// Preset clinical scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    Normal,
    Tachycardia,
    Bradycardia,
    AtrialFibrillation,
    Hypotension,
    RespiratoryDistress,
    Sepsis,
    CardiacArrest,
}

pub const ALL_SCENARIOS: &[Scenario] = &[
    Scenario::Normal,
    Scenario::Tachycardia,
    Scenario::Bradycardia,
    Scenario::AtrialFibrillation,
    Scenario::Hypotension,
    Scenario::RespiratoryDistress,
    Scenario::Sepsis,
    Scenario::CardiacArrest,
];

impl Scenario {
    pub fn key(self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::Tachycardia => "tachycardia",
            Scenario::Bradycardia => "bradycardia",
            Scenario::AtrialFibrillation => "atrial-fibrillation",
            Scenario::Hypotension => "hypotension",
            Scenario::RespiratoryDistress => "respiratory-distress",
            Scenario::Sepsis => "sepsis",
            Scenario::CardiacArrest => "cardiac-arrest",
        }
    }

    pub fn definition(self) -> &'static ScenarioDefinition {
        scenario_definition(self)
    }

    /// Rhythms with irregular inter-beat timing.
    pub fn is_irregular(self) -> bool {
        self == Scenario::AtrialFibrillation
    }
}

impl FromStr for Scenario {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ALL_SCENARIOS
            .iter()
            .copied()
            .find(|scenario| {
                scenario.key() == wanted || scenario.key().replace('-', "") == wanted
            })
            .ok_or_else(|| SimError::UnknownScenario(s.to_string()))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.definition().name)
    }
}

/// Immutable named bundle of target vitals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioDefinition {
    pub name: &'static str,
    pub vitals: Vitals,
}

/// Which scenario the monitor is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveScenario {
    Preset(Scenario),
    /// Vitals were adjusted by hand after a preset was loaded.
    Custom,
}

impl ActiveScenario {
    pub fn is_irregular(self) -> bool {
        matches!(self, ActiveScenario::Preset(s) if s.is_irregular())
    }
}

impl fmt::Display for ActiveScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveScenario::Preset(s) => write!(f, "{}", s),
            ActiveScenario::Custom => write!(f, "Custom Scenario"),
        }
    }
}

/// Alarm classification, ordered by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    None,
    Warning,
    Crisis,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "none"),
            Severity::Warning => write!(f, "warning"),
            Severity::Crisis => write!(f, "crisis"),
        }
    }
}

/// Vitals that carry alarm limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitoredVital {
    HeartRate,
    SpO2,
    Nibp,
    RespiratoryRate,
}

pub const MONITORED_VITALS: &[MonitoredVital] = &[
    MonitoredVital::HeartRate,
    MonitoredVital::SpO2,
    MonitoredVital::Nibp,
    MonitoredVital::RespiratoryRate,
];

impl fmt::Display for MonitoredVital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitoredVital::HeartRate => write!(f, "HR"),
            MonitoredVital::SpO2 => write!(f, "SpO2"),
            MonitoredVital::Nibp => write!(f, "NIBP"),
            MonitoredVital::RespiratoryRate => write!(f, "RR"),
        }
    }
}

/// Alarm limits for one vital. SpO2 has no upper limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBand {
    pub low_crisis: f64,
    pub low_warning: f64,
    pub high_warning: Option<f64>,
    pub high_crisis: Option<f64>,
}

/// Current severity per monitored vital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlarmState {
    pub hr: Severity,
    pub spo2: Severity,
    pub nibp: Severity,
    pub rr: Severity,
}

impl AlarmState {
    pub fn get(&self, vital: MonitoredVital) -> Severity {
        match vital {
            MonitoredVital::HeartRate => self.hr,
            MonitoredVital::SpO2 => self.spo2,
            MonitoredVital::Nibp => self.nibp,
            MonitoredVital::RespiratoryRate => self.rr,
        }
    }

    pub fn highest(&self) -> Severity {
        MONITORED_VITALS
            .iter()
            .map(|v| self.get(*v))
            .max()
            .unwrap_or_default()
    }
}

/// Timed clinical interventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intervention {
    Oxygen,
    Epinephrine,
    Saline,
}

pub const ALL_INTERVENTIONS: &[Intervention] = &[
    Intervention::Oxygen,
    Intervention::Epinephrine,
    Intervention::Saline,
];

impl fmt::Display for Intervention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intervention::Oxygen => write!(f, "oxygen"),
            Intervention::Epinephrine => write!(f, "epinephrine"),
            Intervention::Saline => write!(f, "saline"),
        }
    }
}

/// NIBP cuff phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NibpPhase {
    #[default]
    Idle,
    /// Cuff inflating in fixed steps.
    Cycling,
    /// Ceiling passed, waiting for the reading.
    Settling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NibpState {
    pub phase: NibpPhase,
    pub last_reading: BloodPressure,
    pub cuff_pressure: u32,
    /// Minutes between automatic cycles; 0 disables auto-cycling.
    pub auto_cycle_minutes: u32,
    pub next_cycle_at: Option<Millis>,
}

impl NibpState {
    pub fn new(last_reading: BloodPressure) -> Self {
        NibpState {
            phase: NibpPhase::Idle,
            last_reading,
            cuff_pressure: 0,
            auto_cycle_minutes: 0,
            next_cycle_at: None,
        }
    }

    pub fn cycling(&self) -> bool {
        self.phase != NibpPhase::Idle
    }
}

/// Pending one-shot and periodic deadlines owned by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timers {
    pub tick: Option<Millis>,
    pub nibp_step: Option<Millis>,
    pub nibp_settle: Option<Millis>,
    pub intervention_off: Option<Millis>,
    pub silence_off: Option<Millis>,
}

/// Deadline kinds, in the order they fire when due at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerKind {
    InterventionOff,
    SilenceOff,
    NibpSettle,
    NibpStep,
    Tick,
}

impl Timers {
    pub fn get(&self, kind: TimerKind) -> Option<Millis> {
        match kind {
            TimerKind::InterventionOff => self.intervention_off,
            TimerKind::SilenceOff => self.silence_off,
            TimerKind::NibpSettle => self.nibp_settle,
            TimerKind::NibpStep => self.nibp_step,
            TimerKind::Tick => self.tick,
        }
    }

    /// Earliest pending deadline, ties broken by [`TimerKind`] order.
    pub fn next_due(&self) -> Option<(Millis, TimerKind)> {
        [
            TimerKind::InterventionOff,
            TimerKind::SilenceOff,
            TimerKind::NibpSettle,
            TimerKind::NibpStep,
            TimerKind::Tick,
        ]
        .iter()
        .filter_map(|kind| self.get(*kind).map(|at| (at, *kind)))
        .min()
    }

    pub fn is_empty(&self) -> bool {
        *self == Timers::default()
    }
}

/// User-triggered operations, labelled for deterministic replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Let simulated time pass.
    Advance { ms: Millis },
    SelectScenario { scenario: Scenario },
    AdjustVital { field: VitalField, delta: f64 },
    Administer { intervention: Intervention },
    SilenceAlarms,
    CodeBlue,
    StartNibp,
    SetAutoCycle { minutes: u32 },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Advance { ms } => write!(f, "Advance({}ms)", ms),
            Command::SelectScenario { scenario } => write!(f, "SelectScenario({})", scenario.key()),
            Command::AdjustVital { field, delta } => write!(f, "AdjustVital({:?}, {:+})", field, delta),
            Command::Administer { intervention } => write!(f, "Administer({})", intervention),
            Command::SilenceAlarms => write!(f, "SilenceAlarms"),
            Command::CodeBlue => write!(f, "CodeBlue"),
            Command::StartNibp => write!(f, "StartNibp"),
            Command::SetAutoCycle { minutes } => write!(f, "SetAutoCycle({})", minutes),
        }
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}/{:.0}", self.systolic, self.diastolic)
    }
}

impl fmt::Display for Vitals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  hr:    {:.0} /min", self.hr)?;
        writeln!(f, "  spo2:  {:.0} %", self.spo2)?;
        writeln!(f, "  bp:    {} mmHg", self.bp)?;
        writeln!(f, "  rr:    {:.0} /min", self.rr)?;
        write!(f, "  temp:  {:.1} C", self.temp)
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HR={} SpO2={} NIBP={} RR={}",
            self.hr, self.spo2, self.nibp, self.rr
        )
    }
}
