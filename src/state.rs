// Full monitor state: one immutable snapshot per step.

use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::alarms;
use crate::config::SimConfig;
use crate::event_log::EventLog;
use crate::types::*;
use crate::waveform::{Channel, WaveformChannel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimState {
    pub now: Millis,
    pub scenario: ActiveScenario,
    pub vitals: Vitals,
    pub alarms: AlarmState,
    pub alarms_silenced: bool,
    pub intervention: Option<Intervention>,
    pub nibp: NibpState,
    pub ecg: WaveformChannel,
    pub pleth: WaveformChannel,
    pub resp: WaveformChannel,
    pub log: EventLog,
    pub timers: Timers,
}

/// Fresh monitor on the normal scenario. The main tick is armed one interval out.
pub fn init_state<R: Rng + ?Sized>(cfg: &SimConfig, rng: &mut R) -> SimState {
    let scenario = Scenario::Normal;
    let vitals = scenario.definition().vitals;
    let tick_ms = cfg.simulation.tick_interval_ms;
    let capacity = cfg.simulation.waveform_capacity;
    let irregular = scenario.is_irregular();

    let mut log = EventLog::new(cfg.simulation.event_log_capacity);
    log.push(0, "Simulator started.");

    SimState {
        now: 0,
        scenario: ActiveScenario::Preset(scenario),
        vitals,
        alarms: alarms::evaluate_all(&vitals, &vitals.bp),
        alarms_silenced: false,
        intervention: None,
        nibp: NibpState::new(vitals.bp),
        ecg: WaveformChannel::new(Channel::Ecg, &vitals, irregular, tick_ms, capacity, rng),
        pleth: WaveformChannel::new(Channel::Pleth, &vitals, irregular, tick_ms, capacity, rng),
        resp: WaveformChannel::new(Channel::Resp, &vitals, irregular, tick_ms, capacity, rng),
        log,
        timers: Timers {
            tick: Some(tick_ms),
            ..Timers::default()
        },
    }
}

impl SimState {
    pub fn channel(&self, channel: Channel) -> &WaveformChannel {
        match channel {
            Channel::Ecg => &self.ecg,
            Channel::Pleth => &self.pleth,
            Channel::Resp => &self.resp,
        }
    }

    pub fn channels(&self) -> [&WaveformChannel; 3] {
        [&self.ecg, &self.pleth, &self.resp]
    }

    /// An alarm sounds unless it is `None` or alarms are silenced.
    pub fn is_audible(&self, vital: MonitoredVital) -> bool {
        !self.alarms_silenced && self.alarms.get(vital) != Severity::None
    }

    /// NIBP readout: dashes while the cuff is busy.
    pub fn nibp_display(&self) -> String {
        if self.nibp.cycling() {
            "--/--".to_string()
        } else {
            self.nibp.last_reading.to_string()
        }
    }

    pub fn is_running(&self) -> bool {
        self.timers.tick.is_some()
    }
}

impl fmt::Display for SimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  time:         {:.1} s", self.now as f64 / 1000.0)?;
        writeln!(f, "  scenario:     {}", self.scenario)?;
        writeln!(f, "{}", self.vitals)?;
        writeln!(f, "  nibp:         {} mmHg (cuff {} mmHg, {:?})", self.nibp_display(), self.nibp.cuff_pressure, self.nibp.phase)?;
        writeln!(f, "  alarms:       {}{}", self.alarms, if self.alarms_silenced { " (silenced)" } else { "" })?;
        match self.intervention {
            Some(i) => writeln!(f, "  intervention: {}", i)?,
            None => writeln!(f, "  intervention: none")?,
        }
        write!(f, "  events:       {}", self.log.len())
    }
}
