// Alarm evaluation: threshold bands to severity, plus edge detection for the event log.

use crate::constants::*;
use crate::types::*;

/// Classify `value` against `band`.
///
/// Crisis bounds are inclusive, warning bounds exclusive: anything inside
/// `[low_warning, high_warning]` is `None`, and a value sitting exactly on a
/// crisis bound is already `Crisis`.
pub fn evaluate(value: f64, band: &ThresholdBand) -> Severity {
    let high_crisis = band.high_crisis.map_or(false, |limit| value >= limit);
    let high_warning = band.high_warning.map_or(false, |limit| value > limit);

    if value <= band.low_crisis || high_crisis {
        Severity::Crisis
    } else if value < band.low_warning || high_warning {
        Severity::Warning
    } else {
        Severity::None
    }
}

pub fn band_for(vital: MonitoredVital) -> &'static ThresholdBand {
    match vital {
        MonitoredVital::HeartRate => &HR_LIMITS,
        MonitoredVital::SpO2 => &SPO2_LIMITS,
        MonitoredVital::Nibp => &SYSTOLIC_LIMITS,
        MonitoredVital::RespiratoryRate => &RR_LIMITS,
    }
}

/// Full alarm picture. Blood pressure is judged on the last cuff reading, since
/// it is not measured continuously.
pub fn evaluate_all(vitals: &Vitals, nibp_reading: &BloodPressure) -> AlarmState {
    AlarmState {
        hr: evaluate(vitals.hr, band_for(MonitoredVital::HeartRate)),
        spo2: evaluate(vitals.spo2, band_for(MonitoredVital::SpO2)),
        nibp: evaluate(nibp_reading.systolic, band_for(MonitoredVital::Nibp)),
        rr: evaluate(vitals.rr, band_for(MonitoredVital::RespiratoryRate)),
    }
}

/// Vitals whose alarm went from `None` to `Warning` or `Crisis`.
/// Escalation from `Warning` to `Crisis` is not a new onset.
pub fn onsets(prev: &AlarmState, next: &AlarmState) -> Vec<(MonitoredVital, Severity)> {
    MONITORED_VITALS
        .iter()
        .filter(|vital| prev.get(**vital) == Severity::None && next.get(**vital) != Severity::None)
        .map(|vital| (*vital, next.get(*vital)))
        .collect()
}

/// Human-readable limit range shown next to a numeric readout.
pub fn limits_label(vital: MonitoredVital) -> String {
    let band = band_for(vital);
    match band.high_warning {
        Some(high) => format!("{:.0}-{:.0}", band.low_warning, high),
        None => format!(">{:.0}", band.low_warning),
    }
}
