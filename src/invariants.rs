// Safety invariants checked after every step of replay and random exploration.

use crate::alarms;
use crate::state::SimState;
use crate::types::*;

/// Every vital sits inside its hard bounds.
pub fn vitals_within_bounds(state: &SimState) -> bool {
    state.vitals.within_bounds()
}

/// Waveform buffers never change length.
pub fn waveform_buffers_full(state: &SimState) -> bool {
    state
        .channels()
        .iter()
        .all(|chan| chan.buffer.len() == chan.buffer.capacity())
}

pub fn event_log_bounded(state: &SimState) -> bool {
    state.log.len() <= state.log.capacity()
}

/// Alarms are a pure function of vitals and the last cuff reading.
pub fn alarms_consistent(state: &SimState) -> bool {
    state.alarms == alarms::evaluate_all(&state.vitals, &state.nibp.last_reading)
}

/// Idle cuff is deflated with no pending step; a busy cuff has exactly the
/// deadline its phase needs.
pub fn nibp_phase_consistent(state: &SimState) -> bool {
    let t = &state.timers;
    match state.nibp.phase {
        NibpPhase::Idle => {
            state.nibp.cuff_pressure == 0 && t.nibp_step.is_none() && t.nibp_settle.is_none()
        }
        NibpPhase::Cycling => t.nibp_step.is_some() && t.nibp_settle.is_none(),
        NibpPhase::Settling => t.nibp_step.is_none() && t.nibp_settle.is_some(),
    }
}

/// An intervention is active exactly while its auto-off deadline is pending.
pub fn intervention_has_deadline(state: &SimState) -> bool {
    state.intervention.is_some() == state.timers.intervention_off.is_some()
}

pub fn silence_has_deadline(state: &SimState) -> bool {
    state.alarms_silenced == state.timers.silence_off.is_some()
}

/// No deadline lies in the past.
pub fn timers_not_stale(state: &SimState) -> bool {
    [
        state.timers.tick,
        state.timers.nibp_step,
        state.timers.nibp_settle,
        state.timers.intervention_off,
        state.timers.silence_off,
    ]
    .iter()
    .flatten()
    .all(|at| *at >= state.now)
}

/// All individual invariants with names for reporting.
pub const ALL_INVARIANTS: &[(&str, fn(&SimState) -> bool)] = &[
    ("vitalsWithinBounds", vitals_within_bounds),
    ("waveformBuffersFull", waveform_buffers_full),
    ("eventLogBounded", event_log_bounded),
    ("alarmsConsistent", alarms_consistent),
    ("nibpPhaseConsistent", nibp_phase_consistent),
    ("interventionHasDeadline", intervention_has_deadline),
    ("silenceHasDeadline", silence_has_deadline),
    ("timersNotStale", timers_not_stale),
];

pub fn safety_invariant(state: &SimState) -> bool {
    ALL_INVARIANTS.iter().all(|(_, check)| check(state))
}

/// Check all invariants and return the name of the first violated one, if any.
pub fn check_invariants(state: &SimState) -> Result<(), &'static str> {
    for (name, check) in ALL_INVARIANTS {
        if !check(state) {
            return Err(name);
        }
    }
    Ok(())
}
