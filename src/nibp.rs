// NIBP cuff cycle: Idle -> Cycling -> Settling -> Idle, with optional auto-repeat.

use rand::Rng;
use tracing::debug;

use crate::config::NibpConfig;
use crate::constants::MS_PER_MINUTE;
use crate::types::*;

/// Result of a cuff transition. `step_at` / `settle_at` are the deadlines the
/// scheduler should hold afterwards (`None` clears them).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NibpTransition {
    pub success: bool,
    pub state: NibpState,
    pub step_at: Option<Millis>,
    pub settle_at: Option<Millis>,
}

impl NibpTransition {
    fn rejected(state: &NibpState) -> Self {
        NibpTransition {
            success: false,
            state: *state,
            step_at: None,
            settle_at: None,
        }
    }
}

/// Begin inflating. Rejected while a cycle is already in progress.
pub fn start(cfg: &NibpConfig, nibp: &NibpState, now: Millis) -> NibpTransition {
    if nibp.cycling() {
        return NibpTransition::rejected(nibp);
    }
    NibpTransition {
        success: true,
        state: NibpState {
            phase: NibpPhase::Cycling,
            cuff_pressure: cfg.initial_cuff_mmhg,
            ..*nibp
        },
        step_at: Some(now + cfg.step_interval_ms),
        settle_at: None,
    }
}

/// One inflation step. Passing the ceiling moves the cuff to `Settling`.
pub fn step(cfg: &NibpConfig, nibp: &NibpState, now: Millis) -> NibpTransition {
    if nibp.phase != NibpPhase::Cycling {
        return NibpTransition::rejected(nibp);
    }
    let pressure = nibp.cuff_pressure + cfg.cuff_step_mmhg;
    if pressure > cfg.cuff_ceiling_mmhg {
        debug!(pressure, "cuff above ceiling, settling");
        NibpTransition {
            success: true,
            state: NibpState {
                phase: NibpPhase::Settling,
                cuff_pressure: pressure,
                ..*nibp
            },
            step_at: None,
            settle_at: Some(now + cfg.settle_delay_ms),
        }
    } else {
        NibpTransition {
            success: true,
            state: NibpState {
                cuff_pressure: pressure,
                ..*nibp
            },
            step_at: Some(now + cfg.step_interval_ms),
            settle_at: None,
        }
    }
}

/// Capture a noisy reading of `bp`, deflate, and schedule the next auto-cycle.
pub fn settle<R: Rng + ?Sized>(
    cfg: &NibpConfig,
    nibp: &NibpState,
    bp: &BloodPressure,
    now: Millis,
    rng: &mut R,
) -> NibpTransition {
    if nibp.phase != NibpPhase::Settling {
        return NibpTransition::rejected(nibp);
    }
    let reading = BloodPressure {
        systolic: VitalField::Systolic.clamp((bp.systolic + noise(cfg, rng)).round()),
        diastolic: VitalField::Diastolic.clamp((bp.diastolic + noise(cfg, rng)).round()),
    };
    NibpTransition {
        success: true,
        state: NibpState {
            phase: NibpPhase::Idle,
            last_reading: reading,
            cuff_pressure: 0,
            next_cycle_at: next_auto_cycle(nibp.auto_cycle_minutes, now).or(nibp.next_cycle_at),
            ..*nibp
        },
        step_at: None,
        settle_at: None,
    }
}

/// Abort any cycle in flight and deflate.
pub fn cancel(nibp: &NibpState) -> NibpState {
    NibpState {
        phase: NibpPhase::Idle,
        cuff_pressure: 0,
        ..*nibp
    }
}

/// Set the auto-cycle interval. The first automatic reading follows shortly;
/// `0` switches auto-cycling off.
pub fn set_auto_cycle(cfg: &NibpConfig, nibp: &NibpState, minutes: u32, now: Millis) -> NibpState {
    if minutes > 0 {
        NibpState {
            auto_cycle_minutes: minutes,
            next_cycle_at: Some(now + cfg.first_auto_delay_ms),
            ..*nibp
        }
    } else {
        NibpState {
            auto_cycle_minutes: 0,
            next_cycle_at: None,
            ..*nibp
        }
    }
}

/// An automatic cycle is due and the cuff is free.
pub fn auto_cycle_due(nibp: &NibpState, now: Millis) -> bool {
    nibp.auto_cycle_minutes > 0
        && !nibp.cycling()
        && nibp.next_cycle_at.map_or(false, |at| now >= at)
}

fn next_auto_cycle(minutes: u32, now: Millis) -> Option<Millis> {
    (minutes > 0).then(|| now + minutes as u64 * MS_PER_MINUTE)
}

fn noise<R: Rng + ?Sized>(cfg: &NibpConfig, rng: &mut R) -> f64 {
    if cfg.reading_noise_mmhg > 0.0 {
        rng.gen_range(-cfg.reading_noise_mmhg..cfg.reading_noise_mmhg)
    } else {
        0.0
    }
}
