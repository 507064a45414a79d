// IV infusion-rate trainer: drip-rate arithmetic plus a simulated gravity infusion.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::InfusionConfig;
use crate::constants::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InfusionError {
    #[error("parameters are locked while the infusion is running or complete")]
    Locked,
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("unsupported drop factor {0} gtt/mL")]
    InvalidDropFactor(u32),
}

/// Volume, duration and administration-set drop factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InfusionOrder {
    pub volume_ml: u32,
    pub minutes: u32,
    pub drop_factor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PracticeScenario {
    pub label: &'static str,
    pub order: InfusionOrder,
}

pub const PRACTICE_SCENARIOS: &[PracticeScenario] = &[
    PracticeScenario {
        label: "1000mL over 8 hours (15 gtts/mL)",
        order: InfusionOrder {
            volume_ml: 1000,
            minutes: 8 * 60,
            drop_factor: 15,
        },
    },
    PracticeScenario {
        label: "500mL over 4 hours (60 gtts/mL)",
        order: InfusionOrder {
            volume_ml: 500,
            minutes: 4 * 60,
            drop_factor: 60,
        },
    },
    PracticeScenario {
        label: "250mL over 2 hours (10 gtts/mL)",
        order: InfusionOrder {
            volume_ml: 250,
            minutes: 2 * 60,
            drop_factor: 10,
        },
    },
];

impl Default for InfusionOrder {
    fn default() -> Self {
        PRACTICE_SCENARIOS[0].order
    }
}

/// Rounded flow rates as read off the pump chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DripRates {
    pub ml_per_hour: u32,
    pub drops_per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InfusionState {
    pub order: InfusionOrder,
    pub running: bool,
    pub complete: bool,
    pub infused_ml: f64,
}

impl InfusionState {
    pub fn new(order: InfusionOrder) -> Self {
        InfusionState {
            order,
            running: false,
            complete: false,
            infused_ml: 0.0,
        }
    }

    /// Parameters may only change while stopped and not complete.
    pub fn is_locked(&self) -> bool {
        self.running || self.complete
    }

    /// Fluid left in the bag, as a percentage of the ordered volume.
    pub fn fluid_level_percent(&self) -> f64 {
        if self.order.volume_ml == 0 {
            return 0.0;
        }
        (100.0 - self.infused_ml / self.order.volume_ml as f64 * 100.0).max(0.0)
    }
}

/// Exact flow in mL/h, before rounding for display.
pub fn flow_ml_per_hour(cfg: &InfusionConfig, order: &InfusionOrder, complete: bool) -> f64 {
    if order.minutes == 0 || order.drop_factor == 0 || order.volume_ml == 0 {
        return 0.0;
    }
    if complete {
        cfg.kvo_rate_ml_per_hour
    } else {
        order.volume_ml as f64 / (order.minutes as f64 / 60.0)
    }
}

/// mL/h and gtt/min for `order`. After completion the line runs at the KVO rate.
pub fn drip_rates(cfg: &InfusionConfig, order: &InfusionOrder, complete: bool) -> DripRates {
    let ml_per_hour = flow_ml_per_hour(cfg, order, complete);
    let drops_per_minute = ml_per_hour / 60.0 * order.drop_factor as f64;
    DripRates {
        ml_per_hour: ml_per_hour.round() as u32,
        drops_per_minute: drops_per_minute.round() as u32,
    }
}

/// Seconds between drops in the drip chamber, if anything is dripping.
pub fn drip_interval_secs(rates: &DripRates) -> Option<f64> {
    (rates.drops_per_minute > 0).then(|| 60.0 / rates.drops_per_minute as f64)
}

pub fn validate(order: &InfusionOrder) -> Result<(), InfusionError> {
    let (min, max) = INFUSION_VOLUME_RANGE;
    if !(min..=max).contains(&order.volume_ml) {
        return Err(InfusionError::OutOfRange {
            name: "volume_ml",
            value: order.volume_ml,
            min,
            max,
        });
    }
    let (min, max) = INFUSION_MINUTES_RANGE;
    if !(min..=max).contains(&order.minutes) {
        return Err(InfusionError::OutOfRange {
            name: "minutes",
            value: order.minutes,
            min,
            max,
        });
    }
    if !DROP_FACTORS.contains(&order.drop_factor) {
        return Err(InfusionError::InvalidDropFactor(order.drop_factor));
    }
    Ok(())
}

/// Replace the order. Refused while locked.
pub fn set_order(state: &InfusionState, order: InfusionOrder) -> Result<InfusionState, InfusionError> {
    if state.is_locked() {
        return Err(InfusionError::Locked);
    }
    validate(&order)?;
    Ok(InfusionState { order, ..*state })
}

/// Load a practice preset: stops the line and clears progress.
pub fn load_practice(scenario: &PracticeScenario) -> InfusionState {
    info!(label = scenario.label, "practice scenario loaded");
    InfusionState::new(scenario.order)
}

/// Start/stop button. On a completed infusion it resets instead; starting
/// from stopped begins again from zero.
pub fn toggle(state: &InfusionState) -> InfusionState {
    if state.complete {
        InfusionState::new(state.order)
    } else if state.running {
        InfusionState {
            running: false,
            ..*state
        }
    } else {
        InfusionState {
            running: true,
            complete: false,
            infused_ml: 0.0,
            ..*state
        }
    }
}

/// One trainer tick. Reaching the ordered volume stops the line and marks it complete.
pub fn tick(cfg: &InfusionConfig, state: &InfusionState) -> InfusionState {
    if !state.running {
        return *state;
    }
    // Volume follows the exact flow; rounded rates are for display only.
    let flow = flow_ml_per_hour(cfg, &state.order, state.complete);
    let ml_per_tick = flow / 3600.0 * (cfg.tick_interval_ms as f64 / 1000.0);
    let infused = state.infused_ml + ml_per_tick;
    let volume = state.order.volume_ml as f64;
    if infused >= volume {
        debug!(volume, "infusion complete");
        InfusionState {
            running: false,
            complete: true,
            infused_ml: volume,
            ..*state
        }
    } else {
        InfusionState {
            infused_ml: infused,
            ..*state
        }
    }
}

/// Owns an infusion and its config and steps it over simulated time.
pub struct InfusionTrainer {
    config: InfusionConfig,
    state: InfusionState,
    carry_ms: u64,
}

impl InfusionTrainer {
    pub fn new(config: InfusionConfig, order: InfusionOrder) -> Result<Self, InfusionError> {
        validate(&order)?;
        Ok(InfusionTrainer {
            config,
            state: InfusionState::new(order),
            carry_ms: 0,
        })
    }

    pub fn state(&self) -> &InfusionState {
        &self.state
    }

    pub fn rates(&self) -> DripRates {
        drip_rates(&self.config, &self.state.order, self.state.complete)
    }

    pub fn set_order(&mut self, order: InfusionOrder) -> Result<(), InfusionError> {
        self.state = set_order(&self.state, order)?;
        Ok(())
    }

    pub fn load_practice(&mut self, scenario: &PracticeScenario) {
        self.state = load_practice(scenario);
        self.carry_ms = 0;
    }

    pub fn toggle(&mut self) {
        self.state = toggle(&self.state);
        self.carry_ms = 0;
    }

    /// Let `ms` pass; partial ticks carry over to the next call.
    pub fn advance(&mut self, ms: u64) {
        let interval = self.config.tick_interval_ms;
        self.carry_ms += ms;
        while self.carry_ms >= interval {
            self.carry_ms -= interval;
            self.state = tick(&self.config, &self.state);
        }
    }

    /// Run until the infusion completes. Returns the simulated time taken, in ms.
    /// An order with no flow never completes and returns 0 without starting.
    pub fn run_to_completion(&mut self) -> u64 {
        if flow_ml_per_hour(&self.config, &self.state.order, self.state.complete) <= 0.0 {
            return 0;
        }
        if !self.state.running && !self.state.complete {
            self.toggle();
        }
        let interval = self.config.tick_interval_ms;
        let mut elapsed = 0;
        while self.state.running {
            self.advance(interval);
            elapsed += interval;
        }
        elapsed
    }
}
