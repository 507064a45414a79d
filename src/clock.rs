// Scheduler: owns the monitor state, the config and the random source, and
// advances simulated time by firing pending deadlines in order.

use rand::Rng;
use tracing::debug;

use crate::config::SimConfig;
use crate::logic;
use crate::state::{init_state, SimState};
use crate::types::*;

pub struct SimulationClock<R: Rng> {
    config: SimConfig,
    state: SimState,
    rng: R,
    stopped: bool,
}

impl<R: Rng> SimulationClock<R> {
    pub fn new(config: SimConfig, mut rng: R) -> Self {
        let state = init_state(&config, &mut rng);
        SimulationClock {
            config,
            state,
            rng,
            stopped: false,
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> Millis {
        self.state.now
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Let `ms` of simulated time pass, firing every deadline that falls inside
    /// the window. Returns the number of deadlines fired.
    pub fn advance(&mut self, ms: Millis) -> usize {
        if self.stopped {
            return 0;
        }
        let target = self.state.now + ms;
        let mut fired = 0;
        while let Some((at, kind)) = self.state.timers.next_due() {
            if at > target {
                break;
            }
            self.state = logic::fire_timer(&self.config, &self.state, kind, at, &mut self.rng);
            fired += 1;
        }
        self.state.now = target;
        fired
    }

    /// Run one command to completion. Returns `false` when it was refused.
    pub fn dispatch(&mut self, command: &Command) -> bool {
        if self.stopped {
            return false;
        }
        if let Command::Advance { ms } = command {
            self.advance(*ms);
            return true;
        }
        let result = logic::apply_command(&self.config, &self.state, command, &mut self.rng);
        if !result.success {
            debug!(%command, "command refused");
        }
        self.state = result.new_state;
        result.success
    }

    /// Drop every pending deadline. Later `advance`/`dispatch` calls are no-ops.
    pub fn teardown(&mut self) {
        if !self.stopped {
            self.state = logic::teardown(&self.state);
            self.state.log.push(self.state.now, "Simulator stopped.");
            self.stopped = true;
        }
    }

    pub fn into_state(mut self) -> SimState {
        self.teardown();
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn clock() -> SimulationClock<StdRng> {
        SimulationClock::new(SimConfig::default(), StdRng::seed_from_u64(9))
    }

    #[test]
    fn advance_fires_one_tick_per_interval() {
        let mut c = clock();
        assert_eq!(c.advance(1_000), 10);
        assert_eq!(c.now(), 1_000);
        assert_eq!(c.state().timers.tick, Some(1_100));
        assert_eq!(c.advance(50), 0);
        assert_eq!(c.advance(50), 1);
    }

    #[test]
    fn manual_nibp_cycle_completes_after_four_seconds() {
        let mut c = clock();
        assert!(c.dispatch(&Command::StartNibp));
        assert_eq!(c.state().nibp.cuff_pressure, 50);
        assert!(!c.dispatch(&Command::StartNibp));

        c.advance(2_900);
        assert_eq!(c.state().nibp.phase, NibpPhase::Cycling);
        c.advance(100);
        assert_eq!(c.state().nibp.phase, NibpPhase::Settling);
        c.advance(1_000);
        assert_eq!(c.state().nibp.phase, NibpPhase::Idle);
        assert_eq!(c.state().nibp.cuff_pressure, 0);
        assert_eq!(c.state().log.count_matching("NIBP Reading"), 1);
    }

    #[test]
    fn intervention_expires_after_duration() {
        let mut c = clock();
        c.dispatch(&Command::Administer {
            intervention: Intervention::Epinephrine,
        });
        c.advance(9_900);
        assert_eq!(c.state().intervention, Some(Intervention::Epinephrine));
        c.advance(100);
        assert_eq!(c.state().intervention, None);
        // 99 ticks ran with the drug active (the tick at 10s fires after expiry).
        assert_eq!(c.state().vitals.hr, 75.0 + 99.0);
    }

    #[test]
    fn silence_expires_and_logs() {
        let mut c = clock();
        c.dispatch(&Command::SilenceAlarms);
        assert!(c.state().alarms_silenced);
        c.advance(60_000);
        assert!(!c.state().alarms_silenced);
        assert_eq!(c.state().log.latest().unwrap().message, "Alarms re-enabled.");
    }

    #[test]
    fn auto_cycle_takes_first_reading_after_five_seconds() {
        let mut c = clock();
        c.dispatch(&Command::SetAutoCycle { minutes: 5 });
        c.advance(5_000);
        assert!(c.state().nibp.cycling());
        c.advance(4_000);
        assert!(!c.state().nibp.cycling());
        assert_eq!(c.state().log.count_matching("NIBP Reading"), 1);
        assert_eq!(c.state().log.count_matching("NIBP cycle started"), 0);
        assert_eq!(c.state().nibp.next_cycle_at, Some(9_000 + 300_000));
    }

    #[test]
    fn nothing_fires_after_teardown() {
        let mut c = clock();
        c.dispatch(&Command::Administer {
            intervention: Intervention::Oxygen,
        });
        c.dispatch(&Command::StartNibp);
        c.advance(300);
        c.teardown();
        let frozen = c.state().clone();
        assert_eq!(c.advance(120_000), 0);
        assert!(!c.dispatch(&Command::CodeBlue));
        assert_eq!(c.state(), &frozen);
        assert!(frozen.timers.is_empty());
    }
}
