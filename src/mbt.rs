// Deterministic trace replay: apply a labelled command sequence to a seeded
// clock and return the state after each step, checking invariants throughout.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::SimulationClock;
use crate::config::SimConfig;
use crate::invariants;
use crate::state::SimState;
use crate::types::*;

/// Replay `commands` on a fresh clock seeded with `seed`.
/// Every command must be accepted; panics with a descriptive message otherwise,
/// or when an invariant breaks.
pub fn replay_trace(config: SimConfig, seed: u64, commands: &[Command]) -> Vec<(Command, SimState)> {
    let mut clock = SimulationClock::new(config, StdRng::seed_from_u64(seed));
    let mut trace = Vec::with_capacity(commands.len());

    for (i, command) in commands.iter().enumerate() {
        let accepted = clock.dispatch(command);
        assert!(
            accepted,
            "Command {} refused at step {} from state:\n{}",
            command,
            i,
            clock.state(),
        );

        if let Err(violated) = invariants::check_invariants(clock.state()) {
            panic!(
                "Invariant '{}' violated after step {} ({})\nState:\n{}",
                violated,
                i,
                command,
                clock.state(),
            );
        }

        trace.push((*command, clock.state().clone()));
    }

    trace
}

/// Final state of a replay, with default config.
pub fn replay_final(seed: u64, commands: &[Command]) -> SimState {
    replay_trace(SimConfig::default(), seed, commands)
        .pop()
        .map(|(_, state)| state)
        .unwrap_or_else(|| {
            let mut rng = StdRng::seed_from_u64(seed);
            crate::state::init_state(&SimConfig::default(), &mut rng)
        })
}
