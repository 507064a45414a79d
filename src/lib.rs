//! Bedside patient-monitor simulation core.
//!
//! A [`clock::SimulationClock`] owns one [`state::SimState`] and advances it
//! through the pure reducers in [`logic`]: a 100 ms main tick that moves the
//! ECG, pleth and respiration waveforms and re-evaluates alarms, an NIBP cuff
//! sub-cycle, and timed interventions. Randomness is always injected, so a
//! seeded run replays exactly. [`infusion`] holds the IV drip-rate trainer.

pub mod alarms;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod event_log;
pub mod infusion;
pub mod invariants;
pub mod logic;
pub mod mbt;
pub mod nibp;
pub mod simulator;
pub mod state;
pub mod types;
pub mod waveform;

pub use clock::SimulationClock;
pub use config::SimConfig;
pub use error::SimError;
pub use state::SimState;
