// Waveform synthesis: one cycle per beat/breath, streamed into fixed-size display buffers.

use std::collections::VecDeque;
use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::constants::*;
use crate::types::Vitals;

/// Display channels on the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    Ecg,
    Pleth,
    Resp,
}

pub const ALL_CHANNELS: &[Channel] = &[Channel::Ecg, Channel::Pleth, Channel::Resp];

impl Channel {
    pub fn pattern(self) -> &'static [f64] {
        match self {
            Channel::Ecg => ECG_PATTERN,
            Channel::Pleth => PLETH_PATTERN,
            Channel::Resp => RESP_PATTERN,
        }
    }

    /// Value used to pad a cycle after the pattern.
    pub fn baseline(self) -> f64 {
        match self {
            Channel::Ecg => ECG_BASELINE,
            Channel::Pleth => PLETH_BASELINE,
            Channel::Resp => RESP_BASELINE,
        }
    }

    /// Peak-to-peak amplitude of the per-sample jitter.
    pub fn noise(self) -> f64 {
        match self {
            Channel::Ecg => ECG_NOISE,
            Channel::Pleth => PLETH_NOISE,
            Channel::Resp => RESP_NOISE,
        }
    }

    /// ECG and pleth follow the heart rate, resp follows the respiratory rate.
    pub fn rate(self, vitals: &Vitals) -> f64 {
        match self {
            Channel::Ecg | Channel::Pleth => vitals.hr,
            Channel::Resp => vitals.rr,
        }
    }

    /// Only cardiac channels pick up rhythm irregularity.
    pub fn follows_rhythm(self) -> bool {
        matches!(self, Channel::Ecg | Channel::Pleth)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Ecg => write!(f, "ECG II"),
            Channel::Pleth => write!(f, "Pleth"),
            Channel::Resp => write!(f, "Resp"),
        }
    }
}

/// Ticks in one cycle at `rate` cycles per minute, or `None` when the rate is
/// below `MIN_WAVEFORM_RATE` (asystole / apnoea).
pub fn cycle_length_ticks(rate: f64, tick_ms: u64) -> Option<usize> {
    if !(rate >= MIN_WAVEFORM_RATE) || !rate.is_finite() || tick_ms == 0 {
        return None;
    }
    Some(((60.0 / rate) * (1000.0 / tick_ms as f64)).round() as usize)
}

/// Build one cycle: the pattern first, then baseline padding up to the cycle
/// length. The pattern is never truncated, so very fast rates yield a cycle of
/// exactly `pattern.len()` samples.
///
/// With `irregular` set, the target length is scaled by a multiplier drawn from
/// `[IRREGULAR_MIN, IRREGULAR_MAX)`, giving a new inter-beat interval every cycle.
pub fn generate_cycle<R: Rng + ?Sized>(
    pattern: &[f64],
    baseline: f64,
    rate: f64,
    irregular: bool,
    tick_ms: u64,
    rng: &mut R,
) -> Vec<f64> {
    let Some(base_len) = cycle_length_ticks(rate, tick_ms) else {
        return FLATLINE_PATTERN.to_vec();
    };

    let target = if irregular {
        let multiplier = rng.gen_range(IRREGULAR_MIN..IRREGULAR_MAX);
        ((60.0 / rate) * (1000.0 / tick_ms as f64) * multiplier).round() as usize
    } else {
        base_len
    };

    let mut cycle = Vec::with_capacity(target.max(pattern.len()));
    cycle.extend_from_slice(pattern);
    cycle.resize(target.max(pattern.len()), baseline);
    cycle
}

/// Sliding window of display samples. Always holds exactly `capacity` samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl WaveformBuffer {
    /// A buffer pre-filled with zero samples.
    pub fn new(capacity: usize) -> Self {
        WaveformBuffer {
            samples: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
        }
    }

    /// Append `sample`, evicting the oldest once over capacity.
    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// `(index, amplitude)` pairs, oldest first, as consumed by chart renderers.
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.samples.iter().copied().enumerate()
    }
}

/// One channel's running cycle plus its display buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformChannel {
    pub channel: Channel,
    cycle: Vec<f64>,
    index: usize,
    pub buffer: WaveformBuffer,
}

impl WaveformChannel {
    pub fn new<R: Rng + ?Sized>(
        channel: Channel,
        vitals: &Vitals,
        irregular: bool,
        tick_ms: u64,
        capacity: usize,
        rng: &mut R,
    ) -> Self {
        let mut chan = WaveformChannel {
            channel,
            cycle: Vec::new(),
            index: 0,
            buffer: WaveformBuffer::new(capacity),
        };
        chan.restart(vitals, irregular, tick_ms, rng);
        chan
    }

    /// Drop the running cycle and start a fresh one from `vitals`.
    pub fn restart<R: Rng + ?Sized>(
        &mut self,
        vitals: &Vitals,
        irregular: bool,
        tick_ms: u64,
        rng: &mut R,
    ) {
        self.cycle = self.generate(vitals, irregular, tick_ms, rng);
        self.index = 0;
    }

    /// Step one tick: advance the cycle index, regenerate on wrap, push one
    /// jittered sample.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        vitals: &Vitals,
        irregular: bool,
        tick_ms: u64,
        rng: &mut R,
    ) {
        self.index = (self.index + 1) % self.cycle.len();
        if self.index == 0 {
            self.cycle = self.generate(vitals, irregular, tick_ms, rng);
        }
        let jitter = (rng.gen::<f64>() - 0.5) * self.channel.noise();
        self.buffer.push(self.cycle[self.index] + jitter);
    }

    pub fn cycle(&self) -> &[f64] {
        &self.cycle
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        vitals: &Vitals,
        irregular: bool,
        tick_ms: u64,
        rng: &mut R,
    ) -> Vec<f64> {
        generate_cycle(
            self.channel.pattern(),
            self.channel.baseline(),
            self.channel.rate(vitals),
            irregular && self.channel.follows_rhythm(),
            tick_ms,
            rng,
        )
    }
}
