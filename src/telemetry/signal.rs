//! Deterministic signal helpers behind every simulated reading.
//!
//! Targets are a normalized sum of sinusoids whose periods and phases depend on the
//! element index, so neighbouring elements never move in lockstep. Jitter is a hash of
//! `(seed, index, time bucket)`, which keeps it reproducible without any global RNG.

use std::f64::consts::TAU;

/// Period multipliers for the three sinusoid components. Irrational ratios keep the
/// combined waveform from visibly repeating.
const HARMONICS: [(f64, f64); 3] = [(1.0, 0.55), (1.618_034, 0.3), (2.718_282, 0.15)];

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Uniform value in `[0, 1)` derived from `(seed, index, salt)`.
pub fn hash_unit(seed: u64, index: u64, salt: u64) -> f64 {
    let mixed = splitmix64(seed ^ splitmix64(index.wrapping_add(splitmix64(salt))));
    (mixed >> 11) as f64 / (1u64 << 53) as f64
}

/// Bounded jitter in `[-1, 1]` that changes once per `bucket_ms` of elapsed time.
pub fn jitter(seed: u64, index: usize, elapsed_ms: u64, bucket_ms: u64) -> f32 {
    let bucket = elapsed_ms / bucket_ms.max(1);
    (hash_unit(seed, index as u64, bucket) * 2. - 1.) as f32
}

/// Smooth oscillation in `[0, 1]` for element `index` at `elapsed_ms`.
///
/// `base_period_ms` sets the slowest component; the phase of every component is drawn
/// from the seed and the element index.
pub fn oscillate(seed: u64, index: usize, elapsed_ms: u64, base_period_ms: f64) -> f32 {
    let t = elapsed_ms as f64;
    let period_scale = 1. + hash_unit(seed, index as u64, 0x5eed) * 0.5;
    let mut sum = 0.;
    for (component, (ratio, weight)) in HARMONICS.iter().enumerate() {
        let period = base_period_ms * period_scale / ratio;
        let phase = hash_unit(seed, index as u64, component as u64 + 1) * TAU;
        sum += weight * (TAU * t / period + phase).sin();
    }
    // weights sum to 1, so `sum` is already in [-1, 1]
    ((sum + 1.) / 2.).clamp(0., 1.) as f32
}

/// Fraction of the current cycle, derived from elapsed time alone so it never drifts.
pub fn cyclic_progress(elapsed_ms: u64, period_ms: u64) -> f32 {
    let period = period_ms.max(1);
    ((elapsed_ms % period) as f64 / period as f64) as f32
}

/// Per-tick exponential smoothing factor for a time constant `tau_ms`.
///
/// Always in `[0, 1]`: a tick can close the gap to the target but never overshoot it.
pub fn smoothing_alpha(dt_ms: u64, tau_ms: f64) -> f32 {
    if tau_ms <= 0. {
        return 1.;
    }
    (1. - (-(dt_ms as f64) / tau_ms).exp()).clamp(0., 1.) as f32
}

pub fn smooth_toward(current: f32, target: f32, alpha: f32) -> f32 {
    current + (target - current) * alpha
}
