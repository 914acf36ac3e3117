use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::HudError;

use super::{
    AlertStatus, ChannelAberration, ChromaticParams, FieldRange, ScanParams, ScanType, SystemData,
    TARGET_SECTIONS, TechParams, TelemetryRanges, TelemetryState,
    signal::{cyclic_progress, jitter, oscillate, smooth_toward, smoothing_alpha},
    status::{StatusConfig, StatusDebouncer, stress_score},
};

pub(crate) const DEFAULT_SEED: u64 = 0x7E1E_4D00_C0FF_EE42;

// Element indices; each reading gets its own phase and jitter stream.
const IDX_TARGET_SIZE: usize = 0;
const IDX_SCAN_RESOLUTION: usize = 1;
const IDX_TARGET_X: usize = 2;
const IDX_TARGET_Y: usize = 3;
const IDX_EXPOSURE: usize = 4;
const IDX_ENERGY: usize = 5;
const IDX_SLICE: usize = 6;
const IDX_INSERTION: usize = 7;
const IDX_ROTATION: usize = 8;
const IDX_SIGNAL: usize = 9;
const IDX_CHROMATIC: usize = 16;
const IDX_LOAD: usize = 100;
const IDX_NOISE: usize = 1_000;
const IDX_FUEL: usize = 10_000;

/// Channel base angles; the ±40° sweep around them never crosses 0/360.
const CHANNEL_BASE_ANGLES: [f32; 3] = [60., 180., 300.];
const CHANNEL_ANGLE_SWEEP: f32 = 40.;
const CHANNEL_WEIGHT_SWEEP: f32 = 0.15;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    /// Time constant of the exponential smoothing toward moving targets
    pub smoothing_tau_ms: f64,
    /// Gaps between ticks longer than this regenerate the whole state
    pub stale_after_ms: u64,
    pub scan_period_ms: u64,
    /// Slowest sinusoid period used for target motion
    pub target_period_ms: f64,
    pub jitter_bucket_ms: u64,
    /// Jitter amplitude as a fraction of each field's span
    pub jitter_amount: f32,
    pub load_samples: usize,
    pub noise_samples: usize,
    pub fuel_tanks: usize,
    pub status: StatusConfig,
    pub ranges: TelemetryRanges,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            smoothing_tau_ms: 800.,
            stale_after_ms: 2000,
            scan_period_ms: 4000,
            target_period_ms: 9000.,
            jitter_bucket_ms: 500,
            jitter_amount: 0.08,
            load_samples: 32,
            noise_samples: 64,
            fuel_tanks: 4,
            status: StatusConfig::default(),
            ranges: TelemetryRanges::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), HudError> {
        self.ranges.validate()?;
        self.status.validate()?;

        let invalid = |field: &str, reason: &str| HudError::InvalidParameter {
            field: field.to_string(),
            reason: reason.to_string(),
        };
        if !self.smoothing_tau_ms.is_finite() || self.smoothing_tau_ms < 0. {
            return Err(invalid("smoothing_tau_ms", "must be a finite, non-negative duration"));
        }
        if self.stale_after_ms == 0 {
            return Err(invalid("stale_after_ms", "must be greater than zero"));
        }
        if self.scan_period_ms == 0 {
            return Err(invalid("scan_period_ms", "must be greater than zero"));
        }
        if !self.target_period_ms.is_finite() || self.target_period_ms <= 0. {
            return Err(invalid("target_period_ms", "must be greater than zero"));
        }
        if !(0. ..=1.).contains(&self.jitter_amount) {
            return Err(invalid("jitter_amount", "must be within [0, 1]"));
        }
        if self.load_samples == 0 {
            return Err(invalid("load_samples", "must hold at least one sample"));
        }
        Ok(())
    }
}

/// Host-pinned targets layered on top of the simulated ones. Pinned values are still
/// smoothed and clamped.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManualOverrides {
    pub energy_level: Option<f32>,
    pub exposure_time: Option<f32>,
    pub scan_resolution: Option<f32>,
    pub target_size: Option<f32>,
    pub show_grid: Option<bool>,
    pub show_target: Option<bool>,
    pub auto_rotate: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// First tick of the session; establishes the time base
    Started,
    Smoothed,
    /// The gap since the previous tick exceeded the staleness threshold
    Regenerated,
}

/// Owns one `TelemetryState` and advances it from a monotonic millisecond clock.
pub struct TelemetrySimulator {
    config: SimConfig,
    state: TelemetryState,
    debouncer: StatusDebouncer,
    overrides: ManualOverrides,
    started_at_ms: Option<u64>,
    last_tick_ms: Option<u64>,
}

impl TelemetrySimulator {
    pub fn new(config: SimConfig) -> Result<Self, HudError> {
        config.validate()?;
        let state = generate_state(&config, 0);
        let debouncer = StatusDebouncer::new(config.status.clone());
        Ok(Self {
            config,
            state,
            debouncer,
            overrides: ManualOverrides::default(),
            started_at_ms: None,
            last_tick_ms: None,
        })
    }

    pub fn state(&self) -> &TelemetryState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn set_overrides(&mut self, overrides: ManualOverrides) {
        self.overrides = overrides;
    }

    pub fn last_tick_ms(&self) -> Option<u64> {
        self.last_tick_ms
    }

    /// Advances the state to `now_ms`.
    ///
    /// Timestamps earlier than the previous tick are treated as a zero-length step.
    pub fn advance(&mut self, now_ms: u64) -> AdvanceOutcome {
        let (started_at, last_tick) = match (self.started_at_ms, self.last_tick_ms) {
            (Some(started_at), Some(last_tick)) => (started_at, last_tick),
            _ => {
                self.started_at_ms = Some(now_ms);
                self.last_tick_ms = Some(now_ms);
                self.step(now_ms, 0, 0);
                return AdvanceOutcome::Started;
            }
        };

        let now_ms = now_ms.max(last_tick);
        let dt = now_ms - last_tick;
        let elapsed = now_ms.saturating_sub(started_at);
        self.last_tick_ms = Some(now_ms);

        if dt > self.config.stale_after_ms {
            let generation = self.state.generation + 1;
            info!(
                "Telemetry stale after {} ms without a tick, regenerating (generation {})",
                dt, generation
            );
            // the debouncer survives regeneration so the displayed status keeps its dwell
            self.state = generate_state(&self.config, generation);
            self.step(now_ms, elapsed, 0);
            return AdvanceOutcome::Regenerated;
        }

        self.step(now_ms, elapsed, dt);
        AdvanceOutcome::Smoothed
    }

    fn step(&mut self, now_ms: u64, elapsed: u64, dt: u64) {
        let config = &self.config;
        let overrides = &self.overrides;
        let ranges = &config.ranges;
        let state = &mut self.state;
        let alpha = smoothing_alpha(dt, config.smoothing_tau_ms);

        let target = |index: usize, range: FieldRange, period_scale: f64| {
            target_value(config, index, range, elapsed, period_scale)
        };
        let smooth = |current: &mut f32, target: f32, range: FieldRange| {
            *current = range.clamp(smooth_toward(*current, target, alpha));
        };

        // scan
        let scan = &mut state.scan;
        scan.show_grid = overrides.show_grid.unwrap_or(true);
        scan.show_target = overrides.show_target.unwrap_or(true);
        scan.auto_rotate = overrides.auto_rotate.unwrap_or(true);
        scan.scan_progress = cyclic_progress(elapsed, config.scan_period_ms);
        let cycle = elapsed / config.scan_period_ms;
        scan.scan_type = ScanType::ALL[(cycle % ScanType::ALL.len() as u64) as usize];
        let section = (cycle + config.seed % TARGET_SECTIONS.len() as u64) as usize;
        scan.target_section = TARGET_SECTIONS[section % TARGET_SECTIONS.len()].to_string();
        smooth(
            &mut scan.target_size,
            pinned(overrides.target_size, ranges.target_size)
                .unwrap_or_else(|| target(IDX_TARGET_SIZE, ranges.target_size, 1.)),
            ranges.target_size,
        );
        smooth(
            &mut scan.scan_resolution,
            pinned(overrides.scan_resolution, ranges.scan_resolution)
                .unwrap_or_else(|| target(IDX_SCAN_RESOLUTION, ranges.scan_resolution, 1.5)),
            ranges.scan_resolution,
        );
        smooth(
            &mut scan.target_x,
            target(IDX_TARGET_X, ranges.target_x, 0.9),
            ranges.target_x,
        );
        smooth(
            &mut scan.target_y,
            target(IDX_TARGET_Y, ranges.target_y, 1.1),
            ranges.target_y,
        );
        let auto_rotate = scan.auto_rotate;

        // tech
        let tech = &mut state.tech;
        smooth(
            &mut tech.exposure_time,
            pinned(overrides.exposure_time, ranges.exposure_time)
                .unwrap_or_else(|| target(IDX_EXPOSURE, ranges.exposure_time, 1.)),
            ranges.exposure_time,
        );
        smooth(
            &mut tech.energy_level,
            pinned(overrides.energy_level, ranges.energy_level)
                .unwrap_or_else(|| target(IDX_ENERGY, ranges.energy_level, 1.3)),
            ranges.energy_level,
        );
        smooth(
            &mut tech.slice_thickness,
            target(IDX_SLICE, ranges.slice_thickness, 2.),
            ranges.slice_thickness,
        );
        smooth(
            &mut tech.insertion_depth,
            target(IDX_INSERTION, ranges.insertion_depth, 1.7),
            ranges.insertion_depth,
        );
        // without auto-rotate the angle holds where it is
        let rotation_target = if auto_rotate {
            target(IDX_ROTATION, ranges.rotation_angle, 0.8)
        } else {
            tech.rotation_angle
        };
        smooth(&mut tech.rotation_angle, rotation_target, ranges.rotation_angle);

        // chromatic
        for (channel_no, channel) in state.chromatic.channels_mut().into_iter().enumerate() {
            let base = IDX_CHROMATIC + channel_no * 8;
            smooth(
                &mut channel.offset,
                target(base, ranges.aberration_offset, 0.7),
                ranges.aberration_offset,
            );
            let sweep =
                oscillate(config.seed, base + 1, elapsed, config.target_period_ms) * 2. - 1.;
            smooth(
                &mut channel.angle,
                CHANNEL_BASE_ANGLES[channel_no] + sweep * CHANNEL_ANGLE_SWEEP,
                ranges.aberration_angle,
            );
            for (component, weight) in channel.color_weight.iter_mut().enumerate() {
                let primary = if component == channel_no { 1. } else { 0. };
                let wobble =
                    oscillate(config.seed, base + 2 + component, elapsed, config.target_period_ms)
                        * CHANNEL_WEIGHT_SWEEP;
                let weight_target = if component == channel_no {
                    primary - wobble
                } else {
                    primary + wobble
                };
                smooth(weight, weight_target, ranges.color_weight);
            }
        }

        // system arrays keep their length; values are replaced in place
        let system = &mut state.system;
        for (i, sample) in system.load_history.iter_mut().enumerate() {
            smooth(sample, target(IDX_LOAD + i, ranges.load, 0.5), ranges.load);
        }
        for (i, sample) in system.noise_buffer.iter_mut().enumerate() {
            let wave = target(IDX_NOISE + i, ranges.noise, 0.2);
            let spike = jitter(config.seed, IDX_NOISE + i, elapsed, config.jitter_bucket_ms / 4)
                * ranges.noise.span()
                * 0.25;
            smooth(sample, wave + spike, ranges.noise);
        }
        for (i, level) in system.fuel_levels.iter_mut().enumerate() {
            smooth(level, target(IDX_FUEL + i, ranges.fuel, 6.), ranges.fuel);
        }
        smooth(
            &mut system.signal_strength,
            target(IDX_SIGNAL, ranges.signal_strength, 1.2),
            ranges.signal_strength,
        );
        system.stress_score = stress_score(system.signal_strength, system.mean_load());
        system.status = self.debouncer.update(now_ms, system.stress_score);

        clamp_state(state, ranges);
        debug!(
            "Telemetry tick at {} ms: dt {} ms, stress {:.3}, status {}",
            now_ms, dt, state.system.stress_score, state.system.status
        );
    }
}

fn pinned(value: Option<f32>, range: FieldRange) -> Option<f32> {
    value.map(|v| range.clamp(v))
}

fn target_value(
    config: &SimConfig,
    index: usize,
    range: FieldRange,
    elapsed: u64,
    period_scale: f64,
) -> f32 {
    let base = oscillate(
        config.seed,
        index,
        elapsed,
        config.target_period_ms * period_scale,
    );
    let noise = jitter(config.seed, index, elapsed, config.jitter_bucket_ms) * config.jitter_amount;
    range.lerp(base + noise)
}

/// Final range enforcement after every update; the update law alone is not trusted.
fn clamp_state(state: &mut TelemetryState, ranges: &TelemetryRanges) {
    let scan = &mut state.scan;
    scan.target_size = ranges.target_size.clamp(scan.target_size);
    scan.scan_resolution = ranges.scan_resolution.clamp(scan.scan_resolution);
    scan.target_x = ranges.target_x.clamp(scan.target_x);
    scan.target_y = ranges.target_y.clamp(scan.target_y);
    scan.scan_progress = scan.scan_progress.clamp(0., 1.);

    let tech = &mut state.tech;
    tech.exposure_time = ranges.exposure_time.clamp(tech.exposure_time);
    tech.energy_level = ranges.energy_level.clamp(tech.energy_level);
    tech.slice_thickness = ranges.slice_thickness.clamp(tech.slice_thickness);
    tech.insertion_depth = ranges.insertion_depth.clamp(tech.insertion_depth);
    tech.rotation_angle = ranges.rotation_angle.clamp(tech.rotation_angle);

    for channel in state.chromatic.channels_mut() {
        channel.offset = ranges.aberration_offset.clamp(channel.offset);
        channel.angle = ranges.aberration_angle.clamp(channel.angle);
        for weight in channel.color_weight.iter_mut() {
            *weight = ranges.color_weight.clamp(*weight);
        }
    }

    let system = &mut state.system;
    system
        .load_history
        .iter_mut()
        .for_each(|v| *v = ranges.load.clamp(*v));
    system
        .noise_buffer
        .iter_mut()
        .for_each(|v| *v = ranges.noise.clamp(*v));
    system
        .fuel_levels
        .iter_mut()
        .for_each(|v| *v = ranges.fuel.clamp(*v));
    system.signal_strength = ranges.signal_strength.clamp(system.signal_strength);
    system.stress_score = system.stress_score.clamp(0., 1.);
}

fn sample(rng: &mut StdRng, range: FieldRange) -> f32 {
    range.lerp(rng.gen_range(0f32..1.))
}

/// Builds a fully populated state from the seed. Each generation draws a fresh stream.
fn generate_state(config: &SimConfig, generation: u64) -> TelemetryState {
    let ranges = &config.ranges;
    let mut rng = StdRng::seed_from_u64(
        config
            .seed
            .wrapping_add(generation.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
    );

    let scan = ScanParams {
        show_grid: true,
        show_target: true,
        target_size: sample(&mut rng, ranges.target_size),
        scan_resolution: sample(&mut rng, ranges.scan_resolution),
        auto_rotate: true,
        scan_progress: 0.,
        scan_type: ScanType::Axial,
        target_section: TARGET_SECTIONS[0].to_string(),
        target_x: sample(&mut rng, ranges.target_x),
        target_y: sample(&mut rng, ranges.target_y),
    };
    let tech = TechParams {
        exposure_time: sample(&mut rng, ranges.exposure_time),
        energy_level: sample(&mut rng, ranges.energy_level),
        slice_thickness: sample(&mut rng, ranges.slice_thickness),
        insertion_depth: sample(&mut rng, ranges.insertion_depth),
        rotation_angle: sample(&mut rng, ranges.rotation_angle),
    };
    let mut channel = |channel_no: usize| {
        let mut color_weight = [0.; 3];
        color_weight[channel_no] = 1.;
        ChannelAberration {
            offset: sample(&mut rng, ranges.aberration_offset),
            angle: ranges.aberration_angle.clamp(CHANNEL_BASE_ANGLES[channel_no]),
            color_weight: color_weight.map(|w| ranges.color_weight.clamp(w)),
        }
    };
    let chromatic = ChromaticParams {
        red: channel(0),
        green: channel(1),
        blue: channel(2),
    };

    let load_history: Vec<f32> = (0..config.load_samples)
        .map(|_| sample(&mut rng, ranges.load))
        .collect();
    let noise_buffer = (0..config.noise_samples)
        .map(|_| sample(&mut rng, ranges.noise))
        .collect();
    let fuel_levels = (0..config.fuel_tanks)
        .map(|_| sample(&mut rng, ranges.fuel))
        .collect();
    let signal_strength = sample(&mut rng, ranges.signal_strength);
    let mean_load = load_history.iter().sum::<f32>() / load_history.len().max(1) as f32;

    TelemetryState {
        scan,
        tech,
        chromatic,
        system: SystemData {
            load_history,
            noise_buffer,
            fuel_levels,
            signal_strength,
            stress_score: stress_score(signal_strength, mean_load),
            status: AlertStatus::Nominal,
        },
        generation,
    }
}
