pub mod signal;
pub mod simulator;
pub mod status;

use serde::{Deserialize, Serialize};

use crate::HudError;

pub use simulator::{AdvanceOutcome, ManualOverrides, SimConfig, TelemetrySimulator};
pub use status::StatusDebouncer;

/// Labels cycled through by `ScanParams::target_section`, one step per scan cycle.
pub const TARGET_SECTIONS: [&str; 6] =
    ["ALPHA-7", "BRAVO-2", "CORE", "DELTA-9", "ECHO-4", "HELIX-1"];

/// Inclusive `[min, max]` interval a telemetry field must stay within.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FieldRange {
    pub min: f32,
    pub max: f32,
}

impl FieldRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, field: &str) -> Result<(), HudError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(HudError::InvalidRange {
                field: field.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Maps `t` in `[0, 1]` onto the range.
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + self.span() * t.clamp(0., 1.)
    }
}

/// Declared valid ranges for every bounded telemetry field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryRanges {
    pub target_size: FieldRange,
    pub scan_resolution: FieldRange,
    pub target_x: FieldRange,
    pub target_y: FieldRange,
    pub exposure_time: FieldRange,
    pub energy_level: FieldRange,
    pub slice_thickness: FieldRange,
    pub insertion_depth: FieldRange,
    pub rotation_angle: FieldRange,
    pub aberration_offset: FieldRange,
    pub aberration_angle: FieldRange,
    pub color_weight: FieldRange,
    pub load: FieldRange,
    pub noise: FieldRange,
    pub fuel: FieldRange,
    pub signal_strength: FieldRange,
}

impl Default for TelemetryRanges {
    fn default() -> Self {
        Self {
            target_size: FieldRange::new(0., 1.),
            scan_resolution: FieldRange::new(0.05, 1.),
            target_x: FieldRange::new(0., 512.),
            target_y: FieldRange::new(0., 512.),
            exposure_time: FieldRange::new(1., 100.),
            energy_level: FieldRange::new(50., 200.),
            slice_thickness: FieldRange::new(0.5, 10.),
            insertion_depth: FieldRange::new(0., 100.),
            rotation_angle: FieldRange::new(0., 360.),
            aberration_offset: FieldRange::new(0., 0.02),
            aberration_angle: FieldRange::new(0., 360.),
            color_weight: FieldRange::new(0., 1.),
            load: FieldRange::new(0., 1.),
            noise: FieldRange::new(-1., 1.),
            fuel: FieldRange::new(0., 1.),
            signal_strength: FieldRange::new(0., 1.),
        }
    }
}

impl TelemetryRanges {
    pub fn named(&self) -> [(&'static str, FieldRange); 16] {
        [
            ("target_size", self.target_size),
            ("scan_resolution", self.scan_resolution),
            ("target_x", self.target_x),
            ("target_y", self.target_y),
            ("exposure_time", self.exposure_time),
            ("energy_level", self.energy_level),
            ("slice_thickness", self.slice_thickness),
            ("insertion_depth", self.insertion_depth),
            ("rotation_angle", self.rotation_angle),
            ("aberration_offset", self.aberration_offset),
            ("aberration_angle", self.aberration_angle),
            ("color_weight", self.color_weight),
            ("load", self.load),
            ("noise", self.noise),
            ("fuel", self.fuel),
            ("signal_strength", self.signal_strength),
        ]
    }

    pub fn validate(&self) -> Result<(), HudError> {
        for (field, range) in self.named() {
            range.validate(field)?;
        }
        if self.scan_resolution.min <= 0. {
            return Err(HudError::InvalidParameter {
                field: "scan_resolution".to_string(),
                reason: "minimum must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Target ranges clipped to a `width` x `height` surface, so the scan target stays on
    /// screen. A range lying entirely off the surface widens to the whole axis.
    pub fn fit_to_surface(&self, width: usize, height: usize) -> Self {
        Self {
            target_x: fit_axis(self.target_x, width as f32),
            target_y: fit_axis(self.target_y, height as f32),
            ..self.clone()
        }
    }
}

fn fit_axis(range: FieldRange, extent: f32) -> FieldRange {
    // left alone so validation still reports it
    if range.validate("").is_err() {
        return range;
    }
    let min = range.min.clamp(0., extent);
    let max = range.max.clamp(0., extent);
    if min == max && range.span() > 0. {
        FieldRange::new(0., extent)
    } else {
        FieldRange::new(min, max)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScanType {
    Axial,
    Coronal,
    Sagittal,
    Volumetric,
}

impl ScanType {
    pub const ALL: [ScanType; 4] = [
        ScanType::Axial,
        ScanType::Coronal,
        ScanType::Sagittal,
        ScanType::Volumetric,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScanType::Axial => "AXIAL",
            ScanType::Coronal => "CORONAL",
            ScanType::Sagittal => "SAGITTAL",
            ScanType::Volumetric => "VOLUMETRIC",
        }
    }
}

/// Discrete alert levels, ordered from calmest to most stressed.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertStatus {
    Nominal,
    Caution,
    Alert,
    Critical,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 4] = [
        AlertStatus::Nominal,
        AlertStatus::Caution,
        AlertStatus::Alert,
        AlertStatus::Critical,
    ];
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Nominal => write!(f, "NOMINAL"),
            AlertStatus::Caution => write!(f, "CAUTION"),
            AlertStatus::Alert => write!(f, "ALERT"),
            AlertStatus::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScanParams {
    pub show_grid: bool,
    pub show_target: bool,
    pub target_size: f32,
    pub scan_resolution: f32,
    pub auto_rotate: bool,
    /// Position within the current scan cycle, always in `[0, 1)`
    pub scan_progress: f32,
    pub scan_type: ScanType,
    pub target_section: String,
    /// Target position in surface pixels
    pub target_x: f32,
    pub target_y: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TechParams {
    /// Milliseconds
    pub exposure_time: f32,
    pub energy_level: f32,
    /// Millimeters
    pub slice_thickness: f32,
    /// Percent
    pub insertion_depth: f32,
    /// Degrees
    pub rotation_angle: f32,
}

/// Chromatic aberration of a single color channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChannelAberration {
    pub offset: f32,
    /// Degrees
    pub angle: f32,
    pub color_weight: [f32; 3],
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChromaticParams {
    pub red: ChannelAberration,
    pub green: ChannelAberration,
    pub blue: ChannelAberration,
}

impl ChromaticParams {
    pub fn channels(&self) -> [&ChannelAberration; 3] {
        [&self.red, &self.green, &self.blue]
    }

    pub fn channels_mut(&mut self) -> [&mut ChannelAberration; 3] {
        [&mut self.red, &mut self.green, &mut self.blue]
    }
}

/// Program-facing system readings. Array lengths are fixed when the state is generated
/// and preserved by every update.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SystemData {
    pub load_history: Vec<f32>,
    pub noise_buffer: Vec<f32>,
    pub fuel_levels: Vec<f32>,
    pub signal_strength: f32,
    pub stress_score: f32,
    pub status: AlertStatus,
}

impl SystemData {
    pub fn mean_load(&self) -> f32 {
        if self.load_history.is_empty() {
            return 0.;
        }
        self.load_history.iter().sum::<f32>() / self.load_history.len() as f32
    }
}

/// Snapshot of what the instruments currently read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TelemetryState {
    pub scan: ScanParams,
    pub tech: TechParams,
    pub chromatic: ChromaticParams,
    pub system: SystemData,
    /// Bumped every time the state is regenerated from scratch
    pub generation: u64,
}

impl TelemetryState {
    /// Names of the bounded fields currently outside their declared range.
    pub fn violations(&self, ranges: &TelemetryRanges) -> Vec<&'static str> {
        let mut out = Vec::new();
        let mut check = |name: &'static str, range: &FieldRange, value: f32| {
            if !range.contains(value) && !out.contains(&name) {
                out.push(name);
            }
        };

        check("target_size", &ranges.target_size, self.scan.target_size);
        check("scan_resolution", &ranges.scan_resolution, self.scan.scan_resolution);
        check("target_x", &ranges.target_x, self.scan.target_x);
        check("target_y", &ranges.target_y, self.scan.target_y);
        check("scan_progress", &FieldRange::new(0., 1.), self.scan.scan_progress);
        check("exposure_time", &ranges.exposure_time, self.tech.exposure_time);
        check("energy_level", &ranges.energy_level, self.tech.energy_level);
        check("slice_thickness", &ranges.slice_thickness, self.tech.slice_thickness);
        check("insertion_depth", &ranges.insertion_depth, self.tech.insertion_depth);
        check("rotation_angle", &ranges.rotation_angle, self.tech.rotation_angle);
        for channel in self.chromatic.channels() {
            check("aberration_offset", &ranges.aberration_offset, channel.offset);
            check("aberration_angle", &ranges.aberration_angle, channel.angle);
            for weight in channel.color_weight {
                check("color_weight", &ranges.color_weight, weight);
            }
        }
        for value in &self.system.load_history {
            check("load", &ranges.load, *value);
        }
        for value in &self.system.noise_buffer {
            check("noise", &ranges.noise, *value);
        }
        for value in &self.system.fuel_levels {
            check("fuel", &ranges.fuel, *value);
        }
        check("signal_strength", &ranges.signal_strength, self.system.signal_strength);
        check("stress_score", &FieldRange::new(0., 1.), self.system.stress_score);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_range_validation() {
        assert!(FieldRange::new(0., 1.).validate("x").is_ok());
        assert!(FieldRange::new(3., 3.).validate("x").is_ok());
        match FieldRange::new(2., 1.).validate("energy_level") {
            Err(HudError::InvalidRange { field, min, max }) => {
                assert_eq!(field, "energy_level");
                assert_eq!(min, 2.);
                assert_eq!(max, 1.);
            }
            other => panic!("Expected InvalidRange, got {:?}", other),
        }
        assert!(FieldRange::new(f32::NAN, 1.).validate("x").is_err());
    }

    #[test]
    fn test_field_range_clamp() {
        let range = FieldRange::new(50., 200.);
        assert_eq!(range.clamp(10.), 50.);
        assert_eq!(range.clamp(250.), 200.);
        assert_eq!(range.clamp(120.), 120.);
        assert_eq!(range.clamp(f32::NAN), 50.);
        assert_eq!(range.lerp(0.5), 125.);
    }

    #[test]
    fn test_default_ranges_are_valid() {
        assert!(TelemetryRanges::default().validate().is_ok());
    }

    #[test]
    fn test_target_ranges_fit_to_surface() {
        let ranges = TelemetryRanges::default().fit_to_surface(64, 48);
        assert_eq!(ranges.target_x, FieldRange::new(0., 64.));
        assert_eq!(ranges.target_y, FieldRange::new(0., 48.));
        assert_eq!(ranges.energy_level, TelemetryRanges::default().energy_level);

        let offscreen = TelemetryRanges {
            target_x: FieldRange::new(600., 800.),
            target_y: FieldRange::new(10., 20.),
            ..TelemetryRanges::default()
        }
        .fit_to_surface(512, 512);
        assert_eq!(offscreen.target_x, FieldRange::new(0., 512.));
        assert_eq!(offscreen.target_y, FieldRange::new(10., 20.));

        let inverted = TelemetryRanges {
            target_x: FieldRange::new(50., 10.),
            ..TelemetryRanges::default()
        }
        .fit_to_surface(32, 32);
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_zero_scan_resolution_rejected() {
        let ranges = TelemetryRanges {
            scan_resolution: FieldRange::new(0., 1.),
            ..TelemetryRanges::default()
        };
        assert!(matches!(
            ranges.validate(),
            Err(HudError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_alert_status_ordering() {
        assert!(AlertStatus::Nominal < AlertStatus::Caution);
        assert!(AlertStatus::Alert < AlertStatus::Critical);
        assert_eq!(AlertStatus::Critical.to_string(), "CRITICAL");
    }
}
