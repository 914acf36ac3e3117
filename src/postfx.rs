//! Parameters handed to the external CRT filter. Nothing here touches pixels; the filter
//! binds the uniforms verbatim.

use serde::{Deserialize, Serialize};

use crate::{
    HudError,
    telemetry::{ChannelAberration, ChromaticParams},
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChannelParams {
    pub offset: f32,
    /// Degrees
    pub angle_deg: f32,
    pub color_weight: [f32; 3],
}

impl ChannelParams {
    pub const fn new(offset: f32, angle_deg: f32, color_weight: [f32; 3]) -> Self {
        Self {
            offset,
            angle_deg,
            color_weight,
        }
    }
}

impl From<&ChannelAberration> for ChannelParams {
    fn from(value: &ChannelAberration) -> Self {
        Self {
            offset: value.offset,
            angle_deg: value.angle,
            color_weight: value.color_weight,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrtParams {
    pub curvature: f32,
    pub scanline_intensity: f32,
    pub scanline_count: f32,
    pub vignette_intensity: f32,
    pub noise_intensity: f32,
    pub flicker_intensity: f32,
    pub red: ChannelParams,
    pub green: ChannelParams,
    pub blue: ChannelParams,
    pub brightness: f32,
    pub contrast: f32,
    pub tint: [f32; 3],
    /// Supersampling factor
    pub resolution: f32,
}

impl Default for CrtParams {
    fn default() -> Self {
        Self {
            curvature: 0.08,
            scanline_intensity: 0.35,
            scanline_count: 480.,
            vignette_intensity: 0.3,
            noise_intensity: 0.05,
            flicker_intensity: 0.03,
            red: ChannelParams::new(0.002, 0., [1., 0., 0.]),
            green: ChannelParams::new(0., 120., [0., 1., 0.]),
            blue: ChannelParams::new(0.002, 240., [0., 0., 1.]),
            brightness: 1.1,
            contrast: 1.05,
            tint: [1., 1., 1.],
            resolution: 2.,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UniformValue {
    Float(f32),
    Vec3([f32; 3]),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShaderUniform {
    pub name: String,
    pub value: UniformValue,
}

impl ShaderUniform {
    fn float(name: &str, value: f32) -> Self {
        Self {
            name: name.to_string(),
            value: UniformValue::Float(value),
        }
    }

    fn vec3(name: &str, value: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            value: UniformValue::Vec3(value),
        }
    }
}

impl CrtParams {
    pub fn validate(&self) -> Result<(), HudError> {
        let non_negative = [
            ("crt.curvature", self.curvature),
            ("crt.scanline_intensity", self.scanline_intensity),
            ("crt.scanline_count", self.scanline_count),
            ("crt.vignette_intensity", self.vignette_intensity),
            ("crt.noise_intensity", self.noise_intensity),
            ("crt.flicker_intensity", self.flicker_intensity),
        ];
        for (field, value) in non_negative {
            if value.is_nan() || value < 0. {
                return Err(invalid(field, format!("must be >= 0, got {}", value)));
            }
        }
        let positive = [("crt.brightness", self.brightness), ("crt.contrast", self.contrast)];
        for (field, value) in positive {
            if value.is_nan() || value <= 0. {
                return Err(invalid(field, format!("must be > 0, got {}", value)));
            }
        }
        if self.resolution.is_nan() || self.resolution < 1. {
            return Err(invalid(
                "crt.resolution",
                format!("must be >= 1, got {}", self.resolution),
            ));
        }
        let mut channel_values = self
            .channels()
            .into_iter()
            .flat_map(|c| [c.offset, c.angle_deg].into_iter().chain(c.color_weight))
            .chain(self.tint);
        if channel_values.any(|v| !v.is_finite()) {
            return Err(invalid("crt.channels", "values must be finite".to_string()));
        }
        Ok(())
    }

    pub fn channels(&self) -> [&ChannelParams; 3] {
        [&self.red, &self.green, &self.blue]
    }

    /// Replaces the per-channel aberration with the live telemetry values.
    pub fn with_chromatic(&self, chromatic: &ChromaticParams) -> Self {
        Self {
            red: (&chromatic.red).into(),
            green: (&chromatic.green).into(),
            blue: (&chromatic.blue).into(),
            ..self.clone()
        }
    }

    /// Flattened uniform list in binding order.
    pub fn uniforms(&self) -> Vec<ShaderUniform> {
        let mut uniforms = vec![
            ShaderUniform::float("curvature", self.curvature),
            ShaderUniform::float("scanlineIntensity", self.scanline_intensity),
            ShaderUniform::float("scanlineCount", self.scanline_count),
            ShaderUniform::float("vignetteIntensity", self.vignette_intensity),
            ShaderUniform::float("noiseIntensity", self.noise_intensity),
            ShaderUniform::float("flickerIntensity", self.flicker_intensity),
        ];
        for (prefix, channel) in ["red", "green", "blue"].into_iter().zip(self.channels()) {
            uniforms.push(ShaderUniform::float(&format!("{prefix}Offset"), channel.offset));
            uniforms.push(ShaderUniform::float(&format!("{prefix}Angle"), channel.angle_deg));
            uniforms.push(ShaderUniform::vec3(
                &format!("{prefix}ColorWeight"),
                channel.color_weight,
            ));
        }
        uniforms.extend([
            ShaderUniform::float("brightness", self.brightness),
            ShaderUniform::float("contrast", self.contrast),
            ShaderUniform::vec3("tint", self.tint),
            ShaderUniform::float("resolution", self.resolution),
        ]);
        uniforms
    }
}

fn invalid(field: &str, reason: String) -> HudError {
    HudError::InvalidParameter {
        field: field.to_string(),
        reason,
    }
}
