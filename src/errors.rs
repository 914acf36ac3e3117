// Error types for telehud

use crate::writer::TelemetryFrame;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum HudError {
    // Configuration errors, raised while a registry or session is being built
    #[snafu(display("Program registry must contain at least one program"))]
    EmptyRegistry,
    #[snafu(display("Program id registered twice: {id}"))]
    DuplicateProgram { id: String },
    #[snafu(display("Invalid range for {field}: min {min} is greater than max {max}"))]
    InvalidRange { field: String, min: f32, max: f32 },
    #[snafu(display("Invalid parameter: {field} - {reason}"))]
    InvalidParameter { field: String, reason: String },
    #[snafu(display("Invalid surface size {width}x{height}"))]
    InvalidSurface { width: usize, height: usize },

    // Per-frame render errors
    #[snafu(display("Program {program} failed to render: {reason}"))]
    RenderFailed { program: String, reason: String },
    #[snafu(display("Program {program} panicked while rendering"))]
    RenderPanicked { program: String },

    // Errors for the telemetry writer
    #[snafu(display("Error writing telemetry file"))]
    WriterError { source: io::Error },
    #[snafu(display("Error broadcasting telemetry frame"))]
    TelemetryBroadcastError {
        source: Box<SendError<TelemetryFrame>>,
    },
    #[snafu(display("Error loading telemetry file"))]
    TelemetryLoaderError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error accessing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}

impl HudError {
    /// Whether the error belongs to the startup/configuration class. Fatal errors abort
    /// session construction; everything else is recoverable at the frame boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HudError::EmptyRegistry
                | HudError::DuplicateProgram { .. }
                | HudError::InvalidRange { .. }
                | HudError::InvalidParameter { .. }
                | HudError::InvalidSurface { .. }
        )
    }
}

impl From<SendError<TelemetryFrame>> for HudError {
    fn from(value: SendError<TelemetryFrame>) -> Self {
        HudError::TelemetryBroadcastError {
            source: Box::new(value),
        }
    }
}
