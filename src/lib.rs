// Library interface for telehud
// The binary and the integration tests both go through these modules

pub mod config;
pub mod errors;
pub mod postfx;
pub mod program;
pub mod scheduler;
pub mod session;
pub mod surface;
pub mod telemetry;
pub mod writer;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::HudError;
pub use postfx::{CrtParams, ShaderUniform};
pub use program::{ProgramDescriptor, ProgramRegistry, ProgramSelector, builtin_registry};
pub use scheduler::{DisplayMode, FrameOutcome, SchedulerConfig, SchedulerSession};
pub use session::DisplaySession;
pub use surface::{Color, DrawableSurface, PixelSurface};
pub use telemetry::{TelemetrySimulator, TelemetryState};
pub use writer::TelemetryFrame;
