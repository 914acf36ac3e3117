pub mod texture;

use std::panic::{AssertUnwindSafe, catch_unwind};

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::{
    HudError, program::ProgramDescriptor, surface::DrawableSurface, telemetry::TelemetryState,
};

pub use texture::{TextureFlag, TextureSink};

/// Receives render failures. Failures never propagate past the session boundary.
pub trait ErrorReporter {
    fn report(&mut self, program_id: &str, error: &HudError);
}

/// Reports render failures through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn report(&mut self, program_id: &str, error: &HudError) {
        error!("Render of program '{}' failed: {}", program_id, error);
    }
}

impl<F: FnMut(&str, &HudError)> ErrorReporter for F {
    fn report(&mut self, program_id: &str, error: &HudError) {
        self(program_id, error)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Active,
    /// Nobody is interacting; redraw intervals are widened
    Attract,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Skipped,
    Rendered,
    /// The program failed; the previous frame stays on screen
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Replaces every program's preferred interval when set
    pub interval_override_ms: Option<u64>,
    /// Interval multiplier applied in attract mode
    pub attract_factor: u32,
    /// Idle time after which a host switches to attract mode
    pub attract_idle_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_override_ms: None,
            attract_factor: 3,
            attract_idle_ms: 30_000,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), HudError> {
        if self.interval_override_ms == Some(0) {
            return Err(HudError::InvalidParameter {
                field: "scheduler.interval_override_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.attract_factor < 2 {
            return Err(HudError::InvalidParameter {
                field: "scheduler.attract_factor".to_string(),
                reason: format!("must be at least 2, got {}", self.attract_factor),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub renders: u64,
    pub failures: u64,
    pub skipped: u64,
}

/// Per-surface bookkeeping that decides when the bound program redraws.
#[derive(Clone, Debug)]
pub struct SchedulerSession {
    config: SchedulerConfig,
    next_draw_due_at: Option<u64>,
    dirty: bool,
    last_program_id: Option<String>,
    mode: DisplayMode,
    stats: SessionStats,
}

impl SchedulerSession {
    pub fn new(config: SchedulerConfig) -> Result<Self, HudError> {
        config.validate()?;
        Ok(Self {
            config,
            next_draw_due_at: None,
            // a fresh session always paints its first frame
            dirty: true,
            last_program_id: None,
            mode: DisplayMode::Active,
            stats: SessionStats::default(),
        })
    }

    pub fn next_draw_due_at(&self) -> Option<u64> {
        self.next_draw_due_at
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn last_program_id(&self) -> Option<&str> {
        self.last_program_id.as_deref()
    }

    pub fn request_redraw(&mut self) {
        self.dirty = true;
    }

    /// The bound telemetry state was replaced wholesale.
    pub fn notify_state_replaced(&mut self) {
        self.dirty = true;
    }

    /// Only the interval changes; nothing about the simulation time base.
    pub fn set_mode(&mut self, mode: DisplayMode) {
        if self.mode != mode {
            debug!("Scheduler mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Binds `program_id`; switching programs forces an immediate redraw.
    pub fn bind_program(&mut self, program_id: &str) {
        if self.last_program_id.as_deref() != Some(program_id) {
            self.last_program_id = Some(program_id.to_string());
            self.dirty = true;
        }
    }

    pub fn effective_interval(&self, program: &ProgramDescriptor) -> u64 {
        let base = self
            .config
            .interval_override_ms
            .unwrap_or(program.preferred_interval_ms)
            .max(1);
        match self.mode {
            DisplayMode::Active => base,
            DisplayMode::Attract => base.saturating_mul(self.config.attract_factor as u64),
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.dirty || self.next_draw_due_at.is_none_or(|due| now_ms >= due)
    }

    /// Runs one frame: binds the program, and if due, renders it into `surface` and
    /// signals `texture` once.
    ///
    /// The idle, due and rendering phases all happen inside this call, so between calls
    /// the session is always idle.
    ///
    /// A failed or panicking render is reported and otherwise treated like a zero-time
    /// success for scheduling purposes, so the next due time is unaffected.
    pub fn run_frame(
        &mut self,
        now_ms: u64,
        program: &ProgramDescriptor,
        state: &TelemetryState,
        surface: &mut dyn DrawableSurface,
        texture: &mut dyn TextureSink,
        reporter: &mut dyn ErrorReporter,
    ) -> FrameOutcome {
        self.bind_program(&program.id);
        if !self.is_due(now_ms) {
            self.stats.skipped += 1;
            return FrameOutcome::Skipped;
        }

        let forced = self.dirty;
        let result = match catch_unwind(AssertUnwindSafe(|| program.render(surface, state))) {
            Ok(result) => result,
            Err(_) => Err(HudError::RenderPanicked {
                program: program.id.clone(),
            }),
        };

        self.schedule_next(now_ms, forced, self.effective_interval(program));
        self.dirty = false;

        match result {
            Ok(()) => {
                self.stats.renders += 1;
                texture.mark_dirty();
                debug!(
                    "Rendered '{}' at {} ms, next due at {:?}",
                    program.id, now_ms, self.next_draw_due_at
                );
                FrameOutcome::Rendered
            }
            Err(e) => {
                self.stats.failures += 1;
                reporter.report(&program.id, &e);
                FrameOutcome::Failed
            }
        }
    }

    /// Interval-driven redraws stay on their grid so the cadence does not drift with the
    /// frame rate; forced redraws restart the grid from `now`.
    fn schedule_next(&mut self, now_ms: u64, forced: bool, interval: u64) {
        let next = match self.next_draw_due_at {
            Some(due) if !forced && now_ms < due.saturating_add(interval) => due + interval,
            _ => now_ms.saturating_add(interval),
        };
        self.next_draw_due_at = Some(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::ProgramRegistry,
        surface::{Color, PixelSurface},
        telemetry::{SimConfig, TelemetrySimulator},
    };
    use proptest::prelude::*;

    fn paint(surface: &mut dyn DrawableSurface, _state: &TelemetryState) -> Result<(), HudError> {
        surface.clear(Color::rgb(10, 20, 30));
        Ok(())
    }

    fn fail(surface: &mut dyn DrawableSurface, _state: &TelemetryState) -> Result<(), HudError> {
        surface.clear(Color::rgb(255, 0, 0));
        Err(HudError::RenderFailed {
            program: "broken".to_string(),
            reason: "missing resource".to_string(),
        })
    }

    fn explode(
        _surface: &mut dyn DrawableSurface,
        _state: &TelemetryState,
    ) -> Result<(), HudError> {
        panic!("render exploded");
    }

    fn registry() -> ProgramRegistry {
        ProgramRegistry::new(vec![
            ProgramDescriptor::new("a", "A", Color::BLACK, 50, paint),
            ProgramDescriptor::new("b", "B", Color::BLACK, 80, paint),
            ProgramDescriptor::new("c", "C", Color::BLACK, 95, paint),
            ProgramDescriptor::new("broken", "Broken", Color::BLACK, 50, fail),
            ProgramDescriptor::new("explode", "Explode", Color::BLACK, 50, explode),
        ])
        .unwrap()
    }

    struct Fixture {
        state: TelemetryState,
        surface: PixelSurface,
        texture: TextureFlag,
        errors: Vec<String>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut sim = TelemetrySimulator::new(SimConfig::default()).unwrap();
            sim.advance(0);
            Self {
                state: sim.state().clone(),
                surface: PixelSurface::new(16, 16).unwrap(),
                texture: TextureFlag::default(),
                errors: Vec::new(),
            }
        }

        fn frame(
            &mut self,
            scheduler: &mut SchedulerSession,
            now: u64,
            program: &ProgramDescriptor,
        ) -> FrameOutcome {
            let errors = &mut self.errors;
            let mut reporter = |id: &str, e: &HudError| errors.push(format!("{}: {}", id, e));
            scheduler.run_frame(
                now,
                program,
                &self.state,
                &mut self.surface,
                &mut self.texture,
                &mut reporter,
            )
        }
    }

    #[test]
    fn test_example_scenario() {
        let registry = registry();
        let mut scheduler = SchedulerSession::new(SchedulerConfig::default()).unwrap();
        let mut fx = Fixture::new();
        let b = registry.resolve_by_id(Some("b"));
        let c = registry.resolve_by_id(Some("c"));

        assert_eq!(fx.frame(&mut scheduler, 0, b), FrameOutcome::Rendered);
        assert_eq!(scheduler.next_draw_due_at(), Some(80));
        assert_eq!(fx.frame(&mut scheduler, 79, b), FrameOutcome::Skipped);
        assert_eq!(fx.frame(&mut scheduler, 80, b), FrameOutcome::Rendered);
        assert_eq!(scheduler.next_draw_due_at(), Some(160));
        assert_eq!(fx.frame(&mut scheduler, 100, c), FrameOutcome::Rendered);
        assert_eq!(scheduler.next_draw_due_at(), Some(195));
        assert_eq!(scheduler.last_program_id(), Some("c"));
    }

    #[test]
    fn test_explicit_redraw_request() {
        let registry = registry();
        let a = registry.resolve_by_id(Some("a"));
        let mut scheduler = SchedulerSession::new(SchedulerConfig::default()).unwrap();
        let mut fx = Fixture::new();
        fx.frame(&mut scheduler, 0, a);
        assert_eq!(fx.frame(&mut scheduler, 10, a), FrameOutcome::Skipped);
        scheduler.request_redraw();
        assert_eq!(fx.frame(&mut scheduler, 11, a), FrameOutcome::Rendered);
        assert_eq!(scheduler.next_draw_due_at(), Some(61));
        scheduler.notify_state_replaced();
        assert!(scheduler.is_due(12));
    }

    #[test]
    fn test_texture_marked_once_per_poll() {
        let registry = registry();
        let a = registry.resolve_by_id(Some("a"));
        let mut scheduler = SchedulerSession::new(SchedulerConfig::default()).unwrap();
        let mut fx = Fixture::new();
        fx.frame(&mut scheduler, 0, a);
        fx.frame(&mut scheduler, 50, a);
        fx.frame(&mut scheduler, 100, a);
        assert_eq!(fx.texture.marks(), 3);
        assert!(fx.texture.take_dirty());
        assert!(!fx.texture.take_dirty());
        fx.frame(&mut scheduler, 120, a);
        assert!(!fx.texture.take_dirty());
    }

    #[test]
    fn test_failed_render_keeps_schedule_and_reports() {
        let registry = registry();
        let broken = registry.resolve_by_id(Some("broken"));
        let mut scheduler = SchedulerSession::new(SchedulerConfig::default()).unwrap();
        let mut fx = Fixture::new();
        assert_eq!(fx.frame(&mut scheduler, 0, broken), FrameOutcome::Failed);
        assert_eq!(scheduler.next_draw_due_at(), Some(50));
        assert!(!scheduler.is_dirty());
        assert!(!fx.texture.is_dirty());
        assert_eq!(fx.errors.len(), 1);
        assert!(fx.errors[0].starts_with("broken: "));
        // not disabled: it is retried at its next due time
        assert_eq!(fx.frame(&mut scheduler, 50, broken), FrameOutcome::Failed);
        assert_eq!(scheduler.stats().failures, 2);
    }

    #[test]
    fn test_panicking_render_is_contained() {
        let registry = registry();
        let explode = registry.resolve_by_id(Some("explode"));
        let a = registry.resolve_by_id(Some("a"));
        let mut scheduler = SchedulerSession::new(SchedulerConfig::default()).unwrap();
        let mut fx = Fixture::new();
        assert_eq!(fx.frame(&mut scheduler, 0, explode), FrameOutcome::Failed);
        assert!(fx.errors[0].contains("panicked"));
        assert_eq!(fx.frame(&mut scheduler, 1, a), FrameOutcome::Rendered);
    }

    #[test]
    fn test_attract_mode_widens_interval() {
        let registry = registry();
        let a = registry.resolve_by_id(Some("a"));
        let mut scheduler = SchedulerSession::new(SchedulerConfig::default()).unwrap();
        let mut fx = Fixture::new();
        scheduler.set_mode(DisplayMode::Attract);
        assert_eq!(scheduler.effective_interval(a), 150);
        fx.frame(&mut scheduler, 0, a);
        assert_eq!(scheduler.next_draw_due_at(), Some(150));
        scheduler.set_mode(DisplayMode::Active);
        assert_eq!(fx.frame(&mut scheduler, 150, a), FrameOutcome::Rendered);
        assert_eq!(scheduler.next_draw_due_at(), Some(200));
    }

    #[test]
    fn test_interval_override() {
        let registry = registry();
        let c = registry.resolve_by_id(Some("c"));
        let scheduler = SchedulerSession::new(SchedulerConfig {
            interval_override_ms: Some(20),
            ..SchedulerConfig::default()
        })
        .unwrap();
        assert_eq!(scheduler.effective_interval(c), 20);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(
            SchedulerSession::new(SchedulerConfig {
                attract_factor: 1,
                ..SchedulerConfig::default()
            })
            .is_err()
        );
        assert!(
            SchedulerSession::new(SchedulerConfig {
                interval_override_ms: Some(0),
                ..SchedulerConfig::default()
            })
            .is_err()
        );
    }

    #[test]
    fn test_falling_behind_resyncs_grid() {
        let registry = registry();
        let a = registry.resolve_by_id(Some("a"));
        let mut scheduler = SchedulerSession::new(SchedulerConfig::default()).unwrap();
        let mut fx = Fixture::new();
        fx.frame(&mut scheduler, 0, a);
        // host stalled for several intervals: no burst of catch-up renders
        assert_eq!(fx.frame(&mut scheduler, 500, a), FrameOutcome::Rendered);
        assert_eq!(scheduler.next_draw_due_at(), Some(550));
        assert_eq!(fx.frame(&mut scheduler, 516, a), FrameOutcome::Skipped);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_render_count_follows_interval(interval in 20u64..500, frame_ms in 1u64..20) {
            let program = ProgramDescriptor::new("p", "P", Color::BLACK, interval, paint);
            let mut scheduler = SchedulerSession::new(SchedulerConfig::default()).unwrap();
            let mut fx = Fixture::new();
            let frames = 1_000u64;
            for frame in 0..frames {
                fx.frame(&mut scheduler, frame * frame_ms, &program);
            }
            let total = (frames * frame_ms) as f64;
            let expected = total / interval as f64;
            let renders = scheduler.stats().renders as f64;
            prop_assert!((renders - expected).abs() <= 1.0 + f64::EPSILON,
                "renders {} expected {}", renders, expected);
        }
    }
}
