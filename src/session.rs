use std::sync::Arc;

use log::debug;

use crate::{
    HudError,
    config::AppConfig,
    program::{ProgramDescriptor, ProgramRegistry, ProgramSelector},
    scheduler::{
        DisplayMode, ErrorReporter, FrameOutcome, LogErrorReporter, SchedulerConfig,
        SchedulerSession, SessionStats, TextureFlag,
    },
    surface::PixelSurface,
    telemetry::{
        AdvanceOutcome, ManualOverrides, SimConfig, TelemetryRanges, TelemetrySimulator,
        TelemetryState,
    },
    writer::TelemetryFrame,
};

/// One displayed panel: its own simulator, scheduler session and surfaces.
///
/// Nothing mutable is shared between sessions; only the registry is, read-only. Every
/// frame runs the fixed pipeline advance -> resolve -> decide -> render.
///
/// The simulated target ranges are clipped to the surface so target coordinates are
/// always surface pixels.
///
/// Programs paint into a back buffer which is published only after a successful render,
/// so a failing program leaves the last good frame on screen.
pub struct DisplaySession {
    registry: Arc<ProgramRegistry>,
    /// Registry position of the selected program, resolved once per selection
    active: usize,
    simulator: TelemetrySimulator,
    scheduler: SchedulerSession,
    front: PixelSurface,
    back: PixelSurface,
    texture: TextureFlag,
    reporter: Box<dyn ErrorReporter + Send>,
}

impl DisplaySession {
    pub fn new(
        registry: Arc<ProgramRegistry>,
        mut simulation: SimConfig,
        scheduler: SchedulerConfig,
        width: usize,
        height: usize,
    ) -> Result<Self, HudError> {
        let front = PixelSurface::new(width, height)?;
        simulation.ranges = simulation.ranges.fit_to_surface(width, height);
        Ok(Self {
            registry,
            active: 0,
            simulator: TelemetrySimulator::new(simulation)?,
            scheduler: SchedulerSession::new(scheduler)?,
            back: front.clone(),
            front,
            texture: TextureFlag::default(),
            reporter: Box::new(LogErrorReporter),
        })
    }

    pub fn from_config(
        registry: Arc<ProgramRegistry>,
        config: &AppConfig,
    ) -> Result<Self, HudError> {
        let mut session = Self::new(
            registry,
            config.simulation.clone(),
            config.scheduler.clone(),
            config.surface_width,
            config.surface_height,
        )?;
        session.select(config.program.as_deref());
        Ok(session)
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ErrorReporter + Send>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn select(&mut self, selector: impl Into<ProgramSelector>) {
        self.active = self.registry.resolve_position(selector);
    }

    pub fn active_program(&self) -> &ProgramDescriptor {
        self.registry.resolve_by_index(self.active as i64)
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn telemetry(&self) -> &TelemetryState {
        self.simulator.state()
    }

    pub fn telemetry_ranges(&self) -> &TelemetryRanges {
        &self.simulator.config().ranges
    }

    pub fn set_overrides(&mut self, overrides: ManualOverrides) {
        self.simulator.set_overrides(overrides);
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.scheduler.set_mode(mode);
    }

    pub fn mode(&self) -> DisplayMode {
        self.scheduler.mode()
    }

    pub fn request_redraw(&mut self) {
        self.scheduler.request_redraw();
    }

    pub fn stats(&self) -> SessionStats {
        self.scheduler.stats()
    }

    pub fn next_draw_due_at(&self) -> Option<u64> {
        self.scheduler.next_draw_due_at()
    }

    /// Last successfully rendered frame.
    pub fn surface(&self) -> &PixelSurface {
        &self.front
    }

    /// The surface to upload, if anything was rendered since the last call.
    pub fn take_texture_update(&mut self) -> Option<&PixelSurface> {
        if self.texture.take_dirty() {
            Some(&self.front)
        } else {
            None
        }
    }

    pub fn frame(&mut self, now_ms: u64) -> FrameOutcome {
        if self.simulator.advance(now_ms) == AdvanceOutcome::Regenerated {
            self.scheduler.notify_state_replaced();
        }

        let program = self.registry.resolve_by_index(self.active as i64);
        let outcome = self.scheduler.run_frame(
            now_ms,
            program,
            self.simulator.state(),
            &mut self.back,
            &mut self.texture,
            self.reporter.as_mut(),
        );

        if outcome == FrameOutcome::Rendered {
            std::mem::swap(&mut self.front, &mut self.back);
            debug!("Published frame of '{}' at {} ms", program.id, now_ms);
        }
        outcome
    }

    pub fn snapshot(&self, now_ms: u64) -> TelemetryFrame {
        TelemetryFrame {
            timestamp_ms: now_ms,
            program_id: self.active_program().id.clone(),
            state: self.simulator.state().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::builtin_registry,
        surface::{Color, DrawableSurface},
    };
    use std::sync::Mutex;

    fn session() -> DisplaySession {
        DisplaySession::new(
            Arc::new(builtin_registry().unwrap()),
            SimConfig::default(),
            SchedulerConfig::default(),
            64,
            48,
        )
        .unwrap()
    }

    #[test]
    fn test_first_frame_renders_default_program() {
        let mut session = session();
        assert_eq!(session.frame(0), FrameOutcome::Rendered);
        assert_eq!(session.active_program().id, "sonar");
        assert!(session.take_texture_update().is_some());
        assert!(session.take_texture_update().is_none());
    }

    #[test]
    fn test_selecting_program_forces_redraw() {
        let mut session = session();
        session.frame(0);
        assert_eq!(session.frame(16), FrameOutcome::Skipped);
        session.select(7i64);
        assert_eq!(session.frame(20), FrameOutcome::Rendered);
        assert_eq!(session.active_program().id, "nav_grid");
        assert_eq!(session.next_draw_due_at(), Some(120));
    }

    #[test]
    fn test_stale_regeneration_forces_redraw() {
        let mut session = session();
        session.frame(0);
        session.frame(16);
        // 10 s suspension: state regenerates and the frame redraws even if not due
        assert_eq!(session.frame(10_016), FrameOutcome::Rendered);
        assert_eq!(session.telemetry().generation, 1);
    }

    #[test]
    fn test_targets_stay_on_small_surface() {
        let mut session = session();
        let ranges = session.telemetry_ranges().clone();
        assert_eq!(ranges.target_x.max, 64.);
        assert_eq!(ranges.target_y.max, 48.);
        for now in (0..20_000).step_by(16) {
            session.frame(now);
            let scan = &session.telemetry().scan;
            assert!((0. ..=64.).contains(&scan.target_x), "target_x {}", scan.target_x);
            assert!((0. ..=48.).contains(&scan.target_y), "target_y {}", scan.target_y);
        }
    }

    #[test]
    fn test_unknown_program_resolved_once() {
        let mut session = session();
        session.select("does-not-exist");
        assert_eq!(session.active, 0);
        session.select("nav_grid");
        assert_eq!(session.active, 7);
        assert_eq!(session.frame(0), FrameOutcome::Rendered);
        assert_eq!(session.active_program().id, "nav_grid");
    }

    #[test]
    fn test_oversized_surface_rejected() {
        let config = AppConfig {
            surface_width: usize::MAX / 2,
            surface_height: 3,
            ..AppConfig::default()
        };
        let result = DisplaySession::from_config(Arc::new(builtin_registry().unwrap()), &config);
        assert!(matches!(result, Err(HudError::InvalidSurface { height: 3, .. })));
    }

    #[test]
    fn test_invalid_surface_rejected() {
        let result = DisplaySession::new(
            Arc::new(builtin_registry().unwrap()),
            SimConfig::default(),
            SchedulerConfig::default(),
            0,
            48,
        );
        assert!(matches!(result, Err(HudError::InvalidSurface { .. })));
    }

    fn flaky(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
        // partial paint before failing must never reach the front buffer
        surface.clear(Color::rgb(255, 0, 255));
        if state.generation == 0 {
            return Err(HudError::RenderFailed {
                program: "flaky".to_string(),
                reason: "transient".to_string(),
            });
        }
        Ok(())
    }

    #[test]
    fn test_reporter_receives_failures() {
        let registry = ProgramRegistry::new(vec![ProgramDescriptor::new(
            "flaky",
            "Flaky",
            Color::BLACK,
            50,
            flaky,
        )])
        .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut session = DisplaySession::new(
            Arc::new(registry),
            SimConfig::default(),
            SchedulerConfig::default(),
            8,
            8,
        )
        .unwrap()
        .with_reporter(Box::new(move |id: &str, _e: &HudError| {
            sink.lock().unwrap().push(id.to_string())
        }));

        let before = session.surface().clone();
        assert_eq!(session.frame(0), FrameOutcome::Failed);
        assert_eq!(session.surface(), &before);
        assert!(session.take_texture_update().is_none());
        assert_eq!(seen.lock().unwrap().as_slice(), ["flaky".to_string()]);

        // after a suspension the state regenerates and the program recovers
        assert_eq!(session.frame(5_000), FrameOutcome::Rendered);
        assert_eq!(session.surface().pixel(0, 0), Some(Color::rgb(255, 0, 255)));
    }
}
