mod controls;
mod hud_view;

use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::mpsc::Sender,
    time::{Duration, Instant},
};

use egui::{Color32, ColorImage, TextureHandle, TextureOptions, Visuals, style::Widgets};
use log::{error, info};
use simple_moving_average::{SMA, SumTreeSMA};
use telehud::{
    AppConfig, CrtParams, DisplayMode, DisplaySession, FrameOutcome, TelemetryFrame,
    telemetry::ManualOverrides,
};

use super::{PALETTE_BLACK, PALETTE_DEEP_GREEN, PALETTE_PHOSPHOR};

const HISTORY_POINTS: usize = 300;
const FRAME_TIME_WINDOW: usize = 60;
const DEFAULT_WINDOW_TRANSPARENCY: u8 = 220;

/// `LiveHudApp` drives one display session from the egui frame loop and shows the
/// rendered surface as a texture.
///
/// The texture is re-uploaded only when the session reports a completed render, and the
/// session drops into attract mode after the configured idle time without input.
pub struct LiveHudApp {
    session: DisplaySession,
    app_config: AppConfig,
    /// Where the config came from; the user config file when `None`
    config_path: Option<PathBuf>,
    crt: CrtParams,
    texture: Option<TextureHandle>,
    started: Instant,
    last_input: Instant,
    last_update: Option<Instant>,
    frame_times: SumTreeSMA<f32, f32, FRAME_TIME_WINDOW>,
    load_history: VecDeque<f32>,
    overrides: ManualOverrides,
    recorder: Option<Sender<TelemetryFrame>>,
}

impl LiveHudApp {
    pub fn new(
        session: DisplaySession,
        app_config: AppConfig,
        config_path: Option<PathBuf>,
        recorder: Option<Sender<TelemetryFrame>>,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let default_visuals = Visuals {
            dark_mode: true,
            hyperlink_color: PALETTE_PHOSPHOR,
            faint_bg_color: PALETTE_BLACK,
            extreme_bg_color: PALETTE_DEEP_GREEN,
            panel_fill: PALETTE_BLACK,
            button_frame: true,
            window_fill: Color32::from_rgba_premultiplied(
                PALETTE_BLACK.r(),
                PALETTE_BLACK.g(),
                PALETTE_BLACK.b(),
                DEFAULT_WINDOW_TRANSPARENCY,
            ),
            widgets: Widgets::dark(),
            striped: false,
            ..Default::default()
        };
        cc.egui_ctx.set_visuals(default_visuals);

        let now = Instant::now();
        Self {
            session,
            crt: app_config.crt.clone(),
            app_config,
            config_path,
            texture: None,
            started: now,
            last_input: now,
            last_update: None,
            frame_times: SumTreeSMA::new(),
            load_history: VecDeque::with_capacity(HISTORY_POINTS),
            overrides: ManualOverrides::default(),
            recorder,
        }
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn update_mode(&mut self, ctx: &egui::Context) {
        let active = ctx.input(|i| i.pointer.is_moving() || !i.events.is_empty());
        if active {
            self.last_input = Instant::now();
            if self.session.mode() == DisplayMode::Attract {
                info!("Input detected, leaving attract mode");
                self.session.set_mode(DisplayMode::Active);
            }
        } else if self.session.mode() == DisplayMode::Active
            && self.last_input.elapsed()
                >= Duration::from_millis(self.app_config.scheduler.attract_idle_ms)
        {
            info!("No input for {:?}, entering attract mode", self.last_input.elapsed());
            self.session.set_mode(DisplayMode::Attract);
        }
    }

    fn record(&mut self, now_ms: u64) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        if let Err(e) = recorder.send(self.session.snapshot(now_ms)) {
            error!("Telemetry recorder stopped: {}", e);
            self.recorder = None;
        }
    }

    fn upload_texture(&mut self, ctx: &egui::Context) {
        let Some(surface) = self.session.take_texture_update() else {
            return;
        };
        let image = ColorImage::from_rgba_unmultiplied(surface.size(), surface.as_rgba());
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("hud-surface", image, TextureOptions::NEAREST))
            }
        }
    }

    pub(crate) fn average_frame_ms(&self) -> f32 {
        self.frame_times.get_average()
    }
}

impl eframe::App for LiveHudApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.app_config.program = Some(self.session.active_program().id.clone());
        if let Err(e) = self.app_config.save_at(self.config_path.as_deref()) {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let update_start = Instant::now();
        if let Some(last) = self.last_update.replace(update_start) {
            self.frame_times
                .add_sample(update_start.duration_since(last).as_secs_f32() * 1000.);
        }

        self.update_mode(ctx);

        let now_ms = self.now_ms();
        if self.session.frame(now_ms) == FrameOutcome::Rendered {
            self.record(now_ms);
        }
        self.upload_texture(ctx);

        if self.load_history.len() == HISTORY_POINTS {
            self.load_history.pop_front();
        }
        self.load_history
            .push_back(self.session.telemetry().system.mean_load());

        self.hud_view(ctx);
        self.controls_view(ctx);

        // wake up for the next scheduled draw; input wakes egui on its own
        let wait = self
            .session
            .next_draw_due_at()
            .map(|due| due.saturating_sub(self.now_ms()))
            .unwrap_or(0);
        ctx.request_repaint_after(Duration::from_millis(wait));
    }
}
