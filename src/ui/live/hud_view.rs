use std::sync::Arc;

use egui::{Align, Color32, ComboBox, Frame, Layout, RichText, Vec2b, load::SizedTexture};
use egui_plot::{Line, PlotPoints};
use telehud::DisplayMode;

use crate::ui::{PALETTE_AMBER, PALETTE_PHOSPHOR, status_color, stroke_shade, to_color32};

use super::{HISTORY_POINTS, LiveHudApp};

impl LiveHudApp {
    pub(crate) fn hud_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("programs")
            .min_height(30.)
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    ui.add_space(10.);
                    self.program_picker(ui);

                    let system = &self.session.telemetry().system;
                    ui.colored_label(
                        status_color(system.status),
                        RichText::new(system.status.to_string()).strong(),
                    );

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.add_space(10.);
                        let stats = self.session.stats();
                        ui.label(format!(
                            "{:.1} ms/frame | {} renders | {} failed",
                            self.average_frame_ms(),
                            stats.renders,
                            stats.failures
                        ));
                        if self.session.mode() == DisplayMode::Attract {
                            ui.colored_label(PALETTE_AMBER, "ATTRACT");
                        }
                    });
                });
            });

        egui::TopBottomPanel::bottom("load-history")
            .min_height(90.)
            .show(ctx, |ui| {
                let points: Vec<[f64; 2]> = self
                    .load_history
                    .iter()
                    .enumerate()
                    .map(|(i, load)| [i as f64, *load as f64])
                    .collect();

                egui_plot::Plot::new("load")
                    .allow_drag(false)
                    .allow_scroll(false)
                    .allow_zoom(false)
                    .include_x(0.)
                    .include_x(HISTORY_POINTS as f64)
                    .include_y(0.)
                    .include_y(1.)
                    .auto_bounds(Vec2b::new(true, false))
                    .show_grid(false)
                    .show_background(false)
                    .show(ui, |plot_ui| {
                        plot_ui.line(
                            Line::new("Load", PlotPoints::new(points))
                                .gradient_color(
                                    Arc::new(|point| {
                                        stroke_shade(PALETTE_PHOSPHOR, Color32::RED, point.y as f32)
                                    }),
                                    true,
                                )
                                .fill(0.),
                        );
                    });
            });

        egui::CentralPanel::default()
            .frame(Frame::new().fill(Color32::BLACK))
            .show(ctx, |ui| {
                ui.centered_and_justified(|ui| match &self.texture {
                    Some(texture) => {
                        ui.add(
                            egui::Image::from_texture(SizedTexture::from_handle(texture))
                                .shrink_to_fit(),
                        );
                    }
                    None => {
                        ui.label("Waiting for first frame...");
                    }
                });
            });
    }

    fn program_picker(&mut self, ui: &mut egui::Ui) {
        let active = self.session.active_program();
        let mut selected = active.id.clone();
        ComboBox::from_id_salt("program")
            .selected_text(RichText::new(&active.label).color(to_color32(active.tint)))
            .show_ui(ui, |ui| {
                for program in self.session.registry().iter() {
                    ui.selectable_value(&mut selected, program.id.clone(), &program.label);
                }
            });
        if selected != self.session.active_program().id {
            self.session.select(selected);
        }
    }
}
