use egui::{Grid, RichText, Slider, Ui};
use telehud::{
    postfx::UniformValue,
    telemetry::{FieldRange, ManualOverrides},
};

use super::LiveHudApp;

/// Slider that pins a value while its checkbox is ticked.
fn pin_slider(
    ui: &mut Ui,
    label: &str,
    value: &mut Option<f32>,
    range: FieldRange,
    live: f32,
) -> bool {
    let mut pinned = value.is_some();
    let mut changed = ui.checkbox(&mut pinned, label).changed();
    match (pinned, value.as_mut()) {
        (true, Some(v)) => {
            changed |= ui.add(Slider::new(v, range.min..=range.max)).changed();
        }
        (true, None) => *value = Some(live),
        (false, _) => *value = None,
    }
    changed
}

fn pin_toggle(ui: &mut Ui, label: &str, value: &mut Option<bool>, live: bool) -> bool {
    let mut pinned = value.is_some();
    let mut changed = ui.checkbox(&mut pinned, format!("Pin {}", label)).changed();
    match (pinned, value.as_mut()) {
        (true, Some(v)) => changed |= ui.checkbox(v, label).changed(),
        (true, None) => *value = Some(live),
        (false, _) => *value = None,
    }
    changed
}

impl LiveHudApp {
    pub(crate) fn controls_view(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("controls")
            .resizable(false)
            .default_width(220.)
            .show(ctx, |ui| {
                ui.heading("Overrides");
                let ranges = self.session.telemetry_ranges().clone();
                let state = self.session.telemetry();
                let (scan, tech) = (state.scan.clone(), state.tech.clone());

                let overrides: &mut ManualOverrides = &mut self.overrides;
                let mut changed = false;
                changed |= pin_slider(
                    ui,
                    "Energy level",
                    &mut overrides.energy_level,
                    ranges.energy_level,
                    tech.energy_level,
                );
                changed |= pin_slider(
                    ui,
                    "Exposure time",
                    &mut overrides.exposure_time,
                    ranges.exposure_time,
                    tech.exposure_time,
                );
                changed |= pin_slider(
                    ui,
                    "Scan resolution",
                    &mut overrides.scan_resolution,
                    ranges.scan_resolution,
                    scan.scan_resolution,
                );
                changed |= pin_slider(
                    ui,
                    "Target size",
                    &mut overrides.target_size,
                    ranges.target_size,
                    scan.target_size,
                );
                ui.separator();
                changed |= pin_toggle(ui, "grid", &mut overrides.show_grid, scan.show_grid);
                changed |= pin_toggle(ui, "target", &mut overrides.show_target, scan.show_target);
                changed |= pin_toggle(
                    ui,
                    "auto-rotate",
                    &mut overrides.auto_rotate,
                    scan.auto_rotate,
                );
                if changed {
                    self.session.set_overrides(self.overrides.clone());
                    self.session.request_redraw();
                }

                ui.separator();
                if ui.button("Redraw").clicked() {
                    self.session.request_redraw();
                }

                ui.separator();
                ui.heading("CRT uniforms");
                let uniforms = self
                    .crt
                    .with_chromatic(&self.session.telemetry().chromatic)
                    .uniforms();
                Grid::new("uniforms").striped(true).show(ui, |ui| {
                    for uniform in uniforms {
                        ui.label(RichText::new(&uniform.name).monospace());
                        match uniform.value {
                            UniformValue::Float(v) => ui.label(format!("{:.3}", v)),
                            UniformValue::Vec3([x, y, z]) => {
                                ui.label(format!("{:.2} {:.2} {:.2}", x, y, z))
                            }
                        };
                        ui.end_row();
                    }
                });
            });
    }
}
