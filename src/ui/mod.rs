use egui::Color32;
use telehud::{surface::Color, telemetry::AlertStatus};

pub(crate) mod live;

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(8, 14, 12);
pub(crate) const PALETTE_DEEP_GREEN: Color32 = Color32::from_rgb(18, 48, 36);
pub(crate) const PALETTE_PHOSPHOR: Color32 = Color32::from_rgb(64, 255, 160);
pub(crate) const PALETTE_AMBER: Color32 = Color32::from_rgb(255, 176, 0);

pub(crate) fn to_color32(color: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

pub(crate) fn status_color(status: AlertStatus) -> Color32 {
    match status {
        AlertStatus::Nominal => PALETTE_PHOSPHOR,
        AlertStatus::Caution => Color32::YELLOW,
        AlertStatus::Alert => PALETTE_AMBER,
        AlertStatus::Critical => Color32::RED,
    }
}

/// Linear blend between two colors, `t` clamped to `[0, 1]`.
pub(crate) fn stroke_shade(start: Color32, end: Color32, t: f32) -> Color32 {
    let t = t.clamp(0., 1.);
    let mix = |a: u8, b: u8| (a as f32 + t * (b as f32 - a as f32)).round() as u8;
    Color32::from_rgb(
        mix(start.r(), end.r()),
        mix(start.g(), end.g()),
        mix(start.b(), end.b()),
    )
}
