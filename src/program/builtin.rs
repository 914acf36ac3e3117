//! Stock HUD programs. Each one is a thin painter over the shared telemetry snapshot.

use std::f32::consts::TAU;

use itertools::Itertools;

use crate::{
    HudError,
    surface::{Color, DrawableSurface},
    telemetry::{AlertStatus, TelemetryState, signal::hash_unit},
};

use super::{ProgramDescriptor, ProgramRegistry};

const BACKGROUND: Color = Color::rgb(4, 10, 8);

const SONAR_TINT: Color = Color::rgb(80, 255, 160);
const ORBITAL_TINT: Color = Color::rgb(120, 200, 255);
const TIMETABLE_TINT: Color = Color::rgb(255, 190, 90);
const QUANTUM_TINT: Color = Color::rgb(200, 120, 255);
const STARFIELD_TINT: Color = Color::rgb(220, 230, 255);
const SCOPE_TINT: Color = Color::rgb(90, 255, 255);
const REACTOR_TINT: Color = Color::rgb(255, 110, 70);
const NAV_TINT: Color = Color::rgb(140, 255, 120);
const BIO_TINT: Color = Color::rgb(255, 120, 170);
const COMMS_TINT: Color = Color::rgb(255, 240, 120);

/// The ten programs shipped with telehud, in picker order.
pub fn builtin_registry() -> Result<ProgramRegistry, HudError> {
    ProgramRegistry::new(vec![
        ProgramDescriptor::new("sonar", "Sonar Console", SONAR_TINT, 50, sonar),
        ProgramDescriptor::new("orbital_dock", "Orbital Dock", ORBITAL_TINT, 80, orbital_dock),
        ProgramDescriptor::new("time_table", "Time Table", TIMETABLE_TINT, 95, time_table),
        ProgramDescriptor::new("quantum_relay", "Quantum Relay", QUANTUM_TINT, 60, quantum_relay),
        ProgramDescriptor::new("starfield", "Starfield", STARFIELD_TINT, 40, starfield),
        ProgramDescriptor::new("signal_scope", "Signal Scope", SCOPE_TINT, 50, signal_scope),
        ProgramDescriptor::new("reactor_core", "Reactor Core", REACTOR_TINT, 70, reactor_core),
        ProgramDescriptor::new("nav_grid", "Navigation Grid", NAV_TINT, 100, nav_grid),
        ProgramDescriptor::new("bio_scan", "Bio Scan", BIO_TINT, 90, bio_scan),
        ProgramDescriptor::new("comms_array", "Comms Array", COMMS_TINT, 120, comms_array),
    ])
}

fn status_color(status: AlertStatus, tint: Color) -> Color {
    match status {
        AlertStatus::Nominal => tint,
        AlertStatus::Caution => Color::rgb(255, 220, 60),
        AlertStatus::Alert => Color::rgb(255, 140, 30),
        AlertStatus::Critical => Color::rgb(255, 40, 40),
    }
}

fn center(surface: &dyn DrawableSurface) -> (f32, f32) {
    (surface.width() as f32 / 2., surface.height() as f32 / 2.)
}

fn radius(surface: &dyn DrawableSurface) -> f32 {
    surface.width().min(surface.height()) as f32 * 0.45
}

/// Clears the frame and draws the optional grid every program shares.
fn backdrop(surface: &mut dyn DrawableSurface, state: &TelemetryState, tint: Color) {
    surface.clear(BACKGROUND);
    if !state.scan.show_grid {
        return;
    }
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    // coarser resolution means wider grid cells
    let step = (64. * (1.1 - state.scan.scan_resolution)).max(8.);
    let grid = tint.dimmed(0.18);
    let mut x = 0.;
    while x < w {
        surface.line((x, 0.), (x, h), grid);
        x += step;
    }
    let mut y = 0.;
    while y < h {
        surface.line((0., y), (w, y), grid);
        y += step;
    }
}

fn target_marker(surface: &mut dyn DrawableSurface, state: &TelemetryState, color: Color) {
    if !state.scan.show_target {
        return;
    }
    let (x, y) = (state.scan.target_x, state.scan.target_y);
    let size = 4. + state.scan.target_size * 20.;
    surface.circle((x, y), size, color);
    surface.line((x - size * 1.5, y), (x + size * 1.5, y), color);
    surface.line((x, y - size * 1.5), (x, y + size * 1.5), color);
}

fn bar_chart(
    surface: &mut dyn DrawableSurface,
    values: &[f32],
    area: (f32, f32, f32, f32),
    color: Color,
) {
    let (x, y, w, h) = area;
    if values.is_empty() {
        return;
    }
    let bar_w = w / values.len() as f32;
    for (i, value) in values.iter().enumerate() {
        let bar_h = h * value.clamp(0., 1.);
        surface.fill_rect(x + i as f32 * bar_w, y + h - bar_h, (bar_w - 1.).max(1.), bar_h, color);
    }
}

fn waveform(
    surface: &mut dyn DrawableSurface,
    values: &[f32],
    area: (f32, f32, f32, f32),
    color: Color,
) {
    let (x, y, w, h) = area;
    if values.len() < 2 {
        return;
    }
    let step = w / (values.len() - 1) as f32;
    let points = values
        .iter()
        .enumerate()
        .map(|(i, v)| (x + i as f32 * step, y + h / 2. - v.clamp(-1., 1.) * h / 2.));
    for (from, to) in points.tuple_windows() {
        surface.line(from, to, color);
    }
}

fn sonar(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    backdrop(surface, state, SONAR_TINT);
    let c = center(surface);
    let r = radius(surface);
    for ring in 1..=4 {
        surface.circle(c, r * ring as f32 / 4., SONAR_TINT.dimmed(0.5));
    }
    // fading trail behind the sweep arm
    for trail in 0..24 {
        let angle = (state.scan.scan_progress - trail as f32 * 0.004) * TAU;
        let fade = 1. - trail as f32 / 24.;
        surface.line(
            c,
            (c.0 + r * angle.cos(), c.1 + r * angle.sin()),
            SONAR_TINT.with_alpha(fade),
        );
    }
    target_marker(surface, state, status_color(state.system.status, SONAR_TINT));
    Ok(())
}

fn orbital_dock(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    backdrop(surface, state, ORBITAL_TINT);
    let c = center(surface);
    let r = radius(surface);
    surface.fill_circle(c, r * 0.12, ORBITAL_TINT.dimmed(0.6));
    for (i, fuel) in state.system.fuel_levels.iter().enumerate() {
        let orbit = r * (0.3 + 0.17 * i as f32);
        surface.circle(c, orbit, ORBITAL_TINT.dimmed(0.4));
        let angle = state.tech.rotation_angle.to_radians() * (1. + i as f32 * 0.35);
        let craft = (c.0 + orbit * angle.cos(), c.1 + orbit * angle.sin());
        surface.fill_circle(craft, 2. + fuel * 5., ORBITAL_TINT);
    }
    Ok(())
}

fn time_table(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    backdrop(surface, state, TIMETABLE_TINT);
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let rows = state.system.fuel_levels.len().max(1);
    let row_h = h * 0.8 / rows as f32;
    for (i, level) in state.system.fuel_levels.iter().enumerate() {
        let y = h * 0.1 + i as f32 * row_h;
        surface.fill_rect(w * 0.1, y, w * 0.8, row_h * 0.6, TIMETABLE_TINT.dimmed(0.2));
        surface.fill_rect(w * 0.1, y, w * 0.8 * level, row_h * 0.6, TIMETABLE_TINT);
    }
    let cursor = w * 0.1 + w * 0.8 * state.scan.scan_progress;
    surface.line((cursor, h * 0.05), (cursor, h * 0.95), Color::rgb(255, 255, 255).with_alpha(0.6));
    Ok(())
}

fn quantum_relay(
    surface: &mut dyn DrawableSurface,
    state: &TelemetryState,
) -> Result<(), HudError> {
    backdrop(surface, state, QUANTUM_TINT);
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    waveform(surface, &state.system.noise_buffer, (0., h * 0.2, w, h * 0.6), QUANTUM_TINT);
    let entangled = state.system.signal_strength * w;
    surface.fill_rect(
        0.,
        h * 0.9,
        entangled,
        h * 0.04,
        status_color(state.system.status, QUANTUM_TINT),
    );
    Ok(())
}

fn starfield(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    surface.clear(Color::BLACK);
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let c = center(surface);
    // fixed star layout per generation; stars stream outward with scan progress
    for star in 0..160u64 {
        let angle = hash_unit(state.generation, star, 1) as f32 * TAU;
        let depth =
            (hash_unit(state.generation, star, 2) as f32 + state.scan.scan_progress).fract();
        let distance = depth * depth * w.max(h) * 0.7;
        let pos = (c.0 + distance * angle.cos(), c.1 + distance * angle.sin());
        let size = 1. + depth * 2.;
        surface.fill_rect(pos.0, pos.1, size, size, STARFIELD_TINT.with_alpha(depth));
    }
    Ok(())
}

fn signal_scope(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    backdrop(surface, state, SCOPE_TINT);
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    waveform(surface, &state.system.noise_buffer, (0., 0., w, h * 0.7), SCOPE_TINT.dimmed(0.7));
    let meter = status_color(state.system.status, SCOPE_TINT);
    surface.fill_rect(w * 0.05, h * 0.8, w * 0.9, h * 0.08, SCOPE_TINT.dimmed(0.2));
    surface.fill_rect(w * 0.05, h * 0.8, w * 0.9 * state.system.signal_strength, h * 0.08, meter);
    Ok(())
}

fn reactor_core(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    backdrop(surface, state, REACTOR_TINT);
    let c = center(surface);
    let r = radius(surface);
    // energy level spans [50, 200] by default
    let charge = ((state.tech.energy_level - 50.) / 150.).clamp(0., 1.);
    surface.fill_circle(c, r * (0.2 + 0.6 * charge), REACTOR_TINT.with_alpha(0.5));
    surface.fill_circle(c, r * 0.15, status_color(state.system.status, REACTOR_TINT));
    surface.circle(c, r, REACTOR_TINT);
    let angle = state.scan.scan_progress * TAU;
    for spoke in 0..6 {
        let a = angle + spoke as f32 * TAU / 6.;
        surface.line(c, (c.0 + r * a.cos(), c.1 + r * a.sin()), REACTOR_TINT.dimmed(0.6));
    }
    Ok(())
}

fn nav_grid(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    backdrop(surface, state, NAV_TINT);
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let heading = state.tech.rotation_angle.to_radians();
    let c = center(surface);
    surface.line(c, (c.0 + w * 0.3 * heading.cos(), c.1 + h * 0.3 * heading.sin()), NAV_TINT);
    target_marker(surface, state, status_color(state.system.status, NAV_TINT));
    Ok(())
}

fn bio_scan(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    backdrop(surface, state, BIO_TINT);
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let slice = (state.tech.slice_thickness * 2.).max(1.);
    let y = h * state.scan.scan_progress;
    surface.fill_rect(0., y - slice / 2., w, slice, BIO_TINT.with_alpha(0.7));
    let depth = h * state.tech.insertion_depth / 100.;
    surface.line((w * 0.5, 0.), (w * 0.5, depth), BIO_TINT);
    target_marker(surface, state, status_color(state.system.status, BIO_TINT));
    Ok(())
}

fn comms_array(surface: &mut dyn DrawableSurface, state: &TelemetryState) -> Result<(), HudError> {
    backdrop(surface, state, COMMS_TINT);
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let color = status_color(state.system.status, COMMS_TINT);
    bar_chart(surface, &state.system.load_history, (w * 0.05, h * 0.1, w * 0.9, h * 0.6), color);
    surface.fill_rect(w * 0.05, h * 0.8, w * 0.9 * state.system.stress_score, h * 0.06, color);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::PixelSurface;
    use crate::telemetry::{SimConfig, TelemetrySimulator};

    fn state() -> TelemetryState {
        let mut sim = TelemetrySimulator::new(SimConfig::default()).unwrap();
        sim.advance(0);
        sim.advance(16);
        sim.state().clone()
    }

    #[test]
    fn test_builtin_registry_has_ten_programs() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.default_program().id, "sonar");
        assert_eq!(registry.resolve_by_id(Some("7")), registry.resolve_by_index(7));
    }

    #[test]
    fn test_programs_repaint_whole_surface() {
        let registry = builtin_registry().unwrap();
        let state = state();
        for program in registry.iter() {
            let mut surface = PixelSurface::new(64, 48).unwrap();
            // garbage from a previous frame must not survive
            surface.clear(Color::rgba(1, 2, 3, 4));
            program.render(&mut surface, &state).unwrap();
            assert!(
                surface.as_rgba().chunks_exact(4).all(|px| px != [1, 2, 3, 4]),
                "{} left stale pixels",
                program.id
            );
        }
    }

    #[test]
    fn test_programs_are_deterministic() {
        let registry = builtin_registry().unwrap();
        let state = state();
        for program in registry.iter() {
            let mut a = PixelSurface::new(80, 60).unwrap();
            let mut b = PixelSurface::new(80, 60).unwrap();
            program.render(&mut a, &state).unwrap();
            program.render(&mut b, &state).unwrap();
            assert_eq!(a, b, "{} is not deterministic", program.id);
        }
    }
}
