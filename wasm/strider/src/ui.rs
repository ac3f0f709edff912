//! UI systems for the walker.
//!
//! egui control panel: body plan selection, reset, an on-screen touch pad and a
//! readout of the last frame report.

use std::collections::BTreeMap;

use bevy::prelude::*;
use bevy_egui::egui::{self, Color32, FontFamily, FontId, Margin, Stroke, TextStyle};
use bevy_egui::EguiContexts;

use strider_physics::{BodyPlanSelector, InputEvent, LogicalKey};

use crate::input::keyboard_holds;
use crate::web_bevy::StriderState;

mod colors {
    use bevy_egui::egui::{Color32, Stroke};

    /// Semi-transparent black background (70% opacity)
    pub fn bg() -> Color32 {
        Color32::from_rgba_unmultiplied(0, 0, 0, 180)
    }

    pub fn text() -> Color32 {
        Color32::from_gray(160)
    }

    pub fn text_hovered() -> Color32 {
        Color32::from_gray(220)
    }

    pub fn text_active() -> Color32 {
        Color32::from_gray(240)
    }

    pub fn border() -> Stroke {
        Stroke::new(1.0, text())
    }
}

/// Apply the high-contrast dark theme once.
pub fn apply_theme(mut contexts: EguiContexts, mut applied: Local<bool>) {
    if *applied {
        return;
    }
    let ctx = contexts.ctx_mut();
    let mut style = (*ctx.style()).clone();

    style.text_styles = BTreeMap::from([
        (TextStyle::Heading, FontId::new(16.0, FontFamily::Monospace)),
        (TextStyle::Body, FontId::new(13.0, FontFamily::Monospace)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(13.0, FontFamily::Monospace)),
        (TextStyle::Small, FontId::new(11.0, FontFamily::Monospace)),
    ]);

    style.visuals.window_fill = colors::bg();
    style.visuals.panel_fill = colors::bg();
    style.visuals.window_rounding = egui::Rounding::ZERO;

    style.visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, colors::text());
    style.visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, colors::text());
    style.visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, colors::text_hovered());
    style.visuals.widgets.active.fg_stroke = Stroke::new(1.0, colors::text_active());

    let border = colors::border();
    style.visuals.widgets.noninteractive.bg_stroke = border;
    style.visuals.widgets.inactive.bg_stroke = border;
    style.visuals.widgets.hovered.bg_stroke = border;
    style.visuals.widgets.active.bg_stroke = border;

    style.visuals.override_text_color = Some(colors::text());

    style.spacing.item_spacing = egui::vec2(6.0, 4.0);
    style.spacing.window_margin = Margin::same(8.0);
    style.spacing.button_padding = egui::vec2(6.0, 2.0);

    ctx.set_style(style);
    *applied = true;
}

/// Top-right on desktop, bottom-center on narrow screens.
fn panel_window(ctx: &egui::Context) -> egui::Window<'static> {
    let window = egui::Window::new("Strider")
        .frame(
            egui::Frame::none()
                .fill(colors::bg())
                .rounding(egui::Rounding::ZERO)
                .stroke(colors::border())
                .inner_margin(Margin::symmetric(10.0, 6.0)),
        )
        .collapsible(true)
        .resizable(true);

    if ctx.screen_rect().width() <= 768.0 {
        window.anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -16.0))
    } else {
        window.anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 16.0))
    }
}

/// Which on-screen buttons were held last frame, indexed like [`LogicalKey::ALL`].
#[derive(Resource, Default)]
pub struct TouchPad {
    held: [bool; 6],
}

impl TouchPad {
    pub fn holds(&self, key: LogicalKey) -> bool {
        self.held[key_index(key)]
    }

    /// Diff against the previous frame and remember `now`. A button let go while
    /// `still_held` reports the key down elsewhere produces no release.
    pub fn transitions(&mut self, now: [bool; 6], still_held: impl Fn(LogicalKey) -> bool) -> Vec<InputEvent> {
        let events = LogicalKey::ALL
            .iter()
            .zip(self.held.iter().zip(now.iter()))
            .filter_map(|(key, (was, is))| match (was, is) {
                (false, true) => Some(InputEvent::Pressed(*key)),
                (true, false) if !still_held(*key) => Some(InputEvent::Released(*key)),
                _ => None,
            })
            .collect();
        self.held = now;
        events
    }
}

fn key_index(key: LogicalKey) -> usize {
    LogicalKey::ALL.iter().position(|k| *k == key).unwrap_or(0)
}

enum PanelAction {
    Select(BodyPlanSelector),
    Reset,
    Rebuild,
    TogglePause,
}

fn pad_button(ui: &mut egui::Ui, key: LogicalKey, held: &mut [bool; 6]) {
    let response = ui.add(egui::Button::new(key.label()).min_size(egui::vec2(52.0, 32.0)));
    if response.is_pointer_button_down_on() {
        held[key_index(key)] = true;
    }
}

/// Main UI system - renders the control panel and feeds touch input
pub fn ui_system(
    mut contexts: EguiContexts,
    mut state: ResMut<StriderState>,
    mut pad: ResMut<TouchPad>,
    keyboard: Res<ButtonInput<KeyCode>>,
) {
    let mut held = [false; 6];
    let mut actions = Vec::new();

    if state.ui_visible {
        let ctx = contexts.ctx_mut();
        let view = &*state;

        panel_window(ctx).show(ctx, |ui| {
            egui::CollapsingHeader::new("Body Plan")
                .default_open(true)
                .show(ui, |ui| {
                    egui::ComboBox::from_label("plan")
                        .selected_text(view.selected.label())
                        .show_ui(ui, |ui| {
                            for selector in BodyPlanSelector::ALL {
                                if ui.selectable_label(selector == view.selected, selector.label()).clicked()
                                    && selector != view.selected
                                {
                                    actions.push(PanelAction::Select(selector));
                                }
                            }
                        });
                    ui.horizontal(|ui| {
                        if ui.button("Reset").clicked() {
                            actions.push(PanelAction::Reset);
                        }
                        if ui.button("Rebuild").clicked() {
                            actions.push(PanelAction::Rebuild);
                        }
                        let pause = if view.paused { "Resume" } else { "Pause" };
                        if ui.button(pause).clicked() {
                            actions.push(PanelAction::TogglePause);
                        }
                    });
                });

            egui::CollapsingHeader::new("Controls")
                .default_open(false)
                .show(ui, |ui| {
                    ui.monospace("W/S: Forward/Backward");
                    ui.monospace("A/D: Turn Left/Right");
                    ui.monospace("Shift: Turbo  Space: Jump");
                    ui.monospace("Backspace: Reset  P: Pause  Tab: Hide");
                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.add_space(58.0);
                        pad_button(ui, LogicalKey::Forward, &mut held);
                    });
                    ui.horizontal(|ui| {
                        pad_button(ui, LogicalKey::TurnLeft, &mut held);
                        pad_button(ui, LogicalKey::Back, &mut held);
                        pad_button(ui, LogicalKey::TurnRight, &mut held);
                    });
                    ui.horizontal(|ui| {
                        pad_button(ui, LogicalKey::Turbo, &mut held);
                        pad_button(ui, LogicalKey::Jump, &mut held);
                    });
                });

            egui::CollapsingHeader::new("Gait")
                .default_open(false)
                .show(ui, |ui| match &view.last_report {
                    Some(report) => {
                        let intent = report.intent;
                        ui.label(format!(
                            "Intent: fwd {:+.0} turn {:+.0}{}{}",
                            intent.forward,
                            intent.turn,
                            if intent.turbo { " turbo" } else { "" },
                            if intent.jump { " jump" } else { "" },
                        ));
                        if let Some(gait) = &report.gait {
                            ui.label(format!("Phase: {:.3}  Freq: {:.2} Hz", gait.phase, gait.frequency));
                            ui.label(format!("Stride: {:.3}  Knee lift: {:.3}", gait.stride_amplitude, gait.knee_lift));
                            for leg in &gait.legs {
                                ui.monospace(format!("hip {:+.2} knee {:+.2}", leg.hip, leg.knee));
                            }
                        }
                        if let Some(model) = view.sim.model() {
                            ui.label(format!("Cycles: {}  Ticks: {}", model.gait_cycles(), view.sim.tick_count()));
                        }
                    }
                    None => {
                        ui.label("No data yet...");
                    }
                });

            if let Some(err) = &view.last_error {
                ui.separator();
                ui.colored_label(Color32::from_rgb(255, 120, 100), err);
            }
        });
    }

    for event in pad.transitions(held, |key| keyboard_holds(&keyboard, key)) {
        state.sim.handle_input(event);
    }

    for action in actions {
        match action {
            PanelAction::Select(selector) => state.select(selector),
            PanelAction::Reset => state.reset(),
            PanelAction::Rebuild => state.rebuild(),
            PanelAction::TogglePause => state.paused = !state.paused,
        }
    }
}
