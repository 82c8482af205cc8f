//! egui control panel and drop overlay

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use crate::app::{ClearModels, Lighting, ResetView, Session, Status, ViewerSettings, WorldSettings};
use crate::file_picker::{open_model_picker, DragState, PendingFiles};
use crate::models::ImportPipeline;

const PANEL_WIDTH: f32 = 220.0;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

#[derive(SystemParam)]
struct UiParams<'w, 's> {
    contexts: EguiContexts<'w, 's>,
    settings: Res<'w, ViewerSettings>,
    session: Res<'w, Session>,
    status: Res<'w, Status>,
    pipeline: Res<'w, ImportPipeline>,
    pending_files: Res<'w, PendingFiles>,
    drag: Res<'w, DragState>,
    world: ResMut<'w, WorldSettings>,
    lighting: ResMut<'w, Lighting>,
    reset_view: MessageWriter<'w, ResetView>,
    clear_models: MessageWriter<'w, ClearModels>,
}

fn ui_system(mut params: UiParams) {
    let Ok(ctx) = params.contexts.ctx_mut() else { return };

    egui::SidePanel::left("controls_panel")
        .default_width(PANEL_WIDTH)
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading("Meadow");
            ui.separator();

            if ui.button("Open models…").clicked() {
                open_model_picker(&params.pending_files, &params.settings.config.import);
            }

            ui.horizontal(|ui| {
                if ui.button("Reset view").clicked() {
                    params.reset_view.write(ResetView);
                }
                if ui.button("Clear").clicked() {
                    params.clear_models.write(ClearModels);
                }
            });

            ui.separator();

            // Only write through on change so change detection stays quiet
            let mut show_grid = params.world.show_grid;
            if ui.checkbox(&mut show_grid, "Grid").changed() {
                params.world.show_grid = show_grid;
            }
            let mut show_axes = params.world.show_axes;
            if ui.checkbox(&mut show_axes, "Axes").changed() {
                params.world.show_axes = show_axes;
            }
            let mut auto_rotate = params.world.auto_rotate;
            if ui.checkbox(&mut auto_rotate, "Auto-rotate").changed() {
                params.world.auto_rotate = auto_rotate;
            }

            ui.separator();
            ui.label("Lighting");

            let mut intensity = params.lighting.0.intensity;
            if ui
                .add(egui::Slider::new(&mut intensity, 0.0..=3.0).text("Intensity"))
                .changed()
            {
                params.lighting.0.intensity = intensity;
            }
            let mut sun_angle = params.lighting.0.sun_angle_degrees;
            if ui
                .add(
                    egui::Slider::new(&mut sun_angle, 0.0..=360.0)
                        .text("Sun angle")
                        .suffix("°"),
                )
                .changed()
            {
                params.lighting.0.sun_angle_degrees = sun_angle;
            }

            ui.separator();

            let models = params.session.0.models();
            ui.label(format!("Models ({})", models.len()));
            egui::ScrollArea::vertical()
                .max_height(240.0)
                .show(ui, |ui| {
                    if models.is_empty() {
                        ui.weak("Drop .glb or .gltf files here");
                    }
                    for model in models {
                        ui.label(model.name.as_str());
                    }
                });

            let pending = params.pipeline.pending();
            if pending > 0 {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("{} pending", pending));
                });
            }

            let status = params.status.0.display();
            if !status.is_empty() {
                ui.separator();
                ui.label(egui::RichText::new(status).color(egui::Color32::LIGHT_YELLOW));
            }
        });

    if params.drag.is_dragging() {
        egui::Area::new(egui::Id::new("drop_overlay"))
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.heading("Drop models to import");
                });
            });
    }
}
