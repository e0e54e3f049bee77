use eframe::egui;

use crate::ui::state::BackendStatus;

/// Returns true when the user asked for a status refresh.
pub fn render(ui: &mut egui::Ui, base_url: &str, status: &BackendStatus) -> bool {
    ui.heading("Backend");
    ui.separator();

    ui.label(egui::RichText::new(base_url).monospace().weak());

    match &status.health {
        Some(health) => {
            let (color, dot) = if health.healthy {
                (egui::Color32::GREEN, "●")
            } else {
                (egui::Color32::RED, "○")
            };
            ui.horizontal(|ui| {
                ui.colored_label(color, dot);
                ui.label(health.detail.as_str());
            });
        }
        None => {
            ui.label("(checking...)");
        }
    }

    ui.separator();
    ui.label("Model:");
    match &status.model_info {
        Some(Ok(info)) => {
            let rows = [
                ("Name", &info.model_name),
                ("Device", &info.device),
                ("Dtype", &info.torch_dtype),
                ("Parameters", &info.parameters),
            ];
            for (name, value) in rows {
                if let Some(value) = value {
                    ui.horizontal(|ui| {
                        ui.label(format!("{name}:"));
                        ui.label(egui::RichText::new(value.as_str()).strong());
                    });
                }
            }
        }
        Some(Err(err)) => {
            ui.colored_label(egui::Color32::YELLOW, err.as_str());
        }
        None => {
            ui.label("unknown");
        }
    }

    ui.separator();
    if let Some(checked_at) = status.checked_at {
        ui.label(
            egui::RichText::new(format!("Checked at {}", checked_at.format("%H:%M:%S"))).weak(),
        );
    }

    ui.button("Refresh").clicked()
}
