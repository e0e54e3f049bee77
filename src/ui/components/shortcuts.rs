use eframe::egui;

use crate::common::Shortcut;

/// Index of the shortcut clicked this frame, if any.
pub fn render(ui: &mut egui::Ui, shortcuts: &[Shortcut]) -> Option<usize> {
    let mut clicked = None;
    ui.horizontal_wrapped(|ui| {
        for (index, shortcut) in shortcuts.iter().enumerate() {
            if ui
                .button(shortcut.label.as_str())
                .on_hover_text(format!("category: {}", shortcut.category))
                .clicked()
            {
                clicked = Some(index);
            }
        }
    });
    clicked
}
