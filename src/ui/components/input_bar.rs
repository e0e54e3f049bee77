use eframe::egui;

/// Returns true when the user asked to send (button or Enter).
pub fn render(ui: &mut egui::Ui, input_text: &mut String) -> bool {
    let mut send = false;
    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(input_text)
                .hint_text("Ask a business question…")
                .desired_width((ui.available_width() - 64.0).max(120.0)),
        );
        if ui.button("Send").clicked() {
            send = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
            response.request_focus();
        }
    });

    send
}
