use eframe::egui;

use crate::common::{ChatMessage, Sender};
use crate::ui::state::ChatSession;

/// Display block for one transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub label: String,
    pub time: String,
    pub lines: Vec<String>,
}

/// Sender label, local `HH:MM` time, and body split on line breaks. The body
/// is otherwise untouched.
pub fn render_message(message: &ChatMessage, product_name: &str) -> RenderedMessage {
    let label = match message.sender {
        Sender::User => "You".to_string(),
        Sender::Assistant => product_name.to_string(),
    };

    RenderedMessage {
        label,
        time: message.timestamp.format("%H:%M").to_string(),
        lines: body_lines(&message.text),
    }
}

/// Every line break starts a new line, trailing ones included.
fn body_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

pub fn render(ui: &mut egui::Ui, session: &mut ChatSession) {
    let scroll_requested = session.take_scroll_request();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            if session.greeting_visible() {
                ui.label(
                    egui::RichText::new(format!(
                        "Hi! I'm your {}. Ask me anything about running your business.",
                        session.product_name()
                    ))
                    .italics(),
                );
                ui.add_space(8.0);
            }

            for message in &session.messages {
                let block = render_message(message, session.product_name());
                let color = match message.sender {
                    Sender::User => egui::Color32::LIGHT_BLUE,
                    Sender::Assistant => egui::Color32::LIGHT_GREEN,
                };

                ui.push_id(&message.id, |ui| {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.colored_label(color, egui::RichText::new(&block.label).strong());
                            ui.label(egui::RichText::new(&block.time).weak());
                        });
                        for line in &block.lines {
                            ui.label(line.as_str());
                        }
                    });
                });
                ui.add_space(4.0);
            }

            for _ in session.placeholders() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(
                        egui::RichText::new(format!("{} is typing…", session.product_name())).weak(),
                    );
                });
            }

            if scroll_requested {
                ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
            }
        });
}
