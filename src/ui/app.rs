use std::time::Instant;

use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{ConsultOutcome, ConsultRequest, NetworkCommand, NetworkEvent};
use crate::config::AppConfig;

use super::components::{chat_area, input_bar, shortcuts, status_panel};
use super::state::{BackendStatus, ChatSession};

pub struct ChatApp {
    session: ChatSession,
    status: BackendStatus,
    base_url: String,
    command_sender: mpsc::Sender<NetworkCommand>,
    event_receiver: mpsc::Receiver<NetworkEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
        command_sender: mpsc::Sender<NetworkCommand>,
        event_receiver: mpsc::Receiver<NetworkEvent>,
    ) -> Self {
        let mut app = Self {
            session: ChatSession::new(config),
            status: BackendStatus::default(),
            base_url: config.base_url.clone(),
            command_sender,
            event_receiver,
        };
        app.refresh_status();
        app
    }

    fn handle_network_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                NetworkEvent::Settled {
                    request_id,
                    outcome,
                } => self.session.on_settled(request_id, outcome),
                NetworkEvent::Health(health) => self.status.record_health(health),
                NetworkEvent::ModelInfo(info) => self.status.record_model_info(info),
                NetworkEvent::BatchSettled(result) => {
                    log::debug!("Ignoring batch result in desktop mode: {result:?}");
                }
            }
        }
    }

    fn dispatch(&mut self, request: ConsultRequest) {
        dispatch(&mut self.session, &self.command_sender, request);
    }

    fn refresh_status(&mut self) {
        for command in [NetworkCommand::CheckHealth, NetworkCommand::FetchModelInfo] {
            if let Err(err) = self.command_sender.try_send(command) {
                log::warn!("Failed to send status command to network: {err}");
            }
        }
    }
}

/// Fire-and-forget. If the worker cannot take the request it settles on
/// the spot so the placeholder never dangles.
fn dispatch(
    session: &mut ChatSession,
    command_sender: &mpsc::Sender<NetworkCommand>,
    request: ConsultRequest,
) {
    let request_id = request.id;
    if let Err(err) = command_sender.try_send(NetworkCommand::Consult(request)) {
        log::warn!("Failed to send command to network: {err}");
        session.on_settled(
            request_id,
            ConsultOutcome::TransportError(format!("request not sent ({err})")),
        );
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_network_events();
        self.session.poll_greeting(Instant::now());

        egui::SidePanel::right("backend_status")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                if status_panel::render(ui, &self.base_url, &self.status) {
                    self.refresh_status();
                }
            });

        egui::TopBottomPanel::bottom("composer").show(ctx, |ui| {
            ui.add_space(4.0);
            if let Some(index) = shortcuts::render(ui, &self.session.shortcuts) {
                if let Some(request) = self.session.activate_shortcut(index) {
                    self.dispatch(request);
                }
            }
            ui.separator();
            if input_bar::render(ui, &mut self.session.input_text) {
                if let Some(request) = self.session.submit_input() {
                    self.dispatch(request);
                }
            }
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(self.session.product_name());
            ui.separator();
            chat_area::render(ui, &mut self.session);
        });

        ctx.request_repaint();
    }
}
