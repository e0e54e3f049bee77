use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::{
    BatchAnswer, Category, ChatMessage, ConsultOutcome, HealthStatus, ModelInfo, NetworkCommand,
    NetworkEvent,
};
use crate::config::AppConfig;
use crate::network::{ConsultBackend, ConsultClient};
use crate::ui::components::chat_area::render_message;
use crate::ui::ChatSession;

const WORKER_GONE: &str = "network worker unavailable";

/// Chế độ không giao diện: cùng session và network worker như bản desktop,
/// nhưng kết quả được in ra terminal.
pub struct HeadlessSession {
    session: ChatSession,
    command_sender: mpsc::Sender<NetworkCommand>,
    event_receiver: mpsc::Receiver<NetworkEvent>,
    worker: JoinHandle<()>,
}

impl HeadlessSession {
    pub fn start<B: ConsultBackend>(backend: B, config: &AppConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);
        let worker = tokio::spawn(ConsultClient::new(backend, event_tx, cmd_rx).run());

        Self {
            session: ChatSession::new(config),
            command_sender: cmd_tx,
            event_receiver: event_rx,
            worker,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.session.messages
    }

    /// Submits one question and waits until it settles. Blank questions are
    /// ignored without touching the network.
    pub async fn ask(&mut self, question: &str, category: Category) -> &[ChatMessage] {
        let Some(request) = self.session.submit_question(question, category) else {
            log::debug!("Ignoring blank question");
            return self.transcript();
        };

        let request_id = request.id;
        if self
            .command_sender
            .send(NetworkCommand::Consult(request))
            .await
            .is_err()
        {
            self.session.on_settled(
                request_id,
                ConsultOutcome::TransportError(WORKER_GONE.to_string()),
            );
            return self.transcript();
        }

        while self.session.has_pending() {
            match self.event_receiver.recv().await {
                Some(NetworkEvent::Settled {
                    request_id,
                    outcome,
                }) => self.session.on_settled(request_id, outcome),
                Some(other) => log::debug!("Skipping unrelated event: {other:?}"),
                None => {
                    self.session.on_settled(
                        request_id,
                        ConsultOutcome::TransportError(WORKER_GONE.to_string()),
                    );
                    break;
                }
            }
        }

        self.transcript()
    }

    pub async fn batch(
        &mut self,
        questions: Vec<String>,
        category: Category,
    ) -> Result<Vec<BatchAnswer>, String> {
        self.request(NetworkCommand::BatchConsult {
            questions,
            category,
        })
        .await
        .and_then(|event| match event {
            NetworkEvent::BatchSettled(result) => result,
            other => Err(format!("unexpected event: {other:?}")),
        })
    }

    pub async fn model_info(&mut self) -> Result<ModelInfo, String> {
        self.request(NetworkCommand::FetchModelInfo)
            .await
            .and_then(|event| match event {
                NetworkEvent::ModelInfo(result) => result,
                other => Err(format!("unexpected event: {other:?}")),
            })
    }

    pub async fn health(&mut self) -> HealthStatus {
        let unhealthy = |detail: String| HealthStatus {
            healthy: false,
            detail,
            model_info: None,
        };
        match self.request(NetworkCommand::CheckHealth).await {
            Ok(NetworkEvent::Health(health)) => health,
            Ok(other) => unhealthy(format!("unexpected event: {other:?}")),
            Err(err) => unhealthy(err),
        }
    }

    /// Closes the command channel and waits for the worker to drain.
    pub async fn shutdown(self) {
        drop(self.command_sender);
        if let Err(err) = self.worker.await {
            log::error!("Network worker terminated abnormally: {err}");
        }
    }

    async fn request(&mut self, command: NetworkCommand) -> Result<NetworkEvent, String> {
        self.command_sender
            .send(command)
            .await
            .map_err(|_| WORKER_GONE.to_string())?;
        self.event_receiver
            .recv()
            .await
            .ok_or_else(|| WORKER_GONE.to_string())
    }
}

/// `[HH:MM] Label: text`, continuation lines indented under the label.
pub fn format_transcript(messages: &[ChatMessage], product_name: &str) -> String {
    let mut out = String::new();
    for message in messages {
        let block = render_message(message, product_name);
        let prefix = format!("[{}] {}: ", block.time, block.label);
        let indent = " ".repeat(prefix.chars().count());

        if block.lines.is_empty() {
            out.push_str(prefix.trim_end());
            out.push('\n');
        }
        for (i, line) in block.lines.iter().enumerate() {
            out.push_str(if i == 0 { &prefix } else { &indent });
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::common::Sender;
    use crate::network::test_support::{local_api, refused_base_url, serve_once};

    fn config_for(base_url: &str) -> AppConfig {
        AppConfig::default().with_base_url(Some(base_url.to_string()))
    }

    #[tokio::test]
    async fn cash_flow_question_round_trip() {
        let (base_url, server) =
            serve_once(StatusCode::OK, r#"{"answer":"Track receivables weekly."}"#).await;
        let config = config_for(&base_url);
        let mut headless = HeadlessSession::start(local_api(&config.base_url), &config);

        let transcript: Vec<_> = headless
            .ask("How can I improve my cash flow?", config.default_category)
            .await
            .iter()
            .map(|message| (message.sender, message.text.clone()))
            .collect();

        assert_eq!(
            transcript,
            [
                (Sender::User, "How can I improve my cash flow?".to_string()),
                (Sender::Assistant, "Track receivables weekly.".to_string()),
            ]
        );
        let request = server.await.unwrap();
        assert_eq!(
            request.uri,
            "/api/consult?question=How%20can%20I%20improve%20my%20cash%20flow%3F&category=general"
        );
        headless.shutdown().await;
    }

    #[tokio::test]
    async fn rate_limited_answer_is_prefixed() {
        let (base_url, server) = serve_once(StatusCode::TOO_MANY_REQUESTS, r#"{"error":"rate limited"}"#).await;
        let config = config_for(&base_url);
        let mut headless = HeadlessSession::start(local_api(&config.base_url), &config);

        let transcript = headless.ask("Any tips?", Category::Marketing).await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].text, "Error: rate limited");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let config = config_for(&refused_base_url().await);
        let mut headless = HeadlessSession::start(local_api(&config.base_url), &config);

        let transcript = headless.ask("Hello?", Category::General).await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].sender, Sender::Assistant);
        assert!(transcript[1].text.starts_with("Network error: "));
    }

    #[tokio::test]
    async fn blank_question_issues_nothing() {
        let config = config_for(&refused_base_url().await);
        let mut headless = HeadlessSession::start(local_api(&config.base_url), &config);

        assert!(headless.ask("   ", Category::General).await.is_empty());
        headless.shutdown().await;
    }

    #[tokio::test]
    async fn stopped_worker_settles_as_network_error() {
        let config = config_for(&refused_base_url().await);
        let mut headless = HeadlessSession::start(local_api(&config.base_url), &config);
        headless.worker.abort();
        let _ = (&mut headless.worker).await;

        let transcript = headless.ask("Still there?", Category::General).await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].sender, Sender::Assistant);
        assert_eq!(
            transcript[1].text,
            "Network error: network worker unavailable"
        );
        assert!(!headless.session.has_pending());
        assert_eq!(headless.session.placeholders().count(), 0);
    }

    #[test]
    fn transcript_lines_are_labelled_and_indented() {
        let messages = vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Line one\nLine two"),
        ];
        let time = messages[0].timestamp.format("%H:%M").to_string();
        let out = format_transcript(&messages, "Advisor");
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], format!("[{time}] You: Hi"));
        assert!(lines[1].ends_with("Advisor: Line one"));
        assert_eq!(lines[2].trim_start(), "Line two");
        assert_eq!(
            lines[2].len() - lines[2].trim_start().len(),
            lines[1].len() - "Line one".len()
        );
    }
}
