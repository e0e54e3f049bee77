use std::future::Future;

use tokio::sync::mpsc;

use crate::common::{
    BatchAnswer, Category, ConsultOutcome, HealthStatus, ModelInfo, NetworkCommand, NetworkEvent,
};

use super::api::{ApiError, ConsultApi};

/// Whatever answers consult questions. `ConsultApi` in production.
pub trait ConsultBackend: Clone + Send + Sync + 'static {
    fn consult(
        &self,
        question: &str,
        category: Category,
    ) -> impl Future<Output = ConsultOutcome> + Send;

    fn batch_consult(
        &self,
        questions: &[String],
        category: Category,
    ) -> impl Future<Output = Result<Vec<BatchAnswer>, ApiError>> + Send;

    fn model_info(&self) -> impl Future<Output = Result<ModelInfo, ApiError>> + Send;

    fn health(&self) -> impl Future<Output = HealthStatus> + Send;
}

impl ConsultBackend for ConsultApi {
    fn consult(
        &self,
        question: &str,
        category: Category,
    ) -> impl Future<Output = ConsultOutcome> + Send {
        ConsultApi::consult(self, question, category)
    }

    fn batch_consult(
        &self,
        questions: &[String],
        category: Category,
    ) -> impl Future<Output = Result<Vec<BatchAnswer>, ApiError>> + Send {
        ConsultApi::batch_consult(self, questions, category)
    }

    fn model_info(&self) -> impl Future<Output = Result<ModelInfo, ApiError>> + Send {
        ConsultApi::model_info(self)
    }

    fn health(&self) -> impl Future<Output = HealthStatus> + Send {
        ConsultApi::health(self)
    }
}

/// Tầng mạng: nhận lệnh từ UI, gọi backend, trả kết quả về qua kênh sự kiện.
///
/// Every command runs in its own task, so events are emitted in the order
/// requests settle rather than the order they were issued.
pub struct ConsultClient<B> {
    backend: B,
    event_sender: mpsc::Sender<NetworkEvent>,
    command_receiver: mpsc::Receiver<NetworkCommand>,
}

impl<B: ConsultBackend> ConsultClient<B> {
    pub fn new(
        backend: B,
        event_sender: mpsc::Sender<NetworkEvent>,
        command_receiver: mpsc::Receiver<NetworkCommand>,
    ) -> Self {
        Self {
            backend,
            event_sender,
            command_receiver,
        }
    }

    /// Runs until every command sender is dropped.
    pub async fn run(mut self) {
        log::info!("Consult worker started");

        while let Some(command) = self.command_receiver.recv().await {
            self.handle_command(command);
        }

        log::info!("Command channel closed; consult worker stopping");
    }

    fn handle_command(&self, command: NetworkCommand) {
        let backend = self.backend.clone();
        let events = self.event_sender.clone();

        match command {
            NetworkCommand::Consult(request) => {
                log::debug!(
                    "Dispatching consult {} [{}]: {}",
                    request.id,
                    request.category,
                    request.question
                );
                tokio::spawn(async move {
                    let outcome = backend.consult(&request.question, request.category).await;
                    if outcome.is_failure() {
                        log::warn!("Consult {} failed: {}", request.id, outcome.display_text());
                    }
                    notify(
                        &events,
                        NetworkEvent::Settled {
                            request_id: request.id,
                            outcome,
                        },
                    )
                    .await;
                });
            }
            NetworkCommand::BatchConsult {
                questions,
                category,
            } => {
                log::debug!("Dispatching batch of {} [{category}]", questions.len());
                tokio::spawn(async move {
                    let result = backend
                        .batch_consult(&questions, category)
                        .await
                        .map_err(|err| err.to_string());
                    if let Err(err) = &result {
                        log::warn!("Batch consult failed: {err}");
                    }
                    notify(&events, NetworkEvent::BatchSettled(result)).await;
                });
            }
            NetworkCommand::FetchModelInfo => {
                tokio::spawn(async move {
                    let result = backend.model_info().await.map_err(|err| err.to_string());
                    if let Err(err) = &result {
                        log::warn!("Model info request failed: {err}");
                    }
                    notify(&events, NetworkEvent::ModelInfo(result)).await;
                });
            }
            NetworkCommand::CheckHealth => {
                tokio::spawn(async move {
                    let health = backend.health().await;
                    if !health.healthy {
                        log::warn!("Backend unhealthy: {}", health.detail);
                    }
                    notify(&events, NetworkEvent::Health(health)).await;
                });
            }
        }
    }
}

async fn notify(events: &mpsc::Sender<NetworkEvent>, event: NetworkEvent) {
    if let Err(err) = events.send(event).await {
        log::warn!("Failed to notify UI, receiver gone: {err}");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tokio::sync::oneshot;

    use super::*;
    use crate::common::{ConsultRequest, RequestId};

    /// Backend whose consult answers are released by the test, one gate per question.
    #[derive(Clone, Default)]
    struct GatedBackend {
        gates: Arc<Mutex<HashMap<String, oneshot::Receiver<ConsultOutcome>>>>,
        seen: Arc<Mutex<Vec<(String, Category)>>>,
    }

    impl GatedBackend {
        fn gate(&self, question: &str) -> oneshot::Sender<ConsultOutcome> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(question.to_string(), rx);
            tx
        }
    }

    impl ConsultBackend for GatedBackend {
        fn consult(
            &self,
            question: &str,
            category: Category,
        ) -> impl Future<Output = ConsultOutcome> + Send {
            self.seen
                .lock()
                .unwrap()
                .push((question.to_string(), category));
            let gate = self.gates.lock().unwrap().remove(question);
            async move {
                match gate {
                    Some(rx) => rx
                        .await
                        .unwrap_or_else(|_| ConsultOutcome::TransportError("gate dropped".into())),
                    None => ConsultOutcome::TransportError("no gate".into()),
                }
            }
        }

        fn batch_consult(
            &self,
            questions: &[String],
            _category: Category,
        ) -> impl Future<Output = Result<Vec<BatchAnswer>, ApiError>> + Send {
            let answers: Vec<BatchAnswer> = questions
                .iter()
                .enumerate()
                .map(|(index, question)| BatchAnswer {
                    question: question.clone(),
                    answer: question.to_uppercase(),
                    index,
                })
                .collect();
            async move { Ok::<_, ApiError>(answers) }
        }

        fn model_info(&self) -> impl Future<Output = Result<ModelInfo, ApiError>> + Send {
            async { Err::<ModelInfo, _>(ApiError::Backend("model not loaded".into())) }
        }

        fn health(&self) -> impl Future<Output = HealthStatus> + Send {
            async {
                HealthStatus {
                    healthy: true,
                    detail: "healthy".into(),
                    model_info: None,
                }
            }
        }
    }

    fn consult(id: u64, question: &str) -> NetworkCommand {
        NetworkCommand::Consult(ConsultRequest {
            id: RequestId(id),
            question: question.to_string(),
            category: Category::Finance,
        })
    }

    fn spawn_worker(
        backend: GatedBackend,
    ) -> (
        mpsc::Sender<NetworkCommand>,
        mpsc::Receiver<NetworkEvent>,
        tokio::task::JoinHandle<()>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        let worker = tokio::spawn(ConsultClient::new(backend, event_tx, cmd_rx).run());
        (cmd_tx, event_rx, worker)
    }

    async fn wait_for_dispatch(backend: &GatedBackend, count: usize) {
        while backend.seen.lock().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn events_follow_settlement_order() {
        let backend = GatedBackend::default();
        let first = backend.gate("first");
        let second = backend.gate("second");
        let (cmd_tx, mut event_rx, _worker) = spawn_worker(backend.clone());

        cmd_tx.send(consult(1, "first")).await.unwrap();
        cmd_tx.send(consult(2, "second")).await.unwrap();
        wait_for_dispatch(&backend, 2).await;

        second
            .send(ConsultOutcome::Answer("two".into()))
            .unwrap();
        match event_rx.recv().await.unwrap() {
            NetworkEvent::Settled { request_id, outcome } => {
                assert_eq!(request_id, RequestId(2));
                assert_eq!(outcome, ConsultOutcome::Answer("two".into()));
            }
            other => panic!("unexpected event {other:?}"),
        }

        first
            .send(ConsultOutcome::ErrorPayload("rate limited".into()))
            .unwrap();
        match event_rx.recv().await.unwrap() {
            NetworkEvent::Settled { request_id, outcome } => {
                assert_eq!(request_id, RequestId(1));
                assert_eq!(outcome.display_text(), "Error: rate limited");
            }
            other => panic!("unexpected event {other:?}"),
        }

        let seen = backend.seen.lock().unwrap().clone();
        assert!(seen.iter().all(|(_, category)| *category == Category::Finance));
    }

    #[tokio::test]
    async fn worker_stops_when_commands_close() {
        let (cmd_tx, _event_rx, worker) = spawn_worker(GatedBackend::default());
        drop(cmd_tx);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn auxiliary_commands_emit_events() {
        let (cmd_tx, mut event_rx, _worker) = spawn_worker(GatedBackend::default());

        cmd_tx.send(NetworkCommand::FetchModelInfo).await.unwrap();
        match event_rx.recv().await.unwrap() {
            NetworkEvent::ModelInfo(Err(err)) => assert_eq!(err, "model not loaded"),
            other => panic!("unexpected event {other:?}"),
        }

        cmd_tx.send(NetworkCommand::CheckHealth).await.unwrap();
        match event_rx.recv().await.unwrap() {
            NetworkEvent::Health(health) => assert!(health.healthy),
            other => panic!("unexpected event {other:?}"),
        }

        cmd_tx
            .send(NetworkCommand::BatchConsult {
                questions: vec!["a".into(), "b".into()],
                category: Category::Hr,
            })
            .await
            .unwrap();
        match event_rx.recv().await.unwrap() {
            NetworkEvent::BatchSettled(Ok(results)) => {
                let answers: Vec<_> = results.iter().map(|r| r.answer.as_str()).collect();
                assert_eq!(answers, ["A", "B"]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
