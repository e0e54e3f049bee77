use super::types::{BatchAnswer, ConsultOutcome, HealthStatus, ModelInfo, RequestId};

/// Sự kiện từ tầng mạng gửi lên UI.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    Settled {
        request_id: RequestId,
        outcome: ConsultOutcome,
    },
    BatchSettled(Result<Vec<BatchAnswer>, String>),
    ModelInfo(Result<ModelInfo, String>),
    Health(HealthStatus),
}
