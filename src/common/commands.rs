use super::types::{Category, ConsultRequest};

/// Lệnh UI gửi xuống tầng mạng.
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// Gửi một câu hỏi tới `/api/consult`. Kết quả trả về qua `NetworkEvent::Settled`.
    Consult(ConsultRequest),
    /// Gửi nhiều câu hỏi cùng lúc tới `/api/batch-consult`.
    BatchConsult {
        questions: Vec<String>,
        category: Category,
    },
    FetchModelInfo,
    CheckHealth,
}
