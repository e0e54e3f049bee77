use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::common::{
    Category, ChatMessage, ConsultOutcome, ConsultRequest, HealthStatus, ModelInfo, RequestId,
    Shortcut,
};
use crate::config::{AppConfig, OrderingPolicy};

/// Last known backend status, shown in the side panel.
#[derive(Debug, Clone, Default)]
pub struct BackendStatus {
    pub health: Option<HealthStatus>,
    pub model_info: Option<Result<ModelInfo, String>>,
    pub checked_at: Option<DateTime<Local>>,
}

impl BackendStatus {
    pub fn record_health(&mut self, health: HealthStatus) {
        // /health carries model info too; keep it unless /api/model-info already answered.
        if self.model_info.is_none() {
            if let Some(info) = health.model_info.clone() {
                self.model_info = Some(info);
            }
        }
        self.health = Some(health);
        self.checked_at = Some(Local::now());
    }

    pub fn record_model_info(&mut self, model_info: Result<ModelInfo, String>) {
        self.model_info = Some(model_info);
        self.checked_at = Some(Local::now());
    }
}

/// One-shot greeting timer. Fires once; after that the visibility is final.
#[derive(Debug, Clone)]
struct GreetingTimer {
    deadline: Instant,
    fired: bool,
    visible: bool,
}

/// Trạng thái phiên chat: transcript, ô nhập liệu và các request đang chờ.
///
/// Mutated only from the UI thread; network results arrive as events and are
/// applied through [`ChatSession::on_settled`].
pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    pub input_text: String,
    pub default_category: Category,
    pub shortcuts: Vec<Shortcut>,
    product_name: String,
    ordering: OrderingPolicy,
    next_request_id: u64,
    /// Requests whose typing placeholder is still shown.
    placeholders: BTreeSet<RequestId>,
    /// Issued requests whose answer has not been appended yet.
    awaiting: BTreeSet<RequestId>,
    /// Early answers held back under submission ordering.
    held: BTreeMap<RequestId, ConsultOutcome>,
    greeting: GreetingTimer,
    scroll_to_bottom: bool,
}

impl ChatSession {
    pub fn new(config: &AppConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    pub fn starting_at(config: &AppConfig, started: Instant) -> Self {
        let mut session = Self {
            messages: Vec::new(),
            input_text: String::new(),
            default_category: config.default_category,
            shortcuts: Vec::new(),
            product_name: config.product_name.clone(),
            ordering: config.ordering,
            next_request_id: 0,
            placeholders: BTreeSet::new(),
            awaiting: BTreeSet::new(),
            held: BTreeMap::new(),
            greeting: GreetingTimer {
                deadline: started + Duration::from_millis(config.greeting_delay_ms),
                fired: false,
                visible: true,
            },
            scroll_to_bottom: false,
        };
        for shortcut in &config.shortcuts {
            session.bind_shortcut(shortcut.label.clone(), shortcut.category);
        }
        session
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Submits whatever is in the input field under the default category.
    pub fn submit_input(&mut self) -> Option<ConsultRequest> {
        let text = self.input_text.clone();
        self.submit_question(&text, self.default_category)
    }

    /// Returns the request to dispatch, or `None` when the question is blank.
    ///
    /// The user message and the placeholder are in place before the caller
    /// gets a chance to touch the network.
    pub fn submit_question(&mut self, text: &str, category: Category) -> Option<ConsultRequest> {
        let question = text.trim();
        if question.is_empty() {
            return None;
        }
        let question = question.to_string();

        self.input_text.clear();
        self.append(ChatMessage::user(question.clone()));

        self.next_request_id += 1;
        let id = RequestId(self.next_request_id);
        self.placeholders.insert(id);
        self.awaiting.insert(id);

        Some(ConsultRequest {
            id,
            question,
            category,
        })
    }

    /// Applies a settled request. Settlements for unknown or already-settled
    /// requests are dropped.
    pub fn on_settled(&mut self, request_id: RequestId, outcome: ConsultOutcome) {
        self.remove_placeholder(request_id);

        if !self.awaiting.contains(&request_id) || self.held.contains_key(&request_id) {
            log::warn!("Ignoring settlement for unknown or settled request {request_id}");
            return;
        }

        match self.ordering {
            OrderingPolicy::Settlement => {
                self.awaiting.remove(&request_id);
                self.append(ChatMessage::assistant(outcome.display_text()));
            }
            OrderingPolicy::Submission => {
                self.held.insert(request_id, outcome);
                self.release_held();
            }
        }
    }

    /// Returns whether a placeholder was actually removed.
    pub fn remove_placeholder(&mut self, request_id: RequestId) -> bool {
        self.placeholders.remove(&request_id)
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &RequestId> {
        self.placeholders.iter()
    }

    pub fn has_pending(&self) -> bool {
        !self.awaiting.is_empty()
    }

    /// Registers a category shortcut; its label doubles as the question.
    pub fn bind_shortcut(&mut self, label: impl Into<String>, category: Category) {
        self.shortcuts.push(Shortcut::new(label, category));
    }

    /// Copies the shortcut label into the input field and submits it.
    pub fn activate_shortcut(&mut self, index: usize) -> Option<ConsultRequest> {
        let shortcut = self.shortcuts.get(index)?.clone();
        self.input_text = shortcut.label.clone();
        self.submit_question(&shortcut.label, shortcut.category)
    }

    /// Evaluates the greeting timer once its deadline passes: the greeting is
    /// hidden unless the transcript already has a message.
    pub fn poll_greeting(&mut self, now: Instant) {
        if self.greeting.fired || now < self.greeting.deadline {
            return;
        }
        self.greeting.fired = true;
        if self.messages.is_empty() {
            self.greeting.visible = false;
        }
    }

    pub fn greeting_visible(&self) -> bool {
        self.greeting.visible
    }

    /// Consumes the pending scroll-to-end request raised by the last append.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_bottom)
    }

    fn release_held(&mut self) {
        while let Some(&next) = self.awaiting.first() {
            let Some(outcome) = self.held.remove(&next) else {
                break;
            };
            self.awaiting.remove(&next);
            self.append(ChatMessage::assistant(outcome.display_text()));
        }
    }

    fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.scroll_to_bottom = true;
    }
}
