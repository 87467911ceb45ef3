use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};

pub const UNROUTABLE_REPLY: &str =
    "I'm sorry, I couldn't determine the appropriate department to handle your query.";

const ROUTER_PROMPT: &str = "You are a Routing Agent. Analyze user queries and determine whether \
they should be handled by HR or IT. Respond EXACTLY with either 'HR_Agent' or 'IT_Agent'. \
Do not include any other text in your response.";

pub const IT_SPECIALIST_PROMPT: &str = "You are an IT support specialist. You help with password \
resets, software issues, hardware problems, and other technical issues. Respond ONLY to \
IT-related questions.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Department {
    Hr,
    It,
}

impl Department {
    pub fn agent_name(self) -> &'static str {
        match self {
            Self::Hr => "HR_Agent",
            Self::It => "IT_Agent",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Department(Department),
    Unroutable,
}

/// Maps the router model's raw answer to a department. Surrounding quotes,
/// whitespace and case are ignored; anything else is unroutable.
pub fn parse_route(raw: &str) -> RouteDecision {
    let answer = raw.trim().trim_matches(|c: char| matches!(c, '\'' | '"' | '`' | '.'));
    if answer.eq_ignore_ascii_case(Department::Hr.agent_name()) {
        RouteDecision::Department(Department::Hr)
    } else if answer.eq_ignore_ascii_case(Department::It.agent_name()) {
        RouteDecision::Department(Department::It)
    } else {
        RouteDecision::Unroutable
    }
}

pub struct Router {
    llm: Arc<dyn LlmClient>,
}

impl Router {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn route(&self, utterance: &str) -> Result<RouteDecision> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(ROUTER_PROMPT),
            ChatMessage::user(utterance),
        ]);
        let raw = self.llm.complete(request).await?;
        let decision = parse_route(&raw);
        match decision {
            RouteDecision::Department(department) => info!(
                event_name = "hrdesk.router.routed",
                department = department.agent_name(),
                "utterance routed"
            ),
            RouteDecision::Unroutable => debug!(
                event_name = "hrdesk.router.unroutable",
                answer_len = raw.len(),
                "router answer not recognised"
            ),
        }
        Ok(decision)
    }
}
