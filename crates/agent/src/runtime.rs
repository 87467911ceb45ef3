//! The HR agent loop: route, reason over tools, record the turn.

use std::sync::Arc;

use tracing::{debug, info, warn};

use hrdesk_core::domain::employee::EmployeeId;
use hrdesk_core::domain::transcript::conversation_turns;
use hrdesk_core::errors::{ApplicationError, DomainError};
use hrdesk_db::transcripts::TranscriptStore;

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::router::{Department, RouteDecision, Router, IT_SPECIALIST_PROMPT, UNROUTABLE_REPLY};
use crate::session::Session;
use crate::tools::{ToolRegistry, ToolStatus};

pub const ITERATION_LIMIT_REPLY: &str = "Agent stopped due to iteration limit.";
pub const DEFAULT_MAX_ITERATIONS: u32 = 6;

const OBSERVATION_MARKER: &str = "\nObservation:";
const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const ACTION_MARKER: &str = "Action:";
const ACTION_INPUT_MARKER: &str = "Action Input:";
const HISTORY_UNAVAILABLE: &str =
    "(conversation memory is unavailable; the Clear Memory tool resets it)";

const HR_PERSONA: &str = "You are HRBot, a friendly and professional HR assistant. \
Your responsibilities include answering questions about company policies, leave balances, onboarding, benefits, etc. \
If a user provides their name (for example, 'my name is adi'), remember it and address them by name in future responses. \
Don't answer any questions that are out of context or inappropriate. Politely decline to answer and tell the user to ask you about HR-related topics. \
Use the available tools when appropriate. \
If you try to retrieve memory and nothing comes up, check the employee records first using the Employee Details Lookup tool and if you still dont find it, then ask the user for the info and use the store information tool. \
Don't clear memory more than once at a time. \
If you need to know any information about the user like for example their name, check with the Employee Details Lookup tool first. \
Check your memory with the Retrieve memory tool to get the user's employee id and use the id to search for the user's details. If you can't find what you need, ask the user. \
If you get the output: Access denied when you tried to look up some employee details, tell the user that they can only check their own records. Don't try to access any other details until said to do so. \
If the user asks to clear memory, use the Retrieve Memory tool to get the file path and use the Clear Memory tool to clear the memory.";

/// One step of model output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReactStep {
    Action { tool: String, input: String },
    Final(String),
}

/// Reads a model completion. An `Action:` that comes before any
/// `Final Answer:` wins; text matching neither form is the final answer.
pub fn parse_step(output: &str) -> ReactStep {
    let action_at = find_line_marker(output, ACTION_MARKER);
    let final_at = output.find(FINAL_ANSWER_MARKER);

    match (action_at, final_at) {
        (Some(action), final_at) if final_at.map_or(true, |final_at| action < final_at) => {
            let after_action = &output[action + ACTION_MARKER.len()..];
            let (tool_line, rest) = after_action.split_once('\n').unwrap_or((after_action, ""));
            let input = find_line_marker(rest, ACTION_INPUT_MARKER)
                .map(|at| {
                    let raw = &rest[at + ACTION_INPUT_MARKER.len()..];
                    let raw = raw.split(OBSERVATION_MARKER).next().unwrap_or(raw);
                    strip_quotes(raw.trim())
                })
                .unwrap_or_default();
            ReactStep::Action { tool: tool_line.trim().to_string(), input }
        }
        (_, Some(final_at)) => {
            ReactStep::Final(output[final_at + FINAL_ANSWER_MARKER.len()..].trim().to_string())
        }
        (_, None) => ReactStep::Final(output.trim().to_string()),
    }
}

/// Byte offset of `marker` at the start of a line (ignoring indentation).
fn find_line_marker(text: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if line.trim_start().starts_with(marker) {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

fn strip_quotes(raw: &str) -> String {
    let stripped = raw
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(raw);
    stripped.trim().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCallRecord {
    pub tool: String,
    pub status: ToolStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentReply {
    pub text: String,
    pub department: Option<Department>,
    pub tool_calls: Vec<ToolCallRecord>,
}

pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    transcripts: Arc<dyn TranscriptStore>,
    session: Arc<Session>,
    router: Option<Router>,
    max_iterations: u32,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        transcripts: Arc<dyn TranscriptStore>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            llm,
            tools,
            transcripts,
            session,
            router: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Resolves one utterance end to end and appends it to the caller's
    /// transcript.
    pub async fn handle_message(&self, utterance: &str) -> Result<AgentReply, ApplicationError> {
        let employee_id = self.session.current().cloned().ok_or_else(|| {
            DomainError::InvariantViolation("no authenticated session".to_string())
        })?;

        let department = match &self.router {
            Some(router) => match router.route(utterance).await.map_err(integration)? {
                RouteDecision::Department(department) => Some(department),
                RouteDecision::Unroutable => {
                    let reply = AgentReply {
                        text: UNROUTABLE_REPLY.to_string(),
                        department: None,
                        tool_calls: Vec::new(),
                    };
                    self.record(&employee_id, utterance, &reply.text).await;
                    return Ok(reply);
                }
            },
            None => None,
        };

        let reply = match department {
            Some(Department::It) => AgentReply {
                text: self.answer_it(utterance).await?,
                department,
                tool_calls: Vec::new(),
            },
            Some(Department::Hr) | None => {
                let (text, tool_calls) = self.run_react(&employee_id, utterance).await?;
                AgentReply { text, department, tool_calls }
            }
        };

        self.record(&employee_id, utterance, &reply.text).await;
        info!(
            event_name = "hrdesk.agent.turn_completed",
            employee_id = %employee_id,
            department = department.map(Department::agent_name).unwrap_or("HR_Agent"),
            tool_calls = reply.tool_calls.len(),
            "turn completed"
        );
        Ok(reply)
    }

    async fn answer_it(&self, utterance: &str) -> Result<String, ApplicationError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(IT_SPECIALIST_PROMPT),
            ChatMessage::user(utterance),
        ]);
        let answer = self.llm.complete(request).await.map_err(integration)?;
        Ok(answer.trim().to_string())
    }

    async fn run_react(
        &self,
        employee_id: &EmployeeId,
        utterance: &str,
    ) -> Result<(String, Vec<ToolCallRecord>), ApplicationError> {
        let history = match self.transcripts.load(employee_id).await {
            Ok(history) => history.render(),
            Err(error) => {
                warn!(
                    event_name = "hrdesk.memory.unavailable",
                    employee_id = %employee_id,
                    error = %error,
                    "history unreadable, continuing without it"
                );
                HISTORY_UNAVAILABLE.to_string()
            }
        };
        let system = self.system_prompt();
        let mut scratchpad = String::new();
        let mut tool_calls = Vec::new();

        for iteration in 0..self.max_iterations {
            let prompt = format!(
                "Previous conversation history:\n{history}\n\nQuestion: {utterance}\nThought:{scratchpad}"
            );
            let request =
                CompletionRequest::new(vec![ChatMessage::system(system.clone()), ChatMessage::user(prompt)])
                    .with_stop(OBSERVATION_MARKER);
            let output = self.llm.complete(request).await.map_err(integration)?;

            match parse_step(&output) {
                ReactStep::Final(answer) => return Ok((answer, tool_calls)),
                ReactStep::Action { tool, input } => {
                    let observation = self.tools.invoke(&tool, &input).await;
                    debug!(
                        event_name = "hrdesk.agent.step",
                        iteration,
                        tool = %tool,
                        status = %observation.status,
                        "agent step"
                    );
                    tool_calls.push(ToolCallRecord { tool, status: observation.status });
                    scratchpad.push_str(output.trim_end());
                    scratchpad.push_str(OBSERVATION_MARKER);
                    scratchpad.push(' ');
                    scratchpad.push_str(&observation.text);
                    scratchpad.push_str("\nThought:");
                }
            }
        }

        warn!(
            event_name = "hrdesk.agent.iteration_limit",
            max_iterations = self.max_iterations,
            "agent hit iteration limit"
        );
        Ok((ITERATION_LIMIT_REPLY.to_string(), tool_calls))
    }

    fn system_prompt(&self) -> String {
        let tools = self
            .tools
            .descriptors()
            .iter()
            .map(|descriptor| format!("{}: {}", descriptor.name, descriptor.description))
            .collect::<Vec<_>>()
            .join("\n");
        let names = self.tools.names().join(", ");
        format!(
            "{HR_PERSONA}\n\nYou have access to the following tools:\n\n{tools}\n\n\
             Use the following format:\n\n\
             Question: the input question you must answer\n\
             Thought: what you should do next\n\
             Action: the tool to use, one of [{names}]\n\
             Action Input: the input to the tool\n\
             Observation: the tool result\n\
             ... (Thought/Action/Action Input/Observation can repeat)\n\
             Thought: I now know the final answer\n\
             Final Answer: the answer to the original question"
        )
    }

    /// The reply is already resolved, so a failed append is only logged.
    async fn record(&self, employee_id: &EmployeeId, utterance: &str, reply: &str) {
        if let Err(error) =
            self.transcripts.append(employee_id, conversation_turns(utterance, reply)).await
        {
            warn!(
                event_name = "hrdesk.memory.unavailable",
                employee_id = %employee_id,
                error = %error,
                "turn not recorded"
            );
        }
    }
}

fn integration(error: anyhow::Error) -> ApplicationError {
    ApplicationError::Integration(format!("{error:#}"))
}
