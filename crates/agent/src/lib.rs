//! HR assistant runtime.
//!
//! - `session`: the once-per-process login
//! - `guardrails`: who may read which record or history
//! - `tools`: the seven HR tools behind a registry
//! - `llm`: chat-completion client seam
//! - `router` / `runtime`: department routing and the tool-using agent loop
//!
//! The model never reads a store directly. Every record or memory access goes
//! through a tool, and every tool asks the guardrail policy first.

pub mod guardrails;
pub mod llm;
pub mod router;
pub mod runtime;
pub mod session;
pub mod tools;

pub use guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
pub use llm::{ChatCompletionsClient, ChatMessage, CompletionRequest, LlmClient};
pub use router::{Department, RouteDecision, Router};
pub use runtime::{AgentReply, AgentRuntime};
pub use session::{AuthError, Session};
pub use tools::{hr_registry, Tool, ToolContext, ToolOutput, ToolRegistry, ToolStatus};
