//! Tool surface the agent is allowed to call. Every call goes through
//! [`ToolRegistry::invoke`], which is also the only place tool traffic is
//! logged.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

pub mod hr;

pub use hr::{hr_registry, ToolContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    AccessDenied,
    NotFound,
    SourceUnavailable,
    ValidationFailed,
}

impl ToolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::SourceUnavailable => "source_unavailable",
            Self::ValidationFailed => "validation_failed",
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a tool hands back to the agent. Failures are values, never errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub status: ToolStatus,
    pub text: String,
}

impl ToolOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { status: ToolStatus::Ok, text: text.into() }
    }

    pub fn access_denied(text: impl Into<String>) -> Self {
        Self { status: ToolStatus::AccessDenied, text: text.into() }
    }

    pub fn not_found(text: impl Into<String>) -> Self {
        Self { status: ToolStatus::NotFound, text: text.into() }
    }

    pub fn source_unavailable(text: impl Into<String>) -> Self {
        Self { status: ToolStatus::SourceUnavailable, text: text.into() }
    }

    pub fn validation_failed(text: impl Into<String>) -> Self {
        Self { status: ToolStatus::ValidationFailed, text: text.into() }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &str) -> ToolOutput;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registration order is preserved so the prompt lists tools stably.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.retain(|existing| existing.name() != tool.name());
        self.tools.push(Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        let wanted = name.trim();
        self.tools
            .iter()
            .find(|tool| tool.name().eq_ignore_ascii_case(wanted))
            .map(|tool| tool.as_ref())
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| ToolDescriptor { name: tool.name(), description: tool.description() })
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Runs `name` with `input`. An unknown name yields a not-found output
    /// listing what is available.
    pub async fn invoke(&self, name: &str, input: &str) -> ToolOutput {
        let output = match self.get(name) {
            Some(tool) => tool.execute(input).await,
            None => ToolOutput::not_found(format!(
                "{} is not a valid tool, try one of [{}].",
                name.trim(),
                self.names().join(", ")
            )),
        };

        info!(
            event_name = "hrdesk.tool.invoked",
            tool = name.trim(),
            status = %output.status,
            "tool invoked"
        );
        output
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{Tool, ToolOutput, ToolRegistry, ToolStatus};

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "Echo"
        }

        fn description(&self) -> &'static str {
            "Repeats its input."
        }

        async fn execute(&self, input: &str) -> ToolOutput {
            ToolOutput::ok(input)
        }
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let mut registry = ToolRegistry::default();
        registry.register(Echo);

        let output = registry.invoke(" echo ", "hello").await;
        assert_eq!(output, ToolOutput::ok("hello"));
    }

    #[tokio::test]
    async fn unknown_tool_lists_registered_names() {
        let mut registry = ToolRegistry::default();
        registry.register(Echo);

        let output = registry.invoke("Payroll Export", "all").await;
        assert_eq!(output.status, ToolStatus::NotFound);
        assert!(output.text.contains("[Echo]"));
    }

    #[test]
    fn registering_twice_keeps_one_entry() {
        let mut registry = ToolRegistry::default();
        registry.register(Echo);
        registry.register(Echo);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.descriptors()[0].description, "Repeats its input.");
    }
}
