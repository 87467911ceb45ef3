use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use hrdesk_core::domain::employee::EmployeeId;
use hrdesk_core::domain::policy::{PolicyMatch, PolicySource};
use hrdesk_core::domain::transcript::{parse_history_target, stored_fact_turns};
use hrdesk_db::repositories::EmployeeRepository;
use hrdesk_db::transcripts::TranscriptStore;

use crate::guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy, ACCESS_DENIED};
use crate::session::Session;
use crate::tools::{Tool, ToolOutput, ToolRegistry};

pub const INVALID_HISTORY_NAME: &str =
    "Invalid file name. Please use the format chat_history_EMP123.txt";
const RECORDS_UNAVAILABLE: &str = "Employee records are unavailable right now. Please try again later.";
const MEMORY_UNAVAILABLE: &str = "Conversation memory is unavailable right now. Please try again later.";
const POLICIES_UNAVAILABLE: &str =
    "Policy source unavailable. Please ensure the policy file exists and is readable.";

/// Shared handles every HR tool reads through.
pub struct ToolContext {
    session: Arc<Session>,
    employees: Arc<dyn EmployeeRepository>,
    policies: PolicySource,
    transcripts: Arc<dyn TranscriptStore>,
    guardrails: GuardrailPolicy,
}

impl ToolContext {
    pub fn new(
        session: Arc<Session>,
        employees: Arc<dyn EmployeeRepository>,
        policies: PolicySource,
        transcripts: Arc<dyn TranscriptStore>,
    ) -> Self {
        Self { session, employees, policies, transcripts, guardrails: GuardrailPolicy }
    }

    fn authorize(&self, intent: &GuardrailIntent) -> Result<EmployeeId, ToolOutput> {
        match self.guardrails.evaluate(self.session.current(), intent) {
            GuardrailDecision::Allow { employee_id } => Ok(employee_id),
            GuardrailDecision::Deny { reason_code, user_message } => {
                warn!(
                    event_name = "hrdesk.tool.denied",
                    action = intent.action_key(),
                    reason_code,
                    "tool call denied"
                );
                Err(match intent {
                    GuardrailIntent::ClearHistory { .. } if reason_code != "not_authenticated" => {
                        ToolOutput::validation_failed(user_message)
                    }
                    _ => ToolOutput::access_denied(user_message),
                })
            }
        }
    }

    /// The first id-shaped token (one carrying a digit) names the record, so
    /// `EMP123 please` and `leave balance EMP123` both target EMP123. Without
    /// one the last token is used; anything that does not parse as an id is
    /// treated like a foreign id.
    fn authorize_record(&self, input: &str) -> Result<EmployeeId, ToolOutput> {
        let Some(target) = target_token(input) else {
            warn!(
                event_name = "hrdesk.tool.denied",
                action = "employee.record_read",
                reason_code = "unparseable_target",
                "tool call denied"
            );
            return Err(ToolOutput::access_denied(ACCESS_DENIED));
        };
        self.authorize(&GuardrailIntent::EmployeeRecord { target })
    }
}

fn target_token(input: &str) -> Option<EmployeeId> {
    let tokens: Vec<&str> = input
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_')))
        .filter(|token| !token.is_empty())
        .collect();
    let token = tokens
        .iter()
        .find(|token| token.chars().any(|c| c.is_ascii_digit()))
        .or_else(|| tokens.last())?;
    EmployeeId::parse(token).ok()
}

fn topic_list(topics: &[&str]) -> String {
    match topics {
        [] => String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{}, or {last}", head.join(", ")),
    }
}

pub struct LeaveBalanceTool {
    context: Arc<ToolContext>,
}

#[async_trait]
impl Tool for LeaveBalanceTool {
    fn name(&self) -> &'static str {
        "Leave Balance Check"
    }

    fn description(&self) -> &'static str {
        "Useful for checking your leave balance. When a user says something like 'leave balance EMP123', \
         this tool should be called. The first employee id in the input (like 'EMP123') is used. \
         Note: you can only query your own employee id."
    }

    async fn execute(&self, input: &str) -> ToolOutput {
        let employee_id = match self.context.authorize_record(input) {
            Ok(employee_id) => employee_id,
            Err(denied) => return denied,
        };
        match self.context.employees.find(&employee_id, None).await {
            Ok(Some(record)) => ToolOutput::ok(format!(
                "Employee {} has {} vacation days remaining.",
                record.id, record.leave_balance
            )),
            Ok(None) => ToolOutput::not_found(format!("No record found for employee {employee_id}.")),
            Err(error) => {
                warn!(event_name = "hrdesk.tool.store_failed", error = %error, "employee lookup failed");
                ToolOutput::source_unavailable(RECORDS_UNAVAILABLE)
            }
        }
    }
}

pub struct PolicyLookupTool {
    context: Arc<ToolContext>,
}

#[async_trait]
impl Tool for PolicyLookupTool {
    fn name(&self) -> &'static str {
        "HR Policy Lookup"
    }

    fn description(&self) -> &'static str {
        "Useful for retrieving HR policies. When a user asks about policies such as 'vacation', 'healthcare', \
         or 'promotion', this tool should be called. The input should be a single keyword."
    }

    async fn execute(&self, input: &str) -> ToolOutput {
        let source = self.context.policies.clone();
        let catalog = match tokio::task::spawn_blocking(move || source.load()).await {
            Ok(Ok(catalog)) => catalog,
            Ok(Err(error)) => {
                warn!(event_name = "hrdesk.policy.unavailable", error = %error, "policy source unreadable");
                return ToolOutput::source_unavailable(POLICIES_UNAVAILABLE);
            }
            Err(error) => {
                warn!(event_name = "hrdesk.policy.unavailable", error = %error, "policy load task failed");
                return ToolOutput::source_unavailable(POLICIES_UNAVAILABLE);
            }
        };

        let keyword = input.trim().trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.' | '?'));
        match catalog.lookup(keyword) {
            PolicyMatch::Found { description, .. } => ToolOutput::ok(description),
            PolicyMatch::Missing { known_topics } if known_topics.is_empty() => {
                ToolOutput::not_found("Policy not found. No policies are currently published.")
            }
            PolicyMatch::Missing { known_topics } => ToolOutput::not_found(format!(
                "Policy not found. Please ask about {}.",
                topic_list(&known_topics)
            )),
        }
    }
}

pub struct EmployeeDetailsTool {
    context: Arc<ToolContext>,
}

#[async_trait]
impl Tool for EmployeeDetailsTool {
    fn name(&self) -> &'static str {
        "Employee Details Lookup"
    }

    fn description(&self) -> &'static str {
        "Retrieve your own employee details using your employee ID. \
         Use it if you need to check user details like name, email, age, etc. \
         The input should be a single keyword. Only the employee id in the format 'EMP123' is allowed."
    }

    async fn execute(&self, input: &str) -> ToolOutput {
        let employee_id = match self.context.authorize_record(input) {
            Ok(employee_id) => employee_id,
            Err(denied) => return denied,
        };
        match self.context.employees.find(&employee_id, None).await {
            Ok(Some(record)) => ToolOutput::ok(record.describe()),
            Ok(None) => ToolOutput::not_found(format!("No record found for employee {employee_id}.")),
            Err(error) => {
                warn!(event_name = "hrdesk.tool.store_failed", error = %error, "employee lookup failed");
                ToolOutput::source_unavailable(RECORDS_UNAVAILABLE)
            }
        }
    }
}

pub struct StoreInformationTool {
    context: Arc<ToolContext>,
}

#[async_trait]
impl Tool for StoreInformationTool {
    fn name(&self) -> &'static str {
        "Store Information"
    }

    fn description(&self) -> &'static str {
        "Store user details such as name, department, or preferences. \
         Input should be a sentence describing the information."
    }

    async fn execute(&self, input: &str) -> ToolOutput {
        let employee_id = match self.context.authorize(&GuardrailIntent::OwnMemory) {
            Ok(employee_id) => employee_id,
            Err(denied) => return denied,
        };
        let fact = input.trim();
        if fact.is_empty() {
            return ToolOutput::validation_failed("Nothing to store. Please describe the information to save.");
        }
        match self.context.transcripts.append(&employee_id, stored_fact_turns(fact)).await {
            Ok(_) => ToolOutput::ok(format!("I've saved this information: {fact}")),
            Err(error) => {
                warn!(event_name = "hrdesk.memory.unavailable", error = %error, "store failed");
                ToolOutput::source_unavailable(MEMORY_UNAVAILABLE)
            }
        }
    }
}

pub struct RetrieveMemoryTool {
    context: Arc<ToolContext>,
}

#[async_trait]
impl Tool for RetrieveMemoryTool {
    fn name(&self) -> &'static str {
        "Retrieve Memory"
    }

    fn description(&self) -> &'static str {
        "Retrieve stored conversation details. Input can be anything."
    }

    async fn execute(&self, _input: &str) -> ToolOutput {
        let employee_id = match self.context.authorize(&GuardrailIntent::OwnMemory) {
            Ok(employee_id) => employee_id,
            Err(denied) => return denied,
        };
        match self.context.transcripts.load(&employee_id).await {
            Ok(transcript) if transcript.is_empty() => {
                ToolOutput::ok("No conversation memory stored yet.")
            }
            Ok(transcript) => ToolOutput::ok(format!(
                "Here's what I remember from our conversation:\n{}",
                transcript.render()
            )),
            Err(error) => {
                warn!(event_name = "hrdesk.memory.unavailable", error = %error, "retrieve failed");
                ToolOutput::source_unavailable(MEMORY_UNAVAILABLE)
            }
        }
    }
}

pub struct ClearMemoryTool {
    context: Arc<ToolContext>,
}

#[async_trait]
impl Tool for ClearMemoryTool {
    fn name(&self) -> &'static str {
        "Clear Memory"
    }

    fn description(&self) -> &'static str {
        "Clears all stored conversation history and user information. Input should be of the format \
         chat_history_EMP123.txt. Replace EMP123 with your employee id. If you're not sure about the \
         employee id, use the Retrieve Memory tool."
    }

    async fn execute(&self, input: &str) -> ToolOutput {
        let Ok(owner) = parse_history_target(input) else {
            return ToolOutput::validation_failed(INVALID_HISTORY_NAME);
        };
        let employee_id = match self.context.authorize(&GuardrailIntent::ClearHistory { owner }) {
            Ok(employee_id) => employee_id,
            Err(denied) => return denied,
        };
        match self.context.transcripts.reset_to_seed(&employee_id).await {
            Ok(_) => ToolOutput::ok(format!("Chat history for {employee_id} has been reset.")),
            Err(error) => {
                warn!(event_name = "hrdesk.memory.unavailable", error = %error, "reset failed");
                ToolOutput::source_unavailable(MEMORY_UNAVAILABLE)
            }
        }
    }
}

pub struct ShowMemoryTool {
    context: Arc<ToolContext>,
}

#[async_trait]
impl Tool for ShowMemoryTool {
    fn name(&self) -> &'static str {
        "Show Memory"
    }

    fn description(&self) -> &'static str {
        "Displays all stored memory data for debugging."
    }

    async fn execute(&self, _input: &str) -> ToolOutput {
        let employee_id = match self.context.authorize(&GuardrailIntent::OwnMemory) {
            Ok(employee_id) => employee_id,
            Err(denied) => return denied,
        };
        let transcript = match self.context.transcripts.load(&employee_id).await {
            Ok(transcript) => transcript,
            Err(error) => {
                warn!(event_name = "hrdesk.memory.unavailable", error = %error, "dump failed");
                return ToolOutput::source_unavailable(MEMORY_UNAVAILABLE);
            }
        };
        if transcript.is_empty() {
            return ToolOutput::ok("No memory stored.");
        }
        match serde_json::to_string_pretty(transcript.turns()) {
            Ok(dump) => ToolOutput::ok(dump),
            Err(error) => {
                warn!(event_name = "hrdesk.memory.unavailable", error = %error, "dump failed");
                ToolOutput::source_unavailable(MEMORY_UNAVAILABLE)
            }
        }
    }
}

/// The seven HR tools, in the order the agent prompt lists them.
pub fn hr_registry(context: Arc<ToolContext>) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(LeaveBalanceTool { context: context.clone() });
    registry.register(PolicyLookupTool { context: context.clone() });
    registry.register(EmployeeDetailsTool { context: context.clone() });
    registry.register(StoreInformationTool { context: context.clone() });
    registry.register(RetrieveMemoryTool { context: context.clone() });
    registry.register(ClearMemoryTool { context: context.clone() });
    registry.register(ShowMemoryTool { context });
    registry
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use tempfile::TempDir;

    use hrdesk_core::domain::employee::{EmployeeId, EmployeeRecord, PasswordHash};
    use hrdesk_core::domain::policy::PolicySource;
    use hrdesk_core::domain::transcript::Transcript;
    use hrdesk_db::repositories::InMemoryEmployeeRepository;
    use hrdesk_db::transcripts::{FileTranscriptStore, MemoryState, TranscriptStore};

    use super::{hr_registry, ToolContext, INVALID_HISTORY_NAME};
    use crate::session::Session;
    use crate::tools::{ToolRegistry, ToolStatus};

    fn emp(raw: &str) -> EmployeeId {
        EmployeeId::parse(raw).expect("valid id")
    }

    fn directory() -> Arc<InMemoryEmployeeRepository> {
        let mut alex = EmployeeRecord::new(emp("EMP123"), 15);
        alex.name = Some("Alex Morgan".to_string());
        alex.email = Some("alex.morgan@example.com".to_string());
        alex.age = Some(29);
        alex.password_hash = Some(PasswordHash::from_plaintext("welcome123"));
        let priya = EmployeeRecord::new(emp("EMP456"), 10);
        Arc::new(InMemoryEmployeeRepository::with_records([alex, priya]))
    }

    struct Harness {
        _dir: TempDir,
        transcripts: Arc<FileTranscriptStore>,
        registry: ToolRegistry,
    }

    fn harness(session: Session, policies: PolicySource) -> Harness {
        let dir = TempDir::new().expect("temp dir");
        let transcripts = Arc::new(FileTranscriptStore::new(dir.path()));
        let context = ToolContext::new(Arc::new(session), directory(), policies, transcripts.clone());
        Harness { _dir: dir, transcripts, registry: hr_registry(Arc::new(context)) }
    }

    fn signed_in() -> Harness {
        harness(Session::bound(emp("EMP123")), PolicySource::Builtin)
    }

    #[test]
    fn registry_lists_seven_tools_in_order() {
        let harness = signed_in();
        assert_eq!(
            harness.registry.names(),
            vec![
                "Leave Balance Check",
                "HR Policy Lookup",
                "Employee Details Lookup",
                "Store Information",
                "Retrieve Memory",
                "Clear Memory",
                "Show Memory",
            ]
        );
    }

    #[tokio::test]
    async fn leave_balance_only_for_own_id() {
        let harness = signed_in();

        let own = harness.registry.invoke("Leave Balance Check", "leave balance EMP123").await;
        assert_eq!(own.status, ToolStatus::Ok);
        assert_eq!(own.text, "Employee EMP123 has 15 vacation days remaining.");

        let foreign = harness.registry.invoke("Leave Balance Check", "EMP456").await;
        assert_eq!(foreign.status, ToolStatus::AccessDenied);
        assert_eq!(foreign.text, "Access Denied");

        let garbage = harness.registry.invoke("Leave Balance Check", "").await;
        assert_eq!(garbage.text, "Access Denied");
    }

    #[tokio::test]
    async fn first_id_in_free_text_names_the_record() {
        let harness = signed_in();

        let trailing_words = harness.registry.invoke("Leave Balance Check", "EMP123 please").await;
        assert_eq!(trailing_words.status, ToolStatus::Ok);
        assert_eq!(trailing_words.text, "Employee EMP123 has 15 vacation days remaining.");

        let details = harness.registry.invoke("Employee Details Lookup", "EMP123, thanks").await;
        assert_eq!(details.status, ToolStatus::Ok);

        let foreign = harness.registry.invoke("Leave Balance Check", "EMP456 please").await;
        assert_eq!(foreign.status, ToolStatus::AccessDenied);
    }

    #[tokio::test]
    async fn authenticated_but_absent_record_is_not_found() {
        let harness = harness(Session::bound(emp("EMP777")), PolicySource::Builtin);
        let output = harness.registry.invoke("Leave Balance Check", "EMP777").await;
        assert_eq!(output.status, ToolStatus::NotFound);
        assert_eq!(output.text, "No record found for employee EMP777.");
    }

    #[tokio::test]
    async fn no_session_denies_record_and_memory_tools() {
        let harness = harness(Session::new(), PolicySource::Builtin);
        for tool in ["Leave Balance Check", "Employee Details Lookup", "Store Information", "Show Memory"] {
            let output = harness.registry.invoke(tool, "EMP123").await;
            assert_eq!(output.status, ToolStatus::AccessDenied, "{tool}");
        }
    }

    #[tokio::test]
    async fn details_never_include_the_hash() {
        let harness = signed_in();
        let output = harness.registry.invoke("Employee Details Lookup", "'EMP123'").await;
        assert_eq!(output.status, ToolStatus::Ok);
        assert!(output.text.contains("Alex Morgan"));
        assert!(output.text.contains("leave balance: 15 days"));
        assert!(!output.text.contains(PasswordHash::from_plaintext("welcome123").as_hex()));
    }

    #[tokio::test]
    async fn policy_lookup_is_case_insensitive_and_total() {
        let harness = signed_in();
        for topic in ["vacation", "Healthcare", "PROMOTION", "onboarding", " benefits "] {
            let output = harness.registry.invoke("HR Policy Lookup", topic).await;
            assert_eq!(output.status, ToolStatus::Ok, "{topic}");
        }

        let miss = harness.registry.invoke("HR Policy Lookup", "parking").await;
        assert_eq!(miss.status, ToolStatus::NotFound);
        assert_eq!(
            miss.text,
            "Policy not found. Please ask about benefits, healthcare, onboarding, promotion, or vacation."
        );
    }

    #[tokio::test]
    async fn unreadable_policy_file_degrades_to_message() {
        let dir = TempDir::new().expect("temp dir");
        let harness = harness(
            Session::bound(emp("EMP123")),
            PolicySource::File(dir.path().join("missing.txt")),
        );
        let output = harness.registry.invoke("HR Policy Lookup", "vacation").await;
        assert_eq!(output.status, ToolStatus::SourceUnavailable);
        assert!(output.text.starts_with("Policy source unavailable."));
    }

    #[tokio::test]
    async fn policy_file_is_reread_on_each_lookup() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("policies.txt");
        fs::write(&path, "remote: Two remote days per week.\n").expect("write policies");
        let harness = harness(Session::bound(emp("EMP123")), PolicySource::File(path.clone()));

        let first = harness.registry.invoke("HR Policy Lookup", "Remote").await;
        assert_eq!(first.text, "Two remote days per week.");

        fs::write(&path, "remote: Fully remote.\n").expect("rewrite policies");
        let second = harness.registry.invoke("HR Policy Lookup", "remote").await;
        assert_eq!(second.text, "Fully remote.");
    }

    #[tokio::test]
    async fn stored_facts_are_retrievable() {
        let harness = signed_in();
        let stored = harness.registry.invoke("Store Information", "my name is Alex").await;
        assert_eq!(stored.text, "I've saved this information: my name is Alex");

        let recalled = harness.registry.invoke("Retrieve Memory", "anything").await;
        assert!(recalled.text.starts_with("Here's what I remember from our conversation:\n"));
        assert!(recalled.text.contains("Human: my name is Alex"));
        assert!(recalled.text.contains("AI: Got it! I'll remember that: my name is Alex"));

        let empty = harness.registry.invoke("Store Information", "   ").await;
        assert_eq!(empty.status, ToolStatus::ValidationFailed);
        assert_eq!(harness.transcripts.load(&emp("EMP123")).await.expect("load").len(), 2);
    }

    #[tokio::test]
    async fn stored_facts_are_recalled_in_call_order() {
        let harness = signed_in();
        let facts = ["my name is Alex", "I work in finance", "I prefer email"];
        for fact in facts {
            let stored = harness.registry.invoke("Store Information", fact).await;
            assert_eq!(stored.status, ToolStatus::Ok, "{fact}");
        }

        let recalled = harness.registry.invoke("Retrieve Memory", "").await;
        let positions: Vec<usize> = facts
            .iter()
            .map(|fact| {
                recalled
                    .text
                    .find(&format!("Human: {fact}"))
                    .unwrap_or_else(|| panic!("missing `{fact}` in {}", recalled.text))
            })
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{positions:?}");
        assert_eq!(harness.transcripts.load(&emp("EMP123")).await.expect("load").len(), 6);
    }

    #[tokio::test]
    async fn clearing_twice_still_yields_the_seed() {
        let harness = signed_in();
        harness.registry.invoke("Store Information", "my name is Alex").await;
        harness.registry.invoke("Store Information", "I work in finance").await;

        let first = harness.registry.invoke("Clear Memory", "chat_history_EMP123.txt").await;
        let second = harness.registry.invoke("Clear Memory", "\"chat_history_EMP123.txt\"").await;
        assert_eq!(first.status, ToolStatus::Ok);
        assert_eq!(second.status, ToolStatus::Ok);

        let transcript = harness.transcripts.load(&emp("EMP123")).await.expect("load");
        assert_eq!(transcript.contents(), Transcript::seed(&emp("EMP123")).contents());
    }

    #[tokio::test]
    async fn empty_memory_messages() {
        let harness = signed_in();
        let recalled = harness.registry.invoke("Retrieve Memory", "").await;
        assert_eq!(recalled.text, "No conversation memory stored yet.");
        let shown = harness.registry.invoke("Show Memory", "").await;
        assert_eq!(shown.text, "No memory stored.");
    }

    #[tokio::test]
    async fn clear_memory_validates_target() {
        let harness = signed_in();
        harness.registry.invoke("Store Information", "temporary").await;

        let malformed = harness.registry.invoke("Clear Memory", "history.txt").await;
        assert_eq!(malformed.status, ToolStatus::ValidationFailed);
        assert_eq!(malformed.text, INVALID_HISTORY_NAME);

        let foreign = harness.registry.invoke("Clear Memory", "chat_history_EMP456.txt").await;
        assert_eq!(foreign.status, ToolStatus::ValidationFailed);
        assert!(foreign.text.contains("only clear your own"));

        let untouched = harness.transcripts.load(&emp("EMP123")).await.expect("load");
        assert_eq!(untouched.turns()[0].content, "temporary");
    }

    #[tokio::test]
    async fn login_scenario_ends_with_seed_transcript() {
        let harness = signed_in();
        let balance = harness.registry.invoke("Leave Balance Check", "EMP123").await;
        assert!(balance.text.contains("15 vacation days remaining"));
        let denied = harness.registry.invoke("Leave Balance Check", "EMP456").await;
        assert_eq!(denied.text, "Access Denied");

        let cleared = harness.registry.invoke("Clear Memory", "chat_history_EMP123.txt").await;
        assert_eq!(cleared.text, "Chat history for EMP123 has been reset.");

        let state = harness.transcripts.state(&emp("EMP123")).await.expect("state");
        let MemoryState::Active(transcript) = state else {
            panic!("expected active transcript after reset");
        };
        assert_eq!(transcript.contents(), Transcript::seed(&emp("EMP123")).contents());
        assert_eq!(transcript.turns()[0].content, "Employee id is EMP123");

        let dump = harness.registry.invoke("Show Memory", "").await;
        assert!(dump.text.contains("\"type\": \"human\""));
    }
}
