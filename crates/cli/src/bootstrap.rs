use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use hrdesk_agent::llm::{ChatCompletionsClient, LlmClient};
use hrdesk_agent::router::Router;
use hrdesk_agent::runtime::AgentRuntime;
use hrdesk_agent::session::Session;
use hrdesk_agent::tools::{hr_registry, ToolContext};
use hrdesk_core::config::{AgentConfig, AppConfig, DatabaseConfig};
use hrdesk_core::domain::policy::PolicySource;
use hrdesk_db::fixtures::seed_sample_employees;
use hrdesk_db::repositories::{EmployeeRepository, SqlEmployeeRepository};
use hrdesk_db::transcripts::{FileTranscriptStore, TranscriptStore};
use hrdesk_db::{connect_with_settings, migrations};

/// Connects, migrates and optionally seeds the credential store.
pub async fn open_employee_store(database: &DatabaseConfig) -> Result<SqlEmployeeRepository> {
    let pool =
        connect_with_settings(&database.url, database.max_connections, database.timeout_secs)
            .await
            .with_context(|| format!("failed to connect to `{}`", database.url))?;
    migrations::run_pending(&pool).await.context("failed to apply migrations")?;

    let repository = SqlEmployeeRepository::new(pool);
    if database.seed_sample_employees {
        seed_sample_employees(&repository).await.context("failed to seed sample employees")?;
    }
    Ok(repository)
}

/// Everything one chat process needs, wired around a single session.
pub struct ChatServices {
    pub session: Arc<Session>,
    pub employees: Arc<dyn EmployeeRepository>,
    pub transcripts: Arc<dyn TranscriptStore>,
    pub runtime: AgentRuntime,
}

impl ChatServices {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        employees: Arc<dyn EmployeeRepository>,
        transcripts: Arc<dyn TranscriptStore>,
        policies: PolicySource,
        agent: &AgentConfig,
    ) -> Self {
        let session = Arc::new(Session::new());
        let context =
            ToolContext::new(session.clone(), employees.clone(), policies, transcripts.clone());
        let mut runtime =
            AgentRuntime::new(llm.clone(), hr_registry(Arc::new(context)), transcripts.clone(), session.clone())
                .with_max_iterations(agent.max_iterations);
        if agent.routing {
            runtime = runtime.with_router(Router::new(llm));
        }
        Self { session, employees, transcripts, runtime }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let employees = open_employee_store(&config.database).await?;
        let llm = ChatCompletionsClient::from_config(&config.llm)?;
        let transcripts = FileTranscriptStore::new(config.memory.directory.clone());
        let policies = PolicySource::from_path(config.policies.path.as_deref());

        info!(
            event_name = "hrdesk.chat.bootstrapped",
            provider = ?config.llm.provider,
            model = %config.llm.model,
            policies = %policies.describe(),
            memory_directory = %config.memory.directory.display(),
            routing = config.agent.routing,
            "chat services ready"
        );

        Ok(Self::new(
            Arc::new(llm),
            Arc::new(employees),
            Arc::new(transcripts),
            policies,
            &config.agent,
        ))
    }
}
