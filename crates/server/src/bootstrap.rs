use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use autostream_agent::{
    GroqClient, HandleChannelLookup, KnowledgeBase, LeadSink, TracingLeadSink, TurnRuntime,
    WebhookLeadSink,
};
use autostream_core::config::{AppConfig, ConfigError, LoadOptions};
use autostream_memory::{SessionLocks, SessionStore};

use crate::routes::AppState;

const CAPTURE_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client initialization failed: {0}")]
    Llm(String),
    #[error("capture sink initialization failed: {0}")]
    CaptureSink(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let store = Arc::new(SessionStore::new(
        config.memory.max_sessions,
        Duration::from_secs(config.memory.session_timeout_secs),
        config.memory.max_turns,
    ));
    let locks = Arc::new(SessionLocks::default());

    let knowledge = match KnowledgeBase::load(&config.retrieval.knowledge_path, config.retrieval.chunk_size)
    {
        Ok(knowledge) => {
            info!(
                event_name = "system.bootstrap.knowledge_loaded",
                correlation_id = "bootstrap",
                path = %config.retrieval.knowledge_path.display(),
                chunks = knowledge.chunk_count(),
                "knowledge base loaded"
            );
            knowledge
        }
        Err(error) => {
            warn!(
                event_name = "system.bootstrap.knowledge_missing",
                correlation_id = "bootstrap",
                path = %config.retrieval.knowledge_path.display(),
                error = %error,
                "knowledge base unavailable, retrieval will return nothing"
            );
            KnowledgeBase::empty()
        }
    };

    let llm =
        GroqClient::new(&config.llm).map_err(|error| BootstrapError::Llm(error.to_string()))?;

    let lead_sink: Arc<dyn LeadSink> = match &config.capture.webhook_url {
        Some(webhook_url) => {
            info!(
                event_name = "system.bootstrap.capture_sink",
                correlation_id = "bootstrap",
                sink = "webhook",
                "leads will be forwarded to the capture webhook"
            );
            Arc::new(
                WebhookLeadSink::new(webhook_url.clone(), CAPTURE_WEBHOOK_TIMEOUT)
                    .map_err(|error| BootstrapError::CaptureSink(error.to_string()))?,
            )
        }
        None => Arc::new(TracingLeadSink),
    };

    let runtime = TurnRuntime::new(
        Arc::new(llm),
        Arc::new(knowledge),
        Arc::new(HandleChannelLookup),
        lead_sink,
        config.retrieval.top_k,
    );

    let state = AppState { store, locks, runtime: Arc::new(runtime) };

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        max_sessions = config.memory.max_sessions,
        session_timeout_secs = config.memory.session_timeout_secs,
        model = %config.llm.model,
        "application bootstrap complete"
    );

    Ok(Application { config, state })
}

#[cfg(test)]
mod tests {
    use autostream_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    #[tokio::test]
    async fn bootstrap_fails_fast_without_an_api_key() {
        let result = bootstrap(LoadOptions::default()).await;

        let error = match result {
            Ok(_) => panic!("bootstrap without an api key should fail"),
            Err(error) => error,
        };
        assert!(matches!(error, BootstrapError::Llm(ref message) if message.contains("api_key")));
    }

    #[tokio::test]
    async fn bootstrap_succeeds_with_overrides_and_missing_knowledge() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                llm_api_key: Some("gsk-test".to_string()),
                knowledge_path: Some("does/not/exist.md".into()),
                max_sessions: Some(5),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should tolerate a missing knowledge base");

        assert_eq!(app.config.memory.max_sessions, 5);
        assert_eq!(app.state.store.stats().max_sessions, 5);
    }
}
