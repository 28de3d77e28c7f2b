use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{debug, info};

use crate::application::{
    CatalogRepository, ConversationController, CustomerLookup, FieldExtractor, IntentClassifier,
    ListPurchasesUseCase, ProcessRefundUseCase, RefundExecutor, ResponseRenderer,
    SearchCatalogUseCase, SessionManager,
};
use crate::connector::adapter::{
    AnthropicClient, ChatClient, DuckdbCatalogRepository, DuckdbCustomerLookup,
    DuckdbRefundExecutor, DuckdbStore, LlmFieldExtractor, LlmIntentClassifier,
    RuleBasedFieldExtractor, RuleBasedIntentClassifier, TemplateRenderer,
};
use crate::domain::RefundPolicy;

/// Which implementation understands the customer's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LlmMode {
    /// Keyword and pattern rules, fully offline.
    #[default]
    Rules,
    /// An Anthropic-compatible Messages API, configured from `ANTHROPIC_*`.
    Anthropic,
}

pub struct ContainerConfig {
    /// DuckDB file holding the store. Ignored when `memory` is set.
    pub database: PathBuf,
    /// Use a throwaway in-memory store loaded with the sample data.
    pub memory: bool,
    /// Load the sample data into an empty on-disk store.
    pub seed: bool,
    pub llm: LlmMode,
    /// Purchases older than this many days are not refundable. `None`
    /// disables the check.
    pub refund_window_days: Option<i64>,
    /// Refuse line-level refunds that leave part of an invoice unrefunded.
    pub strict_invoices: bool,
    /// Number of trailing turns shown to the intent classifier.
    pub history_window: usize,
    /// Upper bound on catalog results.
    pub max_results: usize,
    /// Sessions untouched for this long are dropped.
    pub session_idle_timeout: Duration,
    /// Upper bound on live sessions.
    pub max_sessions: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("tunedesk.duckdb"),
            memory: false,
            seed: false,
            llm: LlmMode::Rules,
            refund_window_days: None,
            strict_invoices: false,
            history_window: ConversationController::DEFAULT_HISTORY_WINDOW,
            max_results: SearchCatalogUseCase::DEFAULT_MAX_RESULTS,
            session_idle_timeout: SessionManager::DEFAULT_IDLE_TIMEOUT,
            max_sessions: SessionManager::DEFAULT_MAX_SESSIONS,
        }
    }
}

impl ContainerConfig {
    /// In-memory store with sample data and rule-based understanding.
    pub fn in_memory() -> Self {
        Self {
            memory: true,
            ..Self::default()
        }
    }
}

pub struct Container {
    store: DuckdbStore,
    lookup: Arc<dyn CustomerLookup>,
    catalog_use_case: Arc<SearchCatalogUseCase>,
    renderer: Arc<dyn ResponseRenderer>,
    session_manager: Arc<SessionManager>,
    config: ContainerConfig,
}

impl Container {
    pub async fn new(config: ContainerConfig) -> Result<Self> {
        let store = if config.memory {
            debug!("Using in-memory DuckDB store");
            DuckdbStore::in_memory()?
        } else {
            if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            debug!("Using DuckDB store at {}", config.database.display());
            DuckdbStore::new(&config.database)?
        };

        if config.memory || config.seed {
            store.seed_sample_data().await?;
        }

        // All adapters share the store's single connection.
        let conn = store.shared_connection();
        let lookup: Arc<dyn CustomerLookup> =
            Arc::new(DuckdbCustomerLookup::with_connection(Arc::clone(&conn)));
        let executor: Arc<dyn RefundExecutor> =
            Arc::new(DuckdbRefundExecutor::with_connection(Arc::clone(&conn)));
        let catalog: Arc<dyn CatalogRepository> =
            Arc::new(DuckdbCatalogRepository::with_connection(conn));

        let (classifier, extractor): (Arc<dyn IntentClassifier>, Arc<dyn FieldExtractor>) =
            match config.llm {
                LlmMode::Rules => {
                    debug!("Using rule-based intent classifier and field extractor");
                    (
                        Arc::new(RuleBasedIntentClassifier::new()?),
                        Arc::new(RuleBasedFieldExtractor::new()?),
                    )
                }
                LlmMode::Anthropic => {
                    let client = AnthropicClient::from_env();
                    info!("Using LLM at {} (model {})", client.endpoint(), client.model());
                    let client: Arc<dyn ChatClient> = Arc::new(client);
                    (
                        Arc::new(LlmIntentClassifier::new(Arc::clone(&client))),
                        Arc::new(LlmFieldExtractor::new(client)),
                    )
                }
            };

        let policy = RefundPolicy::new()
            .with_window_days(config.refund_window_days)
            .with_partial_invoices(!config.strict_invoices);
        let refund_use_case = Arc::new(ProcessRefundUseCase::new(Arc::clone(&lookup), executor).with_policy(policy));
        let catalog_use_case = Arc::new(SearchCatalogUseCase::new(catalog).with_max_results(config.max_results));
        let renderer: Arc<dyn ResponseRenderer> = Arc::new(TemplateRenderer::new());

        let controller = ConversationController::new(
            classifier,
            extractor,
            refund_use_case,
            Arc::clone(&catalog_use_case),
            Arc::clone(&renderer),
        )
        .with_history_window(config.history_window);
        let session_manager = Arc::new(
            SessionManager::new(Arc::new(controller))
                .with_idle_timeout(config.session_idle_timeout)
                .with_max_sessions(config.max_sessions),
        );

        Ok(Self {
            store,
            lookup,
            catalog_use_case,
            renderer,
            session_manager,
            config,
        })
    }

    pub fn session_manager(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session_manager)
    }

    pub fn search_use_case(&self) -> Arc<SearchCatalogUseCase> {
        Arc::clone(&self.catalog_use_case)
    }

    pub fn list_purchases_use_case(&self) -> ListPurchasesUseCase {
        ListPurchasesUseCase::new(Arc::clone(&self.lookup))
    }

    pub fn renderer(&self) -> Arc<dyn ResponseRenderer> {
        Arc::clone(&self.renderer)
    }

    pub fn store(&self) -> &DuckdbStore {
        &self.store
    }

    pub fn database(&self) -> Option<&std::path::Path> {
        (!self.config.memory).then_some(self.config.database.as_path())
    }
}
