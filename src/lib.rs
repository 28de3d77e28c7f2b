pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use cli::Commands;

pub use application::{
    CatalogRepository, ConversationController, CustomerLookup, FieldExtractor, IntentClassifier,
    ListPurchasesUseCase, ProcessRefundUseCase, RefundExecutor, RefundStep, ResponseRenderer,
    SearchCatalogUseCase, SessionManager, TurnOutcome,
};

pub use connector::{
    AnthropicClient, AnthropicSettings, ChatClient, Container, ContainerConfig,
    DuckdbCatalogRepository, DuckdbCustomerLookup, DuckdbRefundExecutor, DuckdbStore, LlmFieldExtractor,
    LlmIntentClassifier, LlmMode, MockChatClient, Router, RuleBasedFieldExtractor,
    RuleBasedIntentClassifier, TemplateRenderer,
};

pub use domain::{
    CatalogEntry, CatalogKind, CatalogQuery, Classification, Confirmation, ConversationPhase,
    CustomerIdentity, DomainError, Era, FollowUp, Intent, PurchaseLine, RefundFields, RefundOutcome,
    RefundPolicy, ReplyPart, Resolution, SessionState, Turn,
};
