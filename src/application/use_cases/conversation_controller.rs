use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{FieldExtractor, IntentClassifier, ResponseRenderer};
use crate::domain::{
    Confirmation, ConversationPhase, DomainError, FollowUp, IdentityKind, Intent, ReplyPart,
    SessionState,
};

use super::process_refund::{ProcessRefundUseCase, RefundStep};
use super::search_catalog::SearchCatalogUseCase;

/// What a single turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    /// The intent the turn was handled as, if it got that far.
    pub intent: Option<Intent>,
    /// Resting state of the session after the turn.
    pub phase: ConversationPhase,
    /// False when the turn failed and the session was left as it was.
    pub committed: bool,
}

/// Scratch data accumulated while a turn is handled.
#[derive(Default)]
struct TurnContext {
    parts: Vec<ReplyPart>,
    intent: Option<Intent>,
    /// Artists the customer referred to during this turn, used when a
    /// recommendation asks for "something similar" without naming anyone.
    artists: Vec<String>,
}

impl TurnContext {
    fn remember_artist(&mut self, artist: &str) {
        if !self.artists.iter().any(|a| a.eq_ignore_ascii_case(artist)) {
            self.artists.push(artist.to_string());
        }
    }
}

/// Per-session state machine routing each utterance to the refund flow, the
/// catalog or the general menu.
///
/// A turn runs against a copy of the session and is committed only when it
/// completes. Collaborator failures end the turn with an apology and leave
/// the session untouched.
pub struct ConversationController {
    classifier: Arc<dyn IntentClassifier>,
    extractor: Arc<dyn FieldExtractor>,
    refunds: Arc<ProcessRefundUseCase>,
    catalog: Arc<SearchCatalogUseCase>,
    renderer: Arc<dyn ResponseRenderer>,
    history_window: usize,
}

impl ConversationController {
    pub const DEFAULT_HISTORY_WINDOW: usize = 6;

    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        extractor: Arc<dyn FieldExtractor>,
        refunds: Arc<ProcessRefundUseCase>,
        catalog: Arc<SearchCatalogUseCase>,
        renderer: Arc<dyn ResponseRenderer>,
    ) -> Self {
        Self {
            classifier,
            extractor,
            refunds,
            catalog,
            renderer,
            history_window: Self::DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub async fn handle_turn(&self, state: &mut SessionState, utterance: &str) -> TurnOutcome {
        let mut draft = state.clone();
        let mut ctx = TurnContext::default();

        match self.run_turn(&mut draft, utterance, &mut ctx).await {
            Ok(()) => {
                let reply = self.renderer.render(&ctx.parts);
                draft.end_turn();
                draft.record_exchange(utterance, &reply);
                if !draft.invariant_holds() {
                    warn!(
                        "Session {} ended a turn in an inconsistent state ({}); resetting",
                        draft.id(),
                        draft.phase().as_str()
                    );
                    draft.clear_pending();
                    draft.set_phase(ConversationPhase::AwaitingIntent);
                }
                *state = draft;
                debug!(
                    "Session {} now {} (pending={:?}, follow-ups={})",
                    state.id(),
                    state.phase().as_str(),
                    state.pending_intent(),
                    state.follow_ups().len()
                );
                TurnOutcome {
                    reply,
                    intent: ctx.intent,
                    phase: state.phase(),
                    committed: true,
                }
            }
            Err(e) => {
                warn!("Turn failed for session {}: {}", state.id(), e);
                TurnOutcome {
                    reply: self.renderer.render(&[failure_part(&e)]),
                    intent: ctx.intent,
                    phase: state.phase(),
                    committed: false,
                }
            }
        }
    }

    async fn run_turn(&self, draft: &mut SessionState, utterance: &str, ctx: &mut TurnContext) -> Result<(), DomainError> {
        match draft.pending_intent() {
            Some(Intent::Refund) => {
                ctx.intent = Some(Intent::Refund);
                self.continue_refund(draft, utterance, ctx).await?;
            }
            pending => {
                if pending.is_some() {
                    debug!("Dropping stale pending intent {:?}", pending);
                    draft.clear_pending();
                }
                let history = draft.trailing_history(self.history_window).to_vec();
                let classification = self
                    .classifier
                    .classify(utterance, &history)
                    .await
                    .map_err(DomainError::into_classifier_failure)?
                    .refund_first(utterance);
                let (intent, follow_up) = classification.into_parts();
                info!("Classified utterance as {} (follow-up: {})", intent, follow_up.is_some());

                ctx.intent = Some(intent);
                if let Some(follow_up) = follow_up {
                    draft.queue_follow_up(follow_up);
                }
                self.dispatch(draft, intent, utterance, ctx).await?;
            }
        }

        self.drain_follow_ups(draft, ctx).await;
        Ok(())
    }

    async fn dispatch(
        &self,
        draft: &mut SessionState,
        intent: Intent,
        utterance: &str,
        ctx: &mut TurnContext,
    ) -> Result<(), DomainError> {
        match intent {
            Intent::Refund => {
                let fields = self
                    .extractor
                    .extract_refund_fields(utterance)
                    .await
                    .map_err(DomainError::into_extractor_failure)?;
                draft.begin_refund(fields);
                self.advance_refund(draft, false, ctx).await
            }
            Intent::MusicQuery => {
                draft.set_phase(ConversationPhase::ResolvingMusicQuery);
                let part = self.answer_music_query(utterance, ctx).await?;
                ctx.parts.push(part);
                draft.set_phase(ConversationPhase::TerminalTurn);
                Ok(())
            }
            Intent::General => {
                if !ctx.parts.contains(&ReplyPart::Menu) {
                    ctx.parts.push(ReplyPart::Menu);
                }
                draft.set_phase(ConversationPhase::TerminalTurn);
                Ok(())
            }
        }
    }

    /// The utterance answers a question asked by the refund flow.
    async fn continue_refund(&self, draft: &mut SessionState, utterance: &str, ctx: &mut TurnContext) -> Result<(), DomainError> {
        let update = self
            .extractor
            .extract_refund_fields(utterance)
            .await
            .map_err(DomainError::into_extractor_failure)?;
        let answer = Confirmation::detect(utterance);

        if draft.phase() == ConversationPhase::ConfirmingRefund {
            if !update.invoice_line_ids.is_empty() || update.has_purchase_filters() {
                // The customer picked specific items instead of answering yes/no.
                draft.fields_mut().clear_proposal();
                draft.fields_mut().merge(update);
                return self.advance_refund(draft, false, ctx).await;
            }
            return match answer {
                Some(Confirmation::Decline) => {
                    self.abandon_refund(draft, ctx);
                    Ok(())
                }
                Some(Confirmation::Affirm) => self.advance_refund(draft, true, ctx).await,
                None => {
                    draft.fields_mut().merge(update);
                    self.advance_refund(draft, false, ctx).await
                }
            };
        }

        if answer == Some(Confirmation::Decline) && update.is_empty() {
            self.abandon_refund(draft, ctx);
            return Ok(());
        }
        draft.fields_mut().merge(update);
        self.advance_refund(draft, false, ctx).await
    }

    async fn advance_refund(&self, draft: &mut SessionState, confirmed: bool, ctx: &mut TurnContext) -> Result<(), DomainError> {
        draft.set_phase(ConversationPhase::CollectingRefundInfo);
        if let Some(artist) = draft.collected_fields().artist_name.clone() {
            ctx.remember_artist(&artist);
        }

        loop {
            let step = self.refunds.execute(draft.collected_fields(), confirmed).await?;
            debug!("Refund step: {:?}", step);

            match step {
                RefundStep::NeedDetails(missing) => {
                    ctx.parts.push(ReplyPart::NeedRefundDetails { missing });
                }
                RefundStep::NotFound(identity) => {
                    let retry_with_name = matches!(identity, IdentityKind::Invoice(_) | IdentityKind::InvoiceReference(_))
                        && draft.collected_fields().customer_name.is_some()
                        && draft.collected_fields().phone.is_some();
                    match identity {
                        IdentityKind::Invoice(_) | IdentityKind::InvoiceReference(_) => {
                            draft.fields_mut().forget_invoice()
                        }
                        IdentityKind::Customer { .. } => draft.fields_mut().forget_customer(),
                    }
                    ctx.parts.push(ReplyPart::IdentityNotFound { identity });
                    if retry_with_name {
                        info!("Invoice did not resolve; falling back to name and phone");
                        continue;
                    }
                }
                RefundStep::Ambiguous { name } => {
                    draft.fields_mut().forget_phone();
                    ctx.parts.push(ReplyPart::AmbiguousCustomer { name });
                }
                RefundStep::NoMatchingPurchases { filtered } => {
                    ctx.parts.push(ReplyPart::NoMatchingPurchases { filtered });
                    if filtered {
                        draft.fields_mut().forget_selection();
                    } else {
                        self.finish_refund(draft, ctx);
                    }
                }
                RefundStep::AlreadyRefunded(line_ids) => {
                    ctx.parts.push(ReplyPart::AlreadyRefunded { line_ids });
                    self.finish_refund(draft, ctx);
                }
                RefundStep::OutsideWindow { window_days } => {
                    ctx.parts.push(ReplyPart::OutsideRefundWindow { window_days });
                    self.finish_refund(draft, ctx);
                }
                RefundStep::PartialInvoiceRefused(invoice_ids) => {
                    let fields = draft.fields_mut();
                    fields.invoice_line_ids.clear();
                    fields.clear_proposal();
                    ctx.parts.push(ReplyPart::PartialInvoiceRefused { invoice_ids });
                }
                RefundStep::AwaitingConfirmation { customer, lines } => {
                    draft
                        .fields_mut()
                        .propose(lines.iter().map(|line| line.invoice_line_id).collect());
                    draft.set_phase(ConversationPhase::ConfirmingRefund);
                    ctx.parts.push(ReplyPart::ConfirmRefund {
                        customer_name: customer.name,
                        lines,
                    });
                }
                RefundStep::Completed {
                    lines,
                    amount,
                    previously_refunded,
                    outside_window,
                } => {
                    for line in &lines {
                        ctx.remember_artist(&line.artist_name);
                    }
                    ctx.parts.push(ReplyPart::Refunded {
                        lines,
                        amount,
                        previously_refunded,
                        outside_window,
                    });
                    self.finish_refund(draft, ctx);
                }
                RefundStep::Failed(reason) => {
                    warn!("Refund failed, keeping collected fields: {}", reason);
                    if confirmed {
                        draft.set_phase(ConversationPhase::ConfirmingRefund);
                    }
                    ctx.parts.push(ReplyPart::RefundFailed);
                }
            }
            return Ok(());
        }
    }

    fn abandon_refund(&self, draft: &mut SessionState, ctx: &mut TurnContext) {
        info!("Refund abandoned in session {}", draft.id());
        ctx.parts.push(ReplyPart::RefundCancelled);
        self.finish_refund(draft, ctx);
    }

    fn finish_refund(&self, draft: &mut SessionState, ctx: &mut TurnContext) {
        if let Some(artist) = draft.collected_fields().artist_name.clone() {
            ctx.remember_artist(&artist);
        }
        draft.clear_pending();
        draft.set_phase(ConversationPhase::TerminalTurn);
    }

    async fn answer_music_query(&self, utterance: &str, ctx: &mut TurnContext) -> Result<ReplyPart, DomainError> {
        let mut query = self
            .extractor
            .extract_catalog_criteria(utterance)
            .await
            .map_err(DomainError::into_extractor_failure)?;

        if query.wants_similar() && query.similar_to_artist().is_none() {
            let reference = query
                .artist()
                .map(str::to_string)
                .or_else(|| ctx.artists.first().cloned());
            if let Some(artist) = reference {
                query = query.similar_to(artist);
            }
        }

        if !query.has_criteria() {
            debug!("Music request has nothing to search by; asking for a preference");
            return Ok(ReplyPart::NeedMusicPreference);
        }

        let summary = query.describe();
        let entries = self.catalog.execute(query).await?;
        Ok(ReplyPart::CatalogResults { summary, entries })
    }

    /// Runs queued follow-ups once no refund is waiting on the customer.
    /// A failing follow-up is reported in the reply and does not undo the
    /// rest of the turn.
    async fn drain_follow_ups(&self, draft: &mut SessionState, ctx: &mut TurnContext) {
        while draft.pending_intent().is_none() {
            let Some(follow_up) = draft.pop_follow_up() else {
                break;
            };
            info!("Running queued {} follow-up", follow_up.intent);

            let checkpoint = draft.clone();
            if let Err(e) = self.run_follow_up(draft, &follow_up, ctx).await {
                warn!("Follow-up '{}' failed: {}", follow_up.text, e);
                *draft = checkpoint;
                ctx.parts.push(failure_part(&e));
            }
        }
    }

    async fn run_follow_up(&self, draft: &mut SessionState, follow_up: &FollowUp, ctx: &mut TurnContext) -> Result<(), DomainError> {
        self.dispatch(draft, follow_up.intent, &follow_up.text, ctx).await
    }
}

fn failure_part(error: &DomainError) -> ReplyPart {
    if error.is_understanding_failure() {
        ReplyPart::Rephrase
    } else if error.is_storage_error() {
        ReplyPart::ServiceUnavailable
    } else {
        ReplyPart::Internal
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::application::{CatalogRepository, CustomerLookup, RefundExecutor};
    use crate::domain::{
        CatalogEntry, CatalogQuery, Classification, CustomerIdentity, CustomerRef, PurchaseLine,
        RefundFields, RefundOutcome, RefundableLines, Resolution, Turn,
    };

    struct FixedClassifier(Result<Classification, String>);

    #[async_trait]
    impl IntentClassifier for FixedClassifier {
        async fn classify(&self, _utterance: &str, _history: &[Turn]) -> Result<Classification, DomainError> {
            self.0.clone().map_err(|e| DomainError::upstream(e))
        }
    }

    /// Understands "invoice N", "Aaron Mitchell" and "555" and nothing else.
    /// Every music request is a text search except "surprise me".
    struct TinyExtractor;

    #[async_trait]
    impl FieldExtractor for TinyExtractor {
        async fn extract_refund_fields(&self, utterance: &str) -> Result<RefundFields, DomainError> {
            let mut fields = RefundFields::new();
            if let Some(rest) = utterance.split("invoice ").nth(1) {
                if let Ok(id) = rest.trim().parse() {
                    fields = fields.with_invoice_id(id);
                }
            }
            if utterance.contains("Aaron Mitchell") {
                fields = fields.with_customer_name("Aaron Mitchell");
            }
            if utterance.contains("555") {
                fields = fields.with_phone("555");
            }
            Ok(fields)
        }

        async fn extract_catalog_criteria(&self, utterance: &str) -> Result<CatalogQuery, DomainError> {
            if utterance == "surprise me" {
                return Ok(CatalogQuery::new().wanting_similar());
            }
            Ok(CatalogQuery::new().with_text(utterance))
        }
    }

    struct StaticLookup;

    #[async_trait]
    impl CustomerLookup for StaticLookup {
        async fn resolve(&self, identity: &CustomerIdentity) -> Result<Resolution, DomainError> {
            match identity {
                CustomerIdentity::Invoice(50) | CustomerIdentity::NamePhone { .. } => {
                    Ok(Resolution::Refundable(RefundableLines::new(
                        CustomerRef {
                            customer_id: 32,
                            name: "Aaron Mitchell".to_string(),
                        },
                        vec![PurchaseLine {
                            invoice_line_id: 270,
                            invoice_id: 50,
                            track_name: "Bohemian Rhapsody".to_string(),
                            album_title: "Greatest Hits I".to_string(),
                            artist_name: "Queen".to_string(),
                            purchase_date: "2023-03-10 00:00:00".to_string(),
                            quantity: 1,
                            unit_price: 0.99,
                            refunded: false,
                        }],
                    )))
                }
                CustomerIdentity::Invoice(13) => Err(DomainError::storage("database is locked")),
                _ => Ok(Resolution::NotFound),
            }
        }
    }

    #[derive(Default)]
    struct FlakyExecutor {
        fail: bool,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl RefundExecutor for FlakyExecutor {
        async fn refund(&self, line_ids: &[i64]) -> Result<RefundOutcome, DomainError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(DomainError::partial_failure("rolled back"));
            }
            Ok(RefundOutcome::Refunded {
                line_ids: line_ids.to_vec(),
                amount: 0.99,
                already_refunded: Vec::new(),
            })
        }
    }

    struct EmptyCatalog;

    #[async_trait]
    impl CatalogRepository for EmptyCatalog {
        async fn search(&self, _query: &CatalogQuery) -> Result<Vec<CatalogEntry>, DomainError> {
            Ok(Vec::new())
        }
    }

    /// Renders the debug form of each part, one per line.
    struct DebugRenderer;

    impl ResponseRenderer for DebugRenderer {
        fn render(&self, parts: &[ReplyPart]) -> String {
            parts.iter().map(|p| format!("{:?}", p)).collect::<Vec<_>>().join("\n")
        }
    }

    fn controller(classification: Result<Classification, String>, executor: Arc<FlakyExecutor>) -> ConversationController {
        let refunds = ProcessRefundUseCase::new(Arc::new(StaticLookup), executor);
        ConversationController::new(
            Arc::new(FixedClassifier(classification)),
            Arc::new(TinyExtractor),
            Arc::new(refunds),
            Arc::new(SearchCatalogUseCase::new(Arc::new(EmptyCatalog))),
            Arc::new(DebugRenderer),
        )
    }

    #[tokio::test]
    async fn classifier_outage_asks_to_rephrase_and_keeps_state() {
        let controller = controller(Err("timeout".to_string()), Arc::new(FlakyExecutor::default()));
        let mut state = SessionState::new("s");
        let before = state.clone();

        let outcome = controller.handle_turn(&mut state, "refund invoice 50").await;

        assert!(!outcome.committed);
        assert!(outcome.reply.contains("Rephrase"));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn store_outage_reports_service_unavailable() {
        let controller = controller(Ok(Classification::new(Intent::Refund)), Arc::new(FlakyExecutor::default()));
        let mut state = SessionState::new("s");

        let outcome = controller.handle_turn(&mut state, "refund invoice 13").await;

        assert!(!outcome.committed);
        assert!(outcome.reply.contains("ServiceUnavailable"));
        assert!(state.history().is_empty());
        assert_eq!(state.pending_intent(), None);
    }

    #[tokio::test]
    async fn partial_failure_keeps_collected_fields() {
        let executor = Arc::new(FlakyExecutor {
            fail: true,
            ..Default::default()
        });
        let controller = controller(Ok(Classification::new(Intent::Refund)), executor.clone());
        let mut state = SessionState::new("s");

        let outcome = controller.handle_turn(&mut state, "refund invoice 50").await;

        assert!(outcome.committed);
        assert!(outcome.reply.contains("RefundFailed"));
        assert_eq!(state.pending_intent(), Some(Intent::Refund));
        assert_eq!(state.collected_fields().invoice_id, Some(50));
        assert!(state.invariant_holds());
    }

    #[tokio::test]
    async fn confirmation_flow_refunds_only_after_yes() {
        let executor = Arc::new(FlakyExecutor::default());
        let controller = controller(Ok(Classification::new(Intent::Refund)), executor.clone());
        let mut state = SessionState::new("s");

        controller.handle_turn(&mut state, "Aaron Mitchell 555").await;
        assert_eq!(state.phase(), ConversationPhase::ConfirmingRefund);
        assert_eq!(state.collected_fields().proposed_line_ids, vec![270]);
        assert_eq!(*executor.calls.lock().unwrap(), 0);

        let outcome = controller.handle_turn(&mut state, "yes").await;
        assert!(outcome.reply.contains("Refunded"));
        assert_eq!(*executor.calls.lock().unwrap(), 1);
        assert_eq!(state.phase(), ConversationPhase::AwaitingIntent);
        assert!(state.collected_fields().is_empty());
    }

    #[tokio::test]
    async fn decline_while_confirming_abandons_and_runs_follow_up() {
        let executor = Arc::new(FlakyExecutor::default());
        let classification = Classification::new(Intent::Refund)
            .with_follow_up(FollowUp::new(Intent::MusicQuery, "something similar"));
        let controller = controller(Ok(classification), executor.clone());
        let mut state = SessionState::new("s");

        controller.handle_turn(&mut state, "Aaron Mitchell 555").await;
        assert_eq!(state.follow_ups().len(), 1);

        let outcome = controller.handle_turn(&mut state, "no thanks").await;
        assert!(outcome.reply.contains("RefundCancelled"));
        assert!(outcome.reply.contains("CatalogResults"));
        assert!(state.follow_ups().is_empty());
        assert_eq!(*executor.calls.lock().unwrap(), 0);
        assert!(state.invariant_holds());
    }

    #[tokio::test]
    async fn unknown_invoice_falls_back_to_name_and_phone() {
        let executor = Arc::new(FlakyExecutor::default());
        let controller = controller(Ok(Classification::new(Intent::Refund)), executor);
        let mut state = SessionState::new("s");

        let outcome = controller
            .handle_turn(&mut state, "Aaron Mitchell 555 invoice 999")
            .await;

        assert!(outcome.reply.contains("IdentityNotFound"));
        assert!(outcome.reply.contains("ConfirmRefund"));
        assert_eq!(state.collected_fields().invoice_id, None);
        assert_eq!(state.phase(), ConversationPhase::ConfirmingRefund);
    }

    #[tokio::test]
    async fn music_request_without_criteria_asks_for_a_preference() {
        let controller = controller(Ok(Classification::new(Intent::MusicQuery)), Arc::new(FlakyExecutor::default()));
        let mut state = SessionState::new("s");

        let outcome = controller.handle_turn(&mut state, "surprise me").await;

        assert!(outcome.committed);
        assert!(outcome.reply.contains("NeedMusicPreference"), "reply was: {}", outcome.reply);
        assert!(!outcome.reply.contains("CatalogResults"));
        assert_eq!(outcome.phase, ConversationPhase::AwaitingIntent);
    }

    #[tokio::test]
    async fn finished_turns_settle_back_to_awaiting_intent() {
        let executor = Arc::new(FlakyExecutor::default());
        let controller = controller(Ok(Classification::new(Intent::General)), executor);
        let mut state = SessionState::new("s");

        let outcome = controller.handle_turn(&mut state, "hello").await;

        assert!(outcome.reply.contains("Menu"));
        assert_eq!(outcome.phase, ConversationPhase::AwaitingIntent);
        assert_eq!(state.phase(), ConversationPhase::AwaitingIntent);
        assert!(state.invariant_holds());
    }
}
