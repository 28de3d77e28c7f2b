use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::llm_json::{bool_field, first_object, int_field, int_list, text_field};
use super::ChatClient;
use crate::application::FieldExtractor;
use crate::domain::{CatalogKind, CatalogQuery, DomainError, Era, RefundFields};

const REFUND_PROMPT: &str = "\
Extract customer purchase information from the customer's message.
Only report what the message actually says; never guess.

Return ONLY a JSON object with these keys, using null when a value is absent:
{\"customer_name\": null, \"phone\": null, \"invoice_id\": null,
 \"invoice_line_ids\": [], \"track_name\": null, \"album_title\": null,
 \"artist_name\": null, \"purchase_date\": null}

purchase_date is YYYY-MM-DD. invoice_id and invoice_line_ids are integers.";

const CATALOG_PROMPT: &str = "\
Turn the customer's question about an online music store's catalog into search criteria.

Return ONLY a JSON object with these keys, using null when a value is absent:
{\"artist\": null, \"album\": null, \"track\": null, \"genre\": null,
 \"from_year\": null, \"to_year\": null, \"similar\": false,
 \"similar_to\": null, \"albums\": false, \"text\": null}

similar is true when they want recommendations or music like something else;
similar_to names the reference artist if they said one. albums is true when they
ask for albums rather than songs. text holds any remaining keywords.";

/// [`FieldExtractor`] backed by an LLM. Every failure, including an answer
/// that is not a JSON object, becomes [`DomainError::ExtractorUnavailable`].
pub struct LlmFieldExtractor {
    client: Arc<dyn ChatClient>,
}

impl LlmFieldExtractor {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    async fn ask(&self, system: &str, utterance: &str) -> Result<Map<String, Value>, DomainError> {
        let answer = self
            .client
            .complete(system, utterance)
            .await
            .map_err(DomainError::into_extractor_failure)?;
        debug!("LlmFieldExtractor raw response: {}", answer);

        first_object(&answer).ok_or_else(|| {
            warn!("LlmFieldExtractor: no JSON object in: {}", answer);
            DomainError::ExtractorUnavailable("unreadable extraction".to_string())
        })
    }

    fn refund_fields(map: &Map<String, Value>) -> RefundFields {
        let invoice_id = int_field(map, "invoice_id");
        // Digits that do not fit an id still name an invoice the customer gave.
        let invoice_reference = match (invoice_id, map.get("invoice_id")) {
            (None, Some(Value::String(text))) => {
                let digits: String = text.chars().filter(char::is_ascii_digit).collect();
                (!digits.is_empty()).then_some(digits)
            }
            _ => None,
        };
        RefundFields {
            customer_name: text_field(map, "customer_name"),
            phone: text_field(map, "phone"),
            invoice_id,
            invoice_reference,
            invoice_line_ids: int_list(map, "invoice_line_ids"),
            track_name: text_field(map, "track_name"),
            album_title: text_field(map, "album_title"),
            artist_name: text_field(map, "artist_name"),
            purchase_date: text_field(map, "purchase_date"),
            proposed_line_ids: Vec::new(),
        }
    }

    fn catalog_query(map: &Map<String, Value>) -> CatalogQuery {
        let mut query = CatalogQuery::new();
        if let Some(artist) = text_field(map, "artist") {
            query = query.with_artist(artist);
        }
        if let Some(album) = text_field(map, "album") {
            query = query.with_album(album);
        }
        if let Some(track) = text_field(map, "track") {
            query = query.with_track(track);
        }
        if let Some(genre) = text_field(map, "genre") {
            query = query.with_genre(genre);
        }
        if let Some(text) = text_field(map, "text") {
            query = query.with_text(text);
        }

        let from = int_field(map, "from_year").and_then(|y| i32::try_from(y).ok());
        let to = int_field(map, "to_year").and_then(|y| i32::try_from(y).ok());
        match (from, to) {
            (Some(from), Some(to)) => query = query.with_era(Era::new(from, to)),
            (Some(year), None) | (None, Some(year)) => query = query.with_era(Era::year(year)),
            (None, None) => {}
        }

        if bool_field(map, "albums") {
            query = query.with_kind(CatalogKind::Albums);
        }
        if let Some(reference) = text_field(map, "similar_to") {
            query = query.similar_to(reference);
        } else if bool_field(map, "similar") {
            query = query.wanting_similar();
        }
        query
    }
}

#[async_trait]
impl FieldExtractor for LlmFieldExtractor {
    async fn extract_refund_fields(&self, utterance: &str) -> Result<RefundFields, DomainError> {
        let map = self.ask(REFUND_PROMPT, utterance).await?;
        Ok(Self::refund_fields(&map))
    }

    async fn extract_catalog_criteria(&self, utterance: &str) -> Result<CatalogQuery, DomainError> {
        let map = self.ask(CATALOG_PROMPT, utterance).await?;
        let query = Self::catalog_query(&map);
        if query.has_criteria() || query.wants_similar() {
            Ok(query)
        } else {
            // Nothing structured came back; search on the words themselves.
            Ok(query.with_text(utterance))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::adapter::MockChatClient;

    fn extractor(answers: &[&str]) -> LlmFieldExtractor {
        LlmFieldExtractor::new(Arc::new(MockChatClient::new(answers.iter().copied())))
    }

    #[tokio::test]
    async fn refund_fields_are_read_from_json() {
        let fields = extractor(&[r#"{"customer_name": "Aaron Mitchell", "phone": "+1 204 452 6452", "invoice_id": null, "invoice_line_ids": []}"#])
            .extract_refund_fields("my name is Aaron Mitchell, +1 204 452 6452")
            .await
            .unwrap();
        assert_eq!(fields.customer_name.as_deref(), Some("Aaron Mitchell"));
        assert_eq!(fields.phone.as_deref(), Some("+1 204 452 6452"));
        assert_eq!(fields.invoice_id, None);
    }

    #[tokio::test]
    async fn oversized_invoice_number_is_kept_as_a_reference() {
        let fields = extractor(&[r##"{"invoice_id": "#99999999999999999999"}"##])
            .extract_refund_fields("refund invoice #99999999999999999999")
            .await
            .unwrap();
        assert_eq!(fields.invoice_id, None);
        assert_eq!(fields.invoice_reference.as_deref(), Some("99999999999999999999"));
    }

    #[tokio::test]
    async fn invoice_given_as_text_is_still_an_id() {
        let fields = extractor(&[r##"Here you go: {"invoice_id": "#256"}"##])
            .extract_refund_fields("refund invoice #256")
            .await
            .unwrap();
        assert_eq!(fields.invoice_id, Some(256));
    }

    #[tokio::test]
    async fn catalog_criteria_map_to_a_query() {
        let query = extractor(&[r#"{"genre": "Metal", "from_year": 1980, "to_year": 1989, "albums": true}"#])
            .extract_catalog_criteria("metal albums from the 80s")
            .await
            .unwrap();
        assert_eq!(query.genre(), Some("Metal"));
        assert_eq!(query.era(), Some(Era::decade(1980)));
        assert_eq!(query.kind(), CatalogKind::Albums);
    }

    #[tokio::test]
    async fn similar_without_reference_waits_for_context() {
        let query = extractor(&[r#"{"similar": true}"#])
            .extract_catalog_criteria("find something similar")
            .await
            .unwrap();
        assert!(query.wants_similar());
        assert_eq!(query.similar_to_artist(), None);
    }

    #[tokio::test]
    async fn empty_criteria_fall_back_to_free_text() {
        let query = extractor(&["{}"])
            .extract_catalog_criteria("stairway heaven")
            .await
            .unwrap();
        assert_eq!(query.text(), Some("stairway heaven"));
    }

    #[tokio::test]
    async fn prose_answer_is_an_extractor_failure() {
        let err = extractor(&["Sorry, I can't help with that."])
            .extract_refund_fields("refund")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ExtractorUnavailable(_)));
    }
}
