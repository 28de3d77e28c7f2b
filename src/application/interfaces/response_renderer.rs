use crate::domain::ReplyPart;

/// Turns structured turn output into the text shown to the customer.
pub trait ResponseRenderer: Send + Sync {
    fn render(&self, parts: &[ReplyPart]) -> String;
}
