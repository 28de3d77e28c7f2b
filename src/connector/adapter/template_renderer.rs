use crate::application::ResponseRenderer;
use crate::domain::{AlbumSummary, CatalogEntry, IdentityKind, MissingField, PurchaseLine, ReplyPart, TrackSummary};

const MENU: &str = "I'm your music store assistant. I can help you:\n\
• Look up songs, albums, and artists\n\
• Process refunds for purchases\n\
What would you like to do?";

/// Plain-text [`ResponseRenderer`]: one paragraph per reply part, listings as
/// pipe tables.
#[derive(Debug, Default, Clone)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_part(&self, part: &ReplyPart) -> String {
        match part {
            ReplyPart::Menu => MENU.to_string(),
            ReplyPart::NeedRefundDetails { missing } => need_details(missing),
            ReplyPart::ConfirmRefund { customer_name, lines } => {
                let total: f64 = lines.iter().map(PurchaseLine::amount).sum();
                format!(
                    "I found these purchases for {}:\n\n{}\n\nShall I refund {} for ${:.2}? \
                     Reply yes to confirm, no to cancel, or name the invoice lines you want refunded.",
                    customer_name,
                    purchase_table(lines),
                    if lines.len() == 1 { "it".to_string() } else { format!("all {}", lines.len()) },
                    total
                )
            }
            ReplyPart::Refunded {
                lines,
                amount,
                previously_refunded,
                outside_window,
            } => {
                let mut out = format!(
                    "I've processed your refund for ${:.2} ({}). \
                     The amount will be credited to your original payment method.",
                    amount,
                    track_list(lines)
                );
                if !previously_refunded.is_empty() {
                    out.push_str(&format!(
                        "\nAlready refunded earlier, so skipped: {}.",
                        id_list(previously_refunded)
                    ));
                }
                if !outside_window.is_empty() {
                    out.push_str(&format!(
                        "\nNot eligible because they are outside the refund window: {}.",
                        id_list(outside_window)
                    ));
                }
                out
            }
            ReplyPart::AlreadyRefunded { line_ids } => format!(
                "Those purchases were already refunded (invoice lines {}), so there is nothing more to refund.",
                id_list(line_ids)
            ),
            ReplyPart::RefundCancelled => "No problem, I've cancelled the refund request.".to_string(),
            ReplyPart::IdentityNotFound { identity } => match identity {
                IdentityKind::Invoice(id) => format!(
                    "I couldn't find invoice #{}. Could you double-check the invoice ID, \
                     or give me your full name and phone number instead?",
                    id
                ),
                IdentityKind::InvoiceReference(reference) => format!(
                    "I couldn't find invoice #{}. Could you double-check the invoice ID, \
                     or give me your full name and phone number instead?",
                    reference
                ),
                IdentityKind::Customer { name } => format!(
                    "I couldn't find a customer named {} with that phone number. \
                     Could you check both, or give me your invoice ID instead?",
                    name
                ),
            },
            ReplyPart::AmbiguousCustomer { name } => format!(
                "There is more than one customer named {}, and the phone number didn't match any of them. \
                 Could you give me the phone number on your account, or your invoice ID?",
                name
            ),
            ReplyPart::NoMatchingPurchases { filtered: true } => {
                "I couldn't find a refundable purchase matching that description. \
                 Which track, album or invoice line would you like refunded?"
                    .to_string()
            }
            ReplyPart::NoMatchingPurchases { filtered: false } => {
                "I couldn't find any purchases that can be refunded.".to_string()
            }
            ReplyPart::OutsideRefundWindow { window_days } => format!(
                "Sorry, those purchases are older than our {}-day refund window and can't be refunded.",
                window_days
            ),
            ReplyPart::PartialInvoiceRefused { invoice_ids } => format!(
                "Refunds cover whole invoices only. Would you like me to refund everything on invoice {}?",
                invoice_ids
                    .iter()
                    .map(|id| format!("#{}", id))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ReplyPart::RefundFailed => {
                "The refund could not be completed, please retry in a moment.".to_string()
            }
            ReplyPart::CatalogResults { summary, entries } => catalog(summary, entries),
            ReplyPart::NeedMusicPreference => "Which artist or genre do you like? I can recommend tracks similar \
                 to an artist, or list songs by genre or decade."
                .to_string(),
            ReplyPart::Rephrase => "Sorry, I didn't quite get that. Could you rephrase?".to_string(),
            ReplyPart::ServiceUnavailable => {
                "The service is temporarily unavailable. Please try again shortly.".to_string()
            }
            ReplyPart::Internal => "Something went wrong on my side. Please try again.".to_string(),
        }
    }
}

impl ResponseRenderer for TemplateRenderer {
    fn render(&self, parts: &[ReplyPart]) -> String {
        if parts.is_empty() {
            return MENU.to_string();
        }
        parts
            .iter()
            .map(|part| self.render_part(part))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn need_details(missing: &[MissingField]) -> String {
    let identity: Vec<&str> = missing
        .iter()
        .filter(|field| **field != MissingField::InvoiceId)
        .map(MissingField::label)
        .collect();
    let offers_invoice = missing.contains(&MissingField::InvoiceId);

    match (identity.as_slice(), offers_invoice) {
        ([], _) => "To process the refund I need your invoice ID.".to_string(),
        (fields, true) => format!(
            "To process the refund I need your {}, or your invoice ID.",
            fields.join(" and ")
        ),
        (fields, false) => format!("To process the refund I need your {}.", fields.join(" and ")),
    }
}

fn id_list(ids: &[i64]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

fn track_list(lines: &[PurchaseLine]) -> String {
    match lines {
        [line] => format!("\"{}\"", line.track_name),
        _ => format!("{} tracks", lines.len()),
    }
}

fn purchase_table(lines: &[PurchaseLine]) -> String {
    let rows = lines
        .iter()
        .map(|line| {
            vec![
                line.invoice_line_id.to_string(),
                line.invoice_id.to_string(),
                line.track_name.clone(),
                line.artist_name.clone(),
                line.purchase_day().to_string(),
                format!("${:.2}", line.amount()),
            ]
        })
        .collect::<Vec<_>>();
    pipe_table(&["Line", "Invoice", "Track", "Artist", "Purchased", "Amount"], &rows)
}

fn catalog(summary: &str, entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return format!(
            "No matches for {}. Could you try being more specific, or ask about another artist, album or genre?",
            summary
        );
    }

    let tracks: Vec<&TrackSummary> = entries
        .iter()
        .filter_map(|entry| match entry {
            CatalogEntry::Track(track) => Some(track),
            CatalogEntry::Album(_) => None,
        })
        .collect();
    let albums: Vec<&AlbumSummary> = entries
        .iter()
        .filter_map(|entry| match entry {
            CatalogEntry::Album(album) => Some(album),
            CatalogEntry::Track(_) => None,
        })
        .collect();

    let mut out = format!("Here are the matching {}:", summary);
    if !tracks.is_empty() {
        let rows = tracks
            .iter()
            .map(|t| {
                vec![
                    t.name.clone(),
                    t.artist_name.clone(),
                    t.album_title.clone(),
                    t.genre.clone().unwrap_or_default(),
                    t.duration(),
                ]
            })
            .collect::<Vec<_>>();
        out.push_str("\n\n");
        out.push_str(&pipe_table(&["Track", "Artist", "Album", "Genre", "Duration"], &rows));
    }
    if !albums.is_empty() {
        let rows = albums
            .iter()
            .map(|a| {
                vec![
                    a.title.clone(),
                    a.artist_name.clone(),
                    a.release_year.map(|y| y.to_string()).unwrap_or_default(),
                    a.track_count.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        out.push_str("\n\n");
        out.push_str(&pipe_table(&["Album", "Artist", "Year", "Tracks"], &rows));
    }
    out
}

/// Markdown pipe table with columns padded to their widest cell.
fn pipe_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut out = vec![line(headers.iter().map(|h| h.to_string()).collect())];
    out.push(format!(
        "|{}|",
        widths.iter().map(|w| "-".repeat(w + 2)).collect::<Vec<_>>().join("|")
    ));
    out.extend(rows.iter().map(|row| line(row.clone())));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, artist: &str, ms: i64) -> CatalogEntry {
        CatalogEntry::Track(TrackSummary {
            track_id: 1,
            name: name.to_string(),
            album_title: "Greatest Hits I".to_string(),
            artist_name: artist.to_string(),
            genre: Some("Rock".to_string()),
            milliseconds: ms,
            unit_price: 0.99,
            release_year: Some(1981),
        })
    }

    #[test]
    fn menu_lists_what_the_assistant_does() {
        let reply = TemplateRenderer::new().render(&[ReplyPart::Menu]);
        assert!(reply.contains("Look up songs, albums, and artists"));
        assert!(reply.contains("Process refunds"));
    }

    #[test]
    fn clarification_names_only_missing_fields() {
        let renderer = TemplateRenderer::new();
        let all = renderer.render(&[ReplyPart::NeedRefundDetails {
            missing: vec![MissingField::CustomerName, MissingField::Phone, MissingField::InvoiceId],
        }]);
        assert_eq!(all, "To process the refund I need your full name and phone number, or your invoice ID.");

        let phone = renderer.render(&[ReplyPart::NeedRefundDetails {
            missing: vec![MissingField::Phone, MissingField::InvoiceId],
        }]);
        assert!(phone.contains("phone number"));
        assert!(!phone.contains("full name"));
    }

    #[test]
    fn tracks_render_as_a_pipe_table() {
        let reply = TemplateRenderer::new().render(&[ReplyPart::CatalogResults {
            summary: "tracks by Queen".to_string(),
            entries: vec![track("Bohemian Rhapsody", "Queen", 354_947)],
        }]);
        assert!(reply.starts_with("Here are the matching tracks by Queen:"));
        assert!(reply.contains("| Track"));
        assert!(reply.contains("| Bohemian Rhapsody | Queen"));
        assert!(reply.contains("5:54"));
    }

    #[test]
    fn music_preference_asks_for_an_artist_or_genre() {
        let reply = TemplateRenderer::new().render(&[ReplyPart::NeedMusicPreference]);
        assert!(reply.starts_with("Which artist or genre do you like?"));
        assert!(!reply.contains("No matches"));
    }

    #[test]
    fn empty_results_say_no_matches() {
        let reply = TemplateRenderer::new().render(&[ReplyPart::CatalogResults {
            summary: "tracks by The Nonexistent Band".to_string(),
            entries: Vec::new(),
        }]);
        assert!(reply.starts_with("No matches"));
    }

    #[test]
    fn refund_reply_states_the_amount() {
        let reply = TemplateRenderer::new().render(&[ReplyPart::Refunded {
            lines: Vec::new(),
            amount: 3.96,
            previously_refunded: vec![1385],
            outside_window: Vec::new(),
        }]);
        assert!(reply.contains("$3.96"));
        assert!(reply.contains("1385"));
    }

    #[test]
    fn parts_become_paragraphs() {
        let reply = TemplateRenderer::new().render(&[ReplyPart::RefundCancelled, ReplyPart::Menu]);
        assert_eq!(reply.matches("\n\n").count(), 1);
    }
}
