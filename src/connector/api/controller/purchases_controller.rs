use anyhow::{bail, Result};

use crate::domain::{CustomerIdentity, PurchaseLine, RefundableLines, Resolution};

use super::super::Container;

pub struct PurchasesController<'a> {
    container: &'a Container,
}

impl<'a> PurchasesController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn purchases(
        &self,
        invoice: Option<i64>,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<String> {
        let identity = match (invoice, name, phone) {
            (Some(invoice_id), _, _) => CustomerIdentity::Invoice(invoice_id),
            (None, Some(name), Some(phone)) => CustomerIdentity::NamePhone { name, phone },
            _ => bail!("Give either --invoice, or both --name and --phone"),
        };

        let use_case = self.container.list_purchases_use_case();
        match use_case.execute(identity).await? {
            Resolution::Refundable(purchases) => Ok(self.format_purchases(&purchases)),
            Resolution::NotFound => Ok("No matching customer or invoice found.".to_string()),
            Resolution::Ambiguous { candidates } => Ok(format!(
                "{} customers share that name and none matches the phone number.",
                candidates
            )),
        }
    }

    fn format_purchases(&self, purchases: &RefundableLines) -> String {
        if purchases.is_empty() {
            return format!("{} has no purchases.", purchases.customer.name);
        }

        let mut all: Vec<&PurchaseLine> = purchases
            .lines
            .iter()
            .chain(purchases.already_refunded.iter())
            .collect();
        all.sort_by_key(|line| (line.purchase_date.clone(), line.invoice_line_id));

        let mut output = format!(
            "Purchases for {} (customer {}):\n\n",
            purchases.customer.name, purchases.customer.customer_id
        );
        for line in all {
            output.push_str(&format!(
                "  line {:>5}  invoice {:>4}  {}  {} - {}  ${:.2}{}\n",
                line.invoice_line_id,
                line.invoice_id,
                line.purchase_day(),
                line.track_name,
                line.artist_name,
                line.amount(),
                if line.refunded { "  (refunded)" } else { "" }
            ));
        }

        let open: f64 = purchases.lines.iter().map(PurchaseLine::amount).sum();
        output.push_str(&format!(
            "\n{} refundable line(s), ${:.2} in total",
            purchases.lines.len(),
            open
        ));
        output
    }
}
