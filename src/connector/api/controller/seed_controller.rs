use anyhow::Result;

use super::super::Container;

pub struct SeedController<'a> {
    container: &'a Container,
}

impl<'a> SeedController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn seed(&self) -> Result<String> {
        let store = self.container.store();
        let inserted = store.seed_sample_data().await?;
        let customers = store.customer_count().await?;

        let location = self
            .container
            .database()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "the in-memory store".to_string());

        Ok(if inserted {
            format!("Loaded the sample music store into {} ({} customers).", location, customers)
        } else {
            format!("{} already holds {} customers; nothing loaded.", location, customers)
        })
    }
}
