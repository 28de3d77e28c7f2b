use anyhow::{bail, Result};

use crate::Commands;

use super::container::Container;
use super::controller::{ChatController, PurchasesController, SearchController, SeedController};

pub struct Router<'a> {
    chat_controller: ChatController<'a>,
    search_controller: SearchController<'a>,
    purchases_controller: PurchasesController<'a>,
    seed_controller: SeedController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            chat_controller: ChatController::new(container),
            search_controller: SearchController::new(container),
            purchases_controller: PurchasesController::new(container),
            seed_controller: SeedController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Chat { session } => self.chat_controller.chat(session).await,
            Commands::Ask { message } => self.chat_controller.ask(message).await,
            Commands::Search {
                query,
                artist,
                album,
                genre,
                decade,
                similar_to,
                albums,
                num,
            } => {
                self.search_controller
                    .search(query, artist, album, genre, decade, similar_to, albums, num)
                    .await
            }
            Commands::Purchases {
                invoice,
                name,
                phone,
            } => self.purchases_controller.purchases(invoice, name, phone).await,
            Commands::Seed => self.seed_controller.seed().await,
            Commands::Serve { .. } => bail!("serve runs the HTTP server and is handled in main"),
        }
    }
}
