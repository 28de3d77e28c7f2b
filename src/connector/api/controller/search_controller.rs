use anyhow::Result;

use crate::domain::{CatalogKind, CatalogQuery, Era, ReplyPart};

use super::super::Container;

pub struct SearchController<'a> {
    container: &'a Container,
}

impl<'a> SearchController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn search(
        &self,
        text: Option<String>,
        artist: Option<String>,
        album: Option<String>,
        genre: Option<String>,
        decade: Option<i32>,
        similar_to: Option<String>,
        albums: bool,
        num: usize,
    ) -> Result<String> {
        let mut query = CatalogQuery::new().with_limit(num);

        if let Some(text) = text {
            query = query.with_text(text);
        }
        if let Some(artist) = artist {
            query = query.with_artist(artist);
        }
        if let Some(album) = album {
            query = query.with_album(album);
        }
        if let Some(genre) = genre {
            query = query.with_genre(genre);
        }
        if let Some(decade) = decade {
            query = query.with_era(Era::decade(decade));
        }
        if let Some(reference) = similar_to {
            query = query.similar_to(reference);
        }
        if albums {
            query = query.with_kind(CatalogKind::Albums);
        }

        let summary = query.describe();
        let entries = self.container.search_use_case().execute(query).await?;

        Ok(self
            .container
            .renderer()
            .render(&[ReplyPart::CatalogResults { summary, entries }]))
    }
}
