use std::sync::Arc;

use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::CatalogRepository;
use crate::domain::{AlbumSummary, CatalogEntry, CatalogKind, CatalogQuery, DomainError, TrackSummary};

const FROM_TRACKS: &str = "\
    FROM Track t \
    LEFT JOIN Album al ON al.AlbumId = t.AlbumId \
    LEFT JOIN Artist ar ON ar.ArtistId = al.ArtistId \
    LEFT JOIN Genre g ON g.GenreId = t.GenreId";

/// Words too common to narrow a free-text search.
const NOISE_WORDS: &[&str] = &["the", "and", "a", "an", "of", "by", "for", "songs", "song", "music", "tracks", "albums"];

pub struct DuckdbCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbCatalogRepository {
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// WHERE clause plus its positional arguments.
    fn filters(query: &CatalogQuery) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        let mut like = |clause: &str, value: &str, clauses: &mut Vec<String>| {
            clauses.push(clause.to_string());
            args.push(Value::Text(format!("%{}%", value)));
        };

        if let Some(artist) = query.artist() {
            like("ar.Name ILIKE ?", artist, &mut clauses);
        }
        if let Some(album) = query.album() {
            like("al.Title ILIKE ?", album, &mut clauses);
        }
        if let Some(track) = query.track() {
            like("t.Name ILIKE ?", track, &mut clauses);
        }
        if let Some(genre) = query.genre() {
            like("g.Name ILIKE ?", genre, &mut clauses);
        }
        if let Some(reference) = query.similar_to_artist() {
            like(
                "t.GenreId IN (SELECT DISTINCT t2.GenreId FROM Track t2 \
                 JOIN Album a2 ON a2.AlbumId = t2.AlbumId \
                 JOIN Artist r2 ON r2.ArtistId = a2.ArtistId \
                 WHERE r2.Name ILIKE ?)",
                reference,
                &mut clauses,
            );
            like("ar.Name NOT ILIKE ?", reference, &mut clauses);
        }
        if let Some(text) = query.text() {
            for word in text
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|w| w.len() > 1 && !NOISE_WORDS.contains(&w.to_lowercase().as_str()))
            {
                for _ in 0..4 {
                    args.push(Value::Text(format!("%{}%", word)));
                }
                clauses.push("(t.Name ILIKE ? OR al.Title ILIKE ? OR ar.Name ILIKE ? OR g.Name ILIKE ?)".to_string());
            }
        }
        if let Some(era) = query.era() {
            clauses.push("al.ReleaseYear BETWEEN ? AND ?".to_string());
            args.push(Value::Int(era.from_year));
            args.push(Value::Int(era.to_year));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        (where_clause, args)
    }

    fn search_tracks(conn: &Connection, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, DomainError> {
        let (where_clause, args) = Self::filters(query);
        let sql = format!(
            "SELECT t.TrackId, t.Name, COALESCE(al.Title, ''), COALESCE(ar.Name, ''), g.Name, \
                    t.Milliseconds, t.UnitPrice, al.ReleaseYear \
             {} {} \
             ORDER BY ar.Name, al.Title, t.TrackId \
             LIMIT {}",
            FROM_TRACKS,
            where_clause,
            query.limit()
        );
        debug!("Catalog track query: {}", sql);

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::storage(format!("Failed to prepare catalog query: {}", e)))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(CatalogEntry::Track(TrackSummary {
                    track_id: row.get(0)?,
                    name: row.get(1)?,
                    album_title: row.get(2)?,
                    artist_name: row.get(3)?,
                    genre: row.get(4)?,
                    milliseconds: row.get(5)?,
                    unit_price: row.get(6)?,
                    release_year: row.get(7)?,
                }))
            })
            .map_err(|e| DomainError::storage(format!("Failed to search tracks: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?);
        }
        Ok(entries)
    }

    fn search_albums(conn: &Connection, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, DomainError> {
        let (where_clause, args) = Self::filters(query);
        let sql = format!(
            "SELECT al.AlbumId, al.Title, COALESCE(ar.Name, ''), al.ReleaseYear, COUNT(t.TrackId) \
             {} {} \
             GROUP BY al.AlbumId, al.Title, ar.Name, al.ReleaseYear \
             ORDER BY ar.Name, al.Title \
             LIMIT {}",
            FROM_TRACKS,
            where_clause,
            query.limit()
        );
        debug!("Catalog album query: {}", sql);

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::storage(format!("Failed to prepare catalog query: {}", e)))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(CatalogEntry::Album(AlbumSummary {
                    album_id: row.get(0)?,
                    title: row.get(1)?,
                    artist_name: row.get(2)?,
                    release_year: row.get(3)?,
                    track_count: row.get(4)?,
                }))
            })
            .map_err(|e| DomainError::storage(format!("Failed to search albums: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl CatalogRepository for DuckdbCatalogRepository {
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, DomainError> {
        let conn = self.conn.lock().await;
        match query.kind() {
            CatalogKind::Tracks => Self::search_tracks(&conn, query),
            CatalogKind::Albums => Self::search_albums(&conn, query),
        }
    }
}
