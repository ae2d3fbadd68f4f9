use std::sync::Arc;

use log::{debug, warn};

use super::{AuthorInfo, MediaResolver, MetadataError, MetadataProvider, VideoMetadata};
use crate::db::author_repo::{self, AuthorUpsert};
use crate::db::metadata_repo::{self, MetadataRow};
use crate::db::{now_timestamp, Database, DatabaseError};
use crate::link::Platform;
use crate::sanitize;

/// A metadata cache entry with its author-directory link.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMetadata {
    pub normalized_url: String,
    pub metadata: VideoMetadata,
    pub author_id: Option<i64>,
    pub updated_at: String,
}

impl CachedMetadata {
    fn from_row(row: MetadataRow) -> Self {
        let platform = row.platform.parse().unwrap_or(Platform::Other);
        let author = row.author_username.map(|username| AuthorInfo {
            username,
            display_name: row.author_display_name,
            avatar_url: row.author_avatar_url,
            verified: row.author_verified,
        });
        Self {
            normalized_url: row.normalized_url,
            metadata: VideoMetadata {
                platform,
                title: row.title,
                description: row.description,
                author,
                thumbnail_url: row.thumbnail_url,
                tags: row.tags,
            },
            author_id: row.author_id,
            updated_at: row.updated_at,
        }
    }
}

/// Read-through metadata cache backed by the author directory.
#[derive(Clone)]
pub struct MetadataService {
    db: Database,
    provider: Arc<dyn MetadataProvider>,
    media: Arc<dyn MediaResolver>,
}

impl MetadataService {
    pub fn new(
        db: Database,
        provider: Arc<dyn MetadataProvider>,
        media: Arc<dyn MediaResolver>,
    ) -> Self {
        Self {
            db,
            provider,
            media,
        }
    }

    /// The stored entry, without touching the network.
    pub fn cached(&self, normalized_url: &str) -> Result<Option<CachedMetadata>, DatabaseError> {
        Ok(metadata_repo::find(&self.db, normalized_url)?.map(CachedMetadata::from_row))
    }

    /// Returns the cached entry, fetching and storing it on a miss.
    ///
    /// Provider failures are not errors: the video simply has no metadata.
    pub async fn get_or_fetch(
        &self,
        normalized_url: &str,
        platform: Platform,
        source_url: &str,
    ) -> Result<Option<CachedMetadata>, DatabaseError> {
        if let Some(hit) = self.cached(normalized_url)? {
            debug!("Metadata cache hit for {}", sanitize::redact_url(normalized_url));
            return Ok(Some(hit));
        }

        let mut metadata = match self.provider.fetch(source_url, platform).await {
            Ok(metadata) => metadata,
            Err(MetadataError::Unsupported(platform)) => {
                debug!("No metadata provider for {}", platform);
                return Ok(None);
            }
            Err(e) => {
                warn!(
                    "Metadata lookup via {} failed for {}: {}",
                    self.provider.provider_name(),
                    sanitize::redact_url(source_url),
                    e
                );
                return Ok(None);
            }
        };

        let mut author_id = None;
        if let Some(author) = metadata.author.as_mut() {
            if let Some(fresh) = self.media.avatar(platform, &author.username).await {
                author.avatar_url = Some(fresh);
            }
            author_id = Some(author_repo::upsert(
                &self.db,
                &AuthorUpsert {
                    platform: platform.as_str(),
                    username: &author.username,
                    display_name: author.display_name.as_deref(),
                    avatar_url: author.avatar_url.as_deref(),
                    verified: author.verified,
                },
            )?);
        }

        let row = MetadataRow {
            normalized_url: normalized_url.to_string(),
            platform: platform.as_str().to_string(),
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            author_username: metadata.author.as_ref().map(|a| a.username.clone()),
            author_display_name: metadata.author.as_ref().and_then(|a| a.display_name.clone()),
            author_avatar_url: metadata.author.as_ref().and_then(|a| a.avatar_url.clone()),
            author_verified: metadata.author.as_ref().is_some_and(|a| a.verified),
            thumbnail_url: metadata.thumbnail_url.clone(),
            tags: metadata.tags.clone(),
            author_id,
            updated_at: now_timestamp(),
        };
        metadata_repo::upsert(&self.db, &row)?;

        Ok(Some(CachedMetadata {
            normalized_url: row.normalized_url,
            metadata,
            author_id,
            updated_at: row.updated_at,
        }))
    }

    /// Thumbnail looked up right now, if the platform offers one.
    pub async fn fresh_thumbnail(&self, platform: Platform, source_url: &str) -> Option<String> {
        self.media.thumbnail(platform, source_url).await
    }

    /// Best known avatar for the entry's author. A fresh lookup wins and is
    /// written back to both the author directory and the metadata cache;
    /// without one the directory value is used, then the cached one.
    pub async fn author_avatar(
        &self,
        entry: &CachedMetadata,
    ) -> Result<Option<String>, DatabaseError> {
        let Some(author) = entry.metadata.author.as_ref() else {
            return Ok(None);
        };

        if let Some(fresh) = self.media.avatar(entry.metadata.platform, &author.username).await {
            if author.avatar_url.as_deref() != Some(fresh.as_str()) {
                metadata_repo::update_avatar(&self.db, &entry.normalized_url, &fresh)?;
            }
            if let Some(id) = entry.author_id {
                author_repo::update_avatar(&self.db, id, &fresh)?;
            }
            return Ok(Some(fresh));
        }

        if let Some(id) = entry.author_id {
            if let Some(avatar) = author_repo::find_by_id(&self.db, id)?.and_then(|a| a.avatar_url) {
                return Ok(Some(avatar));
            }
        }
        Ok(author.avatar_url.clone())
    }
}
