//! SeaORM-based channel repository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::debug;

use super::traits::{ChannelStore, ChannelThumbnailLookup};
use crate::entities::{channels, prelude::Channels};
use crate::errors::RepositoryResult;

/// SeaORM-based repository for channel operations
pub struct ChannelSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ChannelSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Find a channel by id
    pub async fn find_by_id(&self, channel_id: &str) -> RepositoryResult<Option<channels::Model>> {
        Ok(Channels::find_by_id(channel_id.to_string())
            .one(&*self.connection)
            .await?)
    }
}

#[async_trait]
impl ChannelThumbnailLookup for ChannelSeaOrmRepository {
    async fn lookup_thumbnail_url(&self, channel_id: &str) -> RepositoryResult<Option<String>> {
        let url: Option<Option<String>> = Channels::find_by_id(channel_id.to_string())
            .select_only()
            .column(channels::Column::ThumbnailUrl)
            .into_tuple()
            .one(&*self.connection)
            .await?;
        Ok(url.flatten())
    }
}

#[async_trait]
impl ChannelStore for ChannelSeaOrmRepository {
    async fn channel_ids_with_thumbnails(&self) -> RepositoryResult<Vec<String>> {
        Ok(Channels::find()
            .select_only()
            .column(channels::Column::Id)
            .filter(channels::Column::ThumbnailUrl.is_not_null())
            .order_by_asc(channels::Column::Id)
            .into_tuple()
            .all(&*self.connection)
            .await?)
    }

    async fn upsert_thumbnail_url(
        &self,
        channel_id: &str,
        thumbnail_url: Option<String>,
    ) -> RepositoryResult<Option<String>> {
        let now = chrono::Utc::now();

        match self.find_by_id(channel_id).await? {
            Some(existing) => {
                let previous = existing.thumbnail_url.clone();
                let mut active_model: channels::ActiveModel = existing.into();
                active_model.thumbnail_url = Set(thumbnail_url);
                active_model.updated_at = Set(now);
                active_model.update(&*self.connection).await?;
                Ok(previous)
            }
            None => {
                debug!("Creating channel {} on thumbnail update", channel_id);
                let active_model = channels::ActiveModel {
                    id: Set(channel_id.to_string()),
                    title: Set(None),
                    thumbnail_url: Set(thumbnail_url),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active_model.insert(&*self.connection).await?;
                Ok(None)
            }
        }
    }
}
