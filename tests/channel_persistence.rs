//! SeaORM channel repository and the services built on it

mod common;

use anyhow::Result;
use std::sync::Arc;

use common::{MemoryChannelStore, StubResponse, UpstreamStub, jpeg_bytes, new_service, test_config};
use yt_image_proxy::{
    config::DatabaseConfig,
    database::Database,
    repositories::{ChannelSeaOrmRepository, ChannelStore, ChannelThumbnailLookup},
    services::{ChannelService, ThumbnailUrlChange, WarmReport, warm_all_channels},
};

async fn repository() -> Result<ChannelSeaOrmRepository> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
    };
    let database = Database::new(&config).await?;
    database.migrate().await?;
    Ok(ChannelSeaOrmRepository::new(database.connection()))
}

#[tokio::test]
async fn test_upsert_returns_previous_url() -> Result<()> {
    let repo = repository().await?;

    assert_eq!(repo.lookup_thumbnail_url("UC1").await?, None);

    let previous = repo
        .upsert_thumbnail_url("UC1", Some("https://yt3.example/a".to_string()))
        .await?;
    assert_eq!(previous, None);

    let previous = repo
        .upsert_thumbnail_url("UC1", Some("https://yt3.example/b".to_string()))
        .await?;
    assert_eq!(previous.as_deref(), Some("https://yt3.example/a"));
    assert_eq!(
        repo.lookup_thumbnail_url("UC1").await?.as_deref(),
        Some("https://yt3.example/b")
    );

    let previous = repo.upsert_thumbnail_url("UC1", None).await?;
    assert_eq!(previous.as_deref(), Some("https://yt3.example/b"));
    assert_eq!(repo.lookup_thumbnail_url("UC1").await?, None);
    assert!(repo.find_by_id("UC1").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_lists_only_channels_with_urls() -> Result<()> {
    let repo = repository().await?;
    repo.upsert_thumbnail_url("UCb", Some("https://yt3.example/b".to_string()))
        .await?;
    repo.upsert_thumbnail_url("UCa", Some("https://yt3.example/a".to_string()))
        .await?;
    repo.upsert_thumbnail_url("UCnull", None).await?;

    assert_eq!(repo.channel_ids_with_thumbnails().await?, vec!["UCa", "UCb"]);
    Ok(())
}

#[tokio::test]
async fn test_channel_service_applies_invalidation_rule() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let stub = UpstreamStub::start().await;
    stub.respond("/avatars/a.jpg", StubResponse::jpeg(jpeg_bytes(500, 1)));

    let repo = Arc::new(repository().await?);
    let image_cache = Arc::new(new_service(test_config(temp.path(), &stub)).await);
    let service = ChannelService::new(repo.clone(), image_cache.clone());
    let entry = temp.path().join("images/channels/UC1.jpg");

    let update = service
        .update_thumbnail_url("UC1", Some(stub.url("/avatars/a.jpg")))
        .await?;
    assert_eq!(update.change, ThumbnailUrlChange::Set);
    assert!(!update.invalidated);

    image_cache.get_channel_image(repo.as_ref(), "UC1").await;
    assert!(entry.exists());

    let update = service
        .update_thumbnail_url("UC1", Some(stub.url("/avatars/a.jpg")))
        .await?;
    assert_eq!(update.change, ThumbnailUrlChange::Unchanged);
    assert!(entry.exists());

    let update = service.update_thumbnail_url("UC1", None).await?;
    assert_eq!(update.change, ThumbnailUrlChange::Cleared);
    assert!(entry.exists(), "clearing the URL must keep the cached avatar");

    service
        .update_thumbnail_url("UC1", Some(stub.url("/avatars/a.jpg")))
        .await?;
    let update = service
        .update_thumbnail_url("UC1", Some(stub.url("/avatars/b.jpg")))
        .await?;
    assert_eq!(update.change, ThumbnailUrlChange::Replaced);
    assert!(update.invalidated);
    assert!(!entry.exists());
    Ok(())
}

#[tokio::test]
async fn test_blank_url_is_stored_as_null() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let stub = UpstreamStub::start().await;
    let repo = Arc::new(repository().await?);
    let image_cache = Arc::new(new_service(test_config(temp.path(), &stub)).await);
    let service = ChannelService::new(repo.clone(), image_cache);

    service.update_thumbnail_url("UC1", Some("   ".to_string())).await?;

    assert_eq!(repo.lookup_thumbnail_url("UC1").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_warm_all_channels_reports_outcomes() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let stub = UpstreamStub::start().await;
    stub.respond("/avatars/1.jpg", StubResponse::jpeg(jpeg_bytes(500, 1)));
    stub.respond("/avatars/2.jpg", StubResponse::jpeg(jpeg_bytes(600, 2)));
    stub.respond("/avatars/gone.jpg", StubResponse::status(404));

    let store = MemoryChannelStore::default()
        .with_channel("UC1", Some(stub.url("/avatars/1.jpg")))
        .with_channel("UC2", Some(stub.url("/avatars/2.jpg")))
        .with_channel("UCgone", Some(stub.url("/avatars/gone.jpg")))
        .with_channel("UCnull", None);
    let image_cache = new_service(test_config(temp.path(), &stub)).await;

    let first = warm_all_channels(&image_cache, &store).await?;
    assert_eq!(
        first,
        WarmReport {
            total: 3,
            hits: 0,
            fetched: 2,
            placeholders: 1,
        }
    );

    let second = warm_all_channels(&image_cache, &store).await?;
    assert_eq!(second.hits, 2);
    assert_eq!(second.placeholders, 1);
    assert_eq!(stub.hits("/avatars/gone.jpg"), 1);
    Ok(())
}
