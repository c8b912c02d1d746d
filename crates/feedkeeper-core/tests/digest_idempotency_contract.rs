//! Architectural Contract Test: Digest Idempotency
//!
//! This test verifies that the digest job publishes AT MOST ONE document
//! per ISO week, however often it fires.
//!
//! Constraints verified:
//! - First run in a week creates the digest of the previous week
//! - Every later run in the same week is a no-op (no ranking queries, no save)
//! - A new week produces a new digest
//!
//! If this test fails, someone has:
//! - Removed the short-name lookup before saving
//! - Changed how the week bucket is derived

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use feedkeeper_core::jobs::{DigestBuilder, JobReport};
use feedkeeper_core::model::{Category, ChannelSettings};
use feedkeeper_core::state::MemoryCatalog;
use feedkeeper_core::week::WeekBucket;
use std::sync::Arc;

async fn catalog_with_items() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    catalog
        .set_settings(ChannelSettings {
            channel_title: "Top Java Blogs".to_string(),
        })
        .await;
    catalog.add_category(Category::new(1, "Java")).await;
    catalog.add_category(Category::new(2, "Kotlin")).await;
    catalog.put_item(item(1, "https://a.example/1", "Streams & <Collectors>", 1, 7)).await;
    catalog
}

#[tokio::test]
async fn digest_is_published_once_per_week() {
    let catalog = catalog_with_items().await;
    let ranking = PagedRanking::new(vec![]);
    let requests = PagedRanking::sharing_counters_with(&ranking);

    let builder = DigestBuilder::new(
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
        Arc::new(ranking),
    );

    // Thursday of ISO week 5, 2024
    let now = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
    let first = builder.publish_for(now).await.unwrap();
    assert_eq!(
        first,
        JobReport::Digest {
            bucket: WeekBucket { week: 4, year: 2024 },
            created: true,
        }
    );
    // One ranking query per category
    assert_eq!(requests.request_count(), 2);

    for hours in 1..24 {
        let later = now + chrono::Duration::hours(hours);
        let report = builder.publish_for(later).await.unwrap();
        assert!(matches!(report, JobReport::Digest { created: false, .. }));
    }

    assert_eq!(requests.request_count(), 2, "no ranking queries for an existing digest");

    let digests = catalog.digests().await;
    assert_eq!(digests.len(), 1);
    assert_eq!(digests[0].short_name, "best-of-4-2024");
    assert_eq!(digests[0].title, "Top Java Blogs Weekly: Best of 4/2024");
    assert_eq!(digests[0].short_description, "Best of Top Java Blogs, year 2024, week 4");
}

#[tokio::test]
async fn new_week_gets_a_new_digest() {
    let catalog = catalog_with_items().await;
    let builder = DigestBuilder::new(
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
    )
    .with_icon_base_path("/spring/icon/");

    let monday = Utc.with_ymd_and_hms(2021, 1, 4, 0, 30, 0).unwrap();
    builder.publish_for(monday).await.unwrap();
    builder
        .publish_for(monday + chrono::Duration::days(7))
        .await
        .unwrap();

    let names: Vec<String> = catalog
        .digests()
        .await
        .into_iter()
        .map(|doc| doc.short_name)
        .collect();
    assert_eq!(names, vec!["best-of-53-2020", "best-of-1-2021"]);
}

#[tokio::test]
async fn digest_body_lists_ranked_items_escaped() {
    let catalog = catalog_with_items().await;
    let builder = DigestBuilder::new(
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
    );

    builder.publish_for(Utc::now()).await.unwrap();

    let body = &catalog.digests().await[0].description;
    assert!(body.contains("<h4>Java</h4>"));
    assert!(body.contains("<h4>Kotlin</h4>"));
    assert!(body.contains("Streams &amp; &lt;Collectors&gt;"));
    assert!(body.contains("/icon/1"));
}
