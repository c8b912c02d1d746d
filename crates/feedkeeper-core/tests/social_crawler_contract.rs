//! Architectural Contract Test: Social Counter Crawl
//!
//! This test verifies that the crawler isolates every provider call and
//! writes a counter only when its value changed.
//!
//! Constraints verified:
//! - A failing or hanging provider never affects the other two
//! - Unchanged counters are never written
//! - Paging stops at the first empty page, which is still requested
//!
//! If this test fails, someone has:
//! - Shared one error or timeout boundary between providers
//! - Added unconditional counter writes
//! - Changed the paging termination rule

mod common;

use common::*;
use feedkeeper_core::jobs::social::CrawlReport;
use feedkeeper_core::jobs::{Job, JobReport, SocialMetricsCrawler};
use feedkeeper_core::model::{Category, Item, ItemOrder, ItemView, RankingWindow, SocialProvider};
use feedkeeper_core::state::MemoryCatalog;
use std::sync::Arc;

async fn catalog_with(items: &[Item]) -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    catalog.add_category(Category::new(1, "Java")).await;
    catalog.add_category(Category::new(2, "Kotlin")).await;
    for item in items {
        catalog.put_item(item.clone()).await;
    }
    catalog
}

fn views(items: &[Item]) -> Vec<ItemView> {
    items.iter().map(Item::view).collect()
}

#[tokio::test]
async fn failing_provider_does_not_affect_the_others() {
    let items = vec![
        item(1, "https://a.example/1", "One", 1, 0),
        item(2, "https://a.example/2", "Two", 2, 0),
    ];
    let catalog = catalog_with(&items).await;
    let config = fast_social_config();
    let fetcher = ScriptedFetcher::new(config.clone(), 5)
        .with_reply(SocialProvider::Twitter, Reply::Fail)
        .with_reply(SocialProvider::Linkedin, Reply::Hang);

    let crawler = SocialMetricsCrawler::new(
        Arc::new(catalog.clone()),
        Arc::new(PagedRanking::new(vec![views(&items)])),
        Arc::new(catalog.clone()),
        Arc::new(fetcher),
        config,
    );

    let report = crawler.crawl().await.unwrap();

    assert_eq!(
        report,
        CrawlReport {
            pages: 2,
            items: 2,
            updated: 2,
            unchanged: 0,
            failed: 4,
        }
    );
    for id in [1, 2] {
        let stored = catalog.get_item(id).await.unwrap();
        assert_eq!(stored.facebook_share_count, 5);
        assert_eq!(stored.twitter_retweet_count, 0);
        assert_eq!(stored.linkedin_share_count, 0);
    }
}

#[tokio::test]
async fn unchanged_counters_are_not_written() {
    let mut current = item(1, "https://a.example/1", "Current", 1, 0);
    current.twitter_retweet_count = 3;
    current.facebook_share_count = 3;
    current.linkedin_share_count = 3;
    let mut stale = item(2, "https://a.example/2", "Stale", 1, 0);
    stale.twitter_retweet_count = 3;
    stale.facebook_share_count = 1;

    let items = vec![current, stale];
    let catalog = catalog_with(&items).await;
    let store = Arc::new(CountingItemStore::new(catalog.clone()));
    let config = fast_social_config();

    let crawler = SocialMetricsCrawler::new(
        Arc::new(catalog.clone()),
        Arc::new(PagedRanking::new(vec![views(&items)])),
        store.clone(),
        Arc::new(ScriptedFetcher::new(config.clone(), 3)),
        config,
    );

    let report = crawler.run().await.unwrap();

    assert_eq!(
        report,
        JobReport::Social(CrawlReport {
            pages: 2,
            items: 2,
            updated: 2,
            unchanged: 4,
            failed: 0,
        })
    );
    assert_eq!(store.set_counter_calls(), 2);

    let stale = catalog.get_item(2).await.unwrap();
    assert_eq!(stale.facebook_share_count, 3);
    assert_eq!(stale.linkedin_share_count, 3);
}

#[tokio::test]
async fn crawl_pages_until_the_first_empty_page() {
    let items: Vec<Item> = (1..=5)
        .map(|id| item(id, &format!("https://a.example/{}", id), &format!("Post {}", id), 1, 0))
        .collect();
    let catalog = catalog_with(&items).await;
    let config = fast_social_config();

    let ranking = PagedRanking::new(vec![
        views(&items[0..2]),
        views(&items[2..4]),
        views(&items[4..5]),
    ]);
    let requests = PagedRanking::sharing_counters_with(&ranking);
    let fetcher = ScriptedFetcher::new(config.clone(), 0);
    let calls = ScriptedFetcher::sharing_counters_with(&fetcher);

    let crawler = SocialMetricsCrawler::new(
        Arc::new(catalog.clone()),
        Arc::new(ranking),
        Arc::new(catalog.clone()),
        Arc::new(fetcher),
        config.clone(),
    );

    let report = crawler.crawl().await.unwrap();

    assert_eq!(report.pages, 4);
    assert_eq!(report.items, 5);
    assert_eq!(requests.request_count(), 4);
    assert_eq!(calls.call_count(), 15);

    for (page, query) in requests.requests().iter().enumerate() {
        assert_eq!(query.page, page);
        assert_eq!(query.order, ItemOrder::Latest);
        assert_eq!(query.window, RankingWindow::Week);
        assert_eq!(query.categories, vec![1, 2]);
    }

    // Links are percent-encoded after the provider prefix
    let expected = format!(
        "{}https%3A%2F%2Fa.example%2F1",
        config.endpoint(SocialProvider::Facebook)
    );
    assert!(calls.calls().contains(&expected));
}
