//! End-to-end engine tests over in-memory collaborators
//!
//! Covers the scheduler cycle, due-time selection, channel processing with
//! the acceptance cap, the dedup ledger invariants, winner selection, and
//! the failure-isolation rules at every loop layer.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration as StdDuration;

use chrono::Duration;

use common::{fixed_now, make_config, make_post, Harness};

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_two_suitable_posts_one_chosen_and_published() {
    let config = make_config(&["rustlang"]);
    let config_id = config.id;
    let harness = Harness::new(vec![config.clone()]);

    harness.fetcher.add_posts(
        "rustlang",
        vec![
            make_post("rustlang", 1, "keep: release one", 1),
            make_post("rustlang", 2, "keep: release two", 2),
        ],
    );

    harness.coordinator().process(&config).await.unwrap();

    // Both classified, one winner published
    assert_eq!(harness.classifier.call_count(), 2);
    assert_eq!(harness.publisher.publish_count(), 1);

    // Picker saw the full pool of 2
    assert_eq!(*harness.picker.pools_seen.lock().unwrap(), vec![2]);

    // The winner is ledgered; the accepted-but-unselected post is not
    let published = harness.publisher.published.lock().unwrap();
    let winner = &published[0].1;
    assert!(harness.ledger.contains(config_id, "rustlang", &winner.link));
    assert_eq!(harness.ledger.record_count(), 1);

    // Cycle completed: last_active stamped to the injected now
    assert_eq!(harness.configs.stamped.lock().unwrap().len(), 1);
    assert_eq!(harness.configs.last_active_of(config_id), Some(fixed_now()));
}

#[tokio::test]
async fn test_empty_pool_still_stamps_last_active() {
    let config = make_config(&["rustlang"]);
    let config_id = config.id;
    let harness = Harness::new(vec![config.clone()]);

    harness.coordinator().process(&config).await.unwrap();

    assert_eq!(harness.publisher.publish_count(), 0);
    assert_eq!(harness.configs.last_active_of(config_id), Some(fixed_now()));
}

// ============================================================================
// Due-time selection through the scheduler
// ============================================================================

#[tokio::test]
async fn test_not_yet_due_config_excluded_from_cycle() {
    let mut config = make_config(&["rustlang"]);
    config.period_hours = 2;
    config.last_active = Some(fixed_now() - Duration::minutes(90));
    let harness = Harness::new(vec![config]);

    let stats = harness.scheduler().run_cycle().await.unwrap();

    assert_eq!(stats.selected, 0);
    assert_eq!(stats.not_ready, 1);
    assert_eq!(harness.publisher.publish_count(), 0);
}

#[tokio::test]
async fn test_first_run_config_is_processed() {
    let config = make_config(&["rustlang"]);
    let harness = Harness::new(vec![config]);
    harness
        .fetcher
        .add_posts("rustlang", vec![make_post("rustlang", 1, "keep this", 1)]);

    let stats = harness.scheduler().run_cycle().await.unwrap();

    assert_eq!(stats.selected, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(harness.publisher.publish_count(), 1);
}

#[tokio::test]
async fn test_disabled_config_never_processed() {
    let mut config = make_config(&["rustlang"]);
    config.enabled = false;
    let harness = Harness::new(vec![config]);

    let stats = harness.scheduler().run_cycle().await.unwrap();

    assert_eq!(stats.selected, 0);
    assert_eq!(stats.disabled, 1);
}

// ============================================================================
// Channel processing: cap, dedup, recency, blank posts
// ============================================================================

#[tokio::test]
async fn test_acceptance_cap_stops_classification() {
    let config = make_config(&["rustlang"]);
    let harness = Harness::new(vec![config.clone()]);

    // Five eligible posts, all suitable: only the first three may be judged
    harness.fetcher.add_posts(
        "rustlang",
        (1..=5)
            .map(|i| make_post("rustlang", i, &format!("keep {i}"), 1))
            .collect(),
    );

    let outcome = harness
        .channel_processor()
        .process(&config, "rustlang")
        .await
        .unwrap();

    assert_eq!(outcome.accepted.len(), 3);
    assert_eq!(harness.classifier.call_count(), 3);

    let calls = harness.classifier.calls.lock().unwrap();
    assert!(!calls.iter().any(|text| text.contains("keep 4")));
    assert!(!calls.iter().any(|text| text.contains("keep 5")));
}

#[tokio::test]
async fn test_ledgered_link_never_reclassified() {
    let config = make_config(&["rustlang"]);
    let harness = Harness::new(vec![config.clone()]);

    let post = make_post("rustlang", 7, "keep me", 1);
    harness.ledger.seed(config.id, "rustlang", &post.link);
    harness.fetcher.add_posts("rustlang", vec![post]);

    let outcome = harness
        .channel_processor()
        .process(&config, "rustlang")
        .await
        .unwrap();

    assert_eq!(outcome.skipped_viewed, 1);
    assert!(outcome.accepted.is_empty());
    assert_eq!(harness.classifier.call_count(), 0);
    // No duplicate ledger write either
    assert_eq!(harness.ledger.record_count(), 0);
}

#[tokio::test]
async fn test_stale_posts_not_classified() {
    // period 2h, lookback factor 3: window is 6 hours
    let config = make_config(&["rustlang"]);
    let harness = Harness::new(vec![config.clone()]);

    harness.fetcher.add_posts(
        "rustlang",
        vec![
            make_post("rustlang", 1, "keep fresh", 1),
            make_post("rustlang", 2, "keep boundary", 6),
            make_post("rustlang", 3, "keep ancient", 7),
        ],
    );

    let outcome = harness
        .channel_processor()
        .process(&config, "rustlang")
        .await
        .unwrap();

    // The boundary post (exactly at the window) is retained
    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.stale, 1);
    assert_eq!(harness.classifier.call_count(), 2);
}

#[tokio::test]
async fn test_blank_posts_skipped_without_classification() {
    let config = make_config(&["rustlang"]);
    let harness = Harness::new(vec![config.clone()]);

    harness.fetcher.add_posts(
        "rustlang",
        vec![
            make_post("rustlang", 1, "   \n ", 1),
            make_post("rustlang", 2, "keep text", 1),
        ],
    );

    let outcome = harness
        .channel_processor()
        .process(&config, "rustlang")
        .await
        .unwrap();

    assert_eq!(outcome.skipped_empty, 1);
    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(harness.classifier.call_count(), 1);
}

#[tokio::test]
async fn test_rejected_posts_ledgered_immediately() {
    let config = make_config(&["rustlang"]);
    let harness = Harness::new(vec![config.clone()]);

    let rejected = make_post("rustlang", 1, "ordinary chatter", 1);
    harness.fetcher.add_posts(
        "rustlang",
        vec![rejected.clone(), make_post("rustlang", 2, "keep this", 1)],
    );

    let outcome = harness
        .channel_processor()
        .process(&config, "rustlang")
        .await
        .unwrap();

    assert_eq!(outcome.rejected, 1);
    assert!(harness.ledger.contains(config.id, "rustlang", &rejected.link));
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_classifier_error_skips_only_that_post() {
    let config = make_config(&["rustlang"]);
    let harness = Harness::new(vec![config.clone()]);

    harness.fetcher.add_posts(
        "rustlang",
        vec![
            make_post("rustlang", 1, "keep first", 1),
            make_post("rustlang", 2, "boom", 1),
            make_post("rustlang", 3, "keep third", 1),
        ],
    );

    let outcome = harness
        .channel_processor()
        .process(&config, "rustlang")
        .await
        .unwrap();

    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(harness.classifier.call_count(), 3);
    // The failed post is not ledgered: it stays a candidate next cycle
    assert_eq!(harness.ledger.record_count(), 0);
}

#[tokio::test]
async fn test_channel_failure_does_not_abort_config() {
    let config = make_config(&["deadchan", "rustlang"]);
    let config_id = config.id;
    let harness = Harness::new(vec![config.clone()]);

    harness.fetcher.fail_channel("deadchan");
    harness
        .fetcher
        .add_posts("rustlang", vec![make_post("rustlang", 1, "keep this", 1)]);

    harness.coordinator().process(&config).await.unwrap();

    assert_eq!(harness.publisher.publish_count(), 1);
    assert_eq!(harness.configs.last_active_of(config_id), Some(fixed_now()));
}

#[tokio::test]
async fn test_winner_stays_ledgered_when_publish_fails() {
    let config = make_config(&["rustlang"]);
    let config_id = config.id;
    let harness = Harness::new(vec![config.clone()]);

    let post = make_post("rustlang", 1, "keep this", 1);
    harness.fetcher.add_posts("rustlang", vec![post.clone()]);
    harness.publisher.fail.store(true, Ordering::SeqCst);

    // Publication failure is caught inside the coordinator
    harness.coordinator().process(&config).await.unwrap();

    // The winner was consumed even though no draft came out of it
    assert!(harness.ledger.contains(config_id, "rustlang", &post.link));
    assert_eq!(harness.publisher.publish_count(), 0);

    // And the cycle still counts as completed
    assert_eq!(harness.configs.last_active_of(config_id), Some(fixed_now()));
}

#[tokio::test]
async fn test_uncaught_coordinator_error_leaves_config_unstamped() {
    let config = make_config(&["rustlang"]);
    let config_id = config.id;
    let harness = Harness::new(vec![config]);

    harness
        .fetcher
        .add_posts("rustlang", vec![make_post("rustlang", 1, "keep this", 1)]);
    harness.configs.fail_update.store(true, Ordering::SeqCst);

    let stats = harness.scheduler().run_cycle().await.unwrap();

    // The cycle survives, the config does not advance
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 0);
    assert_eq!(harness.configs.last_active_of(config_id), None);
}

// ============================================================================
// Pooling across channels
// ============================================================================

#[tokio::test]
async fn test_cap_is_per_channel_not_per_config() {
    let config = make_config(&["one_chan", "two_chan"]);
    let harness = Harness::new(vec![config.clone()]);

    for (channel, base) in [("one_chan", 0), ("two_chan", 100)] {
        harness.fetcher.add_posts(
            channel,
            (1..=4)
                .map(|i| make_post(channel, base + i, &format!("keep {channel} {i}"), 1))
                .collect(),
        );
    }

    harness.coordinator().process(&config).await.unwrap();

    // 3 accepted per channel pooled into 6 candidates
    assert_eq!(*harness.picker.pools_seen.lock().unwrap(), vec![6]);
}

// ============================================================================
// Scheduler loop lifecycle
// ============================================================================

#[tokio::test]
async fn test_scheduler_start_and_stop() {
    let mut harness = Harness::new(vec![]);
    harness.settings.cycle_interval = StdDuration::from_millis(20);
    harness.settings.error_backoff = StdDuration::from_millis(20);

    let scheduler = std::sync::Arc::new(harness.scheduler());

    let runner = {
        let scheduler = std::sync::Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.start().await })
    };

    tokio::time::sleep(StdDuration::from_millis(60)).await;
    assert!(scheduler.is_running().await);

    scheduler.stop().await;
    tokio::time::timeout(StdDuration::from_secs(1), runner)
        .await
        .expect("scheduler should stop promptly")
        .unwrap();

    assert!(!scheduler.is_running().await);
}
