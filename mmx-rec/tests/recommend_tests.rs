//! Recommendation orchestrator integration tests
//!
//! Drive the orchestrator against a scripted catalog and check which catalog
//! calls happen, in what order, and what comes back.

mod helpers;

use helpers::{distinct_items, harness, item, ScriptedCatalog};
use mmx_rec::catalog::CatalogError;
use mmx_rec::recommend::{RecommendError, Stage};
use std::collections::HashSet;

#[tokio::test]
async fn test_face_not_visible_makes_no_catalog_calls() {
    let h = harness(ScriptedCatalog::default().with_targeted(distinct_items("t", 20)));

    for label in ["no face detected", "Waiting...", "  No Face Detected "] {
        let err = h.recommender.recommend(label).await.unwrap_err();
        assert!(matches!(err, RecommendError::FaceNotVisible));
        assert_eq!(err.status(), 400);
    }
    assert!(h.catalog.calls().is_empty());
}

#[tokio::test]
async fn test_targeted_fetch_fills_batch_without_genre_search() {
    let h = harness(ScriptedCatalog::default().with_targeted(distinct_items("t", 20)));

    let rec = h.recommender.recommend("Happy").await.unwrap();
    assert_eq!(rec.emotion, "happy");
    assert_eq!(rec.items.len(), 15);
    assert!(!rec.from_cache);
    assert_eq!(rec.container_url, "https://open.example.com/playlist/playlist-1");
    assert_eq!(
        h.catalog.calls(),
        vec!["container", "targeted:pop,dance,disco", "replace:15"]
    );
}

#[tokio::test]
async fn test_empty_targeted_fetch_falls_back_to_default_genre() {
    let h = harness(ScriptedCatalog::default().with_genre("pop", distinct_items("p", 3)));

    let rec = h.recommender.recommend("sad").await.unwrap();
    assert_eq!(rec.items.len(), 3);
    assert_eq!(
        h.catalog.calls(),
        vec![
            "container",
            "targeted:acoustic,piano,indie",
            "genre:indie",
            "genre:acoustic",
            "genre:piano",
            "genre:sad",
            "genre:pop",
            "replace:3",
        ]
    );
}

#[tokio::test]
async fn test_nothing_anywhere_is_not_found() {
    let h = harness(ScriptedCatalog::default());

    let err = h.recommender.recommend("fear").await.unwrap_err();
    assert!(matches!(err, RecommendError::NoSuitableContent { ref emotion } if emotion == "fear"));
    assert_eq!(err.status(), 404);

    let calls = h.catalog.calls();
    assert_eq!(calls.last().map(String::as_str), Some("genre:pop"));
    assert!(!calls.iter().any(|c| c.starts_with("replace:")));
}

#[tokio::test]
async fn test_short_targeted_batch_is_topped_up_by_genre() {
    let h = harness(
        ScriptedCatalog::default()
            .with_targeted(distinct_items("t", 10))
            .with_genre("pop", distinct_items("p", 10)),
    );

    let rec = h.recommender.recommend("happy").await.unwrap();
    assert_eq!(rec.items.len(), 15);
    let calls = h.catalog.calls();
    assert!(calls.contains(&"genre:pop".to_string()));
    // batch full after the first genre search
    assert!(!calls.contains(&"genre:dance pop".to_string()));
}

#[tokio::test]
async fn test_one_item_per_artist_and_no_duplicates() {
    let h = harness(ScriptedCatalog::default().with_targeted(vec![
        item("1", "Same"),
        item("2", "Same"),
        item("3", "Other"),
        item("3", "Third"),
        item("4", "Fourth"),
    ]));

    let rec = h.recommender.recommend("angry").await.unwrap();
    let ids: HashSet<_> = rec.items.iter().map(|i| i.id.as_str()).collect();
    let artists: HashSet<_> = rec.items.iter().map(|i| i.artist.as_str()).collect();
    assert_eq!(rec.items.len(), 3);
    assert_eq!(ids, ["1", "3", "4"].into_iter().collect());
    assert_eq!(artists.len(), rec.items.len());
}

#[tokio::test]
async fn test_content_cache_hit_skips_catalog() {
    let h = harness(ScriptedCatalog::default().with_targeted(distinct_items("t", 20)));

    let first = h.recommender.recommend("happy").await.unwrap();
    let calls_after_first = h.catalog.calls().len();

    h.clock.advance_secs(10.0);
    let second = h.recommender.recommend("happy").await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.items, first.items);
    assert_eq!(h.catalog.calls().len(), calls_after_first);
}

#[tokio::test]
async fn test_expired_content_is_refetched_without_recent_tracks() {
    let h = harness(ScriptedCatalog::default().with_targeted(distinct_items("t", 20)));

    let first = h.recommender.recommend("happy").await.unwrap();
    h.clock.advance_secs(31.0);
    let second = h.recommender.recommend("happy").await.unwrap();

    assert!(!second.from_cache);
    assert_eq!(second.items.len(), 5);
    let first_ids: HashSet<_> = first.items.iter().map(|i| i.id.clone()).collect();
    assert!(second.items.iter().all(|i| !first_ids.contains(&i.id)));
    assert_eq!(h.catalog.fetch_calls(), 1 + 1 + 4);
    // container id still cached
    assert_eq!(
        h.catalog.calls().iter().filter(|c| *c == "container").count(),
        1
    );
}

#[tokio::test]
async fn test_unknown_label_uses_neutral_profile() {
    let h = harness(ScriptedCatalog::default().with_targeted(distinct_items("t", 20)));

    let rec = h.recommender.recommend("bored").await.unwrap();
    assert_eq!(rec.emotion, "neutral");
    assert!(h
        .catalog
        .calls()
        .contains(&"targeted:chill,study music".to_string()));
}

#[tokio::test]
async fn test_container_failure_is_hard_failure() {
    let h = harness(ScriptedCatalog {
        container: Err(CatalogError::Network("connection refused".into())),
        ..ScriptedCatalog::default().with_targeted(distinct_items("t", 20))
    });

    let err = h.recommender.recommend("happy").await.unwrap_err();
    assert!(matches!(err, RecommendError::ContainerUnavailable { .. }));
    assert_eq!(err.status(), 500);
    assert_eq!(h.catalog.fetch_calls(), 0);
}

#[tokio::test]
async fn test_every_fetch_failing_is_catalog_failure() {
    let h = harness(ScriptedCatalog {
        targeted: Err(CatalogError::Api(503, "unavailable".into())),
        genre_error: Some(CatalogError::Network("timeout".into())),
        ..ScriptedCatalog::default()
    });

    let err = h.recommender.recommend("surprise").await.unwrap_err();
    match &err {
        RecommendError::Catalog { stage, emotion, .. } => {
            assert_eq!(*stage, Stage::DefaultGenreFetch);
            assert_eq!(emotion, "surprise");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.status(), 500);
}

#[tokio::test]
async fn test_failed_targeted_fetch_still_uses_genre_results() {
    let h = harness(
        ScriptedCatalog {
            targeted: Err(CatalogError::Api(404, "no recommendations".into())),
            ..ScriptedCatalog::default()
        }
        .with_genre("jazz", distinct_items("j", 4)),
    );

    let rec = h.recommender.recommend("surprise").await.unwrap();
    assert_eq!(rec.items.len(), 4);
}

#[tokio::test]
async fn test_replace_failure_is_not_cached() {
    let h = harness(ScriptedCatalog {
        replace_error: Some(CatalogError::Api(403, "forbidden".into())),
        ..ScriptedCatalog::default().with_targeted(distinct_items("t", 20))
    });

    let err = h.recommender.recommend("happy").await.unwrap_err();
    assert!(matches!(
        err,
        RecommendError::Catalog {
            stage: Stage::ReplaceContent,
            ..
        }
    ));
    assert!(h.recommender.cache().content("happy").is_none());
}

#[tokio::test]
async fn test_container_receives_returned_items() {
    let h = harness(ScriptedCatalog::default().with_targeted(distinct_items("t", 8)));

    let rec = h.recommender.recommend("disgust").await.unwrap();
    let replaced = h.catalog.replaced.lock().unwrap().clone();
    assert_eq!(replaced, vec![rec.items.clone()]);
}

#[tokio::test]
async fn test_repeated_refreshes_keep_finding_tracks() {
    let h = harness(
        ScriptedCatalog::default()
            .with_targeted(distinct_items("t", 20))
            .with_genre("pop", distinct_items("p", 20)),
    );

    let mut sizes = Vec::new();
    for _ in 0..8 {
        for label in ["angry", "disgust", "fear", "neutral", "sad", "surprise"] {
            let _ = h.recommender.recommend(label).await;
        }
        let rec = h.recommender.recommend("happy").await.unwrap();
        assert!(!rec.from_cache);
        sizes.push(rec.items.len());
        h.clock.advance_secs(31.0);
    }

    assert!(sizes.iter().all(|&n| n >= 10), "batch sizes: {:?}", sizes);
    assert!(h.recommender.cache().recent().key_count() <= 7);
    assert!(h.recommender.cache().recent().get("pop_dance_disco").len() <= 30);
}

#[tokio::test]
async fn test_exhausted_small_catalog_starts_over() {
    let h = harness(ScriptedCatalog::default().with_targeted(distinct_items("t", 5)));

    let first = h.recommender.recommend("happy").await.unwrap();
    assert_eq!(first.items.len(), 5);

    h.clock.advance_secs(31.0);
    let second = h.recommender.recommend("happy").await.unwrap();
    assert_eq!(second.items.len(), 5);

    let first_ids: HashSet<_> = first.items.iter().map(|i| i.id.clone()).collect();
    let second_ids: HashSet<_> = second.items.iter().map(|i| i.id.clone()).collect();
    assert_eq!(first_ids, second_ids);
}
