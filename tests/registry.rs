//! Registry behaviour tests.
//!
//! Covers create/update/bulk/remove scenarios and index exactness.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use service_alerts::{
    AffectedJourney, AlertId, AlertQuery, AlertRegistry, RegistryError, ServiceAlert,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn ids(alerts: &[ServiceAlert]) -> BTreeSet<String> {
    alerts.iter().map(|a| a.id.to_string()).collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn feed_alert(id: &str, lines: &[&str]) -> ServiceAlert {
    lines.iter().fold(ServiceAlert::new().with_id(id), |a, l| {
        a.with_journey(AffectedJourney::line(*l))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_create_assigns_agency_id() {
    let registry = AlertRegistry::in_memory();

    let created = registry
        .create(
            "agencyX",
            ServiceAlert::new()
                .with_id("ignored")
                .with_journey(AffectedJourney::line("10")),
        )
        .unwrap();

    let suffix = created.id.as_str().strip_prefix("agencyX_").unwrap();
    assert!(!suffix.is_empty());
    assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    assert!(created.has_creation_time());
    assert!(registry.get(&AlertId::from("ignored")).is_none());

    let on_line = registry.find_by_line("10");
    assert_eq!(on_line, vec![created]);
}

#[test]
fn test_create_twice_yields_distinct_ids() {
    let registry = AlertRegistry::in_memory();
    let a = registry.create("agency", feed_alert("", &["1"])).unwrap();
    let b = registry.create("agency", feed_alert("", &["1"])).unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(registry.find_by_line("1").len(), 2);
}

#[test]
fn test_update_moves_alert_between_lines() {
    let registry = AlertRegistry::in_memory();
    let created = registry
        .create(
            "agency",
            ServiceAlert::new()
                .with_journey(AffectedJourney::line_direction("10", "0"))
                .with_journey(AffectedJourney::line("20")),
        )
        .unwrap();
    assert_eq!(registry.find_by_line_and_direction("10", "0").len(), 1);

    let moved = ServiceAlert::new()
        .with_id(created.id.clone())
        .with_created_at(created.created_at_unix_ms.unwrap())
        .with_journey(AffectedJourney::line("30"));
    let previous = registry.update(moved.clone()).unwrap();

    assert_eq!(previous, Some(created));
    assert!(registry.find_by_line("10").is_empty());
    assert!(registry.find_by_line("20").is_empty());
    assert_eq!(registry.find_by_line("30"), vec![moved]);
    assert!(registry.find_by_line_and_direction("10", "0").is_empty());
    assert!(registry.check_indexes().is_ok());
}

#[test]
fn test_bulk_update_shared_line() {
    let registry = AlertRegistry::in_memory();
    let applied = registry
        .bulk_update(vec![feed_alert("feed_A", &["5"]), feed_alert("feed_B", &["5", "6"])])
        .unwrap();

    assert_eq!(applied, 2);
    assert_eq!(
        ids(&registry.find_by_line("5")),
        set(&["feed_A", "feed_B"])
    );
    assert_eq!(ids(&registry.find_by_line("6")), set(&["feed_B"]));
}

#[test]
fn test_bulk_update_empty_is_noop() {
    let registry = AlertRegistry::in_memory();
    assert_eq!(registry.bulk_update(Vec::new()).unwrap(), 0);
    assert!(registry.is_empty());
}

#[test]
fn test_remove_missing_is_noop() {
    let registry = AlertRegistry::in_memory();
    registry.update(feed_alert("keep", &["1"])).unwrap();
    let before = registry.stats();

    assert!(registry.remove(&AlertId::from("missing")).is_none());
    assert_eq!(registry.stats(), before);
    assert_eq!(registry.find_by_line("1").len(), 1);
}

#[test]
fn test_remove_retracts_every_index() {
    let registry = AlertRegistry::in_memory();
    let alert = ServiceAlert::new()
        .with_id("gone")
        .with_journey(AffectedJourney::line_direction("1", "0"))
        .with_journey(AffectedJourney::line_direction("2", "1"))
        .with_journey(AffectedJourney::line("3"));
    registry.update(alert.clone()).unwrap();

    let removed = registry.remove(&AlertId::from("gone"));
    assert_eq!(removed, Some(alert));

    for line in ["1", "2", "3"] {
        assert!(registry.find_by_line(line).is_empty());
        for direction in ["0", "1"] {
            assert!(registry.find_by_line_and_direction(line, direction).is_empty());
        }
    }
    assert_eq!(registry.stats().line_keys, 0);
    assert_eq!(registry.stats().line_direction_keys, 0);
}

#[test]
fn test_update_is_idempotent() {
    let registry = AlertRegistry::in_memory();
    let alert = ServiceAlert::new()
        .with_id("same")
        .with_journey(AffectedJourney::line_direction("1", "0"));

    registry.update(alert.clone()).unwrap();
    let once = registry.stats();
    registry.update(alert.clone()).unwrap();

    assert_eq!(registry.stats(), once);
    assert_eq!(registry.find_by_line_and_direction("1", "0"), vec![alert]);
    assert!(registry.check_indexes().is_ok());
}

#[test]
fn test_direction_lookup_ignores_undirected_journeys() {
    let registry = AlertRegistry::in_memory();
    registry.update(feed_alert("undirected", &["1"])).unwrap();
    registry
        .update(
            ServiceAlert::new()
                .with_id("directed")
                .with_journey(AffectedJourney::line_direction("1", "0")),
        )
        .unwrap();

    assert_eq!(registry.find_by_line("1").len(), 2);
    assert_eq!(
        ids(&registry.find_by_line_and_direction("1", "0")),
        set(&["directed"])
    );
    assert!(registry.find_by_line_and_direction("1", "1").is_empty());
}

#[test]
fn test_update_requires_id() {
    let registry = AlertRegistry::in_memory();
    let result = registry.update(feed_alert("", &["1"]));
    assert!(matches!(result, Err(RegistryError::InvalidArgument(_))));
    assert!(registry.is_empty());
}

#[test]
fn test_list_all_filters_by_agency() {
    let registry = AlertRegistry::in_memory();
    registry.create("1", feed_alert("", &["a"])).unwrap();
    registry.create("2", feed_alert("", &["b"])).unwrap();
    registry.update(feed_alert("upstream-7", &["c"])).unwrap();

    let all = registry.list_all(&AlertQuery::all());
    assert_eq!(all.len(), 3);
    assert!(!all.limit_exceeded);

    let agency_one = registry.list_all(&AlertQuery::for_agency("1"));
    assert_eq!(agency_one.len(), 1);
    assert!(agency_one.alerts[0].id.belongs_to_agency("1"));
}

#[test]
fn test_agency_filter_ignores_longer_agency_ids() {
    let registry = AlertRegistry::in_memory();
    let short = registry.create("a", feed_alert("", &["1"])).unwrap();
    registry.create("a_b", feed_alert("", &["1"])).unwrap();

    let listed = registry.list_all(&AlertQuery::for_agency("a"));
    assert_eq!(ids(&listed.alerts), set(&[short.id.as_str()]));
    assert_eq!(registry.list_all(&AlertQuery::for_agency("a_b")).len(), 1);
}

#[test]
fn test_separator_in_journey_is_rejected() {
    let registry = AlertRegistry::in_memory();

    let in_line = ServiceAlert::new()
        .with_id("x")
        .with_journey(AffectedJourney::line_direction("a_|_b", "c"));
    assert!(matches!(
        registry.update(in_line.clone()),
        Err(RegistryError::InvalidArgument(_))
    ));
    assert!(matches!(
        registry.create("agency", in_line),
        Err(RegistryError::InvalidArgument(_))
    ));

    let in_direction = ServiceAlert::new()
        .with_id("y")
        .with_journey(AffectedJourney::line_direction("a", "b_|_c"));
    assert!(matches!(
        registry.bulk_update(vec![feed_alert("z", &["1"]), in_direction]),
        Err(RegistryError::InvalidArgument(_))
    ));

    assert!(registry.is_empty());
    assert!(registry.find_by_line_and_direction("a", "b_|_c").is_empty());
    assert!(registry.find_by_line_and_direction("a_|_b", "c").is_empty());
}

#[test]
fn test_returned_alerts_are_copies() {
    let registry = AlertRegistry::in_memory();
    registry.update(feed_alert("a", &["1"])).unwrap();

    let mut copy = registry.get(&AlertId::from("a")).unwrap();
    copy.affects.vehicle_journeys.clear();

    assert_eq!(registry.find_by_line("1").len(), 1);
    assert!(registry.check_indexes().is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_concurrent_writers_keep_indexes_exact() {
    let registry = Arc::new(AlertRegistry::in_memory());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..50 {
                    let id = format!("w{}_{}", t, i % 10);
                    let line = format!("{}", (t + i) % 4);
                    registry
                        .update(
                            ServiceAlert::new()
                                .with_id(id.as_str())
                                .with_journey(AffectedJourney::line_direction(line, "0")),
                        )
                        .unwrap();
                    if i % 7 == 0 {
                        registry.remove(&AlertId::from(id));
                    }
                    let _ = registry.find_by_line("0");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(registry.check_indexes().is_ok());
}

#[test]
fn test_concurrent_creates_are_unique() {
    let registry = Arc::new(AlertRegistry::in_memory());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..100)
                    .map(|_| registry.create("agency", feed_alert("", &["1"])).unwrap().id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = BTreeSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id));
        }
    }

    assert_eq!(seen.len(), 400);
    assert_eq!(registry.find_by_line("1").len(), 400);
}
