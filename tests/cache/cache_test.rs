//! Member/level cache behavior.

use prism::cache::{CacheScope, LevelEntry, MemberCache};
use prism::model::{Dimension, Level, Member};

fn member(unique: &str, caption: &str, level: i32, parent: Option<&str>) -> Member {
    let mut m = Member::new(unique, caption);
    m.level_number = level;
    m.parent_unique_name = parent.map(str::to_string);
    m
}

fn region() -> Dimension {
    let mut dim = Dimension::new("Region", "[Region]");
    dim.push_level(Level::new("Country", "[Region].[Country]"));
    dim.push_level(Level::new("State", "[Region].[State]"));
    dim.push_level(Level::new("City", "[Region].[City]"));
    dim
}

fn seeded_cache(scope: &CacheScope) -> MemberCache {
    let cache = MemberCache::open_in_memory().unwrap();

    let mut countries = LevelEntry::new("[Region].[Country]", 0);
    countries
        .members
        .push(member("[Region].[Country].[USA]", "USA", 0, None));
    cache
        .put(&scope.key("[Region].[Country]"), countries)
        .unwrap();

    let mut states = LevelEntry::new("[Region].[State]", 1);
    states.members.push(member(
        "[Region].[State].[NY]",
        "NY",
        1,
        Some("[Region].[Country].[USA]"),
    ));
    states.members.push(member(
        "[Region].[State].[CA]",
        "CA",
        1,
        Some("[Region].[Country].[USA]"),
    ));
    cache.put(&scope.key("[Region].[State]"), states).unwrap();

    cache
}

#[test]
fn key_generation_is_order_independent() {
    let a = CacheScope::new("Sales DS", "Sales").key("[Region].[State]");
    let b = CacheScope::new("Sales DS", "Sales").key("[Region].[State]");
    assert_eq!(a, b);

    // principal-salted keys differ from anonymous ones
    let salted = CacheScope::new("Sales DS", "Sales")
        .for_principal("alice")
        .key("[Region].[State]");
    assert_ne!(a, salted);
}

#[test]
fn ancestor_resolution_is_idempotent_and_terminates() {
    let scope = CacheScope::new("ds", "Sales");
    let cache = seeded_cache(&scope);
    let dim = region();

    let ny = member(
        "[Region].[City].[Albany]",
        "Albany",
        2,
        Some("[Region].[State].[NY]"),
    );

    let first = cache.resolve_ancestor(&scope, &dim, &ny, 2).unwrap().unwrap();
    let second = cache.resolve_ancestor(&scope, &dim, &ny, 2).unwrap().unwrap();
    assert_eq!(first.unique_name, "[Region].[Country].[USA]");
    assert_eq!(first, second);

    // offset beyond the hierarchy terminates with None
    assert!(cache.resolve_ancestor(&scope, &dim, &ny, 5).unwrap().is_none());
}

#[test]
fn zero_offset_returns_the_member_itself() {
    let scope = CacheScope::new("ds", "Sales");
    let cache = seeded_cache(&scope);
    let dim = region();
    let ny = member("[Region].[State].[NY]", "NY", 1, None);

    let resolved = cache.resolve_ancestor(&scope, &dim, &ny, 0).unwrap().unwrap();
    assert_eq!(resolved.unique_name, ny.unique_name);
}

#[test]
fn seeded_entries_read_back() {
    let scope = CacheScope::new("ds", "Sales");
    let cache = seeded_cache(&scope);

    let entry = cache.get(&scope.key("[Region].[State]")).unwrap().unwrap();
    assert_eq!(entry.members.len(), 2);
    assert!(entry.member("[Region].[State].[CA]").is_some());
}

#[test]
fn invalidation_is_whole_datasource() {
    let scope = CacheScope::new("ds", "Sales");
    let other = CacheScope::new("other-ds", "Sales");
    let cache = seeded_cache(&scope);
    cache
        .put(
            &other.key("[Region].[State]"),
            LevelEntry::new("[Region].[State]", 1),
        )
        .unwrap();

    let removed = cache.invalidate_datasource(&scope).unwrap();
    assert_eq!(removed, 2);
    assert!(cache.get(&scope.key("[Region].[State]")).unwrap().is_none());
    assert!(cache.get(&scope.key("[Region].[Country]")).unwrap().is_none());
    assert!(cache.get(&other.key("[Region].[State]")).unwrap().is_some());
}

#[test]
fn invalidation_reaches_principal_salted_entries() {
    let scope = CacheScope::new("ds", "Sales");
    let salted = CacheScope::new("ds", "Sales").for_principal("alice");
    let cache = MemberCache::open_in_memory().unwrap();
    cache
        .put(
            &salted.key("[Region].[State]"),
            LevelEntry::new("[Region].[State]", 1),
        )
        .unwrap();

    let removed = cache.invalidate_datasource(&scope).unwrap();
    assert_eq!(removed, 1);
    assert!(cache
        .get(&salted.key("[Region].[State]"))
        .unwrap()
        .is_none());
}

#[test]
fn shared_read_does_not_copy() {
    let scope = CacheScope::new("ds", "Sales");
    let cache = seeded_cache(&scope);

    let a = cache.get_shared(&scope.key("[Region].[State]")).unwrap().unwrap();
    let b = cache.get_shared(&scope.key("[Region].[State]")).unwrap().unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn concurrent_readers_and_writer() {
    use std::sync::Arc;
    use std::thread;

    let scope = CacheScope::new("ds", "Sales");
    let cache = Arc::new(seeded_cache(&scope));
    let key = scope.key("[Region].[State]");

    let mut handles = Vec::new();
    for i in 0..4 {
        let cache = Arc::clone(&cache);
        let key = key.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..20 {
                if i == 0 {
                    let mut entry = LevelEntry::new("[Region].[State]", 1);
                    entry
                        .members
                        .push(member("[Region].[State].[TX]", "TX", 1, None));
                    cache.put(&key, entry).unwrap();
                } else {
                    // observes the old or the new value, never a torn one
                    let entry = cache.get(&key).unwrap().unwrap();
                    assert!(!entry.members.is_empty());
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
