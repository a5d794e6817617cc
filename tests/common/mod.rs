#![allow(dead_code)]

use std::sync::Arc;

use siegecraft::engine::{Engine, ManualClock, ScriptedRandom};
use siegecraft::model::Timestamp;
use siegecraft::scenario::Scenario;
use siegecraft::store::MemoryStore;

/// Two houses at war over castle a10, owned by bear, with two fighters each.
///
/// wolf: w1 (1000 troops), w2 (400 troops)
/// bear: b1 (600 troops), b2 (200 troops)
pub fn build_test_realm() -> Scenario {
    Scenario::new()
        .house_named("wolf", "Stark")
        .house_named("bear", "Mormont")
        .house_named("lion", "Lannister")
        .player("w1", "wolf", 1000)
        .player("w2", "wolf", 400)
        .player("b1", "bear", 600)
        .player("b2", "bear", 200)
        .player("l1", "lion", 50)
        .tile("a10", Some("bear"))
        .tile("b20", Some("wolf"))
        .tile("c30", None)
        .war("wolf", "bear")
}

pub fn hours(h: u64) -> Timestamp {
    Timestamp::from_hours(h)
}

/// An engine over `scenario` with a shared manual clock starting at `start`.
pub fn engine_at(
    scenario: Scenario,
    start: Timestamp,
    draws: impl IntoIterator<Item = f64>,
) -> (Engine<MemoryStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start));
    let engine = scenario
        .engine(clock.clone(), ScriptedRandom::new(draws))
        .unwrap();
    (engine, clock)
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
