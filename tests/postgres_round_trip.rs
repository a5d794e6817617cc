mod common;

use common::{build_test_realm, hours};
use siegecraft::db::{commit_intent, fetch_store, load_store, migrate};
use siegecraft::engine::ledger;
use siegecraft::error::CommitError;
use siegecraft::id::{PlayerId, TileId};
use siegecraft::model::{Side, TruceChoice};
use siegecraft::store::{CommitIntent, EntityStore, MemoryStore};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

async fn setup() -> (PgPool, ContainerAsync<Postgres>) {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let pool = PgPoolOptions::new()
        .connect(&format!(
            "postgres://postgres:postgres@{}:{}/postgres",
            host, port
        ))
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    (pool, container)
}

fn build_test_store() -> MemoryStore {
    build_test_realm()
        .siege("a10", "wolf", hours(1))
        .pledge("a10", "w1", 300, Side::Attack, hours(1))
        .pledge("a10", "b1", 200, Side::Defend, hours(2))
        .war_vote("l1", "peace", hours(2))
        .truce_vote("w2", "bear", TruceChoice::Yes, hours(3))
        .store()
}

#[tokio::test]
#[ignore]
async fn load_populates_all_tables() {
    let (pool, _container) = setup().await;
    load_store(&pool, &build_test_store()).await.unwrap();

    for (table, expected) in [
        ("tiles", 3i64),
        ("players", 5),
        ("sieges", 1),
        ("pledges", 2),
        ("wars", 1),
        ("war_votes", 1),
        ("truce_votes", 1),
    ] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, expected, "row count of {table}");
    }
}

#[tokio::test]
#[ignore]
async fn fetched_store_matches_loaded_store() {
    let (pool, _container) = setup().await;
    let store = build_test_store();
    load_store(&pool, &store).await.unwrap();

    let fetched = fetch_store(&pool).await.unwrap();

    assert_eq!(fetched.tiles().collect::<Vec<_>>(), store.tiles().collect::<Vec<_>>());
    assert_eq!(fetched.players().collect::<Vec<_>>(), store.players().collect::<Vec<_>>());
    assert_eq!(fetched.sieges().collect::<Vec<_>>(), store.sieges().collect::<Vec<_>>());
    assert_eq!(fetched.pledges().collect::<Vec<_>>(), store.pledges().collect::<Vec<_>>());
    assert_eq!(fetched.wars().collect::<Vec<_>>(), store.wars().collect::<Vec<_>>());
    assert_eq!(
        fetched.war_votes().collect::<Vec<_>>(),
        store.war_votes().collect::<Vec<_>>()
    );
    assert_eq!(
        fetched.truce_votes().collect::<Vec<_>>(),
        store.truce_votes().collect::<Vec<_>>()
    );
}

#[tokio::test]
#[ignore]
async fn committed_intents_keep_ids_in_step_with_memory() {
    let (pool, _container) = setup().await;
    let mut memory = build_test_realm().store();
    load_store(&pool, &memory).await.unwrap();

    let config = build_test_realm().config().clone();
    let siege = ledger::start_siege(&memory, &config, &PlayerId::new("w1"), "a10", hours(0))
        .unwrap();
    memory.commit(&siege).unwrap();
    commit_intent(&pool, &siege).await.unwrap();

    let pledge = ledger::pledge(&memory, &PlayerId::new("w1"), "a10", "250", "attack", hours(0))
        .unwrap();
    memory.commit(&pledge).unwrap();
    commit_intent(&pool, &pledge).await.unwrap();

    let fetched = fetch_store(&pool).await.unwrap();
    assert_eq!(fetched.sieges().collect::<Vec<_>>(), memory.sieges().collect::<Vec<_>>());
    assert_eq!(fetched.pledges().collect::<Vec<_>>(), memory.pledges().collect::<Vec<_>>());
    let w1 = fetched.player(&PlayerId::new("w1")).unwrap().unwrap();
    assert_eq!(w1.troops, 750);
    assert!(fetched.active_siege(&TileId::new("a10")).unwrap().is_some());
}

#[tokio::test]
#[ignore]
async fn stale_intent_rolls_back() {
    let (pool, _container) = setup().await;
    let mut memory = build_test_realm().store();
    load_store(&pool, &memory).await.unwrap();

    let config = build_test_realm().config().clone();
    let siege = ledger::start_siege(&memory, &config, &PlayerId::new("w1"), "a10", hours(0))
        .unwrap();
    memory.commit(&siege).unwrap();
    commit_intent(&pool, &siege).await.unwrap();

    // Same intent again: the tile already has an active siege.
    let err = commit_intent(&pool, &siege).await.unwrap_err();
    assert!(matches!(err, CommitError::Stale(_)), "got {err:?}");

    // A pledge larger than the player's troops spends nothing.
    let pledge = ledger::pledge(&memory, &PlayerId::new("b2"), "a10", "150", "defend", hours(0))
        .unwrap();
    let mut overdrawn = pledge.clone();
    overdrawn.mutations.push(overdrawn.mutations[0].clone());
    let err = commit_intent(&pool, &overdrawn).await.unwrap_err();
    assert!(matches!(err, CommitError::Stale(_)), "got {err:?}");

    let fetched = fetch_store(&pool).await.unwrap();
    let b2 = fetched.player(&PlayerId::new("b2")).unwrap().unwrap();
    assert_eq!(b2.troops, 200);
    assert_eq!(fetched.pledges().count(), 0);
}
