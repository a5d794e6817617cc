mod common;

use common::{build_test_realm, engine_at, hours};
use siegecraft::engine::ResolutionScheduler;
use siegecraft::id::HouseId;
use siegecraft::model::{
    Action, BallotClose, HousePair, Outcome, TruceVerdict, WarChoice, WarVerdict,
};
use siegecraft::store::EntityStore;
use std::sync::Arc;

fn pair(a: &str, b: &str) -> HousePair {
    HousePair::new(HouseId::new(a), HouseId::new(b))
}

#[test]
fn unanimous_house_declares_war_on_the_last_vote() {
    let (engine, _clock) = engine_at(build_test_realm(), hours(0), [0.5]);

    let first = engine.submit(&Action::war("w1", "Lannister")).unwrap();
    assert_eq!(first.reply, "your choice of lion was recorded");
    assert!(first.outcomes.is_empty());

    let last = engine.submit(&Action::war("w2", "lion")).unwrap();
    assert_eq!(last.reply, "your choice of lion was recorded");
    assert_eq!(last.outcomes.len(), 1);
    let Outcome::War(report) = &last.outcomes[0] else {
        panic!("expected a war report, got {:?}", last.outcomes[0]);
    };
    assert_eq!(report.closed_by, BallotClose::Quorum);
    assert_eq!(report.eligible, 2);
    assert_eq!(report.verdict, WarVerdict::WarDeclared(HouseId::new("lion")));
    assert_eq!(last.outcomes[0].to_string(), "wolf has declared war on lion");

    let at_war = engine
        .read(|store| store.war_exists(&HouseId::new("lion"), &HouseId::new("wolf")))
        .unwrap();
    assert!(at_war);
    let leftover = engine
        .read(|store| store.war_votes_for_house(&HouseId::new("wolf")))
        .unwrap();
    assert!(leftover.is_empty());
}

#[test]
fn split_ballot_closes_on_timeout() {
    let (engine, clock) = engine_at(build_test_realm(), hours(0), [0.5]);
    engine.submit(&Action::war("w1", "peace")).unwrap();

    let scheduler = ResolutionScheduler::new(Arc::new(engine));
    clock.set(hours(5));
    assert!(scheduler.tick().unwrap().is_empty());

    clock.set(hours(6));
    let outcomes = scheduler.tick().unwrap();
    assert_eq!(outcomes.len(), 1);
    let Outcome::War(report) = &outcomes[0] else {
        panic!("expected a war report");
    };
    assert_eq!(report.closed_by, BallotClose::Timeout);
    assert_eq!(report.verdict, WarVerdict::Peace);
    assert_eq!(report.tally[0].choice, WarChoice::Peace);
    assert_eq!(report.tally[0].votes, 1);
}

#[test]
fn war_vote_rejections() {
    let scenario = build_test_realm().player("drifter", "", 10);
    let (engine, _clock) = engine_at(scenario, hours(0), [0.5]);
    let reply = |action: Action| engine.submit(&action).unwrap().reply;

    assert_eq!(reply(Action::war("drifter", "lion")), "you are not part of a house");
    assert_eq!(
        reply(Action::war("w1", "dragons")),
        "your choice is not recognized, please vote again"
    );
    assert_eq!(reply(Action::war("w1", "Stark")), "you cannot vote for your own house");

    reply(Action::war("w1", "lion"));
    assert_eq!(reply(Action::war("w1", "peace")), "you have already voted for lion");
}

#[test]
fn truce_agreed_by_both_houses_ends_the_war() {
    let (engine, _clock) = engine_at(build_test_realm(), hours(0), [0.5]);

    assert_eq!(
        engine.submit(&Action::truce("w1", "bear", "YES")).unwrap().reply,
        "your choice of yes was recorded"
    );
    engine.submit(&Action::truce("w2", "Mormont", "no")).unwrap();
    engine.submit(&Action::truce("b1", "wolf", "yes")).unwrap();
    let last = engine.submit(&Action::truce("b2", "Stark", "yes")).unwrap();

    assert_eq!(last.outcomes.len(), 1);
    let Outcome::Truce(report) = &last.outcomes[0] else {
        panic!("expected a truce report");
    };
    assert_eq!(report.closed_by, BallotClose::Quorum);
    assert_eq!(report.verdict, TruceVerdict::Agreed);
    assert_eq!(report.pair, pair("wolf", "bear"));

    let at_war = engine
        .read(|store| store.war_exists(&HouseId::new("wolf"), &HouseId::new("bear")))
        .unwrap();
    assert!(!at_war);
    let votes = engine
        .read(|store| store.truce_votes_for_pair(&pair("wolf", "bear")))
        .unwrap();
    assert!(votes.is_empty());
}

#[test]
fn truce_short_of_half_keeps_fighting() {
    let (engine, clock) = engine_at(build_test_realm(), hours(0), [0.5]);
    engine.submit(&Action::truce("w1", "bear", "yes")).unwrap();
    engine.submit(&Action::truce("b1", "wolf", "no")).unwrap();

    clock.set(hours(6));
    let outcome = engine
        .resolve_truce_ballot_if_due(&pair("wolf", "bear"))
        .unwrap()
        .expect("ballot timed out");
    let Outcome::Truce(report) = outcome else {
        panic!("expected a truce report");
    };
    assert_eq!(report.closed_by, BallotClose::Timeout);
    assert_eq!(report.verdict, TruceVerdict::WarContinues);

    let at_war = engine
        .read(|store| store.war_exists(&HouseId::new("wolf"), &HouseId::new("bear")))
        .unwrap();
    assert!(at_war);
}

#[test]
fn truce_vote_rejections() {
    let (engine, _clock) = engine_at(build_test_realm(), hours(0), [0.5]);
    let reply = |action: Action| engine.submit(&action).unwrap().reply;

    assert_eq!(reply(Action::truce("w1", "dragons", "yes")), "dragons is not a house");
    assert_eq!(reply(Action::truce("w1", "wolf", "yes")), "you cannot vote for your own house");
    assert_eq!(reply(Action::truce("w1", "lion", "yes")), "your house is not at war with lion");
    assert_eq!(reply(Action::truce("w1", "bear", "maybe")), "you must vote YES or NO");

    reply(Action::truce("w1", "bear", "no"));
    assert_eq!(
        reply(Action::truce("w1", "bear", "yes")),
        "you have already voted NO to a truce with bear"
    );
}

#[test]
fn joining_a_house_counts_toward_its_quorum() {
    let scenario = build_test_realm().player("recruit", "", 10);
    let (engine, _clock) = engine_at(scenario, hours(0), [0.5]);

    assert_eq!(
        engine.submit(&Action::join("recruit", "lannister")).unwrap().reply,
        "you successfully joined Lannister!"
    );
    assert_eq!(
        engine.submit(&Action::join("recruit", "wolf")).unwrap().reply,
        "you are already part of a house"
    );

    // lion now has two members; one vote is no longer a quorum.
    let first = engine.submit(&Action::war("l1", "bear")).unwrap();
    assert!(first.outcomes.is_empty());
    let second = engine.submit(&Action::war("recruit", "bear")).unwrap();
    assert_eq!(second.outcomes.len(), 1);
}
