//! Truce ballots between two houses at war. Both houses must separately
//! reach half of their members voting YES for the war to end.

use super::{require_player, settle};
use crate::config::EngineConfig;
use crate::error::{ActionError, Rejection, StoreError};
use crate::id::{HouseId, PlayerId};
use crate::model::{
    BallotClose, HousePair, HouseTally, Intent, Mutation, Outcome, Timestamp, TruceBallotReport,
    TruceChoice, TruceVerdict, TruceVote, Vote, VoteType,
};
use crate::store::EntityStore;

pub fn cast_truce_vote(
    store: &dyn EntityStore,
    config: &EngineConfig,
    actor: &PlayerId,
    target: &str,
    choice: &str,
    now: Timestamp,
) -> Result<Intent, StoreError> {
    settle(try_cast_truce_vote(store, config, actor, target, choice, now))
}

fn try_cast_truce_vote(
    store: &dyn EntityStore,
    config: &EngineConfig,
    actor: &PlayerId,
    target: &str,
    choice: &str,
    now: Timestamp,
) -> Result<Intent, ActionError> {
    let player = require_player(store, actor)?;
    let house = player.house.ok_or(Rejection::NotInHouse)?;
    let target = config
        .registry()
        .resolve(target)
        .cloned()
        .ok_or_else(|| Rejection::UnknownHouse(target.trim().to_string()))?;
    if target == house {
        return Err(Rejection::OwnHouseVote.into());
    }

    let pair = HousePair::of(&house, &target);
    let existing = store
        .votes_by_voter_and_type(actor, VoteType::Truce)?
        .into_iter()
        .find_map(|vote| match vote {
            Vote::Truce(vote) if vote.pair() == pair => Some(vote),
            _ => None,
        });
    if let Some(vote) = existing {
        return Err(Rejection::AlreadyVotedTruce {
            choice: vote.choice,
            house: target,
        }
        .into());
    }
    if !store.war_exists(&house, &target)? {
        return Err(Rejection::NotAtWar(target).into());
    }
    let parsed: TruceChoice = choice.parse()?;

    tracing::debug!(voter = %actor, %pair, choice = %parsed, "truce vote cast");
    Ok(Intent::reply(format!(
        "your choice of {} was recorded",
        parsed.as_str()
    ))
    .with(Mutation::InsertTruceVote {
        vote: TruceVote {
            voter: actor.clone(),
            house,
            target,
            choice: parsed,
            cast_at: now,
        },
    }))
}

/// Whether the truce ballot of `pair` should close now, and why.
///
/// Quorum means every current member of both houses has voted on this pair.
pub fn truce_ballot_due(
    store: &dyn EntityStore,
    config: &EngineConfig,
    pair: &HousePair,
    now: Timestamp,
) -> Result<Option<BallotClose>, StoreError> {
    let votes = store.truce_votes_for_pair(pair)?;
    let Some(opened) = votes.iter().map(|v| v.cast_at).min() else {
        return Ok(None);
    };
    let mut members = store.house_members(pair.first())?;
    members.extend(store.house_members(pair.second())?);
    let all_voted = members
        .iter()
        .all(|m| votes.iter().any(|v| v.voter == m.id));
    if all_voted {
        Ok(Some(BallotClose::Quorum))
    } else if now >= opened.plus_hours(config.ballot_duration_hours) {
        Ok(Some(BallotClose::Timeout))
    } else {
        Ok(None)
    }
}

/// Tally and close the truce ballot of `pair` if it is due. The pair's votes
/// are cleared whatever the verdict.
pub fn resolve_truce_ballot(
    store: &dyn EntityStore,
    config: &EngineConfig,
    pair: &HousePair,
    now: Timestamp,
) -> Result<Intent, StoreError> {
    settle(try_resolve_truce_ballot(store, config, pair, now))
}

fn try_resolve_truce_ballot(
    store: &dyn EntityStore,
    config: &EngineConfig,
    pair: &HousePair,
    now: Timestamp,
) -> Result<Intent, ActionError> {
    let votes = store.truce_votes_for_pair(pair)?;
    if votes.is_empty() {
        return Err(Rejection::NoOpenBallot(pair.to_string()).into());
    }
    let closed_by = truce_ballot_due(store, config, pair, now)?
        .ok_or_else(|| Rejection::BallotStillOpen(pair.to_string()))?;

    let houses = vec![
        house_tally(store, pair.first(), &votes)?,
        house_tally(store, pair.second(), &votes)?,
    ];

    let mut intent =
        Intent::reply(String::new()).with(Mutation::RemoveTruceVotes { pair: pair.clone() });
    let verdict = if !store.war_exists(pair.first(), pair.second())? {
        TruceVerdict::NoWar
    } else if houses.iter().all(HouseTally::agrees) {
        intent.push(Mutation::RemoveWar { pair: pair.clone() });
        TruceVerdict::Agreed
    } else {
        TruceVerdict::WarContinues
    };

    let report = TruceBallotReport {
        pair: pair.clone(),
        closed_by,
        houses,
        verdict,
    };
    tracing::info!(%pair, ?closed_by, ?verdict, "truce ballot closed");
    intent.reply = report.to_string();
    Ok(intent.with_outcome(Outcome::Truce(report)))
}

/// Votes of the house's current members only; members who did not vote
/// still count towards `eligible`.
fn house_tally(
    store: &dyn EntityStore,
    house: &HouseId,
    votes: &[TruceVote],
) -> Result<HouseTally, StoreError> {
    let members = store.house_members(house)?;
    let count = |choice: TruceChoice| {
        votes
            .iter()
            .filter(|v| v.choice == choice && members.iter().any(|m| m.id == v.voter))
            .count()
    };
    Ok(HouseTally {
        house: house.clone(),
        yes: count(TruceChoice::Yes),
        no: count(TruceChoice::No),
        eligible: members.len(),
    })
}
