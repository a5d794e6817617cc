//! House war ballots: one vote per member, plurality wins, ties keep the
//! peace.

use std::collections::BTreeMap;

use super::{require_player, settle};
use crate::config::{AtWarVotePolicy, EngineConfig};
use crate::error::{ActionError, Rejection, StoreError};
use crate::id::{HouseId, PlayerId};
use crate::model::{
    BallotClose, ChoiceCount, HousePair, Intent, Mutation, Outcome, Timestamp, Vote, VoteType,
    WarBallotReport, WarChoice, WarVerdict, WarVote,
};
use crate::store::EntityStore;

pub fn cast_war_vote(
    store: &dyn EntityStore,
    config: &EngineConfig,
    actor: &PlayerId,
    choice: &str,
    now: Timestamp,
) -> Result<Intent, StoreError> {
    settle(try_cast_war_vote(store, config, actor, choice, now))
}

fn try_cast_war_vote(
    store: &dyn EntityStore,
    config: &EngineConfig,
    actor: &PlayerId,
    choice: &str,
    now: Timestamp,
) -> Result<Intent, ActionError> {
    let player = require_player(store, actor)?;
    let existing = store.votes_by_voter_and_type(actor, VoteType::War)?;
    if let Some(Vote::War(vote)) = existing.into_iter().next() {
        return Err(Rejection::AlreadyVotedWar(vote.choice).into());
    }
    let house = player.house.ok_or(Rejection::NotInHouse)?;

    let choice = parse_choice(config, choice)?;
    if let WarChoice::House(target) = &choice {
        if *target == house {
            return Err(Rejection::OwnHouseVote.into());
        }
        if config.at_war_vote_policy == AtWarVotePolicy::Reject
            && store.war_exists(&house, target)?
        {
            return Err(Rejection::AlreadyAtWar(target.clone()).into());
        }
    }

    tracing::debug!(voter = %actor, house = %house, choice = %choice, "war vote cast");
    Ok(
        Intent::reply(format!("your choice of {choice} was recorded")).with(
            Mutation::InsertWarVote {
                vote: WarVote {
                    voter: actor.clone(),
                    house,
                    choice,
                    cast_at: now,
                },
            },
        ),
    )
}

fn parse_choice(config: &EngineConfig, raw: &str) -> Result<WarChoice, Rejection> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(WarChoice::Peace.key()) {
        return Ok(WarChoice::Peace);
    }
    config
        .registry()
        .resolve(raw)
        .map(|house| WarChoice::House(house.clone()))
        .ok_or(Rejection::UnknownWarChoice)
}

/// Whether the war ballot of `house` should close now, and why.
///
/// A house with no outstanding votes has no ballot. Otherwise the ballot
/// closes once every current member voted, or once the voting window has
/// passed since the earliest vote.
pub fn war_ballot_due(
    store: &dyn EntityStore,
    config: &EngineConfig,
    house: &HouseId,
    now: Timestamp,
) -> Result<Option<BallotClose>, StoreError> {
    let votes = store.war_votes_for_house(house)?;
    let Some(opened) = votes.iter().map(|v| v.cast_at).min() else {
        return Ok(None);
    };
    let members = store.house_members(house)?;
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

/// Tally and close the war ballot of `house` if it is due.
pub fn resolve_war_ballot(
    store: &dyn EntityStore,
    config: &EngineConfig,
    house: &HouseId,
    now: Timestamp,
) -> Result<Intent, StoreError> {
    settle(try_resolve_war_ballot(store, config, house, now))
}

fn try_resolve_war_ballot(
    store: &dyn EntityStore,
    config: &EngineConfig,
    house: &HouseId,
    now: Timestamp,
) -> Result<Intent, ActionError> {
    let votes = store.war_votes_for_house(house)?;
    if votes.is_empty() {
        return Err(Rejection::NoOpenBallot(house.to_string()).into());
    }
    let closed_by = war_ballot_due(store, config, house, now)?
        .ok_or_else(|| Rejection::BallotStillOpen(house.to_string()))?;
    let eligible = store.house_members(house)?.len();

    let tally = tally(&votes);
    let verdict = match plurality(&tally) {
        Some(WarChoice::House(target)) if store.war_exists(house, &target)? => {
            WarVerdict::AlreadyAtWar(target)
        }
        Some(WarChoice::House(target)) => WarVerdict::WarDeclared(target),
        Some(WarChoice::Peace) | None => WarVerdict::Peace,
    };

    let mut intent = Intent::reply(String::new()).with(Mutation::RemoveWarVotes {
        house: house.clone(),
        voters: votes.iter().map(|v| v.voter.clone()).collect(),
    });

    if let WarVerdict::WarDeclared(target) = &verdict {
        intent.push(Mutation::InsertWar {
            pair: HousePair::of(house, target),
        });
        // Votes of the target's members against this house are moot now.
        let against_us = WarChoice::House(house.clone());
        let moot: Vec<PlayerId> = store
            .war_votes_for_house(target)?
            .into_iter()
            .filter(|v| v.choice == against_us)
            .map(|v| v.voter)
            .collect();
        if !moot.is_empty() {
            intent.push(Mutation::RemoveWarVotes {
                house: target.clone(),
                voters: moot,
            });
        }
    }

    let report = WarBallotReport {
        house: house.clone(),
        closed_by,
        eligible,
        tally,
        verdict,
    };
    tracing::info!(house = %house, ?closed_by, verdict = ?report.verdict, "war ballot closed");
    intent.reply = report.to_string();
    Ok(intent.with_outcome(Outcome::War(report)))
}

/// Counts per choice, most votes first.
fn tally(votes: &[WarVote]) -> Vec<ChoiceCount> {
    let mut counts: BTreeMap<&WarChoice, usize> = BTreeMap::new();
    for vote in votes {
        *counts.entry(&vote.choice).or_insert(0) += 1;
    }
    let mut tally: Vec<ChoiceCount> = counts
        .into_iter()
        .map(|(choice, votes)| ChoiceCount {
            choice: choice.clone(),
            votes,
        })
        .collect();
    tally.sort_by(|a, b| b.votes.cmp(&a.votes));
    tally
}

/// The single leading choice, or `None` when the lead is shared.
fn plurality(tally: &[ChoiceCount]) -> Option<WarChoice> {
    match tally {
        [first, second, ..] if first.votes == second.votes => None,
        [first, ..] => Some(first.choice.clone()),
        [] => None,
    }
}
