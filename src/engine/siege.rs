use std::collections::BTreeMap;

use super::apportion::apportion;
use super::random::RandomSource;
use super::settle;
use crate::config::EngineConfig;
use crate::error::{ActionError, Rejection, StoreError};
use crate::id::{PlayerId, TileId};
use crate::model::timestamp::format_remaining;
use crate::model::{
    Intent, Mutation, Outcome, PlayerShare, Pledge, Side, SiegeReport, SiegeVerdict, Timestamp,
};
use crate::store::EntityStore;

struct Commitment {
    pledge: Pledge,
    effective: u64,
}

/// Resolve the active siege on `tile`.
///
/// Runs at or after expiry, never before. The siege and its pledges are
/// removed whatever the result; an empty siege closes without a contest.
pub fn resolve_siege(
    store: &dyn EntityStore,
    config: &EngineConfig,
    tile: &TileId,
    now: Timestamp,
    rng: &mut dyn RandomSource,
) -> Result<Intent, StoreError> {
    settle(try_resolve_siege(store, config, tile, now, rng))
}

fn try_resolve_siege(
    store: &dyn EntityStore,
    config: &EngineConfig,
    tile: &TileId,
    now: Timestamp,
    rng: &mut dyn RandomSource,
) -> Result<Intent, ActionError> {
    let siege = store
        .active_siege(tile)?
        .ok_or_else(|| Rejection::NoActiveSiege(tile.clone()))?;
    if !siege.is_expired(now) {
        return Err(Rejection::SiegeNotExpired {
            tile: tile.clone(),
            remaining: format_remaining(now.millis_until(siege.expires_at)),
        }
        .into());
    }

    let mut pledges = store.pledges_for_siege(siege.id)?;
    pledges.sort_by_key(|p| (p.pledged_at, p.id));

    // Current troops per player; a pledge never counts for more than its
    // player still has.
    let mut current: BTreeMap<PlayerId, u64> = BTreeMap::new();
    for pledge in &pledges {
        if !current.contains_key(&pledge.player) {
            let troops = store.player(&pledge.player)?.map_or(0, |p| p.troops);
            current.insert(pledge.player.clone(), troops);
        }
    }
    let commitments: Vec<Commitment> = pledges
        .into_iter()
        .map(|pledge| {
            let available = current.get(&pledge.player).copied().unwrap_or(0);
            let effective = pledge.troops.min(available);
            Commitment { pledge, effective }
        })
        .collect();

    let side_total = |side: Side| -> u64 {
        commitments
            .iter()
            .filter(|c| c.pledge.side == side)
            .map(|c| c.effective)
            .sum()
    };
    let attack_total = side_total(Side::Attack);
    let defend_total = side_total(Side::Defend);
    let pledge_count = commitments.len();
    let defender = store.tile_owner(tile)?;

    let mut intent = Intent::reply(String::new())
        .with(Mutation::RemovePledges {
            siege: siege.id,
            tile: tile.clone(),
        })
        .with(Mutation::RemoveSiege {
            siege: siege.id,
            tile: tile.clone(),
        });

    if attack_total + defend_total == 0 {
        let report = SiegeReport {
            siege: siege.id,
            tile: tile.clone(),
            attacker: siege.attacker,
            defender,
            verdict: SiegeVerdict::Uncontested,
            attack_total,
            defend_total,
            pledge_count,
            troops_lost: 0,
            losses: Vec::new(),
            money_pot: 0,
            money_shares: Vec::new(),
            troop_pot: 0,
            troop_shares: Vec::new(),
        };
        tracing::info!(tile = %tile, siege = %siege.id, "siege closed uncontested");
        intent.reply = report.to_string();
        return Ok(intent.with_outcome(Outcome::Siege(report)));
    }

    let r = rng.next_unit();
    let attacker_won = r < attack_total as f64 / (attack_total + defend_total) as f64;
    let (winning_side, winning_total, losing_total) = if attacker_won {
        (Side::Attack, attack_total, defend_total)
    } else {
        (Side::Defend, defend_total, attack_total)
    };

    let fraction = rng.uniform(config.loss_fraction_min, config.loss_fraction_max);
    let troops_lost = if losing_total == 0 {
        0
    } else {
        (winning_total as f64 * fraction).floor() as u64
    };
    let money_pot = config.money_pot_per_pledge * pledge_count as u64;
    let troop_pot = if losing_total == 0 {
        0
    } else {
        config.troop_pot_per_pledge * pledge_count as u64
    };

    let (winners, losers): (Vec<&Commitment>, Vec<&Commitment>) = commitments
        .iter()
        .partition(|c| c.pledge.side == winning_side);
    let losses = split(&losers, troops_lost);
    let money_shares = split(&winners, money_pot);
    let troop_shares = split(&losers, troop_pot);

    for (player, troops) in &current {
        let lost = losses.get(player).copied().unwrap_or(0);
        let gained = troop_shares.get(player).copied().unwrap_or(0);
        let money = money_shares.get(player).copied().unwrap_or(0);
        let after = troops.saturating_sub(lost) + gained;
        let troop_delta = signed(after) - signed(*troops);
        if troop_delta != 0 || money != 0 {
            intent.push(Mutation::AdjustPlayer {
                player: player.clone(),
                troops: troop_delta,
                money: signed(money),
            });
        }
    }

    if attacker_won {
        intent.push(Mutation::SetTileOwner {
            tile: tile.clone(),
            owner: Some(siege.attacker.clone()),
        });
    }

    let report = SiegeReport {
        siege: siege.id,
        tile: tile.clone(),
        attacker: siege.attacker,
        defender,
        verdict: if attacker_won {
            SiegeVerdict::AttackerWon
        } else {
            SiegeVerdict::DefenderHeld
        },
        attack_total,
        defend_total,
        pledge_count,
        troops_lost,
        losses: shares(losses),
        money_pot,
        money_shares: shares(money_shares),
        troop_pot,
        troop_shares: shares(troop_shares),
    };
    tracing::info!(
        tile = %tile,
        siege = %siege.id,
        attack_total,
        defend_total,
        attacker_won,
        troops_lost,
        "siege resolved"
    );
    intent.reply = report.to_string();
    Ok(intent.with_outcome(Outcome::Siege(report)))
}

/// Apportion `total` over the pledgers of one side.
///
/// Each player weighs the sum of their effective troops on that side.
/// `group` is in pledge order, so players are ranked by their first pledge
/// and remainder ties go to the earliest pledger.
fn split(group: &[&Commitment], total: u64) -> BTreeMap<PlayerId, u64> {
    let mut pledgers: Vec<(&PlayerId, u64)> = Vec::new();
    for commitment in group {
        let player = &commitment.pledge.player;
        match pledgers.iter_mut().find(|(p, _)| *p == player) {
            Some((_, weight)) => *weight += commitment.effective,
            None => pledgers.push((player, commitment.effective)),
        }
    }
    let weights: Vec<u64> = pledgers.iter().map(|&(_, w)| w).collect();
    pledgers
        .into_iter()
        .zip(apportion(total, &weights))
        .map(|((player, _), amount)| (player.clone(), amount))
        .collect()
}

fn shares(totals: BTreeMap<PlayerId, u64>) -> Vec<PlayerShare> {
    totals
        .into_iter()
        .filter(|&(_, amount)| amount > 0)
        .map(|(player, amount)| PlayerShare { player, amount })
        .collect()
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::random::ScriptedRandom;
    use crate::id::HouseId;
    use crate::scenario::Scenario;

    fn start() -> Timestamp {
        Timestamp::from_hours(10)
    }

    fn expired() -> Timestamp {
        start().plus_hours(6)
    }

    fn contested() -> Scenario {
        Scenario::new()
            .house("h1")
            .house("h2")
            .player("p1", "h1", 500)
            .player("p2", "h2", 300)
            .tile("a10", Some("h2"))
            .war("h1", "h2")
            .siege("a10", "h1", start())
            .pledge("a10", "p1", 500, Side::Attack, start().plus_millis(1))
            .pledge("a10", "p2", 300, Side::Defend, start().plus_millis(2))
    }

    fn resolve(s: &Scenario, draws: &[f64], now: Timestamp) -> Intent {
        let store = s.store();
        let mut rng = ScriptedRandom::new(draws.iter().copied());
        resolve_siege(&store, s.config(), &TileId::new("a10"), now, &mut rng).unwrap()
    }

    fn report(intent: &Intent) -> &SiegeReport {
        match &intent.outcome {
            Some(Outcome::Siege(report)) => report,
            other => panic!("expected a siege report, got {other:?}"),
        }
    }

    #[test]
    fn attacker_wins_worked_example() {
        let s = contested();
        let intent = resolve(&s, &[0.5, 0.5], expired());
        let report = report(&intent);

        assert_eq!(report.verdict, SiegeVerdict::AttackerWon);
        assert_eq!((report.attack_total, report.defend_total), (500, 300));
        assert_eq!(report.troops_lost, 100);
        assert_eq!(report.money_pot, 12_000);
        assert_eq!(report.troop_pot, 40);
        assert_eq!(
            report.money_shares,
            vec![PlayerShare {
                player: "p1".into(),
                amount: 12_000
            }]
        );

        assert!(intent.mutations.contains(&Mutation::AdjustPlayer {
            player: "p1".into(),
            troops: 0,
            money: 12_000,
        }));
        assert!(intent.mutations.contains(&Mutation::AdjustPlayer {
            player: "p2".into(),
            troops: -60,
            money: 0,
        }));
        assert!(intent.mutations.contains(&Mutation::SetTileOwner {
            tile: TileId::new("a10"),
            owner: Some(HouseId::new("h1")),
        }));
    }

    #[test]
    fn defender_holds_when_draw_is_high() {
        let s = contested();
        // 0.7 >= 500/800
        let intent = resolve(&s, &[0.7, 0.0], expired());
        let report = report(&intent);

        assert_eq!(report.verdict, SiegeVerdict::DefenderHeld);
        // floor(300 * 0.10)
        assert_eq!(report.troops_lost, 30);
        assert!(
            !intent
                .mutations
                .iter()
                .any(|m| matches!(m, Mutation::SetTileOwner { .. }))
        );
        assert!(intent.mutations.contains(&Mutation::AdjustPlayer {
            player: "p1".into(),
            troops: -30 + 40,
            money: 0,
        }));
        assert!(intent.mutations.contains(&Mutation::AdjustPlayer {
            player: "p2".into(),
            troops: 0,
            money: 12_000,
        }));
    }

    #[test]
    fn not_before_expiry() {
        let s = contested();
        let just_before = Timestamp::from_millis(expired().as_millis() - 1);
        let intent = resolve(&s, &[0.5], just_before);
        assert!(intent.is_noop());
        assert!(intent.reply.starts_with("the siege on A10 ends in"));
    }

    #[test]
    fn resolves_exactly_at_expiry() {
        let intent = resolve(&contested(), &[0.5, 0.5], expired());
        assert!(!intent.is_noop());
    }

    #[test]
    fn empty_siege_closes_quietly() {
        let s = Scenario::new()
            .house("h1")
            .house("h2")
            .player("p1", "h1", 10)
            .tile("a10", Some("h2"))
            .war("h1", "h2")
            .siege("a10", "h1", start());
        let intent = resolve(&s, &[0.0], expired());

        assert_eq!(report(&intent).verdict, SiegeVerdict::Uncontested);
        assert_eq!(intent.mutations.len(), 2);
        assert!(
            intent
                .mutations
                .iter()
                .all(|m| matches!(m, Mutation::RemovePledges { .. } | Mutation::RemoveSiege { .. }))
        );
    }

    #[test]
    fn effective_troops_capped_by_current_troops() {
        // p1 pledged 500 but has only 200 left.
        let s = Scenario::new()
            .house("h1")
            .house("h2")
            .player("p1", "h1", 200)
            .player("p2", "h2", 300)
            .tile("a10", Some("h2"))
            .war("h1", "h2")
            .siege("a10", "h1", start())
            .pledge("a10", "p1", 500, Side::Attack, start().plus_millis(1))
            .pledge("a10", "p2", 300, Side::Defend, start().plus_millis(2));
        let intent = resolve(&s, &[0.99, 0.0], expired());
        assert_eq!(report(&intent).attack_total, 200);
    }

    #[test]
    fn unopposed_attack_distributes_no_troop_pot() {
        let s = Scenario::new()
            .house("h1")
            .house("h2")
            .player("p1", "h1", 100)
            .tile("a10", Some("h2"))
            .war("h1", "h2")
            .siege("a10", "h1", start())
            .pledge("a10", "p1", 100, Side::Attack, start().plus_millis(1));
        let intent = resolve(&s, &[0.0, 0.5], expired());
        let report = report(&intent);

        assert!(report.attacker_won());
        assert_eq!(report.troops_lost, 0);
        assert_eq!(report.troop_pot, 0);
        assert_eq!(report.money_pot, 6_000);
    }

    #[test]
    fn loss_remainder_goes_to_largest_then_earliest() {
        let s = Scenario::new()
            .house("h1")
            .house("h2")
            .player("a", "h1", 1_000)
            .player("x", "h2", 100)
            .player("y", "h2", 100)
            .player("z", "h2", 100)
            .tile("a10", Some("h2"))
            .war("h1", "h2")
            .siege("a10", "h1", start())
            .pledge("a10", "a", 1_000, Side::Attack, start().plus_millis(1))
            .pledge("a10", "y", 100, Side::Defend, start().plus_millis(2))
            .pledge("a10", "z", 100, Side::Defend, start().plus_millis(3))
            .pledge("a10", "x", 100, Side::Defend, start().plus_millis(4));
        // L = floor(1000 * 0.10) = 100 over 100/100/100: 33 each, remainder 1
        // to the earliest pledge, which is y's.
        let intent = resolve(&s, &[0.0, 0.0], expired());
        let losses = &report(&intent).losses;
        let loss_of = |p: &str| {
            losses
                .iter()
                .find(|s| s.player.as_str() == p)
                .map(|s| s.amount)
        };
        assert_eq!(loss_of("y"), Some(34));
        assert_eq!(loss_of("z"), Some(33));
        assert_eq!(loss_of("x"), Some(33));
    }

    #[test]
    fn split_pledges_weigh_as_one_pledger() {
        // x pledges 1 + 1 around y's 2, so both defenders weigh 2.
        let s = Scenario::new()
            .house("h1")
            .house("h2")
            .player("a", "h1", 100)
            .player("x", "h2", 10)
            .player("y", "h2", 10)
            .tile("a10", Some("h2"))
            .war("h1", "h2")
            .siege("a10", "h1", start())
            .pledge("a10", "a", 30, Side::Attack, start().plus_millis(1))
            .pledge("a10", "x", 1, Side::Defend, start().plus_millis(2))
            .pledge("a10", "y", 2, Side::Defend, start().plus_millis(3))
            .pledge("a10", "x", 1, Side::Defend, start().plus_millis(4));
        // L = floor(30 * 0.10) = 3: one each, remainder to x, who pledged first.
        let intent = resolve(&s, &[0.0, 0.0], expired());
        let report = report(&intent);

        assert!(report.attacker_won());
        assert_eq!(report.troops_lost, 3);
        assert_eq!(
            report.losses,
            vec![
                PlayerShare {
                    player: "x".into(),
                    amount: 2
                },
                PlayerShare {
                    player: "y".into(),
                    amount: 1
                },
            ]
        );
        // 20 troops per pledge record, split 2:2 between the pledgers.
        assert_eq!(report.troop_pot, 80);
        assert_eq!(
            report.troop_shares,
            vec![
                PlayerShare {
                    player: "x".into(),
                    amount: 40
                },
                PlayerShare {
                    player: "y".into(),
                    amount: 40
                },
            ]
        );
        assert!(intent.mutations.contains(&Mutation::AdjustPlayer {
            player: "x".into(),
            troops: 38,
            money: 0,
        }));
    }
}
