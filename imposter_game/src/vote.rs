// Accusation resolution.
//
// A round ends with a single accusation. The accused is set aside as the sole
// survivor for the reveal and every other seat is marked eliminated. Accusing
// an imposter hands the win to the civilians; accusing a civilian hands it to
// the imposters.
//
// Only the accused id travels over the network (VOTE_SYNC). Each participant
// runs `resolve_vote` on its own copy, so the resolution rule lives in one
// place. A stale or duplicate id is reported as `InvalidVoteTarget` and the
// caller treats it as a no-op. Re-applying the same id after a resolution is
// harmless: the accused is still the one live seat and the result is
// identical.

use imposter_protocol::types::{Player, PlayerId, Role};

/// The accused id does not name a live player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no live player with id {0}")]
pub struct InvalidVoteTarget(pub PlayerId);

/// Result of a resolved accusation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub players: Vec<Player>,
    pub winner: Role,
}

pub fn resolve_vote(
    players: &[Player],
    accused: PlayerId,
) -> Result<VoteOutcome, InvalidVoteTarget> {
    let suspect = players
        .iter()
        .find(|p| p.id == accused && !p.is_eliminated)
        .ok_or(InvalidVoteTarget(accused))?;

    let winner = suspect.role.opponent();
    let players = players
        .iter()
        .map(|p| Player {
            is_eliminated: p.id != accused,
            ..p.clone()
        })
        .collect();

    Ok(VoteOutcome { players, winner })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Player> {
        [Role::Civilian, Role::Civilian, Role::Imposter, Role::Civilian]
            .into_iter()
            .enumerate()
            .map(|(i, role)| Player {
                id: PlayerId(i as u32),
                name: format!("P{i}"),
                role,
                secret: String::new(),
                is_eliminated: false,
                peer_address: None,
            })
            .collect()
    }

    fn survivors(players: &[Player]) -> Vec<PlayerId> {
        players
            .iter()
            .filter(|p| !p.is_eliminated)
            .map(|p| p.id)
            .collect()
    }

    #[test]
    fn accusing_imposter_civilians_win() {
        let outcome = resolve_vote(&table(), PlayerId(2)).unwrap();
        assert_eq!(outcome.winner, Role::Civilian);
        assert_eq!(survivors(&outcome.players), vec![PlayerId(2)]);
    }

    #[test]
    fn accusing_civilian_imposters_win() {
        let outcome = resolve_vote(&table(), PlayerId(0)).unwrap();
        assert_eq!(outcome.winner, Role::Imposter);
        assert_eq!(survivors(&outcome.players), vec![PlayerId(0)]);
    }

    #[test]
    fn unknown_id_is_rejected_without_changes() {
        let players = table();
        let before = players.clone();
        assert_eq!(
            resolve_vote(&players, PlayerId(9)),
            Err(InvalidVoteTarget(PlayerId(9)))
        );
        assert_eq!(players, before);
    }

    #[test]
    fn eliminated_target_is_rejected() {
        let first = resolve_vote(&table(), PlayerId(2)).unwrap();
        assert!(resolve_vote(&first.players, PlayerId(1)).is_err());
    }

    #[test]
    fn replaying_same_accusation_is_idempotent() {
        let first = resolve_vote(&table(), PlayerId(2)).unwrap();
        let second = resolve_vote(&first.players, PlayerId(2)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn other_fields_untouched() {
        let players = table();
        let outcome = resolve_vote(&players, PlayerId(3)).unwrap();
        for (before, after) in players.iter().zip(&outcome.players) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.name, after.name);
            assert_eq!(before.role, after.role);
        }
    }
}
