// Role assignment and dealing.
//
// `assign_roles` is the whole engine: build `num_imposters` imposter markers
// followed by civilian markers, then Fisher–Yates shuffle them. Every call
// consumes fresh randomness from the supplied `GameRng`, so two rounds with
// the same inputs are independent permutations.
//
// `deal_players` turns the shuffled roles into seats. Secrets are per-role,
// not per-player: every civilian sees the same word, every imposter the same
// hint.

use imposter_prng::GameRng;
use imposter_protocol::types::{Player, PlayerId, Role, RoundContent};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    #[error("{imposters} imposters cannot be dealt among {players} players")]
    InvalidImposterCount { players: usize, imposters: usize },
}

/// Return `player_count` roles, exactly `num_imposters` of them imposters, in
/// uniformly random order. Requires `1 <= num_imposters < player_count`.
pub fn assign_roles(
    rng: &mut GameRng,
    player_count: usize,
    num_imposters: usize,
) -> Result<Vec<Role>, RoleError> {
    if num_imposters == 0 || num_imposters >= player_count {
        return Err(RoleError::InvalidImposterCount {
            players: player_count,
            imposters: num_imposters,
        });
    }
    let mut roles = vec![Role::Imposter; num_imposters];
    roles.resize(player_count, Role::Civilian);
    rng.shuffle(&mut roles);
    Ok(roles)
}

/// Seat one player per name. Ids follow seating order starting at 0.
///
/// `addresses`, when given, stamps each seat with the network address of the
/// participant who will view it; it must be the same length as `names`.
pub fn deal_players(
    names: &[String],
    roles: &[Role],
    content: &RoundContent,
    addresses: Option<&[String]>,
) -> Vec<Player> {
    names
        .iter()
        .zip(roles)
        .enumerate()
        .map(|(i, (name, &role))| Player {
            id: PlayerId(i as u32),
            name: name.clone(),
            role,
            secret: content.secret_for(role).to_string(),
            is_eliminated: false,
            peer_address: addresses.and_then(|a| a.get(i).cloned()),
        })
        .collect()
}
