// imposter_game — round rules and per-participant session state.
//
// Everything a participant needs to run a round, with no networking. The
// coordinator in `imposter_peer` drives a `Session` from local actions and
// inbound messages; pass-and-play uses the same `Session` directly.
//
// Module overview:
// - `roles.rs`:    `assign_roles` (Fisher–Yates over imposter/civilian
//                  markers) and `deal_players` (per-role secrets).
// - `vote.rs`:     `resolve_vote`: the accused is the sole survivor, the
//                  winner is the accused's opposing side.
// - `state.rs`:    `Session` aggregate and its Setup → Reveal → Playing →
//                  Winner machine, discussion timer, authority marker.
// - `config.rs`:   `SessionConfig`, custom categories, validation limits.
// - `content.rs`:  `ContentProvider` seam with timeout and local fallback.
// - `storage.rs`:  `CategoryStore` for user-authored categories (memory and
//                  JSON file).
//
// Randomness comes from `imposter_prng::GameRng`, passed in explicitly so
// tests can seed it.

pub mod config;
pub mod content;
pub mod roles;
pub mod state;
pub mod storage;
pub mod vote;

pub use config::{CATEGORIES, ConfigError, CustomCategory, CustomItem, SessionConfig};
pub use content::{
    ContentGenerationError, ContentProvider, ContentRequest, OfflineProvider,
    generate_with_fallback,
};
pub use roles::{RoleError, assign_roles, deal_players};
pub use state::{Authority, DiscussionTimer, Mode, Phase, Session, SessionError};
pub use storage::{CategoryStore, JsonFileStore, MemoryCategoryStore, StorageError};
pub use vote::{InvalidVoteTarget, VoteOutcome, resolve_vote};
