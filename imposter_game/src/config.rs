// Round settings captured when a round starts.
//
// `SessionConfig` is what the setup screen produces and what "play again"
// reuses. It is validated before any randomness is consumed so a bad config
// never leaves the session half-dealt.

use std::time::Duration;

use imposter_protocol::types::{Difficulty, Player, Role};
use serde::{Deserialize, Serialize};

/// Built-in category names offered by the setup screen.
pub const CATEGORIES: &[&str] = &[
    "Christmas",
    "Bible",
    "Animals & Nature",
    "Anime",
    "Famous People",
    "Food & Drink",
    "Brands",
    "Fashion & Clothes",
    "Film & TV",
    "Games",
    "Music",
    "Sports",
    "World & Flags",
    "Transport",
    "Easter",
    "Pop Culture",
    "Silly & Random",
];

pub const DEFAULT_CATEGORY: &str = "Silly & Random";

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 12;

pub const MIN_DISCUSSION_SECS: u32 = 180;
pub const MAX_DISCUSSION_SECS: u32 = 3600;

/// One user-authored word/hint pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomItem {
    pub word: String,
    pub hint: String,
}

/// A user-authored category, persisted by a `CategoryStore`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCategory {
    pub id: String,
    pub name: String,
    pub items: Vec<CustomItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("need between 3 and 12 players, got {0}")]
    PlayerCount(usize),
    #[error("{imposters} imposters is not allowed with {players} players")]
    ImposterCount { imposters: usize, players: usize },
    #[error("discussion must last 180 to 3600 seconds, got {0}")]
    Duration(u32),
}

/// Settings for one round, kept for "play again with same settings".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub player_names: Vec<String>,
    pub num_imposters: usize,
    pub category: String,
    pub discussion_duration_secs: u32,
    pub difficulty: Difficulty,
    pub custom_category: Option<CustomCategory>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            player_names: vec![String::new(); 4],
            num_imposters: 1,
            category: DEFAULT_CATEGORY.into(),
            discussion_duration_secs: MIN_DISCUSSION_SECS,
            difficulty: Difficulty::Average,
            custom_category: None,
        }
    }
}

/// Largest imposter count the setup screen allows for `players` seats.
pub fn max_imposters(players: usize) -> usize {
    (players / 2).max(1)
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let players = self.player_names.len();
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
            return Err(ConfigError::PlayerCount(players));
        }
        let imposters = self.num_imposters;
        if imposters == 0 || imposters >= players || imposters > max_imposters(players) {
            return Err(ConfigError::ImposterCount { imposters, players });
        }
        if !(MIN_DISCUSSION_SECS..=MAX_DISCUSSION_SECS).contains(&self.discussion_duration_secs) {
            return Err(ConfigError::Duration(self.discussion_duration_secs));
        }
        Ok(())
    }

    /// Trimmed display names; blanks become `Player N` (1-based).
    pub fn resolved_names(&self) -> Vec<String> {
        self.player_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    format!("Player {}", i + 1)
                } else {
                    trimmed.to_string()
                }
            })
            .collect()
    }

    pub fn discussion_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.discussion_duration_secs))
    }

    /// Items of the attached custom category, if it has any.
    pub fn custom_items(&self) -> Option<&[CustomItem]> {
        self.custom_category
            .as_ref()
            .map(|c| c.items.as_slice())
            .filter(|items| !items.is_empty())
    }

    /// Attach the stored custom category whose name matches `category`.
    pub fn with_custom_from(mut self, stored: &[CustomCategory]) -> Self {
        self.custom_category = stored.iter().find(|c| c.name == self.category).cloned();
        self
    }

    /// Best-effort reconstruction on a joiner from a received round. The
    /// difficulty is not on the wire, so it stays at the default.
    pub fn from_received(players: &[Player], duration: u32, category: &str) -> Self {
        Self {
            player_names: players.iter().map(|p| p.name.clone()).collect(),
            num_imposters: players.iter().filter(|p| p.role == Role::Imposter).count(),
            category: category.to_string(),
            discussion_duration_secs: duration,
            difficulty: Difficulty::Average,
            custom_category: None,
        }
    }
}
