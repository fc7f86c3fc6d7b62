// Round content: the secret word and the imposter's hint.
//
// Content comes from an external generator behind the `ContentProvider`
// trait. Only the host calls it, once per round, and the result is shipped to
// joiners verbatim inside START_GAME.
//
// Provider failure is never surfaced as an error. `generate_with_fallback`
// runs the provider on a worker thread with a deadline; on error, timeout, or
// malformed output it logs a warning and picks from a fallback instead:
// - a random item from the custom category's list, if one was supplied;
// - otherwise a random entry of the built-in table for the category, using the
//   "Silly & Random" entries when the category has none.
//
// A provider call that outlives the deadline is abandoned, not cancelled: its
// thread runs to completion and the late result is dropped.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use imposter_prng::GameRng;
use imposter_protocol::types::{Difficulty, RoundContent};
use tracing::warn;

use crate::config::{CustomItem, DEFAULT_CATEGORY};

/// Default deadline for one provider call.
pub const DEFAULT_CONTENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Built-in fallback entries: (category, [(word, hint)]).
const FALLBACKS: &[(&str, &[(&str, &str)])] = &[
    (
        "Bible",
        &[(
            "Manna",
            "The edible substance provided during the desert travel",
        )],
    ),
    (
        "Silly & Random",
        &[("Slinky", "A spring that walks down stairs")],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentGenerationError {
    #[error("content provider unavailable")]
    Unavailable,
    #[error("content provider failed: {0}")]
    Provider(String),
    #[error("content provider returned an empty word or hint")]
    Malformed,
    #[error("content provider did not answer within {0:?}")]
    TimedOut(Duration),
}

/// What the host asks the provider for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRequest {
    pub category: String,
    pub difficulty: Difficulty,
    pub custom_items: Option<Vec<CustomItem>>,
}

/// External word/hint generator.
pub trait ContentProvider: Send + Sync {
    fn generate(&self, request: &ContentRequest) -> Result<RoundContent, ContentGenerationError>;
}

/// A provider with no backend. Every round uses the fallback path.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineProvider;

impl ContentProvider for OfflineProvider {
    fn generate(&self, _request: &ContentRequest) -> Result<RoundContent, ContentGenerationError> {
        Err(ContentGenerationError::Unavailable)
    }
}

/// Ask `provider` for content, falling back locally on any failure.
pub fn generate_with_fallback(
    provider: &Arc<dyn ContentProvider>,
    request: &ContentRequest,
    timeout: Duration,
    rng: &mut GameRng,
) -> RoundContent {
    match call_with_deadline(provider, request, timeout) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                category = %request.category,
                error = %e,
                "content generation failed, using fallback"
            );
            fallback_content(&request.category, request.custom_items.as_deref(), rng)
        }
    }
}

fn call_with_deadline(
    provider: &Arc<dyn ContentProvider>,
    request: &ContentRequest,
    timeout: Duration,
) -> Result<RoundContent, ContentGenerationError> {
    let (tx, rx) = mpsc::channel();
    let provider = Arc::clone(provider);
    let request = request.clone();
    thread::spawn(move || {
        let _ = tx.send(provider.generate(&request));
    });

    let content = match rx.recv_timeout(timeout) {
        Ok(result) => result?,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            return Err(ContentGenerationError::TimedOut(timeout));
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            return Err(ContentGenerationError::Provider("provider thread panicked".into()));
        }
    };
    if content.is_well_formed() {
        Ok(content)
    } else {
        Err(ContentGenerationError::Malformed)
    }
}

/// Pick fallback content for `category`, preferring supplied custom items.
pub fn fallback_content(
    category: &str,
    custom_items: Option<&[CustomItem]>,
    rng: &mut GameRng,
) -> RoundContent {
    if let Some(item) = custom_items.and_then(|items| rng.choose(items)) {
        return RoundContent::new(item.word.clone(), item.hint.clone());
    }
    let entries = builtin_entries(category)
        .or_else(|| builtin_entries(DEFAULT_CATEGORY))
        .unwrap_or_default();
    match rng.choose(entries) {
        Some((word, hint)) => RoundContent::new(*word, *hint),
        None => RoundContent::new("Slinky", "A spring that walks down stairs"),
    }
}

fn builtin_entries(category: &str) -> Option<&'static [(&'static str, &'static str)]> {
    FALLBACKS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, entries)| *entries)
}
