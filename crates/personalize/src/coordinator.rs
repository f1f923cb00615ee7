use std::collections::HashSet;

use realtime::{Config, HttpRequest};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{Language, PreferenceStore, Suggestion, api};

/// Surfaces short confirmations to the user.
pub trait Notifier: Send + Sync {
    /// Show `message`. When `speak` is set the message should also be read
    /// aloud.
    fn confirm(&self, message: &str, speak: bool);
}

/// Confirmation shown after a suggestion is applied.
#[must_use]
pub fn confirmation(suggestion: &Suggestion, language: Language) -> String {
    format!("✓ {} — applied", suggestion.title.get(language))
}

/// Applies suggestions: optimistically locally, then best-effort remotely.
#[derive(Debug)]
pub struct ApplySuggestion<P, N> {
    provider: P,
    notifier: N,
    applied: HashSet<String>,
}

impl<P, N> ApplySuggestion<P, N>
where
    P: Config + HttpRequest + Clone + 'static,
    N: Notifier,
{
    pub fn new(provider: P, notifier: N) -> Self {
        Self { provider, notifier, applied: HashSet::new() }
    }

    /// Apply the suggestion's weight deltas to `store`, mark it applied and
    /// confirm to the user, then send the apply request in the background.
    ///
    /// The deltas are added again on every call, even for a suggestion that
    /// is already marked applied. A failed remote request is logged and
    /// leaves the local change in place.
    pub fn apply(&mut self, store: &mut PreferenceStore, suggestion: &Suggestion) -> JoinHandle<()> {
        store.apply_deltas(suggestion);
        self.applied.insert(suggestion.id.clone());

        let preferences = store.preferences();
        self.notifier.confirm(&confirmation(suggestion, preferences.language), preferences.voice_assist);
        info!(monotonic_counter.suggestions_applied = 1, suggestion_id = %suggestion.id);

        let provider = self.provider.clone();
        let suggestion_id = suggestion.id.clone();
        tokio::spawn(async move {
            if let Err(e) = api::apply_suggestion(&provider, &suggestion_id).await {
                debug!(monotonic_counter.suggestion_apply_failures = 1, error = %e, %suggestion_id, "remote apply failed");
            }
        })
    }

    #[must_use]
    pub fn is_applied(&self, suggestion_id: &str) -> bool {
        self.applied.contains(suggestion_id)
    }

    #[must_use]
    pub const fn applied(&self) -> &HashSet<String> {
        &self.applied
    }
}
