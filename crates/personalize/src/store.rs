//! # Preference Store
//!
//! Owns the user's preferences and scenario flags. Every mutation clamps
//! weights, notifies subscribers and schedules a debounced remote write.

use std::time::Duration;

use tokio::sync::watch;

use crate::{Debounce, Language, Preferences, Scenario, ScenarioFlags, Suggestion, WeightKey};

/// Quiet period before preferences are written to the remote service.
pub const PERSIST_DELAY: Duration = Duration::from_millis(350);

/// Current preferences together with the flags they were derived under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceState {
    pub preferences: Preferences,
    pub flags: ScenarioFlags,
}

#[derive(Debug)]
pub struct PreferenceStore {
    state: watch::Sender<PreferenceState>,
    persist: Debounce<Preferences>,
}

impl PreferenceStore {
    /// Create a store seeded with `preferences`. `persist` receives the
    /// preferences after each quiet period following a mutation.
    #[must_use]
    pub fn new(preferences: Preferences, persist: Debounce<Preferences>) -> Self {
        let state = PreferenceState { preferences: preferences.clamped(), flags: ScenarioFlags::default() };
        let (state, _) = watch::channel(state);
        Self { state, persist }
    }

    /// Watch for changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PreferenceState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> PreferenceState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.state.borrow().preferences.clone()
    }

    #[must_use]
    pub fn flags(&self) -> ScenarioFlags {
        self.state.borrow().flags
    }

    pub fn set_weight(&mut self, key: WeightKey, value: i64) {
        self.mutate(|state| state.preferences.weights.set(key, value));
    }

    pub fn set_language(&mut self, language: Language) {
        self.mutate(|state| state.preferences.language = language);
    }

    pub fn set_walk_limit(&mut self, meters: i64) {
        self.mutate(|state| state.preferences.walk_limit_m = meters);
    }

    pub fn toggle_voice_assist(&mut self) {
        self.mutate(|state| state.preferences.voice_assist = !state.preferences.voice_assist);
    }

    /// Replace the scenario flags and re-derive preferences from the new
    /// combination. Setting the current flags again is a no-op.
    pub fn set_flags(&mut self, flags: ScenarioFlags) {
        if self.flags() == flags {
            return;
        }
        self.mutate(|state| {
            state.flags = flags;
            state.preferences.derive_from(flags);
        });
    }

    pub fn toggle_scenario(&mut self, scenario: Scenario) {
        let flags = self.flags().toggled(scenario);
        self.set_flags(flags);
    }

    /// Add a suggestion's weight deltas. Deltas for unknown weights are
    /// ignored.
    pub fn apply_deltas(&mut self, suggestion: &Suggestion) {
        self.mutate(|state| {
            for (key, delta) in suggestion.deltas() {
                if let Ok(key) = key.parse::<WeightKey>() {
                    state.preferences.weights.adjust(key, delta.value());
                }
            }
        });
    }

    fn mutate(&mut self, f: impl FnOnce(&mut PreferenceState)) {
        self.state.send_modify(|state| {
            f(state);
            state.preferences.weights = state.preferences.weights.clamped();
        });
        self.persist.schedule(self.preferences());
    }
}
