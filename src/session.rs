//! # Dashboard Session
//!
//! Drives one user's dashboard: position stream, preference edits, suggestion
//! ranking and the periodic transport poll, all on one task.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use personalize::api::{self, TransportSnapshot};
use personalize::{
    ApplySuggestion, Debounce, Language, Notifier, PERSIST_DELAY, PreferenceState, PreferenceStore,
    Preferences, Scenario, Suggestion, WeightKey, engine,
};
use positions::{PositionStore, StreamIngestor, Subscription};
use realtime::{Config, HttpRequest, PushSource, bad_gateway};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Interval between transport snapshot polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// A user action on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetWeight(WeightKey, i64),
    SetLanguage(Language),
    SetWalkLimit(i64),
    ToggleVoiceAssist,
    ToggleScenario(Scenario),
    Apply(String),
}

impl FromStr for Command {
    type Err = anyhow::Error;

    /// Parse a command line such as `weight time 70`, `lang si`, `walk 800`,
    /// `voice`, `peak`, `rain`, `delay` or `apply <id>`.
    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let mut arg = || words.next().ok_or_else(|| anyhow!("`{command}` needs an argument"));

        let parsed = match command {
            "weight" => {
                let key = arg()?.parse()?;
                let value = arg()?.parse().context("weight must be a whole number")?;
                Self::SetWeight(key, value)
            }
            "lang" => Self::SetLanguage(arg()?.parse()?),
            "walk" => Self::SetWalkLimit(arg()?.parse().context("walk limit must be in meters")?),
            "voice" => Self::ToggleVoiceAssist,
            "peak" => Self::ToggleScenario(Scenario::Peak),
            "rain" => Self::ToggleScenario(Scenario::Rain),
            "delay" => Self::ToggleScenario(Scenario::TrainDelay),
            "apply" => Self::Apply(arg()?.to_string()),
            _ => return Err(anyhow!("unknown command `{command}`")),
        };
        Ok(parsed)
    }
}

/// One user's dashboard.
pub struct Dashboard<P, N> {
    provider: P,
    store: PreferenceStore,
    coordinator: ApplySuggestion<P, N>,
    positions: PositionStore,
    subscription: Subscription,
    candidates: Vec<Suggestion>,
    ranked: watch::Sender<Vec<Suggestion>>,
    transport: Option<TransportSnapshot>,
}

impl<P, N> Dashboard<P, N>
where
    P: Config + HttpRequest + PushSource + Clone + 'static,
    N: Notifier,
{
    /// Subscribe to the position stream, load preferences and suggestions,
    /// and rank them.
    ///
    /// # Errors
    ///
    /// Returns an error when the aggregator URL is not configured. Remote
    /// read failures fall back to defaults.
    pub async fn load(provider: P, notifier: N) -> Result<Self> {
        let aggregator_url =
            Config::get(&provider, "AGGREGATOR_URL").await.context("getting `AGGREGATOR_URL`")?;

        let positions = PositionStore::new();
        let subscription = StreamIngestor::new(provider.clone()).start(&aggregator_url, positions.clone());

        let preferences = api::load_preferences(&provider).await;
        let candidates = api::load_suggestions(&provider).await;
        info!(suggestions = candidates.len(), "dashboard loaded");

        let writer = provider.clone();
        let persist = Debounce::new(PERSIST_DELAY, move |preferences: Preferences| {
            let writer = writer.clone();
            async move {
                if let Err(e) = api::save_preferences(&writer, &preferences).await {
                    debug!(monotonic_counter.preference_writes_failed = 1, error = %e, "preferences not saved");
                }
            }
        });

        let (ranked, _) = watch::channel(Vec::new());
        let mut dashboard = Self {
            coordinator: ApplySuggestion::new(provider.clone(), notifier),
            provider,
            store: PreferenceStore::new(preferences, persist),
            positions,
            subscription,
            candidates,
            ranked,
            transport: None,
        };
        dashboard.recompute();
        Ok(dashboard)
    }

    /// Process commands and poll ticks until the command channel closes,
    /// then release the position subscription.
    ///
    /// Polls run in the background so a slow transport service never holds
    /// up commands. A tick is skipped while the previous poll is in flight.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut poll = tokio::time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.handle(command);
                }
                _ = poll.tick() => {
                    if in_flight.is_empty() {
                        in_flight.spawn(fetch_transport(self.provider.clone()));
                    } else {
                        debug!("transport poll still in flight, skipping tick");
                    }
                }
                Some(joined) = in_flight.join_next() => match joined {
                    Ok(result) => self.polled(result),
                    Err(e) => warn!(error = %e, "transport poll task failed"),
                },
            }
        }

        in_flight.shutdown().await;
        self.subscription.stop().await;
        info!("dashboard closed");
    }

    /// Apply a single command and re-rank.
    pub fn handle(&mut self, command: Command) {
        debug!(?command, "handling command");

        match command {
            Command::SetWeight(key, value) => self.store.set_weight(key, value),
            Command::SetLanguage(language) => self.store.set_language(language),
            Command::SetWalkLimit(meters) => self.store.set_walk_limit(meters),
            Command::ToggleVoiceAssist => self.store.toggle_voice_assist(),
            Command::ToggleScenario(scenario) => self.store.toggle_scenario(scenario),
            Command::Apply(id) => {
                let Some(suggestion) = self.candidates.iter().find(|s| s.id == id) else {
                    warn!(suggestion_id = %id, "no such suggestion");
                    return;
                };
                // the remote apply runs detached
                drop(self.coordinator.apply(&mut self.store, suggestion));
            }
        }
        self.recompute();
    }

    /// Fetch the transport snapshot and re-rank. A failed poll leaves the
    /// current ranking in place.
    pub async fn poll(&mut self) {
        let result = fetch_transport(self.provider.clone()).await;
        self.polled(result);
    }

    fn polled(&mut self, result: realtime::Result<TransportSnapshot>) {
        match result {
            Ok(snapshot) => {
                debug!(buses = snapshot.buses.len(), trains = snapshot.trains.len(), "transport polled");
                self.transport = Some(snapshot);
                self.recompute();
            }
            Err(e) => {
                warn!(monotonic_counter.transport_poll_failures = 1, error = %e, "transport poll failed");
            }
        }
    }

    fn recompute(&self) {
        let PreferenceState { preferences, flags } = self.store.snapshot();
        let ranked = engine::rank(&self.candidates, &preferences.weights, flags);
        self.ranked.send_replace(ranked);
    }

    /// Watch the ranked suggestions.
    #[must_use]
    pub fn ranked(&self) -> watch::Receiver<Vec<Suggestion>> {
        self.ranked.subscribe()
    }

    /// Watch preferences and scenario flags.
    #[must_use]
    pub fn preferences(&self) -> watch::Receiver<PreferenceState> {
        self.store.subscribe()
    }

    #[must_use]
    pub const fn positions(&self) -> &PositionStore {
        &self.positions
    }

    #[must_use]
    pub const fn transport(&self) -> Option<&TransportSnapshot> {
        self.transport.as_ref()
    }

    #[must_use]
    pub fn is_applied(&self, suggestion_id: &str) -> bool {
        self.coordinator.is_applied(suggestion_id)
    }
}

// Bounded by the poll interval so a hung request cannot outlive the next tick.
async fn fetch_transport<P>(provider: P) -> realtime::Result<TransportSnapshot>
where
    P: Config + HttpRequest,
{
    match tokio::time::timeout(POLL_INTERVAL, api::fetch_transport(&provider)).await {
        Ok(result) => result,
        Err(elapsed) => Err(bad_gateway!("transport poll timed out: {elapsed}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("weight time 70".parse::<Command>().ok(), Some(Command::SetWeight(WeightKey::Time, 70)));
        assert_eq!("lang ta".parse::<Command>().ok(), Some(Command::SetLanguage(Language::Ta)));
        assert_eq!("  walk   650 ".parse::<Command>().ok(), Some(Command::SetWalkLimit(650)));
        assert_eq!("delay".parse::<Command>().ok(), Some(Command::ToggleScenario(Scenario::TrainDelay)));
        assert_eq!("apply s1".parse::<Command>().ok(), Some(Command::Apply("s1".to_string())));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!("".parse::<Command>().is_err());
        assert!("weight luggage 10".parse::<Command>().is_err());
        assert!("weight time lots".parse::<Command>().is_err());
        assert!("lang fr".parse::<Command>().is_err());
        assert!("apply".parse::<Command>().is_err());
        assert!("teleport".parse::<Command>().is_err());
    }
}
