use std::fmt;
use std::str::FromStr;

use realtime::{Error, bad_request};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MIN_WEIGHT: i64 = 0;
pub const MAX_WEIGHT: i64 = 100;

/// `weights.time` floor while the peak scenario is active.
pub const PEAK_TIME_FLOOR: i64 = 70;

/// Walk limit while it is raining.
pub const RAIN_WALK_LIMIT_M: i64 = 600;

/// Walk limit floor when it is not raining.
pub const DRY_WALK_FLOOR_M: i64 = 800;

/// Relative importance of journey time, cost and comfort, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub time: i64,
    pub cost: i64,
    pub comfort: i64,
}

impl Default for Weights {
    fn default() -> Self {
        Self { time: 60, cost: 50, comfort: 50 }
    }
}

impl Weights {
    /// Weight by its wire name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<i64> {
        key.parse::<WeightKey>().ok().map(|key| self[key])
    }

    /// Set a weight, clamping to `[0, 100]`.
    pub fn set(&mut self, key: WeightKey, value: i64) {
        *self.slot(key) = value.clamp(MIN_WEIGHT, MAX_WEIGHT);
    }

    /// Add `delta` to a weight, clamping to `[0, 100]`.
    pub fn adjust(&mut self, key: WeightKey, delta: i64) {
        let value = self[key].saturating_add(delta);
        self.set(key, value);
    }

    #[must_use]
    pub fn clamped(self) -> Self {
        let clamp = |value: i64| value.clamp(MIN_WEIGHT, MAX_WEIGHT);
        Self { time: clamp(self.time), cost: clamp(self.cost), comfort: clamp(self.comfort) }
    }

    const fn slot(&mut self, key: WeightKey) -> &mut i64 {
        match key {
            WeightKey::Time => &mut self.time,
            WeightKey::Cost => &mut self.cost,
            WeightKey::Comfort => &mut self.comfort,
        }
    }
}

impl std::ops::Index<WeightKey> for Weights {
    type Output = i64;

    fn index(&self, key: WeightKey) -> &i64 {
        match key {
            WeightKey::Time => &self.time,
            WeightKey::Cost => &self.cost,
            WeightKey::Comfort => &self.comfort,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightKey {
    Time,
    Cost,
    Comfort,
}

impl FromStr for WeightKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(Self::Time),
            "cost" => Ok(Self::Cost),
            "comfort" => Ok(Self::Comfort),
            _ => Err(bad_request!("unknown weight {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Si,
    Ta,
}

impl Language {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Si => "si",
            Self::Ta => "ta",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "si" => Ok(Self::Si),
            "ta" => Ok(Self::Ta),
            _ => Err(bad_request!("unsupported language {s}")),
        }
    }
}

/// A user's travel preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub weights: Weights,

    #[serde(default)]
    pub language: Language,

    #[serde(default = "default_walk_limit")]
    pub walk_limit_m: i64,

    #[serde(default = "default_voice_assist")]
    pub voice_assist: bool,

    /// Accessibility settings, carried through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<Value>,
}

const fn default_walk_limit() -> i64 {
    900
}

const fn default_voice_assist() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            language: Language::default(),
            walk_limit_m: default_walk_limit(),
            voice_assist: default_voice_assist(),
            accessibility: None,
        }
    }
}

impl Preferences {
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.weights = self.weights.clamped();
        self
    }

    /// Re-derive the scenario-dependent fields from the full flag set.
    ///
    /// Derivation only ever raises `weights.time`; clearing `peak` leaves it
    /// where it is. `train_delay` has no effect.
    pub fn derive_from(&mut self, flags: ScenarioFlags) {
        if flags.peak {
            self.weights.time = self.weights.time.max(PEAK_TIME_FLOOR).min(MAX_WEIGHT);
        }

        self.walk_limit_m = if flags.rain {
            RAIN_WALK_LIMIT_M
        } else {
            self.walk_limit_m.max(DRY_WALK_FLOOR_M)
        };
    }
}

/// Contextual toggles, independent of each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioFlags {
    pub peak: bool,
    pub rain: bool,
    pub train_delay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Peak,
    Rain,
    TrainDelay,
}

impl ScenarioFlags {
    #[must_use]
    pub const fn with(mut self, scenario: Scenario, on: bool) -> Self {
        match scenario {
            Scenario::Peak => self.peak = on,
            Scenario::Rain => self.rain = on,
            Scenario::TrainDelay => self.train_delay = on,
        }
        self
    }

    #[must_use]
    pub const fn is_set(self, scenario: Scenario) -> bool {
        match scenario {
            Scenario::Peak => self.peak,
            Scenario::Rain => self.rain,
            Scenario::TrainDelay => self.train_delay,
        }
    }

    #[must_use]
    pub const fn toggled(self, scenario: Scenario) -> Self {
        self.with(scenario, !self.is_set(scenario))
    }
}
