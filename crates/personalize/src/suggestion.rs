use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Language;

/// Text keyed by language code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Text for `language`, falling back to English, then to an empty string.
    #[must_use]
    pub fn get(&self, language: Language) -> &str {
        self.0
            .get(language.code())
            .or_else(|| self.0.get(Language::En.code()))
            .map_or("", String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A proposed weight change, as sent by the server.
///
/// Servers send whole numbers, decimals or signed strings such as `"+10"`.
/// Any other JSON value is kept as `Other` and counts as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Delta {
    Int(i64),
    Float(f64),
    Text(String),
    Other(Value),
}

impl Delta {
    /// Integer value of the delta. Decimals are truncated toward zero,
    /// strings contribute their leading integer (`"+15.5"` is 15, `"10 km"`
    /// is 10) and anything else counts as 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn value(&self) -> i64 {
        match self {
            Self::Int(value) => *value,
            Self::Float(value) if value.is_finite() => value.trunc() as i64,
            Self::Float(_) | Self::Other(_) => 0,
            Self::Text(text) => leading_integer(text),
        }
    }
}

// Optional sign then decimal digits, stopping at the first non-digit.
// Saturates instead of overflowing.
fn leading_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let magnitude = rest
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_i64, |acc, digit| acc.saturating_mul(10).saturating_add(i64::from(digit - b'0')));
    if negative { -magnitude } else { magnitude }
}

impl From<i64> for Delta {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<String, Delta>>,
}

/// A server-proposed adjustment the user can apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub kind: String,

    #[serde(default)]
    pub title: LocalizedText,

    #[serde(default)]
    pub body: LocalizedText,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,

    /// Set by ranking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

impl Suggestion {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            title: LocalizedText::default(),
            body: LocalizedText::default(),
            payload: None,
            score: None,
        }
    }

    #[must_use]
    pub fn title(mut self, title: LocalizedText) -> Self {
        self.title = title;
        self
    }

    #[must_use]
    pub fn delta(mut self, key: impl Into<String>, delta: impl Into<Delta>) -> Self {
        self.payload
            .get_or_insert_with(Payload::default)
            .weights
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), delta.into());
        self
    }

    /// Proposed weight deltas, keyed by weight name.
    pub fn deltas(&self) -> impl Iterator<Item = (&str, &Delta)> {
        self.payload
            .iter()
            .filter_map(|payload| payload.weights.as_ref())
            .flatten()
            .map(|(key, delta)| (key.as_str(), delta))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn delta_values() {
        let deltas: Vec<Delta> =
            serde_json::from_value(json!([10, -5, 2.9, -2.9, "+10", " -3 ", "abc", ""]))
                .expect("should deserialize");
        let values = deltas.iter().map(Delta::value).collect::<Vec<_>>();
        assert_eq!(values, vec![10, -5, 2, -2, 10, -3, 0, 0]);
    }

    #[test]
    fn leading_integer_text() {
        let deltas: Vec<Delta> = serde_json::from_value(json!([
            "+15.5",
            "10 km",
            "-7min",
            "9223372036854775807",
            "99999999999999999999",
            "- 4",
            "km 10"
        ]))
        .expect("should deserialize");
        let values = deltas.iter().map(Delta::value).collect::<Vec<_>>();
        assert_eq!(values, vec![15, 10, -7, i64::MAX, i64::MAX, 0, 0]);
    }

    #[test]
    fn non_numeric_deltas_kept() {
        let suggestion: Suggestion = serde_json::from_value(json!({
            "id": "s1",
            "kind": "time",
            "payload": {"weights": {"time": "+10", "cost": null, "comfort": {"by": 3}, "luggage": true}}
        }))
        .expect("should deserialize");

        let deltas = suggestion.deltas().map(|(k, d)| (k, d.value())).collect::<Vec<_>>();
        assert_eq!(deltas, vec![("comfort", 0), ("cost", 0), ("luggage", 0), ("time", 10)]);
    }

    #[test]
    fn localized_fallback() {
        let text: LocalizedText = [("en", "Leave earlier"), ("si", "ඉක්මනින් පිටත් වන්න")]
            .into_iter()
            .collect();
        assert_eq!(text.get(Language::Si), "ඉක්මනින් පිටත් වන්න");
        assert_eq!(text.get(Language::Ta), "Leave earlier");
        assert_eq!(LocalizedText::default().get(Language::Ta), "");
    }

    #[test]
    fn server_suggestion() {
        let suggestion: Suggestion = serde_json::from_value(json!({
            "id": "s1",
            "kind": "comfort",
            "title": {"en": "Take the AC bus"},
            "body": {"en": "Less crowded"},
            "payload": {"weights": {"comfort": "+10", "cost": -5}, "route": "138"}
        }))
        .expect("should deserialize");

        let deltas = suggestion.deltas().map(|(k, d)| (k, d.value())).collect::<Vec<_>>();
        assert_eq!(deltas, vec![("comfort", 10), ("cost", -5)]);
        assert_eq!(suggestion.score, None);
    }

    #[test]
    fn missing_payload() {
        let suggestion: Suggestion =
            serde_json::from_value(json!({"id": "s2", "kind": "time", "payload": null}))
                .expect("should deserialize");
        assert_eq!(suggestion.deltas().count(), 0);
    }
}
