//! Habit and Log wire records.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A habit as it travels over the wire.
///
/// On input `user_id` and the three timestamps are optional and ignored:
/// ownership comes from the authenticated caller and time from the server.
/// On output every field is present except an unset `deleted_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Client-generated identifier.
    pub id: Uuid,
    /// Owning user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Category reference. Checked for shape only.
    pub category_id: Uuid,
    /// Display title.
    pub title: String,
    /// Opaque frequency descriptor. Must be a JSON object.
    pub frequency_json: serde_json::Value,
    /// Server-assigned creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Server-assigned time of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Tombstone marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Habit {
    /// Creates a habit payload with no owner and no timestamps.
    pub fn new(
        id: Uuid,
        category_id: Uuid,
        title: impl Into<String>,
        frequency_json: serde_json::Value,
    ) -> Self {
        Self {
            id,
            user_id: None,
            category_id,
            title: title.into(),
            frequency_json,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    /// Checks the rules JSON decoding alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Invalid`] if `frequency_json` is not an object.
    pub fn validate(&self) -> ProtocolResult<()> {
        if !self.frequency_json.is_object() {
            return Err(ProtocolError::invalid(format!(
                "habit {}: frequency_json must be an object",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns true if the habit carries a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A habit log entry as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// Client-generated identifier.
    pub id: Uuid,
    /// Owning habit. Never checked for existence.
    pub habit_id: Uuid,
    /// Owning user, denormalized from the habit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Calendar day (`YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Optional note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Optional value payload.
    #[serde(default, skip_serializing_if = "LogValue::is_absent")]
    pub value: LogValue,
    /// Server-assigned creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Server-assigned time of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Tombstone marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Log {
    /// Creates a log payload with no note, no value and no timestamps.
    pub fn new(id: Uuid, habit_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id,
            habit_id,
            user_id: None,
            date,
            text: None,
            value: LogValue::Absent,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    /// Sets the note.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the value payload.
    pub fn with_value(mut self, value: LogValue) -> Self {
        self.value = value;
        self
    }

    /// Returns true if the log carries a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The value recorded by a log.
///
/// Stored verbatim and never interpreted. On the wire it is the plain JSON
/// value of the `value` field; `null` or a missing field is [`LogValue::Absent`].
/// Numbers keep their JSON form, so `3` comes back as `3` and not `3.0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LogValue {
    /// No value.
    #[default]
    Absent,
    /// Done / not done.
    Boolean(bool),
    /// A measured quantity, exactly as the client sent it.
    Numeric(serde_json::Number),
    /// Free-form value.
    Text(String),
}

impl LogValue {
    /// Returns true for [`LogValue::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, LogValue::Absent)
    }

    /// A numeric value from a float. Returns `None` for NaN and infinities,
    /// which JSON cannot carry.
    pub fn from_f64(v: f64) -> Option<Self> {
        serde_json::Number::from_f64(v).map(LogValue::Numeric)
    }

    /// The numeric value as a float, if this is [`LogValue::Numeric`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LogValue::Numeric(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl From<bool> for LogValue {
    fn from(v: bool) -> Self {
        LogValue::Boolean(v)
    }
}

impl From<i64> for LogValue {
    fn from(v: i64) -> Self {
        LogValue::Numeric(v.into())
    }
}

impl From<u64> for LogValue {
    fn from(v: u64) -> Self {
        LogValue::Numeric(v.into())
    }
}

impl From<serde_json::Number> for LogValue {
    fn from(v: serde_json::Number) -> Self {
        LogValue::Numeric(v)
    }
}

impl From<&str> for LogValue {
    fn from(v: &str) -> Self {
        LogValue::Text(v.to_string())
    }
}

impl Serialize for LogValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LogValue::Absent => serializer.serialize_none(),
            LogValue::Boolean(v) => serializer.serialize_bool(*v),
            LogValue::Numeric(v) => v.serialize(serializer),
            LogValue::Text(v) => serializer.serialize_str(v),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Boolean(bool),
    Numeric(serde_json::Number),
    Text(String),
}

impl<'de> Deserialize<'de> for LogValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<RawValue>::deserialize(deserializer)? {
            None => LogValue::Absent,
            Some(RawValue::Boolean(v)) => LogValue::Boolean(v),
            Some(RawValue::Numeric(v)) => LogValue::Numeric(v),
            Some(RawValue::Text(v)) => LogValue::Text(v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_log(value: serde_json::Value) -> Log {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn habit_input_ignores_optional_fields() {
        let habit: Habit = serde_json::from_value(json!({
            "id": "6f1c1a52-3c1e-4d4c-9a57-0c9f7b0f8d11",
            "category_id": "0b5a1f7e-9d3c-4e2b-8f6a-1c2d3e4f5a6b",
            "title": "Jog",
            "frequency_json": {"days": [1, 3, 5]}
        }))
        .unwrap();

        assert_eq!(habit.title, "Jog");
        assert!(habit.user_id.is_none());
        assert!(habit.updated_at.is_none());
        assert!(habit.validate().is_ok());
    }

    #[test]
    fn habit_accepts_client_timestamps() {
        let habit: Habit = serde_json::from_value(json!({
            "id": "6f1c1a52-3c1e-4d4c-9a57-0c9f7b0f8d11",
            "user_id": "3d5e7f90-1a2b-4c3d-8e9f-0a1b2c3d4e5f",
            "category_id": "0b5a1f7e-9d3c-4e2b-8f6a-1c2d3e4f5a6b",
            "title": "Jog",
            "frequency_json": {},
            "updated_at": "2031-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(habit.updated_at.is_some());
    }

    #[test]
    fn habit_rejects_bad_id() {
        let result = serde_json::from_value::<Habit>(json!({
            "id": "not-a-uuid",
            "category_id": "0b5a1f7e-9d3c-4e2b-8f6a-1c2d3e4f5a6b",
            "title": "Jog",
            "frequency_json": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn habit_requires_frequency() {
        let result = serde_json::from_value::<Habit>(json!({
            "id": "6f1c1a52-3c1e-4d4c-9a57-0c9f7b0f8d11",
            "category_id": "0b5a1f7e-9d3c-4e2b-8f6a-1c2d3e4f5a6b",
            "title": "Jog"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn frequency_must_be_object() {
        let habit = Habit::new(Uuid::new_v4(), Uuid::new_v4(), "Jog", json!([1, 2]));
        assert!(matches!(habit.validate(), Err(ProtocolError::Invalid(_))));

        let habit = Habit::new(Uuid::new_v4(), Uuid::new_v4(), "Jog", json!(null));
        assert!(habit.validate().is_err());
    }

    #[test]
    fn habit_output_omits_unset_tombstone() {
        let habit = Habit::new(Uuid::new_v4(), Uuid::new_v4(), "Jog", json!({}));
        let value = serde_json::to_value(&habit).unwrap();
        assert!(value.get("deleted_at").is_none());
        assert_eq!(value["title"], "Jog");
    }

    #[test]
    fn log_value_variants() {
        let base = json!({
            "id": "6f1c1a52-3c1e-4d4c-9a57-0c9f7b0f8d11",
            "habit_id": "0b5a1f7e-9d3c-4e2b-8f6a-1c2d3e4f5a6b",
            "date": "2024-03-01"
        });

        let with = |v: serde_json::Value| {
            let mut body = base.clone();
            body["value"] = v;
            decode_log(body).value
        };

        assert_eq!(with(json!(true)), LogValue::Boolean(true));
        assert_eq!(with(json!(2.5)), LogValue::from_f64(2.5).unwrap());
        assert_eq!(with(json!(3)), LogValue::from(3i64));
        assert_eq!(with(json!("felt great")), LogValue::Text("felt great".into()));
        assert_eq!(with(json!(null)), LogValue::Absent);
        assert_eq!(decode_log(base.clone()).value, LogValue::Absent);
    }

    #[test]
    fn numeric_values_keep_their_json_form() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let big = 9_007_199_254_740_993u64;
        for (value, expected) in [
            (LogValue::from(3i64), "3"),
            (LogValue::from(-7i64), "-7"),
            (LogValue::from(big), "9007199254740993"),
            (LogValue::from_f64(2.5).unwrap(), "2.5"),
        ] {
            let log = Log::new(Uuid::new_v4(), Uuid::new_v4(), date).with_value(value.clone());
            let text = serde_json::to_string(&log).unwrap();
            assert!(text.contains(&format!("\"value\":{expected}")), "{text}");
            let back: Log = serde_json::from_str(&text).unwrap();
            assert_eq!(back.value, value);
        }
        assert!(LogValue::from_f64(f64::NAN).is_none());
        assert_eq!(LogValue::from(4i64).as_f64(), Some(4.0));
    }

    #[test]
    fn log_rejects_bad_date() {
        let result = serde_json::from_value::<Log>(json!({
            "id": "6f1c1a52-3c1e-4d4c-9a57-0c9f7b0f8d11",
            "habit_id": "0b5a1f7e-9d3c-4e2b-8f6a-1c2d3e4f5a6b",
            "date": "March 1st"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn log_output_omits_unset_text_and_value() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let log = Log::new(Uuid::new_v4(), Uuid::new_v4(), date);
        let value = serde_json::to_value(&log).unwrap();
        assert!(value.get("text").is_none());
        assert!(value.get("value").is_none());
        assert_eq!(value["date"], "2024-03-01");

        let log = log.with_text("note").with_value(LogValue::Boolean(false));
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["text"], "note");
        assert_eq!(value["value"], false);
    }
}
