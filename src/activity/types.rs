use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Interaction kinds accepted on create
pub const ACTIVITY_TYPES: &[&str] = &["call", "email", "meeting", "site_visit", "note"];

/// Maximum description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// A logged customer interaction.
///
/// The serialized form is the frame pushed to feed clients: camelCase keys and
/// `createdAt` as an ISO-8601 UTC string with millisecond precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub customer_id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub activity_type: String,
    pub description: String,
    pub outcome: Option<String>,
    pub next_steps: Option<String>,
    pub contact_method: Option<String>,
    pub contacted_by: Option<String>,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub created_at: DateTime<Utc>,
}

/// Payload for recording a new activity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub customer_id: i64,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub description: String,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub next_steps: Option<String>,
    #[serde(default)]
    pub contact_method: Option<String>,
    #[serde(default)]
    pub contacted_by: Option<String>,
}

impl Activity {
    /// Ordering key used by the poll cursor
    pub fn cursor_key(&self) -> (DateTime<Utc>, i64) {
        (self.created_at, self.id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl NewActivity {
    /// Check the payload before it reaches the store. Returns a client-facing message.
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_id <= 0 {
            return Err("customerId must be a positive integer".to_string());
        }

        if !ACTIVITY_TYPES.contains(&self.activity_type.as_str()) {
            return Err(format!(
                "type must be one of: {}",
                ACTIVITY_TYPES.join(", ")
            ));
        }

        let description = self.description.trim();
        if description.is_empty() {
            return Err("description is required".to_string());
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(format!(
                "description exceeds {} characters",
                MAX_DESCRIPTION_LEN
            ));
        }

        Ok(())
    }

    /// Blank optional fields are stored as NULL
    pub fn normalized(mut self) -> Self {
        self.description = self.description.trim().to_string();
        self.outcome = non_blank(self.outcome);
        self.next_steps = non_blank(self.next_steps);
        self.contact_method = non_blank(self.contact_method);
        self.contacted_by = non_blank(self.contacted_by);
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn serialize_iso_millis<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Activity {
        Activity {
            id: 42,
            customer_id: 7,
            activity_type: "site_visit".to_string(),
            description: "Restocked machine #3".to_string(),
            outcome: Some("Positive".to_string()),
            next_steps: None,
            contact_method: Some("in_person".to_string()),
            contacted_by: Some("dana".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_wire_format() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 42,
                "customerId": 7,
                "type": "site_visit",
                "description": "Restocked machine #3",
                "outcome": "Positive",
                "nextSteps": null,
                "contactMethod": "in_person",
                "contactedBy": "dana",
                "createdAt": "2024-05-01T09:30:00.000Z"
            })
        );
    }

    #[test]
    fn test_wire_format_parses_back() {
        let original = sample();
        let parsed: Activity = serde_json::from_str(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_validate_rejects_bad_payloads() {
        let base = NewActivity {
            customer_id: 1,
            activity_type: "call".to_string(),
            description: "Quarterly check-in".to_string(),
            outcome: None,
            next_steps: None,
            contact_method: None,
            contacted_by: None,
        };
        assert!(base.validate().is_ok());

        let bad_type = NewActivity {
            activity_type: "fax".to_string(),
            ..base.clone()
        };
        assert!(bad_type.validate().unwrap_err().contains("type must be one of"));

        let blank = NewActivity {
            description: "   ".to_string(),
            ..base.clone()
        };
        assert_eq!(blank.validate().unwrap_err(), "description is required");

        let no_customer = NewActivity {
            customer_id: 0,
            ..base.clone()
        };
        assert!(no_customer.validate().is_err());

        let long = NewActivity {
            description: "x".repeat(MAX_DESCRIPTION_LEN + 1),
            ..base
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_normalized_drops_blank_fields() {
        let payload: NewActivity = serde_json::from_value(json!({
            "customerId": 3,
            "type": "email",
            "description": "  Sent pricing sheet ",
            "outcome": "  ",
            "contactedBy": "lee"
        }))
        .unwrap();

        let normalized = payload.normalized();
        assert_eq!(normalized.description, "Sent pricing sheet");
        assert_eq!(normalized.outcome, None);
        assert_eq!(normalized.next_steps, None);
        assert_eq!(normalized.contacted_by.as_deref(), Some("lee"));
    }
}
