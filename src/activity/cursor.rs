//! Poll cursor: which activity rows the next poll should pick up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Activity;

/// How the cursor moves after a successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorPolicy {
    /// Jump to the wall clock after every poll. Rows committed while the query was
    /// running, with a timestamp before the jump, are never seen.
    Now,
    /// Move to the `(created_at, id)` of the last row delivered.
    #[default]
    MaxSeen,
}

/// Position of the polling monitor in the activity stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollCursor {
    pub checked_at: DateTime<Utc>,
    /// Tie-breaker for rows sharing `checked_at`. `None` admits only strictly newer rows.
    pub last_id: Option<i64>,
}

impl PollCursor {
    pub fn at(checked_at: DateTime<Utc>) -> Self {
        Self {
            checked_at,
            last_id: None,
        }
    }

    pub fn starting_now() -> Self {
        Self::at(Utc::now())
    }

    /// Whether `activity` lies after this cursor. Mirrors the SQL predicate used by the
    /// PostgreSQL store.
    pub fn admits(&self, activity: &Activity) -> bool {
        match self.last_id {
            None => activity.created_at > self.checked_at,
            Some(last_id) => activity.cursor_key() > (self.checked_at, last_id),
        }
    }

    /// Cursor after delivering `batch` (sorted by `(created_at, id)`) under `policy`.
    pub fn advance(&self, policy: CursorPolicy, batch: &[Activity], now: DateTime<Utc>) -> Self {
        match policy {
            CursorPolicy::Now => Self::at(now),
            CursorPolicy::MaxSeen => match batch.iter().map(Activity::cursor_key).max() {
                Some((created_at, id)) => Self {
                    checked_at: created_at,
                    last_id: Some(id),
                },
                None => *self,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn activity(id: i64, created_at: DateTime<Utc>) -> Activity {
        Activity {
            id,
            customer_id: 1,
            activity_type: "call".to_string(),
            description: format!("activity {}", id),
            outcome: None,
            next_steps: None,
            contact_method: None,
            contacted_by: None,
            created_at,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_policy_deserializes_snake_case() {
        let policy: CursorPolicy = serde_json::from_str("\"max_seen\"").unwrap();
        assert_eq!(policy, CursorPolicy::MaxSeen);
        let policy: CursorPolicy = serde_json::from_str("\"now\"").unwrap();
        assert_eq!(policy, CursorPolicy::Now);
    }

    #[test]
    fn test_timestamp_cursor_is_strict() {
        let cursor = PollCursor::at(t0());
        assert!(!cursor.admits(&activity(1, t0())));
        assert!(cursor.admits(&activity(1, t0() + Duration::milliseconds(1))));
        assert!(!cursor.admits(&activity(1, t0() - Duration::milliseconds(1))));
    }

    #[test]
    fn test_keyset_cursor_breaks_ties_by_id() {
        let cursor = PollCursor {
            checked_at: t0(),
            last_id: Some(10),
        };
        assert!(!cursor.admits(&activity(10, t0())));
        assert!(!cursor.admits(&activity(9, t0())));
        assert!(cursor.admits(&activity(11, t0())));
        assert!(cursor.admits(&activity(3, t0() + Duration::seconds(1))));
    }

    #[test]
    fn test_max_seen_advances_to_last_row() {
        let batch = vec![
            activity(4, t0()),
            activity(5, t0() + Duration::seconds(2)),
            activity(6, t0() + Duration::seconds(2)),
        ];
        let cursor = PollCursor::at(t0() - Duration::seconds(1));
        let next = cursor.advance(CursorPolicy::MaxSeen, &batch, t0() + Duration::hours(1));

        assert_eq!(next.checked_at, t0() + Duration::seconds(2));
        assert_eq!(next.last_id, Some(6));

        // A later insert sharing the max timestamp is still admitted
        assert!(next.admits(&activity(7, t0() + Duration::seconds(2))));
    }

    #[test]
    fn test_max_seen_holds_on_empty_batch() {
        let cursor = PollCursor {
            checked_at: t0(),
            last_id: Some(3),
        };
        let next = cursor.advance(CursorPolicy::MaxSeen, &[], t0() + Duration::hours(1));
        assert_eq!(next, cursor);
    }

    #[test]
    fn test_now_policy_jumps_to_clock() {
        let cursor = PollCursor::at(t0());
        let later = t0() + Duration::seconds(5);
        let next = cursor.advance(CursorPolicy::Now, &[activity(1, t0())], later);
        assert_eq!(next, PollCursor::at(later));

        let idle = cursor.advance(CursorPolicy::Now, &[], later);
        assert_eq!(idle.checked_at, later);
    }
}
