//! Customer activity records and the cursor the relay polls them with.

mod cursor;
mod types;

pub use cursor::{CursorPolicy, PollCursor};
pub use types::{Activity, NewActivity, ACTIVITY_TYPES, MAX_DESCRIPTION_LEN};
