// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the two record classes.

pub mod events;
pub mod sensor_alerts;

use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp in the canonical stored format: RFC 3339 with
/// millisecond precision and a `Z` suffix. Lexicographic order of the
/// rendered strings matches chronological order, which the age-based
/// delete queries rely on.
pub fn stored_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stored_timestamps_sort_chronologically() {
        let now = Utc::now();
        let earlier = stored_timestamp(now - Duration::days(3));
        let later = stored_timestamp(now);
        assert!(earlier < later);
    }
}
