//! Change detection for the polling mode.

use chrono::{DateTime, Utc};

use crate::record::Record;
use crate::state::SyncState;

/// Return the records created strictly after `watermark`, oldest first.
///
/// With no watermark every record that carries a creation time is new.
/// Records without a creation time are never reported as new.
pub fn detect_new(watermark: Option<DateTime<Utc>>, records: &[Record]) -> Vec<Record> {
    let mut fresh: Vec<Record> = records
        .iter()
        .filter(|r| match (r.created_time, watermark) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(created), Some(mark)) => created > mark,
        })
        .cloned()
        .collect();
    fresh.sort_by_key(|r| r.created_time);
    fresh
}

/// Advance the state's watermark to the newest creation time in `records`.
pub fn advance(state: &mut SyncState, records: &[Record]) {
    if let Some(newest) = records.iter().filter_map(|r| r.created_time).max() {
        state.advance_to(newest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 25, 14, minute, 0).unwrap()
    }

    fn record(id: &str, created: Option<DateTime<Utc>>) -> Record {
        let mut r = Record::new(id, id);
        r.created_time = created;
        r
    }

    #[test]
    fn excludes_at_or_before_watermark_and_includes_after() {
        let mark = at(30);
        let records = vec![
            record("before", Some(at(10))),
            record("equal", Some(mark)),
            record("after", Some(at(31))),
            record("much-later", Some(mark + Duration::days(2))),
        ];
        let fresh = detect_new(Some(mark), &records);
        let ids: Vec<&str> = fresh.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["after", "much-later"]);
        for r in &fresh {
            assert!(r.created_time.unwrap() > mark);
        }
    }

    #[test]
    fn no_watermark_includes_everything_dated() {
        let records = vec![record("a", Some(at(1))), record("undated", None)];
        let fresh = detect_new(None, &records);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "a");
    }

    #[test]
    fn result_is_sorted_oldest_first() {
        let records = vec![
            record("c", Some(at(50))),
            record("a", Some(at(40))),
            record("b", Some(at(45))),
        ];
        let fresh = detect_new(Some(at(0)), &records);
        let ids: Vec<&str> = fresh.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn detection_does_not_touch_state() {
        let state = SyncState::starting_at(at(0));
        let records = vec![record("a", Some(at(5)))];
        let _ = detect_new(state.watermark, &records);
        assert_eq!(state.watermark, Some(at(0)));
    }

    #[test]
    fn advance_moves_to_newest() {
        let mut state = SyncState::starting_at(at(0));
        advance(
            &mut state,
            &[record("a", Some(at(5))), record("b", Some(at(9))), record("c", None)],
        );
        assert_eq!(state.watermark, Some(at(9)));
    }

    #[test]
    fn advance_with_empty_batch_keeps_watermark() {
        let mut state = SyncState::starting_at(at(3));
        advance(&mut state, &[]);
        assert_eq!(state.watermark, Some(at(3)));
    }
}
