//! Polling state passed explicitly through the scheduler.

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

/// Last-seen watermark of the polling loop.
///
/// Lives in process memory only; a restart starts from a fresh watermark.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncState {
    /// Records created at or before this instant have already been handled.
    /// `None` means every record is new.
    pub watermark: Option<DateTime<Utc>>,
    /// When the last successful poll finished.
    pub last_poll: Option<DateTime<Utc>>,
}

impl SyncState {
    /// State that treats every record as new.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// State whose watermark is the given instant.
    pub fn starting_at(watermark: DateTime<Utc>) -> Self {
        Self {
            watermark: Some(watermark),
            last_poll: None,
        }
    }

    /// Watermark at the start of the current UTC day.
    pub fn start_of_day(now: DateTime<Utc>) -> Self {
        Self::starting_at(now.date_naive().and_time(NaiveTime::MIN).and_utc())
    }

    /// Move the watermark forward. Never moves it backwards.
    pub fn advance_to(&mut self, candidate: DateTime<Utc>) {
        match self.watermark {
            Some(current) if current >= candidate => {}
            _ => self.watermark = Some(candidate),
        }
    }

    pub fn mark_polled(&mut self, at: DateTime<Utc>) {
        self.last_poll = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn advance_never_goes_backwards() {
        let t1 = Utc.with_ymd_and_hms(2025, 9, 25, 10, 0, 0).unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 9, 24, 10, 0, 0).unwrap();
        let mut state = SyncState::starting_at(t1);
        state.advance_to(t0);
        assert_eq!(state.watermark, Some(t1));
    }

    #[test]
    fn advance_from_unbounded() {
        let t = Utc.with_ymd_and_hms(2025, 9, 25, 10, 0, 0).unwrap();
        let mut state = SyncState::unbounded();
        state.advance_to(t);
        assert_eq!(state.watermark, Some(t));
    }

    #[test]
    fn start_of_day_truncates() {
        let now = Utc.with_ymd_and_hms(2025, 9, 25, 14, 30, 12).unwrap();
        let state = SyncState::start_of_day(now);
        assert_eq!(
            state.watermark,
            Some(Utc.with_ymd_and_hms(2025, 9, 25, 0, 0, 0).unwrap())
        );
    }
}
