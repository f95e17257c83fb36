//! InvalidationClock - グローバルな無効化クロック
//!
//! chain ごとのキャンセルトークンではなく、プロセス全体で一つの epoch です。
//! `stop_command_chains` が「今」を書き込み、各 chain はコマンドの合間に
//! 「自分の起動時刻 <= epoch」なら停止する。
//!
//! 書き込みは fetch_max なので単調非減少。読み取りはロックなしで、
//! 多少古い値を読んでも次のチェックで拾えるので問題ない。

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

const NEVER: i64 = i64::MIN;

#[derive(Debug)]
pub struct InvalidationClock {
    epoch_nanos: AtomicI64,
}

impl InvalidationClock {
    pub fn new() -> Self {
        Self {
            epoch_nanos: AtomicI64::new(NEVER),
        }
    }

    /// Move the epoch to `at`. Never moves it backwards.
    pub fn invalidate(&self, at: DateTime<Utc>) {
        self.epoch_nanos.fetch_max(to_nanos(at), Ordering::AcqRel);
    }

    /// A chain started at `started_at` is stale once the epoch reached it.
    pub fn is_stale(&self, started_at: DateTime<Utc>) -> bool {
        to_nanos(started_at) <= self.epoch_nanos.load(Ordering::Acquire)
    }

    /// Last invalidation time, if any chain was ever stopped.
    pub fn current(&self) -> Option<DateTime<Utc>> {
        match self.epoch_nanos.load(Ordering::Acquire) {
            NEVER => None,
            nanos => Some(DateTime::from_timestamp_nanos(nanos)),
        }
    }
}

impl Default for InvalidationClock {
    fn default() -> Self {
        Self::new()
    }
}

fn to_nanos(at: DateTime<Utc>) -> i64 {
    // 2262 年以降は表現できないので飽和させる
    at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn nothing_is_stale_before_the_first_invalidation() {
        let clock = InvalidationClock::new();
        assert_eq!(clock.current(), None);
        assert!(!clock.is_stale(t0()));
    }

    #[test]
    fn chains_started_at_or_before_the_epoch_are_stale() {
        let clock = InvalidationClock::new();
        clock.invalidate(t0());

        assert!(clock.is_stale(t0() - Duration::seconds(1)));
        assert!(clock.is_stale(t0()));
        assert!(!clock.is_stale(t0() + Duration::nanoseconds(1)));
    }

    #[test]
    fn epoch_never_moves_backwards() {
        let clock = InvalidationClock::new();
        clock.invalidate(t0());
        clock.invalidate(t0() - Duration::seconds(10));
        assert_eq!(clock.current(), Some(t0()));

        clock.invalidate(t0() + Duration::seconds(10));
        assert_eq!(clock.current(), Some(t0() + Duration::seconds(10)));
    }
}
