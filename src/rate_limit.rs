//! Per-address daily request quotas.

use chrono::NaiveDate;
use dashmap::DashMap;
use std::net::IpAddr;

/// Requests allowed per address per calendar day unless configured.
pub const DEFAULT_DAILY_LIMIT: u64 = 10_000;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied,
}

#[derive(Debug, Clone, Copy)]
struct DayRecord {
    day: NaiveDate,
    count: u64,
}

/// Fixed-window limiter: each address gets `limit` requests per calendar
/// day, resetting at local midnight.
///
/// Records live in a sharded map, so entry access is atomic per address and
/// requests from different addresses never contend. State is in-memory only
/// and resets on restart.
pub struct DailyRateLimiter {
    limit: u64,
    records: DashMap<IpAddr, DayRecord>,
}

impl DailyRateLimiter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            records: DashMap::new(),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Count this request against `addr`'s quota for today.
    pub fn admit(&self, addr: IpAddr) -> Admission {
        self.admit_on(addr, chrono::Local::now().date_naive())
    }

    /// Admission against an explicit day; `admit` passes the current local
    /// date. The count keeps growing past the limit and only resets when
    /// the stored day changes.
    pub fn admit_on(&self, addr: IpAddr, today: NaiveDate) -> Admission {
        let mut record = self.records.entry(addr).or_insert(DayRecord {
            day: today,
            count: 0,
        });

        if record.day != today {
            record.day = today;
            record.count = 0;
        }
        record.count += 1;

        if record.count > self.limit {
            Admission::Denied
        } else {
            Admission::Allowed
        }
    }
}
