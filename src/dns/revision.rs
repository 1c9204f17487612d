//! Zone Revision Tracker
//!
//! SOA serial in `YYYYMMDDnn` form. Each membership change bumps `nn`;
//! the first change on a new UTC day resets it to `00` for that day.
//!
//! When `nn` is already 99 the next update borrows the following day so
//! the serial never goes backwards. A revision that runs ahead of the
//! clock keeps counting until the calendar catches up.

use chrono::{Datelike, Days, NaiveDate, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tracing::debug;

const MAX_DAILY_SERIAL: u32 = 99;

/// Source of the current calendar day
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// UTC wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a settable day
#[derive(Debug)]
pub struct FixedClock {
    day: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: Mutex::new(day),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        let mut current = self.day.lock().unwrap_or_else(|e| e.into_inner());
        *current = day;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A `YYYYMMDDnn` serial
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Revision(u32);

impl Revision {
    /// First revision of `day`
    pub fn start_of(day: NaiveDate) -> Self {
        Self(day_stamp(day) * 100)
    }

    pub fn serial(&self) -> u32 {
        self.0
    }

    /// The `nn` part
    pub fn counter(&self) -> u32 {
        self.0 % 100
    }

    /// The `YYYYMMDD` part as a date, if it is one
    pub fn day(&self) -> Option<NaiveDate> {
        let stamp = self.0 / 100;
        NaiveDate::from_ymd_opt((stamp / 10000) as i32, (stamp / 100) % 100, stamp % 100)
    }

    /// Revision after one membership change observed on `today`
    pub fn next(self, today: NaiveDate) -> Self {
        match self.day() {
            Some(day) if day >= today => {
                if self.counter() < MAX_DAILY_SERIAL {
                    Self(self.0 + 1)
                } else {
                    day.checked_add_days(Days::new(1))
                        .map(Self::start_of)
                        .unwrap_or(self)
                }
            }
            _ => Self::start_of(today),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

fn day_stamp(day: NaiveDate) -> u32 {
    day.year() as u32 * 10000 + day.month() * 100 + day.day()
}

/// Shared SOA serial, advanced on every membership change
pub struct ZoneRevision {
    current: AtomicU32,
    clock: Box<dyn Clock>,
}

impl ZoneRevision {
    /// Tracker on the UTC wall clock
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// Tracker starting at `<today>00` on `clock`
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        let start = Revision::start_of(clock.today());
        Self {
            current: AtomicU32::new(start.serial()),
            clock,
        }
    }

    pub fn current(&self) -> Revision {
        Revision(self.current.load(Ordering::SeqCst))
    }

    /// Advance the serial, returning the new revision
    pub fn update(&self) -> Revision {
        let today = self.clock.today();
        let previous = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |serial| {
                Some(Revision(serial).next(today).serial())
            })
            .unwrap_or_else(|serial| serial);

        let updated = Revision(previous).next(today);
        debug!("Updating revision from {} to {}", Revision(previous), updated);
        updated
    }
}

impl Default for ZoneRevision {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ZoneRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneRevision")
            .field("current", &self.current())
            .finish()
    }
}
