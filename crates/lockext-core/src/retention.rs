//! Retention date arithmetic.
//!
//! Two values are derived from "now" on every invocation:
//!
//! - the **cutoff** date, used by the eligibility query to select objects
//!   whose lock expires on or before it;
//! - the **retain-until** timestamp, applied to those objects by the bulk job.
//!
//! Both are pure functions of their inputs. "Now" is always passed in so the
//! calculations are reproducible in tests.

use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Span, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

/// Upper bound accepted for any single day count.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Computes the eligibility cutoff: the UTC calendar date of `now` plus
/// `min_retention_days + safety_margin_days`.
///
/// Saturates at [`Date::MAX`] for day counts outside the calendar range.
#[must_use]
pub fn compute_cutoff(now: Timestamp, min_retention_days: u32, safety_margin_days: u32) -> Date {
    let today = now.to_zoned(TimeZone::UTC).date();
    let days = i64::from(min_retention_days) + i64::from(safety_margin_days);

    match Span::new().try_days(days) {
        Ok(span) => today.saturating_add(span),
        Err(_) => Date::MAX,
    }
}

/// Computes the retain-until timestamp applied by the bulk job:
/// `now + min_retention_days + buffer_days` whole days.
pub fn compute_retain_until(
    now: Timestamp,
    min_retention_days: u32,
    buffer_days: u32,
) -> Result<Timestamp> {
    let days = i64::from(min_retention_days) + i64::from(buffer_days);
    let offset = SignedDuration::from_hours(days * 24);

    now.checked_add(offset).map_err(|err| {
        Error::from_source(ErrorKind::InvalidInput, err)
            .with_message(format!("Retain-until date overflows {days} days from now"))
    })
}

/// Retention settings shared by both pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Minimum retention period every locked object must keep.
    pub min_retention_days: u32,
    /// Extra days added to the cutoff so objects are picked up early.
    pub safety_margin_days: u32,
    /// Extra days added on top of the minimum when extending a lock.
    pub buffer_days: u32,
}

impl RetentionPolicy {
    /// Creates a new retention policy.
    pub fn new(min_retention_days: u32, safety_margin_days: u32, buffer_days: u32) -> Self {
        Self {
            min_retention_days,
            safety_margin_days,
            buffer_days,
        }
    }

    /// Checks every day count against [`MAX_RETENTION_DAYS`].
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("min_retention_days", self.min_retention_days),
            ("safety_margin_days", self.safety_margin_days),
            ("buffer_days", self.buffer_days),
        ];

        for (name, value) in fields {
            if value > MAX_RETENTION_DAYS {
                return Err(Error::configuration(format!(
                    "{name} must be at most {MAX_RETENTION_DAYS}, got {value}"
                ))
                .with_context(name));
            }
        }

        Ok(())
    }

    /// Eligibility cutoff for an invocation running at `now`.
    #[must_use]
    pub fn cutoff(&self, now: Timestamp) -> Date {
        compute_cutoff(now, self.min_retention_days, self.safety_margin_days)
    }

    /// Retain-until timestamp for a job submitted at `now`.
    pub fn retain_until(&self, now: Timestamp) -> Result<Timestamp> {
        compute_retain_until(now, self.min_retention_days, self.buffer_days)
    }
}
