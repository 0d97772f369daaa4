//! Source of "now" for date computations.

use jiff::Timestamp;
use lockext_core::TriggerEvent;

/// Source of the current instant.
///
/// Stages read the instant through [`Clock::event_now`], which prefers the
/// time recorded on the triggering event. The clock itself is consulted
/// only for events that carry no time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// The system clock.
    #[default]
    System,
    /// A fixed instant.
    Fixed(Timestamp),
}

impl Clock {
    /// Reads the current instant.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        match self {
            Self::System => Timestamp::now(),
            Self::Fixed(timestamp) => *timestamp,
        }
    }

    /// The instant every date for `event` is computed from.
    #[must_use]
    pub fn event_now(&self, event: &TriggerEvent) -> Timestamp {
        event.event_time.unwrap_or_else(|| self.now())
    }
}
