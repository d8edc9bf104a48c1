//! Error types for configuring and controlling schedules.

/// Error from building or controlling a [`Schedule`](crate::Schedule).
///
/// Configuration errors (`MissingWork`, `MissingPeriod`) surface from
/// [`ScheduleBuilder::build`](crate::ScheduleBuilder::build); state errors
/// (`AlreadyRunning`, `NotRunning`) surface from
/// [`Schedule::start`](crate::Schedule::start) and
/// [`Schedule::stop`](crate::Schedule::stop). All are synchronous and
/// immediate - never deferred to a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// `start()` was called on a schedule that is already running.
    AlreadyRunning,
    /// `stop()` was called on a schedule that is not running.
    NotRunning,
    /// The builder was finalized without a work function.
    MissingWork,
    /// The builder was finalized without a period.
    MissingPeriod,
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "schedule is already running"),
            Self::NotRunning => write!(f, "schedule is not running"),
            Self::MissingWork => write!(f, "schedule requires a work function"),
            Self::MissingPeriod => write!(f, "schedule requires a period"),
        }
    }
}

impl std::error::Error for ScheduleError {}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ScheduleError::AlreadyRunning.to_string(),
            "schedule is already running"
        );
        assert_eq!(
            ScheduleError::NotRunning.to_string(),
            "schedule is not running"
        );
        assert_eq!(
            ScheduleError::MissingWork.to_string(),
            "schedule requires a work function"
        );
        assert_eq!(
            ScheduleError::MissingPeriod.to_string(),
            "schedule requires a period"
        );
    }
}
