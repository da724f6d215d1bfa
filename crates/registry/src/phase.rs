// registry/src/phase.rs

use crate::{EventConfig, RegistryError, RegistryResult, WelfareConfig};
use ledger_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an Event registry is in its timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventPhase {
    Pending,
    SignupOpen,
    AwaitingEvent,
    EventLive,
    Closed,
}

impl EventPhase {
    pub fn at(config: &EventConfig, now: Timestamp) -> Self {
        if now < config.signup_start_time {
            EventPhase::Pending
        } else if now <= config.signup_end_time {
            EventPhase::SignupOpen
        } else if now < config.event_start_time {
            EventPhase::AwaitingEvent
        } else if now <= config.event_end_time {
            EventPhase::EventLive
        } else {
            EventPhase::Closed
        }
    }
}

impl fmt::Display for EventPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventPhase::Pending => "pending",
            EventPhase::SignupOpen => "signup-open",
            EventPhase::AwaitingEvent => "awaiting-event",
            EventPhase::EventLive => "event-live",
            EventPhase::Closed => "closed",
        };
        write!(f, "{}", label)
    }
}

/// Where a Welfare registry is in its timeline.
///
/// Redemption is accepted from sign-up onwards, so there is no gap between
/// the signup window and the redemption window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelfarePhase {
    Pending,
    SignupOpen,
    RedemptionOpen,
    Closed,
}

impl WelfarePhase {
    pub fn at(config: &WelfareConfig, now: Timestamp) -> Self {
        if now < config.signup_start_time {
            WelfarePhase::Pending
        } else if now <= config.signup_end_time {
            WelfarePhase::SignupOpen
        } else if now <= config.redemption_end_time {
            WelfarePhase::RedemptionOpen
        } else {
            WelfarePhase::Closed
        }
    }
}

impl fmt::Display for WelfarePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WelfarePhase::Pending => "pending",
            WelfarePhase::SignupOpen => "signup-open",
            WelfarePhase::RedemptionOpen => "redemption-open",
            WelfarePhase::Closed => "closed",
        };
        write!(f, "{}", label)
    }
}

/// Both ends of the signup window are inclusive
pub(crate) fn check_signup_window(start: Timestamp, end: Timestamp, now: Timestamp) -> RegistryResult<()> {
    if now < start {
        return Err(RegistryError::SignupNotStarted);
    }
    if now > end {
        return Err(RegistryError::SignupEnded);
    }
    Ok(())
}
