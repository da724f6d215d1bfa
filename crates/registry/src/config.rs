// registry/src/config.rs

use crate::{RegistryError, RegistryResult};
use ledger_core::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Construction parameters of an Event registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConfig {
    pub name: String,
    pub description: String,
    pub max_capacity: u32,
    pub signup_start_time: Timestamp,
    pub signup_end_time: Timestamp,
    pub event_start_time: Timestamp,
    pub event_end_time: Timestamp,
    /// Paid to each attendee on check-in
    pub reward_cost: Amount,
}

impl EventConfig {
    /// Check capacity and the ordering
    /// `signup_start < signup_end <= event_start < event_end`
    pub fn validate(&self) -> RegistryResult<()> {
        validate_capacity(self.max_capacity)?;
        validate_signup_window(self.signup_start_time, self.signup_end_time)?;

        if self.event_start_time < self.signup_end_time {
            return Err(RegistryError::InvalidConfig(format!(
                "event start {} precedes signup end {}",
                self.event_start_time, self.signup_end_time
            )));
        }
        if self.event_start_time >= self.event_end_time {
            return Err(RegistryError::InvalidConfig(format!(
                "event start {} must be before event end {}",
                self.event_start_time, self.event_end_time
            )));
        }
        Ok(())
    }

    /// Tokens needed to reward every seat: `max_capacity * reward_cost`
    pub fn reward_budget(&self) -> Amount {
        // BigUint multiplication cannot overflow
        self.reward_cost
            .checked_mul(&Amount::from_u64(self.max_capacity as u64))
            .unwrap_or_else(Amount::zero)
    }
}

/// Construction parameters of a Welfare registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelfareConfig {
    pub name: String,
    pub description: String,
    pub max_capacity: u32,
    pub signup_start_time: Timestamp,
    pub signup_end_time: Timestamp,
    pub redemption_end_time: Timestamp,
    /// Pulled from each participant at sign-up
    pub redemption_cost: Amount,
}

impl WelfareConfig {
    /// Check capacity and the ordering
    /// `signup_start < signup_end <= redemption_end`
    pub fn validate(&self) -> RegistryResult<()> {
        validate_capacity(self.max_capacity)?;
        validate_signup_window(self.signup_start_time, self.signup_end_time)?;

        if self.redemption_end_time < self.signup_end_time {
            return Err(RegistryError::InvalidConfig(format!(
                "redemption end {} precedes signup end {}",
                self.redemption_end_time, self.signup_end_time
            )));
        }
        Ok(())
    }
}

fn validate_capacity(max_capacity: u32) -> RegistryResult<()> {
    if max_capacity == 0 {
        return Err(RegistryError::InvalidConfig("max capacity must be positive".into()));
    }
    Ok(())
}

fn validate_signup_window(start: Timestamp, end: Timestamp) -> RegistryResult<()> {
    if start >= end {
        return Err(RegistryError::InvalidConfig(format!(
            "signup start {} must be before signup end {}",
            start, end
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_config() -> EventConfig {
        EventConfig {
            name: "Blockchain Event".into(),
            description: "Learn about smart contracts".into(),
            max_capacity: 2,
            signup_start_time: 100,
            signup_end_time: 1000,
            event_start_time: 1100,
            event_end_time: 2000,
            reward_cost: Amount::from_u64(2),
        }
    }

    fn welfare_config() -> WelfareConfig {
        WelfareConfig {
            name: "Test Welfare".into(),
            description: "A test welfare for redemption".into(),
            max_capacity: 3,
            signup_start_time: 60,
            signup_end_time: 120,
            redemption_end_time: 180,
            redemption_cost: Amount::from_u64(2),
        }
    }

    #[test]
    fn test_valid_configs() {
        assert!(event_config().validate().is_ok());
        assert!(welfare_config().validate().is_ok());
    }

    #[test]
    fn test_event_may_start_when_signup_ends() {
        let config = EventConfig { event_start_time: 1000, ..event_config() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_event_orderings() {
        let cases = [
            EventConfig { max_capacity: 0, ..event_config() },
            EventConfig { signup_end_time: 100, ..event_config() },
            EventConfig { event_start_time: 999, ..event_config() },
            EventConfig { event_end_time: 1100, ..event_config() },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(RegistryError::InvalidConfig(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_invalid_welfare_orderings() {
        let early_redemption = WelfareConfig { redemption_end_time: 119, ..welfare_config() };
        assert!(early_redemption.validate().is_err());

        let same_end = WelfareConfig { redemption_end_time: 120, ..welfare_config() };
        assert!(same_end.validate().is_ok());
    }

    #[test]
    fn test_reward_budget() {
        assert_eq!(event_config().reward_budget(), Amount::from_u64(4));
    }
}
