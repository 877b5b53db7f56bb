//! Pricing plan lookup table
//!
//! Plans bound how aggressively a customer may run campaigns: how many
//! accounts a tick may use, the minimum campaign interval, and the daily
//! per-account message allowance.

use crate::{Error, Result};

/// Static description of one pricing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPlan {
    pub name: &'static str,
    /// Maximum accounts a campaign tick may dispatch through
    pub accounts: i64,
    /// Lower bound for Campaign.interval_minutes
    pub min_interval_minutes: i64,
    /// Daily send allowance per account
    pub daily_messages_per_account: i64,
}

const PLANS: &[PricingPlan] = &[
    PricingPlan {
        name: "solo",
        accounts: 1,
        min_interval_minutes: 30,
        daily_messages_per_account: 40,
    },
    PricingPlan {
        name: "starter",
        accounts: 2,
        min_interval_minutes: 15,
        daily_messages_per_account: 80,
    },
    PricingPlan {
        name: "growth",
        accounts: 5,
        min_interval_minutes: 10,
        daily_messages_per_account: 150,
    },
    PricingPlan {
        name: "pro",
        accounts: 10,
        min_interval_minutes: 5,
        daily_messages_per_account: 300,
    },
];

/// Look up a plan by name
pub fn get_plan(name: &str) -> Result<PricingPlan> {
    PLANS
        .iter()
        .find(|p| p.name == name)
        .copied()
        .ok_or_else(|| Error::Validation(format!("Unknown pricing plan: {}", name)))
}

/// Validate a campaign interval against the owner's plan.
///
/// Surfaced synchronously at campaign create/update time; never persisted,
/// never retried.
pub fn validate_campaign_interval(interval_minutes: i64, plan_name: &str) -> Result<()> {
    let plan = get_plan(plan_name)?;

    if interval_minutes < plan.min_interval_minutes {
        return Err(Error::Validation(format!(
            "Plan '{}' requires a minimum interval of {} minutes",
            plan.name, plan.min_interval_minutes
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_plan_known() {
        let plan = get_plan("growth").unwrap();
        assert_eq!(plan.accounts, 5);
        assert_eq!(plan.min_interval_minutes, 10);
        assert_eq!(plan.daily_messages_per_account, 150);
    }

    #[test]
    fn test_get_plan_unknown() {
        assert!(get_plan("enterprise").is_err());
    }

    #[test]
    fn test_interval_validation() {
        assert!(validate_campaign_interval(30, "solo").is_ok());
        assert!(validate_campaign_interval(29, "solo").is_err());
        assert!(validate_campaign_interval(5, "pro").is_ok());
    }
}
