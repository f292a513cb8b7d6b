//! Plan tiers, numeric limits, and feature gates
//!
//! A static lookup mapping a tenant's plan tier to numeric caps and
//! boolean capability gates. Immutable at runtime; changing a tier's
//! shape requires a deploy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plan tiers, ordered from most to least restricted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Pro,
    Agency,
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanTier::Free => write!(f, "free"),
            PlanTier::Starter => write!(f, "starter"),
            PlanTier::Pro => write!(f, "pro"),
            PlanTier::Agency => write!(f, "agency"),
        }
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanTier::Free),
            "starter" => Ok(PlanTier::Starter),
            "pro" => Ok(PlanTier::Pro),
            "agency" => Ok(PlanTier::Agency),
            other => Err(format!("unknown plan tier: {}", other)),
        }
    }
}

/// Gated capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Surveys,
    Payroll,
    Workflows,
    ClientPortal,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Surveys => write!(f, "surveys"),
            Feature::Payroll => write!(f, "payroll"),
            Feature::Workflows => write!(f, "workflows"),
            Feature::ClientPortal => write!(f, "client portal"),
        }
    }
}

/// Numeric caps for a plan tier; None means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub max_clients: Option<u32>,
    pub max_projects: Option<u32>,
    pub max_members: Option<u32>,
    pub max_invoices_per_month: Option<u32>,
}

/// Limits for a plan tier
pub fn limits_for(tier: PlanTier) -> PlanLimits {
    match tier {
        PlanTier::Free => PlanLimits {
            max_clients: Some(10),
            max_projects: Some(3),
            max_members: Some(2),
            max_invoices_per_month: Some(5),
        },
        PlanTier::Starter => PlanLimits {
            max_clients: Some(100),
            max_projects: Some(20),
            max_members: Some(5),
            max_invoices_per_month: Some(50),
        },
        PlanTier::Pro => PlanLimits {
            max_clients: Some(1000),
            max_projects: Some(200),
            max_members: Some(25),
            max_invoices_per_month: None,
        },
        PlanTier::Agency => PlanLimits {
            max_clients: None,
            max_projects: None,
            max_members: None,
            max_invoices_per_month: None,
        },
    }
}

impl PlanTier {
    /// Whether this tier may use the given capability
    pub fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::Surveys => *self >= PlanTier::Pro,
            Feature::Workflows => *self >= PlanTier::Pro,
            Feature::Payroll => *self >= PlanTier::Agency,
            Feature::ClientPortal => *self >= PlanTier::Agency,
        }
    }
}

impl PlanLimits {
    /// Whether `current` more rows may be added under `cap`
    pub fn within(cap: Option<u32>, current: u32) -> bool {
        match cap {
            Some(limit) => current < limit,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(PlanTier::Agency > PlanTier::Pro);
        assert!(PlanTier::Pro > PlanTier::Starter);
        assert!(PlanTier::Starter > PlanTier::Free);
    }

    #[test]
    fn test_feature_gates() {
        assert!(!PlanTier::Free.allows(Feature::Surveys));
        assert!(!PlanTier::Starter.allows(Feature::Surveys));
        assert!(PlanTier::Pro.allows(Feature::Surveys));
        assert!(PlanTier::Pro.allows(Feature::Workflows));
        assert!(!PlanTier::Pro.allows(Feature::Payroll));
        assert!(PlanTier::Agency.allows(Feature::Payroll));
        assert!(PlanTier::Agency.allows(Feature::ClientPortal));
    }

    #[test]
    fn test_caps() {
        let free = limits_for(PlanTier::Free);
        assert!(PlanLimits::within(free.max_clients, 9));
        assert!(!PlanLimits::within(free.max_clients, 10));
        // Unlimited tiers always admit more
        let agency = limits_for(PlanTier::Agency);
        assert!(PlanLimits::within(agency.max_clients, 1_000_000));
    }

    #[test]
    fn test_tier_parse_round_trip() {
        for tier in [PlanTier::Free, PlanTier::Starter, PlanTier::Pro, PlanTier::Agency] {
            assert_eq!(tier.to_string().parse::<PlanTier>().unwrap(), tier);
        }
        assert!("platinum".parse::<PlanTier>().is_err());
    }
}
