//! Role model
//!
//! The four positions of a chain, ordered downstream to upstream:
//! Shop → Retailer → Wholesaler → Factory. Role is a closed enum; the
//! per-variant demand source below is what produces the bullwhip effect
//! structurally — only the Shop ever sees true end-customer demand, every
//! other role's "demand" is its downstream neighbor's order volume.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A position in the supply chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Shop,
    Retailer,
    Wholesaler,
    Factory,
}

/// Where a role's weekly demand comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandSource {
    /// End-customer orders (Shop only)
    Customer,
    /// The order stream placed by this downstream neighbor
    Downstream(Role),
}

impl Role {
    /// All roles in chain order, downstream first.
    pub const CHAIN_ORDER: [Role; 4] = [Role::Shop, Role::Retailer, Role::Wholesaler, Role::Factory];

    /// Position in [`Role::CHAIN_ORDER`] (Shop = 0, Factory = 3).
    pub fn index(self) -> usize {
        match self {
            Role::Shop => 0,
            Role::Retailer => 1,
            Role::Wholesaler => 2,
            Role::Factory => 3,
        }
    }

    /// The role this one orders from, `None` for the Factory (it produces).
    pub fn upstream(self) -> Option<Role> {
        match self {
            Role::Shop => Some(Role::Retailer),
            Role::Retailer => Some(Role::Wholesaler),
            Role::Wholesaler => Some(Role::Factory),
            Role::Factory => None,
        }
    }

    /// The role that orders from this one, `None` for the Shop.
    pub fn downstream(self) -> Option<Role> {
        match self {
            Role::Shop => None,
            Role::Retailer => Some(Role::Shop),
            Role::Wholesaler => Some(Role::Retailer),
            Role::Factory => Some(Role::Wholesaler),
        }
    }

    /// Demand source table (see module docs).
    pub fn demand_source(self) -> DemandSource {
        match self.downstream() {
            None => DemandSource::Customer,
            Some(role) => DemandSource::Downstream(role),
        }
    }

    /// Stable string form, matching the wire/config spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Shop => "Shop",
            Role::Retailer => "Retailer",
            Role::Wholesaler => "Wholesaler",
            Role::Factory => "Factory",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized role names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Shop" => Ok(Role::Shop),
            "Retailer" => Ok(Role::Retailer),
            "Wholesaler" => Ok(Role::Wholesaler),
            "Factory" => Ok(Role::Factory),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
