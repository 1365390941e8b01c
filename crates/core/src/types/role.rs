//! Role and gender enums shared between the client and its front ends.

use serde::{Deserialize, Serialize};

/// Role tag carried by an authenticated identity.
///
/// Route guards grant access when the user holds any of the roles a route
/// requires. Administrators have no cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Back-office administrator.
    Admin,
    /// Shopper with a server-side cart and profile.
    Customer,
    /// Catalog supplier.
    Vendor,
    /// Unauthenticated visitor.
    Guest,
}

impl UserRole {
    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
            Self::Vendor => "vendor",
            Self::Guest => "guest",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            "vendor" => Ok(Self::Vendor),
            "guest" => Ok(Self::Guest),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Gender as accepted by the profile endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "M" | "MALE" => Ok(Self::Male),
            "F" | "FEMALE" => Ok(Self::Female),
            _ => Err(format!("invalid gender: {s}")),
        }
    }
}
