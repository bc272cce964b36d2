//! Domain enums shared between the services

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ParseEnumError;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Competition a trophy is awarded for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Competition {
    #[serde(rename = "UCL")]
    Ucl,
    #[serde(rename = "EUROPA")]
    Europa,
}

impl Competition {
    pub const ALL: [Competition; 2] = [Competition::Ucl, Competition::Europa];

    pub fn as_str(&self) -> &'static str {
        match self {
            Competition::Ucl => "UCL",
            Competition::Europa => "EUROPA",
        }
    }
}

impl FromStr for Competition {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UCL" => Ok(Competition::Ucl),
            "EUROPA" => Ok(Competition::Europa),
            other => Err(ParseEnumError {
                kind: "competition",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
