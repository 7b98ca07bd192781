//! Database operation flag set.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A set of database operations, used to declare which anonymous writes an
/// entity type permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DbOperation(u8);

impl DbOperation {
    /// No operation.
    pub const NONE: Self = Self(0);
    /// Read.
    pub const READ: Self = Self(1 << 0);
    /// Create.
    pub const CREATE: Self = Self(1 << 1);
    /// Update.
    pub const UPDATE: Self = Self(1 << 2);
    /// Delete.
    pub const DELETE: Self = Self(1 << 3);
    /// Create, update and delete.
    pub const CUD: Self = Self(Self::CREATE.0 | Self::UPDATE.0 | Self::DELETE.0);
    /// Create, read, update and delete.
    pub const CRUD: Self = Self(Self::CUD.0 | Self::READ.0);

    const NAMED: [(Self, &'static str); 4] = [
        (Self::READ, "read"),
        (Self::CREATE, "create"),
        (Self::UPDATE, "update"),
        (Self::DELETE, "delete"),
    ];

    /// Raw bit representation.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Whether every operation in `other` is also in `self`.
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DbOperation {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DbOperation {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DbOperation {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for DbOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(op, _)| self.contains(*op))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

impl FromStr for DbOperation {
    type Err = AppError;

    /// Parses `"create|update"`, `"cud"`, `"crud"`, `"none"` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result = Self::NONE;
        for part in s.split(['|', ',']).map(str::trim).filter(|p| !p.is_empty()) {
            result |= match part.to_lowercase().as_str() {
                "none" => Self::NONE,
                "read" => Self::READ,
                "create" => Self::CREATE,
                "update" => Self::UPDATE,
                "delete" => Self::DELETE,
                "cud" => Self::CUD,
                "crud" => Self::CRUD,
                _ => {
                    return Err(AppError::validation(format!(
                        "Invalid database operation: '{part}'. Expected one of: none, read, create, update, delete, cud, crud"
                    )));
                }
            };
        }
        Ok(result)
    }
}
