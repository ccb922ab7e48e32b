use serde::{Deserialize, Serialize};

/// Role of an identity record.
///
/// The role set is closed and unordered. `Admin` is only special in that at
/// least one administrator must exist once bootstrap has created one; there is
/// no hierarchy between roles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Default-deny baseline role.
    #[default]
    User,
    /// Administrator; carries the cardinality invariant.
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coerce an untrusted role value into a member of the closed role set.
///
/// Anything that is not exactly `"admin"` or `"user"` collapses to the
/// default-deny `user` role. Total; never fails.
pub fn normalize_role(value: &str) -> Role {
    match value {
        "admin" => Role::Admin,
        _ => Role::User,
    }
}
