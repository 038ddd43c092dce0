use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Closed role enumeration. Role names are validated at principal creation,
/// never accepted verbatim from client input.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[strum(serialize = "ADMIN")]
    Admin,
    #[strum(serialize = "EMPLOYEE")]
    Employee,
}

/// A principal's role set. The portal uses ADMIN/EMPLOYEE as mutually
/// exclusive in practice, but authorization is always a membership test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new(roles: Vec<Role>) -> Self {
        let mut roles = roles;
        roles.dedup();
        RoleSet(roles)
    }

    pub fn employee() -> Self {
        RoleSet(vec![Role::Employee])
    }

    pub fn admin() -> Self {
        RoleSet(vec![Role::Admin])
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    /// Storage form: enum names joined with commas, e.g. "ADMIN,EMPLOYEE".
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(Role::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn from_csv(raw: &str) -> Result<Self, strum::ParseError> {
        let mut roles = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            roles.push(part.parse::<Role>()?);
        }
        Ok(RoleSet::new(roles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trip() {
        let set = RoleSet::new(vec![Role::Admin, Role::Employee]);
        assert_eq!(set.to_csv(), "ADMIN,EMPLOYEE");
        assert_eq!(RoleSet::from_csv("ADMIN,EMPLOYEE").unwrap(), set);
    }

    #[test]
    fn unknown_role_name_is_rejected() {
        assert!(RoleSet::from_csv("SUPERUSER").is_err());
    }

    #[test]
    fn membership_is_a_set_test() {
        let set = RoleSet::employee();
        assert!(set.contains(Role::Employee));
        assert!(!set.contains(Role::Admin));
    }
}
