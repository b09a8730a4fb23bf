//! Caller identity and role checks
//!
//! The session/identity collaborator only tells us who is calling and with
//! which role. This module decides what that role may do.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of the current caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Employee,
    Veterinarian,
    Visitor,
    Anonymous,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Employee => "employee",
            Role::Veterinarian => "veterinarian",
            Role::Visitor => "visitor",
            Role::Anonymous => "anonymous",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "administrator" | "admin" => Role::Administrator,
            "employee" | "staff" => Role::Employee,
            "veterinarian" | "vet" => Role::Veterinarian,
            "visitor" => Role::Visitor,
            _ => Role::Anonymous,
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        use Permission::*;

        match self {
            Role::Administrator => matches!(
                permission,
                ViewAnimals | ManageAnimals | ManageHabitats | ViewFeeding | ViewReports
            ),
            Role::Veterinarian => matches!(
                permission,
                ViewAnimals
                    | ManageAnimals
                    | ViewFeeding
                    | OverrideFeeding
                    | RecordHealth
                    | CommentHabitat
                    | ViewReports
            ),
            Role::Employee | Role::Visitor | Role::Anonymous => permission == ViewAnimals,
        }
    }
}

/// Something a caller may be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewAnimals,
    ManageAnimals,
    ManageHabitats,
    ViewFeeding,
    /// Persist a hand-edited recommended food quantity
    OverrideFeeding,
    RecordHealth,
    CommentHabitat,
    ViewReports,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewAnimals => "view_animals",
            Permission::ManageAnimals => "manage_animals",
            Permission::ManageHabitats => "manage_habitats",
            Permission::ViewFeeding => "view_feeding",
            Permission::OverrideFeeding => "override_feeding",
            Permission::RecordHealth => "record_health",
            Permission::CommentHabitat => "comment_habitat",
            Permission::ViewReports => "view_reports",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Role '{}' is not allowed to {}", .role.as_str(), .permission.as_str())]
    Forbidden { role: Role, permission: Permission },

    #[error("This operation needs an identified caller (set ARCADIA_USER_ID)")]
    MissingIdentity,
}

/// The identity behind the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: Option<i64>,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: Option<i64>, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn anonymous() -> Self {
        Self::new(None, Role::Anonymous)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AccessError> {
        if self.role.grants(permission) {
            Ok(())
        } else {
            Err(AccessError::Forbidden {
                role: self.role,
                permission,
            })
        }
    }

    /// Check a permission and return the caller's user id
    pub fn require_identified(&self, permission: Permission) -> Result<i64, AccessError> {
        self.require(permission)?;
        self.user_id.ok_or(AccessError::MissingIdentity)
    }
}

/// Source of the current caller's identity
pub trait IdentityProvider: Send + Sync {
    fn current_caller(&self) -> Caller;
}

/// Identity fixed at start-up, for a single-operator stdio session
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    caller: Caller,
}

impl StaticIdentity {
    pub fn new(caller: Caller) -> Self {
        Self { caller }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_caller(&self) -> Caller {
        self.caller
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from_str("VETERINARIAN"), Role::Veterinarian);
        assert_eq!(Role::from_str("vet"), Role::Veterinarian);
        assert_eq!(Role::from_str("Admin"), Role::Administrator);
        assert_eq!(Role::from_str("employee"), Role::Employee);
        assert_eq!(Role::from_str("visitor"), Role::Visitor);
        assert_eq!(Role::from_str("zookeeper-in-chief"), Role::Anonymous);
    }

    #[test]
    fn test_only_veterinarians_override_feeding() {
        assert!(Role::Veterinarian.grants(Permission::OverrideFeeding));
        assert!(!Role::Administrator.grants(Permission::OverrideFeeding));
        assert!(!Role::Employee.grants(Permission::OverrideFeeding));
        assert!(!Role::Anonymous.grants(Permission::OverrideFeeding));
    }

    #[test]
    fn test_feeding_view_is_vet_or_admin() {
        assert!(Role::Veterinarian.grants(Permission::ViewFeeding));
        assert!(Role::Administrator.grants(Permission::ViewFeeding));
        assert!(!Role::Employee.grants(Permission::ViewFeeding));
        assert!(!Role::Visitor.grants(Permission::ViewFeeding));
    }

    #[test]
    fn test_habitat_management_is_admin_only() {
        assert!(Role::Administrator.grants(Permission::ManageHabitats));
        assert!(!Role::Veterinarian.grants(Permission::ManageHabitats));
        assert!(Role::Veterinarian.grants(Permission::CommentHabitat));
    }

    #[test]
    fn test_everyone_can_view_animals() {
        for role in [
            Role::Administrator,
            Role::Employee,
            Role::Veterinarian,
            Role::Visitor,
            Role::Anonymous,
        ] {
            assert!(role.grants(Permission::ViewAnimals));
        }
    }

    #[test]
    fn test_require_reports_role_and_permission() {
        let caller = Caller::new(Some(3), Role::Employee);
        let err = caller.require(Permission::RecordHealth).unwrap_err();
        assert_eq!(
            err,
            AccessError::Forbidden {
                role: Role::Employee,
                permission: Permission::RecordHealth
            }
        );
        assert_eq!(
            err.to_string(),
            "Role 'employee' is not allowed to record_health"
        );
    }

    #[test]
    fn test_require_identified() {
        let vet = Caller::new(Some(7), Role::Veterinarian);
        assert_eq!(vet.require_identified(Permission::RecordHealth), Ok(7));

        let unnamed_vet = Caller::new(None, Role::Veterinarian);
        assert_eq!(
            unnamed_vet.require_identified(Permission::RecordHealth),
            Err(AccessError::MissingIdentity)
        );
    }

    #[test]
    fn test_static_identity() {
        let provider = StaticIdentity::new(Caller::new(Some(1), Role::Administrator));
        assert_eq!(provider.current_caller().role, Role::Administrator);
        assert_eq!(provider.current_caller().user_id, Some(1));
    }
}
