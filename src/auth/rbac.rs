use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::session::Session;

/// Raised when a string does not name a known role, resource, or action.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("unknown name in permission vocabulary")]
pub struct UnknownName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Operator,
    Viewer,
    TenantViewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::Viewer => "viewer",
            Role::TenantViewer => "tenant_viewer",
        }
    }

    /// Full grant set for this role, derived from the permission matrix.
    pub fn grants(&self) -> BTreeSet<Grant> {
        let mut grants = BTreeSet::new();
        for resource in Resource::ALL {
            for action in allowed_actions(*self, resource) {
                grants.insert(Grant {
                    resource,
                    action: *action,
                });
            }
        }
        grants
    }
}

impl FromStr for Role {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "operator" => Ok(Role::Operator),
            "viewer" => Ok(Role::Viewer),
            "tenant_viewer" => Ok(Role::TenantViewer),
            _ => Err(UnknownName),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Sites,
    Racks,
    Devices,
    Cables,
    PowerConfig,
    PowerReadings,
    AccessLogs,
    Reports,
    Users,
    AuditLogs,
    AlertHistory,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Sites,
        Resource::Racks,
        Resource::Devices,
        Resource::Cables,
        Resource::PowerConfig,
        Resource::PowerReadings,
        Resource::AccessLogs,
        Resource::Reports,
        Resource::Users,
        Resource::AuditLogs,
        Resource::AlertHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Sites => "sites",
            Resource::Racks => "racks",
            Resource::Devices => "devices",
            Resource::Cables => "cables",
            Resource::PowerConfig => "power_config",
            Resource::PowerReadings => "power_readings",
            Resource::AccessLogs => "access_logs",
            Resource::Reports => "reports",
            Resource::Users => "users",
            Resource::AuditLogs => "audit_logs",
            Resource::AlertHistory => "alert_history",
        }
    }
}

impl FromStr for Resource {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sites" => Ok(Resource::Sites),
            "racks" => Ok(Resource::Racks),
            "devices" => Ok(Resource::Devices),
            "cables" => Ok(Resource::Cables),
            "power_config" => Ok(Resource::PowerConfig),
            "power_readings" => Ok(Resource::PowerReadings),
            "access_logs" => Ok(Resource::AccessLogs),
            "reports" => Ok(Resource::Reports),
            "users" => Ok(Resource::Users),
            "audit_logs" => Ok(Resource::AuditLogs),
            "alert_history" => Ok(Resource::AlertHistory),
            _ => Err(UnknownName),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(UnknownName),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (resource, action) entitlement held by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub resource: Resource,
    pub action: Action,
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.action.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

const READ: &[Action] = &[Action::Read];
const READ_CREATE: &[Action] = &[Action::Read, Action::Create];
const READ_UPDATE: &[Action] = &[Action::Read, Action::Update];
const READ_UPDATE_DELETE: &[Action] = &[Action::Read, Action::Update, Action::Delete];
const ALL_ACTIONS: &[Action] = &[Action::Read, Action::Create, Action::Update, Action::Delete];
const NONE: &[Action] = &[];

/// Permission matrix: resource -> role -> allowed actions.
pub fn allowed_actions(role: Role, resource: Resource) -> &'static [Action] {
    use Resource::*;
    use Role::*;
    match resource {
        Sites => match role {
            Admin => ALL_ACTIONS,
            Operator | Viewer | TenantViewer => READ,
        },
        Racks => match role {
            Admin | Operator => ALL_ACTIONS,
            Viewer | TenantViewer => READ,
        },
        Devices => match role {
            Admin | Operator => ALL_ACTIONS,
            Viewer | TenantViewer => READ,
        },
        Cables => match role {
            Admin | Operator => ALL_ACTIONS,
            Viewer => READ,
            TenantViewer => NONE,
        },
        PowerConfig => match role {
            Admin => ALL_ACTIONS,
            Operator | Viewer => READ,
            TenantViewer => NONE,
        },
        PowerReadings => match role {
            Admin | Operator | Viewer | TenantViewer => READ,
        },
        AccessLogs => match role {
            Admin | Operator => ALL_ACTIONS,
            Viewer => READ,
            TenantViewer => NONE,
        },
        Reports => match role {
            Admin | Operator | Viewer => READ_CREATE,
            TenantViewer => READ,
        },
        Users => match role {
            Admin => ALL_ACTIONS,
            Operator | Viewer | TenantViewer => NONE,
        },
        AuditLogs => match role {
            Admin | Operator => READ,
            Viewer | TenantViewer => NONE,
        },
        AlertHistory => match role {
            Admin => READ_UPDATE_DELETE,
            Operator => READ_UPDATE,
            Viewer | TenantViewer => READ,
        },
    }
}

/// Pure permission check over the session's grant set. Union semantics:
/// any single matching grant allows; everything else denies.
pub fn evaluate(session: &Session, resource: Resource, action: Action) -> Decision {
    if session.has_grant(resource, action) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// String-boundary variant of [`evaluate`]. Unknown resource or action
/// names deny for every session, no matter what it holds.
pub fn evaluate_names(session: &Session, resource: &str, action: &str) -> Decision {
    match (resource.parse::<Resource>(), action.parse::<Action>()) {
        (Ok(resource), Ok(action)) => evaluate(session, resource, action),
        _ => Decision::Deny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn session_for(role: Role) -> Session {
        Session::new(
            Uuid::from_u128(1),
            Some("Test".to_string()),
            "test@example.com".to_string(),
            role,
            Utc::now() + Duration::hours(1),
        )
    }

    fn empty_session() -> Session {
        let mut session = session_for(Role::Viewer);
        session.grants.clear();
        session
    }

    #[test]
    fn empty_grant_set_denies_everything() {
        let session = empty_session();
        for resource in Resource::ALL {
            for action in ALL_ACTIONS {
                assert_eq!(evaluate(&session, resource, *action), Decision::Deny);
            }
        }
    }

    #[test]
    fn held_grant_allows_regardless_of_other_grants() {
        let admin = session_for(Role::Admin);
        let tenant_viewer = session_for(Role::TenantViewer);
        // Both hold (racks, read); neither's other grants matter
        assert_eq!(evaluate(&admin, Resource::Racks, Action::Read), Decision::Allow);
        assert_eq!(
            evaluate(&tenant_viewer, Resource::Racks, Action::Read),
            Decision::Allow
        );
    }

    #[test]
    fn matrix_matches_role_expectations() {
        let operator = session_for(Role::Operator);
        assert_eq!(evaluate(&operator, Resource::Devices, Action::Create), Decision::Allow);
        assert_eq!(evaluate(&operator, Resource::Sites, Action::Update), Decision::Deny);
        assert_eq!(evaluate(&operator, Resource::Users, Action::Read), Decision::Deny);
        assert_eq!(evaluate(&operator, Resource::AuditLogs, Action::Read), Decision::Allow);

        let viewer = session_for(Role::Viewer);
        assert_eq!(evaluate(&viewer, Resource::AlertHistory, Action::Read), Decision::Allow);
        assert_eq!(evaluate(&viewer, Resource::AlertHistory, Action::Update), Decision::Deny);
        assert_eq!(evaluate(&viewer, Resource::Reports, Action::Create), Decision::Allow);

        let tenant_viewer = session_for(Role::TenantViewer);
        assert_eq!(evaluate(&tenant_viewer, Resource::Cables, Action::Read), Decision::Deny);
        assert_eq!(
            evaluate(&tenant_viewer, Resource::PowerReadings, Action::Read),
            Decision::Allow
        );
    }

    #[test]
    fn unknown_names_deny_even_for_admin() {
        let admin = session_for(Role::Admin);
        assert_eq!(evaluate_names(&admin, "alert_history", "write"), Decision::Deny);
        assert_eq!(evaluate_names(&admin, "unknown_resource", "read"), Decision::Deny);
        assert_eq!(evaluate_names(&admin, "", ""), Decision::Deny);
    }

    #[test]
    fn known_names_parse_and_evaluate() {
        let admin = session_for(Role::Admin);
        assert_eq!(evaluate_names(&admin, "alert_history", "read"), Decision::Allow);
        assert_eq!(evaluate_names(&admin, "users", "delete"), Decision::Allow);
    }

    #[test]
    fn evaluate_is_pure_and_idempotent() {
        let viewer = session_for(Role::Viewer);
        let first = evaluate(&viewer, Resource::Devices, Action::Read);
        let second = evaluate(&viewer, Resource::Devices, Action::Read);
        assert_eq!(first, second);
        assert_eq!(first, Decision::Allow);
    }

    #[test]
    fn vocabulary_round_trips_through_strings() {
        for resource in Resource::ALL {
            assert_eq!(resource.as_str().parse::<Resource>().ok(), Some(resource));
        }
        for action in ALL_ACTIONS {
            assert_eq!(action.as_str().parse::<Action>().ok(), Some(*action));
        }
        for role in [Role::Admin, Role::Operator, Role::Viewer, Role::TenantViewer] {
            assert_eq!(role.as_str().parse::<Role>().ok(), Some(role));
        }
    }

    #[test]
    fn grant_displays_as_resource_action_pair() {
        let grant = Grant {
            resource: Resource::AlertHistory,
            action: Action::Update,
        };
        assert_eq!(grant.to_string(), "alert_history:update");
    }
}
