use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::rbac::{Action, Grant, Resource, Role};

/// Authenticated caller identity for one request.
///
/// Built by the session resolver after the bearer token and the user store
/// agree on who is calling. The grant set is derived from the stored role at
/// construction time; a Session is never partially populated and is dropped
/// at the end of the request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub grants: BTreeSet<Grant>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        user_id: Uuid,
        name: Option<String>,
        email: String,
        role: Role,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            name,
            email,
            role,
            grants: role.grants(),
            expires_at,
        }
    }

    pub fn has_grant(&self, resource: Resource, action: Action) -> bool {
        self.grants.contains(&Grant { resource, action })
    }
}
