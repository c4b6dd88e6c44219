/*!
 * # Role gate
 *
 * Closed set of user roles and the middleware that admits a request only
 * when the authenticated user's role is on a route's allow-list.
 */

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::warn;

use super::{AuthError, AuthUser};

/// User role carried in the `role` claim.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Supervisor,
}

impl Role {
    /// Parses a claim value; anything unrecognized yields `None`.
    pub fn from_claim(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

/// Allow-list of roles for a group of routes.
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Arc<[Role]>,
}

impl RoleGate {
    pub fn new(allowed: &[Role]) -> Self {
        Self {
            allowed: Arc::from(allowed),
        }
    }

    pub fn allows(&self, role: Option<Role>) -> bool {
        role.map_or(false, |role| self.allowed.contains(&role))
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }
}

lazy_static! {
    /// Routes open to every signed-in role.
    pub static ref ANY_ROLE: RoleGate = RoleGate::new(&[Role::Admin, Role::Supervisor]);
    /// Routes reserved for administrators.
    pub static ref ADMIN_ONLY: RoleGate = RoleGate::new(&[Role::Admin]);
}

/// 401 without an authenticated user, 403 when the user's role is not
/// allowed, otherwise the request continues.
pub async fn role_gate_middleware(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !gate.allows(user.role) {
        warn!(
            user_id = %user.user_id,
            role = ?user.role,
            allowed = ?gate.allowed(),
            path = %request.uri().path(),
            "Role not permitted"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("admin", Some(Role::Admin))]
    #[case(" supervisor ", Some(Role::Supervisor))]
    #[case("manager", None)]
    #[case("", None)]
    fn roles_parse_from_claims(#[case] raw: &str, #[case] expected: Option<Role>) {
        assert_eq!(Role::from_claim(raw), expected);
    }

    #[test]
    fn gates_only_admit_listed_roles() {
        assert!(ADMIN_ONLY.allows(Some(Role::Admin)));
        assert!(!ADMIN_ONLY.allows(Some(Role::Supervisor)));
        assert!(ANY_ROLE.allows(Some(Role::Supervisor)));
        assert!(!ANY_ROLE.allows(None));
    }

    #[test]
    fn role_display_matches_claim_value() {
        assert_eq!(Role::Supervisor.to_string(), "supervisor");
        assert_eq!(Role::Admin.as_ref(), "admin");
    }
}
