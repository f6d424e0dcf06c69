//! Route-level permission checks.
//!
//! Every admin service calls one of these before touching the store. A
//! denial bumps the forbidden counter and logs the action and resource.

use docket_core::{authorize, Identity, Permission};

use crate::domains::errors::ServiceError;
use crate::infra::metrics;

fn deny(permission: Permission, action: &'static str) -> ServiceError {
    let resource = permission.as_str();
    metrics::forbidden_access(resource);
    tracing::warn!(
        event = "forbidden",
        action = action,
        resource = resource,
        "Access denied"
    );
    ServiceError::Forbidden("forbidden")
}

/// Super admins and holders of `permission` pass.
pub fn require(
    identity: &Identity,
    permission: Permission,
    action: &'static str,
) -> Result<(), ServiceError> {
    if authorize(identity, None, &permission.required_for()) {
        Ok(())
    } else {
        Err(deny(permission, action))
    }
}

/// As [`require`], but the owner of the target resource also passes.
pub fn require_owner_or(
    identity: &Identity,
    owner_id: Option<i64>,
    permission: Permission,
    action: &'static str,
) -> Result<(), ServiceError> {
    if authorize(identity, owner_id, &permission.required_for()) {
        Ok(())
    } else {
        Err(deny(permission, action))
    }
}

pub fn has(identity: &Identity, permission: Permission) -> bool {
    authorize(identity, None, &permission.required_for())
}
