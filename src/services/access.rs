//! Permission gate for the REST projection

use axum::http::Method;

use crate::{
    error::{AppError, AppResult},
    models::{Actor, Permission},
};

/// Two-level access decision for REST-style resources
pub trait AccessPolicy: Send + Sync {
    /// Collection level, evaluated for every request
    fn has_permission(&self, actor: &Actor, method: &Method) -> bool;

    /// Single-record level, evaluated once the record is loaded
    fn has_object_permission(&self, actor: &Actor, method: &Method) -> bool;
}

pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Grants access to holders of `catalog.can_mark_returned`.
///
/// The object level only re-checks safe methods; mutating methods are left to
/// the collection level, which [`authorize`] always evaluates first.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanMarkReturned;

impl AccessPolicy for CanMarkReturned {
    fn has_permission(&self, actor: &Actor, _method: &Method) -> bool {
        actor.has_perm(Permission::CanMarkReturned)
    }

    fn has_object_permission(&self, actor: &Actor, method: &Method) -> bool {
        if is_safe_method(method) {
            actor.has_perm(Permission::CanMarkReturned)
        } else {
            true
        }
    }
}

/// Run the collection check, then the object check when a record is involved
pub fn authorize(
    policy: &dyn AccessPolicy,
    actor: &Actor,
    method: &Method,
    object_level: bool,
) -> AppResult<()> {
    let granted = policy.has_permission(actor, method)
        && (!object_level || policy.has_object_permission(actor, method));

    if granted {
        Ok(())
    } else {
        tracing::warn!(user = %actor.username, method = %method, "REST access denied");
        Err(AppError::Authorization(format!(
            "Permission {} required",
            Permission::CanMarkReturned
        )))
    }
}
