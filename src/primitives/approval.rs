//! Policies deciding whether the resource owner has to be asked.
//!
//! Before an approval page is shown the flow consults an `ApprovalPolicy`. When it answers that
//! the request is already approved, for example because the owner granted the same scope to the
//! client before, the flow skips the page entirely.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::scope::Scope;
use crate::request::AuthorizationRequest;

/// Decides on pre-approval and learns from explicit approvals.
pub trait ApprovalPolicy {
    /// Whether the request may be approved without asking the owner.
    fn is_pre_approved(&self, request: &AuthorizationRequest, owner_id: &str) -> bool;

    /// Called once the owner explicitly approved a request.
    fn remember_approval(&self, _request: &AuthorizationRequest, _owner_id: &str) {}
}

/// Always asks the resource owner.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverPreApproved;

/// A policy given by a function of request and owner.
pub struct FnPolicy<F>(pub F);

/// Remembers the scope each owner approved for each client.
///
/// A request is pre-approved if its scope is covered by everything the owner has approved for
/// the same client so far.
#[derive(Debug, Default)]
pub struct ApprovalMemory {
    approvals: RwLock<HashMap<(String, String), Scope>>,
}

impl ApprovalPolicy for NeverPreApproved {
    fn is_pre_approved(&self, _: &AuthorizationRequest, _: &str) -> bool {
        false
    }
}

impl<F> ApprovalPolicy for FnPolicy<F>
where
    F: Fn(&AuthorizationRequest, &str) -> bool,
{
    fn is_pre_approved(&self, request: &AuthorizationRequest, owner_id: &str) -> bool {
        (self.0)(request, owner_id)
    }
}

impl ApprovalMemory {
    /// A memory without any approvals.
    pub fn new() -> Self {
        ApprovalMemory::default()
    }

    /// Forget everything the owner approved for the client.
    pub fn revoke(&self, owner_id: &str, client_id: &str) {
        if let Ok(mut approvals) = self.approvals.write() {
            approvals.remove(&(owner_id.to_string(), client_id.to_string()));
        }
    }

    /// The scope the owner approved for the client.
    pub fn approved_scope(&self, owner_id: &str, client_id: &str) -> Option<Scope> {
        let approvals = self.approvals.read().ok()?;
        approvals
            .get(&(owner_id.to_string(), client_id.to_string()))
            .cloned()
    }
}

impl ApprovalPolicy for ApprovalMemory {
    fn is_pre_approved(&self, request: &AuthorizationRequest, owner_id: &str) -> bool {
        let client_id = match request.client_id() {
            Some(client_id) => client_id,
            None => return false,
        };

        match self.approved_scope(owner_id, client_id) {
            Some(approved) => request.scope().allow_access(&approved),
            None => false,
        }
    }

    fn remember_approval(&self, request: &AuthorizationRequest, owner_id: &str) {
        let client_id = match request.client_id() {
            Some(client_id) => client_id,
            None => return,
        };

        if let Ok(mut approvals) = self.approvals.write() {
            let approved = approvals
                .entry((owner_id.to_string(), client_id.to_string()))
                .or_default();
            for token in request.scope().iter() {
                approved.insert(token);
            }
        }
    }
}

impl<'a, P: ApprovalPolicy + ?Sized> ApprovalPolicy for &'a P {
    fn is_pre_approved(&self, request: &AuthorizationRequest, owner_id: &str) -> bool {
        (**self).is_pre_approved(request, owner_id)
    }

    fn remember_approval(&self, request: &AuthorizationRequest, owner_id: &str) {
        (**self).remember_approval(request, owner_id)
    }
}

impl<P: ApprovalPolicy + ?Sized> ApprovalPolicy for Box<P> {
    fn is_pre_approved(&self, request: &AuthorizationRequest, owner_id: &str) -> bool {
        (**self).is_pre_approved(request, owner_id)
    }

    fn remember_approval(&self, request: &AuthorizationRequest, owner_id: &str) {
        (**self).remember_approval(request, owner_id)
    }
}

impl<P: ApprovalPolicy + ?Sized> ApprovalPolicy for Arc<P> {
    fn is_pre_approved(&self, request: &AuthorizationRequest, owner_id: &str) -> bool {
        (**self).is_pre_approved(request, owner_id)
    }

    fn remember_approval(&self, request: &AuthorizationRequest, owner_id: &str) {
        (**self).remember_approval(request, owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(scope: &[&str]) -> AuthorizationRequest {
        AuthorizationRequest::for_client("foo", scope)
    }

    #[test]
    fn never_pre_approves() {
        assert!(!NeverPreApproved.is_pre_approved(&request(&["read"]), "owner"));
    }

    #[test]
    fn function_policies() {
        let only_marissa = FnPolicy(|_: &AuthorizationRequest, owner: &str| owner == "marissa");
        assert!(only_marissa.is_pre_approved(&request(&["read"]), "marissa"));
        assert!(!only_marissa.is_pre_approved(&request(&["read"]), "koala"));
    }

    #[test]
    fn memory_covers_previously_approved_scope() {
        let memory = ApprovalMemory::new();
        assert!(!memory.is_pre_approved(&request(&["read"]), "owner"));

        memory.remember_approval(&request(&["read", "write"]), "owner");
        memory.remember_approval(&request(&["admin"]), "owner");
        assert!(memory.is_pre_approved(&request(&["read"]), "owner"));
        assert!(memory.is_pre_approved(&request(&["write", "admin"]), "owner"));
        assert!(!memory.is_pre_approved(&request(&["delete"]), "owner"));
        assert!(!memory.is_pre_approved(&request(&["read"]), "other"));

        memory.revoke("owner", "foo");
        assert!(!memory.is_pre_approved(&request(&["read"]), "owner"));
    }
}
