//! The approval state of an authorization request.
//!
//! A request is either approved by policy the first time it is seen, or it waits for the
//! resource owner. The owner's decision arrives with a second, separate interaction and moves
//! the request into one of the terminal states.
use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::primitives::approval::ApprovalPolicy;
use crate::request::AuthorizationRequest;

/// Where a request stands with respect to the resource owner's consent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalState {
    /// The request has not been looked at yet. Every request starts here.
    Unknown,

    /// The policy approved the request without asking.
    PreApproved,

    /// The owner has to decide.
    Pending,

    /// The owner approved.
    Approved,

    /// The owner denied, or gave no usable answer.
    Denied,
}

impl Default for ApprovalState {
    fn default() -> Self {
        ApprovalState::Unknown
    }
}

impl ApprovalState {
    /// The states a request may move to from this one.
    ///
    /// `check` leaves `Unknown`, `decide` leaves `Pending`. Terminal states have no successor.
    pub fn successors(self) -> &'static [ApprovalState] {
        match self {
            ApprovalState::Unknown => &[ApprovalState::PreApproved, ApprovalState::Pending],
            ApprovalState::Pending => &[ApprovalState::Approved, ApprovalState::Denied],
            _ => &[],
        }
    }

    /// Whether a code or token may be issued in this state.
    pub fn is_approved(self) -> bool {
        matches!(self, ApprovalState::PreApproved | ApprovalState::Approved)
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApprovalState::PreApproved | ApprovalState::Approved | ApprovalState::Denied
        )
    }
}

/// Moves requests through the approval states.
///
/// Only the working state of a request is changed, its original parameters stay untouched.
pub struct ApprovalCoordinator<'a> {
    policy: &'a dyn ApprovalPolicy,
    approval_parameter: &'a str,
}

impl<'a> ApprovalCoordinator<'a> {
    /// Consult `policy`, reading decisions from the parameter named `approval_parameter`.
    pub fn new(policy: &'a dyn ApprovalPolicy, approval_parameter: &'a str) -> Self {
        ApprovalCoordinator {
            policy,
            approval_parameter,
        }
    }

    /// First sight of a request.
    ///
    /// Returns `PreApproved` and marks the request approved if the policy allows it, `Pending`
    /// otherwise.
    pub fn check(&self, request: &mut AuthorizationRequest, owner_id: &str) -> ApprovalState {
        if self.policy.is_pre_approved(request, owner_id) {
            request.set_approved(true);
            ApprovalState::PreApproved
        } else {
            ApprovalState::Pending
        }
    }

    /// The owner's answer to a pending request.
    ///
    /// The submitted parameters are recorded on the request. A truthy approval parameter gives
    /// `Approved`, anything else `Denied`.
    pub fn decide(
        &self, request: &mut AuthorizationRequest, approval_parameters: BTreeMap<String, String>,
        owner_id: &str,
    ) -> ApprovalState {
        let approved = approval_parameters
            .get(self.approval_parameter)
            .map_or(false, |value| is_truthy(value));

        request.set_approval_parameters(approval_parameters);
        request.set_approved(approved);

        if approved {
            self.policy.remember_approval(request, owner_id);
            ApprovalState::Approved
        } else {
            ApprovalState::Denied
        }
    }
}

/// Whether an approval value means consent.
pub fn is_truthy(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
