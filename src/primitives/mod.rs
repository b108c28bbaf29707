//! A collection of primitives consulted by the authorization flow.
//!
//! A primitive is the smallest independent unit of policy. The flow never stores clients, codes
//! or tokens itself. Instead it asks a [`ClientDirectory`] for client metadata, hands approved
//! requests to a [`CodeStore`] or [`TokenGranter`], and lets an [`ApprovalPolicy`] decide whether
//! the resource owner has to be asked at all. Each comes with an in-memory implementation that
//! is sufficient for tests and small deployments.
//!
//! ```
//! # use authflow::primitives::prelude::*;
//! let codes = AuthMap::new(RandomGenerator::new(16));
//! let tokens = TokenMap::new(RandomGenerator::new(16));
//! let clients = ClientMap::new();
//! let approvals = ApprovalMemory::new();
//! # let _ = (codes, tokens, clients, approvals);
//! ```
//!
//! [`ClientDirectory`]: registrar/trait.ClientDirectory.html
//! [`CodeStore`]: authorizer/trait.CodeStore.html
//! [`TokenGranter`]: issuer/trait.TokenGranter.html
//! [`ApprovalPolicy`]: approval/trait.ApprovalPolicy.html
use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;

use crate::code_grant::error::ErrorKind;

pub mod approval;
pub mod authorizer;
pub mod generator;
pub mod issuer;
pub mod registrar;
pub mod scope;

/// Point in time used for expiry of codes and tokens.
pub type Time = DateTime<Utc>;

/// Failure of a primitive that issues or consumes grants.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PrimitiveError {
    /// The primitive refused the request with a specific protocol error.
    #[error("request rejected with {0}")]
    Rejected(ErrorKind),

    /// The code or token is not known, was already used, or has expired.
    #[error("unknown or expired grant")]
    Unknown,

    /// The backing storage or generator could not serve the request.
    #[error("primitive temporarily unavailable")]
    Unavailable,
}

/// Commonly used primitives for building an authorization flow.
pub mod prelude {
    pub use super::approval::{ApprovalMemory, ApprovalPolicy, FnPolicy, NeverPreApproved};
    pub use super::authorizer::{ApprovedAuthorization, AuthMap, CodeStore};
    pub use super::generator::{Assertion, RandomGenerator, TagGrant};
    pub use super::issuer::{AccessToken, TokenGranter, TokenMap, TokenType};
    pub use super::registrar::{ClientDetails, ClientDirectory, ClientMap, LookupError};
    pub use super::scope::Scope;
    pub use super::PrimitiveError;
}
