//! Code stores issue authorization codes and trade them back exactly once.
//!
//! After the resource owner approved a request in the code flow, the approved request is handed
//! to a `CodeStore` which returns an opaque code. The client later presents the code at the
//! token endpoint where it is consumed, invalidating it in the process.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_derive::{Deserialize, Serialize};

use super::generator::TagGrant;
use super::{PrimitiveError, Time};
use crate::request::AuthorizationRequest;

/// An authorization request after approval, bound to the approving resource owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedAuthorization {
    request: AuthorizationRequest,
    owner_id: String,
    until: Time,
}

impl ApprovedAuthorization {
    /// Bind a request to its owner, valid until the given time.
    pub fn new<S: Into<String>>(request: AuthorizationRequest, owner_id: S, until: Time) -> Self {
        ApprovedAuthorization {
            request,
            owner_id: owner_id.into(),
            until,
        }
    }

    /// The finalized request.
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// The resource owner who approved.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Expiry of the authorization.
    pub fn until(&self) -> Time {
        self.until
    }

    /// Whether the authorization has expired at the given time.
    pub fn is_expired_at(&self, now: Time) -> bool {
        self.until < now
    }
}

/// Code stores create and manage authorization codes.
///
/// Implementations must be safe to share between concurrently handled requests. `consume` has
/// to be atomic: a code is returned at most once, no matter how many callers race for it.
pub trait CodeStore {
    /// Create a code which allows retrieval of the approved request at a later time.
    fn issue(&self, grant: ApprovedAuthorization) -> Result<String, PrimitiveError>;

    /// Retrieve the approved request associated with a code, invalidating the code.
    ///
    /// Unknown, already consumed and expired codes are `PrimitiveError::Unknown`.
    fn consume(&self, code: &str) -> Result<ApprovedAuthorization, PrimitiveError>;
}

/// An in-memory hash map.
///
/// This store saves a mapping of generated strings to their approved requests. The generator is
/// itself trait based and can be chosen during construction. It is assumed to not be possible
/// for two different grants to generate the same code.
pub struct AuthMap<I: TagGrant = Box<dyn TagGrant + Send + Sync + 'static>> {
    inner: Mutex<Codes<I>>,
}

struct Codes<I> {
    tagger: I,
    usage: u64,
    codes: HashMap<String, ApprovedAuthorization>,
}

impl<I: TagGrant> AuthMap<I> {
    /// Create a store generating codes with the `tagger`.
    pub fn new(tagger: I) -> Self {
        AuthMap {
            inner: Mutex::new(Codes {
                tagger,
                usage: 0,
                codes: HashMap::new(),
            }),
        }
    }

    /// The number of codes that are currently outstanding, including expired ones.
    pub fn outstanding(&self) -> usize {
        self.inner.lock().map(|inner| inner.codes.len()).unwrap_or(0)
    }
}

impl<I: TagGrant> CodeStore for AuthMap<I> {
    fn issue(&self, grant: ApprovedAuthorization) -> Result<String, PrimitiveError> {
        let mut guard = self.inner.lock().map_err(|_| PrimitiveError::Unavailable)?;
        let inner = &mut *guard;
        // The (usage, grant) tuple needs to be unique for each call.
        let next_usage = inner.usage.wrapping_add(1);
        let code = inner
            .tagger
            .tag(inner.usage, &grant)
            .map_err(|()| PrimitiveError::Unavailable)?;
        inner.codes.insert(code.clone(), grant);
        inner.usage = next_usage;
        Ok(code)
    }

    fn consume(&self, code: &str) -> Result<ApprovedAuthorization, PrimitiveError> {
        let grant = self
            .inner
            .lock()
            .map_err(|_| PrimitiveError::Unavailable)?
            .codes
            .remove(code)
            .ok_or(PrimitiveError::Unknown)?;

        if grant.is_expired_at(Utc::now()) {
            return Err(PrimitiveError::Unknown);
        }

        Ok(grant)
    }
}

impl<'s, S: CodeStore + ?Sized> CodeStore for &'s S {
    fn issue(&self, grant: ApprovedAuthorization) -> Result<String, PrimitiveError> {
        (**self).issue(grant)
    }

    fn consume(&self, code: &str) -> Result<ApprovedAuthorization, PrimitiveError> {
        (**self).consume(code)
    }
}

impl<S: CodeStore + ?Sized> CodeStore for Box<S> {
    fn issue(&self, grant: ApprovedAuthorization) -> Result<String, PrimitiveError> {
        (**self).issue(grant)
    }

    fn consume(&self, code: &str) -> Result<ApprovedAuthorization, PrimitiveError> {
        (**self).consume(code)
    }
}

impl<S: CodeStore + ?Sized> CodeStore for Arc<S> {
    fn issue(&self, grant: ApprovedAuthorization) -> Result<String, PrimitiveError> {
        (**self).issue(grant)
    }

    fn consume(&self, code: &str) -> Result<ApprovedAuthorization, PrimitiveError> {
        (**self).consume(code)
    }
}
