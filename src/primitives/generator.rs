//! Generators produce string codes and tokens, and seal values for a later round trip.
//!
//! Two implementations exist:
//!     - `RandomGenerator` depends on the entropy of the generated token to make guessing
//!     infeasible.
//!     - `Assertion` cryptographically verifies the integrity of a token. Besides tagging grants
//!     it seals arbitrary serializable values, which lets a pending approval leave the server and
//!     come back without trusting the party that stored it.
use base64::{decode_config, encode_config, URL_SAFE_NO_PAD};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use super::authorizer::ApprovedAuthorization;

/// Generic token for a specific approved authorization.
///
/// The interface is used for authorization codes and bearer tokens alike.
///
/// ## Requirements on implementations
///
/// When queried without repetition (users will change the `usage` counter each time), this
/// method MUST be indistinguishable from a random function. One should not be able to derive the
/// tag for another token from ones own. Since there may be multiple tokens for one
/// authorization, the `usage` counter makes it possible to differentiate between these.
pub trait TagGrant {
    /// For example sign the input parameters or generate a random token.
    fn tag(&mut self, usage: u64, grant: &ApprovedAuthorization) -> Result<String, ()>;
}

/// Generates tokens from random bytes.
///
/// Each byte is chosen by ring's system random source and the result is encoded as url safe
/// base64 without padding.
pub struct RandomGenerator {
    random: SystemRandom,
    len: usize,
}

impl RandomGenerator {
    /// Generates tokens with a specific byte length.
    pub fn new(length: usize) -> RandomGenerator {
        RandomGenerator {
            random: SystemRandom::new(),
            len: length,
        }
    }

    fn generate(&self) -> Result<String, ()> {
        let mut result = vec![0; self.len];
        self.random.fill(result.as_mut_slice()).map_err(|_| ())?;
        Ok(encode_config(&result, URL_SAFE_NO_PAD))
    }
}

/// Signs serializable values with a secret key.
///
/// Tokens include the serialized value followed by an HMAC-SHA256 signature. Since data is not
/// encrypted, sealed values must not contain secrets the holder of the token should not see.
///
/// Each token is bound to a tag. A token signed for one purpose, say an approval continuation,
/// is rejected when presented for another.
pub struct Assertion {
    secret: hmac::Key,
}

/// Failure to seal or unseal a value.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SealError {
    /// The value could not be serialized.
    #[error("value could not be encoded")]
    Encode,

    /// The token is malformed, was signed with another key or for another purpose.
    #[error("token is invalid or has been tampered with")]
    Invalid,

    /// No key material could be generated.
    #[error("system randomness unavailable")]
    Random,
}

#[derive(Serialize, Deserialize)]
struct AssertGrant(Vec<u8>, Vec<u8>);

#[derive(Serialize)]
struct SerdeAssertionGrant<'a> {
    owner_id: &'a str,
    client_id: Option<&'a str>,
    scope: String,
    redirect_uri: Option<&'a str>,
    until: i64,
}

impl Assertion {
    /// Construct an assertion from a custom secret.
    ///
    /// Key material of a length other than the digest length is padded or hashed as described by
    /// the HMAC standard.
    pub fn new(key: &[u8]) -> Self {
        Assertion {
            secret: hmac::Key::new(hmac::HMAC_SHA256, key),
        }
    }

    /// Construct an assertion instance whose tokens are only valid for the program execution.
    pub fn ephemeral() -> Result<Self, SealError> {
        let secret = hmac::Key::generate(hmac::HMAC_SHA256, &SystemRandom::new())
            .map_err(|_| SealError::Random)?;
        Ok(Assertion { secret })
    }

    /// Seal a value for the purpose named by `tag`.
    pub fn sign<T>(&self, tag: &str, value: &T) -> Result<String, SealError>
    where
        T: serde::Serialize + ?Sized,
    {
        let tosign = rmp_serde::to_vec(&(tag, value)).map_err(|_| SealError::Encode)?;
        let signature = hmac::sign(&self.secret, &tosign);
        let assertion = AssertGrant(tosign, signature.as_ref().to_vec());
        let encoded = rmp_serde::to_vec(&assertion).map_err(|_| SealError::Encode)?;
        Ok(encode_config(&encoded, URL_SAFE_NO_PAD))
    }

    /// Recover a value sealed with `sign` for the same tag.
    pub fn verify<T: DeserializeOwned>(&self, tag: &str, token: &str) -> Result<T, SealError> {
        let decoded = decode_config(token, URL_SAFE_NO_PAD).map_err(|_| SealError::Invalid)?;
        let assertion: AssertGrant =
            rmp_serde::from_slice(&decoded).map_err(|_| SealError::Invalid)?;
        hmac::verify(&self.secret, &assertion.0, &assertion.1).map_err(|_| SealError::Invalid)?;
        let (signed_tag, value): (String, T) =
            rmp_serde::from_slice(&assertion.0).map_err(|_| SealError::Invalid)?;
        if signed_tag != tag {
            return Err(SealError::Invalid);
        }
        Ok(value)
    }

    fn counted_signature(&self, counter: u64, grant: &ApprovedAuthorization) -> Result<String, ()> {
        let request = grant.request();
        let serde_grant = SerdeAssertionGrant {
            owner_id: grant.owner_id(),
            client_id: request.client_id(),
            scope: request.scope().to_string(),
            redirect_uri: request.resolved_redirect_uri().map(|uri| uri.as_str()),
            until: grant.until().timestamp(),
        };
        let tosign = rmp_serde::to_vec(&(serde_grant, counter)).map_err(|_| ())?;
        let signature = hmac::sign(&self.secret, &tosign);
        Ok(encode_config(signature.as_ref(), URL_SAFE_NO_PAD))
    }
}

impl TagGrant for RandomGenerator {
    fn tag(&mut self, _: u64, _: &ApprovedAuthorization) -> Result<String, ()> {
        self.generate()
    }
}

impl<'a> TagGrant for &'a RandomGenerator {
    fn tag(&mut self, _: u64, _: &ApprovedAuthorization) -> Result<String, ()> {
        self.generate()
    }
}

impl TagGrant for Assertion {
    fn tag(&mut self, counter: u64, grant: &ApprovedAuthorization) -> Result<String, ()> {
        self.counted_signature(counter, grant)
    }
}

impl<'a> TagGrant for &'a Assertion {
    fn tag(&mut self, counter: u64, grant: &ApprovedAuthorization) -> Result<String, ()> {
        self.counted_signature(counter, grant)
    }
}

impl<T: TagGrant + ?Sized> TagGrant for Box<T> {
    fn tag(&mut self, counter: u64, grant: &ApprovedAuthorization) -> Result<String, ()> {
        (**self).tag(counter, grant)
    }
}

impl<'a, T: TagGrant + ?Sized + 'a> TagGrant for &'a mut T {
    fn tag(&mut self, counter: u64, grant: &ApprovedAuthorization) -> Result<String, ()> {
        (**self).tag(counter, grant)
    }
}
