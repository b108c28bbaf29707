//! Decision logic of the authorization flow, independent of any collaborator.
//!
//! Each submodule answers one question the flow asks about a request:
//!
//! * [`redirect`]: where is the response sent, and how are parameters placed in it?
//! * [`approval`]: has the resource owner consented?
//! * [`error`]: how is a failure reported to the client?
pub mod approval;
pub mod error;
pub mod redirect;
