mod sign_utils;
mod signer;

pub(crate) use sign_utils::{authorization, canonical_resource, canonical_string};
pub use signer::{HmacSha1Signer, Signer};
