//! Deterministic identifiers.
//!
//! Identifiers are name-based version 3 UUIDs with an empty namespace: the
//! MD5 digest of the name bytes alone, with the version and variant bits set.
//! Organisation ids use the raw MD5 digest of the key as the name, so they
//! match the ids other transformers assign to the same organisations.

use md5::{Digest, Md5};
use uuid::{Builder, Uuid};

fn name_uuid(name: &[u8]) -> Uuid {
    Builder::from_md5_bytes(Md5::digest(name).into()).into_uuid()
}

/// Identifier of a security natural key.
pub fn security_uuid(security_id: &str) -> Uuid {
    name_uuid(security_id.as_bytes())
}

/// Identifier of an organisation natural key.
pub fn organisation_uuid(org_id: &str) -> Uuid {
    let digest = Md5::digest(org_id.as_bytes());
    name_uuid(digest.as_slice())
}
