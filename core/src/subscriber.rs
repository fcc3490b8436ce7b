//! Subscriber identifiers.

use md5::{Digest, Md5};

/// MD5 hex digest of the lowercased email address.
///
/// The API addresses list members by this hash rather than by email, e.g.
/// `lists/{list_id}/members/{subscriber_hash}`.
pub fn subscriber_hash(email: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(email.to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// Path of a list member resource.
pub fn member_path(list_id: &str, email: &str) -> String {
    format!("lists/{list_id}/members/{}", subscriber_hash(email))
}
