use actix_web::cookie::Key;
use sha2::{Digest, Sha256, Sha512};

pub fn gen_cookie_key(cookie_token: &str) -> Key {
    let mut hasher = Sha512::new();
    hasher.update(cookie_token);
    Key::from(hasher.finalize().as_slice())
}

/// Digest over an identity assertion, keyed by the secret shared with the
/// upstream identity provider. The provider completes its own handshake
/// and vouches for (external_id, email, username) with this value.
pub fn assertion_digest(external_id: &str, email: &str, username: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update([0u8]);
    hasher.update(external_id);
    hasher.update([0u8]);
    hasher.update(email);
    hasher.update([0u8]);
    hasher.update(username);
    hex::encode(hasher.finalize().as_slice())
}

pub fn verify_assertion(
    external_id: &str,
    email: &str,
    username: &str,
    digest: &str,
    secret: &str,
) -> bool {
    let mut expected = [0u8; 32];
    if hex::decode_to_slice(digest, &mut expected).is_err() {
        return false;
    }

    let mut buffer = [0u8; 32];
    // assertion_digest output is always valid hex of the right length
    hex::decode_to_slice(
        assertion_digest(external_id, email, username, secret),
        &mut buffer,
    )
    .is_ok_and(|()| buffer == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_assertion_verifies() {
        let digest = assertion_digest("sub-1", "a@b.io", "alice", "secret");
        assert!(verify_assertion("sub-1", "a@b.io", "alice", &digest, "secret"));
    }

    #[test]
    fn tampered_fields_fail() {
        let digest = assertion_digest("sub-1", "a@b.io", "alice", "secret");
        assert!(!verify_assertion("sub-2", "a@b.io", "alice", &digest, "secret"));
        assert!(!verify_assertion("sub-1", "c@d.io", "alice", &digest, "secret"));
        assert!(!verify_assertion("sub-1", "a@b.io", "alice", &digest, "other"));
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        // "ab" + "c" must not collide with "a" + "bc"
        let one = assertion_digest("ab", "c", "u", "s");
        let two = assertion_digest("a", "bc", "u", "s");
        assert_ne!(one, two);
    }

    #[test]
    fn malformed_digest_rejected() {
        assert!(!verify_assertion("sub-1", "a@b.io", "alice", "zz", "secret"));
        assert!(!verify_assertion("sub-1", "a@b.io", "alice", "", "secret"));
    }
}
