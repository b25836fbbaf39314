//! Argon2 password hashing (PHC string format, random salt per hash).

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

fn salt() -> SaltString {
    use rand::Rng;
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    SaltString::encode_b64(&bytes).expect("16 bytes always encode")
}

pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    Argon2::default()
        .hash_password(password.as_bytes(), &salt())
        .map(|h| h.to_string())
}

pub fn verify(password: &str, hashword: &str) -> bool {
    PasswordHash::new(hashword)
        .ok()
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Signup password policy: at least one lowercase letter, one uppercase
/// letter, and one digit. No length requirement beyond that.
pub fn meets_policy(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hashed = hash("Passw0rd").expect("should hash");
        assert!(verify("Passw0rd", &hashed));
        assert!(!verify("Passw0rd!", &hashed));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("Passw0rd").unwrap();
        let b = hash("Passw0rd").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_rejects_garbage_stored_value() {
        assert!(!verify("Passw0rd", "not-a-phc-string"));
    }

    #[test]
    fn policy_requires_all_three_classes() {
        assert!(meets_policy("Passw0rd"));
        assert!(meets_policy("aB1"));
        assert!(!meets_policy("password1")); // no uppercase
        assert!(!meets_policy("PASSWORD1")); // no lowercase
        assert!(!meets_policy("Password")); // no digit
        assert!(!meets_policy(""));
    }
}
