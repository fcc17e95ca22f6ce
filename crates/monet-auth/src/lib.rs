//! # monet-auth
//!
//! Challenge/response authentication for MonetDB.
//!
//! The server opens every connection with a salted challenge naming the
//! hash algorithm applied to stored passwords and the digest mechanisms it
//! accepts for the response. The client hashes the password with the
//! server's algorithm, salts and hashes the hex digest with the strongest
//! mechanism both sides support, and answers with a single line carrying
//! the proof.
//!
//! This crate is pure computation: the handshake loop (proxy rounds,
//! redirects, iteration bound) is driven by the client crate.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod hash;

pub use error::AuthError;
pub use hash::{AuthMechanism, PasswordHash};

use mapi_protocol::Challenge;

/// Compute the response line for a login challenge.
///
/// The wire form is `LIT:<username>:<mechanism_tag><proof>:sql:<database>:`
/// where the proof is the hex digest of the hex-encoded password hash
/// concatenated with the salt.
pub fn challenge_response(
    challenge: &Challenge,
    username: &str,
    password: &str,
    database: &str,
) -> Result<String, AuthError> {
    let mechanism = AuthMechanism::strongest(&challenge.auth_mechanisms).ok_or_else(|| {
        AuthError::NoSupportedMechanism {
            offered: challenge.auth_mechanisms.clone(),
        }
    })?;
    let password_hash = PasswordHash::from_name(&challenge.password_hash)?;

    tracing::debug!(
        mechanism = mechanism.tag(),
        password_hash = challenge.password_hash.as_str(),
        "negotiated authentication algorithms"
    );

    let password_digest = password_hash.digest_hex(password.as_bytes());
    let mut salted = password_digest.into_bytes();
    salted.extend_from_slice(challenge.salt.as_bytes());
    let proof = mechanism.digest_hex(&salted);

    Ok(format!(
        "LIT:{username}:{tag}{proof}:sql:{database}:",
        tag = mechanism.tag()
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn challenge(mechanisms: &str, password_hash: &str) -> Challenge {
        Challenge::parse(&format!(
            "oRzY7XZr1EfNWETqU6b2:merovingian:9:{mechanisms}:LIT:{password_hash}:"
        ))
        .unwrap()
    }

    #[test]
    fn test_known_digest_vector() {
        let response = challenge_response(
            &challenge("PROT10,SHA256,SHA224", "SHA512"),
            "leto",
            "atreides",
            "dune",
        )
        .unwrap();
        assert_eq!(
            response,
            "LIT:leto:{SHA256}9f133d2ccda31b36cb9c4a848cf4332635d353b5c8c0fee341a8c90ffcc38127:sql:dune:"
        );
    }

    #[test]
    fn test_prefers_strongest_mechanism() {
        let response = challenge_response(
            &challenge("RIPEMD160,SHA224,SHA256,SHA512", "SHA256"),
            "u",
            "p",
            "db",
        )
        .unwrap();
        assert!(response.contains("{SHA512}"));
    }

    #[test]
    fn test_no_shared_mechanism() {
        let result = challenge_response(&challenge("MD5,PLAIN", "SHA512"), "u", "p", "db");
        assert!(matches!(
            result,
            Err(AuthError::NoSupportedMechanism { .. })
        ));
    }

    #[test]
    fn test_unknown_password_hash() {
        let result = challenge_response(&challenge("SHA256", "MD5"), "u", "p", "db");
        assert!(matches!(
            result,
            Err(AuthError::UnknownPasswordHash(name)) if name == "MD5"
        ));
    }
}
