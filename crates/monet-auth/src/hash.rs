//! Digest algorithm selection.

use ripemd::Ripemd160;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::AuthError;

/// Digest mechanism used to prove the password hash, negotiated from the
/// challenge's mechanism list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    /// SHA-512.
    Sha512,
    /// SHA-256.
    Sha256,
    /// SHA-224.
    Sha224,
    /// RIPEMD-160.
    Ripemd160,
}

impl AuthMechanism {
    /// Preference order, strongest first.
    const PREFERENCE: [Self; 4] = [Self::Sha512, Self::Sha256, Self::Sha224, Self::Ripemd160];

    /// Pick the strongest mechanism the server offers.
    #[must_use]
    pub fn strongest(offered: &[String]) -> Option<Self> {
        Self::PREFERENCE
            .into_iter()
            .find(|mechanism| offered.iter().any(|name| name == mechanism.name()))
    }

    /// The mechanism name as listed in the challenge.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha512 => "SHA512",
            Self::Sha256 => "SHA256",
            Self::Sha224 => "SHA224",
            Self::Ripemd160 => "RIPEMD160",
        }
    }

    /// The tag prefixed to the proof in the response line.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Sha512 => "{SHA512}",
            Self::Sha256 => "{SHA256}",
            Self::Sha224 => "{SHA224}",
            Self::Ripemd160 => "{RIPEMD160}",
        }
    }

    /// Lowercase hex digest of `data`.
    #[must_use]
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            Self::Sha512 => hex::encode(Sha512::digest(data)),
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha224 => hex::encode(Sha224::digest(data)),
            Self::Ripemd160 => hex::encode(Ripemd160::digest(data)),
        }
    }
}

/// Hash algorithm the server applied to stored passwords, named by the
/// challenge's final field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordHash {
    /// SHA-512.
    Sha512,
    /// SHA-384.
    Sha384,
    /// SHA-256.
    Sha256,
    /// SHA-224.
    Sha224,
}

impl PasswordHash {
    /// Resolve the algorithm from its challenge name.
    pub fn from_name(name: &str) -> Result<Self, AuthError> {
        match name {
            "SHA512" => Ok(Self::Sha512),
            "SHA384" => Ok(Self::Sha384),
            "SHA256" => Ok(Self::Sha256),
            "SHA224" => Ok(Self::Sha224),
            other => Err(AuthError::UnknownPasswordHash(other.to_owned())),
        }
    }

    /// Lowercase hex digest of `data`.
    #[must_use]
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            Self::Sha512 => hex::encode(Sha512::digest(data)),
            Self::Sha384 => hex::encode(Sha384::digest(data)),
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha224 => hex::encode(Sha224::digest(data)),
        }
    }
}
