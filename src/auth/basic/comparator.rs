//! Secret comparators
//!
//! A [`Comparator`] produces the representation of a secret that is stored
//! in the result cache and later checks a presented secret against it.
//!
//! | Comparator         | Stored form                 | Recoverable |
//! |--------------------|-----------------------------|-------------|
//! | [`PlainText`]      | the secret itself           | yes         |
//! | [`HmacComparator`] | hex HMAC-SHA256 under a key | no          |
//! | [`Argon2Comparator`] | Argon2id PHC string       | no          |

use crate::auth::AuthError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// One-way hash-and-verify capability protecting cached secrets.
#[cfg_attr(test, mockall::automock)]
pub trait Comparator: Send + Sync {
    /// Produce the representation to store for `secret`
    fn hash(&self, secret: &str) -> Result<String, AuthError>;

    /// Check `secret` against a stored representation.
    ///
    /// Returns [`AuthError::SecretMismatch`] when they do not match.
    fn compare(&self, hashed: &str, secret: &str) -> Result<(), AuthError>;
}

/// Stores the secret verbatim and compares by equality.
///
/// Only suitable when the result cache itself is trusted and access
/// controlled: anyone who can read the cache can read the secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Comparator for PlainText {
    fn hash(&self, secret: &str) -> Result<String, AuthError> {
        Ok(secret.to_string())
    }

    fn compare(&self, hashed: &str, secret: &str) -> Result<(), AuthError> {
        if hashed == secret {
            Ok(())
        } else {
            Err(AuthError::SecretMismatch)
        }
    }
}

/// Keyed HMAC-SHA256 comparator.
///
/// Deterministic for a given key, so re-hashing the same secret yields the
/// same stored value. Verification runs in constant time.
///
/// # Example
///
/// ```
/// use cached_auth::auth::basic::{Comparator, HmacComparator};
///
/// let comparator = HmacComparator::new(b"process-local-key");
/// let stored = comparator.hash("s3cret").unwrap();
/// assert!(comparator.compare(&stored, "s3cret").is_ok());
/// assert!(comparator.compare(&stored, "guess").is_err());
/// ```
#[derive(Clone)]
pub struct HmacComparator {
    key: Vec<u8>,
}

impl HmacComparator {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

impl std::fmt::Debug for HmacComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacComparator").finish_non_exhaustive()
    }
}

impl Comparator for HmacComparator {
    fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let mut mac = self.mac()?;
        mac.update(secret.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn compare(&self, hashed: &str, secret: &str) -> Result<(), AuthError> {
        let expected = hex::decode(hashed).map_err(|_| AuthError::SecretMismatch)?;
        let mut mac = self.mac().map_err(|_| AuthError::SecretMismatch)?;
        mac.update(secret.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| AuthError::SecretMismatch)
    }
}

/// Salted Argon2id comparator storing PHC strings.
///
/// Each [`hash`](Comparator::hash) call draws a fresh salt from `OsRng`.
#[derive(Clone, Default)]
pub struct Argon2Comparator {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for Argon2Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Comparator").finish_non_exhaustive()
    }
}

impl Argon2Comparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit Argon2 parameters instead of the crate defaults
    pub fn with_argon2(argon2: Argon2<'static>) -> Self {
        Self { argon2 }
    }
}

impl Comparator for Argon2Comparator {
    fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn compare(&self, hashed: &str, secret: &str) -> Result<(), AuthError> {
        // A stored value that is not a PHC string cannot match anything.
        let parsed = PasswordHash::new(hashed).map_err(|_| AuthError::SecretMismatch)?;
        self.argon2
            .verify_password(secret.as_bytes(), &parsed)
            .map_err(|_| AuthError::SecretMismatch)
    }
}
