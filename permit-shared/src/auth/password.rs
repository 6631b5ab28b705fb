/// Password hashing and credential verification
///
/// New credentials are always stored as Argon2id PHC strings:
///
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Legacy credentials
///
/// Accounts imported from the previous system may still hold their password
/// in cleartext. [`LegacyCleartextVerifier`] can check those, but it is only
/// reachable through [`MigratingVerifier`] with `allow_legacy` switched on,
/// and a successful legacy match is reported as
/// [`Verification::LegacyCleartext`] so the caller re-hashes the credential
/// straight away. Once every account has logged in, switch it off.
///
/// # Example
///
/// ```
/// use permit_shared::auth::password::{
///     hash_password, CredentialVerifier, MigratingVerifier, Verification,
/// };
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Sup3r$ecret")?;
/// let verifier = MigratingVerifier::new(false);
///
/// assert_eq!(verifier.verify(&hash, "Sup3r$ecret")?, Verification::Hashed);
/// assert_eq!(verifier.verify(&hash, "wrong")?, Verification::Mismatch);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use std::sync::OnceLock;

use tracing::warn;

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Password does not meet the strength rules
    #[error("{0}")]
    TooWeak(String),
}

/// Hashes a password using Argon2id
///
/// # Returns
///
/// PHC string, e.g. `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against an Argon2 PHC string
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if `hash` cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters are embedded in the hash
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Argon2id hash of a throwaway password, computed once per process
pub fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| hash_password("permit-dummy-credential").ok())
        .as_deref()
}

/// Runs one full Argon2id verification against [`dummy_hash`]
///
/// Called when there is no stored credential, so the failure costs as much
/// as a wrong password.
pub fn verify_against_dummy(presented: &str) {
    if let Some(hash) = dummy_hash() {
        let _ = verify_password(presented, hash);
    }
}

/// Whether `stored` parses as a PHC hash string
pub fn is_hashed(stored: &str) -> bool {
    PasswordHash::new(stored).is_ok()
}

/// Validates password strength
///
/// Requires at least 8 characters including a letter, a digit and a
/// non-alphanumeric character.
///
/// ```
/// use permit_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Adm1n@pass").is_ok());
/// assert!(validate_password_strength("short1!").is_err());
/// assert!(validate_password_strength("NoSpecial123").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    let weak = |msg: &str| -> Result<(), PasswordError> {
        Err(PasswordError::TooWeak(msg.to_string()))
    };

    if password.chars().count() < 8 {
        return weak("Password must be at least 8 characters long");
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return weak("Password must contain at least one digit");
    }

    if !password.chars().any(|c| c.is_alphabetic()) {
        return weak("Password must contain at least one letter");
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return weak("Password must contain at least one special character");
    }

    Ok(())
}

/// Which verification path accepted (or rejected) a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Matched an Argon2 hash
    Hashed,

    /// Matched a cleartext legacy credential; re-hash it now
    LegacyCleartext,

    /// Did not match
    Mismatch,
}

impl Verification {
    pub fn is_match(&self) -> bool {
        !matches!(self, Verification::Mismatch)
    }

    /// True when the stored credential should be replaced by a fresh hash
    pub fn needs_rehash(&self) -> bool {
        matches!(self, Verification::LegacyCleartext)
    }
}

/// Checks a presented password against a stored credential
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, stored: &str, presented: &str) -> Result<Verification, PasswordError>;
}

/// Argon2 PHC verification
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn verify(&self, stored: &str, presented: &str) -> Result<Verification, PasswordError> {
        Ok(if verify_password(presented, stored)? {
            Verification::Hashed
        } else {
            Verification::Mismatch
        })
    }
}

/// MIGRATION ONLY: byte equality against a cleartext stored credential
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCleartextVerifier;

impl CredentialVerifier for LegacyCleartextVerifier {
    fn verify(&self, stored: &str, presented: &str) -> Result<Verification, PasswordError> {
        let (a, b) = (stored.as_bytes(), presented.as_bytes());
        let same = a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0;

        Ok(if same {
            Verification::LegacyCleartext
        } else {
            Verification::Mismatch
        })
    }
}

/// Dispatches on the stored format
///
/// PHC strings go to [`Argon2Verifier`]. Anything else goes to
/// [`LegacyCleartextVerifier`] when `allow_legacy` is set and is otherwise a
/// mismatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigratingVerifier {
    allow_legacy: bool,
}

impl MigratingVerifier {
    pub fn new(allow_legacy: bool) -> Self {
        Self { allow_legacy }
    }

    pub fn allows_legacy(&self) -> bool {
        self.allow_legacy
    }
}

impl CredentialVerifier for MigratingVerifier {
    fn verify(&self, stored: &str, presented: &str) -> Result<Verification, PasswordError> {
        if is_hashed(stored) {
            return Argon2Verifier.verify(stored, presented);
        }

        if self.allow_legacy {
            return LegacyCleartextVerifier.verify(stored, presented);
        }

        warn!("Stored credential is not a recognized hash and legacy verification is disabled");
        Ok(Verification::Mismatch)
    }
}
