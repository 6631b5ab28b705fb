/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing, strength rules and credential verifiers
/// - [`jwt`]: access/refresh token issue and validation
/// - [`gate`]: the request access gate and its axum middleware
///
/// # Example
///
/// ```no_run
/// use permit_shared::auth::password::hash_password;
/// use permit_shared::auth::jwt::issue_pair;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Adm1n@pass")?;
/// let (access, refresh) = issue_pair(1, "admin", "secret-key-at-least-32-bytes-long!!")?;
/// # Ok(())
/// # }
/// ```

pub mod gate;
pub mod jwt;
pub mod password;
