use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::config::KdfConfig;

const GENERATED_PASSWORD_LEN: usize = 16;

fn argon2(config: &KdfConfig) -> Result<Argon2<'static>, &'static str> {
    let params = Params::new(config.memory_kb, config.iterations, config.parallelism, None)
        .map_err(|_| "kdf_params_invalid")?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// PHC string (`$argon2id$...`) with a fresh random salt.
pub fn hash_password(password: &str, config: &KdfConfig) -> Result<String, &'static str> {
    let salt = SaltString::generate(&mut OsRng);
    argon2(config)?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| "kdf_failed")
}

/// Parameters come from the stored hash, so old hashes keep verifying after
/// the configured cost changes.
pub fn verify_password(stored: &str, password: &str) -> Result<bool, &'static str> {
    let parsed = PasswordHash::new(stored).map_err(|_| "password_hash_invalid")?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err("kdf_failed"),
    }
}

#[must_use]
pub fn generate_password() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
