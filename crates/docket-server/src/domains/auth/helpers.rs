use crate::app::AppState;
use crate::domains::auth::core::passwords::{hash_password, verify_password};
use crate::domains::errors::ServiceError;
use crate::infra::metrics;

/// Argon2 work runs on the blocking pool, gated by the KDF semaphore.
pub(crate) async fn hash_limited(
    state: &AppState,
    password: &str,
    operation: &'static str,
) -> Result<String, ServiceError> {
    let _permit = metrics::acquire_kdf_permit(&state.argon2_semaphore, operation)
        .await
        .map_err(|()| {
            tracing::error!(event = "kdf_limiter_closed", operation);
            ServiceError::Kdf
        })?;
    let password = password.to_string();
    let kdf = state.config.auth.kdf.clone();
    tokio::task::spawn_blocking(move || hash_password(&password, &kdf))
        .await
        .map_err(|_| ServiceError::Kdf)?
        .map_err(|err| {
            tracing::error!(event = "kdf_failed", operation, error = err);
            ServiceError::Kdf
        })
}

pub(crate) async fn verify_limited(
    state: &AppState,
    stored_hash: &str,
    password: &str,
    operation: &'static str,
) -> Result<bool, ServiceError> {
    let _permit = metrics::acquire_kdf_permit(&state.argon2_semaphore, operation)
        .await
        .map_err(|()| {
            tracing::error!(event = "kdf_limiter_closed", operation);
            ServiceError::Kdf
        })?;
    let stored_hash = stored_hash.to_string();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || verify_password(&stored_hash, &password))
        .await
        .map_err(|_| ServiceError::Kdf)?
        .map_err(|err| {
            tracing::error!(event = "kdf_failed", operation, error = err);
            ServiceError::Kdf
        })
}
