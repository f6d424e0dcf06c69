use docket_core::{EmployeeStatus, Identity};
use docket_db::repo::EmployeeRepo;

use crate::app::AppState;
use crate::domains::auth::core::tokens::verify_token;

/// Resolves a session token to a live identity. The token only proves who
/// the caller was; status and permissions are re-read from the store.
pub(crate) async fn identity_from_session_token(
    state: &AppState,
    token: &str,
) -> Result<Identity, &'static str> {
    let claims = verify_token(token, &state.jwt_secret)?;
    let employee_id = claims.employee_id().ok_or("token_invalid")?;

    let repo = EmployeeRepo::new(&state.db);
    let employee = match repo.get_by_id(employee_id).await {
        Ok(Some(employee)) => employee,
        Ok(None) => return Err("employee_not_found"),
        Err(err) => {
            tracing::error!(event = "identity_lookup_failed", error = %err);
            return Err("db_error");
        }
    };
    if employee.status != EmployeeStatus::Active {
        return Err("employee_disabled");
    }
    let permissions = repo.permissions(employee.id).await.map_err(|err| {
        tracing::error!(event = "identity_lookup_failed", error = %err);
        "db_error"
    })?;

    Ok(Identity {
        employee_id: employee.id,
        login_id: employee.login_id,
        name: employee.name,
        permissions,
    })
}
