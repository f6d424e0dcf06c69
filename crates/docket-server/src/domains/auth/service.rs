use chrono::Utc;
use docket_core::validation;
use docket_core::{Employee, EmployeeStatus, Identity};
use docket_db::repo::EmployeeRepo;

use crate::app::AppState;
use crate::domains::auth::core::tokens::{issue_token, SessionClaims};
use crate::domains::auth::helpers::{hash_limited, verify_limited};
use crate::domains::errors::{db_error, ServiceError};
use crate::domains::site::service::load_settings;
use crate::infra::metrics;

pub struct LoginCommand {
    pub login_id: String,
    pub password: String,
    pub client_ip: Option<String>,
}

pub struct LoginResult {
    pub token: String,
    pub expires_in_seconds: i64,
    pub employee: Employee,
    pub permissions: Vec<i32>,
}

pub struct ChangePasswordCommand {
    pub current_password: String,
    pub new_password: String,
}

fn login_rejected(result: &'static str, login_id: &str, client_ip: Option<&str>) -> ServiceError {
    metrics::auth_login(result);
    tracing::warn!(
        event = "login_failed",
        reason = result,
        login_id = %login_id,
        client_ip = client_ip.unwrap_or("unknown"),
        "Login rejected"
    );
    ServiceError::InvalidCredentials
}

pub async fn login(state: &AppState, cmd: LoginCommand) -> Result<LoginResult, ServiceError> {
    let login_id = cmd.login_id.trim();
    if login_id.is_empty() || cmd.password.is_empty() {
        return Err(ServiceError::BadRequest("invalid_payload"));
    }
    let client_ip = cmd.client_ip.as_deref();

    let repo = EmployeeRepo::new(&state.db);
    let employee = repo
        .get_by_login_id(login_id)
        .await
        .map_err(|err| db_error("login_lookup", err))?
        .ok_or_else(|| login_rejected("unknown_login", login_id, client_ip))?;

    if !verify_limited(state, &employee.password_hash, &cmd.password, "login").await? {
        return Err(login_rejected("bad_password", login_id, client_ip));
    }
    if employee.status != EmployeeStatus::Active {
        metrics::auth_login("disabled");
        tracing::warn!(event = "login_failed", reason = "disabled", login_id = %login_id);
        return Err(ServiceError::Forbidden("account_disabled"));
    }

    let settings = load_settings(state).await?;
    let permissions = repo
        .permissions(employee.id)
        .await
        .map_err(|err| db_error("login_permissions", err))?;
    let now = Utc::now();
    let claims = SessionClaims::new(
        employee.id,
        &employee.login_id,
        permissions.clone(),
        now,
        settings.jwt_expiry_minutes,
    );
    let token = issue_token(&claims, &state.jwt_secret).map_err(|err| {
        tracing::error!(event = "token_issue_failed", error = err);
        ServiceError::Internal("token_issue_failed")
    })?;
    repo.update_last_login(employee.id, now)
        .await
        .map_err(|err| db_error("login_touch", err))?;

    metrics::auth_login("success");
    tracing::info!(
        event = "login_succeeded",
        employee_id = employee.id,
        client_ip = client_ip.unwrap_or("unknown"),
        "Employee logged in"
    );
    let mut employee = employee;
    employee.last_login_at = Some(now);
    Ok(LoginResult {
        token,
        expires_in_seconds: settings.jwt_expiry_minutes * 60,
        employee,
        permissions,
    })
}

pub async fn me(state: &AppState, identity: &Identity) -> Result<Employee, ServiceError> {
    EmployeeRepo::new(&state.db)
        .get_by_id(identity.employee_id)
        .await
        .map_err(|err| db_error("me_lookup", err))?
        .ok_or(ServiceError::NotFound)
}

pub async fn change_password(
    state: &AppState,
    identity: &Identity,
    cmd: ChangePasswordCommand,
) -> Result<(), ServiceError> {
    validation::password(&cmd.new_password)?;
    if cmd.current_password == cmd.new_password {
        return Err(ServiceError::NoChanges);
    }
    let employee = me(state, identity).await?;
    if !verify_limited(
        state,
        &employee.password_hash,
        &cmd.current_password,
        "password_change",
    )
    .await?
    {
        return Err(ServiceError::InvalidPassword);
    }
    let password_hash = hash_limited(state, &cmd.new_password, "password_change").await?;
    EmployeeRepo::new(&state.db)
        .update_password(employee.id, &password_hash)
        .await
        .map_err(|err| db_error("password_change", err))?;
    tracing::info!(event = "password_changed", employee_id = employee.id);
    Ok(())
}
