use chrono::Utc;
use docket_core::validation;
use docket_core::{Employee, EmployeeStatus, Identity, Permission, PermissionRow};
use docket_db::repo::{EmployeeProfile, EmployeeRepo, NewEmployee, Page, PermissionRepo};

use crate::app::AppState;
use crate::domains::access_control::{has, require, require_owner_or};
use crate::domains::auth::core::passwords::generate_password;
use crate::domains::auth::helpers::hash_limited;
use crate::domains::errors::{db_error, is_unique_violation, ServiceError};

pub struct ListEmployeesCommand {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct EmployeeListResult {
    pub employees: Vec<Employee>,
    pub total: i64,
}

pub struct CreateEmployeeCommand {
    pub login_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub password: String,
    pub permissions: Vec<i32>,
}

pub struct UpdateEmployeeCommand {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub status: Option<EmployeeStatus>,
}

pub struct EmployeeDetail {
    pub employee: Employee,
    pub permissions: Vec<i32>,
}

pub struct ResetPasswordResult {
    pub password: String,
}

async fn load(repo: &EmployeeRepo<'_>, id: i64) -> Result<Employee, ServiceError> {
    repo.get_by_id(id)
        .await
        .map_err(|err| db_error("employee_get", err))?
        .ok_or(ServiceError::NotFound)
}

/// Deduplicates and rejects ids outside the catalogue. Granting or revoking
/// super admin needs super admin.
fn checked_permissions(
    identity: &Identity,
    requested: &[i32],
    current: &[i32],
) -> Result<Vec<i32>, ServiceError> {
    let mut ids = Vec::with_capacity(requested.len());
    for id in requested {
        if Permission::from_id(*id).is_none() {
            return Err(ServiceError::BadRequest("unknown_permission"));
        }
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
    ids.sort_unstable();
    let super_admin = Permission::SuperAdmin.id();
    let touches_super_admin = ids.contains(&super_admin) != current.contains(&super_admin);
    if touches_super_admin && !identity.permissions.contains(&super_admin) {
        return Err(ServiceError::Forbidden("super_admin_required"));
    }
    Ok(ids)
}

async fn permissions_of(repo: &EmployeeRepo<'_>, id: i64) -> Result<Vec<i32>, ServiceError> {
    repo.permissions(id)
        .await
        .map_err(|err| db_error("employee_permissions", err))
}

/// Only a super admin may act on another super admin's account.
fn require_super_admin_for(
    identity: &Identity,
    target_permissions: &[i32],
) -> Result<(), ServiceError> {
    let super_admin = Permission::SuperAdmin.id();
    if target_permissions.contains(&super_admin) && !identity.permissions.contains(&super_admin) {
        return Err(ServiceError::Forbidden("super_admin_required"));
    }
    Ok(())
}

/// Refuses to take the last active super admin out of service.
async fn ensure_not_last_super_admin(
    repo: &EmployeeRepo<'_>,
    target: &Employee,
) -> Result<(), ServiceError> {
    if target.status != EmployeeStatus::Active {
        return Ok(());
    }
    let remaining = repo
        .count_active_with_permission(Permission::SuperAdmin.id())
        .await
        .map_err(|err| db_error("employee_count", err))?;
    if remaining <= 1 {
        return Err(ServiceError::Conflict("last_super_admin"));
    }
    Ok(())
}

pub async fn list_employees(
    state: &AppState,
    identity: &Identity,
    cmd: ListEmployeesCommand,
) -> Result<EmployeeListResult, ServiceError> {
    require(identity, Permission::Employees, "list")?;
    let search = cmd
        .search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let (employees, total) = EmployeeRepo::new(&state.db)
        .list(search, Page::new(cmd.limit, cmd.offset))
        .await
        .map_err(|err| db_error("employee_list", err))?;
    Ok(EmployeeListResult { employees, total })
}

pub async fn get_employee(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<EmployeeDetail, ServiceError> {
    require_owner_or(identity, Some(id), Permission::Employees, "get")?;
    let repo = EmployeeRepo::new(&state.db);
    let employee = load(&repo, id).await?;
    let permissions = permissions_of(&repo, id).await?;
    Ok(EmployeeDetail {
        employee,
        permissions,
    })
}

pub async fn create_employee(
    state: &AppState,
    identity: &Identity,
    cmd: CreateEmployeeCommand,
) -> Result<EmployeeDetail, ServiceError> {
    require(identity, Permission::Employees, "create")?;

    let login_id = cmd.login_id.trim();
    if !validation::is_login_id(login_id) {
        return Err(ServiceError::BadRequest("invalid_login_id"));
    }
    let name = validation::require_len("invalid_name", &cmd.name, 1, 50)?;
    let email = validation::optional_email(cmd.email.as_deref())?;
    let phone = validation::optional_phone(cmd.phone.as_deref())?;
    let position = validation::optional_len("invalid_position", cmd.position.as_deref(), 50)?;
    validation::password(&cmd.password)?;
    let permissions = checked_permissions(identity, &cmd.permissions, &[])?;

    let password_hash = hash_limited(state, &cmd.password, "employee_create").await?;
    let repo = EmployeeRepo::new(&state.db);
    let id = repo
        .create(&NewEmployee {
            login_id,
            name: &name,
            email: email.as_deref(),
            phone: phone.as_deref(),
            position: position.as_deref(),
            password_hash: &password_hash,
            status: EmployeeStatus::Active,
            created_at: Utc::now(),
        })
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::Conflict("login_id_taken")
            } else {
                db_error("employee_create", err)
            }
        })?;
    repo.set_permissions(id, &permissions)
        .await
        .map_err(|err| db_error("employee_set_permissions", err))?;

    tracing::info!(
        event = "employee_created",
        employee_id = id,
        by = identity.employee_id,
        "Employee created"
    );
    Ok(EmployeeDetail {
        employee: load(&repo, id).await?,
        permissions,
    })
}

/// Owners edit their own profile; status changes need the permission and
/// never apply to the caller.
pub async fn update_employee(
    state: &AppState,
    identity: &Identity,
    id: i64,
    cmd: UpdateEmployeeCommand,
) -> Result<EmployeeDetail, ServiceError> {
    require_owner_or(identity, Some(id), Permission::Employees, "update")?;
    let repo = EmployeeRepo::new(&state.db);
    let current = load(&repo, id).await?;

    let status = match cmd.status {
        Some(status) if status != current.status => {
            if !has(identity, Permission::Employees) {
                return Err(ServiceError::Forbidden("status_change_forbidden"));
            }
            if id == identity.employee_id {
                return Err(ServiceError::BadRequest("cannot_change_own_status"));
            }
            let target_permissions = permissions_of(&repo, id).await?;
            require_super_admin_for(identity, &target_permissions)?;
            if status != EmployeeStatus::Active
                && target_permissions.contains(&Permission::SuperAdmin.id())
            {
                ensure_not_last_super_admin(&repo, &current).await?;
            }
            status
        }
        _ => current.status,
    };
    let name = validation::require_len("invalid_name", &cmd.name, 1, 50)?;
    let email = validation::optional_email(cmd.email.as_deref())?;
    let phone = validation::optional_phone(cmd.phone.as_deref())?;
    let position = validation::optional_len("invalid_position", cmd.position.as_deref(), 50)?;

    repo.update_profile(
        id,
        &EmployeeProfile {
            name: &name,
            email: email.as_deref(),
            phone: phone.as_deref(),
            position: position.as_deref(),
            status,
        },
    )
    .await
    .map_err(|err| db_error("employee_update", err))?;
    tracing::info!(event = "employee_updated", employee_id = id, by = identity.employee_id);
    get_employee(state, identity, id).await
}

pub async fn delete_employee(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<(), ServiceError> {
    require(identity, Permission::Employees, "delete")?;
    if id == identity.employee_id {
        return Err(ServiceError::BadRequest("cannot_delete_self"));
    }
    let repo = EmployeeRepo::new(&state.db);
    let target = load(&repo, id).await?;
    let target_permissions = permissions_of(&repo, id).await?;
    if target_permissions.contains(&Permission::SuperAdmin.id()) {
        require_super_admin_for(identity, &target_permissions)?;
        ensure_not_last_super_admin(&repo, &target).await?;
    }
    repo.delete(id)
        .await
        .map_err(|err| db_error("employee_delete", err))?;
    tracing::info!(event = "employee_deleted", employee_id = id, by = identity.employee_id);
    Ok(())
}

pub async fn set_permissions(
    state: &AppState,
    identity: &Identity,
    id: i64,
    requested: Vec<i32>,
) -> Result<Vec<i32>, ServiceError> {
    require(identity, Permission::Employees, "set_permissions")?;
    let repo = EmployeeRepo::new(&state.db);
    let target = load(&repo, id).await?;
    let current = permissions_of(&repo, id).await?;
    let permissions = checked_permissions(identity, &requested, &current)?;
    if id == identity.employee_id {
        let keeps_access = permissions
            .iter()
            .any(|p| *p == Permission::SuperAdmin.id() || *p == Permission::Employees.id());
        if !keeps_access {
            return Err(ServiceError::BadRequest("cannot_remove_own_access"));
        }
    }
    let super_admin = Permission::SuperAdmin.id();
    if current.contains(&super_admin) && !permissions.contains(&super_admin) {
        ensure_not_last_super_admin(&repo, &target).await?;
    }
    repo.set_permissions(id, &permissions)
        .await
        .map_err(|err| db_error("employee_set_permissions", err))?;
    tracing::info!(
        event = "employee_permissions_set",
        employee_id = id,
        permissions = ?permissions,
        by = identity.employee_id
    );
    Ok(permissions)
}

/// Uses the supplied password or generates one; the plain value is returned
/// once so it can be handed over.
pub async fn reset_password(
    state: &AppState,
    identity: &Identity,
    id: i64,
    password: Option<String>,
) -> Result<ResetPasswordResult, ServiceError> {
    require(identity, Permission::Employees, "reset_password")?;
    let repo = EmployeeRepo::new(&state.db);
    load(&repo, id).await?;
    require_super_admin_for(identity, &permissions_of(&repo, id).await?)?;
    let password = match password.filter(|value| !value.is_empty()) {
        Some(value) => {
            validation::password(&value)?;
            value
        }
        None => generate_password(),
    };
    let password_hash = hash_limited(state, &password, "employee_reset_password").await?;
    repo.update_password(id, &password_hash)
        .await
        .map_err(|err| db_error("employee_reset_password", err))?;
    tracing::info!(event = "employee_password_reset", employee_id = id, by = identity.employee_id);
    Ok(ResetPasswordResult { password })
}

pub async fn list_permissions(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<PermissionRow>, ServiceError> {
    require(identity, Permission::Employees, "list_permissions")?;
    PermissionRepo::new(&state.db)
        .list()
        .await
        .map_err(|err| db_error("permission_list", err))
}
