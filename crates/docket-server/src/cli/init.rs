use chrono::Utc;
use clap::Args;
use docket_core::validation;
use docket_core::{EmployeeStatus, Permission};
use docket_db::repo::{EmployeeRepo, NewEmployee};
use docket_db::SqlitePool;
use serde::Serialize;

use crate::domains::auth::core::passwords::hash_password;
use crate::settings::Settings;

#[derive(Debug, Clone, Args)]
pub struct InitArgs {
    #[arg(long)]
    pub login_id: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    employee_id: i64,
    login_id: String,
    permissions: Vec<&'static str>,
}

/// Creates an active employee holding every permission. Refuses to run once
/// any employee exists.
pub async fn run(settings: &Settings, db: &SqlitePool, args: &InitArgs) -> Result<(), String> {
    let login_id = args.login_id.trim();
    if !validation::is_login_id(login_id) {
        return Err("invalid_login_id".to_string());
    }
    let name = validation::require_len("invalid_name", &args.name, 1, 50)
        .map_err(|err| err.code.to_string())?;
    validation::password(&args.password).map_err(|err| err.code.to_string())?;

    let repo = EmployeeRepo::new(db);
    let existing = repo.count().await.map_err(|err| {
        tracing::error!(event = "init_failed", error = %err, "Employee count failed");
        "db_error".to_string()
    })?;
    if existing > 0 {
        return Err("employees_exist".to_string());
    }

    let kdf = settings.config.auth.kdf.clone();
    let password = args.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, &kdf))
        .await
        .map_err(|_| "kdf_failed".to_string())?
        .map_err(str::to_string)?;

    let employee_id = repo
        .create(&NewEmployee {
            login_id,
            name: &name,
            email: None,
            phone: None,
            position: None,
            password_hash: &password_hash,
            status: EmployeeStatus::Active,
            created_at: Utc::now(),
        })
        .await
        .map_err(|err| {
            tracing::error!(event = "init_failed", error = %err, "Employee insert failed");
            "db_error".to_string()
        })?;
    let permissions: Vec<i32> = Permission::ALL.iter().map(|p| p.id()).collect();
    repo.set_permissions(employee_id, &permissions)
        .await
        .map_err(|err| {
            tracing::error!(event = "init_failed", error = %err, "Permission grant failed");
            "db_error".to_string()
        })?;

    tracing::info!(event = "init_completed", employee_id, login_id = %login_id);
    let output = InitOutput {
        employee_id,
        login_id: login_id.to_string(),
        permissions: Permission::ALL.iter().map(|p| p.as_str()).collect(),
    };
    let json = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}
