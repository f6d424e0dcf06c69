use docket_core::{Employee, EmployeeStatus, PermissionRow};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct EmployeeResponse {
    #[serde(flatten)]
    pub(crate) employee: Employee,
    pub(crate) permissions: Vec<i32>,
}

impl EmployeeResponse {
    pub(crate) fn new(employee: Employee, permissions: Vec<i32>) -> Self {
        Self {
            employee,
            permissions,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct EmployeeListResponse {
    pub(crate) employees: Vec<Employee>,
    pub(crate) total: i64,
}

#[derive(Deserialize)]
pub(crate) struct ListEmployeesQuery {
    pub(crate) search: Option<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

#[derive(Deserialize)]
pub(crate) struct CreateEmployeeRequest {
    pub(crate) login_id: String,
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) position: Option<String>,
    pub(crate) password: String,
    #[serde(default)]
    pub(crate) permissions: Vec<i32>,
}

#[derive(Deserialize)]
pub(crate) struct UpdateEmployeeRequest {
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) position: Option<String>,
    pub(crate) status: Option<EmployeeStatus>,
}

#[derive(Deserialize)]
pub(crate) struct SetPermissionsRequest {
    pub(crate) permissions: Vec<i32>,
}

#[derive(Serialize)]
pub(crate) struct PermissionsResponse {
    pub(crate) permissions: Vec<i32>,
}

#[derive(Deserialize, Default)]
pub(crate) struct ResetPasswordRequest {
    pub(crate) password: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct ResetPasswordResponse {
    pub(crate) password: String,
}

#[derive(Serialize)]
pub(crate) struct PermissionCatalogResponse {
    pub(crate) permissions: Vec<PermissionRow>,
}
