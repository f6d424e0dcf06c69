use serde::{Deserialize, Serialize};

use crate::domains::employees::http::v1::types::EmployeeResponse;

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) login_id: String,
    pub(crate) password: String,
}

#[derive(Serialize)]
pub(crate) struct LoginResponse {
    pub(crate) token: String,
    pub(crate) token_type: &'static str,
    pub(crate) expires_in: i64,
    pub(crate) employee: EmployeeResponse,
}

#[derive(Deserialize)]
pub(crate) struct ChangePasswordRequest {
    pub(crate) current_password: String,
    pub(crate) new_password: String,
}
