use serde::{Deserialize, Serialize};

/// Capability tags stored in `employee_permissions.permission_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    SuperAdmin,
    Banners,
    Contents,
    Employees,
    Settings,
    Analytics,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::SuperAdmin,
        Permission::Banners,
        Permission::Contents,
        Permission::Employees,
        Permission::Settings,
        Permission::Analytics,
    ];

    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::SuperAdmin => 1,
            Self::Banners => 2,
            Self::Contents => 3,
            Self::Employees => 4,
            Self::Settings => 5,
            Self::Analytics => 6,
        }
    }

    #[must_use]
    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|permission| permission.id() == id)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Banners => "banners",
            Self::Contents => "contents",
            Self::Employees => "employees",
            Self::Settings => "settings",
            Self::Analytics => "analytics",
        }
    }

    /// Super admins pass every route check.
    #[must_use]
    pub const fn required_for(self) -> [Permission; 2] {
        [Permission::SuperAdmin, self]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub employee_id: i64,
    pub login_id: String,
    pub name: String,
    pub permissions: Vec<i32>,
}

impl Identity {
    #[must_use]
    pub fn has_any(&self, required: &[Permission]) -> bool {
        required
            .iter()
            .any(|permission| self.permissions.contains(&permission.id()))
    }
}

/// Grants when the caller owns the target resource or holds any of `required`.
#[must_use]
pub fn authorize(identity: &Identity, owner_id: Option<i64>, required: &[Permission]) -> bool {
    if owner_id == Some(identity.employee_id) {
        return true;
    }
    identity.has_any(required)
}
