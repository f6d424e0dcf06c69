use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Popup,
    Top,
    Mid,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    SameWindow,
    NewWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Published,
    Hidden,
}

#[derive(Debug, Error)]
#[error("invalid {enum_name} value: {value}")]
pub struct EnumParseError {
    enum_name: &'static str,
    value: String,
}

impl EnumParseError {
    fn new(enum_name: &'static str, value: impl Into<String>) -> Self {
        Self {
            enum_name,
            value: value.into(),
        }
    }
}

/// Integer and string codecs for the enums stored as integer columns.
macro_rules! int_enum {
    ($ty:ident, $name:literal, { $($variant:ident = $value:literal => $label:literal),+ $(,)? }) => {
        impl $ty {
            #[must_use]
            pub const fn as_i32(self) -> i32 {
                match self {
                    $(Self::$variant => $value,)+
                }
            }

            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl TryFrom<i32> for $ty {
            type Error = EnumParseError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(EnumParseError::new($name, value.to_string())),
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = EnumParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(EnumParseError::new($name, value)),
                }
            }
        }
    };
}

int_enum!(EmployeeStatus, "employee_status", {
    Active = 1 => "active",
    Disabled = 2 => "disabled",
});

int_enum!(BannerKind, "banner_kind", {
    Popup = 1 => "popup",
    Top = 2 => "top",
    Mid = 3 => "mid",
    Bottom = 4 => "bottom",
});

int_enum!(LinkTarget, "link_target", {
    SameWindow = 1 => "same_window",
    NewWindow = 2 => "new_window",
});

int_enum!(ContentStatus, "content_status", {
    Published = 1 => "published",
    Hidden = 2 => "hidden",
});
