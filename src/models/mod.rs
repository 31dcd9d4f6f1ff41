pub mod appointment;
pub mod enums;
pub mod filters;
pub mod pet;
pub mod service;
pub mod user;

pub use appointment::*;
pub use enums::*;
pub use filters::*;
pub use pet::*;
pub use service::*;
pub use user::*;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Read an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Audit envelope owned by the record-storage side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub creation_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_update: Option<NaiveDateTime>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_user_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_user_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_user_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_user_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_user_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_user_updated: Option<String>,
}

/// `{ "data": .., "meta": .. }` wrapper every list endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub data: T,
    #[serde(default)]
    pub meta: Meta,
}

impl<T> Record<T> {
    pub fn new(data: T) -> Self {
        Self { data, meta: Meta::default() }
    }
}
