use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedRole {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub assigned_at: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedPosition {
    pub id: u64,
    pub position_name: String,
    #[serde(default)]
    pub organizational_unit_name: String,
    #[serde(default)]
    pub assigned_at: String,
}

/// The authenticated user's own record, richer than the persisted
/// [`Identity`](super::Identity).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub active_roles: Vec<AssignedRole>,
    #[serde(default)]
    pub active_positions: Vec<AssignedPosition>,
}

pub const PROFILE_FIELDS: &[&str] = &["name", "cpf", "birth_date", "phone", "whatsapp"];

pub const PASSWORD_FIELDS: &[&str] = &[
    "current_password",
    "new_password",
    "new_password_confirmation",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}
