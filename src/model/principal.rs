use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub real_name: String,
    /// CSV of role names, see `RoleSet::to_csv`.
    pub roles: String,
    pub manager_id: Option<i64>,
    /// ACTIVE or LEFT.
    pub status: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
}

pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_LEFT: &str = "LEFT";
