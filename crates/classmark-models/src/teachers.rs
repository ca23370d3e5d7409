use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::TeacherId;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Teacher {
    pub id: TeacherId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A teacher row including the bcrypt hash. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct TeacherCredentials {
    pub id: TeacherId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl TeacherCredentials {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<TeacherCredentials> for Teacher {
    fn from(c: TeacherCredentials) -> Self {
        Self {
            id: c.id,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
        }
    }
}
