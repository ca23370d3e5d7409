use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::StudentId;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    /// School-issued number students identify themselves with.
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
