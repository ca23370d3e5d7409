//! Account provisioning used by `classmark-cli`.
//!
//! Teachers and students are normally created by the wider application; these
//! helpers cover bootstrapping and local development.

use anyhow::{Context, bail};

use classmark_core::hash_password;
use classmark_models::{Student, Teacher};

use crate::repositories::{StudentRepository, TeacherRepository};

pub async fn create_teacher(
    teachers: &dyn TeacherRepository,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<Teacher> {
    if password.len() < 8 {
        bail!("Password must be at least 8 characters");
    }
    if teachers.find_by_email(email).await?.is_some() {
        bail!("A teacher with email {} already exists", email);
    }

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e.error))?;

    teachers
        .create(first_name, last_name, email, &password_hash)
        .await
        .context("Failed to insert teacher")
}

pub async fn create_student(
    students: &dyn StudentRepository,
    student_number: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> anyhow::Result<Student> {
    if students.find_by_number(student_number).await?.is_some() {
        bail!("Student number {} is already taken", student_number);
    }

    students
        .create(student_number, first_name, last_name, email)
        .await
        .context("Failed to insert student")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryStudentRepository, InMemoryTeacherRepository};
    use classmark_core::verify_password;

    #[tokio::test]
    async fn test_create_teacher_hashes_password() {
        let repo = InMemoryTeacherRepository::new();
        let teacher = create_teacher(&repo, "Ada", "Lovelace", "ada@school.edu", "analytical")
            .await
            .unwrap();

        let hash = repo.password_hash(teacher.id).unwrap();
        assert_ne!(hash, "analytical");
        assert!(verify_password("analytical", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_create_teacher_rejects_duplicate_email() {
        let repo = InMemoryTeacherRepository::new();
        create_teacher(&repo, "Ada", "Lovelace", "ada@school.edu", "analytical")
            .await
            .unwrap();

        let err = create_teacher(&repo, "Ada", "Byron", "ada@school.edu", "analytical")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_teacher_rejects_short_password() {
        let repo = InMemoryTeacherRepository::new();
        assert!(
            create_teacher(&repo, "Ada", "Lovelace", "ada@school.edu", "short")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_create_student_rejects_duplicate_number() {
        let repo = InMemoryStudentRepository::new();
        create_student(&repo, "S-001", "Grace", "Hopper", "grace@school.edu")
            .await
            .unwrap();

        assert!(
            create_student(&repo, "S-001", "Alan", "Turing", "alan@school.edu")
                .await
                .is_err()
        );
    }
}
