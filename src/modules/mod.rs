pub mod self_sign;
pub mod session;
pub mod student_auth;
pub mod teacher_auth;
