use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use classmark_core::ErrorResponse;
use classmark_models::{
    AccessTokenResponse, AttendanceDayId, AttendanceRecord, AttendanceValueId, DayKeyResponse,
    MessageResponse, PasswordResetConfirmRequest, PasswordResetRequest, ResolveSelfSignRequest,
    SelfSignId, SelfSignRecord, SelfSignRequest, SetDayKeyRequest, StudentAccessRequest,
    StudentId, StudentVerifyRequest, TeacherLoginRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::teacher_auth::controller::login,
        crate::modules::teacher_auth::controller::request_password_reset,
        crate::modules::teacher_auth::controller::confirm_password_reset,
        crate::modules::student_auth::controller::request_access,
        crate::modules::student_auth::controller::verify,
        crate::modules::student_auth::controller::forget_sessions,
        crate::modules::session::controller::refresh,
        crate::modules::session::controller::logout,
        crate::modules::self_sign::controller::set_day_key,
        crate::modules::self_sign::controller::delete_day_key,
        crate::modules::self_sign::controller::generate_day_key,
        crate::modules::self_sign::controller::list_pending,
        crate::modules::self_sign::controller::submit_self_sign,
        crate::modules::self_sign::controller::resolve,
    ),
    components(
        schemas(
            TeacherLoginRequest,
            PasswordResetRequest,
            PasswordResetConfirmRequest,
            StudentAccessRequest,
            StudentVerifyRequest,
            AccessTokenResponse,
            MessageResponse,
            SetDayKeyRequest,
            SelfSignRequest,
            ResolveSelfSignRequest,
            DayKeyResponse,
            SelfSignRecord,
            AttendanceRecord,
            AttendanceDayId,
            AttendanceValueId,
            SelfSignId,
            StudentId,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Teacher Authentication", description = "Teacher login and password reset"),
        (name = "Student Authentication", description = "Passwordless student sign-in"),
        (name = "Sessions", description = "Refresh and logout for both principal kinds"),
        (name = "Attendance Self-Sign", description = "Self-sign keys, submissions and resolution")
    ),
    info(
        title = "Classmark Auth API",
        version = "0.1.0",
        description = "Token based authentication and session lifecycle for Classmark.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme used by the attendance routes. Refresh
/// cookies are not modelled; they are HttpOnly and never set by hand.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let access_token = HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .bearer_format("JWT")
            .description(Some("Access token from login, verify or refresh"))
            .build();

        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme("bearer_auth", SecurityScheme::Http(access_token));
    }
}
