//! User-management error model.
//!
//! Callers branch on [`ErrorKind`] only. The wrapped cause exists for
//! diagnostics (logs, `source()` chains) and never changes the kind.

use thiserror::Error;

use warden_auth::Cause;

/// Result type used across the user-management core.
pub type UsersResult<T> = Result<T, UsersError>;

/// Externally branchable error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Email already taken during registration.
    Conflict,
    /// Group name already taken.
    GroupConflict,
    /// Malformed entity specification (e.g. invalid email).
    MalformedEntity,
    /// Missing or invalid credentials.
    Unauthorized,
    /// The policy backend did not grant the request.
    Authorization,
    NotFound,
    UserNotFound,
    /// Stored metadata could not be decoded.
    ScanMetadata,
    MissingEmail,
    MissingResetToken,
    RecoveryToken,
    GetToken,
    CreateUser,
    /// Password does not match the configured pattern.
    PasswordFormat,
    /// The password reset email could not be handed to the mailer.
    EmailDelivery,
    /// The backing store cannot serve requests at all.
    Unavailable,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Conflict => "email already taken",
            ErrorKind::GroupConflict => "group already exists",
            ErrorKind::MalformedEntity => "malformed entity specification",
            ErrorKind::Unauthorized => "missing or invalid credentials provided",
            ErrorKind::Authorization => "failed to perform authorization over the entity",
            ErrorKind::NotFound => "non-existent entity",
            ErrorKind::UserNotFound => "non-existent user",
            ErrorKind::ScanMetadata => "failed to scan metadata",
            ErrorKind::MissingEmail => "missing email for password reset",
            ErrorKind::MissingResetToken => "missing reset token",
            ErrorKind::RecoveryToken => "failed to generate password recovery token",
            ErrorKind::GetToken => "failed to fetch signed token",
            ErrorKind::CreateUser => "failed to create user",
            ErrorKind::PasswordFormat => "password does not meet the requirements",
            ErrorKind::EmailDelivery => "failed to deliver password reset email",
            ErrorKind::Unavailable => "user store unavailable",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct UsersError {
    kind: ErrorKind,
    #[source]
    cause: Option<Cause>,
}

impl UsersError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, cause: None }
    }

    /// Attach an underlying failure to `kind`.
    pub fn wrap(kind: ErrorKind, cause: impl Into<Cause>) -> Self {
        Self {
            kind,
            cause: Some(cause.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for UsersError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
