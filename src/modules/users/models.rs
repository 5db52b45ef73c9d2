use serde::{Deserialize, Serialize};
use shelf_http::{FieldViolation, Validate};

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 254;

/// Stored account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
}

/// `POST /register` body
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn violations(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if !is_valid_email(&self.email) {
            violations.push(FieldViolation::new(
                "email",
                "value is not a valid email address",
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            violations.push(FieldViolation::new(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        violations
    }
}

/// Public view of an account; never includes the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// OAuth2 password-grant form for `POST /token`. Extra form fields such as
/// `grant_type` and `scope` are accepted and ignored.
#[derive(Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

impl Validate for TokenRequest {
    fn violations(&self) -> Vec<FieldViolation> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Lowercase the domain part; the local part is kept as given.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Structural email check: one `@`, a non-empty local part, and a dotted
/// domain made of non-empty labels.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}
