use serde::{Deserialize, Serialize};

use crate::auth::repo::User;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

/// Request body for all the flows that only take an address: resend
/// verification, request reset, resend reset.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Public part of the user returned to the client. Never the hash, never a
/// pending code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_verified: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Profile plus tokens. Tokens are `null` when a sign-in succeeds for an
/// account that has not verified its email yet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: PublicUser,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_data_serializes_null_tokens_for_unverified() {
        let data = SessionData {
            user: PublicUser {
                first_name: "A".into(),
                last_name: "B".into(),
                email: "a@x.com".into(),
                is_verified: false,
            },
            access_token: None,
            refresh_token: None,
        };
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"accessToken\":null"));
        assert!(json.contains("\"refreshToken\":null"));
        assert!(json.contains("\"isVerified\":false"));
    }

    #[test]
    fn signup_request_uses_camel_case_field_names() {
        let body = r#"{"firstName":"A","lastName":"B","email":"a@x.com","password":"password1"}"#;
        let req: SignupRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.first_name, "A");
        assert_eq!(req.last_name, "B");
    }

    #[test]
    fn reset_request_uses_camel_case_new_password() {
        let body = r#"{"email":"a@x.com","code":"aB3x9Z","newPassword":"password2"}"#;
        let req: ResetPasswordRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.new_password, "password2");
    }
}
