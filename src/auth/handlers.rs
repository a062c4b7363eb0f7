use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookies::{removal_cookie, session_cookie, ACCESS_COOKIE, REFRESH_COOKIE},
        dto::{
            EmailRequest, PublicUser, RefreshData, ResetPasswordRequest, SessionData, SigninRequest,
            SignupData, SignupRequest, VerifyEmailRequest,
        },
        jwt::JwtKeys,
        otp::{generate_code, CODE_TTL},
        password::{hash_password, verify_password},
        repo::User,
    },
    error::{ApiError, ApiResponse},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-email", post(verify_email))
        .route(
            "/request-new-verification-email",
            post(request_new_verification_email),
        )
        .route("/signin", post(signin))
        .route("/request-password-reset", post(request_password_reset))
        .route("/password-reset", post(password_reset))
        .route(
            "/request-new-password-reset",
            post(request_new_password_reset),
        )
        .route("/signout", post(signout))
        .route("/refresh-token", post(refresh_token))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<ApiResponse<SignupData>, ApiError> {
    let SignupRequest {
        first_name,
        last_name,
        email,
        password,
    } = payload;

    if first_name.trim().is_empty()
        || last_name.trim().is_empty()
        || email.trim().is_empty()
        || password.is_empty()
    {
        return Err(ApiError::Validation("All fields are required".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "signup with existing email");
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let password_hash = hash_password(&password)?;
    let code = generate_code();
    let expires_at = OffsetDateTime::now_utc() + CODE_TTL;

    let user = User::create(
        &state.db,
        &first_name,
        &last_name,
        &email,
        &password_hash,
        &code,
        expires_at,
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "Email already exists"))?;

    // A send failure fails the whole request even though the row is already
    // committed; the user can recover via request-new-verification-email.
    state.mailer.send_verification(&user.email, &code).await?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(ApiResponse::ok(
        "User created successfully",
        SignupData {
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        },
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<(CookieJar, ApiResponse<SessionData>), ApiError> {
    // One conditional update: matches email + code + unexpired window and
    // clears the code, so replaying a used code always misses.
    let user = User::consume_verification(&state.db, &payload.email, &payload.code)
        .await?
        .ok_or(ApiError::InvalidOrExpiredCode(
            "Invalid or expired verification code",
        ))?;

    state
        .mailer
        .send_welcome(&user.email, &user.first_name)
        .await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    let secure = state.config.is_production();
    let jar = jar
        .add(session_cookie(
            ACCESS_COOKIE,
            access_token.clone(),
            keys.access_ttl,
            secure,
        ))
        .add(session_cookie(
            REFRESH_COOKIE,
            refresh_token.clone(),
            keys.refresh_ttl,
            secure,
        ));

    info!(user_id = %user.id, "email verified");
    Ok((
        jar,
        ApiResponse::ok(
            "Email verified successfully",
            SessionData {
                user: PublicUser::from(&user),
                access_token: Some(access_token),
                refresh_token: Some(refresh_token),
            },
        ),
    ))
}

#[instrument(skip(state, payload))]
pub async fn request_new_verification_email(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if user.is_verified {
        return Err(ApiError::AlreadyVerified);
    }

    // Overwrites any earlier code; only the newest one is ever accepted.
    let code = generate_code();
    let expires_at = OffsetDateTime::now_utc() + CODE_TTL;
    User::set_verification_code(&state.db, user.id, &code, expires_at).await?;
    state.mailer.send_verification(&user.email, &code).await?;

    info!(user_id = %user.id, "verification email re-sent");
    Ok(ApiResponse::message("New verification email sent successfully"))
}

#[instrument(skip(state, jar, payload))]
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SigninRequest>,
) -> Result<(CookieJar, ApiResponse<SessionData>), ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".into()));
    }

    // Unknown email and wrong password produce the identical error.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "signin with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    // Correct credentials for an unverified account: 200, but no session.
    if !user.is_verified {
        info!(user_id = %user.id, "signin before verification");
        return Ok((
            jar,
            ApiResponse::ok(
                "Login successful, but email not verified",
                SessionData {
                    user: PublicUser::from(&user),
                    access_token: None,
                    refresh_token: None,
                },
            ),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    let secure = state.config.is_production();
    let jar = jar
        .add(session_cookie(
            ACCESS_COOKIE,
            access_token.clone(),
            keys.access_ttl,
            secure,
        ))
        .add(session_cookie(
            REFRESH_COOKIE,
            refresh_token.clone(),
            keys.refresh_ttl,
            secure,
        ));

    info!(user_id = %user.id, "user signed in");
    Ok((
        jar,
        ApiResponse::ok(
            "Login successful, email verified",
            SessionData {
                user: PublicUser::from(&user),
                access_token: Some(access_token),
                refresh_token: Some(refresh_token),
            },
        ),
    ))
}

/// Issue (or unconditionally reissue) a reset code: any earlier code is
/// overwritten, so only the newest one is ever valid.
async fn issue_reset_code(state: &AppState, email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let code = generate_code();
    let expires_at = OffsetDateTime::now_utc() + CODE_TTL;
    User::set_reset_code(&state.db, user.id, &code, expires_at).await?;
    state.mailer.send_password_reset(&user.email, &code).await?;

    info!(user_id = %user.id, "password reset email sent");
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    issue_reset_code(&state, &payload.email).await?;
    Ok(ApiResponse::message("Password reset sent successfully"))
}

#[instrument(skip(state, payload))]
pub async fn request_new_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    issue_reset_code(&state, &payload.email).await?;
    Ok(ApiResponse::message(
        "A new password reset OTP has been sent to your email.",
    ))
}

#[instrument(skip(state, payload))]
pub async fn password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    // Presence is the only input check here; the length rule applies to
    // signup, not to reset completion.
    if payload.email.trim().is_empty()
        || payload.code.trim().is_empty()
        || payload.new_password.is_empty()
    {
        return Err(ApiError::Validation("All fields required".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    let consumed =
        User::consume_reset(&state.db, &payload.email, &payload.code, &new_hash).await?;
    if !consumed {
        return Err(ApiError::InvalidOrExpiredCode("Invalid or expired OTP"));
    }

    // No session is issued; the caller signs in with the new password.
    info!(email = %payload.email, "password reset completed");
    Ok(ApiResponse::message("Password reset successfully"))
}

/// Clears both session cookies. Idempotent: succeeds whether or not a
/// session existed.
#[instrument(skip(jar))]
pub async fn signout(jar: CookieJar) -> (CookieJar, ApiResponse<()>) {
    let jar = jar
        .remove(removal_cookie(ACCESS_COOKIE))
        .remove(removal_cookie(REFRESH_COOKIE));
    (jar, ApiResponse::message("Successfully signed out"))
}

#[instrument(skip(state, jar))]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<RefreshData>), ApiError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthorized("Refresh token not provided"))?;

    let keys = JwtKeys::from_ref(&state);
    // Bad signature, wrong secret and expiry all collapse into one reason.
    let claims = keys
        .verify_refresh(&token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired refresh token"))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized("User not found"))?;

    // Only the access token is reissued; the refresh token is not rotated.
    let access_token = keys.sign_access(user.id)?;
    let jar = jar.add(session_cookie(
        ACCESS_COOKIE,
        access_token.clone(),
        keys.access_ttl,
        state.config.is_production(),
    ));

    info!(user_id = %user.id, "access token refreshed");
    Ok((
        jar,
        ApiResponse::ok(
            "Access token refreshed successfully",
            RefreshData { access_token },
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
    }

    fn state_with(db: sqlx::PgPool) -> AppState {
        let fake = AppState::fake();
        AppState::from_parts(db, fake.config.clone(), fake.mailer.clone())
    }

    #[sqlx::test]
    async fn duplicate_signup_is_a_conflict(db: sqlx::PgPool) {
        let state = state_with(db);
        let request = || {
            Json(SignupRequest {
                first_name: "A".into(),
                last_name: "B".into(),
                email: "a@x.com".into(),
                password: "password1".into(),
            })
        };

        signup(State(state.clone()), request())
            .await
            .expect("first signup");
        let err = signup(State(state.clone()), request())
            .await
            .expect_err("second signup with same email");
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.to_string(), "Email already exists");
    }

    #[sqlx::test]
    async fn password_reset_accepts_any_non_empty_password_and_is_single_use(db: sqlx::PgPool) {
        let state = state_with(db);
        let expires = OffsetDateTime::now_utc() + CODE_TTL;
        let user = User::create(&state.db, "A", "B", "a@x.com", "hash", "vC0d3x", expires)
            .await
            .expect("seed user");
        User::set_reset_code(&state.db, user.id, "rC0d3x", expires)
            .await
            .expect("set reset code");

        let request = || {
            Json(ResetPasswordRequest {
                email: "a@x.com".into(),
                code: "rC0d3x".into(),
                new_password: "npw".into(),
            })
        };

        // presence is the only input check, so a short password passes
        let body = password_reset(State(state.clone()), request())
            .await
            .expect("first reset");
        assert_eq!(body.message, "Password reset successfully");

        let replay = password_reset(State(state), request()).await;
        assert!(matches!(replay, Err(ApiError::InvalidOrExpiredCode(_))));
    }

    #[sqlx::test]
    async fn resend_reset_uses_its_own_message(db: sqlx::PgPool) {
        let state = state_with(db);
        let expires = OffsetDateTime::now_utc() + CODE_TTL;
        User::create(&state.db, "A", "B", "a@x.com", "hash", "vC0d3x", expires)
            .await
            .expect("seed user");

        let body = request_new_password_reset(
            State(state.clone()),
            Json(EmailRequest {
                email: "a@x.com".into(),
            }),
        )
        .await
        .expect("resend");
        assert_eq!(
            body.message,
            "A new password reset OTP has been sent to your email."
        );

        let body = request_password_reset(
            State(state),
            Json(EmailRequest {
                email: "a@x.com".into(),
            }),
        )
        .await
        .expect("request");
        assert_eq!(body.message, "Password reset sent successfully");
    }

    #[tokio::test]
    async fn signout_clears_both_cookies() {
        use axum::response::IntoResponse;

        let (jar, body) = signout(CookieJar::new()).await;
        assert_eq!(body.status_code, 200);
        assert_eq!(body.message, "Successfully signed out");

        let response = (jar, body).into_response();
        let cookies: Vec<String> = response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
        assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
    }
}
