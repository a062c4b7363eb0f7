use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record. One-time code columns and their expiries are both-set or
/// both-NULL, enforced by CHECK constraints in the schema.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = r#"
    id, email, first_name, last_name, password_hash, is_verified,
    verification_token, verification_expires_at,
    reset_password_token, reset_password_expires_at,
    created_at, updated_at
"#;

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new unverified user with a pending verification code.
    pub async fn create(
        db: &PgPool,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
        verification_token: &str,
        verification_expires_at: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users
                (first_name, last_name, email, password_hash,
                 verification_token, verification_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(password_hash)
        .bind(verification_token)
        .bind(verification_expires_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Match the pending verification code and consume it in one statement.
    ///
    /// Zero rows means unknown email, wrong code, or expired window; the
    /// caller cannot and must not distinguish these. The single conditional
    /// UPDATE also closes the find-then-clear race: a code can only ever be
    /// consumed once.
    pub async fn consume_verification(
        db: &PgPool,
        email: &str,
        code: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verification_token = NULL,
                verification_expires_at = NULL,
                updated_at = now()
            WHERE email = $1
              AND verification_token = $2
              AND verification_expires_at > now()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(code)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Overwrite any pending verification code; only the newest is valid.
    pub async fn set_verification_code(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_token = $2,
                verification_expires_at = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Overwrite any pending reset code; independent of the verification
    /// pool, so both can be outstanding at once.
    pub async fn set_reset_code(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = $2,
                reset_password_expires_at = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Match the pending reset code, swap in the new hash and clear the code
    /// in one statement. Returns false when nothing matched (ambiguous on
    /// purpose, same as `consume_verification`).
    pub async fn consume_reset(
        db: &PgPool,
        email: &str,
        code: &str,
        new_password_hash: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                reset_password_token = NULL,
                reset_password_expires_at = NULL,
                updated_at = now()
            WHERE email = $1
              AND reset_password_token = $2
              AND reset_password_expires_at > now()
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(new_password_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use time::Duration;

    async fn seed_user(db: &PgPool, email: &str, code: &str, expires_at: OffsetDateTime) -> User {
        User::create(db, "A", "B", email, "hash", code, expires_at)
            .await
            .expect("seed user")
    }

    fn in_fifteen_minutes() -> OffsetDateTime {
        OffsetDateTime::now_utc() + Duration::minutes(15)
    }

    #[sqlx::test]
    async fn verification_code_is_single_use(db: PgPool) {
        seed_user(&db, "a@x.com", "aB3x9Z", in_fifteen_minutes()).await;

        let user = User::consume_verification(&db, "a@x.com", "aB3x9Z")
            .await
            .expect("consume");
        let user = user.expect("first use matches");
        assert!(user.is_verified);
        assert!(user.verification_token.is_none());
        assert!(user.verification_expires_at.is_none());

        // the first use cleared the code, so presenting it again misses
        let replay = User::consume_verification(&db, "a@x.com", "aB3x9Z")
            .await
            .expect("consume");
        assert!(replay.is_none());
    }

    #[sqlx::test]
    async fn expired_verification_code_is_rejected(db: PgPool) {
        let expired = OffsetDateTime::now_utc() - Duration::minutes(1);
        seed_user(&db, "a@x.com", "aB3x9Z", expired).await;

        let user = User::consume_verification(&db, "a@x.com", "aB3x9Z")
            .await
            .expect("consume");
        assert!(user.is_none());
    }

    #[sqlx::test]
    async fn wrong_code_and_wrong_email_both_miss(db: PgPool) {
        seed_user(&db, "a@x.com", "aB3x9Z", in_fifteen_minutes()).await;

        let wrong_code = User::consume_verification(&db, "a@x.com", "zZzZzZ")
            .await
            .expect("consume");
        assert!(wrong_code.is_none());

        let wrong_email = User::consume_verification(&db, "b@x.com", "aB3x9Z")
            .await
            .expect("consume");
        assert!(wrong_email.is_none());
    }

    #[sqlx::test]
    async fn reissued_verification_code_supersedes_the_old_one(db: PgPool) {
        let user = seed_user(&db, "a@x.com", "0ldC0d", in_fifteen_minutes()).await;
        User::set_verification_code(&db, user.id, "n3wC0d", in_fifteen_minutes())
            .await
            .expect("reissue");

        let old = User::consume_verification(&db, "a@x.com", "0ldC0d")
            .await
            .expect("consume");
        assert!(old.is_none());

        let new = User::consume_verification(&db, "a@x.com", "n3wC0d")
            .await
            .expect("consume");
        assert!(new.is_some());
    }

    #[sqlx::test]
    async fn reset_code_is_single_use(db: PgPool) {
        let user = seed_user(&db, "a@x.com", "vC0d3x", in_fifteen_minutes()).await;
        User::set_reset_code(&db, user.id, "rC0d3x", in_fifteen_minutes())
            .await
            .expect("set reset code");

        let consumed = User::consume_reset(&db, "a@x.com", "rC0d3x", "new-hash")
            .await
            .expect("consume");
        assert!(consumed);

        let stored = User::find_by_id(&db, user.id)
            .await
            .expect("find")
            .expect("user exists");
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.reset_password_token.is_none());
        assert!(stored.reset_password_expires_at.is_none());

        // replaying the same (email, code) pair fails
        let replay = User::consume_reset(&db, "a@x.com", "rC0d3x", "other-hash")
            .await
            .expect("consume");
        assert!(!replay);
    }

    #[sqlx::test]
    async fn expired_reset_code_is_rejected(db: PgPool) {
        let user = seed_user(&db, "a@x.com", "vC0d3x", in_fifteen_minutes()).await;
        let expired = OffsetDateTime::now_utc() - Duration::minutes(1);
        User::set_reset_code(&db, user.id, "rC0d3x", expired)
            .await
            .expect("set reset code");

        let consumed = User::consume_reset(&db, "a@x.com", "rC0d3x", "new-hash")
            .await
            .expect("consume");
        assert!(!consumed);
    }

    #[sqlx::test]
    async fn reset_pool_is_independent_of_verification_pool(db: PgPool) {
        // both codes outstanding at once; consuming one leaves the other
        let user = seed_user(&db, "a@x.com", "vC0d3x", in_fifteen_minutes()).await;
        User::set_reset_code(&db, user.id, "rC0d3x", in_fifteen_minutes())
            .await
            .expect("set reset code");

        assert!(User::consume_reset(&db, "a@x.com", "rC0d3x", "new-hash")
            .await
            .expect("consume"));

        let verified = User::consume_verification(&db, "a@x.com", "vC0d3x")
            .await
            .expect("consume");
        assert!(verified.is_some());
    }

    #[sqlx::test]
    async fn duplicate_email_insert_maps_to_conflict(db: PgPool) {
        seed_user(&db, "a@x.com", "aB3x9Z", in_fifteen_minutes()).await;

        let err = User::create(
            &db,
            "C",
            "D",
            "a@x.com",
            "hash",
            "zZzZzZ",
            in_fifteen_minutes(),
        )
        .await
        .expect_err("duplicate email must fail");
        let api = ApiError::conflict_on_unique(err, "Email already exists");
        assert!(matches!(api, ApiError::Conflict(_)));
        assert_eq!(api.to_string(), "Email already exists");
    }
}
