use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

const QUOTE_COLUMNS: &str = "q.id, q.created_at, q.user_id, q.name, q.email, q.phone, \
     q.business_name, q.service_type, q.budget, q.project_details, q.timeline";

pub struct UserQueries;

impl UserQueries {
    pub async fn create_user(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, email_confirmed_at, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, email_confirmed_at, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, email_confirmed_at, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_password(pool: &PgPool, id: Uuid, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn confirm_email(pool: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET email_confirmed_at = COALESCE(email_confirmed_at, NOW()) WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }
}

pub struct SessionQueries;

impl SessionQueries {
    pub async fn create_session(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Uuid> {
        sqlx::query_scalar("INSERT INTO auth_sessions (user_id) VALUES ($1) RETURNING id")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn is_active(pool: &PgPool, id: Uuid, user_id: Uuid) -> sqlx::Result<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM auth_sessions
                WHERE id = $1 AND user_id = $2 AND revoked_at IS NULL
            )
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn revoke(pool: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("UPDATE auth_sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

pub struct CodeQueries;

impl CodeQueries {
    /// Replaces any outstanding code for the user.
    pub async fn upsert_code(
        pool: &PgPool,
        user_id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_codes (user_id, code_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET code_hash = EXCLUDED.code_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Deletes the code if it matches and is unexpired. Returns whether it did.
    pub async fn consume_code(pool: &PgPool, user_id: Uuid, code_hash: &str) -> sqlx::Result<bool> {
        let consumed: Option<Uuid> = sqlx::query_scalar(
            r#"
            DELETE FROM verification_codes
            WHERE user_id = $1 AND code_hash = $2 AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .fetch_optional(pool)
        .await?;

        Ok(consumed.is_some())
    }
}

pub struct ResetQueries;

impl ResetQueries {
    pub async fn create_reset(
        pool: &PgPool,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO password_resets (token_hash, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Single use: the row is deleted whether or not it has expired.
    pub async fn consume_reset(pool: &PgPool, token_hash: &str) -> sqlx::Result<Option<Uuid>> {
        let row: Option<(Uuid, DateTime<Utc>)> = sqlx::query_as(
            "DELETE FROM password_resets WHERE token_hash = $1 RETURNING user_id, expires_at",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(row
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(user_id, _)| user_id))
    }
}

pub struct QuoteQueries;

impl QuoteQueries {
    pub async fn create_quote(
        pool: &PgPool,
        owner: Uuid,
        details: &QuoteDetails,
    ) -> sqlx::Result<QuoteRecord> {
        sqlx::query_as::<_, QuoteRecord>(&format!(
            r#"
            INSERT INTO quote_requests AS q
                (user_id, name, email, phone, business_name, service_type, budget, project_details, timeline)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            QUOTE_COLUMNS
        ))
        .bind(owner)
        .bind(&details.name)
        .bind(&details.email)
        .bind(details.phone.as_deref())
        .bind(&details.business_name)
        .bind(details.service_type.as_str())
        .bind(details.budget.map(|budget| budget.as_str()))
        .bind(&details.project_details)
        .bind(details.timeline.as_deref())
        .fetch_one(pool)
        .await
    }

    /// Owner rows always; everyone's rows only for `All` when the viewer holds the admin role.
    pub async fn list_visible(
        pool: &PgPool,
        viewer: Uuid,
        scope: QuoteScope,
    ) -> sqlx::Result<Vec<QuoteRecord>> {
        sqlx::query_as::<_, QuoteRecord>(&format!(
            r#"
            SELECT {}
            FROM quote_requests q
            WHERE q.user_id = $1
               OR ($2 AND EXISTS (
                    SELECT 1 FROM user_roles r
                    WHERE r.user_id = $1 AND r.role = $3
               ))
            ORDER BY q.created_at DESC, q.id DESC
            "#,
            QUOTE_COLUMNS
        ))
        .bind(viewer)
        .bind(scope == QuoteScope::All)
        .bind(Role::Admin.as_str())
        .fetch_all(pool)
        .await
    }
}

pub struct RoleQueries;

impl RoleQueries {
    pub async fn find_role(
        pool: &PgPool,
        user_id: Uuid,
        role: Role,
    ) -> sqlx::Result<Option<RoleAssignment>> {
        sqlx::query_as::<_, RoleAssignment>(
            "SELECT id, user_id, role, created_at FROM user_roles WHERE user_id = $1 AND role = $2",
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await
    }

    pub async fn list_role(pool: &PgPool, role: Role) -> sqlx::Result<Vec<RoleAssignment>> {
        sqlx::query_as::<_, RoleAssignment>(
            "SELECT id, user_id, role, created_at FROM user_roles WHERE role = $1 ORDER BY created_at DESC",
        )
        .bind(role.as_str())
        .fetch_all(pool)
        .await
    }

    pub async fn grant_role(pool: &PgPool, user_id: Uuid, role: Role) -> sqlx::Result<RoleAssignment> {
        sqlx::query_as::<_, RoleAssignment>(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO UPDATE SET role = EXCLUDED.role
            RETURNING id, user_id, role, created_at
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(pool)
        .await
    }
}
