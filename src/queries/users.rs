use crate::database::DbConn;
use crate::error::Result;
use crate::models::user::{NewUser, User};
use uuid::Uuid;

pub async fn create_user(conn: &mut DbConn, new_user: &NewUser) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, platform_user_id, platform_team_id, display_name, email, avatar_url, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now(), now())
        RETURNING id, platform_user_id, platform_team_id, display_name, email, avatar_url, created_at, updated_at
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(&new_user.platform_user_id)
    .bind(&new_user.platform_team_id)
    .bind(&new_user.display_name)
    .bind(&new_user.email)
    .bind(&new_user.avatar_url)
    .fetch_one(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn get_user_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

pub async fn get_user_by_platform_identity(
    conn: &mut DbConn,
    platform_user_id: &str,
    platform_team_id: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE platform_user_id = $1 AND platform_team_id = $2",
    )
    .bind(platform_user_id)
    .bind(platform_team_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

/// Finds the user for a platform identity, creating it on first observation.
pub async fn get_or_create_user(conn: &mut DbConn, new_user: &NewUser) -> Result<User> {
    if let Some(existing) =
        get_user_by_platform_identity(conn, &new_user.platform_user_id, &new_user.platform_team_id).await?
    {
        return Ok(existing);
    }
    create_user(conn, new_user).await
}
