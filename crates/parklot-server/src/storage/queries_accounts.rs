//! Account and session queries.

use parklot_core::db::unix_timestamp;

use super::db::{DatabaseError, ParkingDatabase};
use super::models::{Admin, Reservation, Session, User};

impl ParkingDatabase {
    // =========================================================================
    // Admin queries
    // =========================================================================

    /// Create an admin account.
    pub async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Admin, DatabaseError> {
        let now = unix_timestamp();

        let result =
            sqlx::query("INSERT INTO admins (username, password_hash, created_at) VALUES (?, ?, ?)")
                .bind(username)
                .bind(password_hash)
                .bind(now)
                .execute(self.pool())
                .await?;

        self.get_admin(result.last_insert_rowid()).await
    }

    /// Get an admin by ID.
    pub async fn get_admin(&self, id: i64) -> Result<Admin, DatabaseError> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Admin {id}")))
    }

    /// Get an admin by username.
    pub async fn get_admin_by_username(&self, username: &str) -> Result<Option<Admin>, DatabaseError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?;

        Ok(admin)
    }

    pub async fn count_admins(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a user. The email is expected to be normalised already.
    pub async fn create_user(
        &self,
        email: &str,
        full_name: &str,
        password_hash: &str,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO users (email, full_name, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind(full_name)
        .bind(password_hash)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(result.last_insert_rowid()).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    pub async fn user_email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool())
            .await?;
        Ok(row.0 > 0)
    }

    /// Find the user a login name refers to: email (case-insensitive) or full name.
    pub async fn find_user_for_login(&self, login: &str) -> Result<Option<User>, DatabaseError> {
        let login = login.trim();
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = ? OR full_name = ? ORDER BY id LIMIT 1",
        )
        .bind(login.to_lowercase())
        .bind(login)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        Ok(users)
    }

    /// Delete a user and their reservations, freeing any spot they still hold.
    ///
    /// Returns the reservations that were open at deletion time.
    pub async fn delete_user(&self, id: i64) -> Result<Vec<Reservation>, DatabaseError> {
        let mut tx = self.begin_write().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }

        let open = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = ? AND status = 'booked'",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for reservation in &open {
            sqlx::query(
                "UPDATE parking_spots SET status = 'available', is_available = 1 WHERE id = ? AND status = 'occupied'",
            )
            .bind(reservation.spot_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM reservations WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(open)
    }

    // =========================================================================
    // Session queries
    // =========================================================================

    /// Record a login session keyed by the token ID.
    pub async fn create_session(
        &self,
        id: &str,
        account: &str,
        expires_at: i64,
    ) -> Result<Session, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query("INSERT INTO sessions (id, account, expires_at, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(account)
            .bind(expires_at)
            .bind(now)
            .execute(self.pool())
            .await?;

        self.get_session(id).await
    }

    pub async fn get_session(&self, id: &str) -> Result<Session, DatabaseError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Session {id}")))
    }

    /// Find a live (non-revoked, non-expired) session.
    pub async fn get_active_session(
        &self,
        id: &str,
        now: i64,
    ) -> Result<Option<Session>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE id = ? AND revoked = 0 AND expires_at > ?",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(session)
    }

    /// Revoke a session by ID.
    pub async fn revoke_session(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE sessions SET revoked = 1 WHERE id = ? AND revoked = 0")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke every session of an account.
    pub async fn revoke_account_sessions(&self, account: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE sessions SET revoked = 1 WHERE account = ?")
            .bind(account)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Drop expired and revoked sessions.
    pub async fn purge_sessions(&self, now: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE revoked = 1 OR expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
