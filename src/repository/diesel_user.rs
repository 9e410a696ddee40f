//! User repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::diesel_models::{NewUserRow, UserRow};
use super::pool::DbPool;
use crate::error::StoreResult;
use crate::models::{NewUser, User};
use crate::schema::users;
use crate::with_conn;

#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create an account. A taken username fails with `DuplicateKey`.
    pub async fn create(&self, user: &NewUser) -> StoreResult<User> {
        let created_at = chrono::Utc::now().to_rfc3339();
        let row = NewUserRow {
            username: user.username.trim(),
            email: user.email.as_deref(),
            role: user.role.as_str(),
            email_confirmed: false,
            auth_id: user.auth_id.as_deref(),
            created_at: &created_at,
        };

        let created: UserRow = with_conn!(self.pool, conn => {
            diesel::insert_into(users::table)
                .values(&row)
                .returning(UserRow::as_returning())
                .get_result(&mut conn)
                .await
        })?;
        Ok(created.into())
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = with_conn!(self.pool, conn => {
            users::table
                .find(id)
                .select(UserRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;
        Ok(row.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let username = username.trim();
        let row: Option<UserRow> = with_conn!(self.pool, conn => {
            users::table
                .filter(users::username.eq(username))
                .select(UserRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;
        Ok(row.map(User::from))
    }
}
