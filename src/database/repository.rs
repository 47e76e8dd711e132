use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewUser, User, UserPatch};

/// Persistence operations for user records.
///
/// Each method is a single unconditional call; concurrent writers to the
/// same record are last-write-wins.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn find(&self) -> Result<Vec<User>, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// First record with the given username, in creation order
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    /// Applies `patch` and returns the record as it was before the write
    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        patch: UserPatch,
    ) -> Result<Option<User>, DatabaseError>;

    /// Removes the record and returns it, if it existed
    async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        let row = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, password)
             VALUES ($1, $2, $3)
             RETURNING id, username, password",
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find(&self) -> Result<Vec<User>, DatabaseError> {
        let rows = sqlx::query_as::<_, User>(
            "SELECT id, username, password FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, username, password FROM users
             WHERE username = $1
             ORDER BY created_at, id
             LIMIT 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        patch: UserPatch,
    ) -> Result<Option<User>, DatabaseError> {
        // The locked CTE snapshot is what RETURNING reports, not the new row
        let row = sqlx::query_as::<_, User>(
            "WITH old AS (
                SELECT id, username, password FROM users WHERE id = $1 FOR UPDATE
             )
             UPDATE users u
             SET username = COALESCE($2, u.username),
                 password = COALESCE($3, u.password)
             FROM old
             WHERE u.id = old.id
             RETURNING old.id, old.username, old.password",
        )
        .bind(id)
        .bind(patch.username)
        .bind(patch.password)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, User>(
            "DELETE FROM users WHERE id = $1 RETURNING id, username, password",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

/// Process-local repository used when no database is configured
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            password: user.password,
        };
        self.users.write().await.push(user.clone());
        Ok(user)
    }

    async fn find(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.users.read().await.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        patch: UserPatch,
    ) -> Result<Option<User>, DatabaseError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        let before = user.clone();
        patch.apply(user);
        Ok(Some(before))
    }

    async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let mut users = self.users.write().await;
        let removed = users
            .iter()
            .position(|u| u.id == id)
            .map(|index| users.remove(index));
        Ok(removed)
    }
}
