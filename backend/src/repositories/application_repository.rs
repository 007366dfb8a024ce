//! Application repository.
//!
//! The trait is the seam between the service layer and Postgres; it can be
//! mocked with mockall in tests. The concrete implementation holds the pool
//! it was constructed with, so callers never reach for a shared connection.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::application::{Application, ApplicationWithOwner, StatusCount};

const APPLICATION_COLUMNS: &str = "id, owner_id, subject, message, attachments, status, \
     reviewer_comment, submitted_at, decided_at, created_at, updated_at";

const JOINED_COLUMNS: &str = "a.id, a.owner_id, a.subject, a.message, a.attachments, a.status, \
     a.reviewer_comment, a.submitted_at, a.decided_at, a.created_at, a.updated_at, \
     u.name AS owner_name, u.email AS owner_email";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationRepositoryTrait: Send + Sync {
    /// Persist a new application and return the stored row.
    async fn create(&self, item: &Application) -> Result<Application, AppError>;

    /// Find an application by id, joined with its owner's display fields.
    async fn find_by_id(&self, id: &str) -> Result<Option<ApplicationWithOwner>, AppError>;

    /// All applications, newest submission first.
    async fn find_all(&self) -> Result<Vec<ApplicationWithOwner>, AppError>;

    /// Applications owned by one user, newest submission first.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<ApplicationWithOwner>, AppError>;

    /// Persist the full row of an existing application. Fails with NotFound
    /// when the id no longer exists.
    async fn update(&self, item: &Application) -> Result<Application, AppError>;

    /// Row counts grouped by status. Statuses with no rows are absent.
    async fn count_by_status(&self) -> Result<Vec<StatusCount>, AppError>;
}

#[derive(Debug, Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationRepositoryTrait for ApplicationRepository {
    async fn create(&self, item: &Application) -> Result<Application, AppError> {
        let query = format!(
            "INSERT INTO applications ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            APPLICATION_COLUMNS, APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Application>(&query)
            .bind(&item.id)
            .bind(&item.owner_id)
            .bind(item.subject.as_str())
            .bind(&item.message)
            .bind(&item.attachments)
            .bind(item.status.as_str())
            .bind(&item.reviewer_comment)
            .bind(item.submitted_at)
            .bind(item.decided_at)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ApplicationWithOwner>, AppError> {
        let query = format!(
            "SELECT {} FROM applications a JOIN users u ON u.id = a.owner_id WHERE a.id = $1",
            JOINED_COLUMNS
        );
        let row = sqlx::query_as::<_, ApplicationWithOwner>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self) -> Result<Vec<ApplicationWithOwner>, AppError> {
        let query = format!(
            "SELECT {} FROM applications a JOIN users u ON u.id = a.owner_id \
             ORDER BY a.submitted_at DESC, a.created_at DESC",
            JOINED_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApplicationWithOwner>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<ApplicationWithOwner>, AppError> {
        let query = format!(
            "SELECT {} FROM applications a JOIN users u ON u.id = a.owner_id \
             WHERE a.owner_id = $1 ORDER BY a.submitted_at DESC, a.created_at DESC",
            JOINED_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApplicationWithOwner>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update(&self, item: &Application) -> Result<Application, AppError> {
        let query = format!(
            "UPDATE applications SET subject = $2, message = $3, attachments = $4, \
             status = $5, reviewer_comment = $6, decided_at = $7, updated_at = $8 \
             WHERE id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Application>(&query)
            .bind(&item.id)
            .bind(item.subject.as_str())
            .bind(&item.message)
            .bind(&item.attachments)
            .bind(item.status.as_str())
            .bind(&item.reviewer_comment)
            .bind(item.decided_at)
            .bind(item.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
        Ok(row)
    }

    async fn count_by_status(&self) -> Result<Vec<StatusCount>, AppError> {
        let rows = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM applications GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_application_repository_is_send_and_sync() {
        fn check_send_sync<T: Send + Sync>() {}
        check_send_sync::<MockApplicationRepositoryTrait>();
    }
}
