//! The review workflow itself: who may do what to an application, and how
//! its status moves between pending, approved, rejected and returned.
//!
//! Every operation here is a single request/response transaction against the
//! injected repositories; correctness relies on per-row write atomicity, and
//! two racing decisions on the same application resolve last-write-wins.

use std::sync::Arc;

use anyhow::anyhow;
use chrono_tz::Tz;

use crate::error::AppError;
use crate::models::application::{
    Application, ApplicationStats, ApplicationUpdate, ApplicationWithOwner, NewApplication,
    ReviewDecision,
};
use crate::models::user::UserRole;
use crate::repositories::{ApplicationRepositoryTrait, UserRepositoryTrait};
use crate::utils::time;
use crate::validation::rules;

#[derive(Clone)]
pub struct ApplicationService {
    applications: Arc<dyn ApplicationRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
    time_zone: Tz,
}

impl ApplicationService {
    pub fn new(
        applications: Arc<dyn ApplicationRepositoryTrait>,
        users: Arc<dyn UserRepositoryTrait>,
        time_zone: Tz,
    ) -> Self {
        Self {
            applications,
            users,
            time_zone,
        }
    }

    /// Creates a new pending application for `owner_id`. Attachment
    /// references must already be stored; this only records them.
    pub async fn submit(
        &self,
        owner_id: &str,
        new: NewApplication,
    ) -> Result<ApplicationWithOwner, AppError> {
        rules::validate_message(&new.message)?;

        let application = Application::new(
            owner_id.to_string(),
            new.subject,
            new.message,
            new.attachments,
        );
        let created = self.applications.create(&application).await?;
        self.load(&created.id).await
    }

    /// Reviewers see every application; everyone else only their own.
    pub async fn list(
        &self,
        role: &UserRole,
        caller_id: &str,
    ) -> Result<Vec<ApplicationWithOwner>, AppError> {
        if role.is_reviewer() {
            self.applications.find_all().await
        } else {
            self.applications.find_by_owner(caller_id).await
        }
    }

    pub async fn get(
        &self,
        role: &UserRole,
        caller_id: &str,
        id: &str,
    ) -> Result<ApplicationWithOwner, AppError> {
        let found = self
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(application_not_found)?;

        if !role.is_reviewer() && !found.application.is_owned_by(caller_id) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        Ok(found)
    }

    /// Applies a reviewer decision. The prior status is not restricted: an
    /// already-approved or rejected application may be re-decided, which
    /// also serves as the override path for mistaken decisions.
    pub async fn decide(
        &self,
        role: &UserRole,
        id: &str,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<ApplicationWithOwner, AppError> {
        ensure_reviewer(role)?;
        if let Some(ref comment) = comment {
            rules::validate_reviewer_comment(comment)?;
        }

        let found = self
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(application_not_found)?;

        let mut application = found.application;
        application.apply_decision(decision, comment, time::now_utc(&self.time_zone));
        self.applications.update(&application).await?;
        self.load(id).await
    }

    /// The owner's resubmission path: only the owner, and only while the
    /// application is in the `returned` state. Resets the application to
    /// pending and clears the previous decision.
    pub async fn edit(
        &self,
        caller_id: &str,
        id: &str,
        update: ApplicationUpdate,
    ) -> Result<ApplicationWithOwner, AppError> {
        let found = self
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(application_not_found)?;

        let mut application = found.application;
        if !application.is_owned_by(caller_id) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        if !application.is_returned() {
            return Err(AppError::InvalidState(
                "Application can only be updated when returned".to_string(),
            ));
        }
        if let Some(ref message) = update.message {
            rules::validate_message(message)?;
        }

        application.resubmit(update, time::now_utc(&self.time_zone));
        self.applications.update(&application).await?;
        self.load(id).await
    }

    /// Aggregate counts for the review dashboard; reviewer-only. Recomputed
    /// on every call, no caching.
    pub async fn stats(&self, role: &UserRole) -> Result<ApplicationStats, AppError> {
        ensure_reviewer(role)?;

        let counts = self.applications.count_by_status().await?;
        let total_users = self.users.count_by_role(UserRole::User).await?;
        Ok(ApplicationStats::from_counts(&counts, total_users))
    }

    async fn load(&self, id: &str) -> Result<ApplicationWithOwner, AppError> {
        self.applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::InternalServerError(anyhow!("stored application vanished")))
    }
}

fn ensure_reviewer(role: &UserRole) -> Result<(), AppError> {
    if role.is_reviewer() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Reviewer role required".to_string()))
    }
}

fn application_not_found() -> AppError {
    AppError::NotFound("Application not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::{ApplicationStatus, ApplicationSubject, StatusCount};
    use crate::repositories::{MockApplicationRepositoryTrait, MockUserRepositoryTrait};

    fn service(
        applications: MockApplicationRepositoryTrait,
        users: MockUserRepositoryTrait,
    ) -> ApplicationService {
        ApplicationService::new(Arc::new(applications), Arc::new(users), chrono_tz::UTC)
    }

    fn with_owner(application: Application) -> ApplicationWithOwner {
        ApplicationWithOwner {
            application,
            owner_name: "Test User".to_string(),
            owner_email: "test@example.com".to_string(),
        }
    }

    fn pending_application(owner_id: &str) -> Application {
        Application::new(
            owner_id.to_string(),
            ApplicationSubject::SickLeave,
            "need two days off".to_string(),
            vec![],
        )
    }

    fn returned_application(owner_id: &str) -> Application {
        let mut application = pending_application(owner_id);
        application.apply_decision(
            ReviewDecision::Returned,
            Some("incomplete".to_string()),
            chrono::Utc::now(),
        );
        application
    }

    #[tokio::test]
    async fn list_scopes_plain_users_to_their_own_applications() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications.expect_find_all().never();
        applications
            .expect_find_by_owner()
            .withf(|owner_id| owner_id == "user-1")
            .times(1)
            .returning(|_| Ok(vec![]));

        let service = service(applications, MockUserRepositoryTrait::new());
        let result = service.list(&UserRole::User, "user-1").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn list_gives_reviewers_every_application() {
        for role in [UserRole::Principal, UserRole::Admin] {
            let mut applications = MockApplicationRepositoryTrait::new();
            applications.expect_find_by_owner().never();
            applications
                .expect_find_all()
                .times(1)
                .returning(|| Ok(vec![with_owner(pending_application("someone-else"))]));

            let service = service(applications, MockUserRepositoryTrait::new());
            let result = service.list(&role, "reviewer-1").await.unwrap();
            assert_eq!(result.len(), 1);
        }
    }

    #[tokio::test]
    async fn get_denies_a_plain_user_reading_a_foreign_application() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_find_by_id()
            .returning(|_| Ok(Some(with_owner(pending_application("owner-a")))));

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service
            .get(&UserRole::User, "other-user", "app-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn get_lets_reviewers_read_any_application() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_find_by_id()
            .returning(|_| Ok(Some(with_owner(pending_application("owner-a")))));

        let service = service(applications, MockUserRepositoryTrait::new());
        let found = service
            .get(&UserRole::Admin, "admin-1", "app-1")
            .await
            .unwrap();
        assert_eq!(found.application.owner_id, "owner-a");
    }

    #[tokio::test]
    async fn get_reports_not_found_for_unknown_ids() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications.expect_find_by_id().returning(|_| Ok(None));

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service
            .get(&UserRole::Admin, "admin-1", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn submit_rejects_an_overlong_message_without_touching_the_repository() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications.expect_create().never();

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service
            .submit(
                "user-1",
                NewApplication {
                    subject: ApplicationSubject::Other,
                    message: "x".repeat(1001),
                    attachments: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_creates_a_pending_application() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_create()
            .withf(|application| {
                application.status == ApplicationStatus::Pending
                    && application.decided_at.is_none()
                    && application.owner_id == "user-1"
            })
            .times(1)
            .returning(|application| Ok(application.clone()));
        applications
            .expect_find_by_id()
            .returning(|_| Ok(Some(with_owner(pending_application("user-1")))));

        let service = service(applications, MockUserRepositoryTrait::new());
        let created = service
            .submit(
                "user-1",
                NewApplication {
                    subject: ApplicationSubject::SickLeave,
                    message: "need two days off".to_string(),
                    attachments: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(created.application.status, ApplicationStatus::Pending);
    }

    #[tokio::test]
    async fn decide_requires_a_reviewer_role() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications.expect_find_by_id().never();
        applications.expect_update().never();

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service
            .decide(&UserRole::User, "app-1", ReviewDecision::Approved, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn decide_sets_status_comment_and_decision_timestamp() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_find_by_id()
            .returning(|_| Ok(Some(with_owner(pending_application("owner-a")))));
        applications
            .expect_update()
            .withf(|application| {
                application.status == ApplicationStatus::Returned
                    && application.reviewer_comment.as_deref() == Some("add a doctor's note")
                    && application.decided_at.is_some()
            })
            .times(1)
            .returning(|application| Ok(application.clone()));

        let service = service(applications, MockUserRepositoryTrait::new());
        service
            .decide(
                &UserRole::Principal,
                "app-1",
                ReviewDecision::Returned,
                Some("add a doctor's note".to_string()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn decide_rejects_an_overlong_comment() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications.expect_find_by_id().never();
        applications.expect_update().never();

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service
            .decide(
                &UserRole::Admin,
                "app-1",
                ReviewDecision::Rejected,
                Some("x".repeat(501)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn an_already_approved_application_may_be_redecided() {
        let mut approved = pending_application("owner-a");
        approved.apply_decision(ReviewDecision::Approved, None, chrono::Utc::now());

        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_find_by_id()
            .returning(move |_| Ok(Some(with_owner(approved.clone()))));
        applications
            .expect_update()
            .withf(|application| application.status == ApplicationStatus::Rejected)
            .times(1)
            .returning(|application| Ok(application.clone()));

        let service = service(applications, MockUserRepositoryTrait::new());
        service
            .decide(&UserRole::Admin, "app-1", ReviewDecision::Rejected, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn edit_is_limited_to_the_owner() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_find_by_id()
            .returning(|_| Ok(Some(with_owner(returned_application("owner-a")))));
        applications.expect_update().never();

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service
            .edit("other-user", "app-1", ApplicationUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn edit_fails_unless_the_application_was_returned() {
        for status in [
            ReviewDecision::Approved,
            ReviewDecision::Rejected,
        ] {
            let mut decided = pending_application("owner-a");
            decided.apply_decision(status, None, chrono::Utc::now());

            let mut applications = MockApplicationRepositoryTrait::new();
            applications
                .expect_find_by_id()
                .returning(move |_| Ok(Some(with_owner(decided.clone()))));
            applications.expect_update().never();

            let service = service(applications, MockUserRepositoryTrait::new());
            let err = service
                .edit("owner-a", "app-1", ApplicationUpdate::default())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
        }

        // a pending application is just as un-editable
        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_find_by_id()
            .returning(|_| Ok(Some(with_owner(pending_application("owner-a")))));
        applications.expect_update().never();

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service
            .edit("owner-a", "app-1", ApplicationUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn edit_resubmits_and_clears_the_previous_decision() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_find_by_id()
            .returning(|_| Ok(Some(with_owner(returned_application("owner-a")))));
        applications
            .expect_update()
            .withf(|application| {
                application.status == ApplicationStatus::Pending
                    && application.reviewer_comment.is_none()
                    && application.decided_at.is_none()
                    && application.message == "now with the note attached"
            })
            .times(1)
            .returning(|application| Ok(application.clone()));

        let service = service(applications, MockUserRepositoryTrait::new());
        service
            .edit(
                "owner-a",
                "app-1",
                ApplicationUpdate {
                    message: Some("now with the note attached".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn edit_validates_a_replacement_message() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications
            .expect_find_by_id()
            .returning(|_| Ok(Some(with_owner(returned_application("owner-a")))));
        applications.expect_update().never();

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service
            .edit(
                "owner-a",
                "app-1",
                ApplicationUpdate {
                    message: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn stats_are_reviewer_only() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications.expect_count_by_status().never();

        let service = service(applications, MockUserRepositoryTrait::new());
        let err = service.stats(&UserRole::User).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn stats_aggregate_counts_and_user_totals() {
        let mut applications = MockApplicationRepositoryTrait::new();
        applications.expect_count_by_status().returning(|| {
            Ok(vec![
                StatusCount {
                    status: ApplicationStatus::Pending,
                    count: 4,
                },
                StatusCount {
                    status: ApplicationStatus::Returned,
                    count: 1,
                },
            ])
        });
        let mut users = MockUserRepositoryTrait::new();
        users
            .expect_count_by_role()
            .withf(|role| *role == UserRole::User)
            .returning(|_| Ok(9));

        let service = service(applications, users);
        let stats = service.stats(&UserRole::Principal).await.unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.total_users, 9);
        assert_eq!(stats.pending, 4);
        assert_eq!(stats.returned, 1);
        assert_eq!(stats.approved, 0);
        assert_eq!(stats.rejected, 0);
    }
}
