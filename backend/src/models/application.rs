use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: String,
    pub owner_id: String,
    pub subject: ApplicationSubject,
    pub message: String,
    /// Stored attachment references; replaced wholesale on edit.
    pub attachments: Vec<String>,
    pub status: ApplicationStatus,
    pub reviewer_comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationSubject {
    SickLeave,
    VacationRequest,
    PersonalLeave,
    MedicalLeave,
    EmergencyLeave,
    StudyLeave,
    MaternityPaternityLeave,
    BereavementLeave,
    Other,
}

impl ApplicationSubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationSubject::SickLeave => "sick_leave",
            ApplicationSubject::VacationRequest => "vacation_request",
            ApplicationSubject::PersonalLeave => "personal_leave",
            ApplicationSubject::MedicalLeave => "medical_leave",
            ApplicationSubject::EmergencyLeave => "emergency_leave",
            ApplicationSubject::StudyLeave => "study_leave",
            ApplicationSubject::MaternityPaternityLeave => "maternity_paternity_leave",
            ApplicationSubject::BereavementLeave => "bereavement_leave",
            ApplicationSubject::Other => "other",
        }
    }
}

impl FromStr for ApplicationSubject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sick_leave" => Ok(ApplicationSubject::SickLeave),
            "vacation_request" => Ok(ApplicationSubject::VacationRequest),
            "personal_leave" => Ok(ApplicationSubject::PersonalLeave),
            "medical_leave" => Ok(ApplicationSubject::MedicalLeave),
            "emergency_leave" => Ok(ApplicationSubject::EmergencyLeave),
            "study_leave" => Ok(ApplicationSubject::StudyLeave),
            "maternity_paternity_leave" => Ok(ApplicationSubject::MaternityPaternityLeave),
            "bereavement_leave" => Ok(ApplicationSubject::BereavementLeave),
            "other" => Ok(ApplicationSubject::Other),
            other => Err(format!("unknown application subject: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Returned => "returned",
        }
    }
}

/// The statuses a reviewer may move an application into. `pending` is not
/// representable here: it is entered only through submission or
/// resubmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
    Returned,
}

impl ReviewDecision {
    pub fn into_status(self) -> ApplicationStatus {
        match self {
            ReviewDecision::Approved => ApplicationStatus::Approved,
            ReviewDecision::Rejected => ApplicationStatus::Rejected,
            ReviewDecision::Returned => ApplicationStatus::Returned,
        }
    }
}

/// Fields accepted when submitting a new application.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub subject: ApplicationSubject,
    pub message: String,
    pub attachments: Vec<String>,
}

/// Partial update applied when the owner resubmits a returned application.
/// `None` means "leave unchanged"; an explicitly supplied value replaces the
/// previous one. Attachments are replaced wholesale, never merged.
#[derive(Debug, Clone, Default)]
pub struct ApplicationUpdate {
    pub subject: Option<ApplicationSubject>,
    pub message: Option<String>,
    pub attachments: Option<Vec<String>>,
}

/// An application row joined with its owner's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationWithOwner {
    #[sqlx(flatten)]
    pub application: Application,
    pub owner_name: String,
    pub owner_email: String,
}

/// Per-status row count as returned by the repository aggregation.
#[derive(Debug, Clone, FromRow)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub id: String,
    pub owner: OwnerSummary,
    pub subject: ApplicationSubject,
    pub message: String,
    pub attachments: Vec<String>,
    pub status: ApplicationStatus,
    pub reviewer_comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApplicationWithOwner> for ApplicationResponse {
    fn from(row: ApplicationWithOwner) -> Self {
        let application = row.application;
        ApplicationResponse {
            id: application.id,
            owner: OwnerSummary {
                id: application.owner_id,
                name: row.owner_name,
                email: row.owner_email,
            },
            subject: application.subject,
            message: application.message,
            attachments: application.attachments,
            status: application.status,
            reviewer_comment: application.reviewer_comment,
            submitted_at: application.submitted_at,
            decided_at: application.decided_at,
            created_at: application.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationResponse>,
}

/// Aggregate counts shown on the review dashboard. Statuses with no rows
/// report zero, so the per-status fields always sum to `total`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationStats {
    pub total: i64,
    pub total_users: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub returned: i64,
}

impl ApplicationStats {
    pub fn from_counts(counts: &[StatusCount], total_users: i64) -> Self {
        let mut stats = ApplicationStats {
            total: 0,
            total_users,
            pending: 0,
            approved: 0,
            rejected: 0,
            returned: 0,
        };
        for entry in counts {
            stats.total += entry.count;
            match entry.status {
                ApplicationStatus::Pending => stats.pending = entry.count,
                ApplicationStatus::Approved => stats.approved = entry.count,
                ApplicationStatus::Rejected => stats.rejected = entry.count,
                ApplicationStatus::Returned => stats.returned = entry.count,
            }
        }
        stats
    }
}

impl Application {
    pub fn new(
        owner_id: String,
        subject: ApplicationSubject,
        message: String,
        attachments: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            subject,
            message,
            attachments,
            status: ApplicationStatus::Pending,
            reviewer_comment: None,
            submitted_at: now,
            decided_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records a reviewer decision. The prior status is deliberately not
    /// checked: a reviewer may revise an earlier decision.
    pub fn apply_decision(
        &mut self,
        decision: ReviewDecision,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.status = decision.into_status();
        self.reviewer_comment = comment;
        self.decided_at = Some(at);
        self.updated_at = at;
    }

    /// Applies the owner's edits and puts the application back into the
    /// review queue: status returns to pending, the reviewer's comment and
    /// decision timestamp are cleared.
    pub fn resubmit(&mut self, update: ApplicationUpdate, at: DateTime<Utc>) {
        if let Some(subject) = update.subject {
            self.subject = subject;
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(attachments) = update.attachments {
            if !attachments.is_empty() {
                self.attachments = attachments;
            }
        }
        self.status = ApplicationStatus::Pending;
        self.reviewer_comment = None;
        self.decided_at = None;
        self.updated_at = at;
    }

    pub fn is_returned(&self) -> bool {
        self.status == ApplicationStatus::Returned
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}
