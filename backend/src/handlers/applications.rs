//! HTTP adapters for the application workflow: multipart parsing for
//! submissions and resubmissions, JSON for decisions and reads. All domain
//! rules live in the application service; these handlers only translate.

use axum::{
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::{
        application::{
            ApplicationListResponse, ApplicationResponse, ApplicationStats, ApplicationSubject,
            ApplicationUpdate, NewApplication, ReviewDecision,
        },
        user::User,
    },
    state::AppState,
    utils::uploads::{AttachmentStore, UploadedFile},
    validation::rules,
};

#[derive(Debug, Default)]
struct ApplicationForm {
    subject: Option<ApplicationSubject>,
    message: Option<String>,
    files: Vec<UploadedFile>,
}

async fn parse_application_form(mut multipart: Multipart) -> Result<ApplicationForm, AppError> {
    let mut form = ApplicationForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(|name| name.to_string());
        match name.as_deref() {
            Some("subject") => {
                let value = field.text().await?;
                let subject = value
                    .parse::<ApplicationSubject>()
                    .map_err(AppError::BadRequest)?;
                form.subject = Some(subject);
            }
            Some("message") => {
                form.message = Some(field.text().await?);
            }
            Some("files") => {
                let original_name = field
                    .file_name()
                    .unwrap_or("attachment")
                    .to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field.bytes().await?;
                form.files.push(UploadedFile {
                    original_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

pub async fn create_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApplicationResponse>), AppError> {
    let form = parse_application_form(multipart).await?;
    let subject = form
        .subject
        .ok_or_else(|| AppError::BadRequest("subject is required".to_string()))?;
    let message = form
        .message
        .ok_or_else(|| AppError::BadRequest("message is required".to_string()))?;
    // Reject a bad message before any file hits the disk, so a failed
    // submission never leaves stored attachments behind.
    rules::validate_message(&message)?;

    let store = AttachmentStore::new(&state.config.upload_dir);
    let attachments = store.store_all(form.files).await?;

    let created = state
        .applications
        .submit(
            &user.id,
            NewApplication {
                subject,
                message,
                attachments: attachments.clone(),
            },
        )
        .await;

    match created {
        Ok(created) => Ok((StatusCode::CREATED, Json(created.into()))),
        Err(err) => {
            store.remove_all(&attachments).await;
            Err(err)
        }
    }
}

pub async fn list_applications(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ApplicationListResponse>, AppError> {
    let items = state.applications.list(&user.role, &user.id).await?;
    Ok(Json(ApplicationListResponse {
        applications: items.into_iter().map(ApplicationResponse::from).collect(),
    }))
}

pub async fn get_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let found = state.applications.get(&user.role, &user.id, &id).await?;
    Ok(Json(found.into()))
}

#[derive(Debug, Deserialize)]
pub struct DecisionPayload {
    pub status: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

pub async fn update_application_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(payload): Json<DecisionPayload>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let updated = state
        .applications
        .decide(&user.role, &id, payload.status, payload.comment)
        .await?;
    Ok(Json(updated.into()))
}

pub async fn update_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ApplicationResponse>, AppError> {
    let form = parse_application_form(multipart).await?;

    let store = AttachmentStore::new(&state.config.upload_dir);
    let attachments = if form.files.is_empty() {
        None
    } else {
        Some(store.store_all(form.files).await?)
    };

    let update = ApplicationUpdate {
        subject: form.subject,
        message: form.message,
        attachments: attachments.clone(),
    };

    let updated = state.applications.edit(&user.id, &id, update).await;
    match updated {
        Ok(updated) => Ok(Json(updated.into())),
        Err(err) => {
            if let Some(attachments) = attachments {
                store.remove_all(&attachments).await;
            }
            Err(err)
        }
    }
}

pub async fn get_application_stats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ApplicationStats>, AppError> {
    let stats = state.applications.stats(&user.role).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_payload_accepts_a_missing_comment() {
        let payload: DecisionPayload =
            serde_json::from_str(r#"{"status":"approved"}"#).expect("parse");
        assert_eq!(payload.status, ReviewDecision::Approved);
        assert!(payload.comment.is_none());
    }

    #[test]
    fn decision_payload_rejects_pending_as_a_target_status() {
        let result = serde_json::from_str::<DecisionPayload>(r#"{"status":"pending"}"#);
        assert!(result.is_err());
    }
}
