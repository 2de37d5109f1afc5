/// Moderation reports
///
/// A report points at its target through a [`ReportTargetKind`] plus the
/// target's ID. The reported user is resolved when the report is filed and
/// stored alongside so moderators can act on the person as well as the
/// content.
///
/// # States
///
/// `reviewed = false` is pending. Once reviewed, `is_valid` records the
/// verdict and the report never changes again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Kind of entity a report targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_target_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportTargetKind {
    User,
    Garden,
    Post,
    Comment,
}

impl ReportTargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportTargetKind::User => "user",
            ReportTargetKind::Garden => "garden",
            ReportTargetKind::Post => "post",
            ReportTargetKind::Comment => "comment",
        }
    }
}

/// Reason given by the reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_reason", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Spam,
    Harassment,
    Inappropriate,
    Misinformation,
    Other,
}

impl Default for ReportReason {
    fn default() -> Self {
        ReportReason::Other
    }
}

/// Moderation report
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,

    /// Owner of the reported entity, resolved at filing time
    pub reported_user_id: Option<Uuid>,

    pub target_kind: ReportTargetKind,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,

    pub reviewed: bool,

    /// Verdict; None while pending
    pub is_valid: Option<bool>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Input for filing a report
#[derive(Debug, Clone)]
pub struct CreateReport {
    pub reporter_id: Uuid,
    pub reported_user_id: Option<Uuid>,
    pub target_kind: ReportTargetKind,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
}

const REPORT_COLUMNS: &str = "id, reporter_id, reported_user_id, target_kind, target_id, reason, \
     description, reviewed, is_valid, reviewed_by, reviewed_at, created_at";

impl Report {
    /// Files a report
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the reporter already reported the target.
    pub async fn create(pool: &PgPool, data: CreateReport) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Report>(&format!(
            "INSERT INTO reports
                (reporter_id, reported_user_id, target_kind, target_id, reason, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(data.reporter_id)
        .bind(data.reported_user_id)
        .bind(data.target_kind)
        .bind(data.target_id)
        .bind(data.reason)
        .bind(&data.description)
        .fetch_one(pool)
        .await
    }

    /// Finds a report by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Report>(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists reports, optionally only pending ones, oldest first
    pub async fn list(pool: &PgPool, pending_only: bool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports
             WHERE NOT ($1 AND reviewed)
             ORDER BY created_at"
        ))
        .bind(pending_only)
        .fetch_all(pool)
        .await
    }

    /// Records a verdict on a pending report
    ///
    /// Returns None if the report does not exist or was already reviewed.
    pub async fn mark_reviewed(
        pool: &PgPool,
        id: Uuid,
        is_valid: bool,
        reviewer_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Report>(&format!(
            "UPDATE reports
             SET reviewed = TRUE, is_valid = $2, reviewed_by = $3, reviewed_at = NOW()
             WHERE id = $1 AND NOT reviewed
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(is_valid)
        .bind(reviewer_id)
        .fetch_optional(pool)
        .await
    }
}
