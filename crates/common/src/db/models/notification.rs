//! Stored per-user notifications

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaperStatus,
    ReviewAssigned,
    ReviewSubmitted,
    Like,
    Comment,
    Feedback,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PaperStatus => "paper_status",
            NotificationKind::ReviewAssigned => "review_assigned",
            NotificationKind::ReviewSubmitted => "review_submitted",
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Feedback => "feedback",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub kind: String,

    /// The paper the notification points at
    pub related_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
