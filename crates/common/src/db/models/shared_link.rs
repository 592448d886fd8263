//! Shared link entity

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::policy::SharedLinkSnapshot;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper_shared_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub paper_id: Uuid,

    pub created_by: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub access_key: String,

    pub is_active: bool,

    pub expires_at: Option<DateTimeWithTimeZone>,

    pub allow_comments: bool,

    pub allow_download: bool,

    pub view_count: i32,

    pub last_viewed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn snapshot(&self) -> SharedLinkSnapshot {
        SharedLinkSnapshot {
            id: self.id,
            paper_id: self.paper_id,
            is_active: self.is_active,
            expires_at: self.expires_at.map(|dt| dt.with_timezone(&Utc)),
            allow_comments: self.allow_comments,
            allow_download: self.allow_download,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id",
        on_delete = "Cascade"
    )]
    Paper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
