//! Review assignment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::policy::{AssignmentSnapshot, AssignmentStatus, UnknownStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub paper_id: Uuid,

    pub reviewer_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub assigned_at: DateTimeWithTimeZone,

    pub completed_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    pub fn snapshot(&self) -> crate::errors::Result<AssignmentSnapshot> {
        let status: AssignmentStatus = self.status.parse().map_err(|e: UnknownStatus| AppError::MalformedRecord {
            table: "review_assignments",
            id: self.id.to_string(),
            message: e.to_string(),
        })?;

        Ok(AssignmentSnapshot {
            id: self.id,
            paper_id: self.paper_id,
            reviewer_id: self.reviewer_id,
            status,
        })
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
