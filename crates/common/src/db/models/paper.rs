//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::policy::PaperStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_name = "abstract", column_type = "Text")]
    pub abstract_text: String,

    pub category_id: Uuid,

    /// One of the workflow states; parsed through [`PaperStatus`]
    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Opaque object-store path of the manuscript
    #[sea_orm(column_type = "Text", nullable)]
    pub pdf_url: Option<String>,

    /// Set on a draft created by re-submitting a rejected paper
    pub resubmitted_from: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Parse the stored status, reporting unknown values as a data fault
    pub fn paper_status(&self) -> crate::errors::Result<PaperStatus> {
        self.status.parse().map_err(|e: crate::policy::UnknownStatus| AppError::MalformedRecord {
            table: "papers",
            id: self.id.to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,

    #[sea_orm(has_many = "super::paper_author::Entity")]
    Authors,

    #[sea_orm(has_many = "super::review_assignment::Entity")]
    ReviewAssignments,

    #[sea_orm(has_many = "super::shared_link::Entity")]
    SharedLinks,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::paper_author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Authors.def()
    }
}

impl Related<super::review_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReviewAssignments.def()
    }
}

impl Related<super::shared_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SharedLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
