//! Repository pattern for database operations
//!
//! Every status change is a conditional update on the expected prior
//! status, so a decision made on a stale snapshot cannot be applied.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::policy::{
    AssignmentSnapshot, AssignmentStatus, PaperSnapshot, PaperStatus, ReviewDenial, Role,
    VisibilityScope,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, OnConflict, Order, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// A paper row, its ordered authors and the snapshot policy reads
#[derive(Debug, Clone)]
pub struct PaperRecord {
    pub paper: Paper,
    pub authors: Vec<PaperAuthor>,
    pub snapshot: PaperSnapshot,
}

impl PaperRecord {
    fn assemble(paper: Paper, status: PaperStatus, mut authors: Vec<PaperAuthor>) -> Self {
        authors.sort_by_key(|a| (!a.is_corresponding, a.author_order));
        let snapshot = PaperSnapshot {
            id: paper.id,
            status,
            category_id: paper.category_id,
            author_ids: authors.iter().map(|a| a.author_id).collect(),
        };
        Self { paper, authors, snapshot }
    }
}

/// Listing filters applied on top of the visibility scope
#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring of title or abstract
    pub query: Option<String>,
    /// Only papers this user authored
    pub author_id: Option<Uuid>,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct NewPaper {
    pub title: String,
    pub abstract_text: String,
    pub category_id: Uuid,
    pub pdf_url: Option<String>,
    pub co_author_emails: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewSharedLink {
    pub paper_id: Uuid,
    pub created_by: Uuid,
    pub access_key: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub allow_comments: bool,
    pub allow_download: bool,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub paper_id: Uuid,
    pub user_id: Option<Uuid>,
    pub guest_name: Option<String>,
    pub shared_link_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub content: String,
    /// 1 to 5 when given
    pub rating: Option<i32>,
    pub recommendation: Recommendation,
}

/// Trending listing: published papers ranked by likes received since `since`
#[derive(Debug, Clone)]
pub struct TrendingFilter {
    pub since: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub limit: u64,
}

#[derive(Debug, FromQueryResult)]
struct LikeTally {
    paper_id: Uuid,
    like_count: i64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Profiles & Categories
    // ========================================================================

    /// Insert or refresh the caller's profile with the role derived at registration
    pub async fn upsert_profile(
        &self,
        id: Uuid,
        email: &str,
        full_name: &str,
        role: Role,
    ) -> Result<Profile> {
        let profile = ProfileActiveModel {
            id: Set(id),
            email: Set(normalize_email(email)),
            full_name: Set(full_name.trim().to_string()),
            user_type: Set(role.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        };

        ProfileEntity::insert(profile)
            .on_conflict(
                OnConflict::column(ProfileColumn::Id)
                    .update_columns([
                        ProfileColumn::Email,
                        ProfileColumn::FullName,
                        ProfileColumn::UserType,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_profiles_by_email(&self, emails: &[String]) -> Result<Vec<Profile>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let emails: Vec<String> = emails.iter().map(|e| normalize_email(e)).collect();

        ProfileEntity::find()
            .filter(ProfileColumn::Email.is_in(emails))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        ProfileEntity::find()
            .filter(ProfileColumn::Id.is_in(ids.to_vec()))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        CategoryEntity::find()
            .order_by_asc(CategoryColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        CategoryEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Load a paper with its authors; an unknown stored status is a data fault
    pub async fn find_paper(&self, id: Uuid) -> Result<Option<PaperRecord>> {
        let Some(paper) = PaperEntity::find_by_id(id).one(self.read_conn()).await? else {
            return Ok(None);
        };
        let status = paper.paper_status()?;

        let authors = PaperAuthorEntity::find()
            .filter(PaperAuthorColumn::PaperId.eq(id))
            .order_by_asc(PaperAuthorColumn::AuthorOrder)
            .all(self.read_conn())
            .await?;

        Ok(Some(PaperRecord::assemble(paper, status, authors)))
    }

    /// List candidate papers with the visibility scope pushed into the query.
    ///
    /// Rows with an unknown status are skipped and logged.
    pub async fn list_papers(
        &self,
        scope: VisibilityScope,
        filter: &PaperFilter,
    ) -> Result<Vec<PaperRecord>> {
        let rows = paper_query(scope, filter)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(self.read_conn())
            .await?;

        let parsed: Vec<(Paper, PaperStatus)> = rows
            .into_iter()
            .filter_map(|paper| match paper.paper_status() {
                Ok(status) => Some((paper, status)),
                Err(e) => {
                    warn!(paper_id = %paper.id, error = %e, "Skipping malformed paper row");
                    None
                }
            })
            .collect();

        self.with_authors(parsed).await
    }

    /// Attach authors to parsed paper rows with a single query, keeping row order
    async fn with_authors(&self, parsed: Vec<(Paper, PaperStatus)>) -> Result<Vec<PaperRecord>> {
        if parsed.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = parsed.iter().map(|(p, _)| p.id).collect();
        let mut authors_by_paper: HashMap<Uuid, Vec<PaperAuthor>> = HashMap::new();
        for author in PaperAuthorEntity::find()
            .filter(PaperAuthorColumn::PaperId.is_in(ids))
            .order_by_asc(PaperAuthorColumn::AuthorOrder)
            .all(self.read_conn())
            .await?
        {
            authors_by_paper.entry(author.paper_id).or_default().push(author);
        }

        Ok(parsed
            .into_iter()
            .map(|(paper, status)| {
                let authors = authors_by_paper.remove(&paper.id).unwrap_or_default();
                PaperRecord::assemble(paper, status, authors)
            })
            .collect())
    }

    /// Published papers with the most likes in the window, most liked first.
    ///
    /// Papers without likes in the window are not trending.
    pub async fn trending_papers(&self, filter: &TrendingFilter) -> Result<Vec<(PaperRecord, i64)>> {
        let mut query = PaperLikeEntity::find()
            .select_only()
            .column(PaperLikeColumn::PaperId)
            .column_as(PaperLikeColumn::UserId.count(), "like_count")
            .inner_join(PaperEntity)
            .filter(PaperLikeColumn::CreatedAt.gte(filter.since.fixed_offset()))
            .filter(PaperColumn::Status.eq(PaperStatus::Published.as_str()));
        if let Some(category_id) = filter.category_id {
            query = query.filter(PaperColumn::CategoryId.eq(category_id));
        }

        let tallies: Vec<LikeTally> = query
            .group_by(PaperLikeColumn::PaperId)
            .order_by(Expr::cust("like_count"), Order::Desc)
            .order_by_asc(PaperLikeColumn::PaperId)
            .limit(filter.limit)
            .into_model::<LikeTally>()
            .all(self.read_conn())
            .await?;

        if tallies.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = tallies.iter().map(|t| t.paper_id).collect();
        let mut papers: HashMap<Uuid, Paper> = PaperEntity::find()
            .filter(PaperColumn::Id.is_in(ids))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut parsed = Vec::with_capacity(tallies.len());
        let mut counts = Vec::with_capacity(tallies.len());
        for tally in &tallies {
            let Some(paper) = papers.remove(&tally.paper_id) else {
                continue;
            };
            match paper.paper_status() {
                Ok(status) => {
                    parsed.push((paper, status));
                    counts.push(tally.like_count);
                }
                Err(e) => warn!(paper_id = %paper.id, error = %e, "Skipping malformed paper row"),
            }
        }

        let records = self.with_authors(parsed).await?;
        Ok(records.into_iter().zip(counts).collect())
    }

    /// Create a draft with the creator as corresponding author.
    ///
    /// Co-authors are resolved by email; any unknown email rejects the whole request.
    pub async fn create_paper(&self, creator_id: Uuid, new: NewPaper) -> Result<PaperRecord> {
        if self.find_category(new.category_id).await?.is_none() {
            return Err(AppError::Validation {
                message: format!("Unknown category {}", new.category_id),
                field: Some("category_id".to_string()),
            });
        }

        let co_authors = self.resolve_co_authors(creator_id, &new.co_author_emails).await?;

        let txn = self.write_conn().begin().await?;
        let paper = insert_paper(
            &txn,
            new.title,
            new.abstract_text,
            new.category_id,
            new.pdf_url,
            None,
        )
        .await?;

        let author_ids: Vec<Uuid> = std::iter::once(creator_id).chain(co_authors).collect();
        let authors = insert_authors(&txn, paper.id, &author_ids).await?;
        txn.commit().await?;

        debug!(paper_id = %paper.id, authors = authors.len(), "Paper created");
        Ok(PaperRecord::assemble(paper, PaperStatus::Draft, authors))
    }

    async fn resolve_co_authors(&self, creator_id: Uuid, emails: &[String]) -> Result<Vec<Uuid>> {
        let mut wanted: Vec<String> = emails.iter().map(|e| normalize_email(e)).collect();
        wanted.sort();
        wanted.dedup();

        let found = self.find_profiles_by_email(&wanted).await?;
        if let Some(missing) = wanted.iter().find(|e| !found.iter().any(|p| &p.email == *e)) {
            return Err(AppError::Validation {
                message: format!("No registered user with email {}", missing),
                field: Some("co_author_emails".to_string()),
            });
        }

        let mut ids = Vec::with_capacity(found.len());
        for email in &wanted {
            if let Some(profile) = found.iter().find(|p| &p.email == email) {
                if profile.id != creator_id && !ids.contains(&profile.id) {
                    ids.push(profile.id);
                }
            }
        }
        Ok(ids)
    }

    /// Move a paper to `target` only if it is still in `expected`
    pub async fn update_status_if(
        &self,
        id: Uuid,
        expected: PaperStatus,
        target: PaperStatus,
    ) -> Result<()> {
        conditional_status_update(self.write_conn(), id, expected, target).await
    }

    /// Re-submission: a rejected paper stays rejected and a new draft
    /// carrying the same content and authors points back at it.
    pub async fn resubmit_rejected(&self, source: &PaperRecord) -> Result<PaperRecord> {
        let txn = self.write_conn().begin().await?;

        // Holds the source row and proves it is still rejected
        conditional_status_update(&txn, source.paper.id, PaperStatus::Rejected, PaperStatus::Rejected)
            .await?;

        let paper = insert_paper(
            &txn,
            source.paper.title.clone(),
            source.paper.abstract_text.clone(),
            source.paper.category_id,
            source.paper.pdf_url.clone(),
            Some(source.paper.id),
        )
        .await?;
        let authors = insert_authors(&txn, paper.id, &source.snapshot.author_ids).await?;
        txn.commit().await?;

        debug!(source_id = %source.paper.id, paper_id = %paper.id, "Rejected paper re-submitted as draft");
        Ok(PaperRecord::assemble(paper, PaperStatus::Draft, authors))
    }

    // ========================================================================
    // Review Assignments
    // ========================================================================

    pub async fn find_assignment(&self, id: Uuid) -> Result<Option<ReviewAssignment>> {
        ReviewAssignmentEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn assignments_for_paper(&self, paper_id: Uuid) -> Result<Vec<ReviewAssignment>> {
        ReviewAssignmentEntity::find()
            .filter(ReviewAssignmentColumn::PaperId.eq(paper_id))
            .order_by_asc(ReviewAssignmentColumn::AssignedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn assignments_for_reviewer(&self, reviewer_id: Uuid) -> Result<Vec<ReviewAssignment>> {
        ReviewAssignmentEntity::find()
            .filter(ReviewAssignmentColumn::ReviewerId.eq(reviewer_id))
            .order_by_desc(ReviewAssignmentColumn::AssignedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn assignment_snapshots_for_paper(&self, paper_id: Uuid) -> Result<Vec<AssignmentSnapshot>> {
        self.assignments_for_paper(paper_id)
            .await?
            .iter()
            .map(ReviewAssignment::snapshot)
            .collect()
    }

    pub async fn assignment_snapshots_for_reviewer(
        &self,
        reviewer_id: Uuid,
    ) -> Result<Vec<AssignmentSnapshot>> {
        self.assignments_for_reviewer(reviewer_id)
            .await?
            .iter()
            .map(ReviewAssignment::snapshot)
            .collect()
    }

    /// Attach reviewers in one transaction.
    ///
    /// With `starts_review` the paper also moves `submitted -> under_review`;
    /// a concurrent assignment that already started the review is accepted.
    pub async fn assign_reviewers(
        &self,
        paper_id: Uuid,
        reviewer_ids: &[Uuid],
        starts_review: bool,
    ) -> Result<Vec<ReviewAssignment>> {
        let txn = self.write_conn().begin().await?;

        let existing = ReviewAssignmentEntity::find()
            .filter(ReviewAssignmentColumn::PaperId.eq(paper_id))
            .filter(ReviewAssignmentColumn::ReviewerId.is_in(reviewer_ids.to_vec()))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            return Err(AppError::Duplicate {
                message: format!("Reviewer {} is already assigned to paper {}", existing.reviewer_id, paper_id),
            });
        }

        if starts_review {
            match conditional_status_update(&txn, paper_id, PaperStatus::Submitted, PaperStatus::UnderReview).await {
                Ok(()) => {}
                Err(AppError::StaleStatus { .. }) => {
                    let current = PaperEntity::find_by_id(paper_id)
                        .one(&txn)
                        .await?
                        .ok_or_else(|| AppError::PaperNotFound { id: paper_id.to_string() })?
                        .paper_status()?;
                    if current != PaperStatus::UnderReview {
                        return Err(AppError::StaleStatus {
                            id: paper_id.to_string(),
                            expected: PaperStatus::Submitted,
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(reviewer_ids.len());
        for reviewer_id in reviewer_ids {
            let assignment = ReviewAssignmentActiveModel {
                id: Set(Uuid::new_v4()),
                paper_id: Set(paper_id),
                reviewer_id: Set(*reviewer_id),
                status: Set(AssignmentStatus::Assigned.as_str().to_string()),
                assigned_at: Set(now.into()),
                completed_at: Set(None),
            };
            created.push(assignment.insert(&txn).await?);
        }
        txn.commit().await?;

        Ok(created)
    }

    /// Mark an assignment completed if it is still open and its paper is still under review
    pub async fn complete_assignment(&self, assignment: &AssignmentSnapshot) -> Result<ReviewAssignment> {
        let txn = self.write_conn().begin().await?;
        conditional_status_update(&txn, assignment.paper_id, PaperStatus::UnderReview, PaperStatus::UnderReview)
            .await?;
        close_assignment(&txn, assignment.id).await?;
        txn.commit().await?;

        ReviewAssignmentEntity::find_by_id(assignment.id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::AssignmentNotFound { id: assignment.id.to_string() })
    }

    /// Store the review and complete its assignment in one transaction
    pub async fn submit_review(&self, assignment: &AssignmentSnapshot, new: NewReview) -> Result<Review> {
        let txn = self.write_conn().begin().await?;
        conditional_status_update(&txn, assignment.paper_id, PaperStatus::UnderReview, PaperStatus::UnderReview)
            .await?;
        close_assignment(&txn, assignment.id).await?;

        let review = ReviewActiveModel {
            id: Set(Uuid::new_v4()),
            paper_id: Set(assignment.paper_id),
            reviewer_id: Set(assignment.reviewer_id),
            assignment_id: Set(assignment.id),
            content: Set(new.content),
            rating: Set(new.rating),
            recommendation: Set(new.recommendation.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        debug!(review_id = %review.id, paper_id = %review.paper_id, "Review submitted");
        Ok(review)
    }

    pub async fn list_reviews(&self, paper_id: Uuid) -> Result<Vec<Review>> {
        ReviewEntity::find()
            .filter(ReviewColumn::PaperId.eq(paper_id))
            .order_by_asc(ReviewColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Registered users other than `excluded`, by name
    pub async fn potential_reviewers(&self, excluded: &[Uuid]) -> Result<Vec<Profile>> {
        let mut query = ProfileEntity::find();
        if !excluded.is_empty() {
            query = query.filter(ProfileColumn::Id.is_not_in(excluded.to_vec()));
        }

        query
            .order_by_asc(ProfileColumn::FullName)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Withdraw an assignment that has not been completed
    pub async fn remove_assignment(&self, id: Uuid) -> Result<()> {
        let result = ReviewAssignmentEntity::delete_many()
            .filter(ReviewAssignmentColumn::Id.eq(id))
            .filter(ReviewAssignmentColumn::Status.eq(AssignmentStatus::Assigned.as_str()))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::ReviewNotAllowed(ReviewDenial::AlreadyCompleted));
        }
        Ok(())
    }

    // ========================================================================
    // Shared Links
    // ========================================================================

    pub async fn create_shared_link(&self, new: NewSharedLink) -> Result<SharedLink> {
        let link = SharedLinkActiveModel {
            id: Set(Uuid::new_v4()),
            paper_id: Set(new.paper_id),
            created_by: Set(new.created_by),
            access_key: Set(new.access_key),
            is_active: Set(true),
            expires_at: Set(new.expires_at.map(Into::into)),
            allow_comments: Set(new.allow_comments),
            allow_download: Set(new.allow_download),
            view_count: Set(0),
            last_viewed_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        link.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn list_shared_links(&self, paper_id: Uuid) -> Result<Vec<SharedLink>> {
        SharedLinkEntity::find()
            .filter(SharedLinkColumn::PaperId.eq(paper_id))
            .order_by_desc(SharedLinkColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_shared_link(&self, id: Uuid) -> Result<Option<SharedLink>> {
        SharedLinkEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Read from the primary so a deactivation takes effect on the next request
    pub async fn find_shared_link_by_key(&self, access_key: &str) -> Result<Option<SharedLink>> {
        SharedLinkEntity::find()
            .filter(SharedLinkColumn::AccessKey.eq(access_key))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn set_shared_link_active(&self, id: Uuid, is_active: bool) -> Result<SharedLink> {
        let mut link: SharedLinkActiveModel = SharedLinkEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or(AppError::SharedLinkNotFound)?
            .into();

        link.is_active = Set(is_active);
        link.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_shared_link(&self, id: Uuid) -> Result<bool> {
        let result = SharedLinkEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Count a granted view
    pub async fn record_link_view(&self, id: Uuid) -> Result<()> {
        let now = Utc::now();
        SharedLinkEntity::update_many()
            .col_expr(SharedLinkColumn::ViewCount, Expr::col(SharedLinkColumn::ViewCount).add(1))
            .col_expr(SharedLinkColumn::LastViewedAt, Expr::value(Some(now.fixed_offset())))
            .filter(SharedLinkColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;
        Ok(())
    }

    // ========================================================================
    // Feedback & Comments
    // ========================================================================

    pub async fn create_feedback(
        &self,
        paper_id: Uuid,
        user_id: Uuid,
        content: String,
        is_private: bool,
    ) -> Result<Feedback> {
        let now = Utc::now();
        let feedback = FeedbackActiveModel {
            id: Set(Uuid::new_v4()),
            paper_id: Set(paper_id),
            user_id: Set(user_id),
            content: Set(content),
            is_private: Set(is_private),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        feedback.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn list_feedback(&self, paper_id: Uuid) -> Result<Vec<Feedback>> {
        FeedbackEntity::find()
            .filter(FeedbackColumn::PaperId.eq(paper_id))
            .order_by_asc(FeedbackColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_comment(&self, new: NewComment) -> Result<Comment> {
        let now = Utc::now();
        let comment = CommentActiveModel {
            id: Set(Uuid::new_v4()),
            paper_id: Set(new.paper_id),
            user_id: Set(new.user_id),
            guest_name: Set(new.guest_name),
            shared_link_id: Set(new.shared_link_id),
            content: Set(new.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        comment.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn list_comments(&self, paper_id: Uuid) -> Result<Vec<Comment>> {
        CommentEntity::find()
            .filter(CommentColumn::PaperId.eq(paper_id))
            .order_by_asc(CommentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        CommentEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let result = CommentEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Likes
    // ========================================================================

    /// Returns false when the user had already liked the paper
    pub async fn like_paper(&self, paper_id: Uuid, user_id: Uuid) -> Result<bool> {
        let like = PaperLikeActiveModel {
            paper_id: Set(paper_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now().into()),
        };

        let inserted = PaperLikeEntity::insert(like)
            .on_conflict(
                OnConflict::columns([PaperLikeColumn::PaperId, PaperLikeColumn::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.write_conn())
            .await?;
        Ok(inserted > 0)
    }

    /// Returns false when there was no like to remove
    pub async fn unlike_paper(&self, paper_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = PaperLikeEntity::delete_many()
            .filter(PaperLikeColumn::PaperId.eq(paper_id))
            .filter(PaperLikeColumn::UserId.eq(user_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn like_count(&self, paper_id: Uuid) -> Result<u64> {
        PaperLikeEntity::find()
            .filter(PaperLikeColumn::PaperId.eq(paper_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn has_liked(&self, paper_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(PaperLikeEntity::find_by_id((paper_id, user_id))
            .one(self.read_conn())
            .await?
            .is_some())
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Store one unread notification per recipient
    pub async fn notify(
        &self,
        recipients: &[Uuid],
        kind: NotificationKind,
        related_id: Option<Uuid>,
        message: &str,
    ) -> Result<u64> {
        if recipients.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let rows = recipients.iter().map(|user_id| NotificationActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(*user_id),
            kind: Set(kind.as_str().to_string()),
            related_id: Set(related_id),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(now.into()),
        });

        NotificationEntity::insert_many(rows)
            .exec_without_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Newest first
    pub async fn list_notifications(&self, user_id: Uuid, unread_only: bool, limit: u64) -> Result<Vec<Notification>> {
        let mut query = NotificationEntity::find().filter(NotificationColumn::UserId.eq(user_id));
        if unread_only {
            query = query.filter(NotificationColumn::IsRead.eq(false));
        }

        query
            .order_by_desc(NotificationColumn::CreatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Only the recipient's own row is touched; false when there is none
    pub async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = NotificationEntity::update_many()
            .col_expr(NotificationColumn::IsRead, Expr::value(true))
            .filter(NotificationColumn::Id.eq(id))
            .filter(NotificationColumn::UserId.eq(user_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64> {
        let result = NotificationEntity::update_many()
            .col_expr(NotificationColumn::IsRead, Expr::value(true))
            .filter(NotificationColumn::UserId.eq(user_id))
            .filter(NotificationColumn::IsRead.eq(false))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `%q%` for a lowercase LIKE, with the wildcards in `q` escaped
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn authored_by(user_id: Uuid) -> sea_orm::sea_query::SimpleExpr {
    PaperColumn::Id.in_subquery(
        Query::select()
            .column(PaperAuthorColumn::PaperId)
            .from(PaperAuthorEntity)
            .and_where(PaperAuthorColumn::AuthorId.eq(user_id))
            .to_owned(),
    )
}

fn reviewed_by(user_id: Uuid) -> sea_orm::sea_query::SimpleExpr {
    PaperColumn::Id.in_subquery(
        Query::select()
            .column(ReviewAssignmentColumn::PaperId)
            .from(ReviewAssignmentEntity)
            .and_where(ReviewAssignmentColumn::ReviewerId.eq(user_id))
            .to_owned(),
    )
}

fn scope_condition(scope: VisibilityScope) -> Condition {
    let published = PaperColumn::Status.eq(PaperStatus::Published.as_str());
    match scope {
        VisibilityScope::All => Condition::all(),
        VisibilityScope::PublishedOnly => Condition::all().add(published),
        VisibilityScope::PublishedOrMember { user_id } => Condition::any()
            .add(published)
            .add(authored_by(user_id))
            .add(reviewed_by(user_id)),
    }
}

fn paper_query(scope: VisibilityScope, filter: &PaperFilter) -> Select<PaperEntity> {
    let mut query = PaperEntity::find().filter(scope_condition(scope));

    if let Some(category_id) = filter.category_id {
        query = query.filter(PaperColumn::CategoryId.eq(category_id));
    }

    if let Some(text) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(text);
        query = query.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(PaperColumn::Title))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(PaperColumn::AbstractText))).like(pattern)),
        );
    }

    if let Some(author_id) = filter.author_id {
        query = query.filter(authored_by(author_id));
    }

    query.order_by_desc(PaperColumn::CreatedAt)
}

async fn conditional_status_update<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    expected: PaperStatus,
    target: PaperStatus,
) -> Result<()> {
    let now = Utc::now();
    let result = PaperEntity::update_many()
        .col_expr(PaperColumn::Status, Expr::value(target.as_str()))
        .col_expr(PaperColumn::UpdatedAt, Expr::value(now.fixed_offset()))
        .filter(PaperColumn::Id.eq(id))
        .filter(PaperColumn::Status.eq(expected.as_str()))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::StaleStatus {
            id: id.to_string(),
            expected,
        });
    }
    Ok(())
}

async fn close_assignment<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<()> {
    let now = Utc::now();
    let result = ReviewAssignmentEntity::update_many()
        .col_expr(ReviewAssignmentColumn::Status, Expr::value(AssignmentStatus::Completed.as_str()))
        .col_expr(ReviewAssignmentColumn::CompletedAt, Expr::value(Some(now.fixed_offset())))
        .filter(ReviewAssignmentColumn::Id.eq(id))
        .filter(ReviewAssignmentColumn::Status.eq(AssignmentStatus::Assigned.as_str()))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::ReviewNotAllowed(ReviewDenial::AlreadyCompleted));
    }
    Ok(())
}

async fn insert_paper<C: ConnectionTrait>(
    conn: &C,
    title: String,
    abstract_text: String,
    category_id: Uuid,
    pdf_url: Option<String>,
    resubmitted_from: Option<Uuid>,
) -> Result<Paper> {
    let now = Utc::now();
    let paper = PaperActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        abstract_text: Set(abstract_text),
        category_id: Set(category_id),
        status: Set(PaperStatus::Draft.as_str().to_string()),
        pdf_url: Set(pdf_url),
        resubmitted_from: Set(resubmitted_from),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    paper.insert(conn).await.map_err(Into::into)
}

/// The first id becomes the corresponding author
async fn insert_authors<C: ConnectionTrait>(
    conn: &C,
    paper_id: Uuid,
    author_ids: &[Uuid],
) -> Result<Vec<PaperAuthor>> {
    let mut authors = Vec::with_capacity(author_ids.len());
    for (position, author_id) in author_ids.iter().enumerate() {
        let author = PaperAuthorActiveModel {
            paper_id: Set(paper_id),
            author_id: Set(*author_id),
            is_corresponding: Set(position == 0),
            author_order: Set(position as i32 + 1),
        };
        authors.push(author.insert(conn).await?);
    }
    Ok(authors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};
    use std::collections::BTreeMap;

    fn repo(db: MockDatabase) -> Repository {
        Repository::new(DbPool::from_connection(db.into_connection()))
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult { last_insert_id: 0, rows_affected }
    }

    fn paper_row(status: &str) -> Paper {
        let now = Utc::now().fixed_offset();
        Paper {
            id: Uuid::new_v4(),
            title: "Deliberate practice in seminars".to_string(),
            abstract_text: "We measure it.".to_string(),
            category_id: Uuid::new_v4(),
            status: status.to_string(),
            pdf_url: Some("papers/a.pdf".to_string()),
            resubmitted_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn author_row(paper_id: Uuid, author_id: Uuid, order: i32) -> PaperAuthor {
        PaperAuthor {
            paper_id,
            author_id,
            is_corresponding: order == 1,
            author_order: order,
        }
    }

    fn category_row() -> Category {
        Category {
            id: Uuid::new_v4(),
            name: "Cognition".to_string(),
            description: None,
        }
    }

    fn sql(scope: VisibilityScope, filter: &PaperFilter) -> String {
        paper_query(scope, filter).build(DatabaseBackend::Postgres).to_string()
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("  Memory "), "%memory%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_anonymous_scope_filters_published() {
        let query = sql(VisibilityScope::PublishedOnly, &PaperFilter::default());
        assert!(query.contains("'published'"));
        assert!(!query.contains("paper_authors"));
        assert!(query.contains("ORDER BY \"papers\".\"created_at\" DESC"));
    }

    #[test]
    fn test_staff_scope_has_no_status_predicate() {
        let query = sql(VisibilityScope::All, &PaperFilter::default());
        assert!(!query.contains("'published'"));
    }

    #[test]
    fn test_member_scope_includes_authorship_and_assignments() {
        let user_id = Uuid::new_v4();
        let query = sql(VisibilityScope::PublishedOrMember { user_id }, &PaperFilter::default());
        assert!(query.contains("'published'"));
        assert!(query.contains("paper_authors"));
        assert!(query.contains("review_assignments"));
        assert!(query.contains(&user_id.to_string()));
        assert!(query.contains(" OR "));
    }

    #[test]
    fn test_filters_are_applied() {
        let category_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();
        let filter = PaperFilter {
            category_id: Some(category_id),
            query: Some("Spaced".to_string()),
            author_id: Some(author_id),
            limit: 20,
            offset: 0,
        };
        let query = sql(VisibilityScope::All, &filter);
        assert!(query.contains(&category_id.to_string()));
        assert!(query.contains("LOWER(\"title\")") || query.contains("LOWER(\"papers\".\"title\")"));
        assert!(query.contains("'%spaced%'"));
        assert!(query.contains(&author_id.to_string()));
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let filter = PaperFilter {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!sql(VisibilityScope::All, &filter).contains("LIKE"));
    }

    #[test]
    fn test_update_status_if_applies() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(1)]));
        let result = tokio_test::block_on(repo.update_status_if(
            Uuid::new_v4(),
            PaperStatus::Draft,
            PaperStatus::Submitted,
        ));
        assert!(result.is_ok());
    }

    #[test]
    fn test_update_status_if_reports_stale_status() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(0)]));
        let id = Uuid::new_v4();
        let err = tokio_test::block_on(repo.update_status_if(id, PaperStatus::Submitted, PaperStatus::Published))
            .unwrap_err();
        match err {
            AppError::StaleStatus { id: stale, expected } => {
                assert_eq!(stale, id.to_string());
                assert_eq!(expected, PaperStatus::Submitted);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_find_paper_orders_corresponding_author_first() {
        let paper = paper_row("draft");
        let (lead, other) = (Uuid::new_v4(), Uuid::new_v4());
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![paper.clone()]])
                .append_query_results([vec![author_row(paper.id, other, 2), author_row(paper.id, lead, 1)]]),
        );

        let record = tokio_test::block_on(repo.find_paper(paper.id)).unwrap().unwrap();
        assert_eq!(record.snapshot.status, PaperStatus::Draft);
        assert_eq!(record.snapshot.author_ids, vec![lead, other]);
        assert_eq!(record.snapshot.corresponding_author(), Some(lead));
    }

    #[test]
    fn test_find_paper_rejects_unknown_status() {
        let paper = paper_row("withdrawn");
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![paper.clone()]]));

        let err = tokio_test::block_on(repo.find_paper(paper.id)).unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord { table: "papers", .. }));
        assert!(err.is_server_error());
    }

    #[test]
    fn test_find_missing_paper() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([Vec::<Paper>::new()]));
        assert!(tokio_test::block_on(repo.find_paper(Uuid::new_v4())).unwrap().is_none());
    }

    #[test]
    fn test_list_papers_skips_malformed_rows() {
        let good = paper_row("published");
        let bad = paper_row("bogus");
        let author = Uuid::new_v4();
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![good.clone(), bad]])
                .append_query_results([vec![author_row(good.id, author, 1)]]),
        );

        let records = tokio_test::block_on(repo.list_papers(VisibilityScope::PublishedOnly, &PaperFilter {
            limit: 20,
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].paper.id, good.id);
        assert_eq!(records[0].snapshot.author_ids, vec![author]);
    }

    #[test]
    fn test_list_papers_empty_skips_author_query() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([Vec::<Paper>::new()]));
        let records = tokio_test::block_on(repo.list_papers(VisibilityScope::All, &PaperFilter {
            limit: 20,
            ..Default::default()
        }))
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_create_paper_rejects_unknown_category() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([Vec::<Category>::new()]));
        let err = tokio_test::block_on(repo.create_paper(Uuid::new_v4(), NewPaper {
            title: "t".to_string(),
            abstract_text: "a".to_string(),
            category_id: Uuid::new_v4(),
            pdf_url: None,
            co_author_emails: vec![],
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "category_id"));
    }

    #[test]
    fn test_create_paper_rejects_unknown_co_author() {
        let category = category_row();
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![category.clone()]])
                .append_query_results([Vec::<Profile>::new()]),
        );
        let err = tokio_test::block_on(repo.create_paper(Uuid::new_v4(), NewPaper {
            title: "t".to_string(),
            abstract_text: "a".to_string(),
            category_id: category.id,
            pdf_url: None,
            co_author_emails: vec!["Ghost@uni.minerva.edu".to_string()],
        }))
        .unwrap_err();
        match err {
            AppError::Validation { message, .. } => assert!(message.contains("ghost@uni.minerva.edu")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn rejected_record(authors: &[Uuid]) -> PaperRecord {
        let source = paper_row("rejected");
        let rows = authors
            .iter()
            .enumerate()
            .map(|(i, a)| author_row(source.id, *a, i as i32 + 1))
            .collect();
        PaperRecord::assemble(source, PaperStatus::Rejected, rows)
    }

    #[test]
    fn test_resubmit_creates_linked_draft_with_same_authors() {
        let (lead, other) = (Uuid::new_v4(), Uuid::new_v4());
        let source = rejected_record(&[lead, other]);

        let mut draft = paper_row("draft");
        draft.resubmitted_from = Some(source.paper.id);
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1)])
                .append_query_results([vec![draft.clone()]])
                .append_query_results([vec![author_row(draft.id, lead, 1)]])
                .append_query_results([vec![author_row(draft.id, other, 2)]]),
        );

        let record = tokio_test::block_on(repo.resubmit_rejected(&source)).unwrap();
        assert_ne!(record.paper.id, source.paper.id);
        assert_eq!(record.paper.resubmitted_from, Some(source.paper.id));
        assert_eq!(record.snapshot.status, PaperStatus::Draft);
        assert_eq!(record.snapshot.author_ids, vec![lead, other]);
    }

    #[test]
    fn test_resubmit_refuses_when_source_moved() {
        let source = rejected_record(&[Uuid::new_v4()]);
        let repo = repo_with_exec(0);

        let err = tokio_test::block_on(repo.resubmit_rejected(&source)).unwrap_err();
        assert!(matches!(err, AppError::StaleStatus { expected: PaperStatus::Rejected, .. }));
    }

    fn open_assignment() -> AssignmentSnapshot {
        AssignmentSnapshot {
            id: Uuid::new_v4(),
            paper_id: Uuid::new_v4(),
            reviewer_id: Uuid::new_v4(),
            status: AssignmentStatus::Assigned,
        }
    }

    fn new_review() -> NewReview {
        NewReview {
            content: "The effect size needs a confidence interval.".to_string(),
            rating: Some(4),
            recommendation: Recommendation::MinorRevision,
        }
    }

    #[test]
    fn test_complete_assignment_twice_is_refused() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(1), exec(0)]));
        let err = tokio_test::block_on(repo.complete_assignment(&open_assignment())).unwrap_err();
        assert!(matches!(err, AppError::ReviewNotAllowed(ReviewDenial::AlreadyCompleted)));
    }

    #[test]
    fn test_complete_assignment_after_decision_is_stale() {
        let assignment = open_assignment();
        let repo = repo_with_exec(0);
        let err = tokio_test::block_on(repo.complete_assignment(&assignment)).unwrap_err();
        match err {
            AppError::StaleStatus { id, expected } => {
                assert_eq!(id, assignment.paper_id.to_string());
                assert_eq!(expected, PaperStatus::UnderReview);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_submit_review_stores_review_for_assignment() {
        let assignment = open_assignment();
        let stored = Review {
            id: Uuid::new_v4(),
            paper_id: assignment.paper_id,
            reviewer_id: assignment.reviewer_id,
            assignment_id: assignment.id,
            content: "The effect size needs a confidence interval.".to_string(),
            rating: Some(4),
            recommendation: "minor_revision".to_string(),
            created_at: Utc::now().fixed_offset(),
        };
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1)])
                .append_query_results([vec![stored.clone()]]),
        );

        let review = tokio_test::block_on(repo.submit_review(&assignment, new_review())).unwrap();
        assert_eq!(review.assignment_id, assignment.id);
        assert_eq!(review.recommendation, "minor_revision");
    }

    #[test]
    fn test_submit_review_on_completed_assignment_is_refused() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(1), exec(0)]));
        let err = tokio_test::block_on(repo.submit_review(&open_assignment(), new_review())).unwrap_err();
        assert!(matches!(err, AppError::ReviewNotAllowed(ReviewDenial::AlreadyCompleted)));
    }

    #[test]
    fn test_submit_review_after_decision_is_stale() {
        let err = tokio_test::block_on(repo_with_exec(0).submit_review(&open_assignment(), new_review())).unwrap_err();
        assert!(matches!(err, AppError::StaleStatus { expected: PaperStatus::UnderReview, .. }));
    }

    #[test]
    fn test_like_is_idempotent() {
        let (paper_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(tokio_test::block_on(repo_with_exec(1).like_paper(paper_id, user_id)).unwrap());
        assert!(!tokio_test::block_on(repo_with_exec(0).like_paper(paper_id, user_id)).unwrap());
        assert!(!tokio_test::block_on(repo_with_exec(0).unlike_paper(paper_id, user_id)).unwrap());
    }

    #[test]
    fn test_like_count() {
        let row = BTreeMap::from([("num_items".to_string(), sea_orm::Value::from(3i64))]);
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![row]]));
        assert_eq!(tokio_test::block_on(repo.like_count(Uuid::new_v4())).unwrap(), 3);
    }

    #[test]
    fn test_trending_keeps_like_order() {
        let (hot, warm) = (paper_row("published"), paper_row("published"));
        let tally = |id: Uuid, n: i64| {
            BTreeMap::from([
                ("paper_id".to_string(), sea_orm::Value::from(id)),
                ("like_count".to_string(), sea_orm::Value::from(n)),
            ])
        };
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![tally(hot.id, 9), tally(warm.id, 2)]])
                .append_query_results([vec![warm.clone(), hot.clone()]])
                .append_query_results([vec![author_row(hot.id, Uuid::new_v4(), 1)]]),
        );

        let trending = tokio_test::block_on(repo.trending_papers(&TrendingFilter {
            since: Utc::now() - chrono::Duration::days(7),
            category_id: None,
            limit: 10,
        }))
        .unwrap();
        let ranked: Vec<(Uuid, i64)> = trending.iter().map(|(r, n)| (r.paper.id, *n)).collect();
        assert_eq!(ranked, vec![(hot.id, 9), (warm.id, 2)]);
        assert_eq!(trending[0].0.authors.len(), 1);
        assert!(trending[1].0.authors.is_empty());
    }

    #[test]
    fn test_trending_without_likes_is_empty() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<BTreeMap<String, sea_orm::Value>>::new()]),
        );
        let trending = tokio_test::block_on(repo.trending_papers(&TrendingFilter {
            since: Utc::now(),
            category_id: Some(Uuid::new_v4()),
            limit: 10,
        }))
        .unwrap();
        assert!(trending.is_empty());
    }

    #[test]
    fn test_notify_nobody_skips_insert() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres));
        let stored = tokio_test::block_on(repo.notify(&[], NotificationKind::Like, None, "liked")).unwrap();
        assert_eq!(stored, 0);
    }

    #[test]
    fn test_notify_stores_one_row_per_recipient() {
        let repo = repo_with_exec(2);
        let stored = tokio_test::block_on(repo.notify(
            &[Uuid::new_v4(), Uuid::new_v4()],
            NotificationKind::PaperStatus,
            Some(Uuid::new_v4()),
            "Your paper is now under_review",
        ))
        .unwrap();
        assert_eq!(stored, 2);
    }

    #[test]
    fn test_mark_notification_read_is_scoped_to_recipient() {
        assert!(!tokio_test::block_on(repo_with_exec(0).mark_notification_read(Uuid::new_v4(), Uuid::new_v4())).unwrap());
        assert!(tokio_test::block_on(repo_with_exec(1).mark_notification_read(Uuid::new_v4(), Uuid::new_v4())).unwrap());
        assert_eq!(tokio_test::block_on(repo_with_exec(4).mark_all_notifications_read(Uuid::new_v4())).unwrap(), 4);
    }

    #[test]
    fn test_potential_reviewers_excludes_authors() {
        let author = Uuid::new_v4();
        let reviewer = Profile {
            id: Uuid::new_v4(),
            email: "lin@minerva.edu".to_string(),
            full_name: "Lin".to_string(),
            user_type: "staff".to_string(),
            created_at: Utc::now().fixed_offset(),
        };
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![reviewer.clone()]]));
        let found = tokio_test::block_on(repo.potential_reviewers(&[author])).unwrap();
        assert_eq!(found, vec![reviewer]);
    }

    #[test]
    fn test_remove_completed_assignment_is_refused() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(0)]));
        assert!(tokio_test::block_on(repo.remove_assignment(Uuid::new_v4())).is_err());

        let repo = repo_with_exec(1);
        assert!(tokio_test::block_on(repo.remove_assignment(Uuid::new_v4())).is_ok());
    }

    fn repo_with_exec(rows_affected: u64) -> Repository {
        repo(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(rows_affected)]))
    }

    #[test]
    fn test_record_link_view_and_delete() {
        assert!(tokio_test::block_on(repo_with_exec(1).record_link_view(Uuid::new_v4())).is_ok());
        assert!(!tokio_test::block_on(repo_with_exec(0).delete_shared_link(Uuid::new_v4())).unwrap());
        assert!(tokio_test::block_on(repo_with_exec(1).delete_comment(Uuid::new_v4())).unwrap());
    }

    #[test]
    fn test_assignment_snapshot_rejects_unknown_status() {
        let row = ReviewAssignment {
            id: Uuid::new_v4(),
            paper_id: Uuid::new_v4(),
            reviewer_id: Uuid::new_v4(),
            status: "declined".to_string(),
            assigned_at: Utc::now().fixed_offset(),
            completed_at: None,
        };
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![row]]));
        let err = tokio_test::block_on(repo.assignment_snapshots_for_reviewer(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord { table: "review_assignments", .. }));
    }
}
