//! Shared link handlers
//!
//! Authors and staff manage links on `/papers/{id}/shared-links` and
//! `/shared-links/{id}`. Anyone holding an access key reaches the paper
//! on `/shared/{access_key}`, independently of the visibility rule.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::discussion::CommentResponse;
use super::load_visible_paper;
use crate::AppState;
use agora_common::{
    auth::{generate_access_key, AuthContext},
    config::SharingConfig,
    db::{models::SharedLink, NewComment, NewSharedLink, PaperRecord, Repository},
    errors::{AppError, Result},
    metrics::{self, Decision},
    policy::{
        can_manage_shared_links, evaluate_shared_link, Capabilities, Capability, LinkDenial,
        PaperStatus, Principal,
    },
};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// Days until the link stops working; the configured default when absent
    #[validate(range(min = 1))]
    pub expires_in_days: Option<u32>,

    /// Issue a link without an expiry
    #[serde(default)]
    pub never_expires: bool,

    #[serde(default)]
    pub allow_comments: bool,

    #[serde(default = "default_allow_download")]
    pub allow_download: bool,
}

fn default_allow_download() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateLinkRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GuestCommentRequest {
    /// Required when no bearer token is presented
    #[validate(length(min = 1, max = 100))]
    pub guest_name: Option<String>,

    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Serialize)]
pub struct SharedLinkResponse {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub access_key: String,
    pub is_active: bool,
    pub expires_at: Option<String>,
    pub allow_comments: bool,
    pub allow_download: bool,
    pub view_count: i32,
    pub last_viewed_at: Option<String>,
    pub created_at: String,
}

impl From<SharedLink> for SharedLinkResponse {
    fn from(link: SharedLink) -> Self {
        Self {
            id: link.id,
            paper_id: link.paper_id,
            access_key: link.access_key,
            is_active: link.is_active,
            expires_at: link.expires_at.map(|dt| dt.to_rfc3339()),
            allow_comments: link.allow_comments,
            allow_download: link.allow_download,
            view_count: link.view_count,
            last_viewed_at: link.last_viewed_at.map(|dt| dt.to_rfc3339()),
            created_at: link.created_at.to_rfc3339(),
        }
    }
}

/// What a link holder sees: content and capabilities, never the manuscript path
#[derive(Serialize)]
pub struct SharedPaperResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub category_id: Uuid,
    pub status: PaperStatus,
    pub capabilities: Capabilities,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub pdf_url: String,
}

/// Resolve the expiry a create request asks for, bounded by configuration
fn resolve_expiry(
    request: &CreateLinkRequest,
    sharing: &SharingConfig,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    if request.never_expires {
        if request.expires_in_days.is_some() {
            return Err(AppError::Validation {
                message: "expires_in_days and never_expires are mutually exclusive".to_string(),
                field: Some("expires_in_days".to_string()),
            });
        }
        return Ok(None);
    }

    let days = request.expires_in_days.unwrap_or(sharing.default_expiry_days);
    if days > sharing.max_expiry_days {
        return Err(AppError::Validation {
            message: format!("Links may last at most {} days", sharing.max_expiry_days),
            field: Some("expires_in_days".to_string()),
        });
    }
    Ok(Some(now + Duration::days(i64::from(days))))
}

/// Trim a guest name; a blank one counts as absent
fn normalize_guest_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn denial_label(denial: LinkDenial) -> &'static str {
    match denial {
        LinkDenial::Inactive => "inactive",
        LinkDenial::Expired => "expired",
    }
}

/// Check the caller may manage links on this paper
fn require_manager(principal: &Principal, record: &PaperRecord) -> Result<()> {
    let allowed = can_manage_shared_links(principal, &record.snapshot);
    metrics::record_authorization("manage_shared_links", Decision::from_allowed(allowed));
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden {
            message: "Only authors and staff manage shared links".to_string(),
        })
    }
}

/// Load a link by id together with its paper, for management calls
async fn load_managed_link(repo: &Repository, principal: &Principal, link_id: Uuid) -> Result<SharedLink> {
    let link = repo.find_shared_link(link_id).await?.ok_or(AppError::SharedLinkNotFound)?;
    let record = repo
        .find_paper(link.paper_id)
        .await?
        .ok_or(AppError::SharedLinkNotFound)?;
    require_manager(principal, &record)?;
    Ok(link)
}

/// Resolve an access key to a live link and the capabilities it grants.
///
/// Reads the current link state on every call, so deactivation applies at once.
async fn grant(repo: &Repository, access_key: &str) -> Result<(SharedLink, Capabilities)> {
    let Some(link) = repo.find_shared_link_by_key(access_key).await? else {
        metrics::record_shared_link_access("unknown");
        return Err(AppError::SharedLinkNotFound);
    };

    match evaluate_shared_link(&link.snapshot(), Utc::now()) {
        Ok(capabilities) => Ok((link, capabilities)),
        Err(denial) => {
            metrics::record_shared_link_access(denial_label(denial));
            tracing::info!(link_id = %link.id, reason = %denial, "Shared link refused");
            Err(denial.into())
        }
    }
}

async fn linked_paper(repo: &Repository, link: &SharedLink) -> Result<PaperRecord> {
    repo.find_paper(link.paper_id)
        .await?
        .ok_or(AppError::SharedLinkNotFound)
}

pub async fn list_links(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<Vec<SharedLinkResponse>>> {
    auth.require_user()?;

    let repo = state.repo();
    let (record, _) = load_visible_paper(&repo, &auth.principal, paper_id).await?;
    require_manager(&auth.principal, &record)?;

    let links = repo.list_shared_links(paper_id).await?;
    Ok(Json(links.into_iter().map(Into::into).collect()))
}

pub async fn create_link(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<SharedLinkResponse>)> {
    let user_id = auth.require_user()?;
    request.validate()?;

    let repo = state.repo();
    let (record, _) = load_visible_paper(&repo, &auth.principal, paper_id).await?;
    require_manager(&auth.principal, &record)?;

    let expires_at = resolve_expiry(&request, &state.config.sharing, Utc::now())?;
    let link = repo
        .create_shared_link(NewSharedLink {
            paper_id,
            created_by: user_id,
            access_key: generate_access_key(state.config.sharing.access_key_length),
            expires_at,
            allow_comments: request.allow_comments,
            allow_download: request.allow_download,
        })
        .await?;

    tracing::info!(
        paper_id = %paper_id,
        link_id = %link.id,
        expires_at = ?link.expires_at,
        "Shared link created"
    );
    Ok((StatusCode::CREATED, Json(link.into())))
}

/// Deactivate or reactivate a link
pub async fn update_link(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(link_id): Path<Uuid>,
    Json(request): Json<UpdateLinkRequest>,
) -> Result<Json<SharedLinkResponse>> {
    auth.require_user()?;

    let repo = state.repo();
    load_managed_link(&repo, &auth.principal, link_id).await?;
    let link = repo.set_shared_link_active(link_id, request.is_active).await?;

    tracing::info!(link_id = %link_id, is_active = link.is_active, "Shared link updated");
    Ok(Json(link.into()))
}

pub async fn delete_link(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(link_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_user()?;

    let repo = state.repo();
    load_managed_link(&repo, &auth.principal, link_id).await?;
    if !repo.delete_shared_link(link_id).await? {
        return Err(AppError::SharedLinkNotFound);
    }

    tracing::info!(link_id = %link_id, "Shared link deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// View a paper through a link, whatever its status
pub async fn view_shared(
    State(state): State<AppState>,
    Path(access_key): Path<String>,
) -> Result<Json<SharedPaperResponse>> {
    let repo = state.repo();
    let (link, capabilities) = grant(&repo, &access_key).await?;
    let record = linked_paper(&repo, &link).await?;

    metrics::record_shared_link_access("granted");
    if let Err(e) = repo.record_link_view(link.id).await {
        tracing::warn!(link_id = %link.id, error = %e, "Failed to record shared link view");
    }

    Ok(Json(SharedPaperResponse {
        id: record.paper.id,
        title: record.paper.title,
        abstract_text: record.paper.abstract_text,
        category_id: record.paper.category_id,
        status: record.snapshot.status,
        capabilities,
    }))
}

pub async fn download_shared(
    State(state): State<AppState>,
    Path(access_key): Path<String>,
) -> Result<Json<DownloadResponse>> {
    let repo = state.repo();
    let (link, capabilities) = grant(&repo, &access_key).await?;
    capabilities.require(Capability::Download)?;

    let record = linked_paper(&repo, &link).await?;
    let pdf_url = record.paper.pdf_url.ok_or_else(|| AppError::NotFound {
        resource_type: "manuscript".to_string(),
        id: record.paper.id.to_string(),
    })?;

    Ok(Json(DownloadResponse { pdf_url }))
}

/// Read the discussion through a link; requires the comments capability
pub async fn list_guest_comments(
    State(state): State<AppState>,
    Path(access_key): Path<String>,
) -> Result<Json<Vec<CommentResponse>>> {
    let repo = state.repo();
    let (link, capabilities) = grant(&repo, &access_key).await?;
    let allowed = capabilities.allows(Capability::Comments);
    metrics::record_authorization("guest_read_comments", Decision::from_allowed(allowed));
    capabilities.require(Capability::Comments)?;

    let comments = repo.list_comments(link.paper_id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

/// Comment through a link; requires the comments capability
pub async fn create_guest_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(access_key): Path<String>,
    Json(mut request): Json<GuestCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    request.guest_name = normalize_guest_name(request.guest_name);
    request.validate()?;

    let repo = state.repo();
    let (link, capabilities) = grant(&repo, &access_key).await?;
    let allowed = capabilities.allows(Capability::Comments);
    metrics::record_authorization("guest_comment", Decision::from_allowed(allowed));
    capabilities.require(Capability::Comments)?;

    let user_id = auth.principal.user_id();
    if user_id.is_none() && request.guest_name.is_none() {
        return Err(AppError::MissingField {
            field: "guest_name".to_string(),
        });
    }

    let comment = repo
        .create_comment(NewComment {
            paper_id: link.paper_id,
            user_id,
            guest_name: request.guest_name,
            shared_link_id: Some(link.id),
            content: request.content,
        })
        .await?;

    tracing::info!(link_id = %link.id, comment_id = %comment.id, "Comment posted through shared link");
    Ok((StatusCode::CREATED, Json(comment.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sharing() -> SharingConfig {
        SharingConfig {
            access_key_length: 16,
            default_expiry_days: 30,
            max_expiry_days: 365,
        }
    }

    #[test]
    fn test_default_expiry() {
        let now = Utc::now();
        let expiry = resolve_expiry(&CreateLinkRequest::default(), &sharing(), now).unwrap();
        assert_eq!(expiry, Some(now + Duration::days(30)));
    }

    #[test]
    fn test_requested_expiry_bounded() {
        let now = Utc::now();
        let request = CreateLinkRequest {
            expires_in_days: Some(7),
            ..Default::default()
        };
        assert_eq!(resolve_expiry(&request, &sharing(), now).unwrap(), Some(now + Duration::days(7)));

        let request = CreateLinkRequest {
            expires_in_days: Some(366),
            ..Default::default()
        };
        assert!(resolve_expiry(&request, &sharing(), now).is_err());
    }

    #[test]
    fn test_never_expires() {
        let request = CreateLinkRequest {
            never_expires: true,
            ..Default::default()
        };
        assert_eq!(resolve_expiry(&request, &sharing(), Utc::now()).unwrap(), None);

        let conflicting = CreateLinkRequest {
            never_expires: true,
            expires_in_days: Some(3),
            ..Default::default()
        };
        assert!(resolve_expiry(&conflicting, &sharing(), Utc::now()).is_err());
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateLinkRequest = serde_json::from_str("{}").unwrap();
        assert!(request.allow_download);
        assert!(!request.allow_comments);
        assert!(!request.never_expires);
        assert!(request.expires_in_days.is_none());
    }

    #[test]
    fn test_blank_guest_name_counts_as_absent() {
        assert_eq!(normalize_guest_name(Some("   ".to_string())), None);
        assert_eq!(normalize_guest_name(Some("\t\n".to_string())), None);
        assert_eq!(normalize_guest_name(None), None);
        assert_eq!(normalize_guest_name(Some("  Ada ".to_string())), Some("Ada".to_string()));
    }

    #[test]
    fn test_zero_day_expiry_rejected() {
        let request = CreateLinkRequest {
            expires_in_days: Some(0),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
