//! Shared links: revocable, time-boxed capability tokens for one paper
//!
//! Possession of the access key is the credential. A link bypasses role
//! based visibility for its one paper but never grants more than the
//! capabilities stored on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::principal::Principal;
use super::snapshot::PaperSnapshot;

/// The fields of a shared link that the grant check reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLinkSnapshot {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub allow_comments: bool,
    pub allow_download: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub comments: bool,
    pub download: bool,
}

/// A single capability a link may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Comments,
    Download,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Comments => f.write_str("comments"),
            Capability::Download => f.write_str("download"),
        }
    }
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Comments => self.comments,
            Capability::Download => self.download,
        }
    }

    pub fn require(&self, capability: Capability) -> Result<(), Capability> {
        if self.allows(capability) {
            Ok(())
        } else {
            Err(capability)
        }
    }
}

/// Why a link refused access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDenial {
    Inactive,
    Expired,
}

impl fmt::Display for LinkDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkDenial::Inactive => f.write_str("shared link has been deactivated"),
            LinkDenial::Expired => f.write_str("shared link has expired"),
        }
    }
}

/// Outcome of a grant check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SharedLinkGrant {
    pub granted: bool,
    pub capabilities: Capabilities,
}

/// Check a link at `now`, saying why when refusing.
///
/// Expiry is exclusive: at `now == expires_at` the link is already dead.
pub fn evaluate_shared_link(link: &SharedLinkSnapshot, now: DateTime<Utc>) -> Result<Capabilities, LinkDenial> {
    if !link.is_active {
        return Err(LinkDenial::Inactive);
    }
    if let Some(expires_at) = link.expires_at {
        if now >= expires_at {
            return Err(LinkDenial::Expired);
        }
    }

    Ok(Capabilities {
        comments: link.allow_comments,
        download: link.allow_download,
    })
}

/// Grant check in the caller-facing shape.
///
/// A refused grant carries no capabilities at all.
pub fn can_access_via_shared_link(link: &SharedLinkSnapshot, now: DateTime<Utc>) -> SharedLinkGrant {
    match evaluate_shared_link(link, now) {
        Ok(capabilities) => SharedLinkGrant {
            granted: true,
            capabilities,
        },
        Err(_) => SharedLinkGrant {
            granted: false,
            capabilities: Capabilities::none(),
        },
    }
}

/// Authors of the paper and staff may create, toggle, and delete its links
pub fn can_manage_shared_links(principal: &Principal, paper: &PaperSnapshot) -> bool {
    principal.is_staff() || paper.is_authored_by(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::status::PaperStatus;
    use crate::policy::testing::{paper, shared_link};
    use crate::policy::visibility::is_visible;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_active_unexpired_link_grants_stored_flags() {
        for comments in [false, true] {
            for download in [false, true] {
                let mut link = shared_link(Uuid::new_v4());
                link.allow_comments = comments;
                link.allow_download = download;
                link.expires_at = Some(now() + Duration::days(1));

                let grant = can_access_via_shared_link(&link, now());
                assert!(grant.granted);
                assert_eq!(grant.capabilities, Capabilities { comments, download });
            }
        }
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let mut link = shared_link(Uuid::new_v4());
        link.expires_at = None;
        let far_future = now() + Duration::days(365 * 50);
        assert!(can_access_via_shared_link(&link, far_future).granted);
    }

    #[test]
    fn test_expired_link_denied_even_if_active() {
        let mut link = shared_link(Uuid::new_v4());
        link.is_active = true;
        link.allow_comments = true;
        link.allow_download = true;

        for past in [Duration::zero(), Duration::seconds(1), Duration::days(30)] {
            link.expires_at = Some(now() - past);
            let grant = can_access_via_shared_link(&link, now());
            assert!(!grant.granted);
            assert_eq!(grant.capabilities, Capabilities::none());
            assert_eq!(evaluate_shared_link(&link, now()), Err(LinkDenial::Expired));
        }
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let mut link = shared_link(Uuid::new_v4());
        link.expires_at = Some(now());
        assert!(!can_access_via_shared_link(&link, now()).granted);
        assert!(can_access_via_shared_link(&link, now() - Duration::milliseconds(1)).granted);
    }

    #[test]
    fn test_inactive_link_denied_even_if_unexpired() {
        let mut link = shared_link(Uuid::new_v4());
        link.is_active = false;
        link.allow_download = true;

        for expiry in [None, Some(now() + Duration::days(7))] {
            link.expires_at = expiry;
            let grant = can_access_via_shared_link(&link, now());
            assert!(!grant.granted);
            assert!(!grant.capabilities.download);
            assert_eq!(evaluate_shared_link(&link, now()), Err(LinkDenial::Inactive));
        }
    }

    #[test]
    fn test_inactive_reported_before_expired() {
        let mut link = shared_link(Uuid::new_v4());
        link.is_active = false;
        link.expires_at = Some(now() - Duration::days(1));
        assert_eq!(evaluate_shared_link(&link, now()), Err(LinkDenial::Inactive));
    }

    #[test]
    fn test_link_bypasses_visibility_for_unpublished_paper() {
        let p = paper(PaperStatus::UnderReview, &[Uuid::new_v4()]);
        assert!(!is_visible(&Principal::Anonymous, &p, &[]));

        let mut link = shared_link(p.id);
        link.allow_comments = true;
        link.allow_download = false;
        link.expires_at = Some(now() + Duration::hours(1));

        let grant = can_access_via_shared_link(&link, now());
        assert!(grant.granted);
        assert_eq!(grant.capabilities, Capabilities { comments: true, download: false });
    }

    #[test]
    fn test_link_grant_independent_of_paper_status() {
        for status in PaperStatus::ALL {
            let p = paper(status, &[Uuid::new_v4()]);
            let link = shared_link(p.id);
            assert!(can_access_via_shared_link(&link, now()).granted, "{} paper", status);
        }
    }

    #[test]
    fn test_capability_require() {
        let caps = Capabilities { comments: true, download: false };
        assert_eq!(caps.require(Capability::Comments), Ok(()));
        assert_eq!(caps.require(Capability::Download), Err(Capability::Download));
        assert!(!Capabilities::none().allows(Capability::Comments));
    }

    #[test]
    fn test_manage_links() {
        let author = Uuid::new_v4();
        let p = paper(PaperStatus::Draft, &[author]);
        assert!(can_manage_shared_links(&Principal::student(author), &p));
        assert!(can_manage_shared_links(&Principal::staff(Uuid::new_v4()), &p));
        assert!(!can_manage_shared_links(&Principal::student(Uuid::new_v4()), &p));
        assert!(!can_manage_shared_links(&Principal::Anonymous, &p));
    }
}
