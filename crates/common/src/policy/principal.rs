//! The acting identity for every authorization decision

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// User identifier as issued by the identity platform
pub type UserId = Uuid;

/// Role derived once from the verified email domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

/// Who is asking.
///
/// Built once per verified session token and passed by value into every
/// policy call. There is no ambient "current user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Anonymous,
    User { id: UserId, role: Role },
}

impl Principal {
    pub fn student(id: UserId) -> Self {
        Principal::User { id, role: Role::Student }
    }

    pub fn staff(id: UserId) -> Self {
        Principal::User { id, role: Role::Staff }
    }

    /// Build a principal from raw claim strings.
    ///
    /// Anything that does not parse collapses to `Anonymous`.
    pub fn from_claims(subject: &str, role: &str) -> Self {
        let id = match Uuid::parse_str(subject) {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!(subject = %subject, "Unparseable subject, treating principal as anonymous");
                return Principal::Anonymous;
            }
        };

        match role.parse::<Role>() {
            Ok(role) => Principal::User { id, role },
            Err(e) => {
                tracing::warn!(user_id = %id, error = %e, "Unrecognized role, treating principal as anonymous");
                Principal::Anonymous
            }
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Principal::Anonymous => None,
            Principal::User { id, .. } => Some(*id),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Principal::Anonymous => None,
            Principal::User { role, .. } => Some(*role),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Principal::User { role: Role::Staff, .. })
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Principal::Anonymous)
    }

    /// Short label for logs and metric tags
    pub fn kind(&self) -> &'static str {
        match self {
            Principal::Anonymous => "anonymous",
            Principal::User { role, .. } => role.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_claims_valid() {
        let id = Uuid::new_v4();
        assert_eq!(Principal::from_claims(&id.to_string(), "staff"), Principal::staff(id));
        assert_eq!(Principal::from_claims(&id.to_string(), "student"), Principal::student(id));
    }

    #[test]
    fn test_from_claims_unknown_role_fails_closed() {
        let id = Uuid::new_v4();
        assert_eq!(Principal::from_claims(&id.to_string(), "admin"), Principal::Anonymous);
        assert_eq!(Principal::from_claims(&id.to_string(), ""), Principal::Anonymous);
        assert_eq!(Principal::from_claims(&id.to_string(), "Staff"), Principal::Anonymous);
    }

    #[test]
    fn test_from_claims_bad_subject_fails_closed() {
        assert_eq!(Principal::from_claims("not-a-uuid", "staff"), Principal::Anonymous);
    }

    #[test]
    fn test_accessors() {
        let id = Uuid::new_v4();
        let staff = Principal::staff(id);
        assert!(staff.is_staff());
        assert!(staff.is_authenticated());
        assert_eq!(staff.user_id(), Some(id));
        assert_eq!(staff.kind(), "staff");

        assert!(!Principal::student(id).is_staff());
        assert!(!Principal::Anonymous.is_authenticated());
        assert_eq!(Principal::Anonymous.user_id(), None);
        assert_eq!(Principal::Anonymous.role(), None);
    }
}
