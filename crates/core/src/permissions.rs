//! Record-level permission policies.
//!
//! A [`PermissionPolicy`] is evaluated against an [`Actor`] and the record's
//! metadata. Item operations turn a denial into an error; list/search
//! operations turn the same policy into a [`SearchFilter`] instead, so the
//! caller sees a partial result set rather than a failure.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{DbId, JsonMap};

/// Who is making the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    /// `None` for anonymous requests.
    pub user_id: Option<DbId>,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: DbId, roles: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id),
            roles,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionPolicy {
    AllowAll,
    OwnerOnly,
    OwnerOrRole(String),
    AuthenticatedOnly,
}

/// Restriction a list/search query must apply for a given actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    All,
    Owner(DbId),
    Nothing,
}

impl PermissionPolicy {
    /// Decide whether `actor` may perform `operation` on a record.
    ///
    /// `record` is the record's metadata; for `create` it is the submitted
    /// payload.
    pub fn evaluate(&self, actor: &Actor, record: &JsonMap, _operation: Operation) -> Decision {
        let allowed = match self {
            PermissionPolicy::AllowAll => true,
            PermissionPolicy::OwnerOnly => is_owner(actor, record),
            PermissionPolicy::OwnerOrRole(role) => is_owner(actor, record) || actor.has_role(role),
            PermissionPolicy::AuthenticatedOnly => actor.is_authenticated(),
        };
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    /// Evaluate and convert a denial into an error: `Unauthorized` for
    /// anonymous actors, `Forbidden` otherwise.
    pub fn require(
        &self,
        actor: &Actor,
        record: &JsonMap,
        operation: Operation,
    ) -> Result<(), CoreError> {
        match self.evaluate(actor, record, operation) {
            Decision::Allow => Ok(()),
            Decision::Deny if !actor.is_authenticated() => Err(CoreError::Unauthorized(format!(
                "Authentication required to {operation} this record"
            ))),
            Decision::Deny => Err(CoreError::Forbidden(format!(
                "Not allowed to {operation} this record"
            ))),
        }
    }

    /// The query restriction equivalent to this policy.
    pub fn search_filter(&self, actor: &Actor) -> SearchFilter {
        match (self, actor.user_id) {
            (PermissionPolicy::AllowAll, _) => SearchFilter::All,
            (PermissionPolicy::AuthenticatedOnly, Some(_)) => SearchFilter::All,
            (PermissionPolicy::OwnerOrRole(role), Some(_)) if actor.has_role(role) => {
                SearchFilter::All
            }
            (PermissionPolicy::OwnerOnly | PermissionPolicy::OwnerOrRole(_), Some(id)) => {
                SearchFilter::Owner(id)
            }
            (_, None) => SearchFilter::Nothing,
        }
    }
}

impl FromStr for PermissionPolicy {
    type Err = CoreError;

    /// Parse `allow_all`, `owner_only`, `authenticated_only` or
    /// `owner_or_role:<role>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "allow_all" => Ok(PermissionPolicy::AllowAll),
            "owner_only" => Ok(PermissionPolicy::OwnerOnly),
            "authenticated_only" => Ok(PermissionPolicy::AuthenticatedOnly),
            _ => match s.strip_prefix("owner_or_role:") {
                Some(role) if !role.trim().is_empty() => {
                    Ok(PermissionPolicy::OwnerOrRole(role.trim().to_string()))
                }
                _ => Err(CoreError::Validation(format!(
                    "Unknown permission policy '{s}'"
                ))),
            },
        }
    }
}

fn is_owner(actor: &Actor, record: &JsonMap) -> bool {
    match (actor.user_id, record.get("owner")) {
        (Some(id), Some(Value::Number(owner))) => owner.as_i64() == Some(id),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn owned_by(owner: i64) -> JsonMap {
        json!({"title": "Paper", "owner": owner})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn owner_only_allows_owner_and_denies_others() {
        let policy = PermissionPolicy::OwnerOnly;
        let record = owned_by(42);
        assert_eq!(
            policy.evaluate(&Actor::user(42, vec![]), &record, Operation::Read),
            Decision::Allow
        );
        assert_eq!(
            policy.evaluate(&Actor::user(7, vec![]), &record, Operation::Read),
            Decision::Deny
        );
        assert_eq!(
            policy.evaluate(&Actor::anonymous(), &record, Operation::Read),
            Decision::Deny
        );
    }

    #[test]
    fn record_without_owner_is_never_owned() {
        let record = json!({"title": "x"}).as_object().cloned().unwrap();
        assert_eq!(
            PermissionPolicy::OwnerOnly.evaluate(&Actor::user(1, vec![]), &record, Operation::Update),
            Decision::Deny
        );
    }

    #[test]
    fn owner_or_role_accepts_role_holders() {
        let policy = PermissionPolicy::OwnerOrRole("managers".into());
        let manager = Actor::user(9, vec!["managers".into()]);
        assert_eq!(
            policy.evaluate(&manager, &owned_by(42), Operation::Delete),
            Decision::Allow
        );
        assert_eq!(policy.search_filter(&manager), SearchFilter::All);
        assert_eq!(
            policy.search_filter(&Actor::user(3, vec![])),
            SearchFilter::Owner(3)
        );
    }

    #[test]
    fn authenticated_only_and_allow_all() {
        let record = owned_by(1);
        assert_eq!(
            PermissionPolicy::AuthenticatedOnly.evaluate(&Actor::anonymous(), &record, Operation::Create),
            Decision::Deny
        );
        assert_eq!(
            PermissionPolicy::AllowAll.evaluate(&Actor::anonymous(), &record, Operation::Create),
            Decision::Allow
        );
    }

    #[test]
    fn require_distinguishes_anonymous_from_forbidden() {
        let record = owned_by(42);
        assert_matches!(
            PermissionPolicy::OwnerOnly.require(&Actor::anonymous(), &record, Operation::Read),
            Err(CoreError::Unauthorized(_))
        );
        assert_matches!(
            PermissionPolicy::OwnerOnly.require(&Actor::user(1, vec![]), &record, Operation::Read),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn anonymous_search_under_owner_policy_sees_nothing() {
        assert_eq!(
            PermissionPolicy::OwnerOnly.search_filter(&Actor::anonymous()),
            SearchFilter::Nothing
        );
        assert_eq!(
            PermissionPolicy::AllowAll.search_filter(&Actor::anonymous()),
            SearchFilter::All
        );
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("allow_all".parse::<PermissionPolicy>().unwrap(), PermissionPolicy::AllowAll);
        assert_eq!(
            "owner_or_role:managers".parse::<PermissionPolicy>().unwrap(),
            PermissionPolicy::OwnerOrRole("managers".into())
        );
        assert!("owner_or_role:".parse::<PermissionPolicy>().is_err());
        assert!("everyone".parse::<PermissionPolicy>().is_err());
    }
}
