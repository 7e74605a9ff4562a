// Request context and authorization
//
// Authentication happens outside the core. Every operation receives the already
// authenticated caller together with the instant it treats as "now".

use chrono::{DateTime, Utc};
use seedbank_common::{Member, MemberRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub member_id: Uuid,
    pub family_id: Uuid,
    pub role: MemberRole,
}

impl Caller {
    pub fn is_parent(&self) -> bool {
        self.role == MemberRole::Parent
    }
}

impl From<&Member> for Caller {
    fn from(member: &Member) -> Self {
        Self { member_id: member.id, family_id: member.family_id, role: member.role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub caller: Caller,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(caller: Caller) -> Self {
        Self { caller, now: Utc::now() }
    }

    /// Pins "now" to a fixed instant.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn require_parent(&self, action: &str) -> Result<()> {
        if self.caller.is_parent() {
            Ok(())
        } else {
            Err(EngineError::Authorization(format!("only a parent may {}", action)))
        }
    }

    pub fn require_family(&self, family_id: Uuid) -> Result<()> {
        if self.caller.family_id == family_id {
            Ok(())
        } else {
            Err(EngineError::Authorization(format!(
                "member {} does not belong to family {}",
                self.caller.member_id, family_id
            )))
        }
    }

    /// Parents may act on any member of their family, children only on themselves.
    pub fn require_member_access(&self, member: &Member) -> Result<()> {
        self.require_family(member.family_id)?;

        if self.caller.is_parent() || self.caller.member_id == member.id {
            Ok(())
        } else {
            Err(EngineError::Authorization(format!(
                "member {} may not act on behalf of {}",
                self.caller.member_id, member.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(family_id: Uuid, role: MemberRole) -> Member {
        Member {
            id: Uuid::new_v4(),
            family_id,
            name: "member".to_string(),
            role,
            avatar_tone: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_child_may_only_act_on_self() {
        let family = Uuid::new_v4();
        let child = member(family, MemberRole::Child);
        let sibling = member(family, MemberRole::Child);
        let ctx = RequestContext::new(Caller::from(&child));

        assert!(ctx.require_member_access(&child).is_ok());
        assert!(matches!(
            ctx.require_member_access(&sibling),
            Err(EngineError::Authorization(_))
        ));
        assert!(ctx.require_parent("approve requests").is_err());
    }

    #[test]
    fn test_parent_is_bound_to_own_family() {
        let family = Uuid::new_v4();
        let parent = member(family, MemberRole::Parent);
        let child = member(family, MemberRole::Child);
        let stranger = member(Uuid::new_v4(), MemberRole::Child);
        let ctx = RequestContext::new(Caller::from(&parent));

        assert!(ctx.require_member_access(&child).is_ok());
        assert!(ctx.require_member_access(&stranger).is_err());
        assert!(ctx.require_family(stranger.family_id).is_err());
        assert!(ctx.require_parent("approve requests").is_ok());
    }

    #[test]
    fn test_at_pins_now() {
        let parent = member(Uuid::new_v4(), MemberRole::Parent);
        let instant = DateTime::parse_from_rfc3339("2026-01-19T15:00:00Z").unwrap().with_timezone(&Utc);
        let ctx = RequestContext::new(Caller::from(&parent)).at(instant);
        assert_eq!(ctx.now, instant);
    }
}
