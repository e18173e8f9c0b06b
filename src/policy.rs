//! Capability checks for subject data access.
//!
//! One policy-evaluation entry point consulted by every service operation,
//! instead of role string comparisons scattered across handlers. Default-deny,
//! rules checked in order:
//! 1. Provider comments require the clinician role regardless of target.
//! 2. Staff (clinician or administrator) → any action on any subject.
//! 3. Self → any non-provider action on the actor's own data.
//! 4. Default → DENY.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::Role;

/// The requesting user, as established by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// What the actor is trying to do with a subject's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GenerateReport,
    ViewReports,
    DeleteReport,
    CheckEligibility,
    CommentOnReport,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Self::GenerateReport => "generate reports",
            Self::ViewReports => "view reports",
            Self::DeleteReport => "delete reports",
            Self::CheckEligibility => "check eligibility",
            Self::CommentOnReport => "comment on reports",
        }
    }
}

/// Why access was granted or denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessReason {
    Staff,
    SelfAccess,
    Denied,
}

/// Result of a policy evaluation.
#[derive(Debug, Clone)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }
}

/// Evaluate whether `actor` may perform `action` on `target_subject`'s data.
pub fn evaluate(actor: &Actor, action: Action, target_subject: Uuid) -> AccessDecision {
    // Rule 1: provider-only action
    if action == Action::CommentOnReport {
        return if actor.role == Role::Clinician {
            AccessDecision::allow(AccessReason::Staff)
        } else {
            AccessDecision::deny()
        };
    }

    // Rule 2: staff may act cross-subject
    if actor.is_staff() {
        return AccessDecision::allow(AccessReason::Staff);
    }

    // Rule 3: own data
    if actor.id == target_subject {
        return AccessDecision::allow(AccessReason::SelfAccess);
    }

    // Rule 4: default deny
    AccessDecision::deny()
}

/// Human-readable denial message for the error body.
pub fn denial_message(actor: &Actor, action: Action) -> String {
    if action == Action::CommentOnReport {
        "Only providers can comment on reports".to_string()
    } else {
        format!(
            "Only clinicians and administrators can {} for other subjects",
            action.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Patient)
    }

    #[test]
    fn self_access_allowed_for_patients() {
        let actor = patient();
        let decision = evaluate(&actor, Action::GenerateReport, actor.id);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::SelfAccess);
    }

    #[test]
    fn cross_subject_denied_for_patients() {
        let actor = patient();
        for action in [
            Action::GenerateReport,
            Action::ViewReports,
            Action::DeleteReport,
            Action::CheckEligibility,
        ] {
            let decision = evaluate(&actor, action, Uuid::new_v4());
            assert!(!decision.allowed, "patient should not {:?} cross-subject", action);
        }
    }

    #[test]
    fn staff_allowed_cross_subject() {
        for role in [Role::Clinician, Role::Administrator] {
            let actor = Actor::new(Uuid::new_v4(), role);
            let decision = evaluate(&actor, Action::GenerateReport, Uuid::new_v4());
            assert!(decision.allowed);
            assert_eq!(decision.reason, AccessReason::Staff);
        }
    }

    #[test]
    fn comments_require_clinician() {
        let clinician = Actor::new(Uuid::new_v4(), Role::Clinician);
        assert!(evaluate(&clinician, Action::CommentOnReport, Uuid::new_v4()).allowed);

        let admin = Actor::new(Uuid::new_v4(), Role::Administrator);
        assert!(!evaluate(&admin, Action::CommentOnReport, Uuid::new_v4()).allowed);

        // Even on their own report, a patient is not a provider.
        let actor = patient();
        assert!(!evaluate(&actor, Action::CommentOnReport, actor.id).allowed);
    }
}
