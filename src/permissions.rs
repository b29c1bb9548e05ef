// src/permissions.rs

use crate::error::AppError;
use crate::models::user::UserRole;

/// The identity performing a request, as established by the token middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User {
        id: i64,
        role: UserRole,
        is_superuser: bool,
    },
}

impl Actor {
    pub fn id(&self) -> Option<i64> {
        match self {
            Actor::Anonymous => None,
            Actor::User { id, .. } => Some(*id),
        }
    }

    /// The authenticated user id, or 401 for anonymous actors.
    pub fn require_id(&self) -> Result<i64, AppError> {
        self.id()
            .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))
    }

    /// Full management rights: the admin role, or the superuser flag
    /// regardless of role.
    pub fn is_admin_capable(&self) -> bool {
        matches!(
            self,
            Actor::User { role, is_superuser, .. } if role.is_admin() || *is_superuser
        )
    }

    /// Moderation rights over reviews and comments.
    pub fn is_moderator_capable(&self) -> bool {
        matches!(
            self,
            Actor::User { role, is_superuser, .. } if role.is_moderator() || *is_superuser
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

/// The entity instance an action targets, carrying exactly the state the
/// decision needs. Ownership of reviews/comments travels as the author id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Category,
    Genre,
    Title,
    Review { author_id: i64 },
    Comment { author_id: i64 },
    /// An individual user record.
    Account { owner_id: i64 },
    /// The user directory as a whole (listing, admin creation).
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Evaluates whether `actor` may perform `action` on `resource`.
///
/// Pure function of its arguments: no I/O, no side effects. Consistency
/// rules that need storage state (e.g. one review per user per title) are
/// handled by the repositories, not here.
pub fn authorize(actor: &Actor, action: Action, resource: &Resource) -> Decision {
    use Action::*;
    use Resource::*;

    match (action, resource) {
        // Catalog and review content is world-readable, anonymous included.
        (Read, Category | Genre | Title | Review { .. } | Comment { .. }) => Decision::Allow,

        // User records require a token to read and admin rights to manage.
        (Read, Account { .. } | Directory) => authenticated(actor),
        (Create | Update | Delete, Directory) => admin_capable(actor),
        (Create | Delete, Account { .. }) => admin_capable(actor),
        (Update, Account { owner_id }) => {
            // Self-updates are allowed; which fields they may touch is the
            // caller's concern (restricted fields are dropped, not denied).
            if actor.is_admin_capable() || actor.id() == Some(*owner_id) {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }

        // Any authenticated user may write reviews and comments.
        (Create, Review { .. } | Comment { .. }) => authenticated(actor),

        // Mutation rights: author, moderator or admin.
        (Update | Delete, Review { author_id } | Comment { author_id }) => {
            if actor.is_moderator_capable() || actor.id() == Some(*author_id) {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }

        // Catalog mutation is reserved for admin-capable actors.
        (Create | Update | Delete, Category | Genre | Title) => admin_capable(actor),
    }
}

/// Like [`authorize`], but maps Deny to the boundary error: 401 for
/// anonymous actors, 403 for authenticated ones.
pub fn require(actor: &Actor, action: Action, resource: &Resource) -> Result<(), AppError> {
    match authorize(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny => match actor {
            Actor::Anonymous => Err(AppError::AuthError("Authentication required".to_string())),
            Actor::User { .. } => Err(AppError::PermissionDenied(
                "You are not allowed to perform this action".to_string(),
            )),
        },
    }
}

fn authenticated(actor: &Actor) -> Decision {
    match actor {
        Actor::Anonymous => Decision::Deny,
        Actor::User { .. } => Decision::Allow,
    }
}

fn admin_capable(actor: &Actor) -> Decision {
    if actor.is_admin_capable() {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> Actor {
        Actor::User {
            id,
            role: UserRole::User,
            is_superuser: false,
        }
    }

    fn moderator(id: i64) -> Actor {
        Actor::User {
            id,
            role: UserRole::Moderator,
            is_superuser: false,
        }
    }

    fn admin(id: i64) -> Actor {
        Actor::User {
            id,
            role: UserRole::Admin,
            is_superuser: false,
        }
    }

    fn superuser(id: i64) -> Actor {
        Actor::User {
            id,
            role: UserRole::User,
            is_superuser: true,
        }
    }

    #[test]
    fn anonymous_can_read_everything_public() {
        let anon = Actor::Anonymous;
        for resource in [
            Resource::Category,
            Resource::Genre,
            Resource::Title,
            Resource::Review { author_id: 1 },
            Resource::Comment { author_id: 1 },
        ] {
            assert_eq!(authorize(&anon, Action::Read, &resource), Decision::Allow);
        }
    }

    #[test]
    fn anonymous_cannot_read_accounts() {
        assert_eq!(
            authorize(&Actor::Anonymous, Action::Read, &Resource::Directory),
            Decision::Deny
        );
        assert_eq!(
            authorize(
                &Actor::Anonymous,
                Action::Read,
                &Resource::Account { owner_id: 1 }
            ),
            Decision::Deny
        );
    }

    #[test]
    fn anonymous_deny_maps_to_401() {
        let err = require(
            &Actor::Anonymous,
            Action::Create,
            &Resource::Review { author_id: 0 },
        )
        .unwrap_err();
        assert_eq!(err.kind(), "unauthorized");
    }

    #[test]
    fn authenticated_deny_maps_to_403() {
        let err = require(&user(1), Action::Create, &Resource::Category).unwrap_err();
        assert_eq!(err.kind(), "permission_denied");
    }

    #[test]
    fn any_authenticated_user_may_create_reviews_and_comments() {
        assert_eq!(
            authorize(&user(1), Action::Create, &Resource::Review { author_id: 1 }),
            Decision::Allow
        );
        assert_eq!(
            authorize(&user(1), Action::Create, &Resource::Comment { author_id: 1 }),
            Decision::Allow
        );
    }

    #[test]
    fn only_author_or_staff_may_mutate_reviews() {
        let theirs = Resource::Review { author_id: 2 };

        assert_eq!(authorize(&user(1), Action::Delete, &theirs), Decision::Deny);
        assert_eq!(authorize(&user(1), Action::Update, &theirs), Decision::Deny);
        assert_eq!(authorize(&user(2), Action::Delete, &theirs), Decision::Allow);
        assert_eq!(
            authorize(&moderator(1), Action::Delete, &theirs),
            Decision::Allow
        );
        assert_eq!(authorize(&admin(1), Action::Delete, &theirs), Decision::Allow);
        assert_eq!(
            authorize(&superuser(1), Action::Delete, &theirs),
            Decision::Allow
        );
    }

    #[test]
    fn comment_mutation_follows_the_same_pattern() {
        let theirs = Resource::Comment { author_id: 7 };
        assert_eq!(authorize(&user(1), Action::Update, &theirs), Decision::Deny);
        assert_eq!(authorize(&user(7), Action::Update, &theirs), Decision::Allow);
        assert_eq!(
            authorize(&moderator(1), Action::Update, &theirs),
            Decision::Allow
        );
    }

    #[test]
    fn catalog_writes_are_admin_only() {
        for resource in [Resource::Category, Resource::Genre, Resource::Title] {
            for action in [Action::Create, Action::Update, Action::Delete] {
                assert_eq!(authorize(&user(1), action, &resource), Decision::Deny);
                assert_eq!(authorize(&moderator(1), action, &resource), Decision::Deny);
                assert_eq!(authorize(&admin(1), action, &resource), Decision::Allow);
                assert_eq!(authorize(&superuser(1), action, &resource), Decision::Allow);
            }
        }
    }

    #[test]
    fn account_updates_allow_self_and_admin_only() {
        let account = Resource::Account { owner_id: 3 };

        assert_eq!(authorize(&user(3), Action::Update, &account), Decision::Allow);
        assert_eq!(authorize(&user(4), Action::Update, &account), Decision::Deny);
        // Moderators hold no extra rights over accounts.
        assert_eq!(
            authorize(&moderator(4), Action::Update, &account),
            Decision::Deny
        );
        assert_eq!(authorize(&admin(4), Action::Update, &account), Decision::Allow);
        assert_eq!(
            authorize(&superuser(4), Action::Update, &account),
            Decision::Allow
        );
    }

    #[test]
    fn account_create_and_delete_are_admin_only() {
        let account = Resource::Account { owner_id: 3 };
        assert_eq!(authorize(&user(3), Action::Delete, &account), Decision::Deny);
        assert_eq!(authorize(&admin(1), Action::Delete, &account), Decision::Allow);
        assert_eq!(
            authorize(&user(1), Action::Create, &Resource::Directory),
            Decision::Deny
        );
        assert_eq!(
            authorize(&admin(1), Action::Create, &Resource::Directory),
            Decision::Allow
        );
    }

    #[test]
    fn decisions_are_value_based() {
        // Same inputs, same decision: the engine holds no state.
        let actor = user(5);
        let resource = Resource::Review { author_id: 9 };
        assert_eq!(
            authorize(&actor, Action::Delete, &resource),
            authorize(&actor, Action::Delete, &resource)
        );
    }
}
