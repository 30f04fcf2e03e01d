//! # Booking Transitions
//!
//! Who may move a booking between statuses, and who may touch it at all.
//!
//! ## Permission Table
//! ```text
//! ┌──────────┬──────────────────────┬──────────────────────┬─────────────┐
//! │ role     │ current              │ requested            │ decision    │
//! ├──────────┼──────────────────────┼──────────────────────┼─────────────┤
//! │ staff    │ any                  │ any                  │ allowed     │
//! │ customer │ pending | confirmed  │ cancelled            │ allowed     │
//! │ customer │ in_progress | done   │ cancelled            │ denied      │
//! │ customer │ any                  │ anything else        │ denied      │
//! └──────────┴──────────────────────┴──────────────────────┴─────────────┘
//! ```
//!
//! Staff keep the unrestricted graph so they can correct mistakes (reopen a
//! booking cancelled by accident, roll back a premature completion).

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{BookingOwner, BookingStatus};

// =============================================================================
// Actor
// =============================================================================

/// Role of the caller, supplied by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Staff,
}

/// The identity behind a request.
///
/// `user_id` is `None` for unauthenticated guests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<i64>,
    pub role: Role,
}

impl Actor {
    pub const fn staff(user_id: i64) -> Self {
        Actor {
            user_id: Some(user_id),
            role: Role::Staff,
        }
    }

    pub const fn customer(user_id: i64) -> Self {
        Actor {
            user_id: Some(user_id),
            role: Role::Customer,
        }
    }

    pub const fn guest() -> Self {
        Actor {
            user_id: None,
            role: Role::Customer,
        }
    }

    #[inline]
    pub const fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff)
    }
}

// =============================================================================
// Transition Policy
// =============================================================================

/// Outcome of looking up one (role, current, requested) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Allowed,
    Denied(&'static str),
}

/// The transition table.
pub const fn transition_permission(
    role: Role,
    current: BookingStatus,
    requested: BookingStatus,
) -> Permission {
    use BookingStatus::*;

    match (role, current, requested) {
        (Role::Staff, _, _) => Permission::Allowed,
        (Role::Customer, Pending | Confirmed | InProgress, Cancelled) => Permission::Allowed,
        (Role::Customer, Cancelled, Cancelled) => {
            Permission::Denied("booking is already cancelled")
        }
        (Role::Customer, Completed, Cancelled) => {
            Permission::Denied("booking has already been completed")
        }
        (Role::Customer, _, _) => Permission::Denied("customers may only cancel a booking"),
    }
}

/// Every row of the table, for audit and tests.
pub fn policy_table() -> Vec<(Role, BookingStatus, BookingStatus, Permission)> {
    let mut rows = Vec::with_capacity(2 * BookingStatus::ALL.len() * BookingStatus::ALL.len());
    for role in [Role::Customer, Role::Staff] {
        for current in BookingStatus::ALL {
            for requested in BookingStatus::ALL {
                rows.push((
                    role,
                    current,
                    requested,
                    transition_permission(role, current, requested),
                ));
            }
        }
    }
    rows
}

/// Checks a status change, returning `TransitionForbidden` when denied.
pub fn check_transition(
    actor: &Actor,
    current: BookingStatus,
    requested: BookingStatus,
) -> CoreResult<()> {
    match transition_permission(actor.role, current, requested) {
        Permission::Allowed => Ok(()),
        Permission::Denied(reason) => Err(CoreError::TransitionForbidden {
            from: current,
            to: requested,
            reason: reason.to_string(),
        }),
    }
}

// =============================================================================
// Ownership
// =============================================================================

/// Staff pass; everyone else must be the registered owner.
///
/// Guest bookings have no user to match, so only staff can mutate them.
pub fn ensure_can_access(actor: &Actor, owner: &BookingOwner) -> CoreResult<()> {
    if actor.is_staff() {
        return Ok(());
    }

    match (actor.user_id, owner.user_id()) {
        (Some(caller), Some(owner_id)) if caller == owner_id => Ok(()),
        (None, _) => Err(CoreError::forbidden("sign in to manage bookings")),
        _ => Err(CoreError::forbidden("booking belongs to another customer")),
    }
}

/// Rejects non-staff callers.
pub fn ensure_staff(actor: &Actor) -> CoreResult<()> {
    if actor.is_staff() {
        Ok(())
    } else {
        Err(CoreError::forbidden("staff access required"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GuestContact;

    #[test]
    fn test_staff_can_reach_every_status() {
        for (role, current, requested, decision) in policy_table() {
            if role == Role::Staff {
                assert_eq!(decision, Permission::Allowed, "{current} -> {requested}");
            }
        }
    }

    #[test]
    fn test_customer_rows() {
        let allowed: Vec<_> = policy_table()
            .into_iter()
            .filter(|(role, _, _, d)| *role == Role::Customer && *d == Permission::Allowed)
            .map(|(_, from, to, _)| (from, to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (BookingStatus::Pending, BookingStatus::Cancelled),
                (BookingStatus::Confirmed, BookingStatus::Cancelled),
                (BookingStatus::InProgress, BookingStatus::Cancelled),
            ]
        );
        assert_eq!(
            transition_permission(Role::Customer, BookingStatus::Completed, BookingStatus::Cancelled),
            Permission::Denied("booking has already been completed")
        );
    }

    #[test]
    fn test_table_is_complete() {
        assert_eq!(policy_table().len(), 50);
    }

    #[test]
    fn test_customer_confirm_is_forbidden() {
        let actor = Actor::customer(3);
        let err = check_transition(&actor, BookingStatus::Pending, BookingStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, CoreError::TransitionForbidden { .. }));

        assert!(check_transition(&actor, BookingStatus::Pending, BookingStatus::Cancelled).is_ok());
    }

    #[test]
    fn test_ownership() {
        let mine = BookingOwner::Registered { user_id: 3 };
        let guest = BookingOwner::Guest {
            contact: GuestContact {
                name: "Guest".to_string(),
                email: "g@example.com".to_string(),
                phone: "555".to_string(),
            },
        };

        assert!(ensure_can_access(&Actor::customer(3), &mine).is_ok());
        assert!(ensure_can_access(&Actor::customer(4), &mine).is_err());
        assert!(ensure_can_access(&Actor::guest(), &guest).is_err());
        assert!(ensure_can_access(&Actor::staff(1), &guest).is_ok());
    }

    #[test]
    fn test_ensure_staff() {
        assert!(ensure_staff(&Actor::staff(1)).is_ok());
        assert!(matches!(
            ensure_staff(&Actor::customer(1)),
            Err(CoreError::Forbidden(_))
        ));
    }
}
