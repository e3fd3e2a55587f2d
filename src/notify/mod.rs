//! Outbound notification dispatch.
//!
//! Delivery itself (email, chat, push) lives outside this crate; the
//! engine only emits [`LifecycleEvent`]s through the
//! [`NotificationDispatcher`] trait. Dispatch is fire-and-forget:
//! failures are logged at warn level and never roll back the transition
//! that produced the event.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::token::TokenAction;

/// Lifecycle events consumed by the notification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum LifecycleEvent {
    /// A ticket was opened.
    TicketOpened {
        /// Ticket identifier.
        ticket_id: String,
        /// Reporting party.
        requester: String,
    },
    /// A ticket moved between statuses.
    StatusChanged {
        /// Ticket identifier.
        ticket_id: String,
        /// Status before the transition.
        from: String,
        /// Status after the transition.
        to: String,
    },
    /// A technician action token was issued.
    TokenIssued {
        /// Ticket identifier.
        ticket_id: String,
        /// Field executive the token targets.
        fe_id: String,
        /// The authorized action.
        action: TokenAction,
    },
    /// A technician action token was redeemed.
    TokenRedeemed {
        /// Ticket identifier.
        ticket_id: String,
        /// Redeeming field executive.
        fe_id: String,
        /// The authorized action.
        action: TokenAction,
    },
    /// Every ticket for a requester is now resolved.
    AllResolved {
        /// The requester whose queue emptied.
        requester: String,
    },
}

/// Delivers lifecycle events to the outside world.
///
/// Implementations must be [`Send`] and [`Sync`]; the engine shares one
/// dispatcher across async task boundaries via [`std::sync::Arc`].
pub trait NotificationDispatcher: Send + Sync {
    /// Dispatch a single event.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails; callers treat this as
    /// non-fatal and log it.
    fn notify(&self, event: &LifecycleEvent) -> crate::Result<()>;
}

/// Dispatcher that records events to the tracing log only.
///
/// The default wiring for deployments without an outbound channel and
/// for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationDispatcher for TracingNotifier {
    fn notify(&self, event: &LifecycleEvent) -> crate::Result<()> {
        info!(?event, "lifecycle notification");
        Ok(())
    }
}
