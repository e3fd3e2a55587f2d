//! The lifecycle engine: validates, applies, and persists ticket
//! transitions as single transactions.
//!
//! Every mutation follows the same shape: load the ticket and its SLA
//! record inside a transaction, ask the state machine for a verdict,
//! apply side effects, run the SLA hooks, and write the ticket back
//! through an optimistic version guard. A guard miss rolls the whole
//! attempt back and retries a bounded number of times, which serializes
//! concurrent writers per ticket. Audit and notification dispatch happen
//! after commit and never affect the outcome.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::config::GlobalConfig;
use crate::lifecycle::state_machine::{next_status, TicketAction};
use crate::models::assignment::Assignment;
use crate::models::sla::SlaEvaluation;
use crate::models::ticket::{Ticket, TicketStatus};
use crate::models::token::{ActionToken, TokenAction};
use crate::notify::{LifecycleEvent, NotificationDispatcher, TracingNotifier};
use crate::persistence::assignment_repo::AssignmentRepo;
use crate::persistence::sla_repo::SlaRepo;
use crate::persistence::ticket_repo::TicketRepo;
use crate::persistence::token_repo::TokenRepo;
use crate::sla::tracker;
use crate::{AppError, Result};

/// Who is invoking an operation, for audit attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    /// Identifier of the acting user or system.
    pub actor_id: String,
    /// Role the actor holds.
    pub role: ActorRole,
}

/// Role classification for an acting party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    /// Authenticated back-office staff.
    Staff,
    /// A field executive acting through a token link.
    FieldExecutive,
    /// Automated ingestion or maintenance.
    System,
}

/// A staff- or system-initiated lifecycle action with its payload.
///
/// Token-coupled actions (`issue_on_site_token`, `issue_resolution_token`,
/// `technician_submits_proof`) flow through [`LifecycleEngine::issue_token`]
/// and [`LifecycleEngine::redeem_token`] instead, which pair the status
/// change with token issuance or redemption in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffAction {
    /// Assign (or reassign) a field executive.
    Assign {
        /// The chosen field executive.
        fe_id: String,
        /// Reason recorded when the pick deviates from the recommendation.
        override_reason: Option<String>,
    },
    /// Approve a ticket parked for review.
    Approve,
    /// Record technician arrival manually.
    TechnicianArrives,
    /// Verify completed work.
    StaffVerify,
    /// Reopen a resolved ticket.
    Reopen,
}

impl StaffAction {
    fn ticket_action(&self) -> TicketAction {
        match self {
            Self::Assign { .. } => TicketAction::Assign,
            Self::Approve => TicketAction::Approve,
            Self::TechnicianArrives => TicketAction::TechnicianArrives,
            Self::StaffVerify => TicketAction::StaffVerify,
            Self::Reopen => TicketAction::Reopen,
        }
    }
}

/// Request payload for opening a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTicket {
    /// Email address of the reporting party.
    pub requester: String,
    /// Short description of the issue.
    pub subject: String,
    /// Ingestion confidence score; `None` for manual staff entry.
    pub confidence: Option<f64>,
}

/// Result of a token issuance request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The token value to embed in the technician link.
    pub token_id: String,
    /// Whether an existing live token was returned instead of a new one.
    pub already_existed: bool,
}

/// Result of a successful token redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    /// Ticket the token belonged to.
    pub ticket_id: String,
    /// Redeeming field executive.
    pub fe_id: String,
    /// The action the token authorized.
    pub action: TokenAction,
}

/// Façade over the state machine, SLA tracker, and token service.
#[derive(Clone)]
pub struct LifecycleEngine {
    db: Arc<SqlitePool>,
    config: Arc<GlobalConfig>,
    tickets: TicketRepo,
    assignments: AssignmentRepo,
    sla: SlaRepo,
    tokens: TokenRepo,
    audit: Option<Arc<dyn AuditLogger>>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl LifecycleEngine {
    /// Build an engine over the given pool and configuration.
    ///
    /// Notifications default to [`TracingNotifier`]; no audit sink is
    /// attached until [`Self::with_audit`] is called.
    #[must_use]
    pub fn new(db: Arc<SqlitePool>, config: Arc<GlobalConfig>) -> Self {
        Self {
            tickets: TicketRepo::new(Arc::clone(&db)),
            assignments: AssignmentRepo::new(Arc::clone(&db)),
            sla: SlaRepo::new(Arc::clone(&db)),
            tokens: TokenRepo::new(Arc::clone(&db)),
            db,
            config,
            audit: None,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Replace the notification dispatcher.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Open a new ticket with its SLA record, in one transaction.
    ///
    /// Machine-created tickets whose ingestion confidence falls below the
    /// configured threshold open in `needs_review` with the SLA clock
    /// already paused.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if persistence fails.
    pub async fn open_ticket(&self, request: OpenTicket) -> Result<Ticket> {
        let now = Utc::now();
        let status = match request.confidence {
            Some(score) if score < self.config.review_confidence_threshold => {
                TicketStatus::NeedsReview
            }
            _ => TicketStatus::Open,
        };

        let ticket = Ticket::new(
            request.requester,
            request.subject,
            request.confidence,
            status,
            now,
        );
        let mut record = tracker::start(ticket.id.clone(), now, &self.config.sla);
        if status.pauses_sla() {
            record.paused_at = Some(now);
        }

        let mut tx = self.db.begin().await?;
        self.tickets.create(tx.as_mut(), &ticket).await?;
        self.sla.create(tx.as_mut(), &record).await?;
        tx.commit().await?;

        info!(ticket_id = %ticket.id, status = status.as_str(), "ticket opened");
        self.record_audit(
            AuditEntry::new(AuditEventType::TicketOpened)
                .with_ticket(ticket.id.clone())
                .with_metadata(serde_json::json!({ "confidence": ticket.confidence })),
        );
        self.dispatch(&LifecycleEvent::TicketOpened {
            ticket_id: ticket.id.clone(),
            requester: ticket.requester.clone(),
        });

        Ok(ticket)
    }

    /// Attempt a staff-initiated lifecycle transition.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTransition` if the action is illegal
    /// from the current status, `AppError::NotFound` for an unknown
    /// ticket, `AppError::ConcurrentModification` once retries are
    /// exhausted, or `AppError::Db` on persistence failure. Any failure
    /// leaves the ticket, SLA, and token state untouched.
    pub async fn attempt_transition(
        &self,
        ticket_id: &str,
        action: &StaffAction,
        actor: &ActorContext,
    ) -> Result<Ticket> {
        let mut attempt = 0;
        loop {
            match self.try_transition(ticket_id, action, actor).await {
                Err(AppError::ConcurrentModification(msg)) => {
                    attempt += 1;
                    if attempt > self.config.max_transition_retries {
                        return Err(AppError::ConcurrentModification(msg));
                    }
                    warn!(ticket_id, attempt, "version conflict, retrying transition");
                }
                other => return other,
            }
        }
    }

    #[allow(clippy::too_many_lines)] // Load + validate + apply + persist is inherently sequential.
    async fn try_transition(
        &self,
        ticket_id: &str,
        action: &StaffAction,
        actor: &ActorContext,
    ) -> Result<Ticket> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let mut ticket = self
            .tickets
            .get_in_tx(tx.as_mut(), ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ticket {ticket_id} not found")))?;
        let mut record = self
            .sla
            .get_in_tx(tx.as_mut(), ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("sla record for {ticket_id} not found")))?;

        let from = ticket.status;
        let next = next_status(from, action.ticket_action())?;
        let expected_version = ticket.version;

        let mut assigned_fe = None;
        if let StaffAction::Assign {
            fe_id,
            override_reason,
        } = action
        {
            let assignment = Assignment::new(
                ticket.id.clone(),
                fe_id.clone(),
                override_reason.clone(),
                now,
            );
            self.assignments.create(tx.as_mut(), &assignment).await?;
            ticket.current_assignment_id = Some(assignment.id);
            assigned_fe = Some(fe_id.clone());
        }

        ticket.status = next;
        ticket.updated_at = now;
        tracker::on_transition(&mut record, from, next, now, &self.config.sla);
        tracker::refresh_breaches(&mut record, next, now);

        if !self
            .tickets
            .update_guarded(tx.as_mut(), &ticket, expected_version)
            .await?
        {
            return Err(AppError::ConcurrentModification(format!(
                "ticket {ticket_id} changed concurrently"
            )));
        }
        self.sla.save(tx.as_mut(), &record).await?;
        tx.commit().await?;
        ticket.version += 1;

        info!(
            ticket_id,
            action = action.ticket_action().name(),
            from = from.as_str(),
            to = next.as_str(),
            "transition applied"
        );
        let mut entry = AuditEntry::new(AuditEventType::Transition)
            .with_ticket(ticket.id.clone())
            .with_action(action.ticket_action().name())
            .with_statuses(from.as_str(), next.as_str())
            .with_actor(actor.actor_id.clone());
        if let Some(fe_id) = assigned_fe {
            self.record_audit(
                AuditEntry::new(AuditEventType::AssignmentCreated)
                    .with_ticket(ticket.id.clone())
                    .with_actor(actor.actor_id.clone())
                    .with_fe(fe_id.clone()),
            );
            entry = entry.with_fe(fe_id);
        }
        self.record_audit(entry);
        self.dispatch(&LifecycleEvent::StatusChanged {
            ticket_id: ticket.id.clone(),
            from: from.as_str().to_owned(),
            to: next.as_str().to_owned(),
        });

        if matches!(action, StaffAction::StaffVerify) {
            self.check_all_resolved(&ticket.requester).await;
        }

        Ok(ticket)
    }

    /// Issue a technician action token, deduplicating per triple.
    ///
    /// Repeated staff clicks return the existing live token with
    /// `already_existed = true` and change nothing. A fresh on-site
    /// issuance also moves the ticket `assigned → en_route` in the same
    /// transaction; resolution issuance never moves the status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the ticket is unknown or `fe_id`
    /// does not hold its current assignment, `AppError::InvalidTransition`
    /// if the ticket is not in the right status, or the usual
    /// concurrency/persistence errors.
    pub async fn issue_token(
        &self,
        ticket_id: &str,
        fe_id: &str,
        action: TokenAction,
        actor: &ActorContext,
    ) -> Result<IssuedToken> {
        let mut attempt = 0;
        loop {
            match self.try_issue(ticket_id, fe_id, action, actor).await {
                Err(AppError::ConcurrentModification(msg)) => {
                    attempt += 1;
                    if attempt > self.config.max_transition_retries {
                        return Err(AppError::ConcurrentModification(msg));
                    }
                    warn!(ticket_id, attempt, "version conflict, retrying issuance");
                }
                other => return other,
            }
        }
    }

    #[allow(clippy::too_many_lines)] // Dedup + validate + mint + guard-update is inherently sequential.
    async fn try_issue(
        &self,
        ticket_id: &str,
        fe_id: &str,
        action: TokenAction,
        actor: &ActorContext,
    ) -> Result<IssuedToken> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let mut ticket = self
            .tickets
            .get_in_tx(tx.as_mut(), ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ticket {ticket_id} not found")))?;
        self.ensure_current_fe(&mut tx, &ticket, fe_id).await?;

        // Dedup comes before transition validation: a second click after
        // the first already moved the status must still return the live
        // token instead of failing.
        if let Some(existing) = self
            .tokens
            .find_active_in_tx(tx.as_mut(), ticket_id, fe_id, action, now)
            .await?
        {
            tx.commit().await?;
            return Ok(IssuedToken {
                token_id: existing.id,
                already_existed: true,
            });
        }

        let machine_action = match action {
            TokenAction::OnSite => TicketAction::IssueOnSiteToken,
            TokenAction::Resolution => TicketAction::IssueResolutionToken,
        };
        let from = ticket.status;
        let next = next_status(from, machine_action)?;
        let expected_version = ticket.version;

        let ttl_hours = match action {
            TokenAction::OnSite => self.config.tokens.onsite_ttl_hours,
            TokenAction::Resolution => self.config.tokens.resolution_ttl_hours,
        };
        let token = ActionToken::new(
            ticket.id.clone(),
            fe_id.to_owned(),
            action,
            ttl_hours,
            now,
        );
        self.tokens.create(tx.as_mut(), &token).await?;

        // The ticket row is guard-updated even when the status does not
        // move (resolution issuance), so concurrent issuers serialize on
        // the version and the dedup check cannot double-insert.
        let mut record = self
            .sla
            .get_in_tx(tx.as_mut(), ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("sla record for {ticket_id} not found")))?;
        ticket.status = next;
        ticket.updated_at = now;
        tracker::on_transition(&mut record, from, next, now, &self.config.sla);
        tracker::refresh_breaches(&mut record, next, now);

        if !self
            .tickets
            .update_guarded(tx.as_mut(), &ticket, expected_version)
            .await?
        {
            return Err(AppError::ConcurrentModification(format!(
                "ticket {ticket_id} changed concurrently"
            )));
        }
        self.sla.save(tx.as_mut(), &record).await?;
        tx.commit().await?;

        info!(ticket_id, fe_id, action = action.as_str(), "token issued");
        self.record_audit(
            AuditEntry::new(AuditEventType::TokenIssued)
                .with_ticket(ticket.id.clone())
                .with_actor(actor.actor_id.clone())
                .with_fe(fe_id.to_owned())
                .with_token(token.id.clone()),
        );
        self.dispatch(&LifecycleEvent::TokenIssued {
            ticket_id: ticket.id.clone(),
            fe_id: fe_id.to_owned(),
            action,
        });
        if from != next {
            self.dispatch(&LifecycleEvent::StatusChanged {
                ticket_id: ticket.id,
                from: from.as_str().to_owned(),
                to: next.as_str().to_owned(),
            });
        }

        Ok(IssuedToken {
            token_id: token.id,
            already_existed: false,
        })
    }

    /// Redeem a technician token and apply the transition it authorizes.
    ///
    /// Redemption happens first; only if the token flips unused → used
    /// does the status move, all in one transaction. A replayed link
    /// fails with `AlreadyUsed` and the ticket stays put; an invalid
    /// transition rolls the redemption back, leaving the token live.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Token` for a missing, spent, or expired token,
    /// `AppError::InvalidTransition` if the ticket has moved on, or the
    /// usual concurrency/persistence errors.
    pub async fn redeem_token(
        &self,
        token_id: &str,
        proof_url: Option<String>,
    ) -> Result<Redemption> {
        let mut attempt = 0;
        loop {
            match self.try_redeem(token_id, proof_url.as_deref()).await {
                Err(AppError::ConcurrentModification(msg)) => {
                    attempt += 1;
                    if attempt > self.config.max_transition_retries {
                        return Err(AppError::ConcurrentModification(msg));
                    }
                    warn!(token_id, attempt, "version conflict, retrying redemption");
                }
                other => return other,
            }
        }
    }

    #[allow(clippy::too_many_lines)] // Redeem-then-transition must stay one sequential flow.
    async fn try_redeem(&self, token_id: &str, proof_url: Option<&str>) -> Result<Redemption> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let token = self
            .tokens
            .redeem(tx.as_mut(), token_id, now, proof_url)
            .await?;

        let mut ticket = self
            .tickets
            .get_in_tx(tx.as_mut(), &token.ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ticket {} not found", token.ticket_id)))?;
        let mut record = self
            .sla
            .get_in_tx(tx.as_mut(), &token.ticket_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("sla record for {} not found", token.ticket_id))
            })?;

        let machine_action = match token.action {
            TokenAction::OnSite => TicketAction::TechnicianArrives,
            TokenAction::Resolution => TicketAction::TechnicianSubmitsProof,
        };
        let from = ticket.status;
        let next = next_status(from, machine_action)?;
        let expected_version = ticket.version;

        ticket.status = next;
        ticket.updated_at = now;
        tracker::on_transition(&mut record, from, next, now, &self.config.sla);
        tracker::refresh_breaches(&mut record, next, now);

        if !self
            .tickets
            .update_guarded(tx.as_mut(), &ticket, expected_version)
            .await?
        {
            return Err(AppError::ConcurrentModification(format!(
                "ticket {} changed concurrently",
                token.ticket_id
            )));
        }
        self.sla.save(tx.as_mut(), &record).await?;
        tx.commit().await?;

        info!(
            ticket_id = %token.ticket_id,
            fe_id = %token.fe_id,
            action = token.action.as_str(),
            "token redeemed"
        );
        self.record_audit(
            AuditEntry::new(AuditEventType::TokenRedeemed)
                .with_ticket(token.ticket_id.clone())
                .with_statuses(from.as_str(), next.as_str())
                .with_fe(token.fe_id.clone())
                .with_token(token.id.clone()),
        );
        self.dispatch(&LifecycleEvent::TokenRedeemed {
            ticket_id: token.ticket_id.clone(),
            fe_id: token.fe_id.clone(),
            action: token.action,
        });
        self.dispatch(&LifecycleEvent::StatusChanged {
            ticket_id: token.ticket_id.clone(),
            from: from.as_str().to_owned(),
            to: next.as_str().to_owned(),
        });

        Ok(Redemption {
            ticket_id: token.ticket_id,
            fe_id: token.fe_id,
            action: token.action,
        })
    }

    /// Evaluate the three SLA phases for a ticket at the current time.
    ///
    /// Read-time evaluation, safe to call anytime. Newly overdue phases
    /// are persisted as breached as a side effect, so a displayed breach
    /// is always durable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown ticket or
    /// `AppError::Db` on persistence failure.
    pub async fn evaluate_sla(&self, ticket_id: &str) -> Result<SlaEvaluation> {
        let now = Utc::now();
        let ticket = self
            .tickets
            .get_by_id(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ticket {ticket_id} not found")))?;
        let mut record = self
            .sla
            .get_for_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("sla record for {ticket_id} not found")))?;

        if tracker::refresh_breaches(&mut record, ticket.status, now) {
            let mut conn = self.db.acquire().await?;
            self.sla.save(conn.as_mut(), &record).await?;
            self.record_audit(
                AuditEntry::new(AuditEventType::SlaBreach)
                    .with_ticket(ticket_id.to_owned())
                    .with_metadata(serde_json::json!({
                        "assignment_breached": record.assignment.breached,
                        "onsite_breached": record.onsite.breached,
                        "resolution_breached": record.resolution.breached,
                    })),
            );
        }

        Ok(tracker::evaluate(
            &record,
            ticket.status,
            now,
            &self.config.sla,
        ))
    }

    /// Look up the newest live token for a ticket, for UI display.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn lookup_active_token(&self, ticket_id: &str) -> Result<Option<ActionToken>> {
        self.tokens.lookup_active(ticket_id, Utc::now()).await
    }

    /// Retrieve a ticket for display. Reads may bypass the engine; this
    /// is a convenience for callers that already hold one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown ticket.
    pub async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        self.tickets
            .get_by_id(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ticket {ticket_id} not found")))
    }

    async fn ensure_current_fe(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        ticket: &Ticket,
        fe_id: &str,
    ) -> Result<()> {
        let assignment_id = ticket.current_assignment_id.as_deref().ok_or_else(|| {
            AppError::NotFound(format!("ticket {} has no current assignment", ticket.id))
        })?;
        let assignment = self
            .assignments
            .get_in_tx(tx.as_mut(), assignment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("assignment {assignment_id} not found"))
            })?;
        if assignment.fe_id != fe_id {
            return Err(AppError::NotFound(format!(
                "fe {fe_id} does not hold the current assignment for ticket {}",
                ticket.id
            )));
        }
        Ok(())
    }

    /// Collaborator check after verification: if the requester has no
    /// unresolved tickets left, fire the all-resolved notification.
    /// Best-effort; failures are logged and swallowed.
    async fn check_all_resolved(&self, requester: &str) {
        match self.tickets.count_unresolved_for_requester(requester).await {
            Ok(0) => {
                self.dispatch(&LifecycleEvent::AllResolved {
                    requester: requester.to_owned(),
                });
            }
            Ok(_) => {}
            Err(err) => {
                warn!(requester, %err, "all-resolved check failed");
            }
        }
    }

    fn dispatch(&self, event: &LifecycleEvent) {
        if let Err(err) = self.notifier.notify(event) {
            warn!(%err, "notification dispatch failed");
        }
    }

    fn record_audit(&self, entry: AuditEntry) {
        if let Some(audit) = &self.audit {
            if let Err(err) = audit.log_entry(entry) {
                warn!(%err, "audit write failed");
            }
        }
    }
}
