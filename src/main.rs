#![forbid(unsafe_code)]

//! `fieldline`: ticket lifecycle engine admin binary.
//!
//! Thin CLI over [`fieldline::orchestrator::engine::LifecycleEngine`] for
//! operators: bootstrap the database, open tickets, drive staff
//! transitions, issue and redeem technician tokens, and inspect SLA
//! state. The CRM web tier consumes the library crate directly; this
//! binary exists for deployment setup and incident triage.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fieldline::audit::JsonlAuditWriter;
use fieldline::config::GlobalConfig;
use fieldline::models::token::TokenAction;
use fieldline::orchestrator::engine::{
    ActorContext, ActorRole, LifecycleEngine, OpenTicket, StaffAction,
};
use fieldline::persistence::db;
use fieldline::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "fieldline", about = "Ticket lifecycle engine admin CLI", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Staff identifier recorded in the audit trail.
    #[arg(long, default_value = "cli-operator")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database file and apply the schema.
    Init,
    /// Open a new ticket.
    Open {
        /// Requester email address.
        #[arg(long)]
        requester: String,
        /// Ticket subject line.
        #[arg(long)]
        subject: String,
        /// Ingestion confidence score, if machine-created.
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Assign a field executive to a ticket.
    Assign {
        /// Ticket identifier.
        ticket_id: String,
        /// Field executive identifier.
        #[arg(long)]
        fe: String,
        /// Reason for overriding the recommended technician.
        #[arg(long)]
        override_reason: Option<String>,
    },
    /// Approve a ticket parked for review.
    Approve {
        /// Ticket identifier.
        ticket_id: String,
    },
    /// Record technician arrival manually.
    Arrive {
        /// Ticket identifier.
        ticket_id: String,
    },
    /// Verify completed work.
    Verify {
        /// Ticket identifier.
        ticket_id: String,
    },
    /// Reopen a resolved ticket.
    Reopen {
        /// Ticket identifier.
        ticket_id: String,
    },
    /// Issue a technician action token.
    IssueToken {
        /// Ticket identifier.
        ticket_id: String,
        /// Field executive identifier.
        #[arg(long)]
        fe: String,
        /// Token kind: on_site or resolution.
        #[arg(long, value_enum)]
        action: TokenKind,
    },
    /// Redeem a technician action token.
    Redeem {
        /// The token value from the link.
        token_id: String,
        /// Proof photo URL, if captured.
        #[arg(long)]
        proof_url: Option<String>,
    },
    /// Print the SLA evaluation for a ticket.
    Sla {
        /// Ticket identifier.
        ticket_id: String,
    },
    /// Print a ticket and its pending token, if any.
    Show {
        /// Ticket identifier.
        ticket_id: String,
    },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum TokenKind {
    OnSite,
    Resolution,
}

impl From<TokenKind> for TokenAction {
    fn from(kind: TokenKind) -> Self {
        match kind {
            TokenKind::OnSite => Self::OnSite,
            TokenKind::Resolution => Self::Resolution,
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))
}

#[allow(clippy::too_many_lines)] // One match arm per subcommand.
async fn run(args: Cli) -> Result<()> {
    let config = Arc::new(GlobalConfig::load_from_path(&args.config)?);
    let pool = Arc::new(db::connect(&config.db_path).await?);
    let audit = Arc::new(JsonlAuditWriter::from_config(&config)?);
    let engine = LifecycleEngine::new(Arc::clone(&pool), Arc::clone(&config))
        .with_audit(audit);
    let actor = ActorContext {
        actor_id: args.actor.clone(),
        role: ActorRole::Staff,
    };

    match args.command {
        Command::Init => {
            // Connecting already bootstraps the schema.
            info!(db_path = %config.db_path.display(), "database initialized");
        }
        Command::Open {
            requester,
            subject,
            confidence,
        } => {
            let ticket = engine
                .open_ticket(OpenTicket {
                    requester,
                    subject,
                    confidence,
                })
                .await?;
            println!("{} {}", ticket.id, ticket.status.as_str());
        }
        Command::Assign {
            ticket_id,
            fe,
            override_reason,
        } => {
            let ticket = engine
                .attempt_transition(
                    &ticket_id,
                    &StaffAction::Assign {
                        fe_id: fe,
                        override_reason,
                    },
                    &actor,
                )
                .await?;
            println!("{} {}", ticket.id, ticket.status.as_str());
        }
        Command::Approve { ticket_id } => {
            let ticket = engine
                .attempt_transition(&ticket_id, &StaffAction::Approve, &actor)
                .await?;
            println!("{} {}", ticket.id, ticket.status.as_str());
        }
        Command::Arrive { ticket_id } => {
            let ticket = engine
                .attempt_transition(&ticket_id, &StaffAction::TechnicianArrives, &actor)
                .await?;
            println!("{} {}", ticket.id, ticket.status.as_str());
        }
        Command::Verify { ticket_id } => {
            let ticket = engine
                .attempt_transition(&ticket_id, &StaffAction::StaffVerify, &actor)
                .await?;
            println!("{} {}", ticket.id, ticket.status.as_str());
        }
        Command::Reopen { ticket_id } => {
            let ticket = engine
                .attempt_transition(&ticket_id, &StaffAction::Reopen, &actor)
                .await?;
            println!("{} {}", ticket.id, ticket.status.as_str());
        }
        Command::IssueToken {
            ticket_id,
            fe,
            action,
        } => {
            let issued = engine
                .issue_token(&ticket_id, &fe, action.into(), &actor)
                .await?;
            println!(
                "{} already_existed={}",
                issued.token_id, issued.already_existed
            );
        }
        Command::Redeem {
            token_id,
            proof_url,
        } => {
            let redemption = engine.redeem_token(&token_id, proof_url).await?;
            println!(
                "{} {} {}",
                redemption.ticket_id,
                redemption.fe_id,
                redemption.action.as_str()
            );
        }
        Command::Sla { ticket_id } => {
            let eval = engine.evaluate_sla(&ticket_id).await?;
            println!(
                "assignment={} onsite={} resolution={}",
                eval.assignment.as_str(),
                eval.onsite.as_str(),
                eval.resolution.as_str()
            );
        }
        Command::Show { ticket_id } => {
            let ticket = engine.get_ticket(&ticket_id).await?;
            println!(
                "{} {} requester={} assignment={}",
                ticket.id,
                ticket.status.as_str(),
                ticket.requester,
                ticket.current_assignment_id.as_deref().unwrap_or("-")
            );
            if let Some(token) = engine.lookup_active_token(&ticket_id).await? {
                println!(
                    "pending token: {} fe={} expires={}",
                    token.action.as_str(),
                    token.fe_id,
                    token.expires_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}
