//! Echo Bot Demo
//!
//! A small Courier bot showing the main building blocks:
//!
//! - message routes with capture groups (`/echo <text>`)
//! - an inline keyboard answered through a callback route (`/vote`)
//! - a role-protected controller (`/whoami` for admins)
//! - a fallback that observes everything nothing else handled
//! - hooks that tell users when they are not allowed to do something
//!
//! # Usage
//!
//! ```bash
//! COURIER_BOTS='[{token="123:abc"}]' cargo run --package echo-bot -- --admin 42
//! ```
//!
//! or put the bot into `courier.toml`:
//!
//! ```toml
//! [[bots]]
//! token = "123:abc"
//! username = "my_echo_bot"
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use courier::prelude::*;
use courier::core::BoxedPrincipal;
use courier::framework::ProcessingOutcome;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(about = "Echo bot built on Courier")]
struct Args {
    /// Configuration file (defaults to ./courier.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile
    #[arg(short, long)]
    profile: Option<String>,

    /// User ids granted the admin role
    #[arg(long = "admin")]
    admins: Vec<UserId>,
}

// ============================================================================
// Controllers
// ============================================================================

fn echo_controller() -> Controller {
    Controller::new("echo")
        .function(
            HandlerFunction::new("echo", |args: Arguments| async move {
                args.required_text(0).map(str::to_owned)
            })
            .param(Param::string("text").group_index(1))
            .on_message(OnMessage::new(r"/echo\s+(.+)").link_response(true)),
        )
        .function(
            HandlerFunction::new("ping", |_| async { "Pong!" })
                .on_message(OnMessage::new("/ping")),
        )
        .function(
            HandlerFunction::new("help", |_| async {
                Reply::Text(
                    "/echo <text> - Echo text\n/ping - Pong!\n/vote - Cast a vote\n/whoami - Admins only"
                        .to_string(),
                )
            })
            .on_message(OnMessage::new("/help|/start")),
        )
}

fn vote_controller() -> Controller {
    Controller::new("vote")
        .function(
            HandlerFunction::new("ballot", |_| async {
                Keyboard::new("Do you like Courier?", Vec::new())
                    .button("Yes", "vote:yes")
                    .button("No", "vote:no")
                    .columns(2)
            })
            .on_message(OnMessage::new("/vote")),
        )
        .function(
            HandlerFunction::new("cast", |args: Arguments| async move {
                let choice = args.named_text("choice")?.unwrap_or("nothing");
                Ok::<_, BoxError>(format!("You voted {choice}."))
            })
            .param(Param::string("choice"))
            .on_callback(OnCallback::new("vote:(?P<choice>yes|no)")),
        )
}

fn admin_controller() -> Controller {
    Controller::new("admin").authorized(["admin"]).function(
        HandlerFunction::new("whoami", |args: Arguments| async move {
            let admin = args.principal_as::<SimplePrincipal>(0)?;
            let ctx = args.context(1)?;
            let text = match admin {
                Some(admin) => format!(
                    "You are {} with roles {} on bot '{}'",
                    admin.user_id(),
                    admin.roles(),
                    ctx.bot_name()
                ),
                None => "You are not a known admin".to_string(),
            };
            Ok::<_, BoxError>(text)
        })
        .param(Param::principal::<SimplePrincipal>("admin"))
        .param(Param::context("ctx"))
        .on_message(OnMessage::new("/whoami")),
    )
}

fn fallback_controller() -> Controller {
    Controller::new("fallback").function(
        HandlerFunction::new("unhandled", |args: Arguments| async move {
            if let Ok(update) = args.update(0) {
                info!(update_id = update.update_id, kind = update.kind_name(), "Unhandled update");
            }
        })
        .param(Param::raw_update("update"))
        .fallback(FallbackMapping::new()),
    )
}

// ============================================================================
// Configuration and hooks
// ============================================================================

/// Grants the admin role to a fixed set of users.
struct AdminTable {
    admins: HashSet<UserId>,
}

#[async_trait]
impl BotConfiguration for AdminTable {
    async fn resolve_principal(&self, user_id: UserId) -> Result<Option<BoxedPrincipal>, BoxError> {
        let roles: Vec<&str> = if self.admins.contains(&user_id) { vec!["admin"] } else { Vec::new() };
        Ok(Some(Arc::new(SimplePrincipal::new(user_id, roles))))
    }
}

/// Answers denied requests and logs failures.
struct AuditHooks;

#[async_trait]
impl UpdateHooks for AuditHooks {
    async fn on_unauthorized_access(&self, ctx: &UpdateContext) -> Result<(), BoxError> {
        warn!(user = ?ctx.update().sender_id(), "Access denied");
        if let Some(chat) = ctx.update().conversation().map(|m| m.chat_id()) {
            ctx.sender()
                .send(&OutgoingMessage::new(chat, "You are not allowed to do that."))
                .await?;
        }
        Ok(())
    }

    async fn on_update_completed(&self, ctx: &UpdateContext, outcome: ProcessingOutcome, result: &DispatchResult) {
        if let Err(err) = result {
            if outcome.is_failure() {
                warn!(cycle = %ctx.cycle_id(), %outcome, error = %err.chain(), "Update failed");
            }
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = CourierRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    runtime
        .register_controllers([
            echo_controller(),
            vote_controller(),
            admin_controller(),
            fallback_controller(),
        ])
        .await;
    runtime
        .set_configuration(
            "",
            AdminTable {
                admins: args.admins.into_iter().collect(),
            },
        )
        .await;
    runtime.set_hooks("", AuditHooks).await;

    let stats = runtime.run().await?;
    info!(stats = %stats.total(), "Bye");

    Ok(())
}
