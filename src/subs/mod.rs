use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use sqlx::PgPool;

use crate::reddit::types::{is_valid_subreddit, normalize_subreddit};
use crate::telemetry::{self};
use crate::telemetry::ops::sub::Phase as SubPhase;

mod db;
pub mod types;

/// nichetrack sub add/ls/rm/set-active
#[derive(Args)]
pub struct SubCmd {
    #[command(subcommand)]
    pub cmd: SubSub,
}

#[derive(Subcommand)]
pub enum SubSub {
    // subscribe a user to a subreddit (plan-only by default; use --apply to write)
    Add {
        user: String,
        subreddit: String,
        /// Store the subscription switched off
        #[arg(long, default_value_t = false)]
        inactive: bool,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    // list subscriptions
    Ls {
        #[arg(long)]
        user: Option<String>,
        /// Filter by active status: true/false. Omit to show all.
        #[arg(long)]
        active: Option<bool>,
    },
    // delete a subscription by id
    Rm {
        id: i64,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    // switch a subscription on or off
    SetActive {
        id: i64,
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
}

pub async fn run(pool: &PgPool, args: SubCmd) -> Result<()> {
    let log = telemetry::sub();
    let _g = log.root_span().entered();
    match args.cmd {
        SubSub::Add { user, subreddit, inactive, apply } => add_sub(pool, user, subreddit, !inactive, apply).await?,
        SubSub::Ls { user, active } => ls_subs(pool, user, active).await?,
        SubSub::Rm { id, apply } => rm_sub(pool, id, apply).await?,
        SubSub::SetActive { id, active, apply } => set_active(pool, id, active, apply).await?,
    }
    Ok(())
}

/// Friendly validation before any DB I/O.
pub fn parse_subreddit_arg(raw: &str) -> Result<String> {
    let name = normalize_subreddit(raw);
    if !is_valid_subreddit(&name) {
        bail!("Invalid subreddit name: {:?}", raw);
    }
    Ok(name)
}

fn parse_user_arg(raw: &str) -> Result<String> {
    let user = raw.trim();
    if user.is_empty() { bail!("User id must not be empty"); }
    Ok(user.to_string())
}

async fn add_sub(pool: &PgPool, user: String, subreddit: String, active: bool, apply: bool) -> Result<()> {
    let log = telemetry::sub();
    let user_id = parse_user_arg(&user)?;
    let subreddit = parse_subreddit_arg(&subreddit)?;

    if !apply {
        let _s = log.span(&SubPhase::Plan).entered();
        log.info(format!("📝 Subscription plan — add user={} r/{} active={}", user_id, subreddit, active));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&types::SubAddPlan { action: "add", user_id, subreddit, active })?;
        }
        return Ok(());
    }
    let _s = log.span(&SubPhase::Add).entered();
    let (id, inserted) = db::upsert_subscription(pool, &user_id, &subreddit, active).await?;
    if inserted { log.info(format!("➕ Subscription added [{}]", id)); } else { log.info(format!("♻️ Subscription updated [{}]", id)); }
    if telemetry::config::json_mode() {
        log.result(&types::SubAddResult { id, inserted, user_id, subreddit })?;
    }
    Ok(())
}

async fn ls_subs(pool: &PgPool, user: Option<String>, active: Option<bool>) -> Result<()> {
    let log = telemetry::sub();
    let _s = log.span_kv(&SubPhase::List, [("user", format!("{:?}", user)), ("active", format!("{:?}", active))]).entered();
    let subscriptions = db::list_subscriptions(pool, user.as_deref(), active).await?;
    log.info("📡 Subscriptions:");
    for row in &subscriptions {
        log.info(format!(
            "[{}] {} r/{} active={} created_at={}",
            row.id, row.user_id, row.subreddit, row.is_active, row.created_at
        ));
    }
    if telemetry::config::json_mode() {
        log.result(&types::SubList { subscriptions })?;
    }
    Ok(())
}

async fn rm_sub(pool: &PgPool, id: i64, apply: bool) -> Result<()> {
    let log = telemetry::sub();
    let existing = db::get_subscription(pool, id).await?.with_context(|| format!("No subscription with id {}", id))?;

    if !apply {
        let _s = log.span(&SubPhase::Plan).entered();
        log.info(format!("📝 Subscription plan — remove [{}] {} r/{}", id, existing.user_id, existing.subreddit));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&types::SubChangePlan { action: "remove", subscription: existing, active: None })?;
        }
        return Ok(());
    }
    let _s = log.span(&SubPhase::Remove).entered();
    let changed = db::delete_subscription(pool, id).await?;
    log.info(format!("🗑️ Subscription removed [{}] r/{}", id, existing.subreddit));
    if telemetry::config::json_mode() {
        log.result(&types::SubChangeResult { action: "remove", id, changed })?;
    }
    Ok(())
}

async fn set_active(pool: &PgPool, id: i64, active: bool, apply: bool) -> Result<()> {
    let log = telemetry::sub();
    let existing = db::get_subscription(pool, id).await?.with_context(|| format!("No subscription with id {}", id))?;

    if !apply {
        let _s = log.span(&SubPhase::Plan).entered();
        log.info(format!("📝 Subscription plan — set [{}] r/{} active {} → {}", id, existing.subreddit, existing.is_active, active));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&types::SubChangePlan { action: "set-active", subscription: existing, active: Some(active) })?;
        }
        return Ok(());
    }
    let _s = log.span(&SubPhase::SetActive).entered();
    let changed = db::set_active(pool, id, active).await?;
    if changed { log.info(format!("🔁 Subscription [{}] active={}", id, active)); } else { log.info(format!("↩️ Subscription [{}] already active={}", id, active)); }
    if telemetry::config::json_mode() {
        log.result(&types::SubChangeResult { action: "set-active", id, changed })?;
    }
    Ok(())
}
