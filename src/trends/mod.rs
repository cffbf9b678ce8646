use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use sqlx::PgPool;

use crate::enrich::trend::TrendCategory;
use crate::store::types::TrendRow;
use crate::telemetry::{self};
use crate::telemetry::ops::trends::Phase as TrendsPhase;
use crate::util::time::parse_since_opt;

mod db;

/// nichetrack trends ls
#[derive(Args)]
pub struct TrendsCmd {
    #[command(subcommand)]
    pub cmd: TrendsSub,
}

#[derive(Subcommand)]
pub enum TrendsSub {
    // classified trends, newest first
    Ls {
        #[arg(long)]
        user: Option<String>,
        /// travel, health, finance or tech
        #[arg(long)]
        category: Option<TrendCategory>,
        #[arg(long)]
        since: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[derive(Serialize)]
struct TrendList {
    trends: Vec<TrendRow>,
}

pub async fn run(pool: &PgPool, args: TrendsCmd) -> Result<()> {
    let log = telemetry::trends();
    let _g = log.root_span().entered();
    match args.cmd {
        TrendsSub::Ls { user, category, since, limit } => ls_trends(pool, user, category, since, limit).await?,
    }
    Ok(())
}

async fn ls_trends(pool: &PgPool, user: Option<String>, category: Option<TrendCategory>, since: Option<String>, limit: i64) -> Result<()> {
    let log = telemetry::trends();
    if limit <= 0 { bail!("--limit must be positive"); }
    let since_ts = parse_since_opt(&since)?;

    let _s = log.span_kv(&TrendsPhase::List, [("user", format!("{:?}", user)), ("category", format!("{:?}", category))]).entered();
    let trends = db::list_trends(pool, user.as_deref(), category.map(|c| c.as_str()), since_ts, limit).await?;

    log.info(format!("📈 Trends ({}):", trends.len()));
    for t in &trends {
        log.info(format!("[{}] {} r/{} [{}] {} — {}", t.id, t.user_id, t.subreddit, t.category, t.title, t.description));
        for idea in &t.ideas { log.info(format!("     • {}", idea)); }
    }
    if telemetry::config::json_mode() {
        log.result(&TrendList { trends })?;
    }
    Ok(())
}
