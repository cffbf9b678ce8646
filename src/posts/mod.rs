use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use sqlx::PgPool;

use crate::store::types::ItemRow;
use crate::subs::parse_subreddit_arg;
use crate::telemetry::{self};
use crate::telemetry::ops::posts::Phase as PostsPhase;
use crate::util::time::parse_since_opt;

mod db;

/// nichetrack posts ls
#[derive(Args)]
pub struct PostsCmd {
    #[command(subcommand)]
    pub cmd: PostsSub,
}

#[derive(Subcommand)]
pub enum PostsSub {
    // a user's feed, newest first
    Ls {
        user: String,
        /// Only posts created since (e.g. 1d, 12h, 2024-06-01)
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        subreddit: Option<String>,
        #[arg(long, default_value_t = 30)]
        limit: i64,
    },
}

#[derive(Serialize)]
struct PostList {
    user_id: String,
    posts: Vec<ItemRow>,
}

pub async fn run(pool: &PgPool, args: PostsCmd) -> Result<()> {
    let log = telemetry::posts();
    let _g = log.root_span().entered();
    match args.cmd {
        PostsSub::Ls { user, since, subreddit, limit } => ls_posts(pool, user, since, subreddit, limit).await?,
    }
    Ok(())
}

async fn ls_posts(pool: &PgPool, user: String, since: Option<String>, subreddit: Option<String>, limit: i64) -> Result<()> {
    let log = telemetry::posts();
    if limit <= 0 { bail!("--limit must be positive"); }
    let since_ts = parse_since_opt(&since)?;
    let subreddit = subreddit.as_deref().map(parse_subreddit_arg).transpose()?;

    let _s = log.span_kv(&PostsPhase::List, [("user", user.clone()), ("since", format!("{:?}", since)), ("limit", limit.to_string())]).entered();
    let posts = db::list_posts(pool, &user, subreddit.as_deref(), since_ts, limit).await?;

    log.info(format!("📰 Feed for {} ({} posts):", user, posts.len()));
    for p in &posts {
        log.info(format!("[{}] r/{} {} — score={} comments={} created={}", p.id, p.subreddit, p.title, p.score, p.num_comments, p.created_utc));
        match &p.summary {
            Some(s) => log.info(format!("     {}", s)),
            None => log.debug("     (no summary)"),
        }
    }
    if telemetry::config::json_mode() {
        log.result(&PostList { user_id: user, posts })?;
    }
    Ok(())
}
