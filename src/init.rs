use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use sqlx::PgPool;

use crate::telemetry::{self};
use crate::telemetry::ops::init::Phase as InitPhase;

#[derive(Args)]
pub struct InitCmd {
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

#[derive(Serialize)]
struct InitPlan {
    migrations: Vec<MigrationInfo>,
}

#[derive(Serialize)]
struct MigrationInfo {
    version: i64,
    description: String,
}

#[derive(Serialize)]
struct InitResult {
    migrations: usize,
}

pub async fn run(pool: &PgPool, args: InitCmd) -> Result<()> {
    let log = telemetry::init();
    let _g = log.root_span_kv([("apply", args.apply.to_string())]).entered();
    let migrator = sqlx::migrate!();

    if !args.apply {
        let _s = log.span(&InitPhase::Plan).entered();
        let migrations: Vec<MigrationInfo> = migrator
            .iter()
            .map(|m| MigrationInfo { version: m.version, description: m.description.to_string() })
            .collect();
        log.info(format!("📝 Init plan — {} migration(s) known", migrations.len()));
        for m in &migrations { log.info(format!("  {} {}", m.version, m.description)); }
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&InitPlan { migrations })?;
        }
        return Ok(());
    }

    let _s = log.span(&InitPhase::Migrate).entered();
    // Apply any pending migrations (idempotent)
    migrator.run(pool).await.context("running migrations")?;
    log.info("✅ Database initialized successfully");
    if telemetry::config::json_mode() {
        log.result(&InitResult { migrations: migrator.iter().count() })?;
    }
    Ok(())
}
