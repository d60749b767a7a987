//! The bot daemon: Telegram long polling, the daily trigger loop and the
//! LeetCode sync loop, until Ctrl-C.
//!
//! All database work runs on the blocking pool with a freshly opened
//! [`Database`] per unit of work; messages are sent only after the work
//! has committed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use daily_challenge_core::integrations::{LeetCodeClient, TelegramClient};
use daily_challenge_core::storage::StorageConfig;
use daily_challenge_core::{
    messages, notify_best_effort, verify, AdminOrigins, Catalog, ChallengeDate, CommandContext,
    CommandHandler, Config, Database, DatabaseError, Inbound, LifecycleError,
    LifecycleOrchestrator, PostOutcome, Trigger, TriggerSchedule, User,
};
use tracing::{debug, error, info, warn};

use super::{catalog_path, CliResult};

const MAX_ATTEMPTS: u32 = 3;

struct Bot {
    config: Config,
    schedule: TriggerSchedule,
    ctx: CommandContext,
    admins: AdminOrigins,
    telegram: TelegramClient,
}

impl Bot {
    fn storage(&self) -> StorageConfig {
        self.config.storage.clone()
    }
}

/// Run `work` against a fresh connection on the blocking pool.
async fn with_db<T, F>(storage: StorageConfig, work: F) -> Result<T, LifecycleError>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T, LifecycleError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let db = Database::open(&storage)?;
        work(&db)
    })
    .await
    .map_err(|e| LifecycleError::StoreUnavailable(DatabaseError::QueryFailed(e.to_string())))?
}

/// [`with_db`] retried while the store reports lock contention.
async fn with_db_retry<T, F>(storage: StorageConfig, work: F) -> Result<T, LifecycleError>
where
    T: Send + 'static,
    F: Fn(&Database) -> Result<T, LifecycleError> + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let mut attempt = 1;
    loop {
        let w = Arc::clone(&work);
        match with_db(storage.clone(), move |db| (*w)(db)).await {
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                warn!(attempt, error = %e, "store busy, retrying");
                tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

pub fn run() -> CliResult {
    let config = Config::load()?;
    let token = Config::bot_token()?;
    if config.telegram.group_id == 0 {
        return Err("telegram.group_id is not configured (set TELEGRAM_GROUP_ID or config)".into());
    }

    let bot = Arc::new(Bot {
        schedule: TriggerSchedule::from_config(&config.schedule)?,
        ctx: CommandContext::from_config(&config)?,
        admins: AdminOrigins::new(config.admin_origins()),
        telegram: TelegramClient::new(&config.telegram.api_base, token),
        config,
    });

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(daemon(bot))
}

async fn daemon(bot: Arc<Bot>) -> CliResult {
    // Fail fast on an unusable database before starting the loops.
    with_db(bot.storage(), |_| Ok(())).await?;

    if bot.config.catalog.import_on_start {
        import_catalog(&bot).await;
    }

    let mut tasks = vec![
        tokio::spawn(poll_loop(Arc::clone(&bot))),
        tokio::spawn(trigger_loop(Arc::clone(&bot))),
    ];
    if bot.config.leetcode.enabled {
        tasks.push(tokio::spawn(sync_loop(Arc::clone(&bot))));
    }
    info!(group = bot.config.telegram.group_id, "bot started");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    for task in tasks {
        task.abort();
    }
    Ok(())
}

async fn import_catalog(bot: &Bot) {
    let path = catalog_path(&bot.config.catalog.problems_file);
    if !path.exists() {
        warn!(path = %path.display(), "problem catalog not found; skipping import");
        return;
    }
    let result = tokio::task::spawn_blocking({
        let storage = bot.storage();
        move || -> Result<_, Box<dyn std::error::Error + Send + Sync>> {
            let catalog = Catalog::load(&path)?;
            let db = Database::open(&storage)?;
            Ok(catalog.import(db.conn())?)
        }
    })
    .await;
    match result {
        Ok(Ok(summary)) => debug!(?summary, "catalog import finished"),
        Ok(Err(e)) => warn!(error = %e, "catalog import failed"),
        Err(e) => warn!(error = %e, "catalog import task failed"),
    }
}

async fn poll_loop(bot: Arc<Bot>) {
    let mut offset = 0;
    loop {
        let updates = match bot
            .telegram
            .get_updates(offset, bot.config.telegram.poll_timeout_secs)
            .await
        {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else { continue };
            let (Some(from), Some(text)) = (message.from, message.text) else {
                continue;
            };
            if from.is_bot {
                continue;
            }
            let inbound = Inbound {
                sender: User::from(&from),
                chat_id: message.chat.id,
                text,
            };
            handle_message(&bot, inbound).await;
        }
    }
}

async fn handle_message(bot: &Bot, inbound: Inbound) {
    let admins = bot.admins.clone();
    let ctx = bot.ctx;
    let replies = with_db(bot.storage(), move |db| {
        Ok(CommandHandler::new(db, &admins, ctx).handle(&inbound, Utc::now()))
    })
    .await;

    match replies {
        Ok(replies) => {
            for reply in replies {
                notify_best_effort(&bot.telegram, reply.chat_id, &reply.text).await;
            }
        }
        Err(e) => error!(error = %e, "could not handle message"),
    }
}

async fn trigger_loop(bot: Arc<Bot>) {
    loop {
        let now = Utc::now();
        let Some((at, trigger)) = bot.schedule.next_after(now) else {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            continue;
        };
        let wait = (at.with_timezone(&Utc) - now).to_std().unwrap_or_default();
        info!(at = %at, ?trigger, "next trigger");
        tokio::time::sleep(wait).await;

        let date = ChallengeDate::of(&at);
        match trigger {
            Trigger::PostChallenge => post_challenge(&bot, date).await,
            Trigger::Reminder(checkpoint) => {
                let result = with_db_retry(bot.storage(), move |db| {
                    let deny = |_: i64| false;
                    LifecycleOrchestrator::new(db, &deny).compute_reminder_targets(date)
                })
                .await;
                match result {
                    Ok(targets) if targets.non_responders.is_empty() => {
                        info!(%date, "everyone has submitted");
                    }
                    Ok(targets) => {
                        let text = messages::reminder(
                            checkpoint,
                            &targets.challenge,
                            &targets.non_responders,
                        );
                        notify_best_effort(&bot.telegram, bot.config.telegram.group_id, &text)
                            .await;
                        info!(%date, users = targets.non_responders.len(), "sent reminder");
                    }
                    Err(LifecycleError::NoChallengeToday { .. }) => {
                        warn!(%date, "no challenge posted; skipping reminder");
                    }
                    Err(e) => error!(%date, error = %e, "reminder failed"),
                }
            }
        }
    }
}

async fn post_challenge(bot: &Bot, date: ChallengeDate) {
    let result = with_db_retry(bot.storage(), move |db| {
        let deny = |_: i64| false;
        LifecycleOrchestrator::new(db, &deny).post_daily_challenge(date)
    })
    .await;

    match result {
        Ok(PostOutcome::Posted(challenge)) => {
            notify_best_effort(
                &bot.telegram,
                bot.config.telegram.group_id,
                &messages::announcement(&challenge),
            )
            .await;
        }
        Ok(PostOutcome::AlreadyPosted(challenge)) => {
            info!(%date, day = challenge.day_number, "challenge already posted");
        }
        Err(LifecycleError::PoolExhausted) => {
            error!(%date, "problem pool exhausted; import more problems");
        }
        Err(e) => error!(%date, error = %e, "posting failed"),
    }
}

async fn sync_loop(bot: Arc<Bot>) {
    let leetcode = LeetCodeClient::new(&bot.config.leetcode.graphql_url);
    let offset = bot.schedule.offset();
    let mut interval = tokio::time::interval(Duration::from_secs(
        bot.config.schedule.sync_interval_min * 60,
    ));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let date = ChallengeDate::today_in(offset);
        if !bot.schedule.fires_on(date) {
            continue;
        }

        let plan = match with_db(bot.storage(), move |db| verify::plan(db, date)).await {
            Ok(Some(plan)) if !plan.candidates.is_empty() => plan,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "LeetCode sync skipped");
                continue;
            }
        };

        let solvers =
            verify::find_solvers(&leetcode, &plan, offset, bot.config.leetcode.recent_limit).await;
        if solvers.is_empty() {
            continue;
        }

        let challenge = plan.challenge;
        match with_db_retry(bot.storage(), move |db| verify::credit(db, date, &solvers)).await {
            Ok(credited) if !credited.is_empty() => {
                info!(%date, users = credited.len(), "credited LeetCode solvers");
                notify_best_effort(
                    &bot.telegram,
                    bot.config.telegram.group_id,
                    &messages::verified(&challenge, &credited),
                )
                .await;
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "crediting LeetCode solvers failed"),
        }
    }
}
