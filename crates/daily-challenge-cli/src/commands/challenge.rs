use chrono::{Timelike, Utc};
use clap::Args;
use daily_challenge_core::integrations::TelegramClient;
use daily_challenge_core::messages;
use daily_challenge_core::storage::parse_clock_time;
use daily_challenge_core::{
    Checkpoint, Config, LifecycleOrchestrator, Notifier, PostOutcome, FIRST_DAY,
};

use super::{load, operator, print_json, resolve_date, CliResult, OPERATOR};

#[derive(Args)]
pub struct PostArgs {
    /// Date as YYYY-MM-DD (defaults to today in schedule.utc_offset)
    #[arg(long)]
    date: Option<String>,
    /// Also announce a newly posted challenge to the Telegram group
    #[arg(long)]
    send: bool,
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Telegram user id
    user_id: i64,
    /// Date as YYYY-MM-DD (defaults to today in schedule.utc_offset)
    #[arg(long)]
    date: Option<String>,
}

#[derive(Args)]
pub struct RemindArgs {
    /// Date as YYYY-MM-DD (defaults to today in schedule.utc_offset)
    #[arg(long)]
    date: Option<String>,
    /// Send the reminder to the Telegram group instead of only printing targets
    #[arg(long)]
    send: bool,
}

fn send_to_group(config: &Config, text: &str) -> CliResult {
    if config.telegram.group_id == 0 {
        return Err("telegram.group_id is not configured".into());
    }
    let client = TelegramClient::new(&config.telegram.api_base, Config::bot_token()?);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(client.send(config.telegram.group_id, text))?;
    Ok(())
}

pub fn post(args: PostArgs) -> CliResult {
    let (config, db) = load()?;
    let date = resolve_date(args.date.as_deref(), &config)?;
    let lifecycle = LifecycleOrchestrator::new(&db, &operator);
    let outcome = lifecycle.post_manual(OPERATOR, date)?;

    print_json(&outcome)?;
    if let PostOutcome::Posted(challenge) = &outcome {
        eprintln!(
            "posted Day {} for {}: {}",
            challenge.day_number, challenge.date, challenge.problem.title
        );
        if args.send {
            send_to_group(&config, &messages::announcement(challenge))?;
        }
    } else {
        eprintln!("{date} already has a challenge");
    }
    Ok(())
}

pub fn submit(args: SubmitArgs) -> CliResult {
    let (config, db) = load()?;
    let date = resolve_date(args.date.as_deref(), &config)?;
    let lifecycle = LifecycleOrchestrator::new(&db, &operator);
    let outcome = lifecycle.submit(args.user_id, date)?;
    print_json(&outcome)
}

pub fn remind(args: RemindArgs) -> CliResult {
    let (config, db) = load()?;
    let date = resolve_date(args.date.as_deref(), &config)?;
    let lifecycle = LifecycleOrchestrator::new(&db, &operator);
    let targets = lifecycle.compute_reminder_targets(date)?;
    print_json(&targets)?;

    if args.send {
        if targets.non_responders.is_empty() {
            eprintln!("everyone has submitted; nothing sent");
            return Ok(());
        }
        let afternoon = parse_clock_time(
            "schedule.afternoon_reminder_at",
            &config.schedule.afternoon_reminder_at,
        )?;
        let hour = Utc::now().with_timezone(&config.utc_offset()?).hour();
        let checkpoint = Checkpoint::for_hour(hour, afternoon.hour());
        let text = messages::reminder(checkpoint, &targets.challenge, &targets.non_responders);
        send_to_group(&config, &text)?;
        eprintln!("reminded {} users", targets.non_responders.len());
    }
    Ok(())
}

pub fn leaderboard(limit: Option<usize>) -> CliResult {
    let (config, db) = load()?;
    let lifecycle = LifecycleOrchestrator::new(&db, &operator);
    let entries = lifecycle.leaderboard(limit.unwrap_or(config.leaderboard.limit))?;
    print_json(&entries)
}

pub fn status(date: Option<String>) -> CliResult {
    let (config, db) = load()?;
    let date = resolve_date(date.as_deref(), &config)?;
    let lifecycle = LifecycleOrchestrator::new(&db, &operator);
    print_json(&lifecycle.status(date)?)
}

pub fn reset() -> CliResult {
    let (_, db) = load()?;
    let lifecycle = LifecycleOrchestrator::new(&db, &operator);
    lifecycle.reset_cycle(OPERATOR)?;
    println!("day counter reset; next challenge will be Day {FIRST_DAY}");
    Ok(())
}
