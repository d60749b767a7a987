//! Group and reply message text (Telegram Markdown).

use indoc::{formatdoc, indoc};

use crate::lifecycle::StatusReport;
use crate::models::{DailyChallenge, LeaderboardEntry, User};
use crate::reminder::Checkpoint;

pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /help to see available commands.";
pub const NO_CHALLENGE: &str = "❌ No challenge available for today yet.";
pub const ALREADY_SUBMITTED: &str = "✅ You have already submitted today's challenge!";
pub const ADMIN_ONLY: &str = "❌ This command can only be used in the main group.";
pub const STORE_ERROR: &str = "❌ Something went wrong, please try again in a moment.";

pub fn announcement(challenge: &DailyChallenge) -> String {
    formatdoc! {"
        🌅 **Daily LeetCode Challenge - Day {day}** 🌅
        📅 {date}

        📝 **{title}**
        🏷️ Category: {category}
        🔗 {url}

        💪 Ready to solve it? Use /submit when you're done!
        Good luck everyone! 🍀",
        day = challenge.day_number,
        date = challenge.date.long_format(),
        title = challenge.problem.title,
        category = challenge.problem.category,
        url = challenge.problem.url,
    }
}

pub fn reminder(checkpoint: Checkpoint, challenge: &DailyChallenge, pending: &[User]) -> String {
    let mentions: Vec<String> = pending.iter().map(User::mention).collect();
    formatdoc! {"
        {emoji} **{label} Reminder** {emoji}

        Hey {mentions}!

        Don't forget about today's LeetCode challenge (Day {day}):
        📝 **{title}**
        🔗 {url}

        Use /submit when you're done! ⚡",
        emoji = checkpoint.emoji(),
        label = checkpoint.label(),
        mentions = mentions.join(", "),
        day = challenge.day_number,
        title = challenge.problem.title,
        url = challenge.problem.url,
    }
}

pub fn submit_confirmation(challenge: &DailyChallenge) -> String {
    formatdoc! {"
        🎉 Great job! You've successfully submitted Day {day} challenge:

        📝 **{title}**
        🔗 {url}

        Keep up the good work! 💪",
        day = challenge.day_number,
        title = challenge.problem.title,
        url = challenge.problem.url,
    }
}

/// Group announcement for users credited by LeetCode verification.
pub fn verified(challenge: &DailyChallenge, users: &[User]) -> String {
    let names: Vec<String> = users.iter().map(User::mention).collect();
    format!(
        "✅ Verified on LeetCode: {} solved Day {} (**{}**)! 🎉",
        names.join(", "),
        challenge.day_number,
        challenge.problem.title
    )
}

pub fn leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.iter().all(|e| e.total_solved == 0) {
        return "📊 No submissions yet! Be the first to submit a challenge.".to_string();
    }

    let mut text = String::from("🏆 **LeetCode Challenge Leaderboard** 🏆\n\n");
    for (i, entry) in entries.iter().enumerate() {
        let rank = match i {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            _ => format!("{}.", i + 1),
        };
        text.push_str(&format!(
            "{rank} {} - {} solved\n",
            entry.user.display_name(),
            entry.total_solved
        ));
    }
    text.push_str("\n💪 Keep solving to climb the ranks!");
    text
}

pub fn status(report: &StatusReport) -> String {
    let challenge = match &report.challenge {
        Some(c) => format!("✅ Day {}: {}", c.day_number, c.problem.title),
        None => "❌ No challenge posted today".to_string(),
    };
    let leader = match &report.leader {
        Some(entry) => format!(
            "Top: {} ({} solved)",
            entry.user.first_name, entry.total_solved
        ),
        None => "No submissions yet".to_string(),
    };
    formatdoc! {"
        🤖 **Bot Status** 🤖

        📅 Date: {date}
        📊 Current Day Counter: {day}
        🎯 Today's Challenge: {challenge}
        📈 Leaderboard: {leader}
        📝 Submissions: {pending} users haven't submitted today
        📚 Problems left: {unused} of {total}",
        date = report.date.long_format(),
        day = report.current_day,
        challenge = challenge,
        leader = leader,
        pending = report.pending_count,
        unused = report.pool.unused,
        total = report.pool.total,
    }
}

pub fn reset_done(first_day: i64) -> String {
    format!("✅ Day counter reset successfully! Next challenge will be Day {first_day}.")
}

pub fn registered(leetcode_username: &str) -> String {
    format!(
        "🔗 Linked LeetCode account **{leetcode_username}**. Accepted solutions of the daily problem will be credited automatically."
    )
}

pub const REGISTER_USAGE: &str = "Usage: /register <leetcode_username>";

pub const HELP: &str = indoc! {"
    🤖 **LeetCode Challenge Bot Help**

    Available commands:
    • /submit - Submit today's challenge
    • /leaderboards - View the leaderboard
    • /status - Show bot status and current day info
    • /register <username> - Link your LeetCode account for automatic verification
    • /help - Show this help message

    **Admin Commands (Group only):**
    • /manual - Manually post daily challenge immediately
    • /testreminder - Test reminder functionality
    • /resetday - Reset day counter

    📅 **How it works:**
    - Every weekday morning I post a new LeetCode challenge
    - Use /submit to mark that you've completed it
    - Check /leaderboards to see who's solving the most problems
    - I'll remind you in the afternoon and evening if you haven't submitted yet
    - No challenges on weekends 🎉

    Happy coding! 💻✨"};
