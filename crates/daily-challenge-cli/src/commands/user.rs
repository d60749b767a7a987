use clap::Subcommand;
use daily_challenge_core::{DatabaseError, LeetCodeProfiles, User, UserDirectory};
use serde::Serialize;

use super::{load, print_json, CliResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Add or update a participant
    Add {
        /// Telegram user id
        id: i64,
        /// First name
        first_name: String,
        #[arg(long)]
        last_name: Option<String>,
        /// Telegram handle without the @
        #[arg(long)]
        username: Option<String>,
    },
    /// List participants
    List,
    /// Link a LeetCode account for automatic verification
    Link {
        /// Telegram user id
        id: i64,
        /// LeetCode username
        leetcode_username: String,
    },
}

#[derive(Serialize)]
struct UserRow {
    #[serde(flatten)]
    user: User,
    leetcode_username: Option<String>,
}

pub fn run(action: UserAction) -> CliResult {
    let (_, db) = load()?;
    let directory = UserDirectory::new(db.conn());

    match action {
        UserAction::Add {
            id,
            first_name,
            last_name,
            username,
        } => {
            let user = User::new(id, first_name)
                .with_last_name(last_name.unwrap_or_default())
                .with_username(username.unwrap_or_default());
            directory.upsert(&user)?;
            println!("saved user {}", user.display_name());
        }
        UserAction::List => {
            let profiles = LeetCodeProfiles::new(db.conn());
            let rows = directory
                .roster()?
                .into_iter()
                .map(|user| -> Result<UserRow, DatabaseError> {
                    let leetcode_username = profiles.get(user.id)?.map(|p| p.leetcode_username);
                    Ok(UserRow {
                        user,
                        leetcode_username,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&rows)?;
        }
        UserAction::Link {
            id,
            leetcode_username,
        } => {
            if directory.get(id)?.is_none() {
                return Err(format!("unknown user {id}; add it first").into());
            }
            LeetCodeProfiles::new(db.conn()).register(id, &leetcode_username)?;
            println!("linked {id} to LeetCode user {leetcode_username}");
        }
    }
    Ok(())
}
