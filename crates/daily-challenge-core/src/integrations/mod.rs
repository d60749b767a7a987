pub mod leetcode;
pub mod telegram;

pub use leetcode::{AcceptedSubmission, LeetCodeClient};
pub use telegram::{Chat, Message, TelegramClient, TgUser, Update};
