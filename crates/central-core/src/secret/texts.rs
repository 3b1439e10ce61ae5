//! User-facing bot texts.

use crate::domain::UserId;

pub const START_MESSAGE: &str = "Welcome to Central Service Telegram Bot!

If you want to use secret messaging feature, you have to register first. Just type \"/register\" and sent that to me.
After you are registered, you can then start secretly messaging with the person you want!

To start secret messaging feature, all you have to do is type <strong>/secret [user-id]</strong>. The 'user-id' is the ID of the person you want to start secret messaging with.
";

pub const UNKNOWN_COMMAND: &str = "Sorry, the command / text is not known";

pub const BOT_PROBLEM: &str = "Sorry, bot experiencing problem. Please try again later";
pub const BOT_UNEXPECTED_ERROR: &str = "Sorry, bot experiencing unexpected error. Please try again later";

pub const BOT_NOT_ALLOWED: &str = "sorry, user with status 'bot' is not allowed to register";
pub const ALREADY_REGISTERED: &str = "user already registered";
pub const REGISTER_SUCCESS: &str = "Success! Bot will send your text and you can share it to people to secretly have a chat with you through this bot.";

pub const MISSING_USER_ID: &str = "please provide the user ID, for example: /secret 123456789";
pub const INVALID_USER_ID: &str = "invalid user ID. please make sure the ID is correct";
pub const SELF_TARGET: &str = "you can't use this feature to yourself";
pub const SENDER_NOT_REGISTERED: &str = "To use this feature, you must register first. Just use \"/register\" command.";
pub const INITIATE_BLOCKED: &str = "Sorry, this user has blocked you. You can't start secret messaging with them for now";

pub const SESSION_NOT_FOUND: &str = "Sorry, your secret messaging session is not found. Please initiate the session first";
pub const SESSION_BLOCKED: &str = "Sorry, your secret messaging session is blocked. You can't send message to this user anymore";
pub const SESSION_EXPIRED: &str = "Sorry, your secret messaging session is expired. Please re-initiate the session again";
pub const NOT_A_PARTY: &str = "Sorry, you are not part of this secret messaging session";
pub const TARGET_NOT_REGISTERED: &str = "bot couldn't find the user target of your secret message. Maybe you should invite them first?";

pub const REPORT_SENT: &str = "Report has been sent. Sorry for the inconvinience and Bot Admin will investigate it as soon as possible";
pub const REPORT_FAILED: &str = "Sorry, bot experiencing unexpected error and unable to report the message. Please try again later";

pub const BLOCK_SUCCESS: &str = "User has been blocked and can't send you secret message anymore";
pub const BLOCK_DATA_NOT_FOUND: &str = "Failed to block user because the data is not found";
pub const BLOCK_NOT_TARGET: &str = "Only the receiver of the secret messages can block this session";

pub const REPORT_BUTTON: &str = "Report";
pub const BLOCK_BUTTON: &str = "Block";

/// Framing for messages delivered to the target.
pub fn secret_message(text: &str) -> String {
    format!("<strong>Someone secretly said</strong>: {}", escape_html(text))
}

/// Framing for the target's replies delivered back to the initiator.
pub fn replied_secret_message(text: &str, replier_name: &str) -> String {
    format!(
        "<strong>{} replies</strong>: {}",
        escape_html(replier_name),
        escape_html(text)
    )
}

/// Escapes what the Bot API HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn target_not_found(target_id: UserId) -> String {
    format!("User with ID: {target_id} is not found. Please ask them to register this feature first.")
}

pub fn session_started(target_name: &str) -> String {
    format!(
        "Success! Secret messaging session from you to {target_name} is now active. To send your message secretly, you must reply to this message and after that, bot will forward it secretly to {target_name}. Enjoy!"
    )
}

pub fn share_invitation(first_name: &str, start_link: &str, user_id: UserId) -> String {
    format!(
        "Hello, I'm {first_name}. If you want to secretly have chat with me in Telegram without me knowing who you are, you can register from this bot: {start_link} and my code is: {user_id}. Can't wait to have chat with you!"
    )
}

pub fn unable_to_register(reason: &str) -> String {
    format!("sorry, you're unable to register. reason: {reason}")
}

pub fn problem(reason: &str) -> String {
    format!("Sorry there is a problem: {reason}")
}
