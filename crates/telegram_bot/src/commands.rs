//! Slash commands understood by the bot.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub(crate) enum Command {
    #[command(description = "show this message")]
    Start,
    #[command(description = "record an expense")]
    NewExpense,
    #[command(description = "pick the display currency")]
    ChangeCurrency,
    #[command(description = "spending by category")]
    GetReport,
    #[command(description = "set a monthly spending limit")]
    SetLimit,
}

impl Command {
    /// `/cmd` or `/cmd@bot_name`. Words after the command are ignored.
    pub(crate) fn recognize(text: &str, bot_name: &str) -> Option<Self> {
        Self::parse(text.trim(), bot_name).ok()
    }
}
