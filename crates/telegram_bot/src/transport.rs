//! Outbound port towards the chat transport.
//!
//! The handlers only talk to [`Transport`]; `TeloxideTransport` is the
//! Telegram implementation and tests plug in a recording one.

use async_trait::async_trait;
use engine::{Currency, UserId};

use crate::{callbacks, event::MessageId};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),
}

/// The fixed keyboards the bot can attach to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Change sum / category / date, done, cancel.
    EditExpense,
    /// Week / month / year.
    ReportRange,
    /// One button per supported currency.
    Currency,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    fn new(label: &str, data: &str) -> Self {
        Self {
            label: label.to_string(),
            data: data.to_string(),
        }
    }
}

impl Keyboard {
    /// One button per row.
    pub fn rows(self) -> Vec<Vec<Button>> {
        let buttons = match self {
            Keyboard::EditExpense => vec![
                Button::new("Change sum", callbacks::CHANGE_EXPENSE_SUM),
                Button::new("Change category", callbacks::CHANGE_EXPENSE_CATEGORY),
                Button::new("Change date", callbacks::CHANGE_EXPENSE_DATE),
                Button::new("Done", callbacks::CHANGE_EXPENSE_DONE),
                Button::new("Cancel", callbacks::CHANGE_EXPENSE_CANCEL),
            ],
            Keyboard::ReportRange => vec![
                Button::new("Week", callbacks::GET_WEEK_REPORT),
                Button::new("Month", callbacks::GET_MONTH_REPORT),
                Button::new("Year", callbacks::GET_YEAR_REPORT),
            ],
            Keyboard::Currency => Currency::ALL
                .iter()
                .map(|c| Button::new(c.code(), c.code()))
                .collect(),
        };
        buttons.into_iter().map(|b| vec![b]).collect()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, user_id: UserId, text: &str) -> Result<MessageId, TransportError>;

    async fn send_keyboard(
        &self,
        user_id: UserId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<MessageId, TransportError>;

    async fn edit_text(
        &self,
        user_id: UserId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), TransportError>;

    async fn edit_text_with_keyboard(
        &self,
        user_id: UserId,
        message_id: MessageId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<(), TransportError>;

    async fn delete_message(
        &self,
        user_id: UserId,
        message_id: MessageId,
    ) -> Result<(), TransportError>;

    /// Acknowledges a button tap, optionally with an ephemeral alert.
    async fn answer_callback(
        &self,
        callback_id: &str,
        alert: Option<&str>,
    ) -> Result<(), TransportError>;
}
