//! [`Transport`] over the Telegram Bot API.
//!
//! Replies go to the private chat of the user, whose chat id equals the user id.

use async_trait::async_trait;
use engine::UserId;
use teloxide::{
    prelude::*,
    types::{CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId},
};

use crate::{
    event,
    transport::{Keyboard, Transport, TransportError},
};

#[derive(Clone)]
pub struct TeloxideTransport {
    bot: Bot,
}

impl TeloxideTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows().into_iter().map(|row| {
        row.into_iter()
            .map(|b| InlineKeyboardButton::callback(b.label, b.data))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl Transport for TeloxideTransport {
    async fn send_text(
        &self,
        user_id: UserId,
        text: &str,
    ) -> Result<event::MessageId, TransportError> {
        let sent = self.bot.send_message(ChatId(user_id), text).await?;
        Ok(sent.id.0)
    }

    async fn send_keyboard(
        &self,
        user_id: UserId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<event::MessageId, TransportError> {
        let sent = self
            .bot
            .send_message(ChatId(user_id), text)
            .reply_markup(markup(keyboard))
            .await?;
        Ok(sent.id.0)
    }

    async fn edit_text(
        &self,
        user_id: UserId,
        message_id: event::MessageId,
        text: &str,
    ) -> Result<(), TransportError> {
        self.bot
            .edit_message_text(ChatId(user_id), MessageId(message_id), text)
            .await?;
        Ok(())
    }

    async fn edit_text_with_keyboard(
        &self,
        user_id: UserId,
        message_id: event::MessageId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<(), TransportError> {
        self.bot
            .edit_message_text(ChatId(user_id), MessageId(message_id), text)
            .reply_markup(markup(keyboard))
            .await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        user_id: UserId,
        message_id: event::MessageId,
    ) -> Result<(), TransportError> {
        self.bot
            .delete_message(ChatId(user_id), MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        alert: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = alert {
            request = request.text(text).show_alert(true);
        }
        request.await?;
        Ok(())
    }
}
