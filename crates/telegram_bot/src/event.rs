//! Transport-neutral inbound events.

use engine::UserId;

/// Identifier of a chat message, as handed out by the transport.
pub type MessageId = i32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlainMessage {
    pub text: String,
    pub user_id: UserId,
    pub message_id: MessageId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackEvent {
    pub data: String,
    pub user_id: UserId,
    /// Message carrying the tapped keyboard.
    pub origin_message_id: MessageId,
    pub callback_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    Message(PlainMessage),
    Callback(CallbackEvent),
}

impl InboundEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Message(msg) => msg.user_id,
            Self::Callback(cb) => cb.user_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Callback(_) => "callback",
        }
    }
}
