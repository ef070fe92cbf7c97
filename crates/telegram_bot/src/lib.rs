//! Telegram bot.
//!
//! Telegram updates are turned into [`InboundEvent`]s and handed to the
//! [`Dispatcher`], which drives the interaction state machine. Everything the
//! bot persists goes through the engine.

use std::{sync::Arc, time::Duration};

use engine::{CurrencyResolver, Engine, ReportAggregator};
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use callbacks::CallbackAction;
pub use dispatch::{DispatchStats, Dispatcher};
pub use event::{CallbackEvent, InboundEvent, MessageId, PlainMessage};
pub use handlers::{Assistant, HandlerError};
pub use telegram::TeloxideTransport;
pub use transport::{Button, Keyboard, Transport, TransportError};

pub mod callbacks;
mod commands;
mod dispatch;
mod event;
mod handlers;
mod parsing;
mod telegram;
mod transport;
mod ui;

const INBOUND_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("missing bot dependency: {0}")]
    Missing(&'static str),
    #[error("telegram token is empty")]
    EmptyToken,
}

pub struct Bot {
    token: String,
    lanes: usize,
    event_timeout: Duration,
    engine: Arc<Engine>,
    resolver: Arc<CurrencyResolver>,
    reports: Arc<ReportAggregator>,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    /// Polls Telegram until `shutdown` fires, then waits for the events in
    /// flight.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!("Starting telegram bot...");

        let bot = teloxide::Bot::new(&self.token);
        let bot_name = match bot.get_me().await {
            Ok(me) => me.user.username.clone().unwrap_or_default(),
            Err(err) => {
                tracing::warn!("could not fetch the bot username: {err}");
                String::new()
            }
        };
        let transport = Arc::new(TeloxideTransport::new(bot.clone()));
        let assistant = Arc::new(
            Assistant::new(self.engine, self.resolver, self.reports, transport)
                .with_bot_name(&bot_name),
        );

        let (inbound, events) = mpsc::channel(INBOUND_CAPACITY);
        let dispatcher = Dispatcher::new(assistant)
            .with_lanes(self.lanes)
            .with_event_timeout(self.event_timeout);
        let dispatching = tokio::spawn(dispatcher.run(events, shutdown.clone()));

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(forward_message))
            .branch(Update::filter_callback_query().endpoint(forward_callback));

        let mut polling = teloxide::dispatching::Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![inbound])
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.kind);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .build();

        let polling_token = polling.shutdown_token();
        let stopper = tokio::spawn(async move {
            shutdown.cancelled().await;
            // Shutting down before polling started is refused; retry until it runs.
            loop {
                match polling_token.shutdown() {
                    Ok(stopped) => {
                        stopped.await;
                        break;
                    }
                    Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
                }
            }
        });

        polling.dispatch().await;
        stopper.abort();
        // Dropping the polling dispatcher closes the inbound channel.
        drop(polling);

        if let Err(err) = dispatching.await {
            tracing::error!("dispatcher task failed: {err}");
        }
        tracing::info!("telegram bot stopped");
    }
}

async fn forward_message(
    msg: Message,
    inbound: mpsc::Sender<InboundEvent>,
) -> ResponseResult<()> {
    let (Some(text), Some(from)) = (msg.text(), msg.from.as_ref()) else {
        return Ok(());
    };
    let Ok(user_id) = i64::try_from(from.id.0) else {
        tracing::warn!(id = from.id.0, "user id out of range");
        return Ok(());
    };

    let event = InboundEvent::Message(PlainMessage {
        text: text.to_string(),
        user_id,
        message_id: msg.id.0,
    });
    if inbound.send(event).await.is_err() {
        tracing::warn!(user_id, "dispatcher stopped, message dropped");
    }
    Ok(())
}

async fn forward_callback(
    q: CallbackQuery,
    inbound: mpsc::Sender<InboundEvent>,
) -> ResponseResult<()> {
    let (Some(data), Some(origin)) = (q.data.as_ref(), q.message.as_ref()) else {
        return Ok(());
    };
    let Ok(user_id) = i64::try_from(q.from.id.0) else {
        tracing::warn!(id = q.from.id.0, "user id out of range");
        return Ok(());
    };

    let event = InboundEvent::Callback(CallbackEvent {
        data: data.clone(),
        user_id,
        origin_message_id: origin.id().0,
        callback_id: q.id.0.clone(),
    });
    if inbound.send(event).await.is_err() {
        tracing::warn!(user_id, "dispatcher stopped, callback dropped");
    }
    Ok(())
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    lanes: Option<usize>,
    event_timeout: Option<Duration>,
    engine: Option<Arc<Engine>>,
    resolver: Option<Arc<CurrencyResolver>>,
    reports: Option<Arc<ReportAggregator>>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    pub fn lanes(mut self, lanes: usize) -> BotBuilder {
        self.lanes = Some(lanes);
        self
    }

    pub fn event_timeout(mut self, timeout: Duration) -> BotBuilder {
        self.event_timeout = Some(timeout);
        self
    }

    pub fn engine(mut self, engine: Arc<Engine>) -> BotBuilder {
        self.engine = Some(engine);
        self
    }

    pub fn resolver(mut self, resolver: Arc<CurrencyResolver>) -> BotBuilder {
        self.resolver = Some(resolver);
        self
    }

    pub fn reports(mut self, reports: Arc<ReportAggregator>) -> BotBuilder {
        self.reports = Some(reports);
        self
    }

    pub fn build(self) -> Result<Bot, BotError> {
        tracing::info!("Initializing telegram bot...");
        if self.token.trim().is_empty() {
            return Err(BotError::EmptyToken);
        }
        Ok(Bot {
            token: self.token,
            lanes: self.lanes.unwrap_or(1),
            event_timeout: self.event_timeout.unwrap_or(Duration::from_secs(10)),
            engine: self.engine.ok_or(BotError::Missing("engine"))?,
            resolver: self.resolver.ok_or(BotError::Missing("resolver"))?,
            reports: self.reports.ok_or(BotError::Missing("reports"))?,
        })
    }
}
