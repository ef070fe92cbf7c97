//! Interaction state machine.
//!
//! A plain message is either a command or the answer to the edit the user
//! started last; a callback is a button tap on one of the fixed keyboards.
//! The per-user state lives in the engine, so a handler holds nothing
//! between events.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use engine::{
    CurrencyResolver, Engine, EngineError, Expense, ExpenseId, InteractionState, Money,
    ReportAggregator, UserId,
};

use crate::{
    callbacks::CallbackAction,
    commands::Command,
    event::{CallbackEvent, InboundEvent, PlainMessage},
    parsing,
    transport::{Keyboard, Transport, TransportError},
    ui,
};

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no handler for callback data {0:?}")]
    UnknownCallback(String),
    #[error("event of user {user_id} did not finish within {timeout:?}")]
    Timeout { user_id: UserId, timeout: Duration },
}

/// One parsed answer to an edit prompt.
enum FieldWrite {
    /// Display-currency hundredths as parsed, base minor units once converted.
    Sum(Money),
    Category(String),
    Date(DateTime<Utc>),
}

pub struct Assistant {
    engine: Arc<Engine>,
    resolver: Arc<CurrencyResolver>,
    reports: Arc<ReportAggregator>,
    transport: Arc<dyn Transport>,
    bot_name: String,
}

impl Assistant {
    pub fn new(
        engine: Arc<Engine>,
        resolver: Arc<CurrencyResolver>,
        reports: Arc<ReportAggregator>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            engine,
            resolver,
            reports,
            transport,
            bot_name: String::new(),
        }
    }

    /// Username accepted in the `/cmd@bot_name` form.
    pub fn with_bot_name(mut self, bot_name: &str) -> Self {
        self.bot_name = bot_name.to_string();
        self
    }

    pub async fn handle(&self, event: InboundEvent) -> Result<(), HandlerError> {
        match event {
            InboundEvent::Message(msg) => self.handle_message(msg).await,
            InboundEvent::Callback(cb) => self.handle_callback(cb).await,
        }
    }

    async fn handle_message(&self, msg: PlainMessage) -> Result<(), HandlerError> {
        if let Some(command) = Command::recognize(&msg.text, &self.bot_name) {
            return self.run_command(command, &msg).await;
        }

        match self.engine.interaction_state(msg.user_id).await? {
            InteractionState::EditingSum(id) => {
                let field = parsing::parse_sum(&msg.text).map(FieldWrite::Sum);
                self.answer_edit(&msg, id, field).await
            }
            InteractionState::EditingCategory(id) => {
                let field = parsing::parse_category(&msg.text).map(FieldWrite::Category);
                self.answer_edit(&msg, id, field).await
            }
            InteractionState::EditingDate(id) => {
                let field = parsing::parse_date(&msg.text).map(FieldWrite::Date);
                self.answer_edit(&msg, id, field).await
            }
            InteractionState::EditingLimit => self.answer_limit(&msg).await,
            InteractionState::Idle => {
                self.transport
                    .send_text(msg.user_id, ui::FALLBACK_TEXT)
                    .await?;
                Ok(())
            }
        }
    }

    async fn run_command(&self, command: Command, msg: &PlainMessage) -> Result<(), HandlerError> {
        let user_id = msg.user_id;
        tracing::debug!(user_id, ?command, "command");

        match command {
            Command::Start => {
                self.transport
                    .send_text(user_id, &ui::render_start())
                    .await?;
            }
            Command::NewExpense => {
                // Nothing is stored until the first field is written.
                let now = Utc::now();
                let draft = Expense::placeholder(user_id, 0, now);
                let currency = self.engine.display_currency(user_id).await?;
                let rate = self
                    .resolver
                    .resolve_rate(currency, self.resolver.today(now))
                    .await?;
                let text = ui::render_expense(&draft, currency, rate)?;
                self.transport
                    .send_keyboard(user_id, &text, Keyboard::EditExpense)
                    .await?;
            }
            Command::ChangeCurrency => {
                self.transport
                    .send_keyboard(user_id, ui::CURRENCY_PROMPT, Keyboard::Currency)
                    .await?;
            }
            Command::GetReport => {
                self.transport
                    .send_keyboard(user_id, ui::REPORT_PROMPT, Keyboard::ReportRange)
                    .await?;
            }
            Command::SetLimit => {
                self.engine
                    .set_interaction_state(user_id, InteractionState::EditingLimit)
                    .await?;
                self.transport.send_text(user_id, ui::LIMIT_PROMPT).await?;
            }
        }
        Ok(())
    }

    /// Applies one answer to the expense anchored at `expense_id`.
    ///
    /// An unusable answer is dropped: nothing is written, the user goes back
    /// to idle and gets no reply.
    async fn answer_edit(
        &self,
        msg: &PlainMessage,
        expense_id: ExpenseId,
        field: Result<FieldWrite, parsing::ParseError>,
    ) -> Result<(), HandlerError> {
        let user_id = msg.user_id;
        let field = match field {
            Ok(field) => field,
            Err(err) => return self.drop_answer(user_id, expense_id, &err).await,
        };

        let now = Utc::now();
        let currency = self.engine.display_currency(user_id).await?;

        // Convert before the row exists so a rejected sum leaves no trace.
        let field = match field {
            FieldWrite::Sum(display) => {
                let date = self
                    .engine
                    .expense(user_id, expense_id)
                    .await?
                    .map_or(now, |expense| expense.date);
                let rate = self
                    .resolver
                    .resolve_rate(currency, self.resolver.rate_date_for(date, now))
                    .await?;
                match Money::from_display(display, rate) {
                    Ok(sum) => FieldWrite::Sum(sum),
                    Err(EngineError::InvalidInput(reason)) => {
                        return self.drop_answer(user_id, expense_id, &reason).await;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            other => other,
        };

        let mut expense = self.engine.ensure_expense(user_id, expense_id, now).await?;
        let wrote_sum = matches!(field, FieldWrite::Sum(_));
        match field {
            FieldWrite::Sum(sum) => {
                self.engine.write_sum(user_id, expense_id, sum).await?;
                expense.sum = sum;
            }
            FieldWrite::Category(category) => {
                self.engine
                    .write_category(user_id, expense_id, &category)
                    .await?;
                expense.category = category;
            }
            FieldWrite::Date(date) => {
                self.engine.write_date(user_id, expense_id, date).await?;
                expense.date = date;
            }
        }
        self.reports.ledger_written(user_id).await?;
        self.engine
            .set_interaction_state(user_id, InteractionState::Idle)
            .await?;

        if wrote_sum {
            let check = self
                .engine
                .check_monthly_limit(user_id, expense.date)
                .await?;
            if check.exceeded() {
                self.transport
                    .send_text(user_id, &ui::render_limit_warning(&check))
                    .await?;
            }
        }

        self.transport
            .delete_message(user_id, msg.message_id)
            .await?;

        let rate_date = self.resolver.rate_date_for(expense.date, now);
        let rate = self.resolver.resolve_rate(currency, rate_date).await?;
        let text = ui::render_expense(&expense, currency, rate)?;
        self.transport
            .edit_text_with_keyboard(user_id, expense_id, &text, Keyboard::EditExpense)
            .await?;
        Ok(())
    }

    async fn drop_answer(
        &self,
        user_id: UserId,
        expense_id: ExpenseId,
        reason: &(dyn std::fmt::Display + Sync),
    ) -> Result<(), HandlerError> {
        tracing::warn!(user_id, expense_id, "dropping edit answer: {reason}");
        self.engine
            .set_interaction_state(user_id, InteractionState::Idle)
            .await?;
        Ok(())
    }

    /// Limit answers, unlike field edits, report validation failures.
    async fn answer_limit(&self, msg: &PlainMessage) -> Result<(), HandlerError> {
        let user_id = msg.user_id;
        self.engine
            .set_interaction_state(user_id, InteractionState::Idle)
            .await?;

        let answer = match parsing::parse_limit(&msg.text) {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(user_id, "rejected limit answer: {err}");
                self.transport.send_text(user_id, ui::LIMIT_ERROR).await?;
                return Ok(());
            }
        };

        let currency = self.engine.display_currency(user_id).await?;
        let rate = self
            .resolver
            .resolve_rate(currency, self.resolver.today(Utc::now()))
            .await?;

        let stored = match answer.amount.checked_mul(rate) {
            Some(ceiling) => {
                self.engine
                    .set_monthly_limit(user_id, answer.month, Money::new(ceiling))
                    .await
            }
            None => Err(EngineError::InvalidInput("limit too large".to_string())),
        };
        match stored {
            Ok(()) => {
                let text = ui::render_limit_set(answer.month, answer.amount, currency);
                self.transport.send_text(user_id, &text).await?;
            }
            Err(EngineError::InvalidInput(reason)) => {
                tracing::warn!(user_id, "rejected limit answer: {reason}");
                self.transport.send_text(user_id, ui::LIMIT_ERROR).await?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    async fn handle_callback(&self, cb: CallbackEvent) -> Result<(), HandlerError> {
        let user_id = cb.user_id;
        let expense_id = cb.origin_message_id;
        let Some(action) = CallbackAction::parse(&cb.data) else {
            return Err(HandlerError::UnknownCallback(cb.data));
        };
        tracing::debug!(user_id, ?action, "callback");

        match action {
            CallbackAction::EditSum => {
                self.start_edit(&cb, InteractionState::EditingSum(expense_id), ui::SUM_ALERT)
                    .await?;
            }
            CallbackAction::EditCategory => {
                self.start_edit(
                    &cb,
                    InteractionState::EditingCategory(expense_id),
                    ui::CATEGORY_ALERT,
                )
                .await?;
            }
            CallbackAction::EditDate => {
                self.start_edit(&cb, InteractionState::EditingDate(expense_id), ui::DATE_ALERT)
                    .await?;
            }
            CallbackAction::Done => {
                self.end_session(user_id, expense_id).await?;
                self.transport
                    .edit_text(user_id, expense_id, ui::SAVED_TEXT)
                    .await?;
                self.transport.answer_callback(&cb.callback_id, None).await?;
            }
            CallbackAction::Cancel => {
                self.engine.delete_expense(user_id, expense_id).await?;
                self.reports.ledger_written(user_id).await?;
                self.end_session(user_id, expense_id).await?;
                self.transport
                    .edit_text(user_id, expense_id, ui::CANCELLED_TEXT)
                    .await?;
                self.transport.answer_callback(&cb.callback_id, None).await?;
            }
            CallbackAction::Report(period) => {
                let now = Utc::now();
                let report = self.reports.report_for(user_id, period, now).await?;
                let currency = self.engine.display_currency(user_id).await?;
                let rate = self
                    .resolver
                    .resolve_rate(currency, self.resolver.today(now))
                    .await?;
                let text = ui::render_report(&report, currency, rate)?;
                self.transport.send_text(user_id, &text).await?;
                self.transport.answer_callback(&cb.callback_id, None).await?;
            }
            CallbackAction::SelectCurrency(currency) => {
                self.engine.set_display_currency(user_id, currency).await?;
                self.transport
                    .edit_text(user_id, expense_id, &ui::render_current_currency(currency))
                    .await?;
                self.transport.answer_callback(&cb.callback_id, None).await?;
            }
        }
        Ok(())
    }

    /// Binds the user to the tapped expense, replacing any edit in flight.
    async fn start_edit(
        &self,
        cb: &CallbackEvent,
        state: InteractionState,
        alert: &str,
    ) -> Result<(), HandlerError> {
        let previous = self.engine.interaction_state(cb.user_id).await?;
        if previous != InteractionState::Idle && previous != state {
            tracing::info!(user_id = cb.user_id, ?previous, ?state, "edit target replaced");
        }
        self.engine.set_interaction_state(cb.user_id, state).await?;
        self.transport
            .answer_callback(&cb.callback_id, Some(alert))
            .await?;
        Ok(())
    }

    /// Goes idle if the pending edit belongs to `expense_id`.
    async fn end_session(&self, user_id: UserId, expense_id: ExpenseId) -> Result<(), HandlerError> {
        let state = self.engine.interaction_state(user_id).await?;
        if state.expense_id() == Some(expense_id) {
            self.engine
                .set_interaction_state(user_id, InteractionState::Idle)
                .await?;
        }
        Ok(())
    }
}
