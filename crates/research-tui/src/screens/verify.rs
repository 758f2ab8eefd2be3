use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use research_core::auth::{message_indicates_success, VerifyOtp, VERIFY_SUCCESS_MARKERS};
use research_core::{FormErrors, Route, RouteParams};
use serde_json::Value;
use tracing::{debug, info};

use super::form::{form_panel, render_messages, Form, FormEvent, TextField};
use super::{Ctx, Transition};
use crate::runner::{Outcome, Scope};

pub struct VerifyScreen {
    scope: Scope,
    token: Option<String>,
    form: Form,
    errors: FormErrors,
    submitting: bool,
}

impl VerifyScreen {
    pub fn new(scope: Scope, token: Option<String>) -> Self {
        Self {
            scope,
            token: token.filter(|t| !t.is_empty()),
            form: Form::new(vec![TextField::new("otp", "One-time code")]),
            errors: FormErrors::default(),
            submitting: false,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn error(&self) -> Option<String> {
        self.errors.global_message()
    }

    pub fn handle_key(&mut self, key: KeyEvent, ctx: &mut Ctx<'_>) -> Vec<Transition> {
        match self.form.handle_key(key) {
            FormEvent::Edited(_) => self.errors = FormErrors::default(),
            FormEvent::Submit => self.submit(ctx),
            FormEvent::Moved | FormEvent::Ignored => {}
        }
        Vec::new()
    }

    fn submit(&mut self, ctx: &mut Ctx<'_>) {
        if self.submitting {
            return;
        }
        let Some(token) = self.token.clone() else {
            self.errors = FormErrors::global("Missing token");
            return;
        };
        let input = VerifyOtp {
            otp: self.form.value(0).trim().to_string(),
        };
        self.errors = FormErrors::default();
        self.submitting = true;
        let api = Arc::clone(ctx.api);
        ctx.runner.spawn(&self.scope, async move {
            Outcome::OtpVerified(api.verify_otp(&token, &input).await)
        });
    }

    pub fn apply(&mut self, outcome: Outcome) -> Vec<Transition> {
        let Outcome::OtpVerified(result) = outcome else {
            return Vec::new();
        };
        self.submitting = false;
        match result {
            Ok(reply) => {
                info!("account verified");
                let text = if message_indicates_success(reply.message.as_deref(), VERIFY_SUCCESS_MARKERS)
                {
                    "Sign-up successful. Please sign in.".to_string()
                } else {
                    reply.message.unwrap_or_else(|| "Verified".into())
                };
                vec![
                    Transition::Alert(text),
                    Transition::Navigate(Route::Signin, RouteParams::default()),
                ]
            }
            Err(e) => {
                debug!("otp rejected: {e}");
                let message = e
                    .body()
                    .and_then(|b| b.get("message"))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("Invalid OTP");
                self.errors = FormErrors::global(message);
                Vec::new()
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = form_panel(frame, area, "Verify email");
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(4),
                Constraint::Min(0),
            ])
            .split(inner);

        let prompt = match &self.token {
            Some(_) => Line::from("Enter the code we emailed you."),
            None => Line::from(Span::styled(
                "No verification token. Open the link from your email.",
                Style::default().fg(Color::Yellow),
            )),
        };
        frame.render_widget(prompt, rows[0]);
        self.form.render(frame, rows[1], &self.errors, &[]);

        let busy = self.submitting.then_some("Verifying...");
        render_messages(frame, rows[2], &self.errors, None, busy);
    }
}
