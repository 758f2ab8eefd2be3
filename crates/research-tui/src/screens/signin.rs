use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use research_core::auth::{message_indicates_success, SignIn, SIGNIN_SUCCESS_MARKERS};
use research_core::{FormErrors, Route, RouteParams};
use tracing::{debug, info};

use super::form::{form_panel, render_messages, Form, FormEvent, TextField};
use super::{Ctx, Transition};
use crate::runner::{Outcome, Scope};

/// How long the success message stays up before the dashboard opens.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(300);

pub const FORGOT_PASSWORD: &str =
    "If you forgot your password, use the password reset flow on the backend (not implemented here).";

const EMAIL: usize = 0;
const PASSWORD: usize = 1;

pub struct SignInScreen {
    scope: Scope,
    form: Form,
    errors: FormErrors,
    info: Option<String>,
    submitting: bool,
    redirect_at: Option<Instant>,
}

impl SignInScreen {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            form: Form::new(vec![
                TextField::new("email", "Email"),
                TextField::new("password", "Password").masked(),
            ]),
            errors: FormErrors::default(),
            info: None,
            submitting: false,
            redirect_at: None,
        }
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn handle_key(&mut self, key: KeyEvent, ctx: &mut Ctx<'_>) -> Vec<Transition> {
        if key.code == KeyCode::Char('f') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Transition::Alert(FORGOT_PASSWORD.to_string())];
        }
        match self.form.handle_key(key) {
            FormEvent::Edited(_) => {
                self.errors = FormErrors::default();
                self.info = None;
            }
            FormEvent::Submit => self.submit(ctx),
            FormEvent::Moved | FormEvent::Ignored => {}
        }
        Vec::new()
    }

    fn submit(&mut self, ctx: &mut Ctx<'_>) {
        if self.submitting || self.redirect_at.is_some() {
            return;
        }
        let input = SignIn {
            email: self.form.value(EMAIL).trim().to_string(),
            password: self.form.value(PASSWORD).to_string(),
        };
        if input.email.is_empty() || input.password.is_empty() {
            self.errors = FormErrors::global("Please enter both email and password");
            return;
        }

        self.errors = FormErrors::default();
        self.info = None;
        self.submitting = true;
        let api = Arc::clone(ctx.api);
        ctx.runner.spawn(&self.scope, async move {
            Outcome::SignedIn(api.sign_in(&input).await)
        });
    }

    pub fn tick(&mut self, now: Instant) -> Vec<Transition> {
        match self.redirect_at {
            Some(at) if at <= now => {
                self.redirect_at = None;
                vec![Transition::Navigate(Route::Dashboard, RouteParams::default())]
            }
            _ => Vec::new(),
        }
    }

    pub fn apply(&mut self, outcome: Outcome, now: Instant) -> Vec<Transition> {
        let Outcome::SignedIn(result) = outcome else {
            return Vec::new();
        };
        self.submitting = false;
        match result {
            Ok(reply) => {
                info!("signed in");
                if message_indicates_success(reply.message.as_deref(), SIGNIN_SUCCESS_MARKERS) {
                    self.info = Some("Signed in successfully".into());
                    self.redirect_at = Some(now + REDIRECT_DELAY);
                    vec![Transition::Authenticated]
                } else {
                    vec![Transition::SignedIn]
                }
            }
            Err(e) => {
                debug!("sign-in rejected: {e}");
                self.errors = FormErrors::from_error_body(e.body(), "Sign-in failed. Try again.");
                Vec::new()
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = form_panel(frame, area, "Sign in");
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(0)])
            .split(inner);
        self.form.render(frame, rows[0], &self.errors, &[]);

        let busy = self.submitting.then_some("Signing in...");
        render_messages(frame, rows[1], &self.errors, self.info.as_deref(), busy);
    }
}
