use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use research_core::auth::{token_from_redirect, EmailAvailability, RegisterUser};
use research_core::{FormErrors, Route, RouteParams};
use tracing::{debug, info};

use super::form::{form_panel, render_messages, Form, FormEvent, TextField};
use super::{Ctx, Transition};
use crate::runner::{Outcome, Scope};

/// Quiet period after the last email edit before availability is checked.
pub const EMAIL_CHECK_DELAY: Duration = Duration::from_millis(600);

const USERNAME: usize = 0;
const EMAIL: usize = 1;
const PASSWORD: usize = 2;

pub struct RegisterScreen {
    scope: Scope,
    form: Form,
    errors: FormErrors,
    info: Option<String>,
    submitting: bool,
    availability: EmailAvailability,
    /// Email waiting for its debounce deadline.
    pending_check: Option<(String, Instant)>,
    /// Email whose availability check is in flight.
    checking_email: Option<String>,
}

impl RegisterScreen {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            form: Form::new(vec![
                TextField::new("username", "Username"),
                TextField::new("email", "Email"),
                TextField::new("password", "Password").masked(),
            ]),
            errors: FormErrors::default(),
            info: None,
            submitting: false,
            availability: EmailAvailability::Unknown,
            pending_check: None,
            checking_email: None,
        }
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn availability(&self) -> EmailAvailability {
        self.availability
    }

    pub fn is_checking_email(&self) -> bool {
        self.checking_email.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    fn email(&self) -> &str {
        self.form.value(EMAIL).trim()
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant, ctx: &mut Ctx<'_>) -> Vec<Transition> {
        match self.form.handle_key(key) {
            FormEvent::Edited(field) => {
                self.errors = FormErrors::default();
                self.info = None;
                if field == EMAIL {
                    self.email_edited(now);
                }
            }
            FormEvent::Submit => self.submit(ctx),
            FormEvent::Moved | FormEvent::Ignored => {}
        }
        Vec::new()
    }

    /// Every email edit replaces the pending check, so only the last value
    /// within the quiet period is ever sent.
    fn email_edited(&mut self, now: Instant) {
        self.availability = EmailAvailability::Unknown;
        self.checking_email = None;
        let email = self.email().to_string();
        self.pending_check = if email.is_empty() {
            None
        } else {
            Some((email, now + EMAIL_CHECK_DELAY))
        };
    }

    pub fn tick(&mut self, now: Instant, ctx: &mut Ctx<'_>) {
        let due = matches!(&self.pending_check, Some((_, at)) if *at <= now);
        if !due {
            return;
        }
        let Some((email, _)) = self.pending_check.take() else {
            return;
        };
        debug!(%email, "checking email availability");
        self.checking_email = Some(email.clone());
        let api = Arc::clone(ctx.api);
        ctx.runner.spawn(&self.scope, async move {
            let result = api.check_email(&email).await;
            Outcome::EmailChecked { email, result }
        });
    }

    fn submit(&mut self, ctx: &mut Ctx<'_>) {
        if self.submitting {
            return;
        }
        let input = RegisterUser {
            username: self.form.value(USERNAME).to_string(),
            email: self.form.value(EMAIL).to_string(),
            password: self.form.value(PASSWORD).to_string(),
        };
        if input.username.is_empty() || input.email.is_empty() || input.password.is_empty() {
            self.errors = FormErrors::global("Please fill all fields");
            return;
        }

        self.errors = FormErrors::default();
        self.info = None;
        self.submitting = true;
        let api = Arc::clone(ctx.api);
        ctx.runner.spawn(&self.scope, async move {
            Outcome::Registered(api.register(&input).await)
        });
    }

    pub fn apply(&mut self, outcome: Outcome) -> Vec<Transition> {
        match outcome {
            Outcome::EmailChecked { email, result } => {
                if self.checking_email.as_deref() == Some(email.as_str()) {
                    self.checking_email = None;
                }
                if self.email() != email {
                    debug!(%email, "dropping stale availability result");
                    return Vec::new();
                }
                self.availability = match result {
                    Ok(true) => EmailAvailability::Available,
                    Ok(false) => EmailAvailability::Taken,
                    Err(e) => {
                        debug!("email check failed: {e}");
                        EmailAvailability::Taken
                    }
                };
                Vec::new()
            }
            Outcome::Registered(result) => {
                self.submitting = false;
                match result {
                    Ok(reply) => match reply.redirect_url.as_deref() {
                        Some(redirect) => match token_from_redirect(redirect) {
                            Some(token) => {
                                info!("registration accepted, continuing to verification");
                                return vec![Transition::Navigate(
                                    Route::Verify,
                                    RouteParams::with_token(token),
                                )];
                            }
                            None => {
                                self.info =
                                    Some("OTP sent. Follow the link from your email.".into());
                            }
                        },
                        None => {
                            self.info = Some(
                                reply
                                    .message
                                    .unwrap_or_else(|| "OTP sent. Check your email.".into()),
                            );
                        }
                    },
                    Err(e) => {
                        debug!("registration rejected: {e}");
                        self.errors =
                            FormErrors::from_error_body(e.body(), "Registration failed. Try again.");
                    }
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = form_panel(frame, area, "Register");
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(12), Constraint::Min(0)])
            .split(inner);

        let note = if self.checking_email.is_some() {
            Some(Span::styled("checking...", Style::default().fg(Color::DarkGray)))
        } else {
            match self.availability {
                EmailAvailability::Unknown => None,
                EmailAvailability::Available => Some(Span::styled(
                    self.availability.display_name(),
                    Style::default().fg(Color::Green),
                )),
                EmailAvailability::Taken => Some(Span::styled(
                    self.availability.display_name(),
                    Style::default().fg(Color::Red),
                )),
            }
        };
        let notes: Vec<(usize, Span)> = note.into_iter().map(|n| (EMAIL, n)).collect();
        self.form.render(frame, rows[0], &self.errors, &notes);

        let busy = self.submitting.then_some("Registering...");
        render_messages(frame, rows[1], &self.errors, self.info.as_deref(), busy);
    }
}
