//! The screens the controller switches between.
//!
//! A screen owns its form or result state plus a [`Scope`] for its
//! background calls. It never navigates by itself: key handling, timers and
//! completed calls hand [`Transition`]s back to the controller.

pub mod dashboard;
pub mod form;
pub mod nav;
pub mod register;
pub mod signin;
pub mod verify;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use research_core::{Route, RouteParams, Session};
use research_service::ResearchApi;

use crate::runner::{Outcome, TaskRunner};

pub use dashboard::DashboardScreen;
pub use register::RegisterScreen;
pub use signin::SignInScreen;
pub use verify::VerifyScreen;

/// What a screen needs from the controller while handling an event.
pub struct Ctx<'a> {
    pub api: &'a Arc<dyn ResearchApi>,
    pub runner: &'a mut TaskRunner,
    pub download_dir: &'a Path,
}

/// A request from a screen to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Navigate(Route, RouteParams),
    /// Mark the session authenticated without leaving the screen.
    Authenticated,
    /// Mark the session authenticated and go to the dashboard.
    SignedIn,
    Alert(String),
}

pub enum Screen {
    /// The dashboard before the session check has answered.
    Pending,
    Register(RegisterScreen),
    Verify(VerifyScreen),
    SignIn(SignInScreen),
    Dashboard(DashboardScreen),
    /// The dashboard for an unauthenticated session.
    SignInRequired,
}

impl Screen {
    pub fn mount(route: Route, params: &RouteParams, session: Session, ctx: &mut Ctx<'_>) -> Self {
        match route {
            Route::Register => Screen::Register(RegisterScreen::new(ctx.runner.scope())),
            Route::Verify => {
                Screen::Verify(VerifyScreen::new(ctx.runner.scope(), params.token.clone()))
            }
            Route::Signin => Screen::SignIn(SignInScreen::new(ctx.runner.scope())),
            Route::Dashboard if session.checking => Screen::Pending,
            Route::Dashboard if session.authenticated => {
                Screen::Dashboard(DashboardScreen::new(ctx))
            }
            Route::Dashboard => Screen::SignInRequired,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant, ctx: &mut Ctx<'_>) -> Vec<Transition> {
        match self {
            Screen::Pending => Vec::new(),
            Screen::Register(s) => s.handle_key(key, now, ctx),
            Screen::Verify(s) => s.handle_key(key, ctx),
            Screen::SignIn(s) => s.handle_key(key, ctx),
            Screen::Dashboard(s) => s.handle_key(key, ctx),
            Screen::SignInRequired => match key.code {
                KeyCode::Char('s') => vec![Transition::Navigate(Route::Signin, RouteParams::default())],
                KeyCode::Char('r') => {
                    vec![Transition::Navigate(Route::Register, RouteParams::default())]
                }
                _ => Vec::new(),
            },
        }
    }

    pub fn tick(&mut self, now: Instant, ctx: &mut Ctx<'_>) -> Vec<Transition> {
        match self {
            Screen::Register(s) => {
                s.tick(now, ctx);
                Vec::new()
            }
            Screen::SignIn(s) => s.tick(now),
            _ => Vec::new(),
        }
    }

    pub fn apply(&mut self, outcome: Outcome, now: Instant, ctx: &mut Ctx<'_>) -> Vec<Transition> {
        match self {
            Screen::Register(s) => s.apply(outcome),
            Screen::Verify(s) => s.apply(outcome),
            Screen::SignIn(s) => s.apply(outcome, now),
            Screen::Dashboard(s) => s.apply(outcome, ctx),
            Screen::Pending | Screen::SignInRequired => Vec::new(),
        }
    }

    pub fn hints(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Screen::Pending => Vec::new(),
            Screen::Register(_) | Screen::Verify(_) => {
                vec![("Tab", "next field"), ("Enter", "submit")]
            }
            Screen::SignIn(_) => vec![
                ("Tab", "next field"),
                ("Enter", "submit"),
                ("Ctrl+F", "forgot password"),
            ],
            Screen::Dashboard(s) => s.hints(),
            Screen::SignInRequired => vec![("s", "sign in"), ("r", "register")],
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        match self {
            Screen::Pending => render_placeholder(frame, area),
            Screen::Register(s) => s.render(frame, area),
            Screen::Verify(s) => s.render(frame, area),
            Screen::SignIn(s) => s.render(frame, area),
            Screen::Dashboard(s) => s.render(frame, area),
            Screen::SignInRequired => render_sign_in_required(frame, area),
        }
    }
}

pub const CHECKING_AUTH: &str = "Checking authentication...";

pub fn render_placeholder(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        CHECKING_AUTH,
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_sign_in_required(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "You need to sign in",
            Style::default().bold().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("s", Style::default().fg(Color::Yellow).bold()),
            Span::raw(" sign in   "),
            Span::styled("r", Style::default().fg(Color::Yellow).bold()),
            Span::raw(" register"),
        ]),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Dashboard ")
                .borders(Borders::ALL),
        );
    frame.render_widget(paragraph, area);
}

/// A rectangle of the given percentages centered in `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
