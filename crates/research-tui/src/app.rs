use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use research_core::route::initial_route;
use research_core::{Location, Route, RouteParams, Session};
use research_service::ResearchApi;
use tracing::{debug, info};

use crate::runner::{Outcome, Scope, TaskRunner};
use crate::screens::nav::{nav_action, render_title_bar, NavAction};
use crate::screens::{centered_rect, render_placeholder, Ctx, Screen, Transition};

/// Start-up settings for the controller.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub location: Location,
    pub download_dir: PathBuf,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            location: Location::default(),
            download_dir: PathBuf::from("."),
        }
    }
}

/// Owns the session, the current route and the active screen.
pub struct App {
    api: Arc<dyn ResearchApi>,
    runner: TaskRunner,
    _app_scope: Scope,
    session: Session,
    route: Route,
    params: RouteParams,
    location: Location,
    screen: Screen,
    alert: Option<String>,
    download_dir: PathBuf,
}

impl App {
    pub fn new(api: Arc<dyn ResearchApi>, options: AppOptions) -> Result<Self> {
        let mut runner = TaskRunner::new().context("failed to start the task runtime")?;
        let app_scope = runner.scope();

        let check_api = Arc::clone(&api);
        runner.spawn(&app_scope, async move {
            Outcome::AuthChecked(check_api.check_token().await)
        });

        let (route, params) = initial_route(&options.location);
        let mut app = Self {
            api,
            runner,
            _app_scope: app_scope,
            session: Session::checking(),
            route,
            params: RouteParams::default(),
            location: options.location,
            screen: Screen::Pending,
            alert: None,
            download_dir: options.download_dir,
        };
        app.navigate(route, params);
        Ok(app)
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Replace the route, drop the old screen and mount the new one. Only
    /// `verify` keeps a token in the location.
    pub fn navigate(&mut self, route: Route, params: RouteParams) {
        info!(route = %route, "navigate");
        match (&params.token, route) {
            (Some(token), Route::Verify) => self.location.set_token(token),
            _ => self.location.clear_token(),
        }
        self.route = route;
        self.params = params;
        self.remount();
    }

    fn remount(&mut self) {
        // Dropping the old screen cancels its in-flight calls before the new
        // screen starts any of its own.
        self.screen = Screen::Pending;
        let mut ctx = Ctx {
            api: &self.api,
            runner: &mut self.runner,
            download_dir: &self.download_dir,
        };
        self.screen = Screen::mount(self.route, &self.params, self.session, &mut ctx);
    }

    pub fn sign_in_succeeded(&mut self) {
        info!("session authenticated");
        self.session.sign_in();
        self.navigate(Route::Dashboard, RouteParams::default());
    }

    pub fn sign_out(&mut self) {
        info!("signed out");
        self.session.sign_out();
        self.navigate(Route::Signin, RouteParams::default());
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.handle_key_at(key, Instant::now());
    }

    pub fn handle_key_at(&mut self, key: KeyEvent, now: Instant) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.alert.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.alert = None;
            }
            return;
        }
        if let Some(action) = nav_action(&key, self.session) {
            match action {
                NavAction::Go(route) => self.navigate(route, RouteParams::default()),
                NavAction::SignOut => self.sign_out(),
            }
            return;
        }
        if self.session.checking {
            return;
        }

        let mut ctx = Ctx {
            api: &self.api,
            runner: &mut self.runner,
            download_dir: &self.download_dir,
        };
        let transitions = self.screen.handle_key(key, now, &mut ctx);
        self.apply_transitions(transitions);
    }

    /// Fire any screen timers that are due at `now`.
    pub fn tick(&mut self, now: Instant) {
        let mut ctx = Ctx {
            api: &self.api,
            runner: &mut self.runner,
            download_dir: &self.download_dir,
        };
        let transitions = self.screen.tick(now, &mut ctx);
        self.apply_transitions(transitions);
    }

    /// Apply every finished background call without blocking.
    pub fn pump(&mut self) {
        for outcome in self.runner.drain() {
            self.apply_outcome(outcome, Instant::now());
        }
    }

    /// Keep applying results until nothing is in flight. Returns false if
    /// `timeout` ran out first.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.runner.in_flight() == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let step = (deadline - now).min(Duration::from_millis(50));
            for outcome in self.runner.wait(step) {
                self.apply_outcome(outcome, Instant::now());
            }
        }
    }

    fn apply_outcome(&mut self, outcome: Outcome, now: Instant) {
        if let Outcome::AuthChecked(result) = outcome {
            let authenticated = match result {
                Ok(status) => status.is_authenticated(),
                Err(e) => {
                    debug!("auth check failed: {e}");
                    false
                }
            };
            info!(authenticated, "session check finished");
            self.session.resolve(authenticated);
            if self.route == Route::Dashboard {
                self.remount();
            }
            return;
        }

        let mut ctx = Ctx {
            api: &self.api,
            runner: &mut self.runner,
            download_dir: &self.download_dir,
        };
        let transitions = self.screen.apply(outcome, now, &mut ctx);
        self.apply_transitions(transitions);
    }

    fn apply_transitions(&mut self, transitions: Vec<Transition>) {
        for transition in transitions {
            match transition {
                Transition::Navigate(route, params) => self.navigate(route, params),
                Transition::Authenticated => {
                    info!("session authenticated");
                    self.session.sign_in();
                }
                Transition::SignedIn => self.sign_in_succeeded(),
                Transition::Alert(message) => self.alert = Some(message),
            }
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        render_title_bar(frame, layout[0], self.route, self.session, &self.location);
        if self.session.checking {
            render_placeholder(frame, layout[1]);
        } else {
            self.screen.render(frame, layout[1]);
        }
        self.render_status_bar(frame, layout[2]);

        if let Some(ref message) = self.alert {
            self.render_alert(frame, message, area);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut hints = if self.alert.is_some() {
            vec![("Enter/Esc", "dismiss")]
        } else if self.session.checking {
            Vec::new()
        } else {
            self.screen.hints()
        };
        hints.push(("Ctrl+C", "quit"));

        let spans: Vec<Span> = hints
            .into_iter()
            .flat_map(|(key, desc)| {
                vec![
                    Span::styled(
                        format!(" {key}"),
                        Style::default().fg(Color::Yellow).bold(),
                    ),
                    Span::raw(format!(" {desc} ")),
                ]
            })
            .collect();

        frame.render_widget(Line::from(spans), area);
    }

    fn render_alert(&self, frame: &mut Frame, message: &str, area: Rect) {
        let popup = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Notice ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let paragraph = Paragraph::new(message)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup);
    }
}
