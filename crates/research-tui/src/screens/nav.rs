use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use research_core::{Location, Route, Session};

/// Global navigation reachable from every screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Go(Route),
    SignOut,
}

pub fn nav_action(key: &KeyEvent, session: Session) -> Option<NavAction> {
    match key.code {
        KeyCode::F(1) => Some(NavAction::Go(Route::Register)),
        KeyCode::F(2) => Some(NavAction::Go(Route::Signin)),
        KeyCode::F(3) => Some(NavAction::Go(Route::Dashboard)),
        KeyCode::F(4) if session.authenticated => Some(NavAction::SignOut),
        _ => None,
    }
}

fn nav_items(session: Session) -> Vec<(&'static str, Option<Route>, &'static str)> {
    let mut items = vec![
        ("F1", Some(Route::Register), Route::Register.display_name()),
        ("F2", Some(Route::Signin), Route::Signin.display_name()),
        ("F3", Some(Route::Dashboard), Route::Dashboard.display_name()),
    ];
    if session.authenticated {
        items.push(("F4", None, "Sign out"));
    }
    items
}

pub fn render_title_bar(
    frame: &mut Frame,
    area: Rect,
    route: Route,
    session: Session,
    location: &Location,
) {
    let mut spans = vec![
        Span::styled(" research ", Style::default().bold().fg(Color::Cyan)),
        Span::raw("| "),
    ];
    for (key, target, label) in nav_items(session) {
        let style = if target == Some(route) {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!("{key} "), Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(label, style));
        spans.push(Span::raw("  "));
    }
    if session.authenticated {
        spans.push(Span::styled("(Signed in) ", Style::default().fg(Color::Green)));
    }
    spans.push(Span::raw("| "));
    spans.push(Span::styled(
        location.to_string(),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Line::from(spans), area);
}
