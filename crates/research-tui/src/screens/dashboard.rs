use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use research_core::history::{parse_history, HistoryEntry};
use research_core::query::{normalize_query_response, validate_query, QueryResult};
use research_service::ServiceError;
use serde_json::Value;
use tracing::{info, warn};

use super::{Ctx, Transition};
use crate::export::{document_bytes, failure_message, save_report};
use crate::runner::{Outcome, Scope};

const QUERY_FAILED: &str = "Research processing failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Query,
    History,
}

pub struct DashboardScreen {
    scope: Scope,
    focus: Focus,
    query: String,
    loading: bool,
    error: Option<String>,
    result: Option<QueryResult>,
    history: Vec<HistoryEntry>,
    selected: usize,
    history_loading: bool,
    exporting: Option<String>,
    notice: Option<String>,
}

impl DashboardScreen {
    pub fn new(ctx: &mut Ctx<'_>) -> Self {
        let mut screen = Self {
            scope: ctx.runner.scope(),
            focus: Focus::Query,
            query: String::new(),
            loading: false,
            error: None,
            result: None,
            history: Vec::new(),
            selected: 0,
            history_loading: false,
            exporting: None,
            notice: None,
        };
        screen.load_history(ctx);
        screen
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn selected(&self) -> Option<&HistoryEntry> {
        self.history.get(self.selected)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn handle_key(&mut self, key: KeyEvent, ctx: &mut Ctx<'_>) -> Vec<Transition> {
        if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            self.focus = match self.focus {
                Focus::Query => Focus::History,
                Focus::History => Focus::Query,
            };
            return Vec::new();
        }
        if key.code == KeyCode::Esc {
            self.reset();
            return Vec::new();
        }
        match self.focus {
            Focus::Query => self.handle_query_key(key, ctx),
            Focus::History => self.handle_history_key(key, ctx),
        }
        Vec::new()
    }

    fn handle_query_key(&mut self, key: KeyEvent, ctx: &mut Ctx<'_>) {
        match key.code {
            KeyCode::Enter => self.submit(ctx),
            KeyCode::Backspace => {
                self.query.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.query.push(c);
            }
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyEvent, ctx: &mut Ctx<'_>) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.history.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char('v') => self.view_selected(),
            KeyCode::Char('e') => self.export_selected(ctx),
            KeyCode::Char('r') => self.load_history(ctx),
            _ => {}
        }
    }

    /// Clear the query, the result and any error.
    pub fn reset(&mut self) {
        self.query.clear();
        self.result = None;
        self.error = None;
        self.notice = None;
    }

    fn submit(&mut self, ctx: &mut Ctx<'_>) {
        if self.loading {
            return;
        }
        let input = match validate_query(&self.query) {
            Ok(input) => input,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };
        self.error = None;
        self.loading = true;
        let api = Arc::clone(ctx.api);
        ctx.runner.spawn(&self.scope, async move {
            Outcome::QueryAnswered(api.submit_query(&input).await)
        });
    }

    fn load_history(&mut self, ctx: &mut Ctx<'_>) {
        self.history_loading = true;
        let api = Arc::clone(ctx.api);
        ctx.runner.spawn(&self.scope, async move {
            Outcome::HistoryLoaded(api.fetch_history().await)
        });
    }

    fn view_selected(&mut self) {
        if let Some(entry) = self.history.get(self.selected) {
            self.result = Some(entry.to_result());
            self.error = None;
        }
    }

    fn export_selected(&mut self, ctx: &mut Ctx<'_>) {
        if self.exporting.is_some() {
            return;
        }
        let Some(id) = self.history.get(self.selected).map(|e| e.id.clone()) else {
            return;
        };
        self.notice = None;
        self.exporting = Some(id.clone());
        let api = Arc::clone(ctx.api);
        ctx.runner.spawn(&self.scope, async move {
            let result = api.export_pdf(&id).await;
            Outcome::Exported { id, result }
        });
    }

    pub fn apply(&mut self, outcome: Outcome, ctx: &mut Ctx<'_>) -> Vec<Transition> {
        match outcome {
            Outcome::QueryAnswered(result) => {
                self.loading = false;
                match result {
                    Ok(data) => {
                        self.result = Some(normalize_query_response(data));
                        self.query.clear();
                        self.load_history(ctx);
                    }
                    Err(e) => {
                        warn!("research query failed: {e}");
                        self.error = Some(query_failure_message(&e));
                    }
                }
                Vec::new()
            }
            Outcome::HistoryLoaded(result) => {
                self.history_loading = false;
                self.history = match result {
                    Ok(data) => parse_history(&data),
                    Err(e) => {
                        warn!("failed to load history: {e}");
                        Vec::new()
                    }
                };
                if self.selected >= self.history.len() {
                    self.selected = self.history.len().saturating_sub(1);
                }
                Vec::new()
            }
            Outcome::Exported { id, result } => {
                self.exporting = None;
                let saved = result
                    .map_err(|e| failure_message(&e))
                    .and_then(document_bytes)
                    .and_then(|bytes| save_report(ctx.download_dir, &id, &bytes));
                match saved {
                    Ok(path) => {
                        info!(path = %path.display(), "report saved");
                        self.notice = Some(format!("Saved {}", path.display()));
                        Vec::new()
                    }
                    Err(message) => {
                        warn!(%id, "export failed: {message}");
                        vec![Transition::Alert(message)]
                    }
                }
            }
            _ => Vec::new(),
        }
    }

    pub fn hints(&self) -> Vec<(&'static str, &'static str)> {
        match self.focus {
            Focus::Query => vec![("Enter", "ask"), ("Esc", "reset"), ("Tab", "history")],
            Focus::History => vec![
                ("j/k", "nav"),
                ("Enter", "view"),
                ("e", "export pdf"),
                ("r", "refresh"),
                ("Tab", "query"),
            ],
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(columns[0]);

        self.render_query_input(frame, left[0]);
        self.render_status_line(frame, left[1]);
        self.render_result(frame, left[2]);
        self.render_history(frame, columns[1]);
    }

    fn border(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }

    fn render_query_input(&self, frame: &mut Frame, area: Rect) {
        let mut text = self.query.clone();
        if self.focus == Focus::Query {
            text.push('_');
        }
        let input = Paragraph::new(text).block(
            Block::default()
                .title(" Research question ")
                .borders(Borders::ALL)
                .border_style(self.border(Focus::Query)),
        );
        frame.render_widget(input, area);
    }

    fn render_status_line(&self, frame: &mut Frame, area: Rect) {
        let line = if let Some(ref err) = self.error {
            Line::from(Span::styled(format!(" {err}"), Style::default().fg(Color::Red)))
        } else if self.loading {
            Line::from(Span::styled(" Researching...", Style::default().fg(Color::Yellow)))
        } else if let Some(ref id) = self.exporting {
            Line::from(Span::styled(
                format!(" Exporting {id}..."),
                Style::default().fg(Color::Yellow),
            ))
        } else if let Some(ref notice) = self.notice {
            Line::from(Span::styled(format!(" {notice}"), Style::default().fg(Color::Green)))
        } else {
            Line::from("")
        };
        frame.render_widget(line, area);
    }

    fn render_result(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().title(" Result ").borders(Borders::ALL);
        let Some(result) = &self.result else {
            let empty = Paragraph::new(Span::styled(
                "Ask a question to get started.",
                Style::default().fg(Color::DarkGray),
            ))
            .block(block);
            frame.render_widget(empty, area);
            return;
        };

        let heading = Style::default().bold().fg(Color::Cyan);
        let mut lines = vec![Line::from(Span::styled("Answer", heading))];
        lines.extend(result.answer.lines().map(|l| Line::from(l.to_string())));

        if !result.summary.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Summary", heading)));
            lines.extend(result.summary.lines().map(|l| Line::from(l.to_string())));
        }

        if let Some(validation) = &result.validation {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Validation", heading)));
            let text = match validation {
                Value::String(s) => s.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_default(),
            };
            lines.extend(text.lines().map(|l| Line::from(l.to_string())));
        }

        if !result.papers.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Papers", heading)));
            for paper in &result.papers {
                lines.push(Line::from(vec![
                    Span::raw("- "),
                    Span::styled(paper.title.clone(), Style::default().bold()),
                ]));
                let authors = paper.authors_line();
                if !authors.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("  {authors}"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                if let Some(url) = &paper.url {
                    lines.push(Line::from(Span::styled(
                        format!("  {url}"),
                        Style::default().fg(Color::Blue),
                    )));
                }
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_history(&self, frame: &mut Frame, area: Rect) {
        let title = if self.history_loading {
            " History (loading) ".to_string()
        } else {
            format!(" History ({}) ", self.history.len())
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(self.border(Focus::History));

        if self.history.is_empty() {
            let empty = Paragraph::new(Span::styled(
                "No history yet.",
                Style::default().fg(Color::DarkGray),
            ))
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = self
            .history
            .iter()
            .map(|entry| {
                let mut header = vec![Span::styled(
                    entry.title().to_string(),
                    Style::default().bold(),
                )];
                if let Some(at) = entry.created_at {
                    header.push(Span::styled(
                        format!("  {}", at.format("%Y-%m-%d %H:%M")),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                ListItem::new(vec![
                    Line::from(header),
                    Line::from(Span::styled(
                        entry.preview(),
                        Style::default().fg(Color::Gray),
                    )),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// `error`, then `message`, from a failed query's body.
fn query_failure_message(err: &ServiceError) -> String {
    err.body()
        .and_then(|body| {
            ["error", "message"]
                .iter()
                .find_map(|k| body.get(*k).and_then(Value::as_str))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or(QUERY_FAILED)
        .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_failure_prefers_error_field() {
        let err = ServiceError::Rejected {
            status: 500,
            body: Some(json!({"error": "LLM timeout", "message": "other"})),
        };
        assert_eq!(query_failure_message(&err), "LLM timeout");

        let err = ServiceError::Rejected {
            status: 400,
            body: Some(json!({"message": "Bad query"})),
        };
        assert_eq!(query_failure_message(&err), "Bad query");
    }

    #[test]
    fn query_failure_without_body_is_generic() {
        let err = ServiceError::Transport("refused".into());
        assert_eq!(query_failure_message(&err), QUERY_FAILED);
    }
}
