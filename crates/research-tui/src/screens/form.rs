use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use research_core::FormErrors;

/// One labelled single-line input.
#[derive(Debug, Clone)]
pub struct TextField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub masked: bool,
}

impl TextField {
    pub fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            value: String::new(),
            masked: false,
        }
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

/// What a key did to a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    /// The value of the field at this index changed.
    Edited(usize),
    Submit,
    Moved,
    Ignored,
}

/// A vertical stack of fields with a single focus.
#[derive(Debug, Clone)]
pub struct Form {
    pub fields: Vec<TextField>,
    pub focus: usize,
}

impl Form {
    pub fn new(fields: Vec<TextField>) -> Self {
        Self { fields, focus: 0 }
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        let count = self.fields.len();
        if count == 0 {
            return FormEvent::Ignored;
        }
        match key.code {
            KeyCode::Enter => FormEvent::Submit,
            KeyCode::Tab | KeyCode::Down => {
                self.focus = (self.focus + 1) % count;
                FormEvent::Moved
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + count - 1) % count;
                FormEvent::Moved
            }
            KeyCode::Backspace => {
                if self.fields[self.focus].value.pop().is_some() {
                    FormEvent::Edited(self.focus)
                } else {
                    FormEvent::Ignored
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.fields[self.focus].value.push(c);
                FormEvent::Edited(self.focus)
            }
            _ => FormEvent::Ignored,
        }
    }

    /// Draw the fields, each followed by its error line. `notes` adds a
    /// styled suffix to a field's title, keyed by field index.
    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        errors: &FormErrors,
        notes: &[(usize, Span<'_>)],
    ) {
        let constraints: Vec<Constraint> = self
            .fields
            .iter()
            .flat_map(|_| [Constraint::Length(3), Constraint::Length(1)])
            .chain(std::iter::once(Constraint::Min(0)))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (idx, field) in self.fields.iter().enumerate() {
            let focused = idx == self.focus;
            let border = if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let mut title = vec![Span::raw(format!(" {} ", field.label))];
            if let Some((_, note)) = notes.iter().find(|(i, _)| *i == idx) {
                title.push(note.clone());
                title.push(Span::raw(" "));
            }
            let mut text = field.display();
            if focused {
                text.push('_');
            }
            let input = Paragraph::new(text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(Line::from(title)),
            );
            frame.render_widget(input, rows[idx * 2]);

            if let Some(msg) = errors.joined(field.name) {
                let line = Line::from(Span::styled(
                    format!(" {msg}"),
                    Style::default().fg(Color::Red),
                ));
                frame.render_widget(line, rows[idx * 2 + 1]);
            }
        }
    }
}

/// The form-wide error and info lines under a form.
pub fn render_messages(
    frame: &mut Frame,
    area: Rect,
    errors: &FormErrors,
    info: Option<&str>,
    busy: Option<&str>,
) {
    let mut lines = Vec::new();
    if let Some(msg) = errors.global_message() {
        lines.push(Line::from(Span::styled(msg, Style::default().fg(Color::Red))));
    }
    if let Some(msg) = info {
        lines.push(Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(Color::Green),
        )));
    }
    if let Some(msg) = busy {
        lines.push(Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

/// Split a screen into a centered form panel and return its inner area.
pub fn form_panel(frame: &mut Frame, area: Rect, title: &str) -> Rect {
    let width = area.width.min(60);
    let panel = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y,
        width,
        height: area.height,
    };
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(panel);
    frame.render_widget(block, panel);
    inner
}
