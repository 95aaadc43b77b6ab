use crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::error::ValidationError;
use crate::host::{HostForm, HostRecord, Link, DEFAULT_SSH_PORT};
use crate::input::InputBuffer;
use crate::profile::{ProfileForm, TerminalProfile};
use crate::state::Action;

const HELP_TEXT: &str = "(Tab/↓) next field | (Shift+Tab/↑) previous | (Enter) save | (Esc) cancel";

/// Which record the form edits, and where it goes back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FormKind {
    Host(Option<usize>),
    Profile(Option<usize>),
}

pub(crate) enum FormEvent {
    Pending,
    Cancel,
    Submit(Action),
}

/// Modal editor for one host or profile.
pub(crate) struct Form {
    kind: FormKind,
    fields: Vec<InputBuffer>,
    focus: usize,
    error: Option<String>,
}

impl Form {
    pub fn add_host() -> Self {
        Self::host(None, &HostForm {
            port: DEFAULT_SSH_PORT.to_string(),
            ..Default::default()
        })
    }

    pub fn edit_host(index: usize, host: &HostRecord) -> Self {
        Self::host(Some(index), &HostForm::from_record(host))
    }

    pub fn add_profile() -> Self {
        Self::profile(None, &ProfileForm::default())
    }

    pub fn edit_profile(index: usize, profile: &TerminalProfile) -> Self {
        Self::profile(Some(index), &ProfileForm::from_record(profile))
    }

    fn host(index: Option<usize>, form: &HostForm) -> Self {
        Self {
            kind: FormKind::Host(index),
            fields: vec![
                InputBuffer::with_value("Name:         ", &form.name),
                InputBuffer::with_value("IP/Hostname:  ", &form.ip),
                InputBuffer::with_value("Username:     ", &form.username),
                InputBuffer::with_value("Port:         ", &form.port),
                InputBuffer::with_value("Certificate:  ", &form.certificate),
                InputBuffer::with_value("Links:        ", format_links(&form.links)),
            ],
            focus: 0,
            error: None,
        }
    }

    fn profile(index: Option<usize>, form: &ProfileForm) -> Self {
        Self {
            kind: FormKind::Profile(index),
            fields: vec![
                InputBuffer::with_value("Name:         ", &form.name),
                InputBuffer::with_value("Git username: ", &form.git_username),
                InputBuffer::with_value("Git email:    ", &form.git_email),
                InputBuffer::with_value("SSH key:      ", &form.ssh_key_path),
                InputBuffer::with_value("Working dir:  ", &form.working_dir),
            ],
            focus: 0,
            error: None,
        }
    }

    fn title(&self) -> &'static str {
        match self.kind {
            FormKind::Host(None) => " Add Host ",
            FormKind::Host(Some(_)) => " Edit Host ",
            FormKind::Profile(None) => " Add Terminal Profile ",
            FormKind::Profile(Some(_)) => " Edit Terminal Profile ",
        }
    }

    fn value(&self, field: usize) -> String {
        self.fields[field].text()
    }

    fn host_form(&self) -> HostForm {
        HostForm {
            name: self.value(0),
            ip: self.value(1),
            username: self.value(2),
            port: self.value(3),
            certificate: self.value(4),
            links: parse_links(&self.value(5)),
        }
    }

    fn profile_form(&self) -> ProfileForm {
        ProfileForm {
            name: self.value(0),
            git_username: self.value(1),
            git_email: self.value(2),
            ssh_key_path: self.value(3),
            working_dir: self.value(4),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        match key.code {
            KeyCode::Esc => return FormEvent::Cancel,
            KeyCode::Enter => return self.submit(),
            KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % self.fields.len(),
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + self.fields.len() - 1) % self.fields.len()
            }
            _ => self.fields[self.focus].handle_event(Event::Key(key)),
        }
        FormEvent::Pending
    }

    /// Validates and, when the input is acceptable, produces the save action.
    /// A rejected form stays open with the message and the offending field focused.
    fn submit(&mut self) -> FormEvent {
        let action = match self.kind {
            FormKind::Host(index) => {
                let form = self.host_form();
                form.validate()
                    .map(|_| form.into_record())
                    .map(|host| host.map(|host| Action::SaveHost { index, host }))
            }
            FormKind::Profile(index) => {
                let form = self.profile_form();
                form.validate()
                    .map(|_| form.into_record())
                    .map(|profile| profile.map(|profile| Action::SaveProfile { index, profile }))
            }
        };

        match action {
            Ok(Some(action)) => FormEvent::Submit(action),
            Ok(None) => FormEvent::Pending,
            Err(e) => {
                self.focus = field_for(&e);
                self.error = Some(e.to_string());
                FormEvent::Pending
            }
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let height = self.fields.len() as u16 + 6;
        let area = centered_rect(area, 80, height);
        f.render_widget(Clear, area);

        let block = Block::default().borders(Borders::ALL).title(self.title());
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut constraints = vec![Constraint::Length(1); self.fields.len()];
        constraints.extend([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)]);
        let recs = Layout::vertical(constraints).split(inner);

        for (i, field) in self.fields.iter().enumerate() {
            let style = if i == self.focus {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            f.render_widget(Paragraph::new(field.line()).style(style), recs[i]);
        }

        let n = self.fields.len();
        if let Some(error) = &self.error {
            let error = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
            f.render_widget(error, recs[n + 1]);
        }
        f.render_widget(Paragraph::new(Line::from(HELP_TEXT)).alignment(Alignment::Center), recs[n + 2]);

        let focused = &self.fields[self.focus];
        f.set_cursor(
            recs[self.focus].x + focused.visual_cursor() as u16,
            recs[self.focus].y,
        );
    }
}

fn field_for(error: &ValidationError) -> usize {
    match error {
        ValidationError::HostNameRequired | ValidationError::ProfileNameRequired => 0,
        ValidationError::HostIpRequired | ValidationError::GitUsernameRequired => 1,
        ValidationError::GitEmailRequired | ValidationError::GitEmailInvalid => 2,
        ValidationError::PortNotANumber | ValidationError::PortOutOfRange => 3,
    }
}

/// Parses `name=url; name=url`. A backslash escapes the next character, so
/// names may hold `=` and either part may hold `;`. Entries without a url are
/// kept with an empty one and dropped when the record is built.
pub(crate) fn parse_links(text: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut name = String::new();
    let mut url: Option<String> = None;

    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_char(&mut name, &mut url, escaped);
                }
            }
            ';' => finish_link(&mut links, &mut name, &mut url),
            '=' if url.is_none() => url = Some(String::new()),
            c => push_char(&mut name, &mut url, c),
        }
    }
    finish_link(&mut links, &mut name, &mut url);
    links
}

fn push_char(name: &mut String, url: &mut Option<String>, c: char) {
    url.as_mut().unwrap_or(name).push(c);
}

fn finish_link(links: &mut Vec<Link>, name: &mut String, url: &mut Option<String>) {
    let name = std::mem::take(name);
    let url = url.take().unwrap_or_default();
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() && url.is_empty() {
        return;
    }
    links.push(Link {
        name: name.to_string(),
        url: url.to_string(),
    });
}

/// Inverse of [`parse_links`].
pub(crate) fn format_links(links: &[Link]) -> String {
    links
        .iter()
        .map(|link| format!("{}={}", escape(&link.name, &[';', '=']), escape(&link.url, &[';'])))
        .collect::<Vec<_>>()
        .join("; ")
}

fn escape(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A rectangle `percent_x` wide and `height` tall in the middle of `area`.
pub(crate) fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(form: &mut Form, code: KeyCode) -> FormEvent {
        form.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(form: &mut Form, text: &str) {
        for c in text.chars() {
            press(form, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_parse_links() {
        let links = parse_links(" Docs = https://docs?a=b ; empty; ;Wiki=https://wiki");
        assert_eq!(
            links,
            vec![
                Link { name: "Docs".into(), url: "https://docs?a=b".into() },
                Link { name: "empty".into(), url: "".into() },
                Link { name: "Wiki".into(), url: "https://wiki".into() },
            ]
        );
        assert!(parse_links("").is_empty());
    }

    #[test]
    fn test_format_links() {
        let links = vec![
            Link { name: "a".into(), url: "u1".into() },
            Link { name: "b".into(), url: "u2".into() },
        ];
        assert_eq!(format_links(&links), "a=u1; b=u2");
        assert_eq!(parse_links(&format_links(&links)), links);
    }

    #[test]
    fn test_links_with_separators_survive_editing() {
        let links = vec![
            Link { name: "a=b".into(), url: "https://x".into() },
            Link { name: "Docs".into(), url: "https://d/x;y=1".into() },
            Link { name: r"C:\share".into(), url: "smb://s".into() },
        ];
        assert_eq!(parse_links(&format_links(&links)), links);

        let mut host = HostRecord::new("web", "web.local");
        host.links = links.clone();
        let form = Form::edit_host(0, &host);
        assert_eq!(form.host_form().into_record().unwrap().links, links);
    }

    #[test]
    fn test_new_host_form_submits_save_action() {
        let mut form = Form::add_host();
        type_text(&mut form, "web");
        press(&mut form, KeyCode::Tab);
        type_text(&mut form, "web.local");

        match press(&mut form, KeyCode::Enter) {
            FormEvent::Submit(Action::SaveHost { index: None, host }) => {
                assert_eq!(host.name, "web");
                assert_eq!(host.ip, "web.local");
                assert_eq!(host.port, 22);
            }
            _ => panic!("expected a save action"),
        }
    }

    #[test]
    fn test_invalid_port_keeps_form_open() {
        let mut host = HostRecord::new("web", "web.local");
        host.port = 2222;
        let mut form = Form::edit_host(3, &host);
        for _ in 0..3 {
            press(&mut form, KeyCode::Down);
        }
        type_text(&mut form, "9");

        assert!(matches!(press(&mut form, KeyCode::Enter), FormEvent::Pending));
        assert_eq!(form.error.as_deref(), Some("Port must be between 1 and 65535."));
        assert_eq!(form.focus, 3);
    }

    #[test]
    fn test_profile_form_focuses_bad_email() {
        let mut form = Form::add_profile();
        type_text(&mut form, "work");
        press(&mut form, KeyCode::Tab);
        type_text(&mut form, "Jane");
        press(&mut form, KeyCode::Tab);
        type_text(&mut form, "jane.corp.com");
        press(&mut form, KeyCode::BackTab);

        assert!(matches!(press(&mut form, KeyCode::Enter), FormEvent::Pending));
        assert_eq!(form.focus, 2);
        assert_eq!(
            form.error.as_deref(),
            Some("Git email must be a valid email address.")
        );
    }

    #[test]
    fn test_escape_cancels() {
        let mut form = Form::edit_profile(0, &TerminalProfile::new("w", "j", "j@x"));
        assert_eq!(form.kind, FormKind::Profile(Some(0)));
        assert!(matches!(press(&mut form, KeyCode::Esc), FormEvent::Cancel));
    }

    #[test]
    fn test_centered_rect_fits() {
        let area = Rect::new(0, 0, 100, 10);
        let rect = centered_rect(area, 80, 20);
        assert_eq!(rect, Rect::new(10, 0, 80, 10));
    }

    #[test]
    fn test_centered_rect_wide_terminal() {
        let area = Rect::new(0, 0, 1000, 50);
        let rect = centered_rect(area, 80, 20);
        assert_eq!(rect, Rect::new(100, 15, 800, 20));
    }
}
