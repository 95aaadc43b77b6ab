use std::io::Write;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::*;
use tracing::warn;

use crate::command::build_display_command;
use crate::error::LauncherError;
use crate::form::{centered_rect, Form, FormEvent};
use crate::launcher::{GnomeTerminal, Launcher, TerminalEmulator};
use crate::select_box::{Mode as SearchMode, SelectBox};
use crate::state::{Action, AppState, Direction, Outcome};
use crate::terminal::Terminal;

pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

const INFO_TEXT_HOSTS: &str = "(Enter) connect | (/) search | (a)dd | (e)dit | (d)uplicate | (x) delete | (Shift+↑↓) reorder | (l)inks | (c)ommand | (Tab) profiles | (Esc) quit";
const INFO_TEXT_PROFILES: &str = "(Enter) launch | (/) search | (a)dd | (e)dit | (d)uplicate | (x) delete | (Shift+↑↓) reorder | (Tab) hosts | (Esc) quit";
const INFO_TEXT_SEARCH: &str = "(Esc) quit search | (↑) move up | (↓) move down | (Enter) activate";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Hosts,
    Profiles,
}

enum Mode {
    Browse,
    Form(Form),
    Confirm { action: Action, question: String },
    Links { host: usize, state: ListState },
}

enum Status {
    Info(String),
    Error(String),
}

/// Whether the event loop keeps going.
enum Flow {
    Continue,
    Exit(Option<String>),
}

/// The controller: owns the state, turns key presses into actions and
/// redraws after each one.
pub struct App<T: TerminalEmulator = GnomeTerminal> {
    state: AppState,
    launcher: Launcher<T>,
    tab: Tab,
    hosts: SelectBox,
    profiles: SelectBox,
    mode: Mode,
    status: Option<Status>,
}

impl<T: TerminalEmulator> App<T> {
    pub fn new(state: AppState, launcher: Launcher<T>) -> Self {
        let mut app = Self {
            state,
            launcher,
            tab: Tab::Hosts,
            hosts: SelectBox::new(["Host", "Links"]),
            profiles: SelectBox::new(["Profile", "Working directory"]),
            mode: Mode::Browse,
            status: None,
        };
        app.refresh(None);
        app
    }

    /// Shows an error that happened outside the event loop, e.g. while loading.
    pub fn report(&mut self, error: &LauncherError) {
        self.status = Some(Status::Error(error.to_string()));
    }

    /// Runs until the user quits or a terminal was launched. Returns a
    /// message worth printing after the screen is restored.
    pub fn run(&mut self, terminal: &mut Terminal<impl Write>) -> anyhow::Result<Option<String>> {
        loop {
            terminal.draw(|frame| self.ui(frame))?;
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Flow::Exit(message) = self.handle_key(key) {
                    terminal.clear()?;
                    return Ok(message);
                }
            }
        }
    }

    fn current(&mut self) -> &mut SelectBox {
        match self.tab {
            Tab::Hosts => &mut self.hosts,
            Tab::Profiles => &mut self.profiles,
        }
    }

    fn current_box(&self) -> &SelectBox {
        match self.tab {
            Tab::Hosts => &self.hosts,
            Tab::Profiles => &self.profiles,
        }
    }

    fn refresh(&mut self, select: Option<usize>) {
        let (host_select, profile_select) = match self.tab {
            Tab::Hosts => (select, None),
            Tab::Profiles => (None, select),
        };
        let hosts = self.state.filter_hosts(self.hosts.filter());
        self.hosts.refresh(hosts, host_select);
        let profiles = self.state.filter_profiles(self.profiles.filter());
        self.profiles.refresh(profiles, profile_select);
    }

    fn apply(&mut self, action: Action) -> Flow {
        match self.state.dispatch(action, &self.launcher) {
            Ok(Outcome::Exit(message)) => return Flow::Exit(message),
            Ok(Outcome::Refresh { selected, message }) => {
                self.status = message.map(Status::Info);
                self.refresh(selected);
            }
            Err(e) => {
                warn!("{}", e);
                self.status = Some(Status::Error(e.to_string()));
                self.refresh(None);
            }
        }
        Flow::Continue
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::Browse => self.handle_browse_key(key),
            Mode::Form(mut form) => match form.handle_key(key) {
                FormEvent::Pending => {
                    self.mode = Mode::Form(form);
                    Flow::Continue
                }
                FormEvent::Cancel => Flow::Continue,
                FormEvent::Submit(action) => self.apply(action),
            },
            Mode::Confirm { action, question } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.apply(action),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Flow::Continue,
                _ => {
                    self.mode = Mode::Confirm { action, question };
                    Flow::Continue
                }
            },
            Mode::Links { host, mut state } => {
                let count = self.state.hosts().get(host).map_or(0, |h| h.links.len());
                match key.code {
                    KeyCode::Esc => Flow::Continue,
                    KeyCode::Enter => {
                        let url = state
                            .selected()
                            .and_then(|i| self.state.hosts().get(host)?.links.get(i))
                            .map(|link| link.url.clone());
                        match url {
                            Some(url) => self.apply(Action::OpenLink(url)),
                            None => Flow::Continue,
                        }
                    }
                    KeyCode::Up | KeyCode::Down if count > 0 => {
                        let i = state.selected().unwrap_or(0);
                        let next = if key.code == KeyCode::Up {
                            (i + count - 1) % count
                        } else {
                            (i + 1) % count
                        };
                        state.select(Some(next));
                        self.mode = Mode::Links { host, state };
                        Flow::Continue
                    }
                    _ => {
                        self.mode = Mode::Links { host, state };
                        Flow::Continue
                    }
                }
            }
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Flow {
        if self.current_box().mode() == SearchMode::Search {
            return self.handle_search_key(key);
        }

        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let selected = self.current_box().selected();
        self.status = None;

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Flow::Exit(None),
            KeyCode::Tab | KeyCode::BackTab => self.switch_tab(),
            KeyCode::Up if shift => {
                if let Some(index) = selected {
                    return self.apply(self.move_action(index, Direction::Up));
                }
            }
            KeyCode::Down if shift => {
                if let Some(index) = selected {
                    return self.apply(self.move_action(index, Direction::Down));
                }
            }
            KeyCode::Up => self.current().up(),
            KeyCode::Down => self.current().down(),
            KeyCode::Enter => {
                if let Some(index) = selected {
                    return self.activate(index);
                }
            }
            KeyCode::Char('/') => self.current().start_search(),
            KeyCode::Char('a') => {
                self.mode = Mode::Form(match self.tab {
                    Tab::Hosts => Form::add_host(),
                    Tab::Profiles => Form::add_profile(),
                });
            }
            KeyCode::Char('e') => {
                if let Some(form) = selected.and_then(|index| self.edit_form(index)) {
                    self.mode = Mode::Form(form);
                }
            }
            KeyCode::Char('d') => {
                if let Some(index) = selected {
                    let action = match self.tab {
                        Tab::Hosts => Action::DuplicateHost(index),
                        Tab::Profiles => Action::DuplicateProfile(index),
                    };
                    return self.apply(action);
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(index) = selected {
                    self.confirm_delete(index);
                }
            }
            KeyCode::Char('l') if self.tab == Tab::Hosts => {
                if let Some(index) = selected {
                    match self.state.hosts().get(index) {
                        Some(host) if host.links.is_empty() => {
                            self.status = Some(Status::Info(format!("{} has no links", host.name)));
                        }
                        Some(_) => {
                            self.mode = Mode::Links {
                                host: index,
                                state: ListState::default().with_selected(Some(0)),
                            };
                        }
                        None => {}
                    }
                }
            }
            KeyCode::Char('c') if self.tab == Tab::Hosts => {
                if let Some(host) = selected.and_then(|index| self.state.hosts().get(index)) {
                    self.status = Some(Status::Info(build_display_command(host)));
                }
            }
            _ => {}
        }
        Flow::Continue
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Esc => {
                self.current().stop_search();
                self.refresh(None);
            }
            KeyCode::Tab | KeyCode::BackTab => self.switch_tab(),
            KeyCode::Up => self.current().up(),
            KeyCode::Down => self.current().down(),
            KeyCode::Enter => {
                // a single match is activated even when it is not highlighted
                let select_box = self.current_box();
                let index = match select_box.visible() {
                    [only] => Some(*only),
                    _ => select_box.selected(),
                };
                if let Some(index) = index {
                    return self.activate(index);
                }
            }
            _ => {
                self.current().handle_search_event(Event::Key(key));
                self.refresh(None);
            }
        }
        Flow::Continue
    }

    fn switch_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Hosts => Tab::Profiles,
            Tab::Profiles => Tab::Hosts,
        };
    }

    fn activate(&mut self, index: usize) -> Flow {
        let action = match self.tab {
            Tab::Hosts => Action::Connect(index),
            Tab::Profiles => Action::LaunchProfile(index),
        };
        self.apply(action)
    }

    fn move_action(&self, index: usize, direction: Direction) -> Action {
        match self.tab {
            Tab::Hosts => Action::MoveHost(index, direction),
            Tab::Profiles => Action::MoveProfile(index, direction),
        }
    }

    fn edit_form(&self, index: usize) -> Option<Form> {
        match self.tab {
            Tab::Hosts => self
                .state
                .hosts()
                .get(index)
                .map(|host| Form::edit_host(index, host)),
            Tab::Profiles => self
                .state
                .profiles()
                .get(index)
                .map(|profile| Form::edit_profile(index, profile)),
        }
    }

    fn confirm_delete(&mut self, index: usize) {
        let (action, question) = match self.tab {
            Tab::Hosts => match self.state.hosts().get(index) {
                Some(host) => (
                    Action::DeleteHost(index),
                    format!("Delete host '{}'?", host.name),
                ),
                None => return,
            },
            Tab::Profiles => match self.state.profiles().get(index) {
                Some(profile) => (
                    Action::DeleteProfile(index),
                    format!("Delete profile '{}'?", profile.name),
                ),
                None => return,
            },
        };
        self.mode = Mode::Confirm { action, question };
    }

    fn ui(&mut self, f: &mut Frame) {
        let size = f.size();
        let recs = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(size);

        let tabs = Tabs::new(vec!["SSH Hosts", "Terminal Profiles"])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Termina Launcher v{} ", CRATE_VERSION)),
            )
            .select(match self.tab {
                Tab::Hosts => 0,
                Tab::Profiles => 1,
            })
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
        f.render_widget(tabs, recs[0]);

        match self.tab {
            Tab::Hosts => self.hosts.render(f, recs[1], self.state.hosts()),
            Tab::Profiles => self.profiles.render(f, recs[1], self.state.profiles()),
        }

        let status = match &self.status {
            Some(Status::Info(message)) => {
                Paragraph::new(message.as_str()).style(Style::default().fg(Color::Green))
            }
            Some(Status::Error(message)) => {
                Paragraph::new(message.as_str()).style(Style::default().fg(Color::Red))
            }
            None => Paragraph::new(""),
        };
        f.render_widget(status, recs[2]);

        let info = match (self.tab, self.current_box().mode()) {
            (_, SearchMode::Search) => INFO_TEXT_SEARCH,
            (Tab::Hosts, _) => INFO_TEXT_HOSTS,
            (Tab::Profiles, _) => INFO_TEXT_PROFILES,
        };
        f.render_widget(Paragraph::new(Line::from(info)).alignment(Alignment::Center), recs[3]);

        match &mut self.mode {
            Mode::Browse => {}
            Mode::Form(form) => form.render(f, size),
            Mode::Confirm { question, .. } => {
                let area = centered_rect(size, 50, 5);
                let text = vec![
                    Line::from(question.as_str()),
                    Line::from("This action cannot be undone."),
                    Line::from("(y) yes | (n) no").alignment(Alignment::Center),
                ];
                f.render_widget(Clear, area);
                f.render_widget(
                    Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
                    area,
                );
            }
            Mode::Links { host, state } => {
                let links = self
                    .state
                    .hosts()
                    .get(*host)
                    .map(|host| host.links.as_slice())
                    .unwrap_or_default();
                let items: Vec<ListItem> = links
                    .iter()
                    .map(|link| {
                        ListItem::new(Line::from(vec![
                            Span::styled(link.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                            Span::raw("  "),
                            Span::styled(link.url.clone(), Style::default().fg(Color::Blue)),
                        ]))
                    })
                    .collect();
                let area = centered_rect(size, 60, links.len() as u16 + 2);
                let list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title(" Links "))
                    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
                f.render_widget(Clear, area);
                f.render_stateful_widget(list, area, state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Db, CONFIG_FILE};
    use crate::git_identity::Git;
    use crate::host::HostRecord;
    use crate::profile::TerminalProfile;
    use tempfile::TempDir;

    fn app() -> (App, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let (mut db, _) = Db::open(temp_dir.path().join(CONFIG_FILE));
        db.hosts = vec![
            HostRecord::new("web", "10.0.0.1"),
            HostRecord::new("db", "10.0.0.2"),
            HostRecord::new("mail", "10.0.0.3"),
        ];
        db.profiles = vec![TerminalProfile::new("work", "Jane", "jane@corp.com")];
        let launcher = Launcher::new(GnomeTerminal::new("no-such-terminal-here"), Git::default());
        (App::new(AppState::new(db), launcher), temp_dir)
    }

    fn press(app: &mut App, code: KeyCode) -> Flow {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn host_names(app: &App) -> Vec<&str> {
        app.state.hosts().iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn test_search_filters_visible_rows() {
        let (mut app, _temp) = app();
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "0.0.2");
        assert_eq!(app.hosts.visible(), &[1]);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.hosts.visible(), &[0, 1, 2]);
    }

    #[test]
    fn test_enter_with_single_match_reports_launch_error() {
        let (mut app, _temp) = app();
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "mail");
        assert!(matches!(press(&mut app, KeyCode::Enter), Flow::Continue));
        assert!(matches!(
            &app.status,
            Some(Status::Error(message)) if message.contains("no-such-terminal-here")
        ));
    }

    #[test]
    fn test_shift_arrow_reorders_and_follows_selection() {
        let (mut app, _temp) = app();
        app.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::SHIFT));
        assert_eq!(host_names(&app), vec!["db", "web", "mail"]);
        assert_eq!(app.hosts.selected(), Some(1));
    }

    #[test]
    fn test_delete_asks_for_confirmation() {
        let (mut app, _temp) = app();
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(host_names(&app).len(), 3);

        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(host_names(&app), vec!["db", "mail"]);
    }

    #[test]
    fn test_add_profile_through_form() {
        let (mut app, _temp) = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "home");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Jane");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "jane@home.org");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Browse));
        assert_eq!(app.state.profiles().len(), 2);
        assert_eq!(app.profiles.selected(), Some(1));
    }

    #[test]
    fn test_command_preview() {
        let (mut app, _temp) = app();
        press(&mut app, KeyCode::Char('c'));
        assert!(matches!(&app.status, Some(Status::Info(m)) if m == "ssh 10.0.0.1"));
    }

    #[test]
    fn test_escape_quits() {
        let (mut app, _temp) = app();
        assert!(matches!(press(&mut app, KeyCode::Esc), Flow::Exit(None)));
    }
}
