use crossterm::event::Event;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::host::HostRecord;
use crate::input::InputBuffer;
use crate::profile::TerminalProfile;

const SEARCH_PROMPT: &str = "Search: ";

/// Something that can be shown as a two-column row.
pub trait Listable {
    fn columns(&self) -> [String; 2];
}

impl Listable for HostRecord {
    fn columns(&self) -> [String; 2] {
        [self.display_text(), self.links_text()]
    }
}

impl Listable for TerminalProfile {
    fn columns(&self) -> [String; 2] {
        [self.display_text(), self.working_dir.clone()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Normal,
    Search,
}

/// View state of one searchable list: which rows are visible and which is
/// selected. The records themselves live in the app state.
pub(crate) struct SelectBox {
    headers: [&'static str; 2],
    state: TableState,
    /// Indices into the full list, in display order.
    visible: Vec<usize>,
    input_buffer: InputBuffer,
    mode: Mode,
}

impl SelectBox {
    pub fn new(headers: [&'static str; 2]) -> Self {
        Self {
            headers,
            state: TableState::default(),
            visible: Vec::new(),
            input_buffer: InputBuffer::new(SEARCH_PROMPT),
            mode: Mode::Normal,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn filter(&self) -> &str {
        self.input_buffer.input.value()
    }

    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    /// Full-list index of the highlighted row.
    pub fn selected(&self) -> Option<usize> {
        self.state.selected().and_then(|i| self.visible.get(i).copied())
    }

    /// Replaces the visible rows, keeping the current row highlighted if it
    /// is still shown, or moving to `select` (a full-list index) if given.
    pub fn refresh(&mut self, visible: Vec<usize>, select: Option<usize>) {
        let target = select.or_else(|| self.selected());
        self.visible = visible;

        let row = target
            .and_then(|index| self.visible.iter().position(|i| *i == index))
            .or_else(|| (!self.visible.is_empty()).then_some(0));
        self.state.select(row);
    }

    pub fn start_search(&mut self) {
        self.mode = Mode::Search;
        self.input_buffer.reset();
    }

    pub fn stop_search(&mut self) {
        self.mode = Mode::Normal;
        self.input_buffer.reset();
    }

    pub fn handle_search_event(&mut self, event: Event) {
        self.input_buffer.handle_event(event);
    }

    pub fn up(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    self.visible.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i))
    }

    pub fn down(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= self.visible.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i))
    }

    pub fn render<T: Listable>(&mut self, f: &mut Frame, area: Rect, items: &[T]) {
        let header = Row::new(self.headers.map(|title| {
            Cell::from(title).style(Style::default().add_modifier(Modifier::UNDERLINED))
        }))
        .style(Style::default().add_modifier(Modifier::BOLD));

        let filter = self.filter().to_string();
        let rows: Vec<Row> = self
            .visible
            .iter()
            .filter_map(|i| items.get(*i))
            .map(|item| {
                let [label, extra] = item.columns();
                let label = Line::from(get_highlight_spans(&label, &match_indices(&label, &filter)));
                let extra = Span::styled(extra, Style::default().fg(Color::Blue));
                Row::new([Cell::from(label), Cell::from(extra)])
            })
            .collect();

        let (table_area, search_area) = if self.mode == Mode::Search {
            let recs = Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).split(area);
            (recs[0], Some(recs[1]))
        } else {
            (area, None)
        };

        let table = Table::new(rows, [Constraint::Percentage(65), Constraint::Percentage(35)])
            .header(header)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_spacing(HighlightSpacing::Always);
        f.render_stateful_widget(table, table_area, &mut self.state);

        if let Some(search_area) = search_area {
            let input = Paragraph::new(
                Text::from(self.input_buffer.line()).style(Style::default().fg(Color::Cyan)),
            )
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(input, search_area);
            f.set_cursor(
                search_area.x + 1 + self.input_buffer.visual_cursor() as u16,
                search_area.y + 1,
            );
        }
    }
}

/// Char positions of the first case-insensitive occurrence of `filter` in `text`.
fn match_indices(text: &str, filter: &str) -> Vec<usize> {
    let needle: Vec<char> = filter.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Vec::new();
    }
    let haystack: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
    // lowercasing changed the length, positions would not line up
    if haystack.len() != text.chars().count() {
        return Vec::new();
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .map(|start| (start..start + needle.len()).collect())
        .unwrap_or_default()
}

fn get_highlight_spans<'b>(input: &str, indices: &[usize]) -> Vec<Span<'b>> {
    let mut spans = Vec::new();
    let mut current_segment = String::new();

    let highlight_style = Style::default()
        .fg(Color::Rgb(250, 0, 0))
        .bg(Color::Rgb(0xFF, 0xFC, 0x67))
        .add_modifier(Modifier::BOLD);
    for (i, c) in input.chars().enumerate() {
        if indices.contains(&i) {
            if !current_segment.is_empty() {
                spans.push(Span::raw(current_segment.clone()));
                current_segment.clear();
            }
            spans.push(Span::styled(c.to_string(), highlight_style));
        } else {
            current_segment.push(c);
        }
    }

    if !current_segment.is_empty() {
        spans.push(Span::raw(current_segment));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_indices() {
        assert_eq!(match_indices("Production", "duc"), vec![3, 4, 5]);
        assert_eq!(match_indices("web - root@h", "ROOT"), vec![6, 7, 8, 9]);
        assert!(match_indices("web", "").is_empty());
        assert!(match_indices("web", "db").is_empty());
    }

    #[test]
    fn test_highlight_spans_split_segments() {
        let spans = get_highlight_spans("abcd", &[1, 2]);
        let text: Vec<_> = spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(text, vec!["a", "b", "c", "d"]);
        assert_eq!(spans[0].style, Style::default());
        assert_ne!(spans[1].style, Style::default());
    }

    #[test]
    fn test_refresh_keeps_selection_by_record() {
        let mut select_box = SelectBox::new(["A", "B"]);
        select_box.refresh(vec![0, 1, 2], None);
        assert_eq!(select_box.selected(), Some(0));

        select_box.down();
        select_box.down();
        assert_eq!(select_box.selected(), Some(2));

        // filtered view still containing record 2
        select_box.refresh(vec![1, 2], None);
        assert_eq!(select_box.selected(), Some(2));

        // record gone: first visible row
        select_box.refresh(vec![0, 1], None);
        assert_eq!(select_box.selected(), Some(0));

        select_box.refresh(vec![0, 1], Some(1));
        assert_eq!(select_box.selected(), Some(1));

        select_box.refresh(Vec::new(), None);
        assert_eq!(select_box.selected(), None);
    }

    #[test]
    fn test_up_down_wrap() {
        let mut select_box = SelectBox::new(["A", "B"]);
        select_box.up();
        assert_eq!(select_box.selected(), None);

        select_box.refresh(vec![4, 7], None);
        select_box.up();
        assert_eq!(select_box.selected(), Some(7));
        select_box.down();
        assert_eq!(select_box.selected(), Some(4));
    }
}
