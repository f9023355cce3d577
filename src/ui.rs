use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use mood_diary::insights::MoodSummary;
use mood_diary::entry::MAX_INTENSITY;
use mood_diary::{infer, DiaryEntry, MoodLabel};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::{Duration, Instant},
};
use unicode_width::UnicodeWidthChar;

const PREVIEW_WIDTH: usize = 60;
const REFRESH: Duration = Duration::from_millis(500);

pub enum Action {
    Write,
    View,
    Edit,
    Delete,
    Insights,
    Sync,
    Quit,
}

/// Text and mood choice coming out of the editor. `mood == None` means
/// "let the classifier decide".
pub struct Draft {
    pub notes: String,
    pub mood: Option<MoodLabel>,
    pub intensity: u8,
}

const INTENSITY_STEP: u8 = 10;

fn step_intensity(value: u8, up: bool) -> u8 {
    if up {
        value.saturating_add(INTENSITY_STEP).min(MAX_INTENSITY)
    } else {
        value.saturating_sub(INTENSITY_STEP)
    }
}

fn intensity_bar(value: u8) -> String {
    let filled = usize::from(value / INTENSITY_STEP);
    format!("{}{} {value}", "█".repeat(filled), "░".repeat(10 - filled))
}

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    cursor_position: usize,
    cursor_visible: bool,
    last_cursor_update: Instant,
    status: Option<String>,
}

fn title(text: impl Into<String>) -> Paragraph<'static> {
    Paragraph::new(text.into())
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
}

fn instructions(text: impl Into<String>) -> Paragraph<'static> {
    Paragraph::new(text.into())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
}

fn three_rows(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area)
}

/// Cut `text` to at most `max` terminal columns, marking the cut with `…`.
fn truncate_to_width(text: &str, max: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max.saturating_sub(1) {
            out.push('…');
            return out;
        }
        width += w;
        out.push(c);
    }
    out
}

fn sync_marker(entry: &DiaryEntry) -> &'static str {
    if entry.synced {
        "✓"
    } else {
        "●"
    }
}

fn entry_item(entry: &DiaryEntry) -> ListItem<'static> {
    ListItem::new(vec![
        Line::from(Span::raw(format!(
            "[{}] {} {}",
            entry.date.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            entry.mood.with_emoji(),
            sync_marker(entry),
        ))),
        Line::from(Span::styled(
            truncate_to_width(entry.notes.lines().next().unwrap_or(""), PREVIEW_WIDTH),
            Style::default().fg(Color::Gray),
        )),
    ])
}

fn preview_lines(text: &str) -> Vec<Line<'static>> {
    let inference = infer(text);
    let scores = inference
        .per_mood_scores
        .iter()
        .filter(|(_, s)| **s > 0.0)
        .map(|(m, s)| format!("{} {:.2}", m.emoji(), s))
        .collect::<Vec<_>>()
        .join("  ");
    vec![
        Line::from(vec![
            Span::raw("Mood preview: "),
            Span::styled(
                inference.mood.with_emoji(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  ({:.0}% confident)", inference.confidence * 100.0)),
        ]),
        Line::from(Span::raw(scores)),
    ]
}

fn prev_boundary(s: &str, i: usize) -> usize {
    s[..i].char_indices().next_back().map(|(j, _)| j).unwrap_or(0)
}

fn next_boundary(s: &str, i: usize) -> usize {
    s[i..].chars().next().map(|c| i + c.len_utf8()).unwrap_or(i)
}

fn line_start(s: &str, i: usize) -> usize {
    s[..i].rfind('\n').map(|j| j + 1).unwrap_or(0)
}

/// Byte offset of column `col` (in chars) within `line`, clamped to its end.
fn column_offset(line: &str, col: usize) -> usize {
    line.char_indices().nth(col).map(|(b, _)| b).unwrap_or(line.len())
}

fn cursor_up(s: &str, i: usize) -> usize {
    let start = line_start(s, i);
    if start == 0 {
        return i;
    }
    let col = s[start..i].chars().count();
    let prev_start = line_start(s, start - 1);
    prev_start + column_offset(&s[prev_start..start - 1], col)
}

fn cursor_down(s: &str, i: usize) -> usize {
    let Some(rel) = s[i..].find('\n') else {
        return i;
    };
    let col = s[line_start(s, i)..i].chars().count();
    let next_start = i + rel + 1;
    let next_end = s[next_start..]
        .find('\n')
        .map(|j| next_start + j)
        .unwrap_or(s.len());
    next_start + column_offset(&s[next_start..next_end], col)
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            cursor_position: 0,
            cursor_visible: true,
            last_cursor_update: Instant::now(),
            status: None,
        })
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn display(&mut self, entries: &[DiaryEntry], online: bool) -> Result<()> {
        let pending = entries.iter().filter(|e| e.is_pending()).count();
        let status = self.status.clone();
        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(0),
                        Constraint::Length(1),
                        Constraint::Length(3),
                    ]
                    .as_ref(),
                )
                .split(f.area());

            f.render_widget(title("Mood Diary"), chunks[0]);

            let items: Vec<ListItem> = entries.iter().map(entry_item).collect();
            let entries_list = List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Entries ({} pending)", pending)),
            );
            f.render_widget(entries_list, chunks[1]);

            let connection = if online { "online" } else { "offline" };
            let status_line = match &status {
                Some(s) => format!("[{}] {}", connection, s),
                None => format!("[{}]", connection),
            };
            f.render_widget(
                Paragraph::new(status_line).style(Style::default().fg(Color::Magenta)),
                chunks[2],
            );

            let mut keys = vec![Span::raw("Press ")];
            let mut push_key = |key: &'static str, label: &'static str| {
                keys.push(Span::styled(key, Style::default().add_modifier(Modifier::BOLD)));
                keys.push(Span::raw(label));
            };
            push_key("w", " to write, ");
            if !entries.is_empty() {
                push_key("v", " to view, ");
                push_key("e", " to edit, ");
                push_key("d", " to delete, ");
                push_key("i", " for insights, ");
            }
            push_key("y", " to sync, ");
            push_key("q", " to quit");
            let controls = Paragraph::new(Line::from(keys))
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            f.render_widget(controls, chunks[3]);
        })?;

        Ok(())
    }

    /// Waits briefly for a key so the caller can redraw when sync state changes.
    pub fn handle_input(&self, entries: &[DiaryEntry]) -> Result<Option<Action>> {
        if !event::poll(REFRESH)? {
            return Ok(None);
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                return Ok(None);
            }
            let has_entries = !entries.is_empty();
            match key.code {
                KeyCode::Char('w') => Ok(Some(Action::Write)),
                KeyCode::Char('q') => Ok(Some(Action::Quit)),
                KeyCode::Char('y') => Ok(Some(Action::Sync)),
                KeyCode::Char('v') if has_entries => Ok(Some(Action::View)),
                KeyCode::Char('e') if has_entries => Ok(Some(Action::Edit)),
                KeyCode::Char('d') if has_entries => Ok(Some(Action::Delete)),
                KeyCode::Char('i') if has_entries => Ok(Some(Action::Insights)),
                _ => Ok(None),
            }
        } else {
            Ok(None)
        }
    }

    /// Text editor with a live mood preview, followed by the mood picker.
    /// Returns `None` when the user backs out of the picker.
    pub fn compose(
        &mut self,
        heading: &str,
        initial: &str,
        initial_mood: Option<MoodLabel>,
        initial_intensity: u8,
    ) -> Result<Option<Draft>> {
        let mut content = initial.to_string();
        self.cursor_position = content.len();
        let mut last_content_update = Instant::now();

        loop {
            let now = Instant::now();
            let should_update_cursor =
                now.duration_since(self.last_cursor_update) >= Duration::from_millis(500);
            let should_redraw = should_update_cursor
                || now.duration_since(last_content_update) < Duration::from_millis(50);

            if should_redraw {
                let content_with_cursor = if self.cursor_visible {
                    let mut content_clone = content.clone();
                    content_clone.insert(self.cursor_position, '|');
                    content_clone
                } else {
                    content.clone()
                };
                let preview = preview_lines(&content);

                self.terminal.draw(|f| {
                    let chunks = Layout::default()
                        .direction(Direction::Vertical)
                        .margin(1)
                        .constraints(
                            [
                                Constraint::Length(3),
                                Constraint::Min(10),
                                Constraint::Length(4),
                                Constraint::Length(3),
                            ]
                            .as_ref(),
                        )
                        .split(f.area());

                    f.render_widget(title(heading.to_string()), chunks[0]);

                    let content_input = Paragraph::new(content_with_cursor)
                        .wrap(Wrap { trim: false })
                        .block(Block::default().borders(Borders::ALL).title("Notes"));
                    f.render_widget(content_input, chunks[1]);

                    let preview_box = Paragraph::new(preview)
                        .block(Block::default().borders(Borders::ALL).title("Detected mood"));
                    f.render_widget(preview_box, chunks[2]);

                    f.render_widget(instructions("Press Esc to finish writing"), chunks[3]);
                })?;

                if should_update_cursor {
                    self.cursor_visible = !self.cursor_visible;
                    self.last_cursor_update = now;
                }
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Esc => break,
                        KeyCode::Char(c) => {
                            content.insert(self.cursor_position, c);
                            self.cursor_position += c.len_utf8();
                        }
                        KeyCode::Enter => {
                            content.insert(self.cursor_position, '\n');
                            self.cursor_position += 1;
                        }
                        KeyCode::Backspace => {
                            if self.cursor_position > 0 {
                                let prev = prev_boundary(&content, self.cursor_position);
                                content.replace_range(prev..self.cursor_position, "");
                                self.cursor_position = prev;
                            }
                        }
                        KeyCode::Delete => {
                            if self.cursor_position < content.len() {
                                let next = next_boundary(&content, self.cursor_position);
                                content.replace_range(self.cursor_position..next, "");
                            }
                        }
                        KeyCode::Left => {
                            self.cursor_position = prev_boundary(&content, self.cursor_position);
                        }
                        KeyCode::Right => {
                            self.cursor_position = next_boundary(&content, self.cursor_position);
                        }
                        KeyCode::Up => {
                            self.cursor_position = cursor_up(&content, self.cursor_position);
                        }
                        KeyCode::Down => {
                            self.cursor_position = cursor_down(&content, self.cursor_position);
                        }
                        _ => continue,
                    }
                    last_content_update = Instant::now();
                }
            }
        }

        match self.pick_mood(&content, initial_mood, initial_intensity)? {
            Some((mood, intensity)) => Ok(Some(Draft {
                notes: content,
                mood,
                intensity,
            })),
            None => Ok(None),
        }
    }

    /// A `None` mood keeps the detected one, `Some(m)` overrides it.
    /// Returns `None` on cancel.
    fn pick_mood(
        &mut self,
        content: &str,
        initial: Option<MoodLabel>,
        initial_intensity: u8,
    ) -> Result<Option<(Option<MoodLabel>, u8)>> {
        let mut intensity = initial_intensity.min(MAX_INTENSITY);
        let detected = infer(content).mood;
        let mut choices: Vec<Option<MoodLabel>> = vec![None];
        choices.extend(MoodLabel::ALL.into_iter().map(Some));
        let mut selected_index = choices.iter().position(|c| *c == initial).unwrap_or(0);

        loop {
            self.terminal.draw(|f| {
                let chunks = three_rows(f.area());
                f.render_widget(title("How are you feeling?"), chunks[0]);

                let items: Vec<ListItem> = choices
                    .iter()
                    .map(|c| match c {
                        None => ListItem::new(format!("Auto (detected: {})", detected.with_emoji())),
                        Some(m) => ListItem::new(m.with_emoji()),
                    })
                    .collect();
                let list = List::new(items)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(format!("Mood · intensity {}", intensity_bar(intensity))),
                    )
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                    .highlight_symbol("> ");
                f.render_stateful_widget(
                    list,
                    chunks[1],
                    &mut ListState::default().with_selected(Some(selected_index)),
                );

                f.render_widget(
                    instructions("Up/Down: Choose, Left/Right: Intensity, Enter: Save, Esc: Discard"),
                    chunks[2],
                );
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Up => selected_index = selected_index.saturating_sub(1),
                    KeyCode::Down => {
                        if selected_index < choices.len() - 1 {
                            selected_index += 1;
                        }
                    }
                    KeyCode::Left => intensity = step_intensity(intensity, false),
                    KeyCode::Right => intensity = step_intensity(intensity, true),
                    KeyCode::Enter => return Ok(Some((choices[selected_index], intensity))),
                    KeyCode::Esc => return Ok(None),
                    _ => {}
                }
            }
        }
    }

    pub fn view_entries(&mut self, entries: &[DiaryEntry]) -> Result<()> {
        let mut selected_index = 0;

        loop {
            self.terminal.draw(|f| {
                let chunks = three_rows(f.area());
                f.render_widget(title("View Entries"), chunks[0]);

                let items: Vec<ListItem> = entries.iter().map(entry_item).collect();
                let entries_list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title("Entries"))
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                    .highlight_symbol("> ");

                f.render_stateful_widget(
                    entries_list,
                    chunks[1],
                    &mut ListState::default().with_selected(Some(selected_index)),
                );

                f.render_widget(
                    instructions("Up/Down: Navigate, Enter: View full entry, Esc: Back"),
                    chunks[2],
                );
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Up => selected_index = selected_index.saturating_sub(1),
                    KeyCode::Down => {
                        if selected_index + 1 < entries.len() {
                            selected_index += 1;
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(entry) = entries.get(selected_index) {
                            self.view_full_entry(entry)?;
                        }
                    }
                    KeyCode::Esc => break,
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn view_full_entry(&mut self, entry: &DiaryEntry) -> Result<()> {
        let inference = infer(&entry.notes);
        loop {
            self.terminal.draw(|f| {
                let chunks = three_rows(f.area());

                f.render_widget(
                    title(format!(
                        "{} · {} ({}) · {}",
                        entry.date.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                        entry.mood.with_emoji(),
                        entry.intensity,
                        if entry.synced { "synced" } else { "pending sync" },
                    )),
                    chunks[0],
                );

                let mut body: Vec<Line> = entry.notes.lines().map(|l| Line::from(l.to_string())).collect();
                body.push(Line::from(""));
                body.push(Line::from(Span::styled(
                    format!(
                        "Classifier says {} ({:.0}% confident)",
                        inference.mood.with_emoji(),
                        inference.confidence * 100.0
                    ),
                    Style::default().fg(Color::Gray),
                )));
                let content = Paragraph::new(body)
                    .wrap(Wrap { trim: false })
                    .block(Block::default().borders(Borders::ALL).title("Notes"));
                f.render_widget(content, chunks[1]);

                f.render_widget(instructions("Any key: Back"), chunks[2]);
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    break;
                }
            }
        }

        Ok(())
    }

    pub fn select_entry(&mut self, entries: &[DiaryEntry], heading: &str) -> Result<Option<DiaryEntry>> {
        let mut selected_index = 0;

        loop {
            self.terminal.draw(|f| {
                let chunks = three_rows(f.area());
                f.render_widget(title(heading.to_string()), chunks[0]);

                let items: Vec<ListItem> = entries.iter().map(entry_item).collect();
                let entries_list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title("Entries"))
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                    .highlight_symbol("> ");

                f.render_stateful_widget(
                    entries_list,
                    chunks[1],
                    &mut ListState::default().with_selected(Some(selected_index)),
                );

                f.render_widget(
                    instructions("Up/Down: Navigate, Enter: Select, Esc: Cancel"),
                    chunks[2],
                );
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Up => selected_index = selected_index.saturating_sub(1),
                    KeyCode::Down => {
                        if selected_index + 1 < entries.len() {
                            selected_index += 1;
                        }
                    }
                    KeyCode::Enter => return Ok(entries.get(selected_index).cloned()),
                    KeyCode::Esc => return Ok(None),
                    _ => {}
                }
            }
        }
    }

    pub fn display_insights(&mut self, week: &MoodSummary, all_time: &MoodSummary) -> Result<()> {
        fn rows(summary: &MoodSummary) -> Vec<Line<'static>> {
            let mut lines: Vec<Line> = summary
                .counts
                .iter()
                .map(|(mood, count)| {
                    let bar = "█".repeat((summary.share(*mood) * 20.0).round() as usize);
                    Line::from(format!("{:<12} {:>4}  {}", mood.with_emoji(), count, bar))
                })
                .collect();
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("{} entries, mostly {}", summary.total, summary.dominant.with_emoji()),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            if let Some(average) = summary.average_intensity {
                lines.push(Line::from(format!("Average intensity {average}")));
            }
            lines
        }

        loop {
            self.terminal.draw(|f| {
                let chunks = three_rows(f.area());
                f.render_widget(
                    title(format!("Insights · {} pending sync", all_time.pending)),
                    chunks[0],
                );

                let columns = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
                    .split(chunks[1]);
                f.render_widget(
                    Paragraph::new(rows(week))
                        .block(Block::default().borders(Borders::ALL).title("Last 7 days")),
                    columns[0],
                );
                f.render_widget(
                    Paragraph::new(rows(all_time))
                        .block(Block::default().borders(Borders::ALL).title("All time")),
                    columns[1],
                );

                f.render_widget(instructions("Any key: Back"), chunks[2]);
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    break;
                }
            }
        }

        Ok(())
    }

    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            self.terminal.draw(|f: &mut Frame| {
                let chunks = three_rows(f.area());
                f.render_widget(title("Confirm"), chunks[0]);
                f.render_widget(
                    Paragraph::new(question.to_string())
                        .wrap(Wrap { trim: true })
                        .block(Block::default().borders(Borders::ALL)),
                    chunks[1],
                );
                f.render_widget(instructions("y: Yes, n/Esc: No"), chunks[2]);
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('y') => return Ok(true),
                    KeyCode::Char('n') | KeyCode::Esc => return Ok(false),
                    _ => {}
                }
            }
        }
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
