use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use ticklist_core::tasks::{Priority, Task, TaskPersistence};

use super::{
    app::{App, Mode},
    form::{EditSession, Field},
};

pub fn draw<P: TaskPersistence>(frame: &mut Frame, app: &App<P>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(header(app), chunks[0]);
    draw_tasks(frame, app, chunks[1]);
    frame.render_widget(footer(app), chunks[2]);

    if let Mode::Form(session) = app.mode() {
        draw_form(frame, session);
    }
}

fn header<P: TaskPersistence>(app: &App<P>) -> Paragraph<'static> {
    let store = app.store();
    let mut spans = vec![
        Span::styled(
            "Ticklist",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {}", app.stats())),
        Span::raw("  filter: "),
        Span::styled(
            store.filter().to_string(),
            Style::default().fg(Color::Yellow),
        ),
    ];
    if !store.can_persist() {
        spans.push(Span::styled(
            "  not saving",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    if !app.search_input().is_empty() || *app.mode() == Mode::Search {
        spans.push(Span::raw("  search: "));
        spans.push(Span::styled(
            app.search_input().to_string(),
            Style::default().add_modifier(Modifier::UNDERLINED),
        ));
    }

    Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    )
}

fn draw_tasks<P: TaskPersistence>(frame: &mut Frame, app: &App<P>, area: Rect) {
    let visible = app.visible();
    let block = Block::default().borders(Borders::ALL).title("Tasks");

    if visible.is_empty() {
        let message = if app.store().tasks().is_empty() {
            "No tasks yet. Press a to add one."
        } else {
            "No tasks match the current filter."
        };
        let empty = Paragraph::new(Span::styled(
            message,
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = visible
        .iter()
        .map(|task| ListItem::new(task_line(task, app)))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(app.selected()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn task_line<'a, P: TaskPersistence>(task: &'a Task, app: &App<P>) -> Line<'a> {
    let done = task.completed();
    let text_style = if done {
        Style::default().add_modifier(Modifier::CROSSED_OUT | Modifier::DIM)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let mut spans = vec![
        Span::styled(
            if done { "[x] " } else { "[ ] " },
            Style::default().fg(if done { Color::Green } else { Color::Gray }),
        ),
        Span::styled(task.text(), text_style),
        Span::raw(" "),
        Span::styled(
            task.priority().as_str(),
            Style::default().fg(priority_color(task.priority())),
        ),
    ];
    if let Some(category) = task.category() {
        spans.push(Span::styled(
            format!(" #{category}"),
            Style::default().fg(Color::Blue),
        ));
    }
    if let Some(due) = task.due_date() {
        spans.push(Span::raw(format!(" due {due}")));
    }
    if task.is_overdue(app.today()) {
        spans.push(Span::styled(
            " overdue",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::Green,
        Priority::Medium => Color::Yellow,
        Priority::High => Color::Red,
    }
}

fn footer<P: TaskPersistence>(app: &App<P>) -> Paragraph<'static> {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));

    let line = if let Some(toast) = app.toast() {
        Line::from(Span::styled(
            toast.message.clone(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ))
    } else {
        match app.mode() {
            Mode::Search => Line::from(vec![
                Span::raw("Type to search, "),
                key("Enter"),
                Span::raw(" keep, "),
                key("Esc"),
                Span::raw(" clear"),
            ]),
            Mode::Form(_) => Line::from(vec![
                key("Tab"),
                Span::raw(" next field, "),
                key("Enter"),
                Span::raw(" save, "),
                key("Esc"),
                Span::raw(" cancel"),
            ]),
            Mode::Normal => Line::from(vec![
                key("a"),
                Span::raw(" add  "),
                key("e"),
                Span::raw(" edit  "),
                key("space"),
                Span::raw(" toggle  "),
                key("d"),
                Span::raw(" delete  "),
                key("f/1/2/3"),
                Span::raw(" filter  "),
                key("/"),
                Span::raw(" search  "),
                key("q"),
                Span::raw(" quit"),
            ]),
        }
    };

    Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Controls"))
}

fn draw_form(frame: &mut Frame, session: &EditSession) {
    let area = centered(frame.area(), 60, 8);
    frame.render_widget(Clear, area);

    let lines: Vec<Line> = Field::ALL
        .iter()
        .map(|&field| {
            let focused = field == session.focus;
            let label_style = if focused {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let mut value = session.value(field).to_string();
            if focused && field != Field::Priority {
                value.push('_');
            }
            Line::from(vec![
                Span::styled(format!("{:<18}", field.label()), label_style),
                Span::raw(value),
            ])
        })
        .collect();

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(session.title()),
    );
    frame.render_widget(form, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}
