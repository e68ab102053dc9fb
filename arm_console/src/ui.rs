use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use arm_link::drivers::LinkState;
use arm_link::{JointLimits, JOINT_COUNT, JOINT_NAMES};

use crate::app::{App, Focus, Mode, KEY_HELP};

const STATUS_LINES: usize = 8;

pub fn draw(f: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // Link and jog
            Constraint::Min(10),    // Pose, frames, library
            Constraint::Length(STATUS_LINES as u16 + 2),
            Constraint::Length(3),  // Prompt
        ])
        .split(f.area());

    render_header(f, main_chunks[0], app);

    let data_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(40),
            Constraint::Percentage(26),
        ])
        .split(main_chunks[1]);

    render_joints(f, data_chunks[0], app);
    render_frames(f, data_chunks[1], app);
    render_library(f, data_chunks[2], app);

    let bottom_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_chunks[2]);

    render_status_log(f, bottom_chunks[0], app);
    render_help(f, bottom_chunks[1]);
    render_prompt(f, main_chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let client = &app.client;
    let link_color = match client.link_state() {
        LinkState::Connected => Color::Green,
        LinkState::Disconnected => Color::Red,
    };
    let settings = client.jog().settings();
    let active = match client.jog().active() {
        Some(session) => session.axis.direction_label(session.direction).to_string(),
        None => "None".to_string(),
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Link: ", Style::default().fg(Color::Cyan)),
            Span::styled(client.link_state().label(), Style::default().fg(link_color).add_modifier(Modifier::BOLD)),
            Span::styled("   Play: ", Style::default().fg(Color::Cyan)),
            Span::styled(client.play_state(), Style::default().fg(Color::Yellow)),
            Span::styled("   Hold: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{} ms", app.hold_ms)),
        ]),
        Line::from(vec![
            Span::styled("Jog step: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{}\u{b0}", settings.step_degrees())),
            Span::styled("   Period: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{} ms", settings.period_ms())),
            Span::styled("   Active jog: ", Style::default().fg(Color::Cyan)),
            Span::styled(active, Style::default().fg(Color::Magenta)),
            Span::raw(if app.release_events { "   (hold keys)" } else { "   (press again to stop)" }),
        ]),
    ];

    let block = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Arm"));
    f.render_widget(block, area);
}

fn render_joints(f: &mut Frame, area: Rect, app: &App) {
    let pose = app.client.pose().snapshot();
    let mut lines = Vec::with_capacity(JOINT_COUNT);
    for (index, name) in JOINT_NAMES.iter().enumerate() {
        let angle = pose.get(index).unwrap_or_default();
        let limits = JointLimits::for_joint(index).unwrap_or(JointLimits::ARM);
        let marker = if index == app.selected_joint { "> " } else { "  " };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Yellow)),
            Span::styled(format!("{:<11}", name), Style::default().fg(Color::Cyan)),
            Span::raw(format!("{:>4}\u{b0} ", angle)),
            Span::styled(
                format!("[{}..{}]", limits.min, limits.max),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Pose")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(paragraph, area);
}

fn render_frames(f: &mut Frame, area: Rect, app: &App) {
    let recorder = app.client.recorder();
    let focused = app.focus == Focus::Frames;
    let items: Vec<ListItem> = recorder
        .rows()
        .map(|row| {
            let style = if focused && row.index == app.frame_cursor {
                Style::default().bg(Color::Blue)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("#{:<3}", row.index), Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{:>5} ms  ", row.hold)),
                Span::raw(format!("[{}]", row.pose)),
            ]))
            .style(style)
        })
        .collect();

    let name = match recorder.name() {
        "" => "<unnamed>",
        name => name,
    };
    let mut title = format!("Frames: {} ({})", name, recorder.frame_count());
    if app.client.is_saving() {
        title.push_str(" saving...");
    }

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title).border_style(border(focused)));
    f.render_widget(list, area);
}

fn render_library(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Library;
    let items: Vec<ListItem> = if app.client.library().is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No saved actions",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        app.client
            .library()
            .names()
            .enumerate()
            .map(|(index, name)| {
                let style = if focused && index == app.library_cursor {
                    Style::default().bg(Color::Blue)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(name.to_string())).style(style)
            })
            .collect()
    };

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Library").border_style(border(focused)));
    f.render_widget(list, area);
}

fn render_status_log(f: &mut Frame, area: Rect, app: &App) {
    let messages: Vec<&str> = app.client.status_log().collect();
    let items: Vec<ListItem> = messages
        .iter()
        .rev() // Newest first
        .take(STATUS_LINES)
        .map(|msg| ListItem::new(Line::from(vec![Span::styled("\u{2022} ", Style::default().fg(Color::Green)), Span::raw(*msg)])))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Controller")
            .border_style(Style::default().fg(Color::Green)),
    );
    f.render_widget(list, area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = KEY_HELP
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{:<26}", keys), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(*action),
            ])
        })
        .collect();

    let help_block = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help_block, area);
}

fn render_prompt(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.mode {
        Mode::Normal => Line::from(app.prompt.as_str()),
        Mode::EditName(buffer) => Line::from(vec![
            Span::styled("Action name: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{}_", buffer)),
        ]),
        Mode::EditHold(buffer) => Line::from(vec![
            Span::styled("Hold (ms): ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{}_", buffer)),
        ]),
        Mode::ConfirmDelete(_) => Line::from(Span::styled(app.prompt.as_str(), Style::default().fg(Color::Red))),
    };

    let prompt = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(prompt, area);
}

fn border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}
