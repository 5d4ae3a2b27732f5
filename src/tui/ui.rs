use super::app::{App, Page};
use crate::storage::QuerySummary;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::vertical([
        Constraint::Length(1), // Header (single line, no border)
        Constraint::Min(3),    // Main content
        Constraint::Length(1), // Footer (single line, no border)
    ])
    .split(frame.area());

    render_header(frame, app, chunks[0]);
    match app.page() {
        Page::Queries => render_queries(frame, app, chunks[1]),
        Page::FlameGraph => render_flame_graph(frame, app, chunks[1]),
        Page::StackDetail => render_stack_detail(frame, app, chunks[1]),
    }
    render_footer(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let file_name = app
        .source()
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "profile".to_string());

    let page = match app.page() {
        Page::Queries => " QUERIES ",
        Page::FlameGraph => " FLAME ",
        Page::StackDetail => " STACK ",
    };

    let mut spans = vec![
        Span::styled(
            "flamescope",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(page, Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(format!(" {}", file_name)),
    ];
    if let Some(query_id) = app.query_id()
        && app.page() != Page::Queries
    {
        spans.push(Span::raw(format!(" │ {}", query_id)));
    }
    if let Some(refresh) = app.refresh() {
        spans.push(Span::raw(format!(" │ every {}", humantime::format_duration(refresh))));
    }
    if app.is_loading() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " LOADING ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ));
    }
    if let Some(status) = app.status() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(status.to_string(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_queries(frame: &mut Frame, app: &mut App, area: Rect) {
    app.set_table_area(area);

    let block = Block::default()
        .title(" Queries ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let header_cells = ["Samples", "Stacks", "Query"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells).height(1);

    let queries = app.queries();
    let total: u64 = queries.iter().map(|q| q.samples).sum();
    let selected = app.selected_row().min(queries.len().saturating_sub(1));
    let visible_height = area.height.saturating_sub(3) as usize;
    let max_scroll = queries.len().saturating_sub(visible_height.max(1));
    let scroll_offset = app.scroll_offset().min(max_scroll);

    let rows: Vec<Row> = queries
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_height.max(1))
        .map(|(i, q)| query_row(q, total, i == selected))
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn query_row(q: &QuerySummary, total: u64, selected: bool) -> Row<'static> {
    let pct = if total == 0 {
        0.0
    } else {
        q.samples as f64 * 100.0 / total as f64
    };
    let style = if selected {
        Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Row::new(vec![
        Cell::from(format!("{} {:>5.1}%", format_count(q.samples), pct))
            .style(Style::default().fg(color_for_percent(pct))),
        Cell::from(q.stacks.to_string()),
        Cell::from(q.query_id.clone()),
    ])
    .style(style)
}

fn render_flame_graph(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = match app.flame().focused_summary() {
        Some((name, count, pct)) => {
            format!(" {} │ {} samples │ {:.1}% ", name, format_count(count), pct)
        }
        None => " Flame graph ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(app.flame_mut(), inner);
}

fn render_stack_detail(frame: &mut Frame, app: &mut App, area: Rect) {
    let lines: Vec<Line> = match app.detail_stack() {
        Some((stack, count)) => {
            let mut lines: Vec<Line> = stack
                .iter()
                .enumerate()
                .map(|(depth, label)| {
                    Line::from(vec![
                        Span::styled(
                            format!("{:>3} ", depth),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::raw(label.clone()),
                    ])
                })
                .collect();
            lines.push(Line::from(Span::styled(
                format!("{} samples", format_count(*count)),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines
        }
        None => vec![Line::from("No stack selected")],
    };

    // Stack list gets at most a third of the page
    let list_height = (lines.len() as u16 + 2).min(area.height / 3).max(3);
    let chunks =
        Layout::vertical([Constraint::Length(list_height), Constraint::Min(3)]).split(area);

    let list = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" Stack ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(list, chunks[0]);

    let block = Block::default()
        .title(" Callees ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(chunks[1]);
    frame.render_widget(block, chunks[1]);
    frame.render_widget(app.detail_mut(), inner);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let key = |k: &str| Span::styled(format!(" {} ", k), Style::default().bg(Color::DarkGray));
    let mut spans = vec![key("q"), Span::raw(" quit ")];

    match app.page() {
        Page::Queries => {
            spans.push(key("j/k"));
            spans.push(Span::raw(" nav "));
            spans.push(key("Enter"));
            spans.push(Span::raw(" open "));
            spans.push(key("r"));
            spans.push(Span::raw(" reload "));
        }
        Page::FlameGraph | Page::StackDetail => {
            spans.push(key("h/j/k/l"));
            spans.push(Span::raw(" move "));
            spans.push(key("Enter"));
            spans.push(Span::raw(" select "));
            spans.push(key("Esc"));
            spans.push(Span::raw(" back "));
            if app.page() == Page::FlameGraph {
                spans.push(key("r"));
                spans.push(Span::raw(" reload "));
            }
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn color_for_percent(pct: f64) -> Color {
    if pct >= 20.0 {
        Color::Red
    } else if pct >= 10.0 {
        Color::Yellow
    } else if pct >= 5.0 {
        Color::Green
    } else {
        Color::White
    }
}

/// Compact sample count: 999, 12.3K, 4.5M
fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 10_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}
