use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use diamond_price::{DiamondRecord, FormField, FormState, Prediction, PriceEstimator};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;
use tracing::error;

use crate::format_price;

/// PgUp/PgDn move a widget this many notches
const FAST_STEPS: i32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Info(String),
    Error(String),
}

pub struct App<'a> {
    pub form: FormState,
    pub recent: Vec<DiamondRecord>,
    pub last: Option<Prediction>,
    pub status: Option<Status>,
    pub list_state: ListState,
    estimator: &'a PriceEstimator,
}

impl<'a> App<'a> {
    pub fn new(
        estimator: &'a PriceEstimator,
        recent: Vec<DiamondRecord>,
        seed_notice: Option<String>,
    ) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        App {
            form: FormState::new(),
            recent,
            last: None,
            status: seed_notice.map(Status::Info),
            list_state,
            estimator,
        }
    }

    pub fn next_field(&mut self) {
        self.form.next_field();
        self.list_state.select(Some(self.form.selected_index()));
    }

    pub fn previous_field(&mut self) {
        self.form.previous_field();
        self.list_state.select(Some(self.form.selected_index()));
    }

    pub fn reset(&mut self) {
        self.form.reset();
        self.status = Some(Status::Info("Form reset to defaults".to_string()));
    }

    /// Run the prediction flow on the current form values.
    ///
    /// Storage failures land in the status line; the form stays usable.
    pub fn predict(&mut self) {
        match self.estimator.submit(self.form.input()) {
            Ok(prediction) => {
                self.status = Some(Status::Info(format!(
                    "Prediction saved to database (id {})",
                    prediction.record.id.unwrap_or_default()
                )));
                self.recent = prediction.recent.clone();
                self.last = Some(prediction);
            }
            Err(e) => {
                error!(error = %e, "prediction failed");
                self.status = Some(Status::Error(format!("{:#}", e)));
            }
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            // Windows reports releases too
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Down | KeyCode::Tab => app.next_field(),
                KeyCode::Up | KeyCode::BackTab => app.previous_field(),
                KeyCode::Right => app.form.adjust(1),
                KeyCode::Left => app.form.adjust(-1),
                KeyCode::PageUp => app.form.adjust(FAST_STEPS),
                KeyCode::PageDown => app.form.adjust(-FAST_STEPS),
                KeyCode::Enter if app.form.selected() == FormField::Predict => app.predict(),
                KeyCode::Enter => app.next_field(),
                KeyCode::Char('p') => app.predict(),
                KeyCode::Char('r') => app.reset(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(14),
            Constraint::Length(3),
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(40)])
        .split(chunks[1]);

    render_form(f, body[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(body[1]);

    render_result(f, right[0], app);
    render_recent(f, right[1], app);
    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let spans = vec![
        Span::styled(
            " 💎 Diamond Price Predictor ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("model: {}", app.estimator.model_name()),
            Style::default().fg(Color::White),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("sha256: {}", app.estimator.fingerprint()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &mut App) {
    let items: Vec<ListItem> = FormField::ALL
        .iter()
        .map(|&field| {
            let line = if field == FormField::Predict {
                Line::from(Span::styled(
                    format!("        {}", app.form.display(field)),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:<8}", field.label()),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled(
                        format!("{:>10}", app.form.display(field)),
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}", app.form.hint(field)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])
            };
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Enter Diamond Details ")
                .border_style(Style::default().fg(Color::White)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_result(f: &mut Frame, area: Rect, app: &App) {
    let text = match &app.last {
        Some(prediction) => vec![
            Line::from(vec![
                Span::styled("  Estimated Price: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("${}", format_price(prediction.record.price)),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("  At: ", Style::default().fg(Color::Cyan)),
                Span::raw(prediction.predicted_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            ]),
        ],
        None => vec![Line::from(Span::styled(
            "  Fill in the form and press Enter on Predict",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Prediction ")
            .border_style(Style::default().fg(Color::Yellow)),
    );

    f.render_widget(paragraph, area);
}

fn render_recent(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Diamond Predictions ")
        .border_style(Style::default().fg(Color::White));

    if app.recent.is_empty() {
        let empty = Paragraph::new("  No data in the database yet.").block(block);
        f.render_widget(empty, area);
        return;
    }

    let header_cells = ["Carat", "Cut", "Color", "Clarity", "Depth", "Table", "Price", "X", "Y", "Z"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let latest_id = app.last.as_ref().and_then(|p| p.record.id);

    let rows = app.recent.iter().map(|record| {
        let input = &record.input;
        let style = if record.id.is_some() && record.id == latest_id {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(format!("{:.2}", input.carat)),
            Cell::from(input.cut.to_string()),
            Cell::from(input.color.to_string()),
            Cell::from(input.clarity.to_string()),
            Cell::from(format!("{:.1}", input.depth)),
            Cell::from(format!("{:.1}", input.table)),
            Cell::from(format_price(record.price)),
            Cell::from(format!("{:.2}", input.x)),
            Cell::from(format!("{:.2}", input.y)),
            Cell::from(format!("{:.2}", input.z)),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(block);

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    match &app.status {
        Some(Status::Info(message)) => {
            status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Green)));
            status_spans.push(Span::raw(" | "));
        }
        Some(Status::Error(message)) => {
            status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Red)));
            status_spans.push(Span::raw(" | "));
        }
        None => {}
    }

    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Field | "));
    status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Adjust | "));
    status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Fast | "));
    status_spans.push(Span::styled("p", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Predict | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Reset | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
