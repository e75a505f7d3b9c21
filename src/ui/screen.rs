use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{
        canvas::{Canvas, Points},
        Block, Clear, Paragraph, Widget, Wrap,
    },
};
use unicode_width::UnicodeWidthStr;

use crate::{
    analyzer::Miscue,
    app::App,
    lesson::{Page, QuizPhase, ReaderPhase},
    physics::{Fill, Rect as PhysRect},
    ui::centered,
};

type Hint = (&'static str, &'static str);

/// A UI Screen boundary: one per lesson page
pub trait Screen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
    /// Key legend shown under the screen.
    fn hints(&self, app: &App) -> Vec<Hint>;
}

pub struct HomeScreen;

impl Screen for HomeScreen {
    fn render(&self, _app: &App, area: Rect, buf: &mut Buffer) {
        let text = Text::from(vec![
            Line::from(Span::styled(
                "Welcome to ReadBuddy!",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::raw(""),
            Line::raw("Read a book out loud, answer a few questions,"),
            Line::raw("and earn lives for the jumping game."),
        ]);
        let height = text.height() as u16;
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(centered(area, area.width, height), buf);
    }

    fn hints(&self, _app: &App) -> Vec<Hint> {
        vec![("enter", "library"), ("q", "quit")]
    }
}

pub struct LibraryScreen;

impl Screen for LibraryScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let mut lines = vec![
            Line::from(Span::styled(
                "Pick a book",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::raw(""),
        ];
        for (idx, book) in app.catalog().books().iter().enumerate() {
            let selected = idx == app.library_cursor();
            let style = if selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} {}. {}", if selected { ">" } else { " " }, idx + 1, book.title),
                    style,
                ),
                Span::styled(
                    format!(
                        "  ({} lines, {} questions)",
                        book.lines.len(),
                        book.comprehension.len()
                    ),
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]));
        }
        Paragraph::new(lines).render(area, buf);
    }

    fn hints(&self, _app: &App) -> Vec<Hint> {
        vec![("↑/↓", "choose"), ("enter", "open"), ("esc", "back")]
    }
}

pub struct ReaderScreen;

impl Screen for ReaderScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let state = app.state();
        let Some(book) = state.active_book(app.catalog()) else {
            return;
        };
        let [title, _, line_area, _, input_area, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(area);

        Paragraph::new(Line::from(vec![
            Span::styled(
                book.title.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    "  Line {} of {}",
                    (state.line_index() + 1).min(book.lines.len()),
                    book.lines.len()
                ),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]))
        .render(title, buf);

        let line = state.current_line(app.catalog()).unwrap_or_default();
        let missed = match state.reader() {
            ReaderPhase::Feedback(miscue) => Some(miscue.expected_word.as_str()),
            _ => None,
        };
        Paragraph::new(reading_line(line, missed))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(line_area, buf);

        let block = Block::bordered().title("Your reading");
        let inner = block.inner(input_area);
        block.render(input_area, buf);
        let caret_room = (inner.width as usize).saturating_sub(1);
        Paragraph::new(Line::from(vec![
            Span::raw(tail_that_fits(app.reading_input(), caret_room)),
            Span::styled("▏", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]))
        .render(inner, buf);

        if state.is_analyzing() {
            Paragraph::new(Span::styled(
                "Checking your reading...",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            ))
            .render(status, buf);
        }

        if let ReaderPhase::Feedback(miscue) = state.reader() {
            render_feedback(miscue, area, buf);
        }
    }

    fn hints(&self, app: &App) -> Vec<Hint> {
        match app.state().reader() {
            ReaderPhase::Idle => vec![
                ("enter", "read"),
                ("tab", "simulate a mistake"),
                ("esc", "leave book"),
            ],
            ReaderPhase::Analyzing(_) => vec![("esc", "leave book")],
            ReaderPhase::Feedback(_) => vec![("enter", "continue")],
        }
    }
}

/// The line to read, with the missed word marked while feedback is up.
fn reading_line<'a>(line: &'a str, missed: Option<&str>) -> Line<'a> {
    let base = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let Some((start, word)) = missed.and_then(|word| find_word(line, word).map(|at| (at, word)))
    else {
        return Line::from(Span::styled(line, base));
    };
    let end = start + word.len();
    Line::from(vec![
        Span::styled(&line[..start], base),
        Span::styled(
            &line[start..end],
            base.fg(Color::Red).add_modifier(Modifier::UNDERLINED),
        ),
        Span::styled(&line[end..], base),
    ])
}

/// First whole-word occurrence of `word`, else its first occurrence anywhere.
fn find_word(line: &str, word: &str) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '\'';
    let mut matches = line.match_indices(word).map(|(at, _)| at).peekable();
    let first = *matches.peek()?;
    let whole = matches.find(|&at| {
        let before = line[..at].chars().next_back();
        let after = line[at + word.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    });
    Some(whole.unwrap_or(first))
}

fn render_feedback(miscue: &Miscue, area: Rect, buf: &mut Buffer) {
    let modal = centered(area, 60, 10);
    Clear.render(modal, buf);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let text = Text::from(vec![
        Line::from(vec![
            Span::raw("Let's practice: "),
            Span::styled(miscue.expected_word.as_str(), bold.fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw("You said: "),
            Span::styled(miscue.spoken_word.as_str(), bold.fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::raw("Sounds like: "),
            Span::styled(miscue.phonetic_hint.as_str(), bold),
        ]),
        Line::raw(""),
        Line::from(Span::styled(
            miscue.feedback_script.as_str(),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ]);
    Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(
            Block::bordered()
                .title("Reading tip")
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .render(modal, buf);
}

/// The longest suffix of `text` that fits in `width` columns.
fn tail_that_fits(text: &str, width: usize) -> &str {
    text.char_indices()
        .map(|(idx, _)| &text[idx..])
        .find(|tail| tail.width() <= width)
        .unwrap_or("")
}

pub struct QuizScreen;

impl Screen for QuizScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let state = app.state();
        let (Some(book), Some(question)) = (
            state.active_book(app.catalog()),
            state.current_question(app.catalog()),
        ) else {
            return;
        };

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(Span::styled(
                format!(
                    "Question {} of {}",
                    state.question_index() + 1,
                    book.comprehension.len()
                ),
                Style::default().add_modifier(Modifier::DIM),
            )),
            Line::from(Span::styled(question.prompt.as_str(), bold)),
            Line::raw(""),
        ];

        let answered = match state.quiz() {
            QuizPhase::Answered(feedback) => Some(feedback),
            QuizPhase::Asking => None,
        };
        for (idx, option) in question.options.iter().enumerate() {
            let style = match answered {
                Some(_) if question.is_correct(option) => bold.fg(Color::Green),
                Some(feedback) if feedback.selected == *option => bold.fg(Color::Red),
                Some(_) => Style::default().add_modifier(Modifier::DIM),
                None => Style::default(),
            };
            lines.push(Line::from(Span::styled(
                format!("{}. {}", idx + 1, option),
                style,
            )));
        }

        if let Some(feedback) = answered {
            let color = if feedback.correct {
                Color::Green
            } else {
                Color::Red
            };
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled(feedback.message(), bold.fg(color))));
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }

    fn hints(&self, app: &App) -> Vec<Hint> {
        match app.state().quiz() {
            QuizPhase::Asking => vec![("1-9", "answer"), ("esc", "leave book")],
            QuizPhase::Answered(_) => vec![("esc", "leave book")],
        }
    }
}

pub struct GameScreen;

impl Screen for GameScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let scene = app.game().scene();
        if scene.width <= 0.0 || scene.height <= 0.0 {
            return;
        }
        let block = Block::bordered().title("Jump!");
        let inner = block.inner(area);
        if inner.is_empty() {
            block.render(area, buf);
            return;
        }
        // Half a cell apart, so every cell under a rect gets a point.
        let step = (
            scene.width / f64::from(inner.width) / 2.0,
            scene.height / f64::from(inner.height) / 2.0,
        );
        // Scene y grows downwards, canvas y grows upwards.
        Canvas::default()
            .block(block)
            .marker(Marker::Block)
            .x_bounds([0.0, scene.width])
            .y_bounds([0.0, scene.height])
            .paint(|ctx| {
                for (rect, fill) in &scene.rects {
                    let flipped = PhysRect::new(
                        rect.x,
                        scene.height - rect.bottom(),
                        rect.width,
                        rect.height,
                    );
                    ctx.draw(&Points {
                        coords: &fill_points(flipped, step),
                        color: match fill {
                            Fill::Actor => Color::Yellow,
                            Fill::Platform => Color::Green,
                        },
                    });
                }
            })
            .render(area, buf);
    }

    fn hints(&self, _app: &App) -> Vec<Hint> {
        vec![("a/d", "move"), ("w/space", "jump"), ("q", "quit")]
    }
}

/// Grid of points `step` apart covering `rect`, edges included.
fn fill_points(rect: PhysRect, (dx, dy): (f64, f64)) -> Vec<(f64, f64)> {
    if rect.width < 0.0 || rect.height < 0.0 || dx <= 0.0 || dy <= 0.0 {
        return Vec::new();
    }
    let columns = (rect.width / dx).ceil() as usize;
    let rows = (rect.height / dy).ceil() as usize;
    (0..=rows)
        .flat_map(|row| {
            let y = (rect.y + row as f64 * dy).min(rect.y + rect.height);
            (0..=columns).map(move |col| {
                let x = (rect.x + col as f64 * dx).min(rect.x + rect.width);
                (x, y)
            })
        })
        .collect()
}

/// Helper to construct the appropriate screen for the current page
pub fn current_screen(page: Page) -> Box<dyn Screen> {
    match page {
        Page::Home => Box::new(HomeScreen),
        Page::Library => Box::new(LibraryScreen),
        Page::Reader => Box::new(ReaderScreen),
        Page::Quiz => Box::new(QuizScreen),
        Page::Game => Box::new(GameScreen),
    }
}
