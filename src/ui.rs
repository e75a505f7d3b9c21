pub mod screen;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::{app::App, ui::screen::current_screen};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .areas(area);

        let screen = current_screen(self.state().page());
        render_header(self, header, buf);
        screen.render(self, body, buf);
        render_hints(&screen.hints(self), footer, buf);
    }
}

fn render_header(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut spans = vec![
        Span::styled("ReadBuddy", bold.fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(format!("♥ {}", app.state().lives()), bold.fg(Color::Red)),
    ];
    if app.is_offline() {
        spans.push(Span::styled(
            "  offline",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    Paragraph::new(Line::from(spans)).render(area, buf);
}

/// Key legend along the bottom edge, e.g. `(enter) library  (q) quit`.
fn render_hints(hints: &[(&str, &str)], area: Rect, buf: &mut Buffer) {
    let legend = hints
        .iter()
        .map(|(key, action)| format!("({key}) {action}"))
        .join("  ");
    Paragraph::new(Span::styled(
        legend,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(area, buf);
}

/// A `width` x `height` box centered in `area`, shrunk to fit.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
