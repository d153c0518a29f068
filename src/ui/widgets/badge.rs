use crate::badge::DisplayFields;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Terminal rendering of the badge. Purely a view over [`DisplayFields`];
/// all state decisions happen in the library.
pub struct BadgeWidget<'a> {
    fields: &'a DisplayFields,
}

impl<'a> BadgeWidget<'a> {
    pub fn new(fields: &'a DisplayFields) -> Self {
        Self { fields }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let (bg, fg, accent) = if self.fields.dark_mode {
            (Color::Black, Color::White, Color::Green)
        } else {
            (Color::White, Color::Black, Color::Green)
        };

        let block = Block::default()
            .title(" carbonbadge ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(fg).bg(bg))
            .style(Style::default().bg(bg));

        let mut lines = vec![Line::from(vec![
            Span::styled(
                self.fields.measure_text.clone(),
                Style::default().fg(fg).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  Website Carbon", Style::default().fg(accent)),
        ])];

        if !self.fields.below_text.is_empty() {
            lines.push(Line::from(Span::styled(
                self.fields.below_text.clone(),
                Style::default().fg(fg),
            )));
        }

        if self.fields.show_link {
            if let Some(href) = &self.fields.link_href {
                lines.push(Line::from(Span::styled(
                    href.clone(),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::UNDERLINED),
                )));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center);

        frame.render_widget(paragraph, area);
    }
}
