//! Filter sidebar: date range and the three selectors.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::config::Theme;
use crate::pipeline::Controls;

/// Sidebar control that receives arrow keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidebarFocus {
    #[default]
    StartDate,
    EndDate,
    State,
    OverviewState,
    Product,
}

impl SidebarFocus {
    const ORDER: [SidebarFocus; 5] = [
        SidebarFocus::StartDate,
        SidebarFocus::EndDate,
        SidebarFocus::State,
        SidebarFocus::OverviewState,
        SidebarFocus::Product,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn is_date(self) -> bool {
        matches!(self, SidebarFocus::StartDate | SidebarFocus::EndDate)
    }

    pub fn label(self) -> &'static str {
        match self {
            SidebarFocus::StartDate => "Start date",
            SidebarFocus::EndDate => "End date",
            SidebarFocus::State => "State (Monthly sales)",
            SidebarFocus::OverviewState => "State (Sales overview)",
            SidebarFocus::Product => "Product",
        }
    }
}

pub struct Sidebar<'a> {
    controls: &'a Controls,
    focus: SidebarFocus,
    theme: &'a Theme,
}

impl<'a> Sidebar<'a> {
    pub fn new(controls: &'a Controls, focus: SidebarFocus, theme: &'a Theme) -> Self {
        Self {
            controls,
            focus,
            theme,
        }
    }

    fn value(&self, field: SidebarFocus) -> String {
        let c = self.controls;
        let text = match field {
            SidebarFocus::StartDate => c.date_range.map(|r| r.start.to_string()),
            SidebarFocus::EndDate => c.date_range.map(|r| r.end.to_string()),
            SidebarFocus::State => c.state.clone(),
            SidebarFocus::OverviewState => c.overview_state.clone(),
            SidebarFocus::Product => c.product.clone(),
        };
        text.unwrap_or_else(|| "-".to_string())
    }

    /// "n of m" position of the selection among its options
    fn position_hint(&self, field: SidebarFocus) -> Option<String> {
        let c = self.controls;
        let (selected, options) = match field {
            SidebarFocus::State => (c.state.as_ref(), &c.states),
            SidebarFocus::OverviewState => (c.overview_state.as_ref(), &c.states),
            SidebarFocus::Product => (c.product.as_ref(), &c.products),
            _ => return None,
        };
        let idx = options.iter().position(|o| Some(o) == selected)?;
        Some(format!("{} of {}", idx + 1, options.len()))
    }
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = self.theme.get("border");
        let active = self.theme.get("border_active");
        let text_primary = self.theme.get("text_primary");
        let text_secondary = self.theme.get("text_secondary");
        let text_inverse = self.theme.get("text_inverse");

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Filters ");
        let inner = block.inner(area);
        block.render(area, buf);

        // bounds line, then a label row, a value row and a spacer per field
        let mut constraints = vec![Constraint::Length(2)];
        constraints.extend(SidebarFocus::ORDER.iter().map(|_| Constraint::Length(3)));
        constraints.push(Constraint::Fill(1));
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        let bounds = match self.controls.bounds {
            Some(b) => format!("Data: {} to {}", b.start, b.end),
            None => "Data: no purchase dates".to_string(),
        };
        Paragraph::new(bounds)
            .style(Style::default().fg(text_secondary))
            .wrap(Wrap { trim: true })
            .render(rows[0], buf);

        for (i, field) in SidebarFocus::ORDER.iter().enumerate() {
            let focused = *field == self.focus;
            let label_style = if focused {
                Style::default().fg(active).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(border)
            };
            let marker = if focused { "▶ " } else { "  " };
            let mut value_line = vec![
                Span::raw("  "),
                Span::styled(
                    format!("◀ {} ▶", self.value(*field)),
                    if focused {
                        Style::default().fg(text_inverse).bg(active)
                    } else {
                        Style::default().fg(text_primary)
                    },
                ),
            ];
            if let Some(hint) = self.position_hint(*field) {
                value_line.push(Span::styled(
                    format!("  {}", hint),
                    Style::default().fg(text_secondary),
                ));
            }
            Paragraph::new(vec![
                Line::from(Span::styled(format!("{}{}", marker, field.label()), label_style)),
                Line::from(value_line),
            ])
            .render(rows[i + 1], buf);
        }
    }
}
