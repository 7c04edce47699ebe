//! Chart panel: one dashboard section drawn as a bar chart, histogram or line chart.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph,
        Widget, Wrap,
    },
};

use crate::chart_data::{format_axis_label, ChartKind, ChartSpec};
use crate::config::Theme;
use crate::error::NoticeLevel;
use crate::pipeline::{Panel, Section};

/// Theme keys cycled through for multi-series charts
const SERIES_COLORS: [&str; 6] = [
    "chart_bar",
    "primary",
    "secondary",
    "success",
    "warning",
    "chart_line",
];

pub struct ChartPanel<'a> {
    section: &'a Section,
    theme: &'a Theme,
}

impl<'a> ChartPanel<'a> {
    pub fn new(section: &'a Section, theme: &'a Theme) -> Self {
        Self { section, theme }
    }

    fn series_color(&self, idx: usize) -> Color {
        self.theme.get(SERIES_COLORS[idx % SERIES_COLORS.len()])
    }

    fn render_bars(&self, spec: &ChartSpec, area: Rect, buf: &mut Buffer) {
        let text = self.theme.get("text_primary");
        let label_style = Style::default().fg(text);

        let (groups, bars_per_group): (Vec<BarGroup>, usize) =
            if spec.series.len() == 1 {
                let color = self.theme.get("chart_bar");
                let bars: Vec<Bar> = spec.series[0]
                    .points
                    .iter()
                    .map(|&(x, y)| {
                        Bar::default()
                            .value(y.max(0.0).round() as u64)
                            .label(Line::from(spec.x_tick_label(x)))
                            .style(Style::default().fg(color))
                            .value_style(Style::default().fg(Color::White).bg(color))
                    })
                    .collect();
                let count = bars.len();
                (vec![BarGroup::default().bars(&bars)], count)
            } else {
                let groups = spec
                    .categories
                    .iter()
                    .enumerate()
                    .map(|(cat_idx, category)| {
                        let bars: Vec<Bar> = spec
                            .series
                            .iter()
                            .enumerate()
                            .filter_map(|(series_idx, series)| {
                                let (_, y) = series
                                    .points
                                    .iter()
                                    .find(|(x, _)| x.round() as usize == cat_idx)?;
                                Some(
                                    Bar::default()
                                        .value(y.max(0.0).round() as u64)
                                        .text_value(String::new())
                                        .style(Style::default().fg(self.series_color(series_idx))),
                                )
                            })
                            .collect();
                        BarGroup::default()
                            .label(Line::from(category.clone()))
                            .bars(&bars)
                    })
                    .collect();
                (groups, spec.series.len() * spec.categories.len())
            };

        // bars plus one-cell gaps share the width
        let bar_width = if bars_per_group == 0 {
            1
        } else {
            ((area.width as usize / bars_per_group).saturating_sub(1)).clamp(1, 9) as u16
        };

        let mut chart = BarChart::default()
            .bar_width(bar_width)
            .bar_gap(if spec.kind == ChartKind::Histogram { 0 } else { 1 })
            .group_gap(1)
            .label_style(label_style);
        for group in groups {
            chart = chart.data(group);
        }
        chart.render(area, buf);
    }

    fn render_line(&self, spec: &ChartSpec, area: Rect, buf: &mut Buffer) {
        let color = self.theme.get("chart_line");
        let axis_style = Style::default().fg(self.theme.get("text_primary"));

        let datasets: Vec<Dataset> = spec
            .series
            .iter()
            .map(|s| {
                Dataset::default()
                    .name(s.name.as_str())
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(color))
                    .data(&s.points)
            })
            .collect();

        let [x_min, x_max] = spec.x_range();
        let y_max = match spec.y_max() {
            y if y > 0.0 => y,
            _ => 1.0,
        };
        let x_labels: Vec<Span> = [x_min, (x_min + x_max) / 2.0, x_max]
            .iter()
            .map(|&x| Span::styled(spec.x_tick_label(x), axis_style))
            .collect();
        let y_labels: Vec<Span> = [0.0, y_max / 2.0, y_max]
            .iter()
            .map(|&y| Span::styled(format_axis_label(y), axis_style))
            .collect();

        Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title(spec.x_label.as_str())
                    .bounds([x_min, x_max])
                    .style(axis_style)
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .title(spec.y_label.as_str())
                    .bounds([0.0, y_max])
                    .style(axis_style)
                    .labels(y_labels),
            )
            .legend_position(None)
            .render(area, buf);
    }
}

impl Widget for ChartPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.get("border")))
            .title(Span::styled(
                format!(" {} ", self.section.title),
                Style::default().fg(self.theme.get("section_header")),
            ));
        let inner = block.inner(area);
        block.render(area, buf);

        match &self.section.panel {
            Panel::Notice(notice) => {
                let color = match notice.level {
                    NoticeLevel::Warning => self.theme.get("warning"),
                    NoticeLevel::Error => self.theme.get("error"),
                };
                Paragraph::new(notice.message.as_str())
                    .style(Style::default().fg(color))
                    .wrap(Wrap { trim: true })
                    .centered()
                    .render(inner, buf);
            }
            Panel::Chart { chart, .. } if chart.is_empty() => {
                Paragraph::new("No data for the selected range")
                    .style(Style::default().fg(self.theme.get("text_secondary")))
                    .centered()
                    .render(inner, buf);
            }
            Panel::Chart { chart, .. } => match chart.kind {
                ChartKind::Line => self.render_line(chart, inner, buf),
                ChartKind::Bar | ChartKind::Histogram => self.render_bars(chart, inner, buf),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_data::ChartSeries;
    use crate::error::Notice;

    fn buffer_text(section: &Section) -> String {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 60, 14);
        let mut buf = Buffer::empty(area);
        ChartPanel::new(section, &theme).render(area, &mut buf);
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn bar_spec(points: Vec<(f64, f64)>) -> ChartSpec {
        ChartSpec {
            title: "Total sales per state".into(),
            kind: ChartKind::Bar,
            x_label: "State".into(),
            y_label: "Total sales".into(),
            categories: vec!["SP".into(), "RJ".into()],
            series: vec![ChartSeries {
                name: "total_sales".into(),
                points,
            }],
            x_bounds: None,
        }
    }

    #[test]
    fn notice_replaces_chart() {
        let section = Section {
            id: "review_distribution",
            title: "Review score distribution".into(),
            panel: Panel::Notice(Notice::error("Column 'review_score' was not found")),
        };
        let text = buffer_text(&section);
        assert!(text.contains("Review score distribution"));
        assert!(text.contains("review_score"));
    }

    #[test]
    fn empty_chart_shows_message() {
        let section = Section {
            id: "total_sales_per_state",
            title: "Total sales per state".into(),
            panel: Panel::Chart {
                table: polars::prelude::DataFrame::empty(),
                chart: bar_spec(Vec::new()),
            },
        };
        assert!(buffer_text(&section).contains("No data for the selected range"));
    }

    #[test]
    fn bars_are_labelled() {
        let section = Section {
            id: "total_sales_per_state",
            title: "Total sales per state".into(),
            panel: Panel::Chart {
                table: polars::prelude::DataFrame::empty(),
                chart: bar_spec(vec![(0.0, 2.0), (1.0, 1.0)]),
            },
        };
        let text = buffer_text(&section);
        assert!(text.contains("SP"));
        assert!(text.contains("RJ"));
    }
}
