use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::model::{FilterEditor, Model, Modus};
use crate::filter::SearchForm;
use crate::output::DELETE_MARKER;
use crate::rows::{display_value, COLUMN_TITLES, ROW_WIDTH};

const FILTER_POPUP_HEIGHT: u16 = SearchForm::KEYS.len() as u16 + 5;

pub struct TableUI {
    title: String,
}

fn popup_area(area: Rect, percent_x: u16, height: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

impl TableUI {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let [main, status] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());

        match model.modus() {
            Modus::Record => self.draw_record(model, frame, main),
            _ => self.draw_table(model, frame, main),
        }
        self.draw_status(model, frame, status);

        match model.modus() {
            Modus::Filter => self.draw_filter(model.filter_editor(), frame),
            Modus::Popup => self.draw_popup(model.popup_message(), frame),
            _ => {}
        }
    }

    fn draw_table(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let header = Row::new(
            COLUMN_TITLES
                .iter()
                .copied()
                .chain(std::iter::once("del"))
                .map(|t| Cell::from(t).bold()),
        )
        .style(Style::default().fg(Color::Yellow));

        let rows = model.binder().rows().rows().iter().map(|r| {
            let marker = if r.id.is_some() { DELETE_MARKER } else { "" };
            Row::new(
                r.cells
                    .iter()
                    .map(|c| Cell::from(c.as_str()))
                    .chain(std::iter::once(Cell::from(marker).red())),
            )
        });

        let mut widths = vec![Constraint::Length(8)];
        widths.extend(std::iter::repeat(Constraint::Fill(1)).take(ROW_WIDTH - 1));
        widths.push(Constraint::Length(3));

        let title = Line::from(Span::from(format!(" {} ", self.title)).bold());
        let filter = model.binder().active_filter().to_query_string();
        let filter = if filter.is_empty() {
            " no filter ".to_string()
        } else {
            format!(" {filter} ")
        };
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(Line::from(filter).right_aligned());

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(1)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .cell_highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let (row, column) = model.selected();
        let mut state = TableState::default();
        if !model.binder().rows().is_empty() {
            state.select(Some(row));
            state.select_column(Some(column));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_record(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let Some(view) = model.record_view() else {
            return;
        };
        let block = Block::bordered()
            .title(Line::from(Span::from(format!(" record {} ", view.id)).bold()).centered())
            .title_bottom(Line::from(format!(" {} ", view.link)).right_aligned());

        let lines: Vec<Line> = match view.record.as_ref() {
            None => match view.error.as_deref() {
                Some(error) => vec![Line::from(Span::from(error.to_string()).red())],
                None => vec![Line::from("Fetching…".italic())],
            },
            Some(record) => record
                .fields()
                .iter()
                .enumerate()
                .map(|(idx, value)| {
                    let label = if idx == 0 {
                        "id".to_string()
                    } else {
                        (idx - 1).to_string()
                    };
                    let line = Line::from(vec![
                        Span::from(format!("{label:>4} : ")).yellow(),
                        Span::from(display_value(Some(value))),
                    ]);
                    if idx == view.cursor {
                        line.reversed()
                    } else {
                        line
                    }
                })
                .collect(),
        };

        let scroll = view.cursor.saturating_sub(area.height.saturating_sub(3) as usize);
        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0)),
            area,
        );
    }

    fn draw_status(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        if model.is_fetching() {
            spans.push(" Fetching… ".black().on_yellow());
            spans.push(Span::from(" "));
        }
        spans.push(Span::from(model.status_message().to_string()));
        spans.push(Span::from("   ? help  q quit").dark_gray());
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_filter(&self, editor: &FilterEditor, frame: &mut Frame) {
        let area = popup_area(frame.area(), 60, FILTER_POPUP_HEIGHT);
        let labels = SearchForm::LABELS.iter().copied().chain(std::iter::once("Query"));
        let values = editor
            .form
            .values()
            .into_iter()
            .chain(std::iter::once(editor.raw.as_str()));

        let mut lines: Vec<Line> = labels
            .zip(values)
            .enumerate()
            .map(|(idx, (label, value))| {
                let label = Span::from(format!("{label:>10} : ")).yellow();
                if idx == editor.field {
                    let pos = editor.cursor_pos().min(value.chars().count());
                    let before: String = value.chars().take(pos).collect();
                    let after: String = value.chars().skip(pos).collect();
                    Line::from(vec![
                        label,
                        Span::from(before).bold(),
                        Span::from("▏").cyan(),
                        Span::from(after).bold(),
                    ])
                } else {
                    Line::from(vec![label, Span::from(value.to_string())])
                }
            })
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from("Tab/Up/Down move  Enter apply  Esc cancel".dark_gray()).centered());

        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(lines).block(Block::bordered().title(" Filter ".bold())),
            area,
        );
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let height = message.lines().count() as u16 + 2;
        let area = popup_area(frame.area(), 70, height);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message.to_string()).block(Block::bordered().title(" Help ".bold())),
            area,
        );
    }
}
