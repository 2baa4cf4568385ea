use ratatui::crossterm::event::{KeyCode, KeyEvent};
use tracing::{debug, info, trace, warn};

use super::domain::{Command, Message, Outcome, HELP_TEXT};
use super::inputter::Inputter;
use crate::filter::{FilterParams, SearchForm};
use crate::rows::{Record, RecordId, ROW_WIDTH};
use crate::view::{Action, CellKind, ViewBinder, ViewState};

const PAGE_SIZE: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modus {
    Table,
    Record,
    Filter,
    Popup,
}

/// The filter modal: the typed form fields followed by one raw query line.
#[derive(Default)]
pub struct FilterEditor {
    pub form: SearchForm,
    pub raw: String,
    pub field: usize,
    input: Inputter,
}

impl FilterEditor {
    pub const RAW_FIELD: usize = SearchForm::KEYS.len();

    pub fn cursor_pos(&self) -> usize {
        self.input.get().cursor_pos
    }

    fn current_mut(&mut self) -> &mut String {
        match self.form.field_mut(self.field) {
            Some(value) => value,
            None => &mut self.raw,
        }
    }

    fn load_field(&mut self) {
        let value = self.current_mut().clone();
        self.input.set(&value);
    }

    fn move_field(&mut self, forward: bool) {
        let count = Self::RAW_FIELD + 1;
        self.field = if forward {
            (self.field + 1) % count
        } else {
            (self.field + count - 1) % count
        };
        self.load_field();
    }
}

pub struct RecordView {
    pub id: RecordId,
    pub link: String,
    pub record: Option<Record>,
    pub error: Option<String>,
    pub cursor: usize,
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    binder: ViewBinder,
    selected_row: usize,
    selected_column: usize,
    record_view: Option<RecordView>,
    filter: FilterEditor,
    popup_message: String,
    status_message: String,
}

impl Model {
    pub fn new(detail_page: impl Into<String>) -> Self {
        Self {
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            binder: ViewBinder::new(detail_page),
            selected_row: 0,
            selected_column: 0,
            record_view: None,
            filter: FilterEditor::default(),
            popup_message: String::new(),
            status_message: "Started dserve-admin".to_string(),
        }
    }

    /// Seeds the form and returns the first search.
    pub fn start(&mut self, form: SearchForm, raw: &str) -> Vec<Command> {
        self.filter.form = form.clone();
        self.filter.raw = raw.to_string();
        match self.binder.submit_filter(&form, raw) {
            Ok(params) => self.search(params),
            Err(e) => {
                self.set_status_message(e.to_string());
                self.search(FilterParams::new())
            }
        }
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn binder(&self) -> &ViewBinder {
        &self.binder
    }

    pub fn selected(&self) -> (usize, usize) {
        (self.selected_row, self.selected_column)
    }

    pub fn record_view(&self) -> Option<&RecordView> {
        self.record_view.as_ref()
    }

    pub fn filter_editor(&self) -> &FilterEditor {
        &self.filter
    }

    pub fn popup_message(&self) -> &str {
        &self.popup_message
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn is_fetching(&self) -> bool {
        self.binder.state() == ViewState::Fetching
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::Filter
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        trace!("status: {}", self.status_message);
    }

    fn search(&mut self, params: FilterParams) -> Vec<Command> {
        self.binder.begin_fetch();
        vec![Command::Search(params)]
    }

    pub fn update(&mut self, message: Message) -> Vec<Command> {
        match self.modus {
            Modus::Table => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_row_up(1),
                Message::MoveDown => self.move_row_down(1),
                Message::MovePageUp => self.move_row_up(PAGE_SIZE),
                Message::MovePageDown => self.move_row_down(PAGE_SIZE),
                Message::MoveBeginning => self.selected_row = 0,
                Message::MoveEnd => self.selected_row = self.binder.rows().len().saturating_sub(1),
                Message::MoveLeft => self.selected_column = self.selected_column.saturating_sub(1),
                Message::MoveRight => {
                    self.selected_column = (self.selected_column + 1).min(CellKind::COUNT - 1)
                }
                Message::Enter => {
                    let column = self.selected_column;
                    return self.activate(column);
                }
                Message::Delete => return self.activate(ROW_WIDTH),
                Message::Filter => self.open_filter(),
                Message::Refresh => {
                    let params = self.binder.active_filter().clone();
                    return self.search(params);
                }
                Message::Help => self.show_help(),
                _ => (),
            },
            Modus::Record => match message {
                Message::Quit => self.quit(),
                Message::Exit => self.modus = Modus::Table,
                Message::MoveUp => {
                    if let Some(view) = self.record_view.as_mut() {
                        view.cursor = view.cursor.saturating_sub(1);
                    }
                }
                Message::MoveDown => {
                    if let Some(view) = self.record_view.as_mut() {
                        let len = view.record.as_ref().map(|r| r.len()).unwrap_or(0);
                        if view.cursor + 1 < len {
                            view.cursor += 1;
                        }
                    }
                }
                Message::Help => self.show_help(),
                _ => (),
            },
            Modus::Popup => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => self.modus = self.previous_modus,
                _ => (),
            },
            Modus::Filter => {
                if let Message::RawKey(key) = message {
                    return self.filter_input(key);
                }
            }
        }
        Vec::new()
    }

    /// Applies one finished request; a completed delete asks for a refresh.
    pub fn apply(&mut self, outcome: Outcome) -> Vec<Command> {
        match outcome {
            Outcome::Rows(Ok(rows)) => {
                let count = rows.len();
                self.binder.render(rows);
                self.selected_row = self.selected_row.min(count.saturating_sub(1));
                self.set_status_message(format!("{count} rows"));
            }
            Outcome::Rows(Err(e)) => {
                warn!("search failed: {e}");
                self.binder.fetch_failed();
                self.set_status_message(format!("search failed: {e}"));
            }
            Outcome::Deleted { id, result: Ok(()) } => {
                info!(%id, "deleted");
                self.set_status_message(format!("deleted {id}"));
                let params = self.binder.active_filter().clone();
                return self.search(params);
            }
            Outcome::Deleted { id, result: Err(e) } => {
                warn!(%id, "delete failed: {e}");
                self.set_status_message(format!("delete of {id} failed: {e}"));
            }
            Outcome::Record { id, result } => {
                let Some(view) = self.record_view.as_mut().filter(|v| v.id == id) else {
                    debug!(%id, "dropping record for a closed view");
                    return Vec::new();
                };
                match result {
                    Ok(Some(record)) => {
                        view.record = Some(record);
                        view.cursor = 0;
                    }
                    Ok(None) => view.error = Some(format!("record {id} not found")),
                    Err(e) => {
                        warn!(%id, "record lookup failed: {e}");
                        view.error = Some(format!("record lookup failed: {e}"));
                    }
                }
            }
        }
        Vec::new()
    }

    fn activate(&mut self, column: usize) -> Vec<Command> {
        let Some(cell) = CellKind::from_column(column) else {
            return Vec::new();
        };
        match self.binder.dispatch(self.selected_row, cell) {
            Action::Delete(id) => {
                self.set_status_message(format!("deleting {id}"));
                vec![Command::Delete(id)]
            }
            Action::Navigate { id, link } => {
                debug!(%link, "navigate");
                self.set_status_message(link.clone());
                self.record_view = Some(RecordView {
                    id: id.clone(),
                    link,
                    record: None,
                    error: None,
                    cursor: 0,
                });
                self.modus = Modus::Record;
                vec![Command::FetchRecord(id)]
            }
            Action::Ignore => Vec::new(),
        }
    }

    fn move_row_up(&mut self, size: usize) {
        self.selected_row = self.selected_row.saturating_sub(size);
    }

    fn move_row_down(&mut self, size: usize) {
        let last = self.binder.rows().len().saturating_sub(1);
        self.selected_row = (self.selected_row + size).min(last);
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.popup_message = HELP_TEXT.to_string();
    }

    fn open_filter(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Filter;
        self.filter.field = 0;
        self.filter.load_field();
    }

    fn filter_input(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.filter.move_field(true);
                return Vec::new();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.filter.move_field(false);
                return Vec::new();
            }
            _ => {}
        }
        let result = self.filter.input.read(key);
        if result.canceled {
            self.modus = self.previous_modus;
            self.set_status_message("filter unchanged");
            return Vec::new();
        }
        *self.filter.current_mut() = result.input;
        if !result.finished {
            return Vec::new();
        }
        match self.binder.submit_filter(&self.filter.form, &self.filter.raw) {
            Ok(params) => {
                info!(filter = %params.to_query_string(), "filter applied");
                self.modus = self.previous_modus;
                self.search(params)
            }
            Err(e) => {
                self.set_status_message(e.to_string());
                self.filter.load_field();
                Vec::new()
            }
        }
    }
}
