use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::filter::FilterParams;
use crate::rows::{Record, RecordId, RowSet};

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug)]
pub struct BrowseConfig {
    pub event_poll_time: u64,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Quit,
    Exit,
    Enter,
    Delete,
    Filter,
    Refresh,
    Help,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    RawKey(KeyEvent),
}

/// Work the model asks the event loop to run on the runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Search(FilterParams),
    Delete(RecordId),
    FetchRecord(RecordId),
}

/// A finished request, delivered back in completion order.
#[derive(Clone, Debug)]
pub enum Outcome {
    Rows(Result<RowSet, String>),
    Deleted {
        id: RecordId,
        result: Result<(), String>,
    },
    Record {
        id: RecordId,
        result: Result<Option<Record>, String>,
    },
}

pub const HELP_TEXT: &str = "\
Navigation
  Up/k  Down/j  Left/h  Right/l   move the selected cell
  PgUp/PgDn  g/G                  page, first/last row

Actions
  Enter   open the record, or delete when on the del column
  d       delete the selected row
  f       filter form (Tab/Up/Down move, Enter apply, Esc cancel)
  r       search again with the active filter
  ?       this help
  Esc     close popup / record view
  q       quit";
