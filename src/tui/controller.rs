use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use tracing::trace;

use super::domain::{BrowseConfig, Message};
use super::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &BrowseConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> std::io::Result<Option<Message>> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == event::KeyEventKind::Press {
                    return Ok(Self::map_key(model.raw_keyevents(), key));
                }
            }
        }
        Ok(None)
    }

    /// While a form is open every key goes to it untouched.
    pub fn map_key(raw: bool, key: event::KeyEvent) -> Option<Message> {
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Char('d'), _) | (KeyCode::Delete, _) => Some(Message::Delete),
            (KeyCode::Char('f'), _) | (KeyCode::Char('/'), _) => Some(Message::Filter),
            (KeyCode::Char('r'), _) => Some(Message::Refresh),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left, _) | (KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right, _) | (KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Home, _) | (KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End, _) | (KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use ratatui::crossterm::event::KeyEvent;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn vim_and_arrow_keys_move() {
        assert_eq!(Controller::map_key(false, key(KeyCode::Char('j'))), Some(Message::MoveDown));
        assert_eq!(Controller::map_key(false, key(KeyCode::Left)), Some(Message::MoveLeft));
        assert_eq!(Controller::map_key(false, key(KeyCode::Char('d'))), Some(Message::Delete));
        assert_eq!(Controller::map_key(false, key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn raw_mode_forwards_keys() {
        let k = key(KeyCode::Char('q'));
        assert_eq!(Controller::map_key(true, k), Some(Message::RawKey(k)));
    }
}
