//! Interactive table view.
//!
//! The terminal loop owns the [`Model`] on the calling thread. Requests the
//! model asks for run on the tokio runtime and come back over a channel,
//! applied in the order they complete.

pub mod controller;
pub mod domain;
pub mod inputter;
pub mod model;
pub mod ui;

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};

pub use domain::{BrowseConfig, Command, Message, Outcome, TuiError};
pub use model::{Modus, Model, Status};

use crate::client::{ErrorDetector, QueryClient};
use crate::filter::SearchForm;
use crate::view;
use controller::Controller;
use ui::TableUI;

fn spawn_command<D>(
    handle: &Handle,
    client: &Arc<QueryClient<D>>,
    tx: &UnboundedSender<Outcome>,
    command: Command,
) where
    D: ErrorDetector + 'static,
{
    debug!(?command, "spawn");
    let client = Arc::clone(client);
    let tx = tx.clone();
    handle.spawn(async move {
        let outcome = match command {
            Command::Search(filter) => Outcome::Rows(
                view::refresh(&client, &filter)
                    .await
                    .map_err(|e| e.to_string()),
            ),
            Command::Delete(id) => {
                let result = client.remove(&id).await.map_err(|e| e.to_string());
                Outcome::Deleted { id, result }
            }
            Command::FetchRecord(id) => {
                let result = client.fetch_record(&id).await.map_err(|e| e.to_string());
                Outcome::Record { id, result }
            }
        };
        // the loop may already be gone
        let _ = tx.send(outcome);
    });
}

pub fn run<D>(
    handle: Handle,
    client: Arc<QueryClient<D>>,
    detail_page: &str,
    form: SearchForm,
    raw_query: &str,
    cfg: BrowseConfig,
) -> Result<(), TuiError>
where
    D: ErrorDetector + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();
    let mut model = Model::new(detail_page);
    let ui = TableUI::new(format!("dserve {} @ {}", client.database(), client.base_url()));
    let controller = Controller::new(&cfg);

    for command in model.start(form, raw_query) {
        spawn_command(&handle, &client, &tx, command);
    }

    let mut terminal = ratatui::try_init()?;
    let result = (|| -> Result<(), TuiError> {
        while model.status != Status::Quitting {
            while let Ok(outcome) = rx.try_recv() {
                for command in model.apply(outcome) {
                    spawn_command(&handle, &client, &tx, command);
                }
            }

            terminal.draw(|f| ui.draw(&model, f))?;

            if let Some(message) = controller.handle_event(&model)? {
                for command in model.update(message) {
                    spawn_command(&handle, &client, &tx, command);
                }
            }
        }
        Ok(())
    })();
    ratatui::restore();
    info!("browse finished");
    result
}
