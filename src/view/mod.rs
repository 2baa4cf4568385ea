//! Binds a rendered [`RowSet`] to user interaction.
//!
//! The binder owns the container content and resolves every cell activation
//! through one dispatcher, so nothing has to be re-attached after a render.

use tracing::{debug, trace};

use crate::client::{detail_link, ClientError, ErrorDetector, QueryClient};
use crate::filter::{FilterError, FilterParams, SearchForm};
use crate::rows::{RecordId, RowSet, ROW_WIDTH};

pub const DEFAULT_DETAIL_PAGE: &str = "html/data.html";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Fetching,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Field(usize),
    Delete,
}

impl CellKind {
    /// Rendered tables have the row fields followed by one delete cell.
    pub const COUNT: usize = ROW_WIDTH + 1;

    pub fn from_column(column: usize) -> Option<Self> {
        match column {
            c if c < ROW_WIDTH => Some(Self::Field(c)),
            ROW_WIDTH => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Delete(RecordId),
    Navigate { id: RecordId, link: String },
    Ignore,
}

#[derive(Clone, Debug)]
pub struct ViewBinder {
    state: ViewState,
    rows: RowSet,
    active_filter: FilterParams,
    detail_page: String,
}

impl Default for ViewBinder {
    fn default() -> Self {
        Self::new(DEFAULT_DETAIL_PAGE)
    }
}

impl ViewBinder {
    pub fn new(detail_page: impl Into<String>) -> Self {
        Self {
            state: ViewState::Idle,
            rows: RowSet::default(),
            active_filter: FilterParams::new(),
            detail_page: detail_page.into(),
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn active_filter(&self) -> &FilterParams {
        &self.active_filter
    }

    pub fn detail_page(&self) -> &str {
        &self.detail_page
    }

    pub fn begin_fetch(&mut self) {
        trace!("view fetching");
        self.state = ViewState::Fetching;
    }

    /// Replaces the whole container content.
    pub fn render(&mut self, rows: RowSet) {
        debug!(rows = rows.len(), "render");
        self.rows = rows;
        self.state = ViewState::Idle;
    }

    /// A failed request leaves the last rendered rows in place.
    pub fn fetch_failed(&mut self) {
        self.state = ViewState::Idle;
    }

    pub fn dispatch(&self, row: usize, cell: CellKind) -> Action {
        let Some(id) = self.rows.get(row).and_then(|r| r.id.clone()) else {
            return Action::Ignore;
        };
        match cell {
            CellKind::Delete => Action::Delete(id),
            CellKind::Field(_) => {
                let link = detail_link(&self.detail_page, &id);
                Action::Navigate { id, link }
            }
        }
    }

    /// Validates the form and makes its non-empty fields, plus any raw
    /// serialized pairs, the active filter.
    pub fn submit_filter(
        &mut self,
        form: &SearchForm,
        raw: &str,
    ) -> Result<FilterParams, FilterError> {
        form.validate()?;
        let mut params = form.to_params();
        params.extend(FilterParams::parse(raw));
        self.active_filter = params.clone();
        Ok(params)
    }
}

/// Search, then normalize into a row set ready to render.
pub async fn refresh<D: ErrorDetector>(
    client: &QueryClient<D>,
    filter: &FilterParams,
) -> Result<RowSet, ClientError> {
    let records = client.search(filter).await?;
    Ok(RowSet::from_records(&records))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::rows::records_from_payload;

    fn binder_with_rows() -> ViewBinder {
        let mut binder = ViewBinder::new("html/data.html");
        let records = records_from_payload(json!([[11, "a"], [null, "b"]]));
        binder.begin_fetch();
        binder.render(RowSet::from_records(&records));
        binder
    }

    #[test]
    fn fetch_and_render_cycle() {
        let mut binder = ViewBinder::default();
        assert_eq!(binder.state(), ViewState::Idle);
        binder.begin_fetch();
        assert_eq!(binder.state(), ViewState::Fetching);
        binder.render(RowSet::default());
        assert_eq!(binder.state(), ViewState::Idle);
    }

    #[test]
    fn failed_fetch_keeps_previous_rows() {
        let mut binder = binder_with_rows();
        binder.begin_fetch();
        binder.fetch_failed();
        assert_eq!(binder.state(), ViewState::Idle);
        assert_eq!(binder.rows().len(), 2);
    }

    #[test]
    fn delete_cell_dispatches_delete() {
        let binder = binder_with_rows();
        assert_eq!(
            binder.dispatch(0, CellKind::Delete),
            Action::Delete(RecordId::new("11"))
        );
    }

    #[test]
    fn field_cell_navigates_to_detail_page() {
        let binder = binder_with_rows();
        assert_eq!(
            binder.dispatch(0, CellKind::Field(3)),
            Action::Navigate {
                id: RecordId::new("11"),
                link: "html/data.html?op=search&showid=yes&recids=11".to_string(),
            }
        );
    }

    #[test]
    fn rows_without_id_or_out_of_range_are_ignored() {
        let binder = binder_with_rows();
        assert_eq!(binder.dispatch(1, CellKind::Delete), Action::Ignore);
        assert_eq!(binder.dispatch(9, CellKind::Field(0)), Action::Ignore);
    }

    #[test]
    fn cell_columns_map_to_kinds() {
        assert_eq!(CellKind::from_column(0), Some(CellKind::Field(0)));
        assert_eq!(CellKind::from_column(6), Some(CellKind::Field(6)));
        assert_eq!(CellKind::from_column(7), Some(CellKind::Delete));
        assert_eq!(CellKind::from_column(8), None);
    }

    #[test]
    fn submit_filter_strips_empty_pairs() {
        let mut binder = ViewBinder::default();
        let form = SearchForm {
            fld: "2".to_string(),
            ..Default::default()
        };
        let params = binder.submit_filter(&form, "foo=&bar=baz&empty=").unwrap();
        assert_eq!(params.to_query_string(), "fld=2&bar=baz");
        assert_eq!(binder.active_filter(), &params);
    }

    #[test]
    fn invalid_filter_keeps_previous_filter() {
        let mut binder = ViewBinder::default();
        binder
            .submit_filter(&SearchForm::default(), "bar=baz")
            .unwrap();
        let bad = SearchForm {
            compare: "like".to_string(),
            ..Default::default()
        };
        assert!(binder.submit_filter(&bad, "").is_err());
        assert_eq!(binder.active_filter().to_query_string(), "bar=baz");
    }
}
