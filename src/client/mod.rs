mod detect;

pub use detect::{DserveErrorDetector, ErrorDetector};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::filter::FilterParams;
use crate::rows::{records_from_payload, Record, RecordId};

pub const DEFAULT_TIMEOUT_SECONDS: usize = 10;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("database name is empty")]
    MissingDatabase,

    #[error("invalid header '{header}', expected 'Key: Value'")]
    InvalidHeader { header: String },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub database: String,
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
    pub header: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            proxy: None,
            header: None,
        }
    }
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), ClientError> {
    let invalid = || ClientError::InvalidHeader {
        header: raw.to_string(),
    };
    let (name, value) = raw.split_once(':').ok_or_else(invalid)?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    Ok((name, value))
}

/// Builds the navigation link to the detail page of one record.
pub fn detail_link(detail_page: &str, id: &RecordId) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("op", "search")
        .append_pair("showid", "yes")
        .append_pair("recids", id.as_str());
    let sep = if detail_page.contains('?') { '&' } else { '?' };
    format!("{detail_page}{sep}{}", query.finish())
}

pub struct QueryClient<D = DserveErrorDetector> {
    http: reqwest::Client,
    base_url: Url,
    database: String,
    detector: D,
}

impl QueryClient<DserveErrorDetector> {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_detector(config, DserveErrorDetector)
    }
}

impl<D: ErrorDetector> QueryClient<D> {
    pub fn with_detector(config: ClientConfig, detector: D) -> Result<Self, ClientError> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| ClientError::InvalidUrl {
            url: config.base_url.clone(),
            source: e,
        })?;
        let database = config.database.trim().to_string();
        if database.is_empty() {
            return Err(ClientError::MissingDatabase);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        if let Some(raw) = config.header.as_deref().filter(|h| !h.trim().is_empty()) {
            let (name, value) = parse_header(raw)?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(
                config.timeout_seconds.try_into().unwrap_or(10),
            ));
        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| ClientError::ProxySetup {
                proxy: proxy.to_string(),
                source: e,
            })?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::HttpClientBuild { source: e })?;

        Ok(Self {
            http,
            base_url,
            database,
            detector,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn op_url(&self, op: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("db", &self.database)
            .append_pair("op", op);
        url
    }

    pub fn search_url(&self, filter: &FilterParams) -> Url {
        let mut url = self.op_url("search");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("showid", "yes");
            for (k, v) in filter.pairs() {
                match v {
                    Some(v) => query.append_pair(k, v),
                    None => query.append_key_only(k),
                };
            }
        }
        url
    }

    pub fn record_url(&self, id: &RecordId) -> Url {
        let mut url = self.op_url("search");
        url.query_pairs_mut()
            .append_pair("showid", "yes")
            .append_pair("recids", id.as_str());
        url
    }

    pub fn delete_url(&self, id: &RecordId) -> Url {
        let mut url = self.op_url("delete");
        url.query_pairs_mut().append_pair("recids", id.as_str());
        url
    }

    async fn get_json(&self, url: Url) -> Result<Value, ClientError> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ClientError::Decode {
                url: url.to_string(),
                source: e,
            })
    }

    /// Runs a search. A payload flagged as an error yields no records.
    pub async fn search(&self, filter: &FilterParams) -> Result<Vec<Record>, ClientError> {
        let payload = self.get_json(self.search_url(filter)).await?;
        if let Some(message) = self.detector.detect(&payload) {
            warn!(db = %self.database, %message, "search returned an error");
            return Ok(Vec::new());
        }
        let records = records_from_payload(payload);
        debug!(count = records.len(), "search returned records");
        Ok(records)
    }

    pub async fn fetch_record(&self, id: &RecordId) -> Result<Option<Record>, ClientError> {
        let payload = self.get_json(self.record_url(id)).await?;
        if let Some(message) = self.detector.detect(&payload) {
            warn!(%id, %message, "record lookup returned an error");
            return Ok(None);
        }
        Ok(records_from_payload(payload).into_iter().next())
    }

    /// Deletes one record. Only the error flag of the reply is looked at.
    pub async fn remove(&self, id: &RecordId) -> Result<(), ClientError> {
        let payload = self.get_json(self.delete_url(id)).await?;
        if let Some(message) = self.detector.detect(&payload) {
            warn!(%id, %message, "delete returned an error");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> QueryClient {
        QueryClient::new(ClientConfig::new("http://localhost/dserve", "1000")).unwrap()
    }

    #[test]
    fn search_url_carries_db_op_and_showid() {
        let url = client().search_url(&FilterParams::new());
        assert_eq!(
            url.as_str(),
            "http://localhost/dserve?db=1000&op=search&showid=yes"
        );
    }

    #[test]
    fn search_url_appends_non_empty_filter_params() {
        let url = client().search_url(&FilterParams::parse("foo=&bar=baz&empty="));
        assert_eq!(
            url.as_str(),
            "http://localhost/dserve?db=1000&op=search&showid=yes&bar=baz"
        );
    }

    #[test]
    fn search_url_keeps_bare_filter_keys() {
        let url = client().search_url(&FilterParams::parse("flag&x=1"));
        assert_eq!(
            url.as_str(),
            "http://localhost/dserve?db=1000&op=search&showid=yes&flag&x=1"
        );
    }

    #[test]
    fn delete_and_record_urls() {
        let c = client();
        let id = RecordId::new("42");
        assert_eq!(
            c.delete_url(&id).as_str(),
            "http://localhost/dserve?db=1000&op=delete&recids=42"
        );
        assert_eq!(
            c.record_url(&id).as_str(),
            "http://localhost/dserve?db=1000&op=search&showid=yes&recids=42"
        );
    }

    #[test]
    fn detail_link_targets_detail_page() {
        let id = RecordId::new("7");
        assert_eq!(
            detail_link("html/data.html", &id),
            "html/data.html?op=search&showid=yes&recids=7"
        );
        assert_eq!(
            detail_link("data.html?theme=dark", &id),
            "data.html?theme=dark&op=search&showid=yes&recids=7"
        );
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            QueryClient::new(ClientConfig::new("not a url", "1000")),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            QueryClient::new(ClientConfig::new("http://localhost/", " ")),
            Err(ClientError::MissingDatabase)
        ));
        let mut cfg = ClientConfig::new("http://localhost/", "1000");
        cfg.header = Some("no-colon".to_string());
        assert!(matches!(
            QueryClient::new(cfg),
            Err(ClientError::InvalidHeader { .. })
        ));
    }
}
