use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::DashboardError;
use crate::models::DailyRecord;

/// Supplies the raw daily log. One read per load, no retries.
#[async_trait]
pub trait DataSource {
    fn location(&self) -> String;
    async fn fetch(&self) -> Result<String, DashboardError>;
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, DashboardError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| DashboardError::unavailable(self.location(), err))
    }
}

pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, DashboardError> {
        let url = Url::parse(url)
            .map_err(|err| DashboardError::InvalidConfig(format!("bad source url {url}: {err}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| DashboardError::unavailable(url.as_str(), err))?;
        Ok(Self { client, url })
    }
}

/// Appends a `_=<stamp>` query pair so intermediaries never serve a stale log.
pub fn cache_busted_url(base: &Url, stamp: i64) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("_", &stamp.to_string());
    url
}

#[async_trait]
impl DataSource for HttpSource {
    fn location(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<String, DashboardError> {
        let url = cache_busted_url(&self.url, Utc::now().timestamp_millis());
        debug!(%url, "fetching daily log");

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|err| DashboardError::unavailable(self.location(), err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::unavailable(
                self.location(),
                format!("server answered {status}"),
            ));
        }

        response
            .text()
            .await
            .map_err(|err| DashboardError::unavailable(self.location(), err))
    }
}

pub fn open_source(
    location: &str,
    timeout_secs: u64,
) -> Result<Box<dyn DataSource + Send + Sync>, DashboardError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpSource::new(location, timeout_secs)?))
    } else {
        Ok(Box::new(FileSource::new(location)))
    }
}

#[derive(Deserialize)]
struct RawRecord {
    date: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, alias = "timeSpent")]
    time_spent: Option<f64>,
    #[serde(default)]
    bounty: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
}

/// True for exactly ten ASCII characters laid out as `YYYY-MM-DD`.
pub fn is_date_shaped(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

pub fn parse_date(value: &str) -> Result<NaiveDate, DashboardError> {
    let trimmed = value.trim();
    if !is_date_shaped(trimmed) {
        return Err(DashboardError::MalformedData(format!(
            "invalid date {value:?}: expected YYYY-MM-DD"
        )));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|err| DashboardError::MalformedData(format!("invalid date {value:?}: {err}")))
}

fn amount(index: usize, field: &str, value: Option<f64>) -> Result<f64, DashboardError> {
    let value = value.unwrap_or(0.0);
    if !value.is_finite() || value < 0.0 {
        return Err(DashboardError::MalformedData(format!(
            "record {index}: `{field}` must be a non-negative number, got {value}"
        )));
    }
    Ok(value)
}

/// Parses a JSON array of daily records in file order, defaulting missing amounts to 0.
pub fn parse_entries(text: &str) -> Result<Vec<DailyRecord>, DashboardError> {
    let items: Vec<serde_json::Value> = serde_json::from_str(text).map_err(|err| {
        DashboardError::MalformedData(format!("expected a JSON array of records: {err}"))
    })?;

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let raw: RawRecord = serde_json::from_value(item)
            .map_err(|err| DashboardError::MalformedData(format!("record {index}: {err}")))?;
        let date = raw.date.ok_or_else(|| {
            DashboardError::MalformedData(format!("record {index} is missing `date`"))
        })?;

        records.push(DailyRecord {
            date: parse_date(&date)?,
            score: amount(index, "score", raw.score)?,
            time_spent: amount(index, "time_spent", raw.time_spent)?,
            bounty: amount(index, "bounty", raw.bounty)?,
            notes: raw.notes.filter(|n| !n.is_empty()),
        });
    }

    Ok(records)
}

/// Like [`parse_entries`], but a date may appear only once.
pub fn parse_records(text: &str) -> Result<Vec<DailyRecord>, DashboardError> {
    let records = parse_entries(text)?;
    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if !seen.insert(record.date) {
            return Err(DashboardError::MalformedData(format!(
                "duplicate entry for {}",
                record.date
            )));
        }
    }
    Ok(records)
}

pub async fn load_records(
    source: &(dyn DataSource + Send + Sync),
) -> Result<Vec<DailyRecord>, DashboardError> {
    let body = source.fetch().await?;
    let records = parse_records(&body)?;
    info!(source = %source.location(), records = records.len(), "loaded daily log");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and hands back the raw request it received.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let read = socket.read(&mut buf).await.expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}/data.json"), handle)
    }

    #[test]
    fn missing_amounts_default_to_zero() {
        let records = parse_records(r#"[{"date": "2024-01-01"}, {"date": "2024-01-02", "score": null}]"#)
            .expect("valid log");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, 0.0);
        assert_eq!(records[0].time_spent, 0.0);
        assert_eq!(records[1].bounty, 0.0);
    }

    #[test]
    fn accepts_both_time_field_spellings() {
        let records = parse_records(
            r#"[{"date": "2024-01-01", "time_spent": 45},
                {"date": "2024-01-02", "timeSpent": 90, "notes": "deep work"}]"#,
        )
        .expect("valid log");
        assert_eq!(records[0].time_spent, 45.0);
        assert_eq!(records[1].time_spent, 90.0);
        assert_eq!(records[1].notes.as_deref(), Some("deep work"));
    }

    #[test]
    fn rejects_non_array_payloads() {
        let err = parse_records(r#"{"date": "2024-01-01"}"#).unwrap_err();
        assert!(matches!(err, DashboardError::MalformedData(_)));
        assert!(parse_records("not json").is_err());
    }

    #[test]
    fn rejects_missing_or_bad_dates() {
        assert!(matches!(
            parse_records(r#"[{"score": 5}]"#),
            Err(DashboardError::MalformedData(_))
        ));
        assert!(matches!(
            parse_records(r#"[{"date": "01/02/2024"}]"#),
            Err(DashboardError::MalformedData(_))
        ));
    }

    #[test]
    fn dates_must_be_zero_padded() {
        assert!(matches!(
            parse_date("2024-1-5"),
            Err(DashboardError::MalformedData(_))
        ));
        assert!(parse_records(r#"[{"date": "2024-01-5"}]"#).is_err());
        assert_eq!(
            parse_date("2024-01-05").ok(),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert!(is_date_shaped("2024-02-30"));
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn rejects_negative_and_textual_amounts() {
        assert!(parse_records(r#"[{"date": "2024-01-01", "bounty": -5}]"#).is_err());
        assert!(parse_records(r#"[{"date": "2024-01-01", "score": "ten"}]"#).is_err());
    }

    #[test]
    fn duplicate_dates_are_rejected_for_the_dashboard() {
        let text = r#"[{"date": "2024-01-01"}, {"date": "2024-01-01"}]"#;
        assert_eq!(parse_entries(text).map(|r| r.len()).ok(), Some(2));
        assert!(matches!(
            parse_records(text),
            Err(DashboardError::MalformedData(_))
        ));
    }

    #[test]
    fn cache_buster_is_appended_to_existing_query() {
        let base = Url::parse("https://example.com/data.json?branch=main").expect("url");
        let busted = cache_busted_url(&base, 1700000000000);
        assert_eq!(
            busted.as_str(),
            "https://example.com/data.json?branch=main&_=1700000000000"
        );
    }

    #[test]
    fn locations_pick_the_right_source() {
        let http = open_source("https://example.com/data.json", 5).expect("http source");
        assert_eq!(http.location(), "https://example.com/data.json");
        let file = open_source("logs/data.json", 5).expect("file source");
        assert_eq!(file.location(), "logs/data.json");
    }

    #[tokio::test]
    async fn http_source_bypasses_caches() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"[{"date": "2024-03-01", "score": 42, "time_spent": 30}]"#,
        )
        .await;

        let source = HttpSource::new(&url, 5).expect("http source");
        let records = load_records(&source).await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 42.0);
        assert_eq!(records[0].time_spent, 30.0);

        let request = server.await.expect("server task").to_lowercase();
        let request_line = request.lines().next().unwrap_or_default();
        assert!(request_line.starts_with("get /data.json?_="), "{request_line}");
        assert!(request.contains("cache-control: no-cache"), "{request}");
    }

    #[tokio::test]
    async fn http_error_status_is_source_unavailable() {
        let (url, server) = serve_once("HTTP/1.1 404 Not Found", "").await;

        let source = HttpSource::new(&url, 5).expect("http source");
        let err = load_records(&source).await.unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable { .. }), "{err}");
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn file_source_loads_records() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"[{{"date": "2024-02-02", "score": 7}}]"#).expect("write");

        let source = FileSource::new(file.path());
        let records = load_records(&source).await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 7.0);
    }

    #[tokio::test]
    async fn missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = FileSource::new(dir.path().join("absent.json"));
        let err = load_records(&source).await.unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable { .. }));
    }
}
