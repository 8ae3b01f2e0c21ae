//! Task store backed by a hosted PostgREST table.
//!
//! This is the wire format spoken by Supabase projects: every table is
//! exposed under `/rest/v1/<table>`, filters go in the query string
//! (`id=eq.5`), and `Prefer: return=representation` asks the server to echo
//! the affected rows back.

use crate::config::StoreConfig;
use crate::tasks::models::{Task, TaskId, TaskPatch};
use crate::tasks::store::{StoreError, StoreResult, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};

/// Path prefix of the PostgREST API on a hosted project.
const REST_PREFIX: &str = "rest/v1";

/// Ask the server to return the affected rows.
const RETURN_REPRESENTATION: &str = "return=representation";

/// A task row as stored in the remote table.
#[derive(Debug, Deserialize)]
struct TaskRow {
    id: TaskId,
    #[serde(default)]
    todo: Option<String>,
    #[serde(default)]
    is_completed: Option<bool>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            text: row.todo.unwrap_or_default(),
            is_completed: row.is_completed.unwrap_or(false),
            created_at: row.created_at,
        }
    }
}

/// Insert payload.
#[derive(Debug, Serialize)]
struct NewTaskRow<'a> {
    todo: &'a str,
    is_completed: bool,
}

/// Update payload. Absent fields are left out of the JSON body entirely.
#[derive(Debug, Serialize)]
struct TaskRowPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    todo: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_completed: Option<bool>,
}

impl<'a> From<&'a TaskPatch> for TaskRowPatch<'a> {
    fn from(patch: &'a TaskPatch) -> Self {
        Self { todo: patch.text.as_deref(), is_completed: patch.is_completed }
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Accept both `timestamptz` (with offset) and plain `timestamp` columns.
fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    // Postgres renders timestamptz with a short "+00" offset.
    if let Ok(ts) = DateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f%#z") {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid created_at '{raw}': {e}")))
}

/// Where the table lives and how to authenticate against it.
#[derive(Debug, Clone)]
struct Endpoint {
    table_url: String,
    table: String,
}

/// Task store talking to a hosted PostgREST table over HTTP.
#[derive(Debug, Clone)]
pub struct RestTaskStore {
    client: Client,
    endpoint: Option<Endpoint>,
}

impl RestTaskStore {
    /// Create a store from configuration.
    ///
    /// An incomplete configuration is not an error here: the store is
    /// created anyway and every call fails with [`StoreError::NotConfigured`].
    ///
    /// # Errors
    ///
    /// Returns an error if the access key cannot be used as a header value
    /// or the HTTP client cannot be built.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        fn set(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|s| !s.is_empty())
        }

        let mut builder = Client::builder().timeout(config.timeout());
        let mut endpoint = None;

        let (url, key) = (set(config.url.as_deref()), set(config.anon_key.as_deref()));
        if let (Some(url), Some(key)) = (url, key) {
            builder = builder.default_headers(auth_headers(key)?);
            endpoint = Some(Endpoint {
                table_url: format!("{}/{REST_PREFIX}/{}", url.trim_end_matches('/'), config.table),
                table: config.table.clone(),
            });
        }

        Ok(Self { client: builder.build()?, endpoint })
    }

    /// Whether the store has an endpoint and key to talk to.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    fn endpoint(&self) -> StoreResult<&Endpoint> {
        self.endpoint.as_ref().ok_or(StoreError::NotConfigured)
    }

    async fn fetch_one(&self, id: &TaskId) -> StoreResult<Task> {
        let endpoint = self.endpoint()?;
        let request = filter_id(self.client.get(&endpoint.table_url), id).query(&[("select", "*")]);
        let rows = read_rows(request.send().await?).await?;
        rows.into_iter().next().map(Task::from).ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

/// Restrict a request to the row with the given id (`id=eq.<id>`).
fn filter_id(builder: RequestBuilder, id: &TaskId) -> RequestBuilder {
    builder.query(&[("id", format!("eq.{id}"))])
}

fn auth_headers(key: &str) -> StoreResult<HeaderMap> {
    let invalid = |_| StoreError::Unavailable("access key is not a valid header value".into());

    let mut headers = HeaderMap::new();
    headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Read a response as a list of rows, turning error statuses into [`StoreError::Api`].
async fn read_rows(response: Response) -> StoreResult<Vec<TaskRow>> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(api_error(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
}

fn api_error(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|err| {
            let mut message = err.message?;
            for extra in [err.details, err.hint].into_iter().flatten() {
                message.push_str(" (");
                message.push_str(&extra);
                message.push(')');
            }
            Some(message)
        })
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    StoreError::Api { status: status.as_u16(), message }
}

#[async_trait]
impl TaskStore for RestTaskStore {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        let endpoint = self.endpoint()?;
        tracing::debug!(table = %endpoint.table, "listing tasks");

        let response = self
            .client
            .get(&endpoint.table_url)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;

        Ok(read_rows(response).await?.into_iter().map(Task::from).collect())
    }

    async fn create(&self, text: &str) -> StoreResult<Task> {
        let endpoint = self.endpoint()?;
        tracing::debug!(table = %endpoint.table, "creating task");

        let response = self
            .client
            .post(&endpoint.table_url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&[NewTaskRow { todo: text, is_completed: false }])
            .send()
            .await?;

        read_rows(response)
            .await?
            .into_iter()
            .next()
            .map(Task::from)
            .ok_or_else(|| StoreError::Decode("insert returned no rows".into()))
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        if patch.is_empty() {
            return self.fetch_one(id).await;
        }

        let endpoint = self.endpoint()?;
        tracing::debug!(table = %endpoint.table, %id, "updating task");

        let request = self
            .client
            .patch(&endpoint.table_url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&TaskRowPatch::from(patch));
        let response = filter_id(request, id).send().await?;

        read_rows(response)
            .await?
            .into_iter()
            .next()
            .map(Task::from)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn delete(&self, id: &TaskId) -> StoreResult<bool> {
        let endpoint = self.endpoint()?;
        tracing::debug!(table = %endpoint.table, %id, "deleting task");

        let request =
            self.client.delete(&endpoint.table_url).header("Prefer", RETURN_REPRESENTATION);
        let response = filter_id(request, id).send().await?;

        Ok(!read_rows(response).await?.is_empty())
    }
}
