//! REST backend client
//!
//! Talks to the hosted PostgREST API with the project API key as both the
//! `apikey` header and the bearer token. Implements every store trait from
//! `routehub_common::store`.

mod content_range;

pub use content_range::ContentRange;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, RANGE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use routehub_common::config::{BackendConfig, ResourceNames};
use routehub_common::models::{
    AssociationRef, AssociationStatus, AssociationType, NewAssociation, Parent, ParentStatus,
    StatusFilter,
};
use routehub_common::store::{
    AssociationQuery, AssociationTypeLookup, AssociationWriter, ParentActivation, ParentQuery,
};
use routehub_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Duration;

const REST_PATH: &str = "/rest/v1";
const USER_AGENT: &str = concat!("routehub-admin/", env!("CARGO_PKG_VERSION"));

/// Query string pairs
type Query = Vec<(String, String)>;

fn pair(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

/// PostgREST client bound to one project
pub struct RestClient {
    http_client: reqwest::Client,
    base_url: String,
    resources: ResourceNames,
    page_size: usize,
}

impl RestClient {
    pub fn new(backend: &BackendConfig, resources: ResourceNames) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(backend.api_key.trim())
            .map_err(|_| Error::Config("API key contains invalid header characters".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", backend.api_key.trim()))
            .map_err(|_| Error::Config("API key contains invalid header characters".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(backend.timeout_secs))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: format!("{}{}", backend.url.trim_end_matches('/'), REST_PATH),
            resources,
            page_size: backend.page_size.max(1),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.base_url, table))
    }

    /// Read every row matching `query`, one `Range` page at a time
    ///
    /// Asks for an exact row total and stops once it is reached. Without a
    /// total, a short page proves nothing (the server may cap rows below
    /// `page_size`), so paging goes on until an empty page or 416.
    async fn fetch_all<T: DeserializeOwned + Send>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        let mut offset = 0usize;

        loop {
            let last = offset + self.page_size - 1;
            tracing::debug!(table, offset, last, "Fetching page");

            let response = self
                .request(Method::GET, table)
                .query(query)
                .header("Range-Unit", "items")
                .header("Prefer", "count=exact")
                .header(RANGE, format!("{}-{}", offset, last))
                .send()
                .await
                .map_err(transport)?;

            if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
                break;
            }

            let response = check_status(response).await?;
            let range = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .map(ContentRange::parse)
                .transpose()?;

            let page: Vec<T> = response
                .json()
                .await
                .map_err(|e| Error::Decode(format!("{}: {}", table, e)))?;
            let fetched = page.len();
            rows.extend(page);

            let more = range.and_then(|r| r.has_more()).unwrap_or(fetched > 0);
            if !more || fetched == 0 {
                break;
            }
            offset += fetched;
        }

        tracing::debug!(table, rows = rows.len(), "Fetched all pages");
        Ok(rows)
    }

    fn link_row(&self, new: &NewAssociation) -> Value {
        let mut row = Map::new();
        row.insert(
            self.resources.association_parent_column.clone(),
            json!(new.parent_id),
        );
        row.insert(
            self.resources.association_type_column.clone(),
            json!(new.association_type_id),
        );
        row.insert("priority".to_string(), json!(new.priority));
        row.insert("status".to_string(), json!(new.status));
        Value::Object(row)
    }
}

fn transport(e: reqwest::Error) -> Error {
    Error::Transport(e.to_string())
}

/// Map non-success responses to `Error::Http` carrying the body
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Http {
        status: status.as_u16(),
        body,
    })
}

fn status_query<S: std::fmt::Display + Copy>(query: &mut Query, filter: StatusFilter<S>) {
    if let Some(status) = filter.status() {
        query.push(pair("status", format!("eq.{}", status)));
    }
}

#[async_trait]
impl ParentQuery for RestClient {
    async fn list_parents(&self, filter: StatusFilter<ParentStatus>) -> Result<Vec<Parent>> {
        let mut query: Query = vec![
            pair(
                "select",
                format!(
                    "id,name,status,lat:{},lng:{}",
                    self.resources.latitude_column, self.resources.longitude_column
                ),
            ),
            pair("order", "id.asc"),
        ];
        status_query(&mut query, filter);
        self.fetch_all(&self.resources.parents, &query).await
    }
}

#[async_trait]
impl AssociationQuery for RestClient {
    async fn list_associations(
        &self,
        filter: StatusFilter<AssociationStatus>,
    ) -> Result<Vec<AssociationRef>> {
        let parent = &self.resources.association_parent_column;
        let kind = &self.resources.association_type_column;
        let mut query: Query = vec![
            pair(
                "select",
                format!("parent_id:{},association_type_id:{}", parent, kind),
            ),
            pair("order", format!("{}.asc,{}.asc", parent, kind)),
        ];
        status_query(&mut query, filter);
        self.fetch_all(&self.resources.associations, &query).await
    }
}

#[async_trait]
impl AssociationTypeLookup for RestClient {
    async fn find_association_type_by_name(&self, name: &str) -> Result<Option<AssociationType>> {
        let column = &self.resources.association_type_name_column;
        let query: Query = vec![
            pair("select", format!("id,name:{}", column)),
            pair(column, format!("eq.{}", name)),
            pair("limit", "1"),
        ];

        tracing::debug!(name, "Looking up service type");
        let response = self
            .request(Method::GET, &self.resources.association_types)
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        let types: Vec<AssociationType> = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;

        Ok(types.into_iter().next())
    }
}

#[async_trait]
impl AssociationWriter for RestClient {
    async fn create_associations(&self, batch: &[NewAssociation]) -> Result<()> {
        let rows: Vec<Value> = batch.iter().map(|n| self.link_row(n)).collect();

        let response = self
            .request(Method::POST, &self.resources.associations)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;

        tracing::debug!(rows = batch.len(), "Created company services");
        Ok(())
    }
}

#[async_trait]
impl ParentActivation for RestClient {
    async fn activate_non_active_parents(&self) -> Result<u64> {
        // `neq` alone skips rows whose status is NULL
        let query: Query = vec![
            pair("or", "(status.neq.active,status.is.null)"),
            pair("select", "id"),
        ];

        let response = self
            .request(Method::PATCH, &self.resources.parents)
            .query(&query)
            .header("Prefer", "return=representation")
            .json(&json!({ "status": ParentStatus::Active }))
            .send()
            .await
            .map_err(transport)?;
        let changed: Vec<Value> = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;

        tracing::info!(count = changed.len(), "Activated companies");
        Ok(changed.len() as u64)
    }
}
