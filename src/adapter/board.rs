//! GraphQL client for the work-item board.
//!
//! Fetches candidate items with their link and fitness columns, and writes
//! results back through column mutations. One page of up to 500 items is
//! read per fetch; a full page is an error rather than a silent truncation.

use super::BoardService;
use crate::candidate::Candidate;
use crate::config::{BoardColumns, BoardConfig};
use crate::error::BoardError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const PAGE_LIMIT: usize = 500;
const BOARD_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const BOARD_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const ITEMS_QUERY: &str = r#"
query ($boardId: [ID!]) {
  boards(ids: $boardId) {
    items_page(limit: 500) {
      items {
        id
        name
        column_values {
          id
          value
          text
          type
          ... on FormulaValue {
            display_value
          }
        }
      }
    }
  }
}"#;

const CHANGE_COLUMN_VALUE: &str = r#"
mutation ($boardId: ID!, $itemId: ID!, $columnId: String!, $value: JSON!) {
  change_column_value(board_id: $boardId, item_id: $itemId, column_id: $columnId, value: $value) {
    id
  }
}"#;

const CHANGE_MULTIPLE_COLUMN_VALUES: &str = r#"
mutation ($boardId: ID!, $itemId: ID!, $columnValues: JSON!) {
  change_multiple_column_values(board_id: $boardId, item_id: $itemId, column_values: $columnValues) {
    id
  }
}"#;

/// Board client backed by the platform's GraphQL API.
pub struct BoardClient {
    client: Client,
    endpoint: String,
    api_token: String,
    board_id: String,
    columns: BoardColumns,
}

/// One board item with the columns the pipeline reads.
#[derive(Debug, Clone)]
struct BoardItem {
    id: String,
    name: String,
    source_url: Option<String>,
    generation_url: Option<String>,
    fitness: f64,
}

impl BoardClient {
    pub fn new(config: &BoardConfig) -> Result<Self, BoardError> {
        let client = Client::builder()
            .connect_timeout(BOARD_HTTP_CONNECT_TIMEOUT)
            .timeout(BOARD_HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BoardError::RequestFailed(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            board_id: config.board_id.clone(),
            columns: config.columns.clone(),
        })
    }

    /// Send one GraphQL document and return the `data` payload.
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, BoardError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.api_token)
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(map_board_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                401 | 403 => BoardError::AuthFailed(text),
                _ => BoardError::RequestFailed(format!(
                    "Request failed with status {status}: {text}"
                )),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BoardError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .map(|error| {
                        error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown error")
                    })
                    .collect();
                return Err(BoardError::QueryErrors(messages.join("; ")));
            }
        }

        body.get("data")
            .cloned()
            .ok_or_else(|| BoardError::InvalidResponse("response has no data field".to_string()))
    }

    async fn change_column_value(
        &self,
        item_id: &str,
        column_id: &str,
        value: String,
    ) -> Result<(), BoardError> {
        self.graphql(
            CHANGE_COLUMN_VALUE,
            json!({
                "boardId": self.board_id,
                "itemId": item_id,
                "columnId": column_id,
                "value": value,
            }),
        )
        .await?;
        Ok(())
    }

    async fn change_multiple_column_values(
        &self,
        item_id: &str,
        column_values: String,
    ) -> Result<(), BoardError> {
        self.graphql(
            CHANGE_MULTIPLE_COLUMN_VALUES,
            json!({
                "boardId": self.board_id,
                "itemId": item_id,
                "columnValues": column_values,
            }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BoardService for BoardClient {
    async fn get_podcast_candidates(
        &self,
        max_items: usize,
    ) -> Result<Vec<Candidate>, BoardError> {
        info!(board_id = %self.board_id, "Fetching board items");
        let data = self
            .graphql(ITEMS_QUERY, json!({ "boardId": [self.board_id] }))
            .await?;

        let items = parse_board_items(&data, &self.columns)?;
        if items.len() == PAGE_LIMIT {
            return Err(BoardError::PaginationRequired {
                board_id: self.board_id.clone(),
                limit: PAGE_LIMIT,
            });
        }

        let candidates = select_candidates(items, max_items);
        info!(count = candidates.len(), "Selected podcast candidates");
        Ok(candidates)
    }

    async fn update_item_with_generated_podcast_url(
        &self,
        item_id: &str,
        podcast_url: &str,
    ) -> Result<(), BoardError> {
        debug!(item_id, podcast_url, "Writing podcast URL to board");
        let value = Value::String(podcast_url.to_string()).to_string();
        self.change_column_value(item_id, &self.columns.podcast_link, value)
            .await?;
        info!(item_id, "Updated item with podcast URL");
        Ok(())
    }

    async fn mark_item_as_non_podcastable(&self, item_id: &str) -> Result<(), BoardError> {
        let value = json!({ "checked": "true" }).to_string();
        self.change_column_value(item_id, &self.columns.non_podcastable, value)
            .await?;
        info!(item_id, "Marked item as non-podcastable");
        Ok(())
    }

    async fn update_item_with_notebook_audio_link_and_title(
        &self,
        item_id: &str,
        notebook_url: &str,
        title: &str,
    ) -> Result<(), BoardError> {
        debug!(item_id, notebook_url, title, "Writing notebook link to board");
        let column_values = notebook_link_values(&self.columns, notebook_url, title);
        self.change_multiple_column_values(item_id, column_values)
            .await?;
        info!(item_id, "Updated item with notebook audio link and title");
        Ok(())
    }
}

fn map_board_http_error(error: reqwest::Error) -> BoardError {
    if error.is_timeout() {
        BoardError::RequestFailed(format!("Request timeout: {error}"))
    } else if error.is_connect() {
        BoardError::RequestFailed(format!("Connection error: {error}"))
    } else {
        BoardError::RequestFailed(format!("HTTP error: {error}"))
    }
}

/// Column values payload setting the item name and the audio-link column.
fn notebook_link_values(columns: &BoardColumns, notebook_url: &str, title: &str) -> String {
    let mut values = serde_json::Map::new();
    values.insert("name".to_string(), Value::String(title.to_string()));
    values.insert(
        columns.audio_link.clone(),
        json!({ "url": notebook_url, "text": notebook_url }),
    );
    Value::Object(values).to_string()
}

/// Pull the pipeline's columns out of the raw items page.
fn parse_board_items(data: &Value, columns: &BoardColumns) -> Result<Vec<BoardItem>, BoardError> {
    #[derive(Deserialize)]
    struct ColumnValue {
        id: String,
        value: Option<String>,
        text: Option<String>,
        display_value: Option<String>,
    }

    #[derive(Deserialize)]
    struct Item {
        id: String,
        name: String,
        column_values: Vec<ColumnValue>,
    }

    let raw_items = data
        .pointer("/boards/0/items_page/items")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            BoardError::InvalidResponse("no items page in board response".to_string())
        })?;

    let mut items = Vec::with_capacity(raw_items.len());
    for raw in raw_items {
        let item: Item = serde_json::from_value(raw.clone())
            .map_err(|e| BoardError::InvalidResponse(format!("malformed board item: {e}")))?;

        let mut source_url = None;
        let mut generation_url = None;
        let mut fitness = 0.0;
        for column in &item.column_values {
            if column.id == columns.source_url {
                source_url = parse_link_url(column.value.as_deref());
            } else if column.id == columns.audio_link {
                generation_url = parse_link_url(column.value.as_deref());
            } else if column.id == columns.fitness {
                // Fitness is a formula column; its value only appears in
                // display_value, with text as a fallback.
                let raw_fitness = column
                    .display_value
                    .as_deref()
                    .or(column.text.as_deref())
                    .unwrap_or("0");
                fitness = raw_fitness.trim().parse().unwrap_or(0.0);
            }
        }

        items.push(BoardItem {
            id: item.id,
            name: item.name,
            source_url,
            generation_url,
            fitness,
        });
    }

    Ok(items)
}

/// Extract the URL from a link column's raw JSON value.
fn parse_link_url(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let url = parsed.get("url")?.as_str()?.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Filter to processable items, best fitness first, capped at `max_items`.
fn select_candidates(items: Vec<BoardItem>, max_items: usize) -> Vec<Candidate> {
    let mut candidates: Vec<(f64, Candidate)> = items
        .into_iter()
        .filter(|item| item.fitness > 0.0)
        .filter_map(|item| {
            let source_url = item.source_url?;
            if !source_url.starts_with("http") {
                return None;
            }
            let mut candidate =
                Candidate::new(item.id, item.name, source_url).with_fitness(item.fitness);
            if let Some(url) = item.generation_url {
                candidate = candidate.with_generation_url(url);
            }
            Some((item.fitness, candidate))
        })
        .collect();

    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates
        .into_iter()
        .take(max_items)
        .map(|(_, candidate)| candidate)
        .collect()
}
