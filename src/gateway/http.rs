/// REST gateway for the myVOD `user-movies` resource
///
/// Endpoint map:
/// 1. Add:    POST   {base}/user-movies/            body {"tconst": ...}
/// 2. List:   GET    {base}/user-movies/?status=watchlist|watched
/// 3. Patch:  PATCH  {base}/user-movies/{id}/       body {"action": ...}
/// 4. Delete: DELETE {base}/user-movies/{id}/
/// 5. Search: GET    {base}/movies/?search=...
use std::time::Duration;

use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::Serialize;

use crate::{
    config::Config,
    error::{GatewayError, GatewayResult},
    gateway::{MovieListGateway, MovieSearch},
    models::{ListStatus, MovieId, RecordId, SearchHit, UserMovie, UserMovieAction},
};

#[derive(Clone)]
pub struct HttpMovieListGateway {
    http_client: HttpClient,
    api_url: String,
    api_token: Option<String>,
}

#[derive(Serialize)]
struct AddUserMovieCommand<'a> {
    tconst: &'a str,
}

#[derive(Serialize)]
struct UpdateUserMovieCommand {
    action: UserMovieAction,
}

impl HttpMovieListGateway {
    /// Creates a gateway from the loaded configuration
    pub fn new(config: &Config) -> GatewayResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            api_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn record_url(&self, record_id: RecordId) -> String {
        format!("{}/user-movies/{}/", self.api_url, record_id)
    }

    async fn list(&self, status: ListStatus) -> GatewayResult<Vec<UserMovie>> {
        let url = format!("{}/user-movies/", self.api_url);

        let response = self
            .authorized(self.http_client.get(&url))
            .query(&[("status", status.as_str())])
            .send()
            .await?;

        let response = check_status(response, Operation::List).await?;
        let records: Vec<UserMovie> = response.json().await?;

        tracing::debug!(status = %status, count = records.len(), "Listed user movies");

        Ok(records)
    }

    async fn patch(&self, record_id: RecordId, action: UserMovieAction) -> GatewayResult<()> {
        let response = self
            .authorized(self.http_client.patch(self.record_url(record_id)))
            .json(&UpdateUserMovieCommand { action })
            .send()
            .await?;

        check_status(response, Operation::Patch).await?;

        tracing::debug!(record_id, action = ?action, "Patched user movie");

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    List,
    Patch,
    Delete,
}

/// Maps a non-success response onto the gateway error taxonomy
///
/// The patch endpoint answers 400 with an "already ..." message when the record is already
/// in the requested state, so that case counts as a conflict too.
fn classify(operation: Operation, status: StatusCode, body: String) -> GatewayError {
    match status {
        StatusCode::CONFLICT => GatewayError::Conflict(body),
        StatusCode::BAD_REQUEST
            if operation == Operation::Patch && body.to_lowercase().contains("already") =>
        {
            GatewayError::Conflict(body)
        }
        StatusCode::NOT_FOUND => GatewayError::NotFound(body),
        s if s.is_server_error() => {
            GatewayError::Transport(format!("API returned status {}: {}", s, body))
        }
        s => GatewayError::Rejected {
            status: s.as_u16(),
            message: body,
        },
    }
}

async fn check_status(response: Response, operation: Operation) -> GatewayResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let err = classify(operation, status, body);

    if err.is_conflict() {
        tracing::debug!(operation = ?operation, status = %status, "Gateway reported conflict");
    } else {
        tracing::warn!(operation = ?operation, status = %status, error = %err, "Gateway request failed");
    }

    Err(err)
}

#[async_trait::async_trait]
impl MovieListGateway for HttpMovieListGateway {
    async fn add_to_source(&self, movie_id: &MovieId) -> GatewayResult<RecordId> {
        let url = format!("{}/user-movies/", self.api_url);

        let response = self
            .authorized(self.http_client.post(&url))
            .json(&AddUserMovieCommand {
                tconst: movie_id.as_str(),
            })
            .send()
            .await?;

        let response = check_status(response, Operation::Add).await?;
        let record: UserMovie = response.json().await?;

        tracing::debug!(movie_id = %movie_id, record_id = record.id, "Added movie to watchlist");

        Ok(record.id)
    }

    async fn list_source(&self) -> GatewayResult<Vec<UserMovie>> {
        self.list(ListStatus::Watchlist).await
    }

    async fn transform_to_target(&self, record_id: RecordId) -> GatewayResult<()> {
        self.patch(record_id, UserMovieAction::MarkAsWatched).await
    }

    async fn list_target(&self) -> GatewayResult<Vec<UserMovie>> {
        self.list(ListStatus::Watched).await
    }

    async fn transform_to_source(&self, record_id: RecordId) -> GatewayResult<()> {
        self.patch(record_id, UserMovieAction::RestoreToWatchlist).await
    }

    async fn remove(&self, record_id: RecordId) -> GatewayResult<()> {
        let response = self
            .authorized(self.http_client.delete(self.record_url(record_id)))
            .send()
            .await?;

        check_status(response, Operation::Delete).await?;

        tracing::debug!(record_id, "Deleted user movie");

        Ok(())
    }
}

#[async_trait::async_trait]
impl MovieSearch for HttpMovieListGateway {
    async fn search_movies(&self, query: &str) -> GatewayResult<Vec<SearchHit>> {
        let url = format!("{}/movies/", self.api_url);

        let response = self
            .authorized(self.http_client.get(&url))
            .query(&[("search", query)])
            .send()
            .await?;

        let response = check_status(response, Operation::List).await?;
        let hits: Vec<SearchHit> = response.json().await?;

        tracing::info!(query = %query, results = hits.len(), "Movie search completed");

        Ok(hits)
    }
}
