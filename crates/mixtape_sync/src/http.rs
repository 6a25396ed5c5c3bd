//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via a trait so embedders can plug
//! in whichever library the platform offers (reqwest, hyper, a webview
//! bridge). This transport owns URL construction and JSON payloads.

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use async_trait::async_trait;
use mixtape_protocol::{
    ChangesResponse, CreatePlaylistResponse, DeletePlaylistResponse, Playlist, PlaylistDelta,
    PlaylistId, StarDelta, StarResponse, Timestamp, UpdatePlaylistResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the method as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An outbound HTTP request, ready for a client to send.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// JSON body, if the endpoint takes one.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a `GET` request.
    #[must_use]
    pub fn get(url: String) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            body: None,
        }
    }

    /// Creates a `POST` request with a JSON body.
    #[must_use]
    pub fn post(url: String, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            body: Some(body),
        }
    }

    /// Creates a `PUT` request with a JSON body.
    #[must_use]
    pub fn put(url: String, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Put,
            url,
            body: Some(body),
        }
    }

    /// Creates a `DELETE` request.
    #[must_use]
    pub fn delete(url: String) -> Self {
        Self {
            method: HttpMethod::Delete,
            url,
            body: None,
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. The returned
/// bytes are the response body of a successful request; any failure
/// (connection, status, timeout policy) is reported as a message.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response body.
    async fn send(&self, request: HttpRequest) -> Result<Vec<u8>, String>;
}

/// HTTP-based sync transport.
///
/// Uses JSON encoding for request and response bodies.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the sync API (e.g. `https://api.example.com/v1`).
    base_url: String,
    /// HTTP client implementation.
    client: C,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn encode<Req: Serialize>(body: &Req) -> SyncResult<Vec<u8>> {
        serde_json::to_vec(body)
            .map_err(|e| SyncError::Protocol(format!("failed to encode request: {e}")))
    }

    async fn send_json<Res: DeserializeOwned>(&self, request: HttpRequest) -> SyncResult<Res> {
        let body = self
            .client
            .send(request)
            .await
            .map_err(SyncError::Network)?;

        serde_json::from_slice(&body)
            .map_err(|e| SyncError::Protocol(format!("failed to decode response: {e}")))
    }
}

#[async_trait]
impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    async fn fetch_changes(&self, since: Option<Timestamp>) -> SyncResult<ChangesResponse> {
        // a missing cursor requests the full snapshot: no `from` parameter
        let url = match since {
            Some(cursor) => format!("{}/data?from={cursor}", self.base_url),
            None => format!("{}/data", self.base_url),
        };
        self.send_json(HttpRequest::get(url)).await
    }

    async fn create_playlist(&self, playlist: &Playlist) -> SyncResult<CreatePlaylistResponse> {
        let url = format!("{}/playlist", self.base_url);
        self.send_json(HttpRequest::post(url, Self::encode(playlist)?))
            .await
    }

    async fn update_playlist(
        &self,
        id: &PlaylistId,
        delta: &PlaylistDelta,
    ) -> SyncResult<UpdatePlaylistResponse> {
        let url = format!("{}/playlist/{id}", self.base_url);
        self.send_json(HttpRequest::put(url, Self::encode(delta)?))
            .await
    }

    async fn delete_playlist(&self, id: &PlaylistId) -> SyncResult<DeletePlaylistResponse> {
        let url = format!("{}/playlist/{id}", self.base_url);
        self.send_json(HttpRequest::delete(url)).await
    }

    async fn update_starred(&self, delta: &StarDelta) -> SyncResult<StarResponse> {
        let url = format!("{}/star", self.base_url);
        self.send_json(HttpRequest::put(url, Self::encode(delta)?))
            .await
    }
}
