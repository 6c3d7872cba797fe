use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::error::ApiError;
use super::ApiRequest;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    /// A client for `remote`, presenting `token` as a bearer credential on
    /// every request when given.
    pub fn new(remote: &Url, token: Option<&str>) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidToken)?;
            value.set_sensitive(true);
            default_headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Send `request` and decode a JSON response.
    pub async fn call<T>(&self, request: T) -> Result<T::Response, ApiError>
    where
        T: ApiRequest,
        T::Response: DeserializeOwned,
    {
        let response = self.send(request).await?;
        Ok(response.json::<T::Response>().await?)
    }

    /// Send `request` and return the plain text response.
    pub async fn call_text<T>(&self, request: T) -> Result<String, ApiError>
    where
        T: ApiRequest<Response = String>,
    {
        let response = self.send(request).await?;
        Ok(response.text().await?)
    }

    /// Send `request` and hand back the successful response unread, for
    /// streaming bodies.
    pub async fn send<T: ApiRequest>(&self, request: T) -> Result<Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client);
        let response = request_builder.send().await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::HttpStatus(
                response.status(),
                response.text().await?,
            ))
        }
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
