use reqwest::{Client, RequestBuilder, Url};

#[allow(clippy::module_inception)]
mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

/// A request the CLI can send to a running server.
pub trait ApiRequest {
    type Response;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder;
}

/// `base_url` with its path replaced by `path`.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Url {
    let mut url = base_url.clone();
    url.set_path(path);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_replaces_path() {
        let base = Url::parse("http://localhost:7777/ignored").unwrap();
        assert_eq!(
            endpoint(&base, "/file/00000000000000ff").as_str(),
            "http://localhost:7777/file/00000000000000ff"
        );
    }
}
