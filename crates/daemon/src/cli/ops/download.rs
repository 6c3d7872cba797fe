use std::path::PathBuf;

use clap::Args;
use futures::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::io::AsyncWriteExt;

use common::content::Uid;
use webfiles_daemon::http_server::api::client::ApiError;
use webfiles_daemon::http_server::api::file::DownloadRequest;

#[derive(Args, Debug, Clone)]
pub struct Download {
    /// Uid of the file (16 hex digits)
    pub uid: Uid,

    /// Where to write the file (defaults to the stored file name)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to write {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Download {
    type Error = DownloadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.send(DownloadRequest { uid: self.uid }).await?;

        let output = self.output.clone().unwrap_or_else(|| {
            response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok())
                .and_then(attachment_name)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(self.uid.to_string()))
        });

        let io_err = |e| DownloadError::Io(output.clone(), e);
        let mut file = tokio::fs::File::create(&output).await.map_err(io_err)?;
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(ApiError::from)?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;

        Ok(format!(
            "Downloaded {} to {} ({} bytes)",
            self.uid,
            output.display(),
            written
        ))
    }
}

/// The bare file name from an `attachment; filename="..."` header.
fn attachment_name(disposition: &str) -> Option<String> {
    let name = disposition
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))?
        .trim_matches('"');
    // never write outside the working directory
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}
