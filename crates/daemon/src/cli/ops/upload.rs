use std::path::PathBuf;

use clap::Args;
use tokio_util::io::ReaderStream;

use webfiles_daemon::http_server::api::client::ApiError;
use webfiles_daemon::http_server::api::upload::UploadRequest;

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// File to upload
    pub path: PathBuf,

    /// Name to store the file under (defaults to the file's name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0} has no file name")]
    NoFileName(PathBuf),
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = UploadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let file_name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| UploadError::NoFileName(self.path.clone()))?,
        };

        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| UploadError::Io(self.path.clone(), e))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| UploadError::Io(self.path.clone(), e))?
            .len();

        let request = UploadRequest {
            file_name,
            length,
            body: reqwest::Body::wrap_stream(ReaderStream::new(file)),
        };
        let response = ctx.client.call(request).await?;

        Ok(format!(
            "uid:       {}\nfile_name: {}\nfile_size: {}\ntoken:     {}",
            response.file.uid, response.file.file_name, response.file.file_size, response.token
        ))
    }
}
