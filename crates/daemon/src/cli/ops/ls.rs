use clap::Args;

use webfiles_daemon::http_server::api::client::ApiError;
use webfiles_daemon::http_server::api::user_files::UserFilesRequest;

#[derive(Args, Debug, Clone)]
pub struct Ls;

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let uids = ctx.client.call(UserFilesRequest).await?;
        if uids.is_empty() {
            return Ok("no files".to_string());
        }
        Ok(uids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
