use clap::Args;

use webfiles_daemon::http_server::api::client::ApiError;
use webfiles_daemon::http_server::api::token::TokenRequest;

#[derive(Args, Debug, Clone)]
pub struct Token;

#[async_trait::async_trait]
impl crate::cli::op::Op for Token {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        ctx.client.call_text(TokenRequest).await
    }
}
