use clap::Args;

use common::pipeline::{CustomPrompts, ReprocessOptions, ReprocessRequest, ReprocessResponse};
use service::http::api::client::ApiError;
use service::http::api::v0::reprocess::ReprocessCall;

#[derive(Args, Debug, Clone)]
pub struct Submit {
    /// Identifier of the entity to reprocess
    #[arg(long)]
    pub pi: String,

    /// Phases to run (pinax, cheimarros, description)
    #[arg(long, value_delimiter = ',', required = true)]
    pub phases: Vec<String>,

    /// Also reprocess every ancestor up to the collection root
    #[arg(long)]
    pub cascade: bool,

    /// Stop the cascade below this ancestor
    #[arg(long)]
    pub stop_at_pi: Option<String>,

    /// Free-text note attached to the batch
    #[arg(long)]
    pub note: Option<String>,

    /// Prompt override applied to every phase
    #[arg(long)]
    pub prompt: Option<String>,

    /// User the request is made on behalf of
    #[arg(long)]
    pub user_id: Option<String>,
}

impl Submit {
    fn request(&self) -> ReprocessRequest {
        let custom_prompts = self.prompt.clone().map(|general| CustomPrompts {
            general: Some(general),
            ..Default::default()
        });
        let options = ReprocessOptions {
            stop_at_pi: self.stop_at_pi.clone(),
            custom_prompts,
            custom_note: self.note.clone(),
        };
        let options = (options != ReprocessOptions::default()).then_some(options);

        ReprocessRequest {
            pi: self.pi.clone(),
            phases: self.phases.clone(),
            cascade: self.cascade,
            options,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Submit {
    type Error = SubmitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let call = ReprocessCall {
            request: self.request(),
            user_id: self.user_id.clone(),
        };
        let response: ReprocessResponse = ctx.client.call(call).await?;

        let mut lines = vec![
            format!("Batch:    {}", response.batch_id),
            format!("Queued:   {} entities", response.entities_queued),
        ];
        lines.extend(response.entity_pis.iter().map(|pi| format!("  - {}", pi)));
        lines.push(format!("Status:   {}", response.status_url));
        Ok(lines.join("\n"))
    }
}
