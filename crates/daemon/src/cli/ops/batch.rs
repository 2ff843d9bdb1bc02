use clap::Args;

use common::manifest::BatchManifest;
use service::http::api::client::ApiError;
use service::http::api::v0::batches::BatchRequest;

#[derive(Args, Debug, Clone)]
pub struct Batch {
    #[command(flatten)]
    pub request: BatchRequest,

    /// Print the raw manifest JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to render manifest: {0}")]
    Render(#[from] serde_json::Error),
}

fn summarize(manifest: &BatchManifest) -> String {
    let mut lines = vec![
        format!("Batch: {}", manifest.batch_id),
        format!(
            "Total: {} files, {} bytes",
            manifest.total_files, manifest.total_bytes
        ),
    ];
    for dir in &manifest.directories {
        lines.push(format!(
            "  {}  {} files, {} bytes",
            dir.directory_path, dir.file_count, dir.total_bytes
        ));
    }
    lines.join("\n")
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Batch {
    type Error = BatchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let manifest = ctx.client.call(self.request.clone()).await?;

        if self.json {
            Ok(serde_json::to_string_pretty(&manifest)?)
        } else {
            Ok(summarize(&manifest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_lists_directories() {
        let manifest: BatchManifest = serde_json::from_value(serde_json::json!({
            "batch_id": "reprocess_0123456789abcdef0123456789abcdef",
            "directories": [{
                "directory_path": "/01KA1H53CP2TAW8P8VSZ8JX3S5",
                "processing_config": {
                    "ocr": false, "reorganize": false,
                    "pinax": true, "cheimarros": false, "describe": false
                },
                "file_count": 1,
                "total_bytes": 5,
                "files": [{
                    "staging_key": "staging/reprocess_0123456789abcdef0123456789abcdef/01KA1H53CP2TAW8P8VSZ8JX3S5/notes.md",
                    "name": "notes.md",
                    "size": 5,
                    "content_type": "text/markdown"
                }],
                "existing_pi": "01KA1H53CP2TAW8P8VSZ8JX3S5",
                "existing_children_paths": []
            }],
            "total_files": 1,
            "total_bytes": 5
        }))
        .unwrap();

        let summary = summarize(&manifest);
        assert!(summary.contains("Total: 1 files, 5 bytes"));
        assert!(summary.contains("/01KA1H53CP2TAW8P8VSZ8JX3S5  1 files, 5 bytes"));
    }
}
