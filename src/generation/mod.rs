//! Draft publication generation
//!
//! Turns one winning channel post into a draft publication: publication text
//! from the LLM, an optional image from the configured image service, a
//! publication row tagged as Telegram-sourced, and moderation routing with
//! the auto-approval short-circuit for organizations without moderators.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::GenerationSettings;
use crate::engine::ports::DraftPublisher;
use crate::llm::LlmClient;
use crate::models::{
    AutopostingConfig, ChannelPost, ModerationStatus, NewPublication, PublicationSource,
};
use crate::storage::publications::PublicationRepo;
use crate::utils::error::GenerateError;
use crate::utils::retry::{with_retry, RetryConfig};

/// Image service request
#[derive(Debug, Serialize)]
struct ImageRequest {
    category: String,
    prompt: String,
}

/// Image service response
#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    urls: Vec<String>,
}

/// Client for the external image generation service
///
/// The mechanics of image generation are out of scope here; this client
/// only posts the publication text and records whatever URLs come back.
pub struct ImageClient {
    client: Client,
    endpoint: String,
    retry: RetryConfig,
}

impl ImageClient {
    /// Create a new image client from the generation config section
    pub fn new(settings: &GenerationSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.image_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.image_endpoint.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    /// Generate images for a publication text
    pub async fn generate(&self, category: &str, text: &str) -> Result<Vec<String>> {
        let url = format!("{}/api/generate", self.endpoint);

        with_retry(&self.retry, || async {
            let response = self
                .client
                .post(&url)
                .json(&ImageRequest {
                    category: category.to_string(),
                    prompt: text.to_string(),
                })
                .send()
                .await
                .context("Failed to send request to image service")?;

            if !response.status().is_success() {
                let status = response.status();
                anyhow::bail!("Image service returned {status}");
            }

            let body: ImageResponse = response
                .json()
                .await
                .context("Failed to parse image service response")?;

            Ok(body.urls)
        })
        .await
    }
}

/// Production draft publisher
pub struct DraftComposer {
    llm: Arc<LlmClient>,
    images: ImageClient,
    publications: Arc<dyn PublicationRepo>,
}

impl DraftComposer {
    /// Create a new composer
    pub fn new(
        llm: Arc<LlmClient>,
        images: ImageClient,
        publications: Arc<dyn PublicationRepo>,
    ) -> Self {
        Self {
            llm,
            images,
            publications,
        }
    }
}

#[async_trait]
impl DraftPublisher for DraftComposer {
    async fn publish_draft(
        &self,
        config: &AutopostingConfig,
        post: &ChannelPost,
    ) -> crate::error::Result<Uuid> {
        let category = self.publications.category_name(config.category_id).await?;

        let text = self
            .llm
            .compose_draft(&category, &post.text)
            .await
            .map_err(GenerateError::Text)?;

        let image_url = if config.with_image {
            let urls = self
                .images
                .generate(&category, &text)
                .await
                .map_err(GenerateError::Image)?;
            urls.into_iter().next()
        } else {
            None
        };

        let moderator_count = self
            .publications
            .list_employees(config.organization_id)
            .await?
            .iter()
            .filter(|employee| employee.role.can_moderate())
            .count();

        let id = self
            .publications
            .create(&NewPublication {
                organization_id: config.organization_id,
                category_id: config.category_id,
                source_text: post.text.clone(),
                text,
                image_url,
                status: ModerationStatus::Moderation,
            })
            .await?;

        self.publications
            .set_source(id, PublicationSource::Telegram)
            .await?;

        if moderator_count == 0 {
            // Nobody to review the draft: approve it right away instead of
            // parking it in a queue no one reads.
            info!(publication = %id, "No moderators in organization, auto-approving");
            self.publications
                .moderate(
                    id,
                    None,
                    ModerationStatus::Approved,
                    "Auto-approved: organization has no moderators",
                )
                .await?;
        }

        Ok(id)
    }
}
