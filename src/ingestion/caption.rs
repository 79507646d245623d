//! Image descriptions.

use crate::config::CaptioningSettings;
use crate::error::{DocgateError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessageContentPartImageArgs, ChatCompletionRequestMessageContentPartTextArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
};
use async_trait::async_trait;
use base64::Engine;
use tracing::instrument;

/// Produces a short natural-language description of an image.
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &[u8], extension: &str) -> Result<String>;
}

/// Description used when no captioner is available or it fails.
pub fn fallback_description(file_name: &str) -> String {
    format!("Image extracted from document: {}", file_name)
}

/// MIME type for an image file extension.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "jp2" => "image/jp2",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Vision captions from an OpenAI chat model.
pub struct OpenAICaptioner {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompt: String,
}

impl OpenAICaptioner {
    pub fn new(settings: &CaptioningSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            prompt: settings.prompt.clone(),
        })
    }
}

#[async_trait]
impl Captioner for OpenAICaptioner {
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn caption(&self, image: &[u8], extension: &str) -> Result<String> {
        let data_uri = format!(
            "data:{};base64,{}",
            mime_for_extension(extension),
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let build_err = |e: async_openai::error::OpenAIError| DocgateError::Captioning(e.to_string());

        let parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(self.prompt.clone())
                .build()
                .map_err(build_err)?
                .into(),
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(data_uri)
                        .detail(ImageDetail::Low)
                        .build()
                        .map_err(build_err)?,
                )
                .build()
                .map_err(build_err)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(120u32)
            .messages(vec![ChatCompletionRequestUserMessageArgs::default()
                .content(parts)
                .build()
                .map_err(build_err)?
                .into()])
            .build()
            .map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| DocgateError::OpenAI(format!("Caption request failed: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DocgateError::Captioning("Empty caption".to_string()))
    }
}
