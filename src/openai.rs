use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const EDIT_MODEL: &str = "dall-e-2";

/// One generated image, referenced either by a service-hosted URL or by
/// inline bytes, depending on the response format the service chose.
#[derive(Debug, Clone)]
pub enum GeneratedImage {
    Url(String),
    Bytes(Vec<u8>),
}

/// The external generative-image capability. Failure text is surfaced
/// verbatim so callers can classify it.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn edit(
        &self,
        image_png: &[u8],
        mask_png: &[u8],
        prompt: &str,
        size: u32,
    ) -> Result<GeneratedImage>;

    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Option<Vec<ImageData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        format!(
            "type={}, code={}, message={}",
            self.kind.as_deref().unwrap_or_default(),
            self.code.as_deref().unwrap_or_default(),
            self.message.as_deref().unwrap_or_default()
        )
    }
}

async fn assert_ok_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(anyhow!("OpenAI request failed: {status} {text}"))
}

#[async_trait]
impl ImageEditor for OpenAiClient {
    async fn edit(
        &self,
        image_png: &[u8],
        mask_png: &[u8],
        prompt: &str,
        size: u32,
    ) -> Result<GeneratedImage> {
        let form = Form::new()
            .part(
                "image",
                Part::bytes(image_png.to_vec())
                    .file_name("image.png")
                    .mime_str("image/png")?,
            )
            .part(
                "mask",
                Part::bytes(mask_png.to_vec())
                    .file_name("mask.png")
                    .mime_str("image/png")?,
            )
            .text("model", EDIT_MODEL)
            .text("prompt", prompt.to_string())
            .text("n", "1")
            .text("size", format!("{size}x{size}"));

        let response = self
            .client
            .post(format!("{OPENAI_BASE_URL}/images/edits"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let response = assert_ok_response(response).await?;
        let payload: ImagesResponse = response.json().await?;
        if let Some(error) = payload.error {
            return Err(anyhow!("OpenAI returned an error: {}", error.describe()));
        }

        let first = payload
            .data
            .and_then(|data| data.into_iter().next())
            .ok_or_else(|| anyhow!("OpenAI returned no image"))?;
        if let Some(url) = first.url {
            return Ok(GeneratedImage::Url(url));
        }
        if let Some(b64) = first.b64_json {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|err| anyhow!("decode b64_json failed: {err}"))?;
            return Ok(GeneratedImage::Bytes(bytes));
        }
        Err(anyhow!("OpenAI returned neither url nor image data"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(anyhow!("unsupported url scheme: {}", parsed.scheme()));
        }
        let response = self.client.get(parsed).send().await?;
        let response = assert_ok_response(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
