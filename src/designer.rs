use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::canvas;
use crate::error::{DesignError, Result, ServiceFailure};
use crate::openai::{GeneratedImage, ImageEditor};
use crate::prompt::{self, RoomType};
use crate::store::{
    LocalFileStorage, RecordStore, compute_hash, detect_mime_type, extension_from_mime_type,
};

pub struct DesignRequest {
    pub style: String,
    pub room_type: RoomType,
    pub custom_prompt: String,
    pub image_data: Vec<u8>,
}

pub struct DesignOutcome {
    /// Reference to the generated image. Points at local storage, except on
    /// the degraded path where only the remote copy exists.
    pub image_url: String,
    /// Set when the pair was durably recorded.
    pub stored_image_url: Option<String>,
}

/// Composes the generation pipeline: normalize, mask, prompt, invoke the
/// external editor, persist the before/after pair, record it.
pub struct DesignService {
    storage: Arc<LocalFileStorage>,
    records: Arc<RecordStore>,
    editor: Arc<dyn ImageEditor>,
    canvas_size: u32,
}

impl DesignService {
    pub fn new(
        storage: Arc<LocalFileStorage>,
        records: Arc<RecordStore>,
        editor: Arc<dyn ImageEditor>,
    ) -> Self {
        Self {
            storage,
            records,
            editor,
            canvas_size: canvas::CANVAS_SIZE,
        }
    }

    pub fn with_canvas_size(mut self, canvas_size: u32) -> Self {
        self.canvas_size = canvas_size;
        self
    }

    pub async fn generate(&self, request: DesignRequest) -> Result<DesignOutcome> {
        if request.image_data.is_empty() {
            return Err(DesignError::MissingImage);
        }
        debug!(
            style = %request.style,
            room_type = request.room_type.as_str(),
            bytes = request.image_data.len(),
            "starting design generation"
        );

        let normalized = canvas::normalize(&request.image_data, self.canvas_size)?;
        let mask = canvas::build_mask(self.canvas_size)?;
        let prompt =
            prompt::build_prompt(&request.style, request.room_type, &request.custom_prompt);

        // The raw input is persisted before the external call so a failure
        // further down still leaves it inspectable.
        let token = fresh_token(&request.image_data);
        let ext = detect_mime_type(&request.image_data)
            .map(extension_from_mime_type)
            .unwrap_or("bin");
        let original_key = format!("original_{token}.{ext}");
        self.storage.put(&original_key, &request.image_data).await?;

        let generated = self
            .editor
            .edit(&normalized, &mask, &prompt, self.canvas_size)
            .await
            .map_err(|err| DesignError::Service(ServiceFailure::classify(&err.to_string())))?;

        let generated_key = format!("generated_{token}.png");
        let generated_bytes = match generated {
            GeneratedImage::Bytes(bytes) => bytes,
            GeneratedImage::Url(url) => match self.editor.download(&url).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(error = %err, "could not fetch generated image, returning the remote reference");
                    return Ok(DesignOutcome {
                        image_url: url,
                        stored_image_url: None,
                    });
                }
            },
        };
        self.storage.put(&generated_key, &generated_bytes).await?;

        let recorded = self
            .records
            .insert(&original_key, &generated_key, &request.style, request.room_type)
            .await?;

        let public_url = self.storage.public_url(&generated_key);
        if !recorded {
            warn!(
                %original_key,
                %generated_key,
                "image stored but not recorded, a referenced file went missing"
            );
            return Ok(DesignOutcome {
                image_url: public_url,
                stored_image_url: None,
            });
        }
        Ok(DesignOutcome {
            stored_image_url: Some(public_url.clone()),
            image_url: public_url,
        })
    }
}

fn fresh_token(image_data: &[u8]) -> String {
    let now = Utc::now();
    let stamp = now.format("%Y%m%d_%H%M%S");
    let mut seed = now
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .to_be_bytes()
        .to_vec();
    seed.extend_from_slice(image_data);
    let hash = compute_hash(&seed);
    format!("{stamp}_{}", &hash[..8])
}
