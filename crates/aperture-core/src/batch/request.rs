//! Request building: correlation ids and provider-specific payloads.

use serde_json::json;

use super::types::{BatchRequest, ProviderKind};
use crate::types::{ImageMetadata, PreparedImage};

/// System prompt instructing the model to return a structured critique.
pub const CRITIC_SYSTEM_PROMPT: &str = r#"You are an expert photography critic with deep knowledge of composition, lighting, technical execution, and artistic merit.

Your task is to provide detailed, constructive criticism of photographs. For each image, analyze:

1. **Composition** (0-10): Rule of thirds, leading lines, balance, framing, negative space
2. **Lighting** (0-10): Quality, direction, exposure, dynamic range, mood
3. **Subject Matter** (0-10): Interest, clarity, storytelling, emotional impact
4. **Technical Quality** (0-10): Focus, sharpness, noise, color accuracy, processing

Provide your critique in the following JSON format:

{
  "composition_score": <0-10>,
  "composition_notes": "<brief explanation>",
  "lighting_score": <0-10>,
  "lighting_notes": "<brief explanation>",
  "subject_score": <0-10>,
  "subject_notes": "<brief explanation>",
  "technical_score": <0-10>,
  "technical_notes": "<brief explanation>",
  "overall_score": <average of the four scores>,
  "summary": "<1-2 sentence overall assessment>",
  "strengths": ["<strength 1>", "<strength 2>"],
  "improvements": ["<suggestion 1>", "<suggestion 2>"]
}

Be honest but constructive. Focus on actionable feedback."#;

const USER_PROMPT: &str = "Please critique this photograph according to the system prompt.";

/// Provider-side cap on correlation id length.
const MAX_ID_LEN: usize = 64;

/// Derive a deterministic correlation id from the submission index and the
/// image's file stem. Characters outside `[A-Za-z0-9_-]` are replaced so the
/// id is valid for both providers; the result is capped at 64 characters.
pub fn correlation_id(index: usize, stem: &str) -> String {
    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut id = format!("img_{index:04}_{sanitized}");
    id.truncate(MAX_ID_LEN);
    id
}

/// Builds batch requests for a specific provider and model.
pub struct RequestBuilder {
    provider: ProviderKind,
    model: String,
    max_tokens: u32,
}

impl RequestBuilder {
    pub fn new(provider: ProviderKind, model: &str, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.to_string(),
            max_tokens,
        }
    }

    /// Build the request and matching metadata record for one prepared image.
    ///
    /// `index` is the zero-based position in the submission; it anchors the
    /// correlation id, so callers must hand out indices in order.
    pub fn build(&self, index: usize, image: &PreparedImage) -> (BatchRequest, ImageMetadata) {
        let id = correlation_id(index, image.stem());

        let request = BatchRequest {
            correlation_id: id.clone(),
            payload: self.payload(image),
        };

        let metadata = ImageMetadata {
            correlation_id: id,
            path: image.path.clone(),
            filename: image.filename.clone(),
            original_dimensions: (image.original_width, image.original_height),
        };

        (request, metadata)
    }

    fn payload(&self, image: &PreparedImage) -> serde_json::Value {
        match self.provider {
            ProviderKind::Anthropic => json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "system": CRITIC_SYSTEM_PROMPT,
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": image.media_type,
                                "data": image.data,
                            },
                        },
                        {
                            "type": "text",
                            "text": USER_PROMPT,
                        },
                    ],
                }],
            }),
            ProviderKind::OpenAi => json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "messages": [
                    {
                        "role": "system",
                        "content": CRITIC_SYSTEM_PROMPT,
                    },
                    {
                        "role": "user",
                        "content": [
                            {
                                "type": "image_url",
                                "image_url": {
                                    "url": format!(
                                        "data:{};base64,{}",
                                        image.media_type, image.data
                                    ),
                                },
                            },
                            {
                                "type": "text",
                                "text": USER_PROMPT,
                            },
                        ],
                    },
                ],
            }),
        }
    }
}
