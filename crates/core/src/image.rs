//! Image generation and download traits.
//!
//! Two request shapes are supported. The basic shape carries
//! `{prompt, n, model, size}`; the extended shape adds `quality` and
//! `style`. Which one is sent depends on the selected [`ImageModel`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AcquisitionError;

/// Supported image-generation models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageModel {
    #[default]
    #[serde(rename = "dall-e-2")]
    DallE2,
    #[serde(rename = "dall-e-3")]
    DallE3,
}

impl ImageModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageModel::DallE2 => "dall-e-2",
            ImageModel::DallE3 => "dall-e-3",
        }
    }

    /// Whether requests for this model use the extended shape.
    pub fn supports_quality_and_style(&self) -> bool {
        matches!(self, ImageModel::DallE3)
    }
}

impl std::fmt::Display for ImageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dall-e-2" | "dalle2" => Ok(ImageModel::DallE2),
            "dall-e-3" | "dalle3" => Ok(ImageModel::DallE3),
            other => Err(format!("unknown image model '{other}'")),
        }
    }
}

/// Operator-selected options for one image request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOptions {
    #[serde(default)]
    pub model: ImageModel,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_size() -> String {
    "1024x1024".into()
}
fn default_quality() -> String {
    "standard".into()
}
fn default_style() -> String {
    "vivid".into()
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            model: ImageModel::default(),
            size: default_size(),
            quality: default_quality(),
            style: default_style(),
        }
    }
}

/// Request body sent to the image-generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub n: u8,
    pub model: String,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl ImageRequest {
    /// Build the request shape matching the selected model.
    pub fn new(prompt: impl Into<String>, options: &ImageOptions) -> Self {
        let extended = options.model.supports_quality_and_style();
        Self {
            prompt: prompt.into(),
            n: 1,
            model: options.model.as_str().to_string(),
            size: options.size.clone(),
            quality: extended.then(|| options.quality.clone()),
            style: extended.then(|| options.style.clone()),
        }
    }
}

/// Turns a prompt into the URL of a generated image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &ImageRequest) -> Result<String, AcquisitionError>;
}

/// Downloads the bytes behind a generated image URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AcquisitionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_shape_omits_quality_and_style() {
        let options = ImageOptions {
            model: ImageModel::DallE2,
            ..ImageOptions::default()
        };
        let json = serde_json::to_value(ImageRequest::new("a lighthouse", &options)).unwrap();
        assert_eq!(json["model"], "dall-e-2");
        assert_eq!(json["n"], 1);
        assert_eq!(json["size"], "1024x1024");
        assert!(json.get("quality").is_none());
        assert!(json.get("style").is_none());
    }

    #[test]
    fn extended_shape_carries_quality_and_style() {
        let options = ImageOptions {
            model: ImageModel::DallE3,
            size: "1792x1024".into(),
            quality: "hd".into(),
            style: "natural".into(),
        };
        let json = serde_json::to_value(ImageRequest::new("a lighthouse", &options)).unwrap();
        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["quality"], "hd");
        assert_eq!(json["style"], "natural");
    }

    #[test]
    fn default_options_use_basic_model() {
        let options = ImageOptions::default();
        assert_eq!(options.model, ImageModel::DallE2);
        let json = serde_json::to_value(ImageRequest::new("a lighthouse", &options)).unwrap();
        assert!(json.get("quality").is_none());
    }

    #[test]
    fn model_parses_from_config_names() {
        assert_eq!("dall-e-2".parse::<ImageModel>().unwrap(), ImageModel::DallE2);
        assert_eq!("dalle3".parse::<ImageModel>().unwrap(), ImageModel::DallE3);
        assert!("midjourney".parse::<ImageModel>().is_err());
    }
}
