// generated poster art for entries the listing site has no image for
use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::server::error::{AppResult, Error};

pub type DynPosterGenerator = Arc<dyn PosterGeneratorTrait + Send + Sync>;

const IMAGE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";

#[automock]
#[async_trait]
pub trait PosterGeneratorTrait {
    /// url of a freshly generated poster for `title`
    async fn generate(&self, title: &str) -> AppResult<String>;
}

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u8,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

pub struct OpenAiPosterGenerator {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiPosterGenerator {
    pub fn new(api_key: String, base_url: String) -> Self {
        // generation is slow, but anything past a minute is not coming back
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn prompt(title: &str) -> String {
        format!(
            "Movie poster for \"{}\", cinematic, professional, high quality, 16:9 aspect ratio",
            title
        )
    }
}

#[async_trait]
impl PosterGeneratorTrait for OpenAiPosterGenerator {
    async fn generate(&self, title: &str) -> AppResult<String> {
        debug!("Generating poster for '{}'", title);

        let response = self
            .http_client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ImageGenerationRequest {
                model: IMAGE_MODEL,
                prompt: Self::prompt(title),
                n: 1,
                size: IMAGE_SIZE,
            })
            .send()
            .await
            .map_err(|e| {
                error!("Poster request for '{}' failed: {}", title, e);
                Error::InternalServerErrorWithContext("poster generation failed".to_string())
            })?;

        if !response.status().is_success() {
            error!(
                "Poster generation for '{}' returned {}",
                title,
                response.status()
            );
            return Err(Error::InternalServerErrorWithContext(format!(
                "poster generation returned {}",
                response.status()
            )));
        }

        let body: ImageGenerationResponse = response.json().await.map_err(|e| {
            error!("Failed to parse poster response: {}", e);
            Error::InternalServerErrorWithContext("failed to parse poster response".to_string())
        })?;

        body.data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or_else(|| Error::NotFound("poster generation returned no image".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn prompt_names_the_title() {
        assert!(OpenAiPosterGenerator::prompt("Troll 2").starts_with("Movie poster for \"Troll 2\""));
    }

    #[tokio::test]
    async fn returns_first_image_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "dall-e-3",
                "size": "1024x1024"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "url": "https://images.example/troll.png" }]
            })))
            .mount(&server)
            .await;

        let generator = OpenAiPosterGenerator::new("sk-test".to_string(), server.uri());
        let url = generator.generate("Troll 2").await.unwrap();
        assert_eq!(url, "https://images.example/troll.png");
    }

    #[tokio::test]
    async fn api_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let generator = OpenAiPosterGenerator::new("sk-test".to_string(), server.uri());
        assert!(generator.generate("Troll 2").await.is_err());
    }
}
