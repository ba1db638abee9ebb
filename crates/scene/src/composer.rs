//! Prompt composition: scene fragments in, refined image prompt out.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use weathercanvas_core::artifact::PromptBundle;
use weathercanvas_core::error::{PromptError, ProviderError};
use weathercanvas_core::message::Message;
use weathercanvas_core::provider::{ProviderRequest, TextGenerator};

use crate::scene::Scene;

const TEMPERATURE: f32 = 1.0;
const MAX_TOKENS: u32 = 256;
const TOP_P: f32 = 1.0;
const FREQUENCY_PENALTY: f32 = 0.0;
const PRESENCE_PENALTY: f32 = 0.0;

/// Turns a [`Scene`] into a [`PromptBundle`] through a text generator.
pub struct PromptComposer {
    generator: Arc<dyn TextGenerator>,
    model: String,
    system_instruction: String,
}

impl PromptComposer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            model: model.into(),
            system_instruction: system_instruction.into(),
        }
    }

    /// The chat request sent for a composed input.
    pub fn request_for(&self, composed_input: &str) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(&self.system_instruction),
                Message::user(composed_input),
            ],
            temperature: TEMPERATURE,
            max_tokens: Some(MAX_TOKENS),
            top_p: Some(TOP_P),
            frequency_penalty: Some(FREQUENCY_PENALTY),
            presence_penalty: Some(PRESENCE_PENALTY),
        }
    }

    /// Compose the scene and refine it into an image prompt.
    pub async fn compose(&self, scene: &Scene) -> Result<PromptBundle, PromptError> {
        self.refine(scene.composed_input()).await
    }

    /// Refine an already composed input. No retry on failure.
    pub async fn refine(&self, composed_input: String) -> Result<PromptBundle, PromptError> {
        if composed_input.trim().is_empty() {
            return Err(PromptError::EmptyInput);
        }

        debug!(input = %composed_input, model = %self.model, "Refining scene into image prompt");

        let response = self
            .generator
            .complete(self.request_for(&composed_input))
            .await
            .map_err(|e| {
                warn!(error = %e, generator = self.generator.name(), "Prompt generation failed");
                PromptError::Generation(e)
            })?;

        let generated_prompt = response.message.content.trim().to_string();
        if generated_prompt.is_empty() {
            warn!("Prompt generation returned empty content");
            return Err(PromptError::Generation(ProviderError::EmptyContent));
        }

        info!(chars = generated_prompt.len(), "Image prompt composed");

        Ok(PromptBundle {
            composed_input,
            generated_prompt,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::Season;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use weathercanvas_core::message::Role;
    use weathercanvas_core::provider::ProviderResponse;

    /// Replays a fixed outcome and records the requests it saw.
    struct ScriptedGenerator {
        outcome: Result<String, ProviderError>,
        seen: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedGenerator {
        fn new(outcome: Result<String, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.seen.lock().unwrap().push(request);
            self.outcome.clone().map(|content| ProviderResponse {
                message: Message::assistant(content),
                usage: None,
                model: "scripted-model".into(),
            })
        }
    }

    fn scene() -> Scene {
        Scene {
            day_part: "dusk".into(),
            season: Season::Autumn,
            location: "Kyoto".into(),
            weather: "Be creative about the weather.".into(),
        }
    }

    #[tokio::test]
    async fn compose_trims_and_bundles() {
        let generator =
            ScriptedGenerator::new(Ok("\n  Maple leaves at dusk over Kyoto  \n".into()));
        let composer = PromptComposer::new(generator.clone(), "gpt-3.5-turbo", "Be brief.");

        let bundle = composer.compose(&scene()).await.unwrap();
        assert_eq!(bundle.generated_prompt, "Maple leaves at dusk over Kyoto");
        assert_eq!(
            bundle.composed_input,
            "In Kyoto, it is dusk in Autumn. Be creative about the weather."
        );

        let seen = generator.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.temperature, 1.0);
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.top_p, Some(1.0));
        assert_eq!(request.frequency_penalty, Some(0.0));
        assert_eq!(request.presence_penalty, Some(0.0));
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "Be brief.");
        assert_eq!(request.messages[1].role, Role::User);
    }

    #[tokio::test]
    async fn empty_input_never_reaches_generator() {
        let generator = ScriptedGenerator::new(Ok("unused".into()));
        let composer = PromptComposer::new(generator.clone(), "m", "s");

        let err = composer.refine("   ".into()).await.unwrap_err();
        assert!(matches!(err, PromptError::EmptyInput));
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_choice_list_is_generation_error() {
        let generator = ScriptedGenerator::new(Err(ProviderError::EmptyChoices));
        let composer = PromptComposer::new(generator, "m", "s");

        let err = composer.compose(&scene()).await.unwrap_err();
        assert!(matches!(
            err,
            PromptError::Generation(ProviderError::EmptyChoices)
        ));
    }

    #[tokio::test]
    async fn whitespace_content_is_generation_error() {
        let generator = ScriptedGenerator::new(Ok("   ".into()));
        let composer = PromptComposer::new(generator, "m", "s");

        let err = composer.compose(&scene()).await.unwrap_err();
        assert!(matches!(
            err,
            PromptError::Generation(ProviderError::EmptyContent)
        ));
    }
}
