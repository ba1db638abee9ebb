//! Cycle orchestration.
//!
//! One trigger runs one cycle through
//! `Idle → Composing → Generating → Evicting → Idle`. A failure while
//! composing or generating moves the cycle to `Error` and back to `Idle`
//! without touching previously published state.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tracing::{error, info, warn};
use uuid::Uuid;
use weathercanvas_config::{AdmissionPolicy, AppConfig, ScheduleAction};
use weathercanvas_core::artifact::{GeneratedImage, PromptBundle};
use weathercanvas_core::error::{Error, PromptError, Result};
use weathercanvas_core::event::{DomainEvent, EventBus};
use weathercanvas_core::image::ImageOptions;
use weathercanvas_core::observation::{Observation, ObservationSource};
use weathercanvas_core::state::CanvasState;
use weathercanvas_gallery::{ImageAcquirer, ImageStore, RetentionManager};
use weathercanvas_providers::Services;
use weathercanvas_scene::{PromptComposer, Scene};

use crate::trigger::{Trigger, TriggerSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleState {
    Idle,
    Composing,
    Generating,
    Evicting,
    Error,
}

impl CycleState {
    pub fn can_transition_to(self, next: CycleState) -> bool {
        use CycleState::*;
        matches!(
            (self, next),
            (Idle, Composing)
                | (Idle, Generating)
                | (Idle, Evicting)
                | (Composing, Generating)
                | (Composing, Idle)
                | (Composing, Error)
                | (Generating, Evicting)
                | (Generating, Error)
                | (Evicting, Idle)
                | (Error, Idle)
        )
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Composing => "composing",
            CycleState::Generating => "generating",
            CycleState::Evicting => "evicting",
            CycleState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Tracks one cycle's progress through the state machine.
struct CycleTracker {
    id: Uuid,
    current: CycleState,
    visited: Vec<CycleState>,
}

impl CycleTracker {
    fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            current: CycleState::Idle,
            visited: vec![CycleState::Idle],
        }
    }

    fn advance(&mut self, next: CycleState) -> Result<()> {
        if !self.current.can_transition_to(next) {
            return Err(Error::Internal(format!(
                "cycle {} cannot move from {} to {next}",
                self.id, self.current
            )));
        }
        self.current = next;
        self.visited.push(next);
        Ok(())
    }

    /// Record a failure and return to idle, handing the error back.
    fn fail(&mut self, err: Error) -> Error {
        error!(cycle = %self.id, state = %self.current, error = %err, "Cycle failed");
        if let Err(e) = self
            .advance(CycleState::Error)
            .and_then(|_| self.advance(CycleState::Idle))
        {
            return e;
        }
        err
    }
}

/// Outcome of one orchestrated run.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub source: TriggerSource,
    pub prompt: Option<PromptBundle>,
    pub image: Option<GeneratedImage>,
    pub evicted: usize,
    pub transitions: Vec<CycleState>,
}

impl CycleReport {
    fn new(tracker: CycleTracker, source: TriggerSource) -> Self {
        Self {
            cycle_id: tracker.id,
            source,
            prompt: None,
            image: None,
            evicted: 0,
            transitions: tracker.visited,
        }
    }
}

/// Wires observation, composition, acquisition and retention into cycles.
pub struct Orchestrator {
    observations: Arc<dyn ObservationSource>,
    composer: PromptComposer,
    acquirer: ImageAcquirer,
    retention: RetentionManager,
    state: Arc<CanvasState>,
    events: Arc<EventBus>,
    location: Option<String>,
    image_options: ImageOptions,
    gate: Option<Mutex<()>>,
}

impl Orchestrator {
    pub fn from_config(
        config: &AppConfig,
        services: Services,
        state: Arc<CanvasState>,
        events: Arc<EventBus>,
    ) -> Self {
        let store = ImageStore::from_config(&config.storage);
        let retention = RetentionManager::new(
            store.directory().to_path_buf(),
            config.storage.max_images_retained,
        );

        Self {
            observations: services.observations,
            composer: PromptComposer::new(
                services.text,
                &config.text_model,
                &config.system_instruction,
            ),
            acquirer: ImageAcquirer::new(services.images, services.fetcher, store),
            retention,
            state,
            events,
            location: config.location_name.clone(),
            image_options: config.image.options(),
            gate: match config.admission {
                AdmissionPolicy::Concurrent => None,
                AdmissionPolicy::Exclusive => Some(Mutex::new(())),
            },
        }
    }

    pub fn state(&self) -> &Arc<CanvasState> {
        &self.state
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn store(&self) -> &ImageStore {
        self.acquirer.store()
    }

    pub fn image_options(&self) -> &ImageOptions {
        &self.image_options
    }

    /// Wait for the admission slot when cycles are exclusive.
    async fn admit(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }

    /// Dispatch a trigger to the operation its action names.
    pub async fn handle(&self, trigger: &Trigger) -> Result<CycleReport> {
        match trigger.action {
            ScheduleAction::Cycle => self.run_cycle(trigger).await,
            ScheduleAction::Prompt => self.compose_prompt(trigger).await,
        }
    }

    /// Full cycle: observe, compose, acquire, evict, publish.
    pub async fn run_cycle(&self, trigger: &Trigger) -> Result<CycleReport> {
        let _slot = self.admit().await;
        let mut cycle = CycleTracker::start();
        info!(cycle = %cycle.id, source = %trigger.source, "Cycle started");

        cycle.advance(CycleState::Composing)?;
        let bundle = match self.compose_scene().await {
            Ok(bundle) => bundle,
            Err(e) => return Err(cycle.fail(e.into())),
        };
        self.publish_prompt(&bundle).await;

        cycle.advance(CycleState::Generating)?;
        let image = match self
            .acquirer
            .acquire(&bundle.generated_prompt, &self.image_options)
            .await
        {
            Ok(image) => image,
            Err(e) => return Err(cycle.fail(e.into())),
        };
        self.state.publish_image(image.reference()).await;

        cycle.advance(CycleState::Evicting)?;
        let evicted = self.evict_logged().await;
        self.events.publish(DomainEvent::ImageAvailable {
            timestamp: Utc::now(),
        });
        cycle.advance(CycleState::Idle)?;

        info!(cycle = %cycle.id, file = %image.file_name, evicted, "Cycle complete");
        Ok(CycleReport {
            prompt: Some(bundle),
            image: Some(image),
            evicted,
            ..CycleReport::new(cycle, trigger.source.clone())
        })
    }

    /// Refresh only the prompt bundle.
    pub async fn compose_prompt(&self, trigger: &Trigger) -> Result<CycleReport> {
        let _slot = self.admit().await;
        let mut cycle = CycleTracker::start();
        info!(cycle = %cycle.id, source = %trigger.source, "Prompt refresh started");

        cycle.advance(CycleState::Composing)?;
        let bundle = match self.compose_scene().await {
            Ok(bundle) => bundle,
            Err(e) => return Err(cycle.fail(e.into())),
        };
        self.publish_prompt(&bundle).await;
        cycle.advance(CycleState::Idle)?;

        Ok(CycleReport {
            prompt: Some(bundle),
            ..CycleReport::new(cycle, trigger.source.clone())
        })
    }

    /// Generate an image from the latest published prompt.
    ///
    /// `options` replaces the configured image options for this run only.
    pub async fn render_latest(&self, options: Option<ImageOptions>) -> Result<CycleReport> {
        let _slot = self.admit().await;
        let bundle = self
            .state
            .latest_prompt()
            .await
            .ok_or(PromptError::EmptyInput)?;
        let options = options.unwrap_or_else(|| self.image_options.clone());

        let mut cycle = CycleTracker::start();
        info!(cycle = %cycle.id, model = %options.model, "Render from latest prompt");

        cycle.advance(CycleState::Generating)?;
        let image = match self
            .acquirer
            .acquire(&bundle.generated_prompt, &options)
            .await
        {
            Ok(image) => image,
            Err(e) => return Err(cycle.fail(e.into())),
        };
        self.state.publish_image(image.reference()).await;

        cycle.advance(CycleState::Evicting)?;
        let evicted = self.evict_logged().await;
        self.events.publish(DomainEvent::ImageAvailable {
            timestamp: Utc::now(),
        });
        cycle.advance(CycleState::Idle)?;

        Ok(CycleReport {
            prompt: Some(bundle),
            image: Some(image),
            evicted,
            ..CycleReport::new(cycle, TriggerSource::Manual("render".into()))
        })
    }

    /// One eviction pass on demand.
    pub async fn prune(&self) -> Result<usize> {
        let _slot = self.admit().await;
        Ok(self.retention.evict().await?)
    }

    /// Consume triggers until the channel closes; each runs as its own task.
    pub async fn serve(self: Arc<Self>, mut triggers: mpsc::Receiver<Trigger>) {
        while let Some(trigger) = triggers.recv().await {
            let orchestrator = self.clone();
            tokio::spawn(async move {
                if let Err(e) = orchestrator.handle(&trigger).await {
                    warn!(
                        trigger = %trigger.id,
                        source = %trigger.source,
                        error = %e,
                        "Triggered run failed"
                    );
                }
            });
        }
        info!("Trigger channel closed, orchestrator stopping");
    }

    async fn observe(&self) -> Observation {
        match self.observations.observe().await {
            Ok(observation) => observation,
            Err(e) => {
                warn!(
                    source = self.observations.name(),
                    error = %e,
                    "Observation failed, continuing with clock only"
                );
                Observation::bare(Utc::now())
            }
        }
    }

    async fn compose_scene(&self) -> std::result::Result<PromptBundle, PromptError> {
        let observation = self.observe().await;
        let scene = Scene::from_observation(&observation, self.location.as_deref());
        self.composer.compose(&scene).await
    }

    async fn publish_prompt(&self, bundle: &PromptBundle) {
        self.state.publish_prompt(bundle.clone()).await;
        self.events.publish(DomainEvent::PromptComposed {
            composed_input: bundle.composed_input.clone(),
            generated_prompt: bundle.generated_prompt.clone(),
            timestamp: bundle.created_at,
        });
    }

    /// Retention never fails a cycle once the image is saved.
    async fn evict_logged(&self) -> usize {
        match self.retention.evict().await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Eviction pass failed");
                0
            }
        }
    }
}
