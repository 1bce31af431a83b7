//! The customizer view: owns the customization state and the loaded scene and
//! keeps them in sync.
//!
//! Host commands, on-screen controls and pointer input mutate the state.
//! Whenever the state revision moves (or the scene becomes ready, or a texture
//! arrives) the view runs one full reconciliation pass. Everything happens on
//! one task; only image fetch/decode and asset import leave it.

mod input;
mod timing;

pub use input::{part_for_node, InputAction, InputMode, InputRouter, PointerButton, PointerEvent};

use crate::assets::blob::BlobStore;
use crate::assets::crop::{crop_to_image, CropError, CropRegion};
use crate::assets::source::ImageSource;
use crate::assets::textures::{TextureEvent, TextureLoader};
use crate::assets::{load_asset, AssetError, LoadedAsset};
use crate::channel::{ChannelError, HostChannel, HostCommand, Transport};
use crate::config::ViewerConfig;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::render::{OrbitCamera, OrbitSettings, SceneGraph, Viewport};
use crate::scene::serialization::{write_snapshot, SerializationError};
use crate::scene::{CustomizationState, PartId, TextureRef};
use crate::ui::{ControlAction, UiState};
use glam::Vec3;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use timing::FrameTiming;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewStatus {
    Loading,
    Ready,
    /// Asset failed to load. The view shows a placeholder and keeps
    /// accepting state changes.
    Failed(String),
}

impl fmt::Display for ViewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewStatus::Loading => f.write_str("loading"),
            ViewStatus::Ready => f.write_str("ready"),
            ViewStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("failed to write state snapshot: {0}")]
    Snapshot(#[from] SerializationError),
}

pub struct CustomizerView {
    state: CustomizationState,
    status: ViewStatus,
    scene: Option<SceneGraph>,
    reconciler: Reconciler,
    router: InputRouter,
    camera: OrbitCamera,
    orbit: OrbitSettings,
    viewport: Viewport,
    blobs: BlobStore,
    loader: TextureLoader,
    channel: Option<HostChannel>,
    ui: UiState,
    timing: FrameTiming,
    synced_revision: Option<u64>,
    needs_pass: bool,
}

impl CustomizerView {
    /// Creates an unmounted view in the loading state. Texture completions
    /// arrive on the returned receiver and go back in via
    /// [`CustomizerView::on_texture_event`].
    pub fn new(
        viewport: Viewport,
        orbit: OrbitSettings,
        interaction_enabled: bool,
    ) -> (Self, mpsc::UnboundedReceiver<TextureEvent>) {
        let (loader, textures) = TextureLoader::new();
        let mut state = CustomizationState::new();
        state.set_interaction_enabled(interaction_enabled);
        let view = Self {
            state,
            status: ViewStatus::Loading,
            scene: None,
            reconciler: Reconciler::new(),
            router: InputRouter::new(),
            camera: OrbitCamera::new(Vec3::ZERO, orbit.max_distance * 0.5, orbit),
            orbit,
            viewport,
            blobs: BlobStore::new(),
            loader,
            channel: None,
            ui: UiState::new(),
            timing: FrameTiming::new(Instant::now()),
            synced_revision: None,
            needs_pass: false,
        };
        (view, textures)
    }

    pub fn from_config(config: &ViewerConfig) -> (Self, mpsc::UnboundedReceiver<TextureEvent>) {
        Self::new(
            config.viewport(),
            config.orbit_settings(),
            config.interaction_enabled,
        )
    }

    pub fn state(&self) -> &CustomizationState {
        &self.state
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Imports the asset and mounts it. Failures leave the view in
    /// [`ViewStatus::Failed`].
    pub async fn load(&mut self, path: PathBuf) {
        log::info!("Loading asset {}", path.display());
        self.status = ViewStatus::Loading;
        match load_asset(path).await {
            Ok((scene, asset)) => self.mount_scene(scene, &asset),
            Err(err) => self.fail_scene(&err),
        }
    }

    pub fn mount_scene(&mut self, scene: SceneGraph, asset: &LoadedAsset) {
        log::info!(
            "Asset '{}' ready: {} surfaces, {} materials",
            asset.name,
            asset.surfaces,
            asset.materials
        );
        if let Some(bounds) = scene.bounds() {
            self.camera = OrbitCamera::from_bounds(&bounds, self.orbit);
        }
        self.scene = Some(scene);
        self.status = ViewStatus::Ready;
        self.needs_pass = true;
    }

    pub fn fail_scene(&mut self, err: &AssetError) {
        log::error!("Asset failed to load: {}", err);
        self.status = ViewStatus::Failed(err.to_string());
    }

    /// Starts the host channel. Commands arrive on the returned receiver.
    pub async fn mount(
        &mut self,
        transport: Transport,
    ) -> Result<mpsc::UnboundedReceiver<HostCommand>, ChannelError> {
        let (sender, commands) = mpsc::unbounded_channel();
        let channel = HostChannel::start(transport, sender).await?;
        if let Some(previous) = self.channel.replace(channel) {
            previous.stop().await;
        }
        Ok(commands)
    }

    /// Stops the host channel and releases every runtime resource, putting
    /// the original materials back.
    pub async fn unmount(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.stop().await;
        }
        if let Some(scene) = self.scene.as_mut() {
            self.reconciler.teardown(scene);
            log::info!("View unmounted: {}", crate::render::describe(scene));
        }
        self.synced_revision = None;
    }

    /// Applies one host message. Returns true if there is something to sync.
    ///
    /// Resending the reference of a texture that failed to load asks for it
    /// again even though the state itself does not change.
    pub fn apply_command(&mut self, command: &HostCommand) -> bool {
        let changed = command.apply(&mut self.state);
        let retry = match &command.image {
            Some(Some(reference)) if self.state.wants_texture(reference) => {
                self.reconciler.retry_failed(reference)
            }
            _ => false,
        };
        if retry {
            log::info!("Retrying failed texture for '{}'", command.part);
            self.needs_pass = true;
        }
        changed || retry
    }

    pub fn apply_control(&mut self, action: &ControlAction) -> bool {
        action.apply(&mut self.state)
    }

    pub fn set_interaction_enabled(&mut self, enabled: bool) -> bool {
        self.state.set_interaction_enabled(enabled)
    }

    pub fn input_mode(&self) -> InputMode {
        self.router.mode(&self.state)
    }

    pub fn pointer(&mut self, event: PointerEvent) -> InputAction {
        let Some(scene) = self.scene.as_ref() else {
            return InputAction::None;
        };
        self.router
            .handle(event, scene, &mut self.camera, self.viewport, &mut self.state)
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Crops `source`, stores the PNG as a blob and assigns it to `part`.
    /// On error the state is untouched.
    pub async fn apply_cropped_image(
        &mut self,
        part: PartId,
        source: ImageSource,
        region: CropRegion,
    ) -> Result<TextureRef, CropError> {
        let blob = match crop_to_image(source, region).await {
            Ok(blob) => blob,
            Err(err) => {
                self.ui.set_status(format!("Upload for {} failed: {}", part, err));
                return Err(err);
            }
        };
        log::info!("Cropped {}x{} image for '{}'", blob.width, blob.height, part);
        let reference = self.blobs.insert(blob.bytes);
        self.state.set_texture(part, Some(reference.clone()));
        self.ui.set_status(String::new());
        Ok(reference)
    }

    /// Runs a reconciliation pass if anything changed since the last one and
    /// starts loading newly referenced textures. Must be called inside a
    /// tokio runtime.
    pub fn sync(&mut self) -> Option<ReconcileReport> {
        let scene = self.scene.as_mut()?;
        let revision = self.state.revision();
        if !self.needs_pass && self.synced_revision == Some(revision) {
            return None;
        }

        let report = self.reconciler.reconcile(scene, &self.state);
        self.synced_revision = Some(revision);
        self.needs_pass = false;
        self.timing.record_pass();

        for reference in &report.texture_requests {
            self.loader.request(reference.clone(), self.blobs.resolve(reference));
        }
        let dropped = self.blobs.retain(self.state.desired_textures());
        if dropped > 0 {
            log::debug!("Released {} unused blobs", dropped);
        }
        self.ui.update(&self.state, &self.status, scene.ledger());
        Some(report)
    }

    /// Returns true when the texture changes what is shown.
    pub fn on_texture_event(&mut self, event: TextureEvent) -> bool {
        let Some(scene) = self.scene.as_mut() else {
            log::debug!("Texture {} arrived without a scene", event.reference);
            return false;
        };
        let changed = self.reconciler.texture_loaded(scene, &self.state, event);
        self.needs_pass |= changed;
        changed
    }

    /// One camera animation step.
    pub fn animate(&mut self, now: Instant) -> bool {
        let dt = self.timing.tick(now);
        let moved = self.camera.update(dt);
        if !moved {
            self.timing.idle();
        }
        moved
    }

    /// Event loop: host commands, texture completions and camera animation
    /// until `shutdown` resolves or the host channel closes.
    pub async fn run<F>(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<HostCommand>,
        mut textures: mpsc::UnboundedReceiver<TextureEvent>,
        shutdown: F,
        print_state: bool,
    ) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        let mut tick = tokio::time::interval(timing::TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(shutdown);
        let mut printed_revision = None;

        loop {
            if self.sync().is_some() && print_state && printed_revision != Some(self.state.revision()) {
                printed_revision = Some(self.state.revision());
                write_snapshot(&self.state, &mut std::io::stdout().lock())?;
            }

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        self.apply_command(&command);
                    }
                    None => {
                        log::info!("Host channel closed");
                        break;
                    }
                },
                Some(event) = textures.recv() => {
                    self.on_texture_event(event);
                }
                _ = tick.tick(), if self.camera.is_moving() => {
                    self.animate(Instant::now());
                }
                _ = &mut shutdown => {
                    log::info!("Shutdown requested");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Loads the configured asset, mounts the host channel and runs the view
/// until Ctrl+C or until the host goes away.
pub async fn run(config: ViewerConfig) -> Result<(), AppError> {
    let (mut view, textures) = CustomizerView::from_config(&config);
    view.load(config.asset.clone()).await;
    let commands = view.mount(config.transport()).await?;

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::warn!("Ctrl+C handler unavailable: {}", err);
            std::future::pending::<()>().await;
        }
    };
    let result = view.run(commands, textures, shutdown, config.print_state).await;
    view.unmount().await;
    result
}
