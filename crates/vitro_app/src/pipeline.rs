//! Glass pipeline: one overlay over one capture surface
//!
//! Owns every stage for a single overlay and runs them in paint order:
//! flush parameter updates, borrow the current backdrop frame, bind and
//! evaluate the program (or pass through), then feed the paint's timing back
//! into the adaptive policy.

use crate::config::VitroConfig;
use anyhow::Result;
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use vitro_capture::{CaptureOutcome, CaptureScheduler, CaptureStats, CaptureSurface};
use vitro_core::{EffectParameters, QualityLevel, Rect, RegionMapper, StateStore, VitroError};
use vitro_gpu::{
    AssetLoaders, Backdrop, Composition, EffectComposer, PaintPath, PassthroughReason,
    ProgramCache, ProgramState,
};
use vitro_perf::{FrameMonitor, FrameTimer, PerformanceSnapshot, QualityTransition, SharedFrameMonitor};

/// Outcome of one [`GlassPipeline::paint`]
#[derive(Debug)]
pub struct PaintReport {
    pub composition: Composition,
    /// Quality the paint ran at
    pub quality: QualityLevel,
    /// Quality change triggered by this paint's timing
    pub transition: Option<QualityTransition>,
    pub build_ms: f64,
    pub raster_ms: f64,
}

impl PaintReport {
    pub fn path(&self) -> &PaintPath {
        &self.composition.path
    }
}

/// Everything a diagnostics view shows
#[derive(Clone, Debug)]
pub struct PipelineDiagnostics {
    pub performance: PerformanceSnapshot,
    pub capture: CaptureStats,
    pub program_ready: bool,
    pub effect_paints: u64,
    pub passthrough_paints: u64,
    pub binds: u64,
    pub evaluations: u64,
    /// Why the program is unavailable
    pub program_error: Option<VitroError>,
    /// Why the latest capture cycle produced nothing
    pub capture_error: Option<VitroError>,
    /// Failure behind the latest passthrough paint
    pub paint_error: Option<VitroError>,
}

/// Capture, program, composer, monitor and parameter store for one overlay
pub struct GlassPipeline<S: CaptureSurface> {
    scheduler: CaptureScheduler<S>,
    program: ProgramState,
    composer: EffectComposer,
    monitor: SharedFrameMonitor,
    params: StateStore<EffectParameters>,
    last_paint_error: Option<VitroError>,
}

impl<S: CaptureSurface> GlassPipeline<S> {
    /// Build a pipeline over `surface`, loading the configured program
    /// through `cache`.
    pub async fn new(surface: Arc<S>, config: &VitroConfig, cache: &ProgramCache) -> Self {
        let program = cache.load(&config.effect.shader).await;
        Self::with_program(surface, config, program)
    }

    /// Build around an already loaded program state
    pub fn with_program(surface: Arc<S>, config: &VitroConfig, program: ProgramState) -> Self {
        let composer = EffectComposer::new(surface.pixel_ratio());
        Self {
            scheduler: CaptureScheduler::new(surface, config.capture_config()),
            program,
            composer,
            monitor: FrameMonitor::shared(config.policy_config()),
            params: StateStore::new(config.effect_parameters()),
            last_paint_error: None,
        }
    }

    /// Program cache for `config`: optional shader directory, then built-ins
    pub fn program_cache(config: &VitroConfig) -> ProgramCache {
        ProgramCache::new(AssetLoaders::with_builtin(config.effect.shader_dir.clone()))
    }

    pub fn scheduler(&self) -> &CaptureScheduler<S> {
        &self.scheduler
    }

    pub fn program(&self) -> &ProgramState {
        &self.program
    }

    pub fn composer(&self) -> &EffectComposer {
        &self.composer
    }

    pub fn monitor(&self) -> &SharedFrameMonitor {
        &self.monitor
    }

    /// Parameter source; updates are applied on the next paint
    pub fn params(&self) -> &StateStore<EffectParameters> {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut StateStore<EffectParameters> {
        &mut self.params
    }

    /// Overlay bounds in global logical coordinates, from layout
    pub fn set_overlay_bounds(&self, overlay: Rect) {
        self.scheduler.set_overlay_bounds(overlay);
    }

    pub fn start(&self) -> Result<()> {
        self.scheduler.start_default()?;
        Ok(())
    }

    pub fn start_with_interval(&self, interval: Duration) -> Result<()> {
        self.scheduler.start(interval)?;
        Ok(())
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub async fn capture_once(&self) -> CaptureOutcome {
        self.scheduler.capture_once().await
    }

    /// Paint `content` (overlay-sized, device pixels) over the glass.
    ///
    /// Never fails; anything that keeps the program from running turns into
    /// a passthrough paint.
    pub fn paint(&mut self, content: &RgbaImage) -> PaintReport {
        let mut timer = FrameTimer::start();

        self.params.flush();
        let params = *self.params.get();
        let quality = self.monitor.lock().quality();
        let overlay = RegionMapper::overlay_in_surface(
            self.scheduler.overlay_bounds(),
            self.scheduler.surface().bounds(),
        );
        timer.mark_build();

        let composer = &self.composer;
        let composition = match &self.program {
            ProgramState::Unavailable(err) => composer.compose(
                content,
                &params,
                Err(PassthroughReason::ProgramUnavailable(err.clone().into())),
            ),
            // Clone the handle out so captures can install while this paint runs
            ProgramState::Ready(program) => match self.scheduler.current_frame() {
                Some(frame) => composer.compose(
                    content,
                    &params,
                    Ok(Backdrop {
                        program,
                        frame: &frame,
                        overlay,
                        quality,
                    }),
                ),
                None => composer.compose(content, &params, Err(PassthroughReason::NoFrame)),
            },
        };

        self.last_paint_error = match &composition.path {
            PaintPath::Effect => None,
            PaintPath::Passthrough(reason) => reason.error().cloned(),
        };

        let (build_ms, raster_ms) = timer.finish();
        let (_, transition) = self
            .monitor
            .lock()
            .record_with_transition(build_ms, raster_ms);

        PaintReport {
            composition,
            quality,
            transition,
            build_ms,
            raster_ms,
        }
    }

    pub fn diagnostics(&self) -> PipelineDiagnostics {
        let (binds, evaluations) = self
            .program
            .program()
            .map(|p| (p.binds(), p.evaluations()))
            .unwrap_or((0, 0));
        PipelineDiagnostics {
            performance: self.monitor.lock().snapshot(),
            capture: self.scheduler.stats(),
            program_ready: self.program.is_ready(),
            effect_paints: self.composer.effect_paints(),
            passthrough_paints: self.composer.passthrough_paints(),
            binds,
            evaluations,
            program_error: match &self.program {
                ProgramState::Unavailable(err) => Some(err.clone().into()),
                ProgramState::Ready(_) => None,
            },
            capture_error: self.scheduler.last_error().map(VitroError::from),
            paint_error: self.last_paint_error.clone(),
        }
    }
}
