//! Orrery: VR scene objects, input capture and scene export

mod color;
pub use color::Color;
pub mod input;
pub mod io;
pub mod scene;
pub mod vrutil;

use std::sync::Arc;

use input::{InputDispatcher, InputEvent, InputState};
use io::{ExportWorker, SerializerOptions};
use scene::{Material, SOId, Scene, SceneParams, ViewContext};

#[derive(Debug, Clone)]
pub struct ExportParams {
    pub background: bool,
    pub worker_threads: usize,
}

impl Default for ExportParams {
    fn default() -> Self {
        ExportParams {
            background: true,
            worker_threads: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigParams {
    pub scene: SceneParams,
    pub export: ExportParams,
    pub serializer: SerializerOptions,
}

pub struct FrameContext {
    pub scene: Scene,
    pub dispatcher: InputDispatcher,
    pub view: ViewContext,
    pub params: ConfigParams,
    pub export_worker: Option<ExportWorker>,
    pub frame: u64,
    pub last_input: Option<InputState>,
}

impl FrameContext {
    pub fn new(params: ConfigParams) -> FrameContext {
        let export_worker = match params.export.background {
            true => Some(ExportWorker::new(params.export.worker_threads)),
            false => None,
        };
        FrameContext {
            scene: Scene::new(params.scene.clone()),
            dispatcher: InputDispatcher::new(),
            view: ViewContext::default(),
            params,
            export_worker,
            frame: 0,
            last_input: None,
        }
    }
}

pub trait FrameScript {
    fn setup(&mut self, ctx: &mut FrameContext);

    /// Input for the next frame. `None` ends the loop.
    fn poll_input(&mut self, ctx: &FrameContext) -> Option<InputState>;

    fn update(&mut self, ctx: &mut FrameContext);

    /// Receives each object's active material once per frame.
    fn apply_material(&mut self, _id: SOId, _material: &Arc<Material>) {}
}

/// Runs `script` until it stops producing input and hands back the final
/// context.
pub fn launch<S: FrameScript>(script: &mut S, params: ConfigParams) -> FrameContext {
    let mut ctx = FrameContext::new(params);
    script.setup(&mut ctx);
    log::info!("Frame loop started with {} scene objects", ctx.scene.len());

    while let Some(input) = script.poll_input(&ctx) {
        ctx.frame += 1;
        ctx.dispatcher.new_frame();
        release_lost_sources(&mut ctx, &input);

        for event in input.events() {
            if let Err(e) = ctx.dispatcher.dispatch(&event) {
                log::warn!("Input dispatch on {:?} failed: {}", event.key(), e);
            }
        }
        for event in input.events() {
            ctx.dispatcher.update_hover(event.key(), &event.ray);
        }

        script.update(&mut ctx);

        ctx.scene
            .pre_render(&mut |id: SOId, m: &Arc<Material>| script.apply_material(id, m));
        ctx.dispatcher.pre_render();
        ctx.last_input = Some(input);
    }

    log::info!("Frame loop finished after {} frames", ctx.frame);
    ctx
}

/// Force-ends captures and hovers of sources that disconnected since the
/// previous frame.
fn release_lost_sources(ctx: &mut FrameContext, input: &InputState) {
    for (key, id) in ctx.dispatcher.active_captures() {
        if !input.is_connected(key) {
            log::debug!("{:?} disconnected while {:?} was capturing", key, id);
            if let Err(e) = ctx.dispatcher.end_capture(key, &InputEvent::for_key(key, input)) {
                log::warn!("Failed to end capture on {:?}: {}", key, e);
            }
        }
    }
    if let Some(last) = &ctx.last_input {
        for key in last.sources() {
            if !input.is_connected(key) {
                ctx.dispatcher.end_hover(key);
            }
        }
    }
}
