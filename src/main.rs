use std::{cell::Cell, env, fs, path::PathBuf, rc::Rc};

use orrery::{
    input::{
        ButtonElement, CaptureResult, HandState, InputDevice, InputEvent, InputState, SceneUIElement, UIRayHit,
    },
    io::{ExportStatus, MeshExporter, SceneSerializer},
    launch,
    scene::{
        Camera, CoordSpace, Curve, KeyframeSequence, SOId, SOMaterial, SceneObject, Transform, Transformable,
        ViewContext,
    },
    vrutil::{safe_ray_plane_intersection, DEFAULT_PLANE_ANGLE_THRESH},
    Color, ConfigParams, FrameContext, FrameScript,
};
use orrery_geom::{Aabb3, Frame, Quaternion, Ray3, Vec2, Vec3};

use log;
use log4rs;

const FRAME_COUNT: u64 = 48;
const FPS: f64 = 30.0;

/// Grab handle dragged across a horizontal plane through its center.
struct DragHandle {
    center: Rc<Cell<Vec3>>,
    half_size: f32,
    grab_offset: Vec3,
}

impl DragHandle {
    fn plane_point(&self, ray: &Ray3) -> Vec3 {
        safe_ray_plane_intersection(
            ray,
            ray.direction,
            self.center.get(),
            Vec3::pos_y(),
            DEFAULT_PLANE_ANGLE_THRESH,
        )
    }
}

impl SceneUIElement for DragHandle {
    fn name(&self) -> &str {
        "drag-handle"
    }

    fn find_ray_intersection(&self, ray: &Ray3) -> Option<UIRayHit> {
        let bounds = Aabb3::from_center_extents(self.center.get(), Vec3::splat(self.half_size));
        let (t, normal) = bounds.ray_intersection(ray)?;
        Some(UIRayHit::new(ray.point_at(t), normal, t))
    }

    fn wants_capture(&mut self, e: &InputEvent) -> bool {
        e.button_down() && self.find_ray_intersection(&e.ray).is_some()
    }

    fn begin_capture(&mut self, e: &InputEvent) -> bool {
        self.grab_offset = self.center.get() - self.plane_point(&e.ray);
        true
    }

    fn update_capture(&mut self, e: &InputEvent) -> CaptureResult {
        if !e.button_down() {
            return CaptureResult::End;
        }
        let p = self.plane_point(&e.ray);
        self.center.set(p + self.grab_offset);
        CaptureResult::Continue
    }

    fn end_capture(&mut self, _e: &InputEvent) {
        log::debug!("Drag handle released at {:?}", self.center.get());
    }

    fn enable_hover(&self) -> bool {
        true
    }
}

struct Script {
    out_dir: PathBuf,
    eye: Vec3,
    button_center: Vec3,
    handle: Rc<Cell<Vec3>>,
    handle_start: Vec3,
    export_requested: Rc<Cell<bool>>,
    marker: Option<SOId>,
    pending: Vec<ExportStatus>,
}

impl Script {
    fn new(out_dir: PathBuf) -> Script {
        let handle_start = Vec3::new(1.0, 1.0, 0.0);
        Script {
            out_dir,
            eye: Vec3::new(0.0, 1.5, -5.0),
            button_center: Vec3::new(-1.5, 1.5, 0.0),
            handle: Rc::new(Cell::new(handle_start)),
            handle_start,
            export_requested: Rc::new(Cell::new(false)),
            marker: None,
            pending: Vec::new(),
        }
    }

    fn build_scene(&mut self, ctx: &mut FrameContext) {
        let scene = &mut ctx.scene;

        let mut ground = SceneObject::new_box(10.0, 0.1, 10.0);
        ground.set_name("ground");
        ground.assign_so_material(SOMaterial::standard("stone", Color::grey()));
        scene.add(ground.with_transform(Transform::from_frame(Frame::from_origin(Vec3::new(0.0, -0.05, 0.0)))));

        let table = scene.add(SceneObject::new_group().with_transform(Transform::from_frame(Frame::from_origin(
            Vec3::new(0.0, 0.8, 1.0),
        ))));
        let mut top = SceneObject::new_box(1.6, 0.05, 0.8);
        top.set_name("table-top");
        let _ = scene.add_child(table, top);
        for &(x, z) in &[(-0.7, -0.3), (0.7, -0.3), (-0.7, 0.3), (0.7, 0.3)] {
            let leg = SceneObject::new_cylinder(0.03, 0.8)
                .with_transform(Transform::from_frame(Frame::from_origin(Vec3::new(x, -0.4, z))));
            let _ = scene.add_child(table, leg);
        }

        let mut glass = SceneObject::new_sphere(0.2);
        glass.set_name("glass-ball");
        glass.assign_so_material(SOMaterial::transparent("glass", Color::rgba(0.6, 0.8, 1.0, 0.3)));
        let mut keys = KeyframeSequence::new();
        keys.add(0.0, Frame::from_origin(Vec3::new(-0.5, 1.2, 1.0)));
        keys.add(1.0, Frame::from_origin(Vec3::new(0.5, 1.2, 1.0)));
        glass.set_keyframes(Some(keys));
        scene.add(glass);

        let helix: Vec<Vec3> = (0..64)
            .map(|i| {
                let a = i as f32 * 0.2;
                Vec3::new(a.cos() * 0.3, i as f32 * 0.02, a.sin() * 0.3)
            })
            .collect();
        let section: Vec<Vec2> = (0..8)
            .map(|i| {
                let a = i as f32 * std::f32::consts::PI / 4.0;
                Vec2::new(a.cos() * 0.02, a.sin() * 0.02)
            })
            .collect();
        let mut spring = SceneObject::new_poly_tube(Curve::new(helix, false), section);
        spring.set_name("spring");
        scene.add(spring.with_transform(Transform::from_frame(Frame::from_origin(Vec3::new(-1.0, 0.0, 1.5)))));

        let mut marker = SceneObject::new_sphere(0.1);
        marker.set_name("handle-marker");
        marker.assign_so_material(SOMaterial::standard("handle", Color::yellow()));
        let start = Transform::from_frame(Frame::from_origin(self.handle_start));
        self.marker = Some(scene.add(marker.with_transform(start)));

        let mut pivot = SceneObject::new_pivot();
        pivot.set_temporary(true);
        scene.add(pivot);

        ctx.view = ViewContext::new(Camera::perspective(
            Frame::new(self.eye, Quaternion::look_forward(Vec3::pos_z(), Vec3::pos_y())),
            16.0 / 9.0,
            1.2,
            0.1,
            100.0,
        ));
    }

    fn start_export(&mut self, ctx: &mut FrameContext) {
        if let Err(e) = fs::create_dir_all(&self.out_dir) {
            log::error!("Cannot create {}: {}", self.out_dir.display(), e);
            return;
        }
        let serializer = SceneSerializer::new(ctx.params.serializer);
        if let Err(e) = serializer.write_file(&ctx.scene, self.out_dir.join("scene.json")) {
            log::error!("Scene serialization failed: {}", e);
        }
        let exporter = MeshExporter {
            background: ctx.params.export.background,
            ..MeshExporter::default()
        };
        let status = exporter.export(&ctx.scene, self.out_dir.join("scene.obj"), ctx.export_worker.as_ref());
        self.pending.push(status);
    }

    /// Drops finished exports after logging them.
    fn poll_exports(&mut self) {
        let mut i = 0;
        while i < self.pending.len() {
            let (current, max) = self.pending[i].progress();
            match self.pending[i].poll() {
                Some(result) => {
                    log::info!("Export finished: {:?} {}", result.code, result.message);
                    self.pending.swap_remove(i);
                }
                None => {
                    log::debug!("Export progress {}/{}", current, max);
                    i += 1;
                }
            }
        }
    }

    fn mouse_state(&self, frame: u64) -> InputState {
        let target = self.button_center + Vec3::new(0.0, 0.0, frame as f32 * 0.001);
        InputState {
            mouse_connected: true,
            mouse_ray: Ray3::new(self.eye, target - self.eye),
            mouse_left_down: (3..6).contains(&frame),
            ..InputState::default()
        }
    }

    fn right_hand(&self, frame: u64) -> HandState {
        let origin = Vec3::new(0.6, 1.6, -1.0);
        // sweep the aim point across the floor plane while the trigger is held
        let drift = if frame >= 12 { (frame.min(30) - 12) as f32 * 0.03 } else { 0.0 };
        let target = self.handle_start + Vec3::new(drift, 0.0, drift * 0.5);
        HandState {
            ray: Ray3::new(origin, target - origin),
            trigger: if (12..32).contains(&frame) { 1.0 } else { 0.0 },
            connected: true,
            ..HandState::default()
        }
    }
}

impl FrameScript for Script {
    fn setup(&mut self, ctx: &mut FrameContext) {
        self.build_scene(ctx);

        let requested = self.export_requested.clone();
        let button = ButtonElement::new("export", Frame::from_origin(self.button_center), Vec3::splat(0.2))
            .on_click(move |_| requested.set(true));
        ctx.dispatcher.add_element(Box::new(button));
        ctx.dispatcher.add_element(Box::new(DragHandle {
            center: self.handle.clone(),
            half_size: 0.15,
            grab_offset: Vec3::zero(),
        }));
    }

    fn poll_input(&mut self, ctx: &FrameContext) -> Option<InputState> {
        let frame = ctx.frame;
        if frame >= FRAME_COUNT {
            return None;
        }
        let mut input = self.mouse_state(frame);
        input.spatial_device = Some(InputDevice::HTCViveWands);
        input.right = self.right_hand(frame);
        // left controller drops out for a few frames
        input.left = HandState {
            connected: !(20..24).contains(&frame),
            ray: Ray3::new(Vec3::new(-0.6, 1.6, -1.0), Vec3::pos_z()),
            ..HandState::default()
        };
        Some(input)
    }

    fn update(&mut self, ctx: &mut FrameContext) {
        ctx.scene.set_current_time(ctx.frame as f64 / FPS);

        if let Some(marker) = self.marker {
            let target = Frame::from_origin(self.handle.get());
            let moved = ctx
                .scene
                .node_mut(marker)
                .and_then(|mut node| node.set_local_frame(target, CoordSpace::World));
            if let Err(e) = moved {
                log::warn!("Failed to move handle marker: {}", e);
            }
        }

        if self.export_requested.replace(false) {
            log::info!("Export requested on frame {}", ctx.frame);
            self.start_export(ctx);
        }
        self.poll_exports();
    }
}

fn main() {
    let mut params = ConfigParams::default();
    let mut level = log::LevelFilter::Debug;
    let mut out_dir = PathBuf::from("out");

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ascii-meshes" => params.serializer.binary_meshes = false,
            "--foreground-export" => params.export.background = false,
            "--log-level" => match args.next().map(|v| v.parse::<log::LevelFilter>()) {
                Some(Ok(l)) => level = l,
                _ => eprintln!("--log-level expects one of off, error, warn, info, debug, trace"),
            },
            "--out" => match args.next() {
                Some(dir) => out_dir = PathBuf::from(dir),
                None => eprintln!("--out expects a directory"),
            },
            other => eprintln!("Ignoring unknown argument {}", other),
        }
    }
    init_log(level, "orrery.log");

    let mut script = Script::new(out_dir);
    let ctx = launch(&mut script, params);
    for mut status in script.pending.drain(..) {
        let result = status.wait();
        log::info!("Export finished: {:?} {}", result.code, result.message);
    }
    log::info!(
        "Handle ended at {:?}, {} objects in scene",
        script.handle.get(),
        ctx.scene.len()
    );
}

fn init_log(level: log::LevelFilter, log_file_name: &str) {
    use log4rs::{
        append::{console, file},
        config,
        encode::pattern,
        init_config,
    };

    let stdout = console::ConsoleAppender::builder()
        .encoder(Box::new(pattern::PatternEncoder::new(
            "[Console] {d} - {l} - {t} - {m}{n}",
        )))
        .build();

    let file = match file::FileAppender::builder()
        .encoder(Box::new(pattern::PatternEncoder::new(
            "[File] {d} - {l} - {t} - {m}{n}",
        )))
        .append(false)
        .build(log_file_name)
    {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Cannot open {}: {}", log_file_name, e);
            None
        }
    };

    let mut builder = config::Config::builder()
        .appender(config::Appender::builder().build("stdout", Box::new(stdout)));
    let mut root = config::Root::builder().appender("stdout");
    if let Some(file) = file {
        builder = builder.appender(config::Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    match builder.build(root.build(level)) {
        Ok(config) => {
            if let Err(e) = init_config(config) {
                eprintln!("Logger already initialised: {}", e);
            }
        }
        Err(e) => eprintln!("Invalid log configuration: {}", e),
    }
}
