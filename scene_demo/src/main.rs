//! Headless Scene Demo
//!
//! Fills a scene with static crates, drifting ships and a few marker nodes,
//! then runs a fixed number of frames from an orbiting camera:
//! - Ships bounce inside the world and get re-homed in the dynamic octree
//! - Opaque draws are counted per shader/material batch
//! - Halfway through, the "markers" layer is hidden
//! - Every 30th frame a pick is requested through the camera's picker
//!
//! Pass a `.toml` or `.ron` scene config path as the first argument to
//! override the default world settings.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::f32::consts::TAU;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use scene_engine::render::batches;
use thiserror::Error;

const WORLD_SIZE: f32 = 200.0;
const FRAME_COUNT: u32 = 120;
const TIMESTEP: f32 = 1.0 / 60.0;

const NUM_CRATES: usize = 40;
const NUM_SHIPS: usize = 25;
const NUM_MARKERS: usize = 6;

const SHIP_SPEED: f32 = 12.0;
const CAMERA_ORBIT_RADIUS: f32 = 120.0;

const OPAQUE_SHADER: ShaderId = ShaderId(1);
const GLASS_SHADER: ShaderId = ShaderId(2);
const PICKING_SHADER: ShaderId = ShaderId(90);
const PICKING_DEBUG_SHADER: ShaderId = ShaderId(91);

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Static prop with a single opaque mesh
struct CrateNode {
    base: SceneNodeBase,
    meshes: Vec<RenderableMesh>,
}

impl SceneNode for CrateNode {
    fn base(&self) -> &SceneNodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SceneNodeBase {
        &mut self.base
    }

    fn update(&mut self, _context: &UpdateContext) {}

    fn as_mesh_collection(&self) -> Option<&dyn MeshCollection> {
        Some(self)
    }
}

impl MeshCollection for CrateNode {
    fn renderable_meshes(&self) -> &[RenderableMesh] {
        &self.meshes
    }
}

/// Moving ship with an opaque hull and a blended canopy
struct ShipNode {
    base: SceneNodeBase,
    meshes: Vec<RenderableMesh>,
    position: Vec3,
    velocity: Vec3,
}

impl SceneNode for ShipNode {
    fn base(&self) -> &SceneNodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SceneNodeBase {
        &mut self.base
    }

    fn update(&mut self, context: &UpdateContext) {
        let half = WORLD_SIZE * 0.45;
        self.position += self.velocity * context.timestep;

        // Bounce off the world bounds
        for axis in 0..3 {
            if self.position[axis].abs() > half {
                self.position[axis] = self.position[axis].clamp(-half, half);
                self.velocity[axis] = -self.velocity[axis];
            }
        }

        self.base.set_transform(Transform::from_position(self.position).to_matrix());
    }

    fn as_mesh_collection(&self) -> Option<&dyn MeshCollection> {
        Some(self)
    }
}

impl MeshCollection for ShipNode {
    fn renderable_meshes(&self) -> &[RenderableMesh] {
        &self.meshes
    }
}

/// Waypoint marker that draws itself
struct MarkerNode {
    base: SceneNodeBase,
    draws: Rc<RefCell<usize>>,
}

impl SceneNode for MarkerNode {
    fn base(&self) -> &SceneNodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SceneNodeBase {
        &mut self.base
    }

    fn update(&mut self, _context: &UpdateContext) {}

    fn render(&self, context: &RenderContext<'_>) {
        if context.render_pass.contains(RenderPass::OPAQUE) {
            *self.draws.borrow_mut() += 1;
        }
    }
}

/// Picker that fires once per request
struct DemoPicker {
    requested: bool,
    picks: Rc<Cell<u32>>,
}

impl PickingTarget for DemoPicker {
    fn is_active(&self) -> bool {
        self.requested
    }

    fn is_debug(&self) -> bool {
        false
    }

    fn shader(&self) -> ShaderId {
        PICKING_SHADER
    }

    fn debug_shader(&self) -> ShaderId {
        PICKING_DEBUG_SHADER
    }

    fn begin(&mut self) {
        log::debug!("Picking pass started");
    }

    fn finish(&mut self) {
        self.requested = false;
        self.picks.set(self.picks.get() + 1);
        log::debug!("Picking pass finished ({} total)", self.picks.get());
    }
}

/// Totals gathered by the batch renderer
#[derive(Debug, Default)]
struct BackendStats {
    opaque_batches: usize,
    opaque_draws: usize,
    opaque_indices: u64,
    blended_draws: usize,
    picking_draws: usize,
}

fn unit_box(half_extent: f32) -> AABB {
    AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(half_extent))
}

fn random_position(rng: &mut StdRng, spread: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-spread..spread),
        rng.gen_range(-spread * 0.2..spread * 0.2),
        rng.gen_range(-spread..spread),
    )
}

fn populate(scene: &mut Scene, rng: &mut StdRng, marker_draws: &Rc<RefCell<usize>>) {
    let spread = WORLD_SIZE * 0.4;

    for i in 0..NUM_CRATES {
        let size = rng.gen_range(0.5..3.0);
        let material = MaterialId(rng.gen_range(1..=4));
        let position = random_position(rng, spread);
        scene.add(
            CrateNode {
                base: SceneNodeBase::new(unit_box(size))
                    .with_name(format!("crate_{i}"))
                    .with_layer("props")
                    .with_transform(Transform::from_position(position).to_matrix()),
                meshes: vec![RenderableMesh::new(0, unit_box(size))
                    .with_draw_call(DrawCall::new(OPAQUE_SHADER, material, 0, 36), false)],
            },
            false,
        );
    }

    for i in 0..NUM_SHIPS {
        let heading = rng.gen_range(0.0..TAU);
        let position = random_position(rng, spread);
        scene.add(
            ShipNode {
                base: SceneNodeBase::new(unit_box(1.0))
                    .with_name(format!("ship_{i}"))
                    .with_layer("ships")
                    .with_transform(Transform::from_position(position).to_matrix()),
                meshes: vec![
                    RenderableMesh::new(0, unit_box(1.0))
                        .with_draw_call(DrawCall::new(OPAQUE_SHADER, MaterialId(10), 0, 960), false),
                    RenderableMesh::new(1, unit_box(0.4))
                        .with_draw_call(DrawCall::new(GLASS_SHADER, MaterialId(11), 960, 120), true),
                ],
                position,
                velocity: Vec3::new(heading.cos(), 0.0, heading.sin()) * SHIP_SPEED,
            },
            true,
        );
    }

    for i in 0..NUM_MARKERS {
        let position = random_position(rng, spread);
        scene.add(
            MarkerNode {
                base: SceneNodeBase::new(unit_box(0.25))
                    .with_name(format!("marker_{i}"))
                    .with_layer("markers")
                    .with_transform(Transform::from_position(position).to_matrix()),
                draws: Rc::clone(marker_draws),
            },
            false,
        );
    }
}

fn load_config() -> SceneConfig {
    match std::env::args().nth(1) {
        Some(path) => match SceneConfig::load_from_file(&path) {
            Ok(config) => {
                log::info!("Loaded scene config from {}", path);
                config
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}, using defaults", path, e);
                SceneConfig { size_hint: WORLD_SIZE, ..SceneConfig::default() }
            }
        },
        None => SceneConfig { size_hint: WORLD_SIZE, ..SceneConfig::default() },
    }
}

fn main() -> Result<(), DemoError> {
    logging::init();

    let config = load_config();
    let stats = Rc::new(RefCell::new(BackendStats::default()));
    let sink = Rc::clone(&stats);

    let mut scene = Scene::with_config(
        move |requests: &[MeshBatchRequest<'_>], context: &RenderContext<'_>| {
            let mut stats = sink.borrow_mut();
            if context.replacement_shader == Some(PICKING_SHADER) {
                stats.picking_draws += requests.len();
            } else if context.render_pass.contains(RenderPass::OPAQUE) {
                stats.opaque_batches += batches(requests, context.replacement_shader).len();
                stats.opaque_draws += requests.len();
                stats.opaque_indices += requests.iter().map(|r| u64::from(r.call.index_count)).sum::<u64>();
            } else {
                stats.blended_draws += requests.len();
            }
        },
        &config,
    )?;
    scene.light_position = Some(Vec3::new(0.0, 80.0, 0.0));

    let mut rng = StdRng::seed_from_u64(0x5CE4E);
    let marker_draws = Rc::new(RefCell::new(0));
    populate(&mut scene, &mut rng, &marker_draws);
    log::info!("Scene populated with {} nodes", scene.node_count());

    let mut camera = Camera::perspective(Vec3::new(0.0, 40.0, CAMERA_ORBIT_RADIUS), 60.0, 16.0 / 9.0, 0.1, 1000.0);

    let all_layers: HashSet<String> = ["props", "ships", "markers"].iter().map(|s| (*s).to_string()).collect();
    scene.set_enabled_layers(&all_layers);

    let picks = Rc::new(Cell::new(0));
    let mut visible_total = 0;
    for frame in 0..FRAME_COUNT {
        if frame == FRAME_COUNT / 2 {
            let without_markers: HashSet<String> = ["props", "ships"].iter().map(|s| (*s).to_string()).collect();
            scene.set_enabled_layers(&without_markers);
            log::info!("Frame {}: hid the markers layer", frame);
        }

        if frame % 30 == 0 {
            camera.set_picker(Some(Box::new(DemoPicker {
                requested: true,
                picks: Rc::clone(&picks),
            })));
        }

        let angle = frame as f32 / FRAME_COUNT as f32 * TAU;
        camera.set_position(Vec3::new(angle.sin() * CAMERA_ORBIT_RADIUS, 40.0, angle.cos() * CAMERA_ORBIT_RADIUS));

        scene.update(TIMESTEP);
        let frame_stats = scene.render_with_camera(&mut camera, None);
        visible_total += frame_stats.visible_nodes;

        if frame % 30 == 0 {
            log::info!("Frame {}: {:?}", frame, frame_stats);
        }
    }

    let stats = stats.borrow();
    log::info!(
        "{} frames: {:.1} visible nodes/frame, {} opaque draws ({} indices) in {} batches, {} blended draws, {} picking draws over {} picks, {} marker draws",
        FRAME_COUNT,
        visible_total as f32 / FRAME_COUNT as f32,
        stats.opaque_draws,
        stats.opaque_indices,
        stats.opaque_batches,
        stats.blended_draws,
        stats.picking_draws,
        picks.get(),
        marker_draws.borrow()
    );

    Ok(())
}
