use std::sync::Arc;

use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
    tasks::{AsyncComputeTaskPool, Task, block_on, futures_lite::future},
};
use nalgebra::Matrix4;

use crate::{
    camera::CameraRays,
    config::RaymarchConfig,
    error::MarchingCubesError,
    field::{DensityField, DensityMut, SculptSign},
    job::MeshJob,
    mesh::GeneratedMesh,
    types::{Point, Value},
};

/// System sets for the raymarching pipeline.
///
/// ```text
/// RaymarchSet::Sculpt  →  RaymarchSet::Spawn  →  [async compute]  →  RaymarchSet::Generate  →  RaymarchSet::Upload
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum RaymarchSet {
    /// Applies pending [`SculptRequest`]s to the [`TerrainField`].
    Sculpt,
    /// Spawns a meshing pass for the [`RaymarchCamera`]'s current view.
    Spawn,
    /// Polls the pass and inserts [`GeneratedMesh`] on completion.
    Generate,
    /// Uploads [`GeneratedMesh`] data into a Bevy [`Mesh3d`] and removes [`GeneratedMesh`].
    Upload,
}

/// The shared density field every pass reads.
///
/// Passes hold their own clone of the [`Arc`]; sculpting while a pass is in flight
/// copies the field first, so the pass keeps reading the snapshot it started with.
#[derive(Resource, Clone, Debug)]
pub struct TerrainField(pub Arc<DensityField>);

/// Marks the camera whose view drives each pass.
#[derive(Component, Default)]
pub struct RaymarchCamera;

/// Marks the entity that receives the raymarched mesh.
#[derive(Component, Default)]
#[require(Transform)]
pub struct RaymarchedTerrain;

/// Holds the in-flight async compute task for a [`RaymarchedTerrain`].
#[derive(Component)]
pub struct ComputeTask(Task<GeneratedMesh>);

/// A terraforming edit, applied between passes.
///
/// `radius` and `strength` fall back to the [`RaymarchConfig`] brush when `None`.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct SculptRequest {
    pub center: Point,
    pub radius: Option<i32>,
    pub strength: Option<Value>,
    pub sign: SculptSign,
}

impl SculptRequest {
    /// A request using the configured brush.
    pub fn new(center: Point, sign: SculptSign) -> Self {
        Self {
            center,
            radius: None,
            strength: None,
            sign,
        }
    }
}

/// Bevy plugin that raymarches the [`TerrainField`] from the [`RaymarchCamera`] and
/// meshes the cells it sees onto the [`RaymarchedTerrain`] entity.
///
/// ```text
/// SculptRequest messages
///   → TerrainField edited              (RaymarchSet::Sculpt)
///   → ComputeTask spawned              (RaymarchSet::Spawn, only when none is in flight)
///   → [async compute runs]
///   → GeneratedMesh inserted           (RaymarchSet::Generate, once task completes)
///   → Mesh3d inserted                  (RaymarchSet::Upload)
///   → GeneratedMesh removed
/// ```
#[derive(Default)]
pub struct VoxelRaymarchPlugin {
    /// Initial [`RaymarchConfig`].
    pub config: RaymarchConfig,
    /// Initial field. Its fallback is replaced by [`RaymarchConfig::fallback_density`].
    pub field: DensityField,
}

impl Plugin for VoxelRaymarchPlugin {
    fn build(&self, app: &mut App) {
        if let Err(e) = self.config.validate() {
            panic!("VoxelRaymarchPlugin configured with invalid settings: {e}");
        }
        let field = self
            .field
            .clone()
            .with_fallback(self.config.fallback_density);

        app.insert_resource(self.config.clone())
            .insert_resource(TerrainField(Arc::new(field)))
            .add_message::<SculptRequest>()
            .configure_sets(
                Update,
                (
                    RaymarchSet::Sculpt,
                    RaymarchSet::Spawn,
                    RaymarchSet::Generate,
                    RaymarchSet::Upload,
                )
                    .chain(),
            )
            .add_systems(Update, apply_sculpts.in_set(RaymarchSet::Sculpt));

        #[cfg(feature = "auto_queue")]
        app.add_systems(
            Update,
            (
                spawn_pass.in_set(RaymarchSet::Spawn),
                poll_pass.in_set(RaymarchSet::Generate),
                upload_mesh.in_set(RaymarchSet::Upload),
            ),
        );
    }
}

/// Drains [`SculptRequest`]s into the [`TerrainField`].
fn apply_sculpts(
    mut requests: MessageReader<SculptRequest>,
    config: Res<RaymarchConfig>,
    mut field: ResMut<TerrainField>,
) {
    if requests.is_empty() {
        return;
    }
    // Copy-on-write: an in-flight pass keeps its own snapshot.
    let field = Arc::make_mut(&mut field.0);
    for request in requests.read() {
        let radius = request.radius.unwrap_or(config.brush_radius);
        let strength = request.strength.unwrap_or(config.brush_strength);
        let touched = field.sculpt(request.center, radius, strength, request.sign);
        debug!(?request, touched, "applied sculpt");
    }
}

/// Spawns one async meshing pass when none is in flight.
///
/// A pass that can't be set up is skipped; its error is logged once until it changes.
fn spawn_pass(
    mut commands: Commands,
    mut last_failure: Local<Option<MarchingCubesError>>,
    config: Res<RaymarchConfig>,
    field: Res<TerrainField>,
    cameras: Query<(&Camera, &GlobalTransform), With<RaymarchCamera>>,
    terrain: Query<Entity, With<RaymarchedTerrain>>,
    in_flight: Query<(), With<ComputeTask>>,
) {
    if !in_flight.is_empty() {
        return;
    }
    let Ok(entity) = terrain.single() else {
        return;
    };
    let Some((camera, transform)) = cameras.iter().next() else {
        return;
    };
    let Some(size) = camera.physical_viewport_size() else {
        return;
    };

    let rays = config.validate().and_then(|()| {
        CameraRays::downsampled(
            to_matrix(Mat4::from(transform.affine())),
            to_matrix(camera.clip_from_view().inverse()),
            size.x,
            size.y,
            config.resolution,
        )
    });
    let rays = match rays {
        Ok(rays) => {
            *last_failure = None;
            rays
        }
        Err(e) => {
            if is_new_failure(&mut last_failure, e) {
                warn!("skipping raymarch passes: {e}");
            }
            return;
        }
    };

    // Arc::clone is a single pointer bump; the field is never copied for a pass.
    let field = Arc::clone(&field.0);
    let config = config.clone();
    let task = AsyncComputeTaskPool::get().spawn(async move {
        MeshJob::new(field.as_ref(), &config)
            .map(|job| job.run_screen(&rays))
            .unwrap_or_default()
    });

    commands.entity(entity).insert(ComputeTask(task));
}

/// Polls the in-flight [`ComputeTask`] and inserts [`GeneratedMesh`] on completion.
///
/// Non-blocking: an unfinished task is retried next frame.
fn poll_pass(mut commands: Commands, mut query: Query<(Entity, &mut ComputeTask)>) {
    for (entity, mut compute_task) in query.iter_mut() {
        if let Some(generated_mesh) = block_on(future::poll_once(&mut compute_task.0)) {
            commands
                .entity(entity)
                .insert(generated_mesh)
                .remove::<ComputeTask>();
        }
    }
}

/// Moves a [`GeneratedMesh`] into a Bevy [`Mesh3d`], then removes [`GeneratedMesh`].
fn upload_mesh(
    mut commands: Commands,
    mut query: Query<(Entity, &mut GeneratedMesh), With<RaymarchedTerrain>>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for (entity, mut generated) in query.iter_mut() {
        let generated = std::mem::take(&mut *generated);
        let mut bevy_mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD,
        );

        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, generated.vertices);
        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, generated.normals);
        bevy_mesh.insert_indices(Indices::U32(generated.indices));

        commands
            .entity(entity)
            .insert(Mesh3d(meshes.add(bevy_mesh)))
            .remove::<GeneratedMesh>();
    }
}

/// Records `error`, returning `true` unless it is the one already recorded.
fn is_new_failure(last: &mut Option<MarchingCubesError>, error: MarchingCubesError) -> bool {
    last.replace(error) != Some(error)
}

fn to_matrix(m: Mat4) -> Matrix4<Value> {
    Matrix4::from_column_slice(&m.to_cols_array().map(Value::from))
}
