use std::sync::Arc;

use bevy::prelude::*;
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use bevy_voxel_raymarch::{
    VoxelRaymarchPlugin,
    config::RaymarchConfig,
    field::{DensityField, SculptSign},
    generator::SphereTracer,
    plugin::{RaymarchCamera, RaymarchedTerrain, SculptRequest, TerrainField},
    raymarch::{Ray, march},
    types::{Generator, Point, Vector, world},
};
use noiz::prelude::*;

type TerrainNoise = Noise<
    LayeredNoise<
        Normed<f32>,
        Persistence,
        Octave<MixCellGradients<OrthoGrid, Smoothstep, QuickGradients>>,
    >,
>;

const PLANET_RADIUS: f64 = 24.0;
const HILL_HEIGHT: f64 = 3.0;

/// The unsculpted planet, for the brush preview.
#[derive(Resource)]
struct Baseline(Generator);

fn main() {
    let baseline = planet();
    App::new()
        .add_plugins((
            DefaultPlugins,
            PanOrbitCameraPlugin,
            VoxelRaymarchPlugin {
                config: RaymarchConfig::default().with_resolution(6),
                field: DensityField::new(0.0).with_generator(baseline.clone()),
            },
            #[cfg(not(target_arch = "wasm32"))]
            bevy::pbr::wireframe::WireframePlugin::default(),
        ))
        .insert_resource(Baseline(baseline))
        .add_systems(Startup, setup)
        .add_systems(Update, (preview_brush, sculpt_on_click))
        .run();
}

/// A sphere with noise hills on top.
fn planet() -> Generator {
    let mut noise = TerrainNoise::default();
    noise.set_frequency(0.08);

    Arc::new(move |p: Point| {
        let hills: f32 = noise.sample_for(Vec3::new(p.x as f32, p.y as f32, p.z as f32));
        p.coords.norm() - PLANET_RADIUS - HILL_HEIGHT * f64::from(hills)
    })
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    bevy::log::info!("Planet Example: left click digs, shift + left click fills");

    commands.spawn((
        Camera3d::default(),
        RaymarchCamera,
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(0.0, 20.0, 60.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));

    commands.spawn((
        RaymarchedTerrain,
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.4, 0.7, 0.3),
            ..Default::default()
        })),
    ));
}

fn cursor_ray(
    windows: &Query<&Window>,
    cameras: &Query<(&Camera, &GlobalTransform), With<RaymarchCamera>>,
) -> Option<Ray> {
    let cursor = windows.iter().next().and_then(Window::cursor_position)?;
    let (camera, transform) = cameras.single().ok()?;
    let view_ray = camera.viewport_to_world(transform, cursor).ok()?;

    let origin = view_ray.origin.as_dvec3();
    let direction = view_ray.direction.as_dvec3();
    Some(Ray::new(
        Point::new(origin.x, origin.y, origin.z),
        Vector::new(direction.x, direction.y, direction.z),
    ))
}

/// Outlines the brush where the cursor meets the unsculpted planet.
fn preview_brush(
    mut gizmos: Gizmos,
    windows: Query<&Window>,
    cameras: Query<(&Camera, &GlobalTransform), With<RaymarchCamera>>,
    config: Res<RaymarchConfig>,
    baseline: Res<Baseline>,
) {
    let Some(ray) = cursor_ray(&windows, &cameras) else {
        return;
    };
    let Some(p) = SphereTracer::default()
        .trace(&ray, |p| (baseline.0)(p))
        .point(&ray)
    else {
        return;
    };
    gizmos.sphere(
        Isometry3d::from_translation(Vec3::new(p.x as f32, p.y as f32, p.z as f32)),
        config.brush_radius as f32,
        Color::WHITE,
    );
}

fn sculpt_on_click(
    buttons: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window>,
    cameras: Query<(&Camera, &GlobalTransform), With<RaymarchCamera>>,
    config: Res<RaymarchConfig>,
    field: Res<TerrainField>,
    mut requests: MessageWriter<SculptRequest>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let Some(ray) = cursor_ray(&windows, &cameras) else {
        return;
    };
    let Some(cell) = march(field.0.as_ref(), &ray, config.max_steps).cell() else {
        return;
    };

    let sign = if keys.pressed(KeyCode::ShiftLeft) {
        SculptSign::Fill
    } else {
        SculptSign::Dig
    };
    requests.write(SculptRequest::new(world(cell), sign));
}
