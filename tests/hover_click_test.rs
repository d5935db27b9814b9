use std::sync::Arc;

use village_ngin::{
    camera::world_to_ndc,
    config::{BuildingConfig, BuildingVariant},
    context::Cursor,
    flow::VillageSimulation,
    world::buildings::{HOVER_OPACITY, HOVER_OPACITY_LOCKED},
};

use crate::common::test_utils::{MockLoader, Observed, RecordingObserver, test_config};

mod common;

const EMPTY_SKY: (f32, f32) = (0.0, 0.9);

fn two_houses() -> Vec<BuildingConfig> {
    vec![
        BuildingConfig::new("bakery", BuildingVariant::House, -6.0, 4.0),
        BuildingConfig::new("vault", BuildingVariant::House, 6.0, 4.0).locked(),
    ]
}

fn aim_at(sim: &VillageSimulation, index: usize) -> (f32, f32) {
    let ctx = sim.context();
    let center = sim.buildings().center_of(index).unwrap();
    world_to_ndc(&ctx.camera, &ctx.projection, center).unwrap()
}

fn highlight_opacity(sim: &VillageSimulation, index: usize) -> f32 {
    let building = sim.buildings().get(index).unwrap();
    sim.graph().get(building.highlight).unwrap().material.opacity
}

fn simulation(observer: &RecordingObserver) -> VillageSimulation {
    VillageSimulation::new(
        test_config(),
        Arc::new(MockLoader::new()),
        tokio::runtime::Handle::current(),
    )
    .with_observer(Box::new(observer.clone()))
}

#[tokio::test]
async fn buildings_are_clickable_before_assets_load() {
    let observer = RecordingObserver::new();
    let mut sim = simulation(&observer);
    sim.apply_buildings(two_houses());

    let ndc = aim_at(&sim, 0);
    assert_eq!(sim.update_hover(ndc), Some(0));
    assert!(sim.handle_click());
    assert_eq!(observer.clicks(), vec!["bakery".to_string()]);
}

#[tokio::test]
async fn hovering_an_unlocked_building_highlights_it() {
    let observer = RecordingObserver::new();
    let mut sim = simulation(&observer);
    sim.apply_buildings(two_houses());
    sim.wait_for_loads().await;

    let ndc = aim_at(&sim, 0);
    assert_eq!(sim.update_hover(ndc), Some(0));
    assert_eq!(sim.context().cursor, Cursor::Pointer);
    assert!((highlight_opacity(&sim, 0) - HOVER_OPACITY).abs() < 1e-6);
    let building = sim.buildings().get(0).unwrap();
    let node = sim.graph().get(building.highlight).unwrap();
    assert_eq!(node.material.tint, building.config.highlight());

    // Moving within the same building does not re-fire.
    sim.update_hover((ndc.0 + 0.001, ndc.1));
    assert_eq!(
        observer.count(|e| matches!(e, Observed::Hover(Some(_)))),
        1
    );

    assert!(sim.handle_click());
    assert_eq!(observer.clicks(), vec!["bakery".to_string()]);
}

#[tokio::test]
async fn locked_buildings_hover_but_ignore_clicks() {
    let observer = RecordingObserver::new();
    let mut sim = simulation(&observer);
    sim.apply_buildings(two_houses());
    sim.wait_for_loads().await;

    let ndc = aim_at(&sim, 1);
    assert_eq!(sim.update_hover(ndc), Some(1));
    assert_eq!(sim.context().cursor, Cursor::NotAllowed);
    assert!((highlight_opacity(&sim, 1) - HOVER_OPACITY_LOCKED).abs() < 1e-6);
    assert!(observer.events().contains(&Observed::Hover(Some("vault".into()))));

    assert!(!sim.handle_click());
    assert!(observer.clicks().is_empty());
}

#[tokio::test]
async fn leaving_a_building_resets_its_highlight() {
    let observer = RecordingObserver::new();
    let mut sim = simulation(&observer);
    sim.apply_buildings(two_houses());
    sim.wait_for_loads().await;

    let first = aim_at(&sim, 0);
    let second = aim_at(&sim, 1);
    sim.update_hover(first);
    sim.update_hover(second);
    assert_eq!(highlight_opacity(&sim, 0), 0.0);
    assert!(highlight_opacity(&sim, 1) > 0.0);

    assert_eq!(sim.update_hover(EMPTY_SKY), None);
    assert_eq!(highlight_opacity(&sim, 1), 0.0);
    assert_eq!(sim.context().cursor, Cursor::Default);
    assert_eq!(
        observer
            .events()
            .into_iter()
            .filter(|e| matches!(e, Observed::Hover(_)))
            .collect::<Vec<_>>(),
        vec![
            Observed::Hover(Some("bakery".into())),
            Observed::Hover(Some("vault".into())),
            Observed::Hover(None),
        ]
    );
    assert!(!sim.handle_click());
}

#[tokio::test]
async fn pick_follows_viewport_resize() {
    let observer = RecordingObserver::new();
    let mut sim = simulation(&observer);
    sim.apply_buildings(two_houses());
    sim.resize(600, 900);
    assert_eq!(sim.context().projection.aspect(), 600.0 / 900.0);

    let ndc = aim_at(&sim, 1);
    assert_eq!(sim.update_hover(ndc), Some(1));
    sim.resize(0, 0);
    assert_eq!(sim.context().width, 600);
}
