use std::{sync::Arc, time::Duration};

use village_ngin::{
    data_structures::scene_graph::SlotState,
    flow::VillageSimulation,
    placement::ZoneKind,
    world::environment::FixedDayNight,
};

use crate::common::test_utils::{MockLoader, Observed, RecordingObserver, sample_buildings, test_config};

mod common;

#[tokio::test]
async fn every_element_falls_back_when_nothing_loads() {
    let observer = RecordingObserver::new();
    let loader = Arc::new(MockLoader::always_failing());
    let mut sim = VillageSimulation::new(test_config(), loader, tokio::runtime::Handle::current())
        .with_observer(Box::new(observer.clone()))
        .with_day_night(Box::new(FixedDayNight(1.0)));

    sim.apply_buildings(sample_buildings());
    sim.wait_for_loads().await;

    assert!(sim.is_populated());
    assert_eq!(observer.count(|e| *e == Observed::Complete), 1);
    assert_eq!(observer.progress().last().copied(), Some(1.0));

    let graph = sim.graph();
    for building in sim.buildings().iter() {
        assert!(matches!(building.slot.state, SlotState::Fallback { .. }));
        assert!(graph.is_effectively_visible(building.slot.visual_node()));
        assert!(graph.world_bounds(building.root).is_some());
    }
    for element in sim.scenery().elements() {
        assert!(matches!(element.slot.state, SlotState::Fallback { .. }));
        assert!(graph.is_effectively_visible(element.slot.visual_node()));
    }

    // Procedural villagers carry no clips but still wander.
    assert_eq!(sim.villagers().villagers().len(), 4);
    assert!(sim.villagers().villagers().iter().all(|v| v.mixer.is_empty()));
    assert_eq!(sim.validator().count_by_kind(ZoneKind::Building), 6);
}

#[tokio::test]
async fn partial_failure_only_affects_the_broken_variant() {
    let observer = RecordingObserver::new();
    let loader = Arc::new(MockLoader::new().failing("temple"));
    let mut sim = VillageSimulation::new(test_config(), loader, tokio::runtime::Handle::current())
        .with_observer(Box::new(observer.clone()));

    sim.apply_buildings(sample_buildings());
    sim.wait_for_loads().await;

    for building in sim.buildings().iter() {
        let fell_back = matches!(building.slot.state, SlotState::Fallback { .. });
        assert_eq!(fell_back, building.config.id == "shrine", "{}", building.config.id);
    }
    sim.tick(Duration::from_millis(16));
    assert!(sim.is_running());
}

#[tokio::test]
async fn pending_buildings_stay_hidden_until_settled() {
    let observer = RecordingObserver::new();
    let loader = Arc::new(MockLoader::always_failing().with_delay(Duration::from_millis(10)));
    let mut sim = VillageSimulation::new(test_config(), loader, tokio::runtime::Handle::current())
        .with_observer(Box::new(observer.clone()));

    sim.apply_buildings(sample_buildings());
    for building in sim.buildings().iter() {
        assert!(!sim.graph().is_effectively_visible(building.slot.visual_node()));
    }
    sim.wait_for_loads().await;
    for building in sim.buildings().iter() {
        assert!(sim.graph().is_effectively_visible(building.slot.visual_node()));
    }
}
