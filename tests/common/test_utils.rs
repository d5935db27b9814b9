#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::{FutureExt, future::BoxFuture};
use village_ngin::{
    config::{BuildingConfig, BuildingVariant, VillageConfig},
    data_structures::model::{Aabb, ClipInfo, Model},
    pick::VillageObserver,
    resources::ModelLoader,
};

/// Loader that fabricates models in memory and counts how often each URL
/// reaches it.
pub(crate) struct MockLoader {
    calls: Mutex<HashMap<String, usize>>,
    failing: Vec<String>,
    delay: Duration,
}

impl MockLoader {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            failing: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    /// Every load fails.
    pub fn always_failing() -> Self {
        Self::new().failing("")
    }

    /// URLs containing `pattern` fail.
    pub fn failing(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl ModelLoader for MockLoader {
    fn load(&self, url: &str) -> BoxFuture<'static, anyhow::Result<Model>> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let fail = self.failing.iter().any(|pattern| url.contains(pattern.as_str()));
        let delay = self.delay;
        let url = url.to_string();
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fail {
                anyhow::bail!("no such asset: {}", url);
            }
            Ok(Model::new(url, Aabb::grounded(2.0, 4.0, 2.0)).with_clips(vec![
                ClipInfo {
                    name: "Idle".into(),
                    duration: 2.0,
                },
                ClipInfo {
                    name: "Walk".into(),
                    duration: 1.0,
                },
            ]))
        }
        .boxed()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Observed {
    Click(String),
    Hover(Option<String>),
    Progress(f32),
    Complete,
}

/// Observer that writes every callback into a shared log.
#[derive(Clone, Default)]
pub(crate) struct RecordingObserver {
    log: Arc<Mutex<Vec<Observed>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Observed> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Observed) -> bool) -> usize {
        self.log.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Click(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<f32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Observed) {
        self.log.lock().unwrap().push(event);
    }
}

impl VillageObserver for RecordingObserver {
    fn on_building_click(&mut self, building: &BuildingConfig) {
        self.push(Observed::Click(building.id.clone()));
    }

    fn on_building_hover(&mut self, building: Option<&BuildingConfig>) {
        self.push(Observed::Hover(building.map(|b| b.id.clone())));
    }

    fn on_loading_progress(&mut self, fraction: f32) {
        self.push(Observed::Progress(fraction));
    }

    fn on_loading_complete(&mut self) {
        self.push(Observed::Complete);
    }
}

/// Six buildings on a ring around the plaza, one of them locked and one a
/// floating dungeon.
pub(crate) fn sample_buildings() -> Vec<BuildingConfig> {
    let mut dungeon = BuildingConfig::new("crypt", BuildingVariant::Dungeon, -14.0, -14.0);
    dungeon.position[1] = 2.0;
    vec![
        BuildingConfig::new("cottage", BuildingVariant::House, 16.0, 0.0),
        BuildingConfig::new("market", BuildingVariant::Shop, -16.0, 0.0),
        BuildingConfig::new("shrine", BuildingVariant::Temple, 0.0, 18.0),
        BuildingConfig::new("inn", BuildingVariant::Tavern, 0.0, -18.0),
        BuildingConfig::new("hall", BuildingVariant::Guild, 14.0, 14.0).locked(),
        dungeon,
    ]
}

/// Small, fast village: few villagers and no weather.
pub(crate) fn test_config() -> VillageConfig {
    let mut config = VillageConfig::default();
    config.world.seed = 7;
    config.villagers.count = 4;
    config.weather.enabled = false;
    config
}
