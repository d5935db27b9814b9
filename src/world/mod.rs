//! The living parts of the village.
//!
//! - `buildings` owns placed buildings, their zones, highlights and lights
//! - `scenery` decorates the free space around them
//! - `villagers` wander between idle and walk
//! - `critters` are short-lived ambient creatures
//! - `environment` drives lighting from the time of day and runs the weather
//!
//! Asset loads run as tasks on a tokio runtime. They never touch the scene;
//! their results come back as [`LoadEvent`]s through a [`LoadQueue`] that the
//! frame driver drains.

use std::{future::Future, sync::Arc};

use futures::{
    StreamExt,
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use log::{debug, trace};
use rand::Rng;

use crate::{
    config::{BuildingVariant, SceneryCategory},
    data_structures::model::Model,
    error::AssetError,
};

pub mod buildings;
pub mod critters;
pub mod environment;
pub mod scenery;
pub mod villagers;

pub type AssetResult = Result<Arc<Model>, AssetError>;

/// Uniform draw from a `[min, max]` tuning range. A collapsed or inverted
/// range yields `min`.
pub(crate) fn sample_range(rng: &mut impl Rng, range: [f32; 2]) -> f32 {
    if range[1] > range[0] {
        rng.random_range(range[0]..range[1])
    } else {
        range[0]
    }
}

/// Completion of one asynchronous load.
#[derive(Debug)]
pub enum LoadEvent {
    /// The shared asset of one building variant settled. Settles every
    /// building of that variant and drives progress.
    Variant {
        variant: BuildingVariant,
        result: AssetResult,
    },
    /// The asset shared by every element of one scenery category settled.
    Scenery {
        category: SceneryCategory,
        result: AssetResult,
    },
    /// Both villager looks settled.
    VillagerVariants { results: Vec<AssetResult> },
}

struct Stamped {
    epoch: u64,
    event: LoadEvent,
}

/// Spawns load tasks and hands their results back in frame order.
///
/// Every task is stamped with the epoch it was started in. Bumping the epoch
/// (reload, teardown) turns all older results into no-ops.
pub struct LoadQueue {
    handle: tokio::runtime::Handle,
    tx: UnboundedSender<Stamped>,
    rx: UnboundedReceiver<Stamped>,
    epoch: u64,
    pending: usize,
}

impl LoadQueue {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        let (tx, rx) = mpsc::unbounded();
        Self {
            handle,
            tx,
            rx,
            epoch: 0,
            pending: 0,
        }
    }

    pub fn spawn<F>(&mut self, load: F)
    where
        F: Future<Output = LoadEvent> + Send + 'static,
    {
        self.pending += 1;
        let tx = self.tx.clone();
        let epoch = self.epoch;
        self.handle.spawn(async move {
            let event = load.await;
            // The receiver only goes away together with the simulation.
            if tx.unbounded_send(Stamped { epoch, event }).is_err() {
                trace!("Load finished after the simulation was dropped");
            }
        });
    }

    /// Invalidates everything in flight.
    pub fn bump_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.pending = 0;
        self.epoch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Loads of the current epoch that have not reported back yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    fn accept(&mut self, stamped: Stamped) -> Option<LoadEvent> {
        if stamped.epoch != self.epoch {
            debug!("Dropping load result from epoch {}", stamped.epoch);
            return None;
        }
        self.pending = self.pending.saturating_sub(1);
        Some(stamped.event)
    }

    /// Next finished load without waiting.
    pub fn try_next(&mut self) -> Option<LoadEvent> {
        while let Ok(stamped) = self.rx.try_recv() {
            if let Some(event) = self.accept(stamped) {
                return Some(event);
            }
        }
        None
    }

    /// Waits for the next load of the current epoch. `None` once nothing is
    /// pending.
    pub async fn next(&mut self) -> Option<LoadEvent> {
        while self.pending > 0 {
            let stamped = self.rx.next().await?;
            if let Some(event) = self.accept(stamped) {
                return Some(event);
            }
        }
        None
    }
}
