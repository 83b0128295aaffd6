//! Spawning
//!
//! Populates worlds with the objects their game's classes ask for. Every
//! class carries a list of spawn rules; each rule owns one or more slots,
//! and every spawned object remembers its slot in the `spawn_key`
//! attribute:
//! - `point:<rule>` for fixed coordinates
//! - `polygon:<rule>` for random positions inside an area
//! - `osm:<node id>` for map features matching a tag query near players
//!
//! A slot is refilled up to the rule's cap. With `respawn` enabled only
//! objects still on the map count, so collected objects grow back.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::framework::registry::RegisteredClass;
use crate::framework::GameRegistry;
use crate::geo::{BoundingBox, LatLon, Polygon};
use crate::model::{BaseKind, GameObject, ItemState, NpcState, ObjectKind, World};
use crate::osm::{OsmStore, TagQuery};
use crate::state::AppState;
use crate::store::GameStore;

/// Attribute naming the slot an object was spawned for
pub const SPAWN_KEY_ATTRIBUTE: &str = "spawn_key";

/// Attribute holding the map node an object was spawned at
pub const OSM_NODE_ATTRIBUTE: &str = "osm_node_id";

/// Where a rule puts its objects
#[derive(Debug, Clone)]
pub enum Placement {
    /// Fixed coordinates
    Point(LatLon),
    /// Random positions inside an area
    Polygon(Polygon),
    /// Map features matching a query within a radius around each player
    Osm { query: TagQuery, radius_m: f64 },
}

/// One spawn rule of a class
#[derive(Debug, Clone)]
pub struct SpawnRule {
    pub placement: Placement,
    /// Maximum population of each slot
    pub cap: usize,
    /// Count only objects on the map, so collected ones are replaced
    pub respawn: bool,
}

impl SpawnRule {
    pub fn point(at: LatLon, cap: usize) -> Self {
        Self {
            placement: Placement::Point(at),
            cap,
            respawn: true,
        }
    }

    pub fn polygon(polygon: Polygon, cap: usize) -> Self {
        Self {
            placement: Placement::Polygon(polygon),
            cap,
            respawn: true,
        }
    }

    pub fn osm(query: TagQuery, radius_m: f64, cap: usize) -> Self {
        Self {
            placement: Placement::Osm { query, radius_m },
            cap,
            respawn: true,
        }
    }

    /// Spawn each slot only once
    pub fn once(mut self) -> Self {
        self.respawn = false;
        self
    }
}

/// Outcome of a spawn run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpawnReport {
    pub worlds: usize,
    pub created: usize,
    pub osm_fetches: usize,
}

impl SpawnReport {
    fn merge(&mut self, other: SpawnReport) {
        self.worlds += other.worlds;
        self.created += other.created;
        self.osm_fetches += other.osm_fetches;
    }
}

/// Population of every (discriminator, spawn key) slot in one world
#[derive(Default)]
struct Population {
    /// (objects on the map, all objects) per slot
    counts: HashMap<(String, String), (usize, usize)>,
}

impl Population {
    fn of_world(store: &GameStore, world_id: i64) -> Self {
        let mut population = Self::default();
        for obj in store.objects(|o| o.world_id == world_id) {
            if let Some(key) = obj.attribute(SPAWN_KEY_ATTRIBUTE) {
                population.add(&obj.type_name, key, obj.isonmap);
            }
        }
        population
    }

    fn get(&self, type_name: &str, key: &str, respawn: bool) -> usize {
        let (on_map, total) = self
            .counts
            .get(&(type_name.to_string(), key.to_string()))
            .copied()
            .unwrap_or((0, 0));
        if respawn {
            on_map
        } else {
            total
        }
    }

    fn add(&mut self, type_name: &str, key: &str, isonmap: bool) {
        let entry = self
            .counts
            .entry((type_name.to_string(), key.to_string()))
            .or_insert((0, 0));
        if isonmap {
            entry.0 += 1;
        }
        entry.1 += 1;
    }
}

/// One slot of a rule being filled
struct Slot<'a> {
    registered: &'a RegisteredClass,
    rule: &'a SpawnRule,
    world_id: i64,
    key: String,
    osm_node: Option<i64>,
}

impl Slot<'_> {
    /// Build a new, unsaved object for this slot
    fn instantiate(&self, position: LatLon) -> Option<GameObject> {
        let class = &self.registered.class;
        let kind = match class.kind() {
            BaseKind::Item => ObjectKind::Item(ItemState::default()),
            BaseKind::Npc => ObjectKind::Npc(NpcState::default()),
            // Players only come from users joining a world
            BaseKind::Player => return None,
        };

        let type_name = self.registered.type_name.clone();
        let mut obj = GameObject::new(type_name, self.world_id, position, kind);
        obj.name = class.default_name();
        obj.image = class.default_image();
        obj.attributes = class.default_attributes();
        obj.set_attribute(SPAWN_KEY_ATTRIBUTE, self.key.clone());
        if let Some(node_id) = self.osm_node {
            obj.set_attribute(OSM_NODE_ATTRIBUTE, node_id.to_string());
        }
        Some(obj)
    }

    /// Create objects until the slot reaches the rule's cap
    fn fill<F>(&self, store: &GameStore, population: &mut Population, mut position: F) -> usize
    where
        F: FnMut() -> Option<LatLon>,
    {
        let type_name = &self.registered.type_name;
        let present = population.get(type_name, &self.key, self.rule.respawn);
        let mut created = 0;

        for _ in present..self.rule.cap {
            let Some(at) = position() else {
                warn!(type_name = %type_name, key = %self.key, "No position found for spawn");
                break;
            };
            let Some(obj) = self.instantiate(at) else {
                break;
            };

            match store.insert_object(obj) {
                Ok(obj) => {
                    trace!(object_id = obj.id, key = %self.key, "Spawned object");
                    population.add(type_name, &self.key, true);
                    created += 1;
                }
                Err(e) => {
                    warn!(error = %e, type_name = %type_name, "Failed to spawn object");
                    break;
                }
            }
        }

        created
    }
}

/// Spawn objects into one world
pub fn spawn_world<R: Rng + ?Sized>(
    store: &GameStore,
    registry: &GameRegistry,
    osm: &OsmStore,
    world: &World,
    rng: &mut R,
) -> usize {
    let Some(game) = store.game(world.game_id) else {
        warn!(world_id = world.id, game_id = world.game_id, "World refers to unknown game");
        return 0;
    };

    let mut population = Population::of_world(store, world.id);
    let players = store.objects(|o| o.world_id == world.id && o.is_player());
    let mut created = 0;

    for registered in &registry.classes_of(&game.package) {
        for (index, rule) in registered.class.spawn_rules().iter().enumerate() {
            let slot = |key: String, osm_node: Option<i64>| Slot {
                registered,
                rule,
                world_id: world.id,
                key,
                osm_node,
            };

            created += match &rule.placement {
                Placement::Point(at) => slot(format!("point:{}", index), None)
                    .fill(store, &mut population, || Some(*at)),
                Placement::Polygon(polygon) => slot(format!("polygon:{}", index), None)
                    .fill(store, &mut population, || polygon.random_point(rng)),
                Placement::Osm { query, radius_m } => {
                    let mut nodes = BTreeMap::new();
                    for player in &players {
                        for node in osm.query_radius(&player.position(), *radius_m, query) {
                            nodes.insert(node.id, node);
                        }
                    }

                    nodes
                        .values()
                        .map(|node| {
                            slot(format!("osm:{}", node.id), Some(node.id))
                                .fill(store, &mut population, || Some(node.position()))
                        })
                        .sum::<usize>()
                }
            };
        }
    }

    if created > 0 {
        debug!(world_id = world.id, created = created, "Spawned objects");
    }
    created
}

/// Spawn objects into every enabled world
pub fn spawn_all<R: Rng + ?Sized>(
    store: &GameStore,
    registry: &GameRegistry,
    osm: &OsmStore,
    rng: &mut R,
) -> SpawnReport {
    let mut report = SpawnReport::default();
    for world in store.worlds().into_iter().filter(|w| w.enabled) {
        report.worlds += 1;
        report.created += spawn_world(store, registry, osm, &world, rng);
    }
    report
}

/// Areas around players whose map features are not known yet, with the
/// queries needed there
///
/// Areas whose fetch failed less than `retry_after` ago are left out.
pub fn missing_osm_areas(
    store: &GameStore,
    registry: &GameRegistry,
    osm: &OsmStore,
    fetch_radius_m: f64,
    retry_after: Duration,
) -> Vec<(BoundingBox, Vec<TagQuery>)> {
    let mut areas: Vec<(BoundingBox, Vec<TagQuery>)> = Vec::new();

    for world in store.worlds().into_iter().filter(|w| w.enabled) {
        let Some(game) = store.game(world.game_id) else {
            continue;
        };

        let mut queries: Vec<TagQuery> = Vec::new();
        let mut radius = fetch_radius_m;
        for registered in registry.classes_of(&game.package) {
            for rule in registered.class.spawn_rules() {
                if let Placement::Osm { query, radius_m } = rule.placement {
                    radius = radius.max(radius_m);
                    if !queries.contains(&query) {
                        queries.push(query);
                    }
                }
            }
        }
        if queries.is_empty() {
            continue;
        }

        for player in store.objects(|o| o.world_id == world.id && o.is_player()) {
            let bbox = BoundingBox::around(&player.position(), radius);
            let pending = areas.iter().any(|(area, _)| area.covers(&bbox));
            if !pending && !osm.is_covered(&bbox) && !osm.recently_failed(&bbox, retry_after) {
                areas.push((bbox, queries.clone()));
            }
        }
    }

    areas
}

fn pending_osm_areas(state: &AppState) -> Vec<(BoundingBox, Vec<TagQuery>)> {
    missing_osm_areas(
        &state.store,
        &state.registry,
        &state.osm,
        state.config.osm.fetch_radius_m,
        Duration::from_secs(state.config.osm.retry_after_secs),
    )
}

/// Fetch missing map data from Overpass, if a client is configured
///
/// Callers hold `osm_fetch_lock`.
async fn fetch_osm(state: &AppState) -> usize {
    let Some(client) = &state.overpass else {
        return 0;
    };

    let mut fetches = 0;
    for (bbox, queries) in pending_osm_areas(state) {
        match client.fetch(&bbox, &queries).await {
            Ok(nodes) => {
                state.osm.insert_nodes(nodes);
                state.osm.mark_covered(bbox);
                fetches += 1;
            }
            Err(e) => {
                warn!(error = %e, bbox = %bbox, "Failed to fetch OSM data");
                state.osm.mark_failed(bbox);
            }
        }
    }
    fetches
}

/// Spawn from the map data already known; callers hold `spawn_lock`
fn spawn_cached(state: &AppState, osm_fetches: usize) -> SpawnReport {
    let mut report = SpawnReport {
        osm_fetches,
        ..Default::default()
    };

    let mut rng = StdRng::from_entropy();
    report.merge(spawn_all(&state.store, &state.registry, &state.osm, &mut rng));

    if report.created > 0 {
        info!(
            worlds = report.worlds,
            created = report.created,
            osm_fetches = report.osm_fetches,
            "Spawn run finished"
        );
    }
    report
}

/// Run the spawner, fetching missing map data first
///
/// Waits for a running fetch or spawn to finish.
pub async fn run(state: &AppState) -> SpawnReport {
    let osm_fetches = {
        let _fetching = state.osm_fetch_lock.lock().await;
        fetch_osm(state).await
    };

    let _guard = state.spawn_lock.lock().await;
    spawn_cached(state, osm_fetches)
}

/// Run the spawner on the known map data unless a run is in progress
///
/// Missing map data is fetched by a background task, which spawns again
/// once new data has arrived. Never waits on the network.
pub fn run_if_idle(state: &AppState) -> Option<SpawnReport> {
    let report = {
        let Ok(_guard) = state.spawn_lock.try_lock() else {
            trace!("Spawn already running, skipping");
            return None;
        };
        spawn_cached(state, 0)
    };

    fetch_in_background(state);
    Some(report)
}

/// Start fetching missing map data on a detached task
fn fetch_in_background(state: &AppState) {
    if state.overpass.is_none() || pending_osm_areas(state).is_empty() {
        return;
    }

    let state = state.clone();
    tokio::spawn(async move {
        let osm_fetches = {
            let Ok(_fetching) = state.osm_fetch_lock.try_lock() else {
                trace!("OSM fetch already running");
                return;
            };
            fetch_osm(&state).await
        };

        if osm_fetches > 0 {
            let _guard = state.spawn_lock.lock().await;
            spawn_cached(&state, osm_fetches);
        }
    });
}
