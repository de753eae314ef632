//! Edgeward placement.
//!
//! Walks every leaf-to-root path of the orchestrator's subtree and places
//! each ready microservice on the first device (closest to the edge) with
//! enough free CPU. When a device that already hosts a microservice cannot
//! take one more instance, the microservice and its co-located upstream
//! dependants are shifted towards the root together.

use crate::{PlacementAlgorithm, PlacementContext, ResourceSnapshot, ShiftError};
use fogmesh_types::{
    Application, DeviceId, Direction, PlacementMap, PlacementRequest, PlacementSlot, RequestId,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Transient per-device bookkeeping for one placement cycle.
#[derive(Debug, Clone, Default)]
struct DeviceLedger {
    /// CPU committed on this device during the cycle.
    cpu_load: u64,
    /// Microservice → one slot per instance. Entries are never empty.
    instances: BTreeMap<String, Vec<PlacementSlot>>,
}

/// Edgeward placement for the orchestrator at `root`.
#[derive(Debug, Clone)]
pub struct EdgewardPlacement {
    root: DeviceId,
    ledger: BTreeMap<DeviceId, DeviceLedger>,
}

impl EdgewardPlacement {
    pub fn new(root: DeviceId) -> Self {
        Self {
            root,
            ledger: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> DeviceId {
        self.root
    }

    /// CPU placed on `device` by the current cycle.
    pub fn transient_load(&self, device: DeviceId) -> u64 {
        self.ledger.get(&device).map(|l| l.cpu_load).unwrap_or(0)
    }

    /// Number of instances of `microservice` placed on `device` by the current cycle.
    pub fn transient_instances(&self, device: DeviceId, microservice: &str) -> usize {
        self.ledger
            .get(&device)
            .and_then(|l| l.instances.get(microservice))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Whether no transient bookkeeping is held.
    pub fn is_idle(&self) -> bool {
        self.ledger.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Path walk
    // ═══════════════════════════════════════════════════════════════════════

    /// Walk `path` (leaf first) for one request. Returns whether every
    /// microservice of the application ended up placed.
    fn place_request(
        &mut self,
        ctx: &PlacementContext<'_>,
        path: &[DeviceId],
        request: &PlacementRequest,
        app: &Application,
    ) -> bool {
        let mut placed = request.placed_names();

        for &device in path {
            let Some(spec) = ctx.topology.device(device) else {
                continue;
            };
            if !spec.role.hosts_shared_microservices() || !self.ledger.contains_key(&device) {
                continue;
            }

            let mut tried = BTreeSet::new();
            while let Some(name) = app
                .ready_to_place(&placed)
                .into_iter()
                .find(|n| !tried.contains(*n))
                .map(str::to_owned)
            {
                tried.insert(name.clone());
                let mips = app.mips_of(&name);
                let slot = PlacementSlot::new(request.id, app.id.clone(), name.as_str());
                let free = ctx.resources.free_cpu(device);

                match self.hosting_device(&name, path) {
                    Some(host) if host == device => {
                        placed.insert(name.clone());
                        if self.load(device) + mips > free {
                            debug!(
                                microservice = %name,
                                device = %spec.name,
                                "Shifting microservice upstream"
                            );
                            match self.shift_upstream(ctx, app, &name, slot, device) {
                                // Dependants that moved along carry other
                                // requests' slots; this request reaches them
                                // again further up the path.
                                Ok(_) => {}
                                Err(e) => {
                                    warn!(request = %request.id, error = %e, "Shift upstream failed");
                                    fogmesh_metrics::record_shift_failure();
                                    placed.remove(&name);
                                }
                            }
                        } else {
                            self.add_instance(device, &name, slot, mips);
                            debug!(microservice = %name, device = %spec.name, "Instance added");
                        }
                    }
                    Some(_) => {
                        // Hosted elsewhere on the path; that device handles it.
                    }
                    None if self.load(device) + mips <= free => {
                        self.add_instance(device, &name, slot, mips);
                        placed.insert(name.clone());
                        debug!(microservice = %name, device = %spec.name, "Microservice placed");
                    }
                    None => {
                        debug!(microservice = %name, device = %spec.name, "Placement not possible");
                    }
                }
            }
        }

        self.is_complete(request, app)
    }

    /// Whether every microservice of `app` is pre-placed for `request` or
    /// holds one of its slots in the ledger.
    fn is_complete(&self, request: &PlacementRequest, app: &Application) -> bool {
        app.microservices().iter().all(|m| {
            request.placed.contains_key(&m.name)
                || self.ledger.values().any(|ledger| {
                    ledger
                        .instances
                        .get(&m.name)
                        .is_some_and(|slots| slots.iter().any(|s| s.request == request.id))
                })
        })
    }

    /// First device of `path` holding an instance of `microservice` this cycle.
    fn hosting_device(&self, microservice: &str, path: &[DeviceId]) -> Option<DeviceId> {
        path.iter().copied().find(|d| {
            self.ledger
                .get(d)
                .is_some_and(|l| l.instances.contains_key(microservice))
        })
    }

    fn load(&self, device: DeviceId) -> u64 {
        self.transient_load(device)
    }

    fn add_instance(&mut self, device: DeviceId, microservice: &str, slot: PlacementSlot, mips: u64) {
        let entry = self.ledger.entry(device).or_default();
        entry.cpu_load += mips;
        entry
            .instances
            .entry(microservice.to_owned())
            .or_default()
            .push(slot);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Shift upstream
    // ═══════════════════════════════════════════════════════════════════════

    /// Move `microservice` (plus one new instance for `slot`) and everything
    /// it feeds over UP edges on the same device towards the root, until a
    /// device can absorb the whole set.
    ///
    /// On failure the ledger is left exactly as before the call.
    fn shift_upstream(
        &mut self,
        ctx: &PlacementContext<'_>,
        app: &Application,
        microservice: &str,
        slot: PlacementSlot,
        from: DeviceId,
    ) -> Result<Vec<String>, ShiftError> {
        let saved = self.ledger.clone();

        let mut moving: BTreeMap<String, Vec<PlacementSlot>> = BTreeMap::new();
        let mut moving_load = 0u64;

        let mut names = self.upstream_dependants(app, &[microservice.to_owned()], from);
        moving_load += self.take(app, from, &names, &mut moving);
        moving.entry(microservice.to_owned()).or_default().push(slot);
        moving_load += app.mips_of(microservice);

        let mut current = from;
        for _ in 0..ctx.domain.len() {
            if current == self.root {
                break;
            }
            let Some(parent) = ctx.topology.parent(current) else {
                break;
            };
            if !self.ledger.contains_key(&parent) {
                break;
            }
            current = parent;

            if self.load(current) + moving_load <= ctx.resources.free_cpu(current) {
                let entry = self.ledger.entry(current).or_default();
                entry.cpu_load += moving_load;
                let moved: Vec<String> = moving.keys().cloned().collect();
                for (name, slots) in moving {
                    entry.instances.entry(name).or_default().extend(slots);
                }
                info!(
                    microservices = ?moved,
                    from = %from,
                    to = %current,
                    load = moving_load,
                    "Shifted microservices upstream"
                );
                return Ok(moved);
            }

            // The parent is full too: its own dependants of the set move along.
            let dependants = self.upstream_dependants(app, &names, current);
            let joining: Vec<String> = dependants
                .iter()
                .filter(|d| !names.contains(d))
                .cloned()
                .collect();
            moving_load += self.take(app, current, &joining, &mut moving);
            names = dependants;
        }

        self.ledger = saved;
        Err(ShiftError {
            from,
            reached: current,
            microservices: moving.into_keys().collect(),
        })
    }

    /// `seeds` plus every microservice reachable from them over UP edges that
    /// is hosted on `device` this cycle.
    fn upstream_dependants(&self, app: &Application, seeds: &[String], device: DeviceId) -> Vec<String> {
        let hosted = self.ledger.get(&device);
        let mut set = seeds.to_vec();
        let mut changed = true;
        while changed {
            changed = false;
            for edge in app.module_edges() {
                if edge.direction == Direction::Up
                    && set.contains(&edge.source)
                    && !set.contains(&edge.destination)
                    && hosted.is_some_and(|l| l.instances.contains_key(&edge.destination))
                {
                    set.push(edge.destination.clone());
                    changed = true;
                }
            }
        }
        set
    }

    /// Remove the instances of `names` from `device` into `moving`, returning
    /// the CPU load removed.
    fn take(
        &mut self,
        app: &Application,
        device: DeviceId,
        names: &[String],
        moving: &mut BTreeMap<String, Vec<PlacementSlot>>,
    ) -> u64 {
        let Some(ledger) = self.ledger.get_mut(&device) else {
            return 0;
        };
        let mut removed = 0;
        for name in names {
            if let Some(slots) = ledger.instances.remove(name) {
                let load = slots.len() as u64 * app.mips_of(name);
                ledger.cpu_load = ledger.cpu_load.saturating_sub(load);
                removed += load;
                moving.entry(name.clone()).or_default().extend(slots);
            }
        }
        removed
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Rollback & output
    // ═══════════════════════════════════════════════════════════════════════

    /// Remove every instance placed for `request`.
    fn rollback(&mut self, app: &Application, request: RequestId) {
        for ledger in self.ledger.values_mut() {
            let mut freed = 0;
            ledger.instances.retain(|name, slots| {
                let before = slots.len();
                slots.retain(|s| s.request != request);
                freed += (before - slots.len()) as u64 * app.mips_of(name);
                !slots.is_empty()
            });
            ledger.cpu_load = ledger.cpu_load.saturating_sub(freed);
        }
    }

    /// Fold every recorded slot back into its request's assignment.
    fn assemble(&self, complete: &BTreeSet<RequestId>) -> PlacementMap {
        let mut placement: PlacementMap = complete.iter().map(|id| (*id, BTreeMap::new())).collect();
        for (device, ledger) in &self.ledger {
            for (name, slots) in &ledger.instances {
                for slot in slots {
                    if let Some(assignment) = placement.get_mut(&slot.request) {
                        assignment.insert(name.clone(), *device);
                    }
                }
            }
        }
        placement
    }
}

impl PlacementAlgorithm for EdgewardPlacement {
    fn name(&self) -> &'static str {
        "edgeward"
    }

    fn run(&mut self, ctx: &PlacementContext<'_>, requests: &[PlacementRequest]) -> PlacementMap {
        self.ledger = ctx
            .domain
            .iter()
            .map(|d| (*d, DeviceLedger::default()))
            .collect();

        let mut complete = BTreeSet::new();
        for path in ctx.topology.leaf_to_root_paths(self.root) {
            let Some(&leaf) = path.first() else {
                continue;
            };
            for request in requests.iter().filter(|r| r.gateway == leaf) {
                let Some(app) = ctx.applications.get(&request.app_id) else {
                    warn!(request = %request.id, app = %request.app_id, "Unknown application");
                    continue;
                };
                if self.place_request(ctx, &path, request, app) {
                    complete.insert(request.id);
                } else {
                    self.rollback(app, request.id);
                    debug!(request = %request.id, "Request not completely placed, kept for next cycle");
                }
            }
        }

        self.assemble(&complete)
    }

    fn post_processing(&mut self, resources: &mut ResourceSnapshot) {
        for (device, ledger) in std::mem::take(&mut self.ledger) {
            resources.consume_cpu(device, ledger.cpu_load);
        }
    }
}
