//! End-of-run report.

use fogmesh_simulation::{SimulationRunner, SimulationStats};
use fogmesh_types::{AppId, DeviceId, DeviceRole};
use std::time::Duration;

/// Microservices hosted on one device at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePlacement {
    pub device: DeviceId,
    pub name: String,
    pub role: DeviceRole,
    /// (application, microservice, instances)
    pub instances: Vec<(AppId, String, usize)>,
}

/// Mean latency of one application loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub app: AppId,
    pub loop_id: u32,
    pub modules: Vec<String>,
    /// `None` when the loop never closed.
    pub mean_secs: Option<f64>,
}

/// Summary of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub seed: u64,
    pub simulated: Duration,
    pub wall_clock: Duration,
    pub stats: SimulationStats,
    pub placements: Vec<DevicePlacement>,
    pub loops: Vec<LoopReport>,
    /// Placement requests still queued at an orchestrator.
    pub pending_requests: usize,
}

impl SimulationReport {
    pub(crate) fn collect(runner: &SimulationRunner, seed: u64, wall_clock: Duration) -> Self {
        let stats = runner.stats().clone();

        let placements = runner
            .devices()
            .filter(|machine| machine.deployment().instance_count() > 0)
            .map(|machine| DevicePlacement {
                device: machine.device(),
                name: runner
                    .topology()
                    .device(machine.device())
                    .map(|spec| spec.name.clone())
                    .unwrap_or_default(),
                role: machine.role(),
                instances: machine
                    .deployment()
                    .placements()
                    .map(|(app, ms, count)| (app.clone(), ms.to_owned(), count))
                    .collect(),
            })
            .collect();

        let mut loops = Vec::new();
        for app in runner.applications().values() {
            for l in app.loops() {
                loops.push(LoopReport {
                    app: app.id.clone(),
                    loop_id: l.id,
                    modules: l.modules.clone(),
                    mean_secs: stats.average_loop_latency(&app.id, l.id),
                });
            }
        }

        let pending_requests = runner
            .devices()
            .filter_map(|machine| machine.orchestrator())
            .map(|orchestrator| orchestrator.pending().len())
            .sum();

        Self {
            seed,
            simulated: runner.now(),
            wall_clock,
            stats,
            placements,
            loops,
            pending_requests,
        }
    }

    /// Instances of `microservice` across all devices.
    pub fn instances_of(&self, app: &AppId, microservice: &str) -> usize {
        self.placements
            .iter()
            .flat_map(|p| &p.instances)
            .filter(|(a, ms, _)| a == app && ms == microservice)
            .map(|(_, _, count)| count)
            .sum()
    }

    pub fn print_summary(&self) {
        let stats = &self.stats;

        println!("\n📊 Simulation Report");
        println!("====================\n");
        println!("  Seed: {}", self.seed);
        println!("  Simulated time: {:.3}s", self.simulated.as_secs_f64());
        println!("  Wall clock: {:.3}s", self.wall_clock.as_secs_f64());
        println!("  Events processed: {}", stats.events_processed);
        println!("  Actions generated: {}", stats.actions_generated);

        println!("\n📨 Messages:");
        println!("  Sensor emissions: {}", stats.sensor_emissions);
        println!("  Transmissions: {}", stats.transmissions);
        println!("  Executions: {}", stats.executions);
        println!("  Actuator deliveries: {}", stats.actuator_deliveries);
        println!("  Cloud traffic: {}", stats.cloud_traffic);
        println!("  Network usage: {:.3}", stats.network_usage);
        println!("  Dropped: {}", stats.messages_dropped());
        for (reason, count) in &stats.drops {
            println!("    {reason}: {count}");
        }

        println!("\n🗺️  Placements:");
        if self.placements.is_empty() {
            println!("  (none)");
        }
        for placement in &self.placements {
            println!(
                "  {} [{}] ({})",
                placement.name, placement.device, placement.role
            );
            for (app, ms, count) in &placement.instances {
                println!("    {app}/{ms} x{count}");
            }
        }
        if self.pending_requests > 0 {
            println!("  ⚠️  {} placement request(s) still pending", self.pending_requests);
        }

        println!("\n⏱️  Loops:");
        for l in &self.loops {
            match l.mean_secs {
                Some(mean) => println!(
                    "  {} #{} [{}]: {:.3}s",
                    l.app,
                    l.loop_id,
                    l.modules.join(" → "),
                    mean
                ),
                None => println!(
                    "  {} #{} [{}]: never closed",
                    l.app,
                    l.loop_id,
                    l.modules.join(" → ")
                ),
            }
        }

        if !stats.cpu_time.is_empty() {
            println!("\n⚙️  CPU time per tuple type:");
            for (tuple_type, average) in &stats.cpu_time {
                if let Some(mean) = average.mean_secs() {
                    println!("  {tuple_type}: {mean:.3}s");
                }
            }
        }
        println!();
    }
}
