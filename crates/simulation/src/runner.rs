//! Deterministic simulation runner.
//!
//! Devices are state machines; the runner owns time, the event queue,
//! sensors and actuators, and runs hosted instances inline: an `Execute`
//! action completes after `cpu_length / mips` and its resultant messages are
//! re-injected at the executing device.

use crate::event_queue::{EventKey, Scheduled};
use crate::{ActuatorSpec, SensorSpec, SetupError, SimulationConfig, SimulationStats};
use fogmesh_core::{Action, Event, StateMachine, TimerId};
use fogmesh_node::{AttachedActuator, DeviceStateMachine};
use fogmesh_topology::Topology;
use fogmesh_types::{
    ActuatorId, Application, Applications, DeviceId, InstanceId, Message, MessageId,
    PlacementRequest, RequestId, SensorId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Deterministic simulation runner.
///
/// Processes events in deterministic order and executes actions.
/// Given the same seed, produces identical results every run.
pub struct SimulationRunner {
    topology: Arc<Topology>,
    applications: Applications,

    /// One state machine per device, keyed by id.
    devices: BTreeMap<DeviceId, DeviceStateMachine>,

    sensors: BTreeMap<SensorId, SensorSpec>,
    actuators: BTreeMap<ActuatorId, ActuatorSpec>,

    /// Global event queue, ordered deterministically.
    event_queue: BTreeMap<EventKey, Scheduled>,

    /// Sequence counter for deterministic ordering.
    sequence: u64,

    /// Current simulation time.
    now: Duration,

    /// RNG for selectivity draws (seeded for determinism).
    rng: ChaCha8Rng,

    /// Last message id handed out.
    last_message: u64,

    stats: SimulationStats,

    initialized: bool,
}

impl std::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("devices", &self.devices.len())
            .field("sensors", &self.sensors.len())
            .field("actuators", &self.actuators.len())
            .field("pending_events", &self.event_queue.len())
            .field("now", &self.now)
            .finish()
    }
}

impl SimulationRunner {
    /// Create a runner with one state machine per device of `topology`.
    pub fn new(
        topology: Topology,
        applications: impl IntoIterator<Item = Application>,
        config: SimulationConfig,
        seed: u64,
    ) -> Result<Self, SetupError> {
        let topology = Arc::new(topology);
        let applications: Applications = applications
            .into_iter()
            .map(|app| (app.id.clone(), Arc::new(app)))
            .collect();

        let mut devices = BTreeMap::new();
        for spec in topology.devices() {
            let machine = DeviceStateMachine::new(
                spec.id,
                topology.clone(),
                applications.clone(),
                &config.node,
                config.strategy,
            )?;
            devices.insert(spec.id, machine);
        }

        info!(
            devices = devices.len(),
            applications = applications.len(),
            strategy = %config.strategy,
            seed,
            "Simulation created"
        );

        Ok(Self {
            topology,
            applications,
            devices,
            sensors: BTreeMap::new(),
            actuators: BTreeMap::new(),
            event_queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_message: 0,
            stats: SimulationStats::default(),
            initialized: false,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Setup
    // ═══════════════════════════════════════════════════════════════════════

    /// Attach a sensor to its gateway and register the application's client
    /// module there.
    pub fn add_sensor(&mut self, spec: SensorSpec) -> Result<(), SetupError> {
        if self.sensors.contains_key(&spec.id) {
            return Err(SetupError::DuplicateSensor(spec.id));
        }
        if spec.interval.is_zero() {
            return Err(SetupError::ZeroInterval(spec.id));
        }
        let app = self
            .applications
            .get(&spec.app_id)
            .ok_or_else(|| SetupError::UnknownApplication(spec.app_id.clone()))?;
        if app.sensor_edge(&spec.tuple_type).is_none() {
            return Err(SetupError::UnknownSensorType {
                app: spec.app_id.clone(),
                tuple_type: spec.tuple_type.clone(),
            });
        }
        let gateway = self
            .devices
            .get_mut(&spec.gateway)
            .ok_or(SetupError::UnknownDevice(spec.gateway))?;
        if self.topology.orchestrator_for(spec.gateway).is_none() {
            return Err(SetupError::NoOrchestrator(spec.gateway));
        }
        gateway.register_client_module(&spec.app_id)?;

        debug!(sensor = ?spec.id, gateway = %spec.gateway, app = %spec.app_id, "Sensor attached");
        self.sensors.insert(spec.id, spec);
        Ok(())
    }

    pub fn add_actuator(&mut self, spec: ActuatorSpec) -> Result<(), SetupError> {
        if self.actuators.contains_key(&spec.id) {
            return Err(SetupError::DuplicateActuator(spec.id));
        }
        if !self.applications.contains_key(&spec.app_id) {
            return Err(SetupError::UnknownApplication(spec.app_id.clone()));
        }
        let device = self
            .devices
            .get_mut(&spec.device)
            .ok_or(SetupError::UnknownDevice(spec.device))?;
        device.attach_actuator(AttachedActuator {
            id: spec.id,
            app_id: spec.app_id.clone(),
            actuator_type: spec.actuator_type.clone(),
        });

        debug!(actuator = ?spec.id, device = %spec.device, app = %spec.app_id, "Actuator attached");
        self.actuators.insert(spec.id, spec);
        Ok(())
    }

    /// Schedule the start of the simulation.
    ///
    /// Devices run their start-up actions, every sensor submits one
    /// placement request to the orchestrator of its gateway, and the first
    /// sensor emissions are scheduled one interval in. Called by
    /// [`run_until`](Self::run_until) if not done explicitly.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let ids: Vec<DeviceId> = self.devices.keys().copied().collect();
        for id in ids {
            let actions = match self.devices.get_mut(&id) {
                Some(device) => device.initialize(),
                None => continue,
            };
            for action in actions {
                self.process_action(id, action);
            }
        }

        let sensors: Vec<SensorSpec> = self.sensors.values().cloned().collect();
        for sensor in &sensors {
            let Some(app) = self.applications.get(&sensor.app_id) else {
                continue;
            };
            if let Some(orchestrator) = self.topology.orchestrator_for(sensor.gateway) {
                let request =
                    PlacementRequest::new(RequestId(sensor.id.0), sensor.app_id.clone(), sensor.gateway)
                        .with_placed(app.client_module.clone(), sensor.gateway);
                self.schedule_event(
                    orchestrator,
                    self.now,
                    Event::PlacementRequestSubmitted { request },
                );
            }
            self.schedule_event(
                sensor.gateway,
                self.now + sensor.interval,
                Scheduled::SensorTick { sensor: sensor.id },
            );
        }

        info!(
            sensors = sensors.len(),
            actuators = self.actuators.len(),
            "Simulation initialized"
        );
    }

    /// Schedule an event for a device at `delay` from now.
    pub fn schedule_initial_event(&mut self, device: DeviceId, delay: Duration, event: Event) {
        let time = self.now + delay;
        self.schedule_event(device, time, event);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn applications(&self) -> &Applications {
        &self.applications
    }

    pub fn device(&self, id: DeviceId) -> Option<&DeviceStateMachine> {
        self.devices.get(&id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceStateMachine> {
        self.devices.values()
    }

    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Event loop
    // ═══════════════════════════════════════════════════════════════════════

    /// Process every event up to and including `end_time`.
    pub fn run_until(&mut self, end_time: Duration) {
        self.initialize();
        trace!(end_time_secs = end_time.as_secs_f64(), "Running simulation step");

        while let Some((&key, _)) = self.event_queue.first_key_value() {
            if key.time > end_time {
                debug!(remaining_events = self.event_queue.len(), "Time limit reached");
                break;
            }
            let Some((key, event)) = self.event_queue.pop_first() else {
                break;
            };
            self.now = key.time;

            trace!(time = ?self.now, device = %key.device, event = event.type_name(), "Processing event");
            self.stats.events_processed += 1;
            self.stats.events_by_priority[event.priority() as usize] += 1;

            // Sensors and execution live in the runner, not the state machine.
            let event = match event {
                Scheduled::Device(event) => event,
                Scheduled::SensorTick { sensor } => {
                    self.on_sensor_tick(sensor);
                    continue;
                }
                Scheduled::ExecutionCompleted { instance, message } => {
                    self.on_execution_completed(instance, *message);
                    continue;
                }
            };

            let Some(device) = self.devices.get_mut(&key.device) else {
                warn!(device = %key.device, "Event for unknown device");
                continue;
            };
            device.set_time(self.now);
            let actions = device.handle(event);
            self.stats.actions_generated += actions.len() as u64;

            for action in actions {
                self.process_action(key.device, action);
            }
        }

        // Always advance time to end_time, even if we ran out of events.
        if self.now < end_time {
            self.now = end_time;
        }

        trace!(
            events_processed = self.stats.events_processed,
            actions_generated = self.stats.actions_generated,
            final_time = ?self.now,
            "Simulation step complete"
        );
    }

    fn process_action(&mut self, from: DeviceId, action: Action) {
        match action {
            Action::Transmit {
                to,
                link,
                message,
                transmission,
                latency,
            } => {
                let bytes = message.size_bytes();
                self.stats.transmissions += 1;
                self.stats.network_usage += latency.as_secs_f64() * bytes as f64;
                fogmesh_metrics::record_network_usage(latency.as_secs_f64(), bytes);
                trace!(from = %from, to = %to, ?link, message = %message.id, "Transmit");
                let arrival = self.now + transmission + latency;
                self.schedule_event(to, arrival, Event::MessageArrived { message });
            }

            Action::Deliver { to, event } => {
                if self.devices.contains_key(&to) {
                    self.schedule_event(to, self.now, event);
                } else {
                    warn!(from = %from, to = %to, event = event.type_name(), "Delivery to unknown device");
                }
            }

            Action::SetTimer { id, duration } => {
                let fire_time = self.now + duration;
                self.schedule_event(from, fire_time, timer_to_event(id));
                self.stats.timers_set += 1;
            }

            Action::EnqueueInternal { event } => {
                self.schedule_event(from, self.now, event);
            }

            Action::Execute { instance, message } => {
                let delay = self.execution_delay(&message);
                self.stats.executions += 1;
                self.stats
                    .cpu_time
                    .entry(message.tuple_type.clone())
                    .or_default()
                    .record(delay);
                fogmesh_metrics::record_execution(&message.tuple_type, delay.as_secs_f64());
                trace!(%instance, message = %message.id, ?delay, "Execute");
                self.schedule_event(
                    instance.device,
                    self.now + delay,
                    Scheduled::ExecutionCompleted { instance, message },
                );
            }

            Action::DeliverToActuator { actuator, message } => {
                self.deliver_to_actuator(actuator, &message);
            }

            Action::RecordDrop { message, reason } => {
                trace!(device = %from, %message, %reason, "Message dropped");
                self.stats.record_drop(reason);
            }

            Action::RecordCloudTraffic { .. } => {
                self.stats.cloud_traffic += 1;
            }
        }
    }

    fn on_sensor_tick(&mut self, sensor: SensorId) {
        let Some(spec) = self.sensors.get(&sensor).cloned() else {
            return;
        };
        let Some(app) = self.applications.get(&spec.app_id).cloned() else {
            return;
        };

        let id = self.next_message_id();
        if let Some(mut message) = app.sensor_message(&spec.tuple_type, id, self.now) {
            message.destination_device = Some(spec.gateway);
            self.stats.sensor_emissions += 1;
            trace!(sensor = ?sensor, message = %id, "Sensor emission");
            self.schedule_event(
                spec.gateway,
                self.now + spec.latency,
                Event::MessageArrived {
                    message: Box::new(message),
                },
            );
        }

        self.schedule_event(spec.gateway, self.now + spec.interval, Scheduled::SensorTick { sensor });
    }

    fn on_execution_completed(&mut self, instance: InstanceId, message: Message) {
        let Some(app) = self.applications.get(&message.app_id).cloned() else {
            return;
        };
        let last = &mut self.last_message;
        let outputs = app.resultant_messages(&message.dest_module, &message, &mut self.rng, || {
            *last += 1;
            MessageId(*last)
        });
        trace!(%instance, input = %message.id, outputs = outputs.len(), "Execution completed");

        for output in outputs {
            self.schedule_event(
                instance.device,
                self.now,
                Event::MessageArrived {
                    message: Box::new(output),
                },
            );
        }
    }

    fn deliver_to_actuator(&mut self, actuator: ActuatorId, message: &Message) {
        let Some(spec) = self.actuators.get(&actuator) else {
            warn!(actuator = ?actuator, "Delivery to unknown actuator");
            return;
        };
        let arrival = self.now + spec.latency;
        self.stats.actuator_deliveries += 1;

        let Some(app) = self.applications.get(&message.app_id) else {
            return;
        };
        let latency = arrival.saturating_sub(message.emitted_at);
        for app_loop in app.loops_ending_at(&spec.actuator_type) {
            self.stats
                .loop_latency
                .entry((app.id.clone(), app_loop.id))
                .or_default()
                .record(latency);
            fogmesh_metrics::record_loop_latency(app_loop.id, latency.as_secs_f64());
        }
    }

    fn execution_delay(&self, message: &Message) -> Duration {
        let mips = self
            .applications
            .get(&message.app_id)
            .map(|app| app.mips_of(&message.dest_module))
            .unwrap_or(0);
        if mips == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(message.cpu_length as f64 / mips as f64)
    }

    fn next_message_id(&mut self) -> MessageId {
        self.last_message += 1;
        MessageId(self.last_message)
    }

    fn schedule_event(
        &mut self,
        device: DeviceId,
        time: Duration,
        event: impl Into<Scheduled>,
    ) -> EventKey {
        let event = event.into();
        self.sequence += 1;
        let key = EventKey::new(time, &event, device, self.sequence);
        self.event_queue.insert(key, event);
        key
    }
}

/// Convert a timer ID to an event.
fn timer_to_event(id: TimerId) -> Event {
    match id {
        TimerId::PlacementCycle => Event::PlacementTimer,
        TimerId::LinkFree(link) => Event::LinkFreed { link },
    }
}
