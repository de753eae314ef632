//! Device and application fixtures.
//!
//! Device ids are fixed so tests can name them directly:
//!
//! ```text
//! three tier:      cloud(0) ── fon(1) ── client(2) [, client_b(3)]
//! clustered:       cloud(0) ── proxy(1) ── gw-i(10+i) ── client-i-j(100+i*n+j)
//! ```

use fogmesh_types::{
    AppEdge, AppId, Application, Applications, DeviceId, DeviceRole, DeviceSpec, Direction,
    Resources, Selectivity, UserId,
};
use std::sync::Arc;
use std::time::Duration;

pub const CLOUD: DeviceId = DeviceId(0);
pub const FON: DeviceId = DeviceId(1);
pub const CLIENT: DeviceId = DeviceId(2);
pub const CLIENT_B: DeviceId = DeviceId(3);
pub const PROXY: DeviceId = DeviceId(1);

/// Name prefix shared by gateway devices of the clustered topology.
pub const GATEWAY_LEVEL: &str = "gw";

pub const APP: &str = "app";
pub const CLIENT_MODULE: &str = "client";
pub const SERVICE: &str = "service";
pub const SENSOR_TYPE: &str = "SENSOR";
pub const ACTUATOR_TYPE: &str = "DISPLAY";

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

// ═══════════════════════════════════════════════════════════════════════
// Topologies
// ═══════════════════════════════════════════════════════════════════════

/// CLOUD (10000 MIPS) ← FON (`fon_mips`) ← CLIENT.
pub fn three_tier_devices(fon_mips: u64) -> Vec<DeviceSpec> {
    vec![
        DeviceSpec::new(CLOUD, "cloud", DeviceRole::Cloud, Resources::new(10_000, 40_000, 100_000)),
        DeviceSpec::new(FON, "fon", DeviceRole::Fon, Resources::new(fon_mips, 4_000, 10_000))
            .with_parent(CLOUD, ms(100)),
        DeviceSpec::new(CLIENT, "client", DeviceRole::Client, Resources::new(500, 1_000, 1_000))
            .with_parent(FON, ms(2)),
    ]
}

/// Three tier topology with a second client below the FON.
pub fn two_client_devices(fon_mips: u64) -> Vec<DeviceSpec> {
    let mut devices = three_tier_devices(fon_mips);
    devices.push(
        DeviceSpec::new(CLIENT_B, "client-b", DeviceRole::Client, Resources::new(500, 1_000, 1_000))
            .with_parent(FON, ms(2)),
    );
    devices
}

/// Cloud → proxy FON → `gateways` FCN gateways → `clients_per_gateway`
/// clients each. Gateways are named `gw-<i>` so they match [`GATEWAY_LEVEL`].
pub fn clustered_devices(gateways: u32, clients_per_gateway: u32) -> Vec<DeviceSpec> {
    let mut devices = vec![
        DeviceSpec::new(CLOUD, "cloud", DeviceRole::Cloud, Resources::new(100_000, 40_000, 100_000)),
        DeviceSpec::new(PROXY, "proxy", DeviceRole::Fon, Resources::new(4_000, 4_000, 10_000))
            .with_parent(CLOUD, ms(100)),
    ];
    for (i, gw) in gateway_ids(gateways).into_iter().enumerate() {
        devices.push(
            DeviceSpec::new(gw, format!("gw-{i}"), DeviceRole::Fcn, Resources::new(2_000, 2_000, 4_000))
                .with_parent(PROXY, ms(4)),
        );
    }
    for (gw_index, gw) in gateway_ids(gateways).into_iter().enumerate() {
        for j in 0..clients_per_gateway {
            let id = client_id(gw_index as u32, clients_per_gateway, j);
            devices.push(
                DeviceSpec::new(
                    id,
                    format!("client-{gw_index}-{j}"),
                    DeviceRole::Client,
                    Resources::new(500, 1_000, 1_000),
                )
                .with_parent(gw, ms(2)),
            );
        }
    }
    devices
}

/// Gateway ids of [`clustered_devices`].
pub fn gateway_ids(gateways: u32) -> Vec<DeviceId> {
    (0..gateways).map(|i| DeviceId(10 + i)).collect()
}

/// Client ids of [`clustered_devices`], grouped by gateway.
pub fn client_ids(gateways: u32, clients_per_gateway: u32) -> Vec<DeviceId> {
    (0..gateways)
        .flat_map(|g| (0..clients_per_gateway).map(move |j| client_id(g, clients_per_gateway, j)))
        .collect()
}

fn client_id(gateway: u32, clients_per_gateway: u32, j: u32) -> DeviceId {
    DeviceId(100 + gateway * clients_per_gateway + j)
}

// ═══════════════════════════════════════════════════════════════════════
// Applications
// ═══════════════════════════════════════════════════════════════════════

/// `SENSOR → client → service → client → DISPLAY`.
pub fn single_service_app(id: &str, service_mips: u64) -> Application {
    chain_app(id, &[(SERVICE, service_mips)])
}

/// `SENSOR → client → m1 → … → mN` over UP edges, `mN → client` DOWN and
/// `client → DISPLAY`. Every edge emits with selectivity 1.0. One loop
/// covers the whole chain.
pub fn chain_app(id: &str, chain: &[(&str, u64)]) -> Application {
    let mut app = Application::new(id, UserId(1));
    app.add_microservice(CLIENT_MODULE, 1_000);
    for (name, mips) in chain {
        app.add_microservice(*name, *mips);
    }

    app.add_edge(AppEdge::sensor(SENSOR_TYPE, CLIENT_MODULE, 1_000, 2_000));
    app.add_selectivity(CLIENT_MODULE, SENSOR_TYPE, "RAW", Selectivity::Fractional(1.0));

    let mut previous: (&str, String) = (CLIENT_MODULE, "RAW".to_owned());
    for &(name, _) in chain {
        app.add_edge(AppEdge::module(
            previous.0,
            name,
            previous.1.clone(),
            Direction::Up,
            2_000,
            1_000,
        ));
        let output = format!("{}_OUT", name.to_ascii_uppercase());
        app.add_selectivity(name, &previous.1, output.clone(), Selectivity::Fractional(1.0));
        previous = (name, output);
    }

    // Last stage answers the client.
    app.add_edge(AppEdge::module(
        previous.0,
        CLIENT_MODULE,
        previous.1.clone(),
        Direction::Down,
        500,
        500,
    ));
    app.add_edge(AppEdge::actuator(CLIENT_MODULE, ACTUATOR_TYPE, "SHOW", 100, 100));
    app.add_selectivity(CLIENT_MODULE, &previous.1, "SHOW", Selectivity::Fractional(1.0));

    let mut modules = vec![SENSOR_TYPE.to_owned(), CLIENT_MODULE.to_owned()];
    modules.extend(chain.iter().map(|(n, _)| n.to_string()));
    modules.push(CLIENT_MODULE.to_owned());
    modules.push(ACTUATOR_TYPE.to_owned());
    app.add_loop(modules);

    app
}

/// Registry from a list of applications.
pub fn applications(apps: impl IntoIterator<Item = Application>) -> Applications {
    apps.into_iter()
        .map(|app| (AppId::new(app.id.as_str()), Arc::new(app)))
        .collect()
}
