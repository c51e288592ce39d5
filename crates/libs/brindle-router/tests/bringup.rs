use std::time::Duration;

use brindle_router::{BorderRouter, Event, InterfaceState, RouterConfig, RouterStatus};
use brindle_stack::{DriverId, InterfaceKind, SimOptions, SimStack};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

const CONFIG: &str = r#"
[mesh]
network_name = "bringup-net"
extended_pan_id = "000db80000000000"
pan_id = 0x0700
channel = 22
channel_mask = 0x07fff800
master_key = "00112233445566778899aabbccddeeff"
pskc = "c8a62eae1e4c4b93a21d71bb35bebd02"
pskd = "BRINGUP1"
mesh_local_prefix = "fd00:db8::"

[backhaul]
bootstrap = "static"
prefix = "2001:db8:0:1::"
default_route = "::/0"
next_hop = "::"
"#;

fn spawn_router(
    options: SimOptions,
) -> (
    tokio::task::JoinHandle<BorderRouter<SimStack>>,
    watch::Receiver<RouterStatus>,
    mpsc::UnboundedSender<Event>,
    CancellationToken,
) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
    let config = RouterConfig::from_toml(CONFIG).expect("config parses");
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let router = BorderRouter::new(&config, SimStack::new(options), tx.clone(), cancel.clone())
        .expect("router builds");
    let status = router.status();
    let task = tokio::spawn(router.run(rx));
    (task, status, tx, cancel)
}

async fn wait_until(
    status: &mut watch::Receiver<RouterStatus>,
    check: impl FnMut(&RouterStatus) -> bool,
) -> RouterStatus {
    *tokio::time::timeout(Duration::from_secs(5), status.wait_for(check))
        .await
        .expect("status change within deadline")
        .expect("status channel open")
}

#[tokio::test]
async fn cold_boot_reaches_connected_on_both_sides() {
    let options = SimOptions { link_present: true, ..SimOptions::default() };
    let (task, mut status, _tx, cancel) = spawn_router(options);

    let snapshot = wait_until(&mut status, |s| s.fully_connected()).await;
    assert_eq!(snapshot.mesh_state, InterfaceState::Connected);
    assert_eq!(snapshot.backhaul_state, InterfaceState::Connected);
    assert!(snapshot.backhaul_address.is_some());

    cancel.cancel();
    let router = task.await.expect("router task joins");

    let sim = router.stack();
    assert_eq!(sim.radio_macs_created(), 1);
    assert_eq!(sim.ethernet_macs_created(), 1);
    assert_eq!(sim.management_inits().len(), 1);
    assert_eq!(sim.routes().len(), 1);
    assert_eq!(sim.advertised_prefixes().len(), 1);

    let mesh_iface = snapshot.mesh_iface.expect("mesh interface");
    let backhaul_iface = snapshot.backhaul_iface.expect("backhaul interface");
    assert_eq!(sim.metric_for(mesh_iface), Some(1000));
    assert_eq!(sim.metric_for(backhaul_iface), Some(0));
    assert_eq!(sim.link_timeouts(), [(mesh_iface, 100)]);
    assert_eq!(sim.child_caps(), [(mesh_iface, 32)]);
}

#[tokio::test]
async fn uplink_flap_recovers_without_a_second_mac() {
    let options = SimOptions { link_present: true, ..SimOptions::default() };
    let (task, mut status, tx, cancel) = spawn_router(options);

    let first = wait_until(&mut status, |s| s.fully_connected()).await;
    let first_iface = first.backhaul_iface.expect("backhaul interface");

    tx.send(Event::BackhaulPhyDown(DriverId(3))).expect("queue open");
    wait_until(&mut status, |s| s.backhaul_state == InterfaceState::Disconnected).await;

    tx.send(Event::BackhaulPhyUp(DriverId(3))).expect("queue open");
    let second = wait_until(&mut status, |s| s.fully_connected()).await;
    let second_iface = second.backhaul_iface.expect("backhaul interface");
    assert_ne!(first_iface, second_iface);
    // The mesh side never noticed the uplink flap.
    assert_eq!(second.mesh_iface, first.mesh_iface);

    cancel.cancel();
    let router = task.await.expect("router task joins");
    let sim = router.stack();
    assert_eq!(sim.ethernet_macs_created(), 1);
    let backhaul_interfaces = sim
        .interfaces()
        .iter()
        .filter(|entry| entry.kind == InterfaceKind::Backhaul)
        .count();
    assert_eq!(backhaul_interfaces, 2);
}

#[tokio::test]
async fn missing_radio_does_not_block_the_backhaul() {
    let options =
        SimOptions { link_present: true, radio_present: false, ..SimOptions::default() };
    let (task, mut status, _tx, cancel) = spawn_router(options);

    let snapshot =
        wait_until(&mut status, |s| s.backhaul_state == InterfaceState::Connected).await;
    assert_eq!(snapshot.mesh_state, InterfaceState::Unknown);
    assert_eq!(snapshot.mesh_iface, None);

    cancel.cancel();
    let router = task.await.expect("router task joins");
    assert_eq!(router.stack().radio_macs_created(), 0);
    assert!(router.registry().interface(InterfaceKind::Mesh).is_none());
}

#[tokio::test]
async fn cancellation_stops_the_run_loop() {
    let (task, mut status, _tx, cancel) = spawn_router(SimOptions::default());
    wait_until(&mut status, |s| s.mesh_state == InterfaceState::Connected).await;

    cancel.cancel();
    let router = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("run loop exits after cancel")
        .expect("router task joins");
    // No link ever came up, so the uplink never left disconnected.
    assert_eq!(router.backhaul().iface(), None);
}
