//! Recipe dispatch from ERP order files to the mock cell

use opcua::types::{StatusCode, Variant};
use plc_link::app;
use plc_link::config::Config;
use plc_link::dispatch::CellNodes;
use plc_link::dispatch::orders::load_orders;
use plc_link::transport::{MockConnector, MockTransport};
use plc_link::Error;
use std::fs;
use std::sync::atomic::AtomicBool;

fn config() -> Config {
    let mut config = Config::default();
    config.dispatch.free_poll_interval_ms = 0;
    config
}

#[test]
fn orders_from_files_are_sent_in_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("order_001.json"),
        r#"{"orders": [{"type": 5, "quantity": 2}, {"type": 12, "quantity": 1}]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("order_002.json"),
        r#"{"orders": [{"type": 10, "quantity": 3}]}"#,
    )
    .unwrap();

    let config = config();
    let cell = CellNodes::new(&config.plc, &config.dispatch.cell);
    let transport = MockTransport::new();
    transport.set_value(&cell.free, Variant::Boolean(true));
    let running = AtomicBool::new(true);

    let orders = load_orders(dir.path()).unwrap();
    let stats = app::run_dispatch(
        &MockConnector::new(transport.clone()),
        &config,
        orders,
        &running,
    )
    .unwrap();

    assert_eq!(stats.sent, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.remaining, 0);
    assert_eq!(transport.disconnect_count(), 1);

    // P5: initial 1, tools 1,2,3
    assert_eq!(transport.value(&cell.entry_piece), Some(Variant::Int16(2)));
    let writes = transport.writes();
    assert_eq!(writes.len(), 8);
    assert_eq!(writes[0].1, Variant::Int16(1));
    assert_eq!(writes[1].1, Variant::Int16(3));
    assert_eq!(writes[2].1, Variant::from(vec![1i16, 2, 3, 0, 0, 0]));
    assert_eq!(
        writes[3].1,
        Variant::from(vec![20_000i64, 20_000, 45_000, 0, 0, 0])
    );

    // P10 via P9 from raw piece 2: tools 6,5
    assert_eq!(writes[4], (cell.entry_piece.clone(), Variant::Int16(2)));
    assert_eq!(writes[5], (cell.steps.clone(), Variant::Int16(2)));
    assert_eq!(
        writes[6],
        (cell.tools.clone(), Variant::from(vec![6i16, 5, 0, 0, 0, 0]))
    );
    assert_eq!(
        writes[7],
        (
            cell.times.clone(),
            Variant::from(vec![15_000i64, 20_000, 0, 0, 0, 0])
        )
    );
}

#[test]
fn failed_free_read_aborts_and_disconnects() {
    let config = config();
    let cell = CellNodes::new(&config.plc, &config.dispatch.cell);
    let transport = MockTransport::new();
    transport.fail_reads(&cell.free, StatusCode::BadNodeIdUnknown);
    let running = AtomicBool::new(true);

    let orders = [plc_link::dispatch::orders::Order {
        piece: 3,
        quantity: 1,
    }]
    .into_iter()
    .collect();
    let result = app::run_dispatch(
        &MockConnector::new(transport.clone()),
        &config,
        orders,
        &running,
    );

    assert!(matches!(result, Err(Error::Read { .. })));
    assert!(transport.writes().is_empty());
    assert_eq!(transport.disconnect_count(), 1);
}

#[test]
fn stopped_before_start_leaves_queue() {
    let config = config();
    let transport = MockTransport::new();
    let running = AtomicBool::new(false);

    let orders = [3u8, 4, 5]
        .into_iter()
        .map(|piece| plc_link::dispatch::orders::Order { piece, quantity: 1 })
        .collect();
    let stats = app::run_dispatch(
        &MockConnector::new(transport.clone()),
        &config,
        orders,
        &running,
    )
    .unwrap();

    assert_eq!(stats.sent, 0);
    assert_eq!(stats.remaining, 3);
    assert!(transport.reads().is_empty());
}

#[test]
fn connect_failure_is_reported() {
    let config = config();
    let transport = MockTransport::new();
    let running = AtomicBool::new(true);

    let result = app::run_dispatch(
        &MockConnector::failing(transport.clone(), StatusCode::BadTcpEndpointUrlInvalid),
        &config,
        Default::default(),
        &running,
    );

    assert!(matches!(result, Err(Error::Connection { .. })));
    assert_eq!(transport.disconnect_count(), 0);
}
