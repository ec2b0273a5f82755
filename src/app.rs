//! Application orchestration for plc-link
//!
//! Opens the session, runs one operating mode on it and closes the session
//! again on every exit path.

use crate::config::Config;
use crate::dispatch::orders::Order;
use crate::dispatch::{DispatchStats, Dispatcher};
use crate::error::Result;
use crate::poll::{PollStats, Poller, ReadOutcome};
use crate::session::Session;
use crate::transport::Connector;
use log::info;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;

/// Poll and write back until `running` is cleared or `max_cycles` is reached
pub fn run_poll<C: Connector>(
    connector: &C,
    config: &Config,
    running: &AtomicBool,
    max_cycles: Option<u64>,
) -> Result<PollStats> {
    let variables = config.variables();
    let mut session = Session::connect(connector, &config.server)?;
    info!(
        "Polling {} variables every {} ms",
        variables.len(),
        config.poll.interval_ms
    );

    let stats =
        Poller::new(session.transport(), &variables, config.poll.interval()).run(running, max_cycles);

    session.close();
    Ok(stats)
}

/// One read-only pass over the configured variables
pub fn run_read<C: Connector>(connector: &C, config: &Config) -> Result<Vec<ReadOutcome>> {
    let variables = config.variables();
    let mut session = Session::connect(connector, &config.server)?;

    let outcomes = Poller::new(session.transport(), &variables, config.poll.interval()).read_all();

    session.close();
    Ok(outcomes)
}

/// Send recipes for `orders` to the configured cell
pub fn run_dispatch<C: Connector>(
    connector: &C,
    config: &Config,
    orders: VecDeque<Order>,
    running: &AtomicBool,
) -> Result<DispatchStats> {
    info!("Loaded {} orders", orders.len());
    let mut session = Session::connect(connector, &config.server)?;

    // On error the session is closed when it drops.
    let stats = Dispatcher::new(session.transport(), &config.plc, &config.dispatch)
        .run(orders, running)?;

    session.close();
    Ok(stats)
}
