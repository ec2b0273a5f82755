//! Recipe dispatch to a work cell
//!
//! Takes production orders from the ERP export, looks up a recipe that
//! produces the ordered piece and hands it to the cell once the cell reports
//! free:
//!
//! ```text
//! for each order:
//! 1. find recipe for order.piece             (none -> skip order)
//! 2. poll <cell>_free until TRUE             (shutdown -> stop)
//! 3. write <cell>_entry_piece     Int16
//!          <cell>_steps           Int16
//!          <cell>_transformations_M  Int16[slots]  tools
//!          <cell>_transformations_T  Int64[slots]  step times in ms
//! ```
//!
//! Unlike the poll loop, any failed read or write here aborts the run.

pub mod orders;
pub mod recipe;

use crate::config::{DispatchConfig, PlcConfig};
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{NodeRef, variant_type_name};
use log::{info, warn};
use opcua::types::{StatusCode, Variant};
use orders::Order;
use recipe::{RecipeBook, RecipePayload};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Symbols of one work cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellNodes {
    pub free: NodeRef,
    pub entry_piece: NodeRef,
    pub steps: NodeRef,
    pub tools: NodeRef,
    pub times: NodeRef,
}

impl CellNodes {
    pub fn new(plc: &PlcConfig, cell: &str) -> Self {
        Self {
            free: plc.symbol(&format!("{}_free", cell)),
            entry_piece: plc.symbol(&format!("{}_entry_piece", cell)),
            steps: plc.symbol(&format!("{}_steps", cell)),
            tools: plc.symbol(&format!("{}_transformations_M", cell)),
            times: plc.symbol(&format!("{}_transformations_T", cell)),
        }
    }
}

/// What happened to one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Recipe written to the cell
    Sent,
    /// No recipe produces the ordered piece
    Skipped,
    /// Shutdown requested while waiting for the cell
    Interrupted,
}

/// Totals over a dispatch run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub sent: usize,
    pub skipped: usize,
    /// Orders left in the queue when the run stopped
    pub remaining: usize,
}

/// Sends recipes for queued orders to one cell
pub struct Dispatcher<'a, T: Transport> {
    transport: &'a mut T,
    cell: String,
    nodes: CellNodes,
    book: RecipeBook,
    slots: usize,
    free_poll_interval: Duration,
}

impl<'a, T: Transport> Dispatcher<'a, T> {
    pub fn new(transport: &'a mut T, plc: &PlcConfig, config: &DispatchConfig) -> Self {
        Self {
            transport,
            cell: config.cell.clone(),
            nodes: CellNodes::new(plc, &config.cell),
            book: RecipeBook::new(config.recipes.clone(), &config.transformations),
            slots: config.max_transformations,
            free_poll_interval: config.free_poll_interval(),
        }
    }

    /// Work through `orders` until the queue is empty or `running` is cleared
    pub fn run(&mut self, mut orders: VecDeque<Order>, running: &AtomicBool) -> Result<DispatchStats> {
        let mut stats = DispatchStats::default();

        while let Some(order) = orders.front().copied() {
            if !running.load(Ordering::Relaxed) {
                break;
            }
            match self.dispatch(&order, running)? {
                DispatchOutcome::Sent => stats.sent += 1,
                DispatchOutcome::Skipped => stats.skipped += 1,
                DispatchOutcome::Interrupted => break,
            }
            orders.pop_front();
        }

        stats.remaining = orders.len();
        info!(
            "Dispatch finished: {} sent, {} skipped, {} remaining",
            stats.sent, stats.skipped, stats.remaining
        );
        Ok(stats)
    }

    /// Handle a single order
    pub fn dispatch(&mut self, order: &Order, running: &AtomicBool) -> Result<DispatchOutcome> {
        info!(
            "Processing order: type={}, quantity={}",
            order.piece, order.quantity
        );

        let Some(recipe) = self.book.find_for(order.piece) else {
            warn!("No defined transformation path for piece type {}", order.piece);
            return Ok(DispatchOutcome::Skipped);
        };
        let payload = recipe.payload(self.slots);

        if !self.wait_until_free(running)? {
            return Ok(DispatchOutcome::Interrupted);
        }

        self.send(&payload)?;
        info!(
            "Sent recipe: P{} -> initial {}, {} steps",
            order.piece, payload.entry_piece, payload.steps
        );
        Ok(DispatchOutcome::Sent)
    }

    /// Poll the free flag. Returns `false` if shutdown was requested first.
    fn wait_until_free(&mut self, running: &AtomicBool) -> Result<bool> {
        loop {
            if self.cell_free()? {
                return Ok(true);
            }
            if !running.load(Ordering::Relaxed) {
                return Ok(false);
            }
            info!("Waiting for {} to be free...", self.cell);
            if !self.free_poll_interval.is_zero() {
                std::thread::sleep(self.free_poll_interval);
            }
        }
    }

    fn cell_free(&mut self) -> Result<bool> {
        let variable = format!("{}_free", self.cell);
        match self.transport.read_value(&self.nodes.free) {
            Ok(Variant::Boolean(free)) => Ok(free),
            Ok(other) => Err(Error::TypeMismatch {
                variable,
                expected: "Boolean",
                actual: variant_type_name(&other),
                status: StatusCode::Good,
            }),
            Err(status) => Err(Error::Read { variable, status }),
        }
    }

    fn send(&mut self, payload: &RecipePayload) -> Result<()> {
        let nodes = self.nodes.clone();
        self.write(&nodes.entry_piece, Variant::Int16(payload.entry_piece))?;
        self.write(&nodes.steps, Variant::Int16(payload.steps))?;
        self.write(&nodes.tools, Variant::from(payload.tools.clone()))?;
        log::debug!("Step times (ms): {:?}", payload.times_ms);
        self.write(&nodes.times, Variant::from(payload.times_ms.clone()))
    }

    fn write(&mut self, node: &NodeRef, value: Variant) -> Result<()> {
        self.transport
            .write_value(node, value)
            .map_err(|status| Error::Write {
                variable: node.identifier.clone(),
                status,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use opcua::types::StatusCode;

    fn config() -> (PlcConfig, DispatchConfig) {
        let dispatch = DispatchConfig {
            free_poll_interval_ms: 0,
            ..DispatchConfig::default()
        };
        (PlcConfig::default(), dispatch)
    }

    #[test]
    fn test_cell_nodes() {
        let nodes = CellNodes::new(&PlcConfig::default(), "C1");
        assert_eq!(
            nodes.free.to_string(),
            "ns=4;s=|var|CODESYS Control Win V3 x64.Application.GVL.C1_free"
        );
        assert!(nodes.times.identifier.ends_with("GVL.C1_transformations_T"));
    }

    #[test]
    fn test_unknown_piece_is_skipped_without_io() {
        let (plc, dispatch) = config();
        let mut transport = MockTransport::new();
        let running = AtomicBool::new(true);

        let outcome = Dispatcher::new(&mut transport, &plc, &dispatch)
            .dispatch(&Order { piece: 42, quantity: 1 }, &running)
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert!(transport.reads().is_empty());
        assert!(transport.writes().is_empty());
    }

    #[test]
    fn test_waits_for_free_then_sends() {
        let (plc, dispatch) = config();
        let nodes = CellNodes::new(&plc, "C1");
        let mut transport = MockTransport::new();
        transport.push_read(&nodes.free, Ok(Variant::Boolean(false)));
        transport.push_read(&nodes.free, Ok(Variant::Boolean(false)));
        transport.set_value(&nodes.free, Variant::Boolean(true));
        let running = AtomicBool::new(true);

        let outcome = Dispatcher::new(&mut transport, &plc, &dispatch)
            .dispatch(&Order { piece: 4, quantity: 1 }, &running)
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(transport.reads().len(), 3);
        let writes = transport.writes();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0], (nodes.entry_piece.clone(), Variant::Int16(1)));
        assert_eq!(writes[1], (nodes.steps.clone(), Variant::Int16(2)));
        assert_eq!(writes[2].1, Variant::from(vec![1i16, 2, 0, 0, 0, 0]));
        assert_eq!(
            writes[3].1,
            Variant::from(vec![20_000i64, 20_000, 0, 0, 0, 0])
        );
    }

    #[test]
    fn test_shutdown_while_waiting() {
        let (plc, dispatch) = config();
        let nodes = CellNodes::new(&plc, "C1");
        let mut transport = MockTransport::new();
        transport.set_value(&nodes.free, Variant::Boolean(false));
        let running = AtomicBool::new(false);

        let outcome = Dispatcher::new(&mut transport, &plc, &dispatch)
            .dispatch(&Order { piece: 3, quantity: 1 }, &running)
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Interrupted);
        assert!(transport.writes().is_empty());
    }

    #[test]
    fn test_free_flag_type_checked() {
        let (plc, dispatch) = config();
        let nodes = CellNodes::new(&plc, "C1");
        let mut transport = MockTransport::new();
        transport.set_value(&nodes.free, Variant::Int16(1));
        let running = AtomicBool::new(true);

        let result = Dispatcher::new(&mut transport, &plc, &dispatch)
            .dispatch(&Order { piece: 3, quantity: 1 }, &running);

        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_write_failure_aborts() {
        let (plc, dispatch) = config();
        let nodes = CellNodes::new(&plc, "C1");
        let mut transport = MockTransport::new();
        transport.set_value(&nodes.free, Variant::Boolean(true));
        transport.fail_writes(&nodes.steps, StatusCode::BadNotWritable);
        let running = AtomicBool::new(true);

        let result = Dispatcher::new(&mut transport, &plc, &dispatch)
            .dispatch(&Order { piece: 3, quantity: 1 }, &running);

        match result {
            Err(Error::Write { status, .. }) => assert_eq!(status, StatusCode::BadNotWritable),
            other => panic!("expected write error, got {:?}", other),
        }
        // entry_piece and the failed steps write; arrays never sent
        assert_eq!(transport.writes().len(), 2);
    }
}
