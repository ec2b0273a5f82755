//! Mock transport for testing
//!
//! Holds an in-memory address space. Reads can be scripted per node, writes are
//! recorded (and applied to the stored value), and disconnects are counted.

use super::{Connector, Transport};
use crate::config::ServerConfig;
use crate::types::NodeRef;
use opcua::types::{StatusCode, Variant};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type CallResult<T> = std::result::Result<T, StatusCode>;

/// Mock transport for unit testing
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    values: HashMap<NodeRef, Variant>,
    scripted_reads: HashMap<NodeRef, VecDeque<CallResult<Variant>>>,
    read_failures: HashMap<NodeRef, StatusCode>,
    write_failures: HashMap<NodeRef, StatusCode>,
    reads: Vec<NodeRef>,
    writes: Vec<(NodeRef, Variant)>,
    disconnects: usize,
    stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl MockTransport {
    /// Create a new mock transport with an empty address space
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stored value of a node
    pub fn set_value(&self, node: &NodeRef, value: Variant) {
        self.inner.lock().values.insert(node.clone(), value);
    }

    /// Current stored value of a node
    pub fn value(&self, node: &NodeRef) -> Option<Variant> {
        self.inner.lock().values.get(node).cloned()
    }

    /// Queue a one-shot read result, consumed before the stored value
    pub fn push_read(&self, node: &NodeRef, result: CallResult<Variant>) {
        self.inner
            .lock()
            .scripted_reads
            .entry(node.clone())
            .or_default()
            .push_back(result);
    }

    /// Make every read of `node` fail with `status`
    pub fn fail_reads(&self, node: &NodeRef, status: StatusCode) {
        self.inner.lock().read_failures.insert(node.clone(), status);
    }

    /// Make every write to `node` fail with `status`
    pub fn fail_writes(&self, node: &NodeRef, status: StatusCode) {
        self.inner.lock().write_failures.insert(node.clone(), status);
    }

    /// Clear `running` once `writes` writes have been attempted.
    ///
    /// Simulates a shutdown signal arriving mid-iteration.
    pub fn stop_after_writes(&self, writes: usize, running: Arc<AtomicBool>) {
        self.inner.lock().stop_after = Some((writes, running));
    }

    /// Nodes read so far, in order
    pub fn reads(&self) -> Vec<NodeRef> {
        self.inner.lock().reads.clone()
    }

    /// Write attempts so far, in order (including failed ones)
    pub fn writes(&self) -> Vec<(NodeRef, Variant)> {
        self.inner.lock().writes.clone()
    }

    /// Number of `disconnect` calls
    pub fn disconnect_count(&self) -> usize {
        self.inner.lock().disconnects
    }
}

impl Transport for MockTransport {
    fn read_value(&mut self, node: &NodeRef) -> CallResult<Variant> {
        let mut inner = self.inner.lock();
        inner.reads.push(node.clone());

        if let Some(result) = inner
            .scripted_reads
            .get_mut(node)
            .and_then(|queue| queue.pop_front())
        {
            return result;
        }
        if let Some(status) = inner.read_failures.get(node) {
            return Err(*status);
        }
        inner
            .values
            .get(node)
            .cloned()
            .ok_or(StatusCode::BadNodeIdUnknown)
    }

    fn write_value(&mut self, node: &NodeRef, value: Variant) -> CallResult<()> {
        let mut inner = self.inner.lock();
        inner.writes.push((node.clone(), value.clone()));

        if let Some((limit, running)) = &inner.stop_after {
            if inner.writes.len() >= *limit {
                running.store(false, Ordering::Relaxed);
            }
        }

        if let Some(status) = inner.write_failures.get(node) {
            return Err(*status);
        }
        inner.values.insert(node.clone(), value);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.inner.lock().disconnects += 1;
    }
}

/// Connector handing out a shared [`MockTransport`]
#[derive(Clone, Default)]
pub struct MockConnector {
    transport: MockTransport,
    failure: Option<StatusCode>,
}

impl MockConnector {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            failure: None,
        }
    }

    /// Connector whose handshake always fails with `status`
    pub fn failing(transport: MockTransport, status: StatusCode) -> Self {
        Self {
            transport,
            failure: Some(status),
        }
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&self, _server: &ServerConfig) -> CallResult<MockTransport> {
        match self.failure {
            Some(status) => Err(status),
            None => Ok(self.transport.clone()),
        }
    }
}
