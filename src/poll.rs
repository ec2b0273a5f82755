//! Poll cycle: read every variable, wait, write the incremented value back.
//!
//! ```text
//! loop while running:
//! 1. read each variable, check its runtime type, log it (failure -> zero)
//! 2. sleep for the poll interval
//! 3. write (first variable's value + 1) to every variable
//! ```
//!
//! The shutdown flag is only checked at the top of an iteration, so an
//! interrupt lets the current cycle finish before the loop exits.

use crate::error::Error;
use crate::transport::Transport;
use crate::types::{Sample, VariableRef, variant_type_name};
use log::{error, info};
use opcua::types::StatusCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Result of reading one variable
#[derive(Debug)]
pub struct ReadOutcome {
    pub variable: String,
    pub result: std::result::Result<Sample, Error>,
}

impl ReadOutcome {
    /// Value used by the rest of the cycle: the sample, or zero on failure
    pub fn value_or_zero(&self, variable: &VariableRef) -> Sample {
        match &self.result {
            Ok(sample) => *sample,
            Err(_) => Sample::zero(variable.scalar_type),
        }
    }
}

/// Result of writing one variable
#[derive(Debug)]
pub struct WriteOutcome {
    pub variable: String,
    pub value: Sample,
    pub result: std::result::Result<(), Error>,
}

/// Everything that happened in one iteration
#[derive(Debug)]
pub struct CycleReport {
    pub reads: Vec<ReadOutcome>,
    pub writes: Vec<WriteOutcome>,
}

/// Totals over a run of the poll loop
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub read_errors: u64,
    pub write_errors: u64,
}

impl PollStats {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.read_errors += report.reads.iter().filter(|r| r.result.is_err()).count() as u64;
        self.write_errors += report.writes.iter().filter(|w| w.result.is_err()).count() as u64;
    }
}

/// Value written to every variable: first variable's value (or 0) plus one
pub fn next_write_value(first: Option<Sample>) -> i64 {
    first.map(|s| s.as_i64()).unwrap_or(0) + 1
}

/// Drives the read/wait/write cycle over a transport
pub struct Poller<'a, T: Transport> {
    transport: &'a mut T,
    variables: &'a [VariableRef],
    interval: Duration,
}

impl<'a, T: Transport> Poller<'a, T> {
    pub fn new(transport: &'a mut T, variables: &'a [VariableRef], interval: Duration) -> Self {
        Self {
            transport,
            variables,
            interval,
        }
    }

    /// Run until `running` is cleared or `max_cycles` iterations are done
    pub fn run(&mut self, running: &AtomicBool, max_cycles: Option<u64>) -> PollStats {
        let mut stats = PollStats::default();

        while running.load(Ordering::Relaxed) {
            if max_cycles.is_some_and(|max| stats.cycles >= max) {
                info!("Reached cycle limit ({})", stats.cycles);
                break;
            }
            let report = self.cycle();
            stats.record(&report);
        }

        if !running.load(Ordering::Relaxed) {
            info!("Interrupt received, leaving poll loop");
        }
        info!(
            "Poll loop finished: {} cycles, {} read errors, {} write errors",
            stats.cycles, stats.read_errors, stats.write_errors
        );
        stats
    }

    /// One full iteration: read, wait, write
    pub fn cycle(&mut self) -> CycleReport {
        let reads = self.read_all();

        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }

        let first = self
            .variables
            .first()
            .zip(reads.first())
            .map(|(variable, outcome)| outcome.value_or_zero(variable));
        let writes = self.write_all(next_write_value(first));

        CycleReport { reads, writes }
    }

    /// Read every variable once. Failures are logged and kept in the outcome.
    pub fn read_all(&mut self) -> Vec<ReadOutcome> {
        let variables = self.variables;
        let outcomes: Vec<ReadOutcome> = variables
            .iter()
            .map(|variable| {
                let result = self.read_one(variable);
                match &result {
                    Ok(sample) => {
                        info!("{}: {}", variable.name, sample);
                        info!("{} data type: {}", variable.name, variable.scalar_type);
                    }
                    Err(e) => error!("{}", e),
                }
                ReadOutcome {
                    variable: variable.name.clone(),
                    result,
                }
            })
            .collect();
        info!("");
        outcomes
    }

    fn read_one(&mut self, variable: &VariableRef) -> std::result::Result<Sample, Error> {
        let variant = self
            .transport
            .read_value(&variable.node)
            .map_err(|status| read_error(variable, status))?;

        Sample::from_variant(&variant, variable.scalar_type).ok_or_else(|| Error::TypeMismatch {
            variable: variable.name.clone(),
            expected: variable.scalar_type.name(),
            actual: variant_type_name(&variant),
            status: StatusCode::Good,
        })
    }

    /// Write `value`, cast to each variable's type. Each write is independent.
    pub fn write_all(&mut self, value: i64) -> Vec<WriteOutcome> {
        let variables = self.variables;
        variables
            .iter()
            .map(|variable| {
                let sample = Sample::wrapping_from(variable.scalar_type, value);
                let result = self
                    .transport
                    .write_value(&variable.node, sample.into())
                    .map_err(|status| Error::Write {
                        variable: variable.name.clone(),
                        status,
                    });
                if let Err(e) = &result {
                    error!("{}", e);
                }
                WriteOutcome {
                    variable: variable.name.clone(),
                    value: sample,
                    result,
                }
            })
            .collect()
    }
}

fn read_error(variable: &VariableRef, status: StatusCode) -> Error {
    Error::Read {
        variable: variable.name.clone(),
        status,
    }
}
