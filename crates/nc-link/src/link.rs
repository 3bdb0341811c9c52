//! The plant link boundary and an in-memory implementation.

use std::collections::HashMap;

use crate::error::{LinkError, LinkResult};
use nc_core::parse_real;

/// Read/write access to named plant variables.
///
/// Values travel as text; typed parsing happens in [`TickCache`](crate::TickCache).
pub trait PlantLink {
    /// Read the current value of `variable`.
    fn read(&mut self, variable: &str) -> LinkResult<String>;

    /// Set `variable` to `value`.
    fn write(&mut self, variable: &str, value: &str) -> LinkResult<()>;
}

impl<L: PlantLink + ?Sized> PlantLink for Box<L> {
    fn read(&mut self, variable: &str) -> LinkResult<String> {
        (**self).read(variable)
    }

    fn write(&mut self, variable: &str, value: &str) -> LinkResult<()> {
        (**self).write(variable, value)
    }
}

/// In-memory plant.
///
/// Writes land in the same table reads come from, and are also logged in
/// order. An optional clock variable advances by one on every read, so a
/// control loop waiting for a new timestep never blocks.
#[derive(Debug, Clone, Default)]
pub struct MemoryLink {
    values: HashMap<String, String>,
    clock: Option<String>,
    writes: Vec<(String, String)>,
    operations: usize,
    fail_after: Option<usize>,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with_value(mut self, variable: &str, value: impl ToString) -> Self {
        self.set(variable, value);
        self
    }

    /// Make `variable` a clock that ticks forward on each read.
    pub fn with_clock(mut self, variable: &str) -> Self {
        self.clock = Some(variable.to_string());
        self
    }

    /// Fail every operation after the first `operations` succeed.
    pub fn fail_after(mut self, operations: usize) -> Self {
        self.fail_after = Some(operations);
        self
    }

    pub fn set(&mut self, variable: &str, value: impl ToString) {
        self.values.insert(variable.to_string(), value.to_string());
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.values.get(variable).map(String::as_str)
    }

    /// Every write so far, oldest first.
    pub fn writes(&self) -> &[(String, String)] {
        &self.writes
    }

    /// Number of reads and writes attempted so far.
    pub fn operations(&self) -> usize {
        self.operations
    }

    fn check_available(&mut self) -> LinkResult<()> {
        self.operations += 1;
        match self.fail_after {
            Some(limit) if self.operations > limit => Err(LinkError::Unavailable {
                what: format!("injected failure after {limit} operations"),
            }),
            _ => Ok(()),
        }
    }

    fn advance_clock(&mut self, variable: &str) -> LinkResult<String> {
        let current = match self.values.get(variable) {
            Some(raw) => parse_real(raw, variable)?,
            None => 0.0,
        };
        let next = (current + 1.0).to_string();
        self.values.insert(variable.to_string(), next.clone());
        Ok(next)
    }
}

impl PlantLink for MemoryLink {
    fn read(&mut self, variable: &str) -> LinkResult<String> {
        self.check_available()?;
        if self.clock.as_deref() == Some(variable) {
            return self.advance_clock(variable);
        }
        self.values
            .get(variable)
            .cloned()
            .ok_or_else(|| LinkError::Status {
                variable: variable.to_string(),
                status: 404,
                body: "unknown variable".to_string(),
            })
    }

    fn write(&mut self, variable: &str, value: &str) -> LinkResult<()> {
        self.check_available()?;
        self.values.insert(variable.to_string(), value.to_string());
        self.writes.push((variable.to_string(), value.to_string()));
        Ok(())
    }
}
