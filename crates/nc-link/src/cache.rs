//! Read cache scoped to a single control tick.
//!
//! Each variable is fetched in its own round trip, so without a cache two
//! reads of the same variable inside one tick could disagree. The cache is
//! cleared by [`TickCache::begin_tick`] and owned by the control loop.

use std::collections::{BTreeMap, HashMap};

use crate::error::LinkResult;
use crate::link::PlantLink;
use nc_core::{format_real, parse_real};

/// A plant link plus the values read during the current tick.
#[derive(Debug)]
pub struct TickCache<L> {
    link: L,
    values: HashMap<String, String>,
}

impl<L: PlantLink> TickCache<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            values: HashMap::new(),
        }
    }

    /// Forget everything read during the previous tick.
    pub fn begin_tick(&mut self) {
        self.values.clear();
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Read `variable` as text, once per tick.
    pub fn read_text(&mut self, variable: &str) -> LinkResult<String> {
        if let Some(value) = self.values.get(variable) {
            return Ok(value.clone());
        }
        let value = self.link.read(variable)?;
        self.values.insert(variable.to_string(), value.clone());
        Ok(value)
    }

    /// Read `variable` as a number, once per tick.
    pub fn read_real(&mut self, variable: &str) -> LinkResult<f64> {
        let raw = self.read_text(variable)?;
        Ok(parse_real(&raw, variable)?)
    }

    /// Read `variable` straight from the link, bypassing the cache.
    pub fn read_real_fresh(&mut self, variable: &str) -> LinkResult<f64> {
        let raw = self.link.read(variable)?;
        Ok(parse_real(&raw, variable)?)
    }

    /// Read every variable in `variables` as numbers.
    pub fn read_snapshot<S: AsRef<str>>(
        &mut self,
        variables: &[S],
    ) -> LinkResult<BTreeMap<String, f64>> {
        variables
            .iter()
            .map(|name| {
                let name = name.as_ref();
                Ok((name.to_string(), self.read_real(name)?))
            })
            .collect()
    }

    /// Like [`read_snapshot`](Self::read_snapshot), straight from the link.
    pub fn read_snapshot_fresh<S: AsRef<str>>(
        &mut self,
        variables: &[S],
    ) -> LinkResult<BTreeMap<String, f64>> {
        variables
            .iter()
            .map(|name| {
                let name = name.as_ref();
                Ok((name.to_string(), self.read_real_fresh(name)?))
            })
            .collect()
    }

    /// Write a number. A cached read of the same variable is dropped.
    pub fn write_real(&mut self, variable: &str, value: f64) -> LinkResult<()> {
        self.write_text(variable, &format_real(value))
    }

    /// Write a boolean as `true`/`false`.
    pub fn write_flag(&mut self, variable: &str, value: bool) -> LinkResult<()> {
        self.write_text(variable, if value { "true" } else { "false" })
    }

    fn write_text(&mut self, variable: &str, value: &str) -> LinkResult<()> {
        self.values.remove(variable);
        self.link.write(variable, value)
    }
}
