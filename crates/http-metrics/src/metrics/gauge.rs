//! Gauges.

use super::{existing_series, family_error, label_names, series};
use crate::errors::Result;
use crate::labels::{LabelSchema, NoLabels};
use crate::registry::MetricsRegistry;
use prometheus::{GaugeVec, Opts};
use std::fmt;
use std::marker::PhantomData;

/// Gauge family keyed by label schema `L`.
///
/// In-flight gauges must be decremented with exactly the labels they were
/// incremented with; keep the label value around for the whole operation.
pub struct Gauge<L: LabelSchema = NoLabels> {
    name: String,
    vec: GaugeVec,
    _labels: PhantomData<fn(&L)>,
}

impl<L: LabelSchema> Gauge<L> {
    /// Registers a gauge family named `name` with `L`'s labels.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Counter::register`](super::Counter::register).
    pub fn register(registry: &MetricsRegistry, name: &str, help: &str) -> Result<Self> {
        let name = registry.qualified_name(name)?;
        let vec = GaugeVec::new(Opts::new(name.as_str(), help), &label_names::<L>()?)
            .map_err(|e| family_error(&name, e))?;
        registry.register(&name, vec.clone())?;

        Ok(Self {
            name,
            vec,
            _labels: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&self, value: f64, labels: &L) {
        if let Some(gauge) = series(&self.vec, &self.name, labels) {
            gauge.set(value);
        }
    }

    /// Adds `delta`, which may be negative.
    pub fn add(&self, delta: f64, labels: &L) {
        if let Some(gauge) = series(&self.vec, &self.name, labels) {
            gauge.add(delta);
        }
    }

    pub fn inc(&self, labels: &L) {
        self.add(1.0, labels);
    }

    pub fn dec(&self, labels: &L) {
        self.add(-1.0, labels);
    }

    /// Current value of the series for `labels`, `0` if it was never written.
    pub fn get(&self, labels: &L) -> f64 {
        existing_series(&self.vec, labels).map_or(0.0, |metric| metric.get_gauge().get_value())
    }
}

impl Gauge<NoLabels> {
    /// Registers a gauge without labels.
    ///
    /// # Errors
    ///
    /// Same as [`Gauge::register`].
    pub fn unlabeled(registry: &MetricsRegistry, name: &str, help: &str) -> Result<Self> {
        Self::register(registry, name, help)
    }
}

impl<L: LabelSchema> Clone for Gauge<L> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            vec: self.vec.clone(),
            _labels: PhantomData,
        }
    }
}

impl<L: LabelSchema> fmt::Debug for Gauge<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge")
            .field("name", &self.name)
            .field("labels", &L::descriptor().type_name())
            .finish()
    }
}
