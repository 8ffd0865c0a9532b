//! Monotonic counters.

use super::{existing_series, family_error, label_names, series};
use crate::errors::{MetricsError, Result};
use crate::labels::{LabelSchema, NoLabels};
use crate::registry::MetricsRegistry;
use prometheus::{CounterVec, Opts};
use std::fmt;
use std::marker::PhantomData;

/// Counter family keyed by label schema `L`.
pub struct Counter<L: LabelSchema = NoLabels> {
    name: String,
    vec: CounterVec,
    _labels: PhantomData<fn(&L)>,
}

impl<L: LabelSchema> Counter<L> {
    /// Registers a counter family named `name` with `L`'s labels.
    ///
    /// # Errors
    ///
    /// - `MetricsError::InvalidMetricName` for names outside `[a-z_][a-z0-9_]*`
    /// - label schema errors from resolving `L`
    /// - `MetricsError::AlreadyRegistered` if `name` is taken
    pub fn register(registry: &MetricsRegistry, name: &str, help: &str) -> Result<Self> {
        let name = registry.qualified_name(name)?;
        let vec = CounterVec::new(Opts::new(name.as_str(), help), &label_names::<L>()?)
            .map_err(|e| family_error(&name, e))?;
        registry.register(&name, vec.clone())?;

        Ok(Self {
            name,
            vec,
            _labels: PhantomData,
        })
    }

    /// Fully qualified metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds one to the series for `labels`.
    pub fn inc(&self, labels: &L) {
        if let Some(counter) = series(&self.vec, &self.name, labels) {
            counter.inc();
        }
    }

    /// Adds `delta` to the series for `labels`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::NegativeCounterDelta` for negative or
    /// non-finite deltas; nothing is recorded.
    pub fn add(&self, delta: f64, labels: &L) -> Result<()> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(MetricsError::NegativeCounterDelta(delta));
        }
        if let Some(counter) = series(&self.vec, &self.name, labels) {
            counter.inc_by(delta);
        }
        Ok(())
    }

    /// Current value of the series for `labels`, `0` if it was never written.
    pub fn get(&self, labels: &L) -> f64 {
        existing_series(&self.vec, labels).map_or(0.0, |metric| metric.get_counter().get_value())
    }
}

impl Counter<NoLabels> {
    /// Registers a counter without labels.
    ///
    /// # Errors
    ///
    /// Same as [`Counter::register`].
    pub fn unlabeled(registry: &MetricsRegistry, name: &str, help: &str) -> Result<Self> {
        Self::register(registry, name, help)
    }
}

impl<L: LabelSchema> Clone for Counter<L> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            vec: self.vec.clone(),
            _labels: PhantomData,
        }
    }
}

impl<L: LabelSchema> fmt::Debug for Counter<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("name", &self.name)
            .field("labels", &L::descriptor().type_name())
            .finish()
    }
}
