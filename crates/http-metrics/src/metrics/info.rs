//! Info metrics: static key/value facts published as a gauge fixed at `1`.

use super::{family_error, label_names, series};
use crate::errors::Result;
use crate::labels::LabelSchema;
use crate::registry::MetricsRegistry;
use prometheus::{GaugeVec, Opts};
use std::fmt;
use std::marker::PhantomData;

/// Info family keyed by label schema `L`, e.g. `build_info{version,commit}`.
pub struct Info<L: LabelSchema> {
    name: String,
    vec: GaugeVec,
    _labels: PhantomData<fn(&L)>,
}

impl<L: LabelSchema> Info<L> {
    /// Registers an info family named `name` with `L`'s labels.
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

    /// Publishes `labels` as a series with value `1`.
    pub fn record(&self, labels: &L) {
        if let Some(gauge) = series(&self.vec, &self.name, labels) {
            gauge.set(1.0);
        }
    }
}

impl<L: LabelSchema> fmt::Debug for Info<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Info")
            .field("name", &self.name)
            .field("labels", &L::descriptor().type_name())
            .finish()
    }
}
