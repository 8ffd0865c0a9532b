//! Typed label schemas.
//!
//! A label schema is a flat struct of `String` fields. Each field is one
//! label; field order is label order. Schemas are declared with
//! [`label_schema!`](crate::label_schema), which generates the struct, a
//! `static` [`SchemaDescriptor`] and the [`LabelSchema`] impl:
//!
//! ```
//! http_metrics::label_schema! {
//!     /// Labels for the jobs counter.
//!     #[derive(Debug, Clone, Default)]
//!     pub struct JobLabels {
//!         #[label = "name"]
//!         pub name: String,
//!         #[label = "status"]
//!         pub status: String,
//!     }
//! }
//!
//! let names = http_metrics::labels::resolve::<JobLabels>().unwrap();
//! assert_eq!(names, ["name", "status"]);
//! ```
//!
//! Fields without a `#[label = "..."]` annotation take their label name
//! from the field identifier through [`sanitize_label_name`]. Annotated
//! names are validated and never rewritten.
//!
//! Non-string and private fields do not compile:
//!
//! ```compile_fail
//! http_metrics::label_schema! {
//!     pub struct Bad {
//!         #[label = "count"]
//!         pub count: u64,
//!     }
//! }
//! ```
//!
//! # Caching
//!
//! Label names are resolved once per schema and stored in the schema's
//! descriptor (`OnceLock`). Every later lookup is a plain read; per
//! observation only the field values are collected, in declared order.

use crate::errors::{MetricsError, Result};
use std::sync::OnceLock;

/// How a schema field obtains its external label name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelField {
    /// Explicit `#[label = "..."]` annotation. Validated, never coerced.
    Declared {
        field: &'static str,
        label: &'static str,
    },
    /// No annotation: the name is derived from the field identifier.
    Derived { field: &'static str },
}

impl LabelField {
    /// Rust identifier of the field.
    pub fn field(&self) -> &'static str {
        match self {
            LabelField::Declared { field, .. } | LabelField::Derived { field } => field,
        }
    }
}

/// Static description of a label schema plus its resolved label names.
///
/// One descriptor exists per schema type, created alongside the type by
/// [`label_schema!`](crate::label_schema) or by hand for manual
/// [`LabelSchema`] impls.
#[derive(Debug)]
pub struct SchemaDescriptor {
    type_name: &'static str,
    fields: &'static [LabelField],
    resolved: OnceLock<Result<Vec<String>>>,
}

impl SchemaDescriptor {
    /// Creates an unresolved descriptor.
    pub const fn new(type_name: &'static str, fields: &'static [LabelField]) -> Self {
        Self {
            type_name,
            fields,
            resolved: OnceLock::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &'static [LabelField] {
        self.fields
    }

    /// Returns the ordered label names, resolving them on first use.
    ///
    /// Concurrent first callers block on a single resolution; everybody
    /// observes the same cached result afterwards.
    pub fn resolve(&self) -> Result<&[String]> {
        self.resolved
            .get_or_init(|| resolve_fields(self.type_name, self.fields))
            .as_deref()
            .map_err(Clone::clone)
    }

    /// True once `resolve` has run (successfully or not).
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

/// A flat, string-valued record whose fields are metric labels.
pub trait LabelSchema: Send + Sync + 'static {
    /// The schema's static descriptor.
    fn descriptor() -> &'static SchemaDescriptor;

    /// Field values in declared order.
    fn label_values(&self) -> Vec<&str>;
}

/// Label schema with no labels, for process-global metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoLabels;

impl LabelSchema for NoLabels {
    fn descriptor() -> &'static SchemaDescriptor {
        static DESCRIPTOR: SchemaDescriptor = SchemaDescriptor::new("NoLabels", &[]);
        &DESCRIPTOR
    }

    fn label_values(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Ordered label names for schema `L`.
///
/// # Errors
///
/// Returns the configuration error found in the schema declaration
/// (empty, invalid, reserved or duplicate label names).
pub fn resolve<L: LabelSchema>() -> Result<&'static [String]> {
    L::descriptor().resolve()
}

/// Ordered `(name, value)` pairs for one schema instance.
///
/// Empty values are valid and are kept as empty label values.
///
/// # Errors
///
/// Fails if the schema does not resolve or if the instance yields a
/// different number of values than the schema declares.
pub fn extract<L: LabelSchema>(labels: &L) -> Result<Vec<(&'static str, &str)>> {
    let names = resolve::<L>()?;
    let values = values(labels)?;
    Ok(names
        .iter()
        .map(String::as_str)
        .zip(values)
        .collect())
}

/// Field values of one schema instance, checked against the resolved names.
pub(crate) fn values<L: LabelSchema>(labels: &L) -> Result<Vec<&str>> {
    let descriptor = L::descriptor();
    let expected = descriptor.resolve()?.len();
    let values = labels.label_values();
    if values.len() != expected {
        return Err(MetricsError::LabelCountMismatch {
            schema: descriptor.type_name(),
            expected,
            actual: values.len(),
        });
    }
    Ok(values)
}

/// Checks a metric or label name against `^[a-z_][a-z0-9_]*$`.
pub fn is_valid_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if first == b'_' || first.is_ascii_lowercase() => {}
        _ => return false,
    }
    bytes.all(|b| b == b'_' || b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Validates a metric name.
///
/// # Errors
///
/// Returns `MetricsError::InvalidMetricName` if the name does not match
/// `^[a-z_][a-z0-9_]*$`.
pub fn validate_metric_name(name: &str) -> Result<&str> {
    if is_valid_name(name) {
        Ok(name)
    } else {
        Err(MetricsError::InvalidMetricName(name.to_string()))
    }
}

/// Derives a label name from an arbitrary identifier.
///
/// Lower-cases, replaces anything outside `[a-z0-9_]` with `_` and prefixes
/// a leading digit with `_`. A raw-identifier prefix (`r#`) is dropped.
pub fn sanitize_label_name(raw: &str) -> String {
    let raw = raw.strip_prefix("r#").unwrap_or(raw);
    let mut name = String::with_capacity(raw.len() + 1);
    if raw.starts_with(|c: char| c.is_ascii_digit()) {
        name.push('_');
    }
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit() {
            name.push(c);
        } else {
            name.push('_');
        }
    }
    if name.is_empty() {
        name.push('_');
    }
    name
}

fn resolve_fields(schema: &'static str, fields: &'static [LabelField]) -> Result<Vec<String>> {
    let resolved = fields
        .iter()
        .try_fold(Vec::with_capacity(fields.len()), |mut names, field| {
            let name = label_name(schema, field)?;
            if name.starts_with("__") {
                return Err(MetricsError::ReservedLabelName {
                    schema,
                    field: field.field(),
                    label: name,
                });
            }
            if names.contains(&name) {
                return Err(MetricsError::DuplicateLabelName {
                    schema,
                    label: name,
                });
            }
            names.push(name);
            Ok(names)
        });

    match &resolved {
        Ok(names) => {
            tracing::debug!(target: "http_metrics.labels", schema, labels = ?names, "Resolved label schema");
        }
        Err(e) => {
            tracing::error!(target: "http_metrics.labels", schema, error = %e, "Invalid label schema");
        }
    }

    resolved
}

fn label_name(schema: &'static str, field: &LabelField) -> Result<String> {
    match *field {
        LabelField::Declared { field, label } => {
            if label.is_empty() {
                return Err(MetricsError::EmptyLabelName { schema, field });
            }
            if !is_valid_name(label) {
                return Err(MetricsError::InvalidLabelName {
                    schema,
                    field,
                    label: label.to_string(),
                });
            }
            Ok(label.to_string())
        }
        LabelField::Derived { field } => Ok(sanitize_label_name(field)),
    }
}

/// Declares a label schema struct and its [`LabelSchema`] impl.
///
/// Every field must be `pub` and of type `String`. A field may carry a
/// `#[label = "name"]` annotation; otherwise its label name is derived from
/// the field identifier.
#[macro_export]
macro_rules! label_schema {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[label = $label:literal])?
                pub $field:ident : String
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                pub $field: ::std::string::String,
            )*
        }

        impl $crate::labels::LabelSchema for $name {
            fn descriptor() -> &'static $crate::labels::SchemaDescriptor {
                static DESCRIPTOR: $crate::labels::SchemaDescriptor =
                    $crate::labels::SchemaDescriptor::new(
                        ::std::stringify!($name),
                        &[$($crate::__label_field!($field $(, $label)?)),*],
                    );
                &DESCRIPTOR
            }

            fn label_values(&self) -> ::std::vec::Vec<&str> {
                ::std::vec![$(self.$field.as_str()),*]
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __label_field {
    ($field:ident, $label:literal) => {
        $crate::labels::LabelField::Declared {
            field: ::std::stringify!($field),
            label: $label,
        }
    };
    ($field:ident) => {
        $crate::labels::LabelField::Derived {
            field: ::std::stringify!($field),
        }
    };
}
