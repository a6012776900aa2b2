//! Per-property value converters.

use std::fmt;
use std::sync::Arc;

use crate::Result;
use crate::types::ScalarType;
use crate::value::Value;

type ConvertFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Converts a property value to and from its provider (wire) representation.
///
/// Applied to every staged cell and every single-row parameter of the
/// property it is attached to. NULL never reaches the functions; it passes
/// through unchanged.
#[derive(Clone)]
pub struct ValueConverter {
    provider_type: ScalarType,
    to_provider: ConvertFn,
    from_provider: ConvertFn,
}

impl ValueConverter {
    pub fn new<F, G>(provider_type: ScalarType, to_provider: F, from_provider: G) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
        G: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            provider_type,
            to_provider: Arc::new(to_provider),
            from_provider: Arc::new(from_provider),
        }
    }

    /// The logical type of the converted value; staging columns use it.
    pub fn provider_type(&self) -> ScalarType {
        self.provider_type
    }

    #[allow(clippy::result_large_err)]
    pub fn to_provider(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        (self.to_provider)(value)
    }

    #[allow(clippy::result_large_err)]
    pub fn from_provider(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        (self.from_provider)(value)
    }
}

impl fmt::Debug for ValueConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueConverter")
            .field("provider_type", &self.provider_type)
            .finish_non_exhaustive()
    }
}
