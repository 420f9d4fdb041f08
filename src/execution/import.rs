use anyhow::Result;
use std::collections::HashMap;

use super::{store::Store, value::Value};

/// A host-provided function. It may inspect and mutate the store (memories
/// included) and optionally produce a single result.
pub type HostFunc = Box<dyn FnMut(&mut Store, Vec<Value>) -> Result<Option<Value>>>;

/// Registered host functions, keyed by module name and then field name.
pub type ImportTable = HashMap<String, HashMap<String, HostFunc>>;
