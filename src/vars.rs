//! Variable bags for template rendering.

use serde_json::{Map, Value};

/// A bag of named values handed to render functions.
///
/// Insertion order is preserved so template diagnostics stay stable.
pub type VarBag = Map<String, Value>;

/// Merge request variables over registry defaults.
///
/// The override bag wins on key collisions; neither input is modified.
pub fn merge_vars(defaults: &VarBag, overrides: Option<&VarBag>) -> VarBag {
    let mut merged = defaults.clone();
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
