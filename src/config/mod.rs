mod loader;
pub mod model;

use std::sync::Arc;

pub use loader::{load_policy_params, policy_params_from_init};
pub use model::PolicyParams;

/// Splits a comma-separated pattern list.
///
/// `,` is the only separator and there is no escaping, so a pattern cannot
/// contain a literal comma. Segments are kept verbatim (no trimming). An
/// empty value yields an empty list; empty segments inside a non-empty value
/// are preserved and rejected later when the policy is compiled.
pub fn split_patterns(value: &str) -> Vec<Arc<str>> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(Arc::<str>::from).collect()
}
