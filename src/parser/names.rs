//! Helpers for the ARM expression strings used as names and resource ids.

use crate::model::{ResourceId, ResourceKind};

/// Extract the resource name from an ARM name expression.
///
/// `[concat(parameters('factoryName'), '/PL_Load')]` becomes `PL_Load`: the text after
/// the first `/`, cut at the last `'` when one follows.
pub fn clean_name(raw: &str) -> &str {
    let start = raw.find('/').map(|i| i + 1).unwrap_or(0);
    let rest = &raw[start..];
    match rest.rfind('\'') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// Last path segment of a template type, e.g. `pipelines` for
/// `Microsoft.DataFactory/factories/pipelines`.
pub fn type_segment(raw: &str) -> &str {
    raw.rsplit('/').next().unwrap_or(raw)
}

/// Parse one `dependsOn` entry into the resource id it names.
///
/// `[concat(variables('factoryId'), '/linkedServices/LS_Sql')]` names
/// the linked service `LS_Sql`. Entries for kinds the linter does not model
/// (integration runtimes, ...) yield `None`.
pub fn parse_dependency_id(raw: &str) -> Option<ResourceId> {
    let (segment, name) = clean_name(raw).split_once('/')?;
    let kind = ResourceKind::from_segment(segment)?;
    if name.is_empty() {
        return None;
    }
    Some(ResourceId::new(kind, name))
}
