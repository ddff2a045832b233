use std::sync::Arc;

/// Raw admission parameters as read from configuration, before the patterns
/// are compiled into a [`PolicyConfig`](crate::policy::model::PolicyConfig).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyParams {
    pub denies: Vec<Arc<str>>,
    pub allows: Vec<Arc<str>>,
    pub redirect_page: Option<Arc<str>>,
}
