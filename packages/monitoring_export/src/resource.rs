use crate::MonitoredResource;

/// Determines the monitored resource that exported time series are associated with.
///
/// Consulted once, when the exporter is initialized. If the resolved resource carries no
/// project id, the exporter disables itself.
#[cfg_attr(test, mockall::automock)]
pub trait ResourceProvider: Send {
    /// Resolves the monitored resource of this process.
    fn resolve(&self) -> MonitoredResource;
}

/// A fixed resource, typically configured by the application.
impl ResourceProvider for MonitoredResource {
    fn resolve(&self) -> MonitoredResource {
        self.clone()
    }
}

/// The `global` resource of a project, for processes without a more specific resource.
///
/// # Example
///
/// ```
/// use monitoring_export::{ResourceProvider, global_resource};
///
/// let resource = global_resource("my-project").resolve();
///
/// assert_eq!(resource.resource_type, "global");
/// assert_eq!(resource.project_id(), Some("my-project"));
/// ```
#[must_use]
pub fn global_resource(project_id: &str) -> MonitoredResource {
    MonitoredResource::new("global").with_label(MonitoredResource::PROJECT_ID_LABEL, project_id)
}
