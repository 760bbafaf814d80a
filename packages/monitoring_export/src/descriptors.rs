//! Computation and caching of the remote descriptors of exported metrics.

use std::collections::hash_map::Entry;

use foldhash::{HashMap, HashMapExt};
use tracing::{debug, trace};

use crate::units::{metric_kind, to_ucum};
use crate::{
    ExportContext, LabelDescriptor, LabelValueType, LaunchStage, Metadata, MetricDescriptor,
    MetricId, MetricServiceClient, RegistryType, Result, Snapshot,
};

/// The type of the descriptor of a metric: `{prefix}/{registry type}/{metric name}`.
#[must_use]
pub fn metric_type(prefix: &str, registry_type: RegistryType, name: &str) -> String {
    format!("{prefix}/{registry_type}/{name}")
}

/// Computes the descriptor that a metric should have in the remote service.
///
/// The result depends only on the inputs. The value type is inferred from the snapshot, the
/// metric kind and unit from the metadata, and there is one string label per tag of the
/// metric identity.
#[must_use]
pub fn to_descriptor(
    ctx: &ExportContext,
    registry_type: RegistryType,
    id: &MetricId,
    metadata: &Metadata,
    snapshot: &Snapshot,
) -> MetricDescriptor {
    let config = ctx.config();
    let metric_type = metric_type(config.metric_type_prefix(), registry_type, id.name());

    let labels = id
        .tags()
        .keys()
        .map(|key| LabelDescriptor {
            key: key.clone(),
            value_type: LabelValueType::String,
            description: config.label_description(key).unwrap_or_default().to_string(),
        })
        .collect();

    MetricDescriptor {
        name: format!("{}/metricDescriptors/{metric_type}", ctx.project()),
        metric_type,
        labels,
        metric_kind: metric_kind(metadata.metric_type()),
        value_type: snapshot.value_type(),
        unit: to_ucum(metadata.unit()),
        description: metadata.description().unwrap_or_default().to_string(),
        display_name: metadata.display_name().to_string(),
        launch_stage: LaunchStage::Unspecified,
        monitored_resource_types: vec![ctx.resource().resource_type.clone()],
    }
}

/// Whether an existing remote descriptor can be used in place of a computed one.
///
/// All scalar properties must be equal. The existing descriptor may declare more labels and
/// more monitored resource types than the computed one, but not fewer.
#[must_use]
pub fn is_like(existing: &MetricDescriptor, computed: &MetricDescriptor) -> bool {
    existing.metric_type == computed.metric_type
        && existing.metric_kind == computed.metric_kind
        && existing.value_type == computed.value_type
        && existing.unit == computed.unit
        && existing.description == computed.description
        && existing.display_name == computed.display_name
        && existing.launch_stage == computed.launch_stage
        && computed
            .labels
            .iter()
            .all(|label| existing.labels.contains(label))
        && computed
            .monitored_resource_types
            .iter()
            .all(|resource_type| existing.monitored_resource_types.contains(resource_type))
}

/// Remote descriptors of the metrics an exporter has seen, keyed by registry and identity.
///
/// Each metric is resolved against the remote service once. The result is kept for the life
/// of the cache and never revalidated.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    descriptors: HashMap<(RegistryType, MetricId), MetricDescriptor>,
}

impl DescriptorCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Returns the remote descriptor of a metric, resolving it on first use.
    ///
    /// Resolution fetches the existing descriptor of the same name. If it is like the computed
    /// descriptor, it is used as is. Otherwise (or if there is none) the computed descriptor
    /// is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`][crate::Error::Remote] if fetching (other than finding nothing)
    /// or creating the descriptor fails. Nothing is cached in that case.
    pub fn resolve<C>(
        &mut self,
        client: &C,
        ctx: &ExportContext,
        registry_type: RegistryType,
        id: &MetricId,
        metadata: &Metadata,
        snapshot: &Snapshot,
    ) -> Result<&MetricDescriptor>
    where
        C: MetricServiceClient + ?Sized,
    {
        match self.descriptors.entry((registry_type, id.clone())) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let computed = to_descriptor(ctx, registry_type, id, metadata, snapshot);
                let descriptor = fetch_or_create(client, ctx, &computed)?;

                Ok(entry.insert(descriptor))
            }
        }
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn fetch_or_create<C>(
    client: &C,
    ctx: &ExportContext,
    computed: &MetricDescriptor,
) -> Result<MetricDescriptor>
where
    C: MetricServiceClient + ?Sized,
{
    match client.get_metric_descriptor(&computed.name) {
        Ok(existing) if is_like(&existing, computed) => {
            trace!(descriptor = %existing.name, "reusing existing metric descriptor");
            return Ok(existing);
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    debug!(descriptor = %computed.name, "creating metric descriptor");

    Ok(client.create_metric_descriptor(ctx.project(), computed)?)
}
