//! Resource kinds and the descriptor enum that wraps the four payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::data_source::DataSourceConnection;
use crate::types::index_schema::IndexSchema;
use crate::types::indexer::Indexer;
use crate::types::skillset::Skillset;

/// The kinds of named configuration objects held by the search service.
///
/// Declaration order is the synchronization order: a data source before the
/// skillset, the skillset before the index, and the indexer last because it
/// embeds the names of the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    DataSource,
    EnrichmentPipeline,
    IndexSchema,
    Indexer,
}

impl ResourceKind {
    /// All kinds in synchronization order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::DataSource,
        ResourceKind::EnrichmentPipeline,
        ResourceKind::IndexSchema,
        ResourceKind::Indexer,
    ];

    /// The collection segment used in the service's REST paths.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::DataSource => "datasources",
            ResourceKind::EnrichmentPipeline => "skillsets",
            ResourceKind::IndexSchema => "indexes",
            ResourceKind::Indexer => "indexers",
        }
    }

    /// Position in the synchronization sequence, starting at 0.
    pub fn rank(&self) -> u8 {
        match self {
            ResourceKind::DataSource => 0,
            ResourceKind::EnrichmentPipeline => 1,
            ResourceKind::IndexSchema => 2,
            ResourceKind::Indexer => 3,
        }
    }

    /// Human-readable label used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::DataSource => "data source",
            ResourceKind::EnrichmentPipeline => "skillset",
            ResourceKind::IndexSchema => "index",
            ResourceKind::Indexer => "indexer",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A desired (or live) remote configuration object.
///
/// The kind is carried by the variant and the name by the payload, so a
/// descriptor can never disagree with itself about either.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDescriptor {
    DataSource(DataSourceConnection),
    EnrichmentPipeline(Skillset),
    IndexSchema(IndexSchema),
    Indexer(Indexer),
}

impl ResourceDescriptor {
    /// The kind of this descriptor.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDescriptor::DataSource(_) => ResourceKind::DataSource,
            ResourceDescriptor::EnrichmentPipeline(_) => ResourceKind::EnrichmentPipeline,
            ResourceDescriptor::IndexSchema(_) => ResourceKind::IndexSchema,
            ResourceDescriptor::Indexer(_) => ResourceKind::Indexer,
        }
    }

    /// The name of the remote object.
    pub fn name(&self) -> &str {
        match self {
            ResourceDescriptor::DataSource(d) => &d.name,
            ResourceDescriptor::EnrichmentPipeline(s) => &s.name,
            ResourceDescriptor::IndexSchema(i) => &i.name,
            ResourceDescriptor::Indexer(i) => &i.name,
        }
    }

    /// `kind 'name'`, for logs and error messages.
    pub fn label(&self) -> String {
        format!("{} '{}'", self.kind(), self.name())
    }

    /// Whether the live object already holds this definition.
    ///
    /// Compares only the fields this program owns. Attributes the service adds
    /// or rewrites on its side (etags, masked credentials, generated skill
    /// names, schedule start times) do not count as drift.
    pub fn is_satisfied_by(&self, live: &ResourceDescriptor) -> bool {
        match (self, live) {
            (ResourceDescriptor::DataSource(d), ResourceDescriptor::DataSource(l)) => {
                d.is_satisfied_by(l)
            }
            (ResourceDescriptor::EnrichmentPipeline(d), ResourceDescriptor::EnrichmentPipeline(l)) => {
                d.is_satisfied_by(l)
            }
            (ResourceDescriptor::IndexSchema(d), ResourceDescriptor::IndexSchema(l)) => {
                d.is_satisfied_by(l)
            }
            (ResourceDescriptor::Indexer(d), ResourceDescriptor::Indexer(l)) => d.is_satisfied_by(l),
            _ => false,
        }
    }

    /// Serialize the payload into the service's JSON representation.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            ResourceDescriptor::DataSource(d) => serde_json::to_value(d),
            ResourceDescriptor::EnrichmentPipeline(s) => serde_json::to_value(s),
            ResourceDescriptor::IndexSchema(i) => serde_json::to_value(i),
            ResourceDescriptor::Indexer(i) => serde_json::to_value(i),
        }
    }

    /// Decode a JSON record of the given kind.
    ///
    /// Unknown attributes in the record are ignored.
    pub fn from_json(kind: ResourceKind, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ResourceKind::DataSource => ResourceDescriptor::DataSource(serde_json::from_value(value)?),
            ResourceKind::EnrichmentPipeline => {
                ResourceDescriptor::EnrichmentPipeline(serde_json::from_value(value)?)
            }
            ResourceKind::IndexSchema => ResourceDescriptor::IndexSchema(serde_json::from_value(value)?),
            ResourceKind::Indexer => ResourceDescriptor::Indexer(serde_json::from_value(value)?),
        })
    }
}

impl From<DataSourceConnection> for ResourceDescriptor {
    fn from(value: DataSourceConnection) -> Self {
        ResourceDescriptor::DataSource(value)
    }
}

impl From<Skillset> for ResourceDescriptor {
    fn from(value: Skillset) -> Self {
        ResourceDescriptor::EnrichmentPipeline(value)
    }
}

impl From<IndexSchema> for ResourceDescriptor {
    fn from(value: IndexSchema) -> Self {
        ResourceDescriptor::IndexSchema(value)
    }
}

impl From<Indexer> for ResourceDescriptor {
    fn from(value: Indexer) -> Self {
        ResourceDescriptor::Indexer(value)
    }
}
