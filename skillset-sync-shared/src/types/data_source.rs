//! Data source connection descriptor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage backends a data source connection can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceType {
    #[serde(rename = "azureblob")]
    AzureBlob,
    #[serde(rename = "azuretable")]
    AzureTable,
    #[serde(rename = "azuresql")]
    AzureSql,
    #[serde(rename = "cosmosdb")]
    CosmosDb,
    #[serde(rename = "adlsgen2")]
    AdlsGen2,
}

/// Credentials attached to a data source.
///
/// The service never echoes the connection string back: reads return `null`
/// in its place.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceCredentials {
    #[serde(default)]
    pub connection_string: Option<String>,
}

impl DataSourceCredentials {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Some(connection_string.into()),
        }
    }
}

impl fmt::Debug for DataSourceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.connection_string.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("DataSourceCredentials")
            .field("connection_string", &shown)
            .finish()
    }
}

/// The container (blob container, table, collection) documents are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataContainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl DataContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: None,
        }
    }
}

/// A named pointer to an external content container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceConnection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub source_type: DataSourceType,
    pub credentials: DataSourceCredentials,
    pub container: DataContainer,
}

impl DataSourceConnection {
    /// Create a data source connection.
    ///
    /// # Arguments
    ///
    /// * `name` - The data source name
    /// * `source_type` - The storage backend
    /// * `connection_string` - Connection string for the storage account
    /// * `container` - The container documents are read from
    pub fn new(
        name: impl Into<String>,
        source_type: DataSourceType,
        connection_string: impl Into<String>,
        container: DataContainer,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            source_type,
            credentials: DataSourceCredentials::new(connection_string),
            container,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the live data source already holds this definition.
    ///
    /// A masked (absent) live connection string is treated as matching.
    pub fn is_satisfied_by(&self, live: &Self) -> bool {
        let credentials_match = match live.credentials.connection_string.as_deref() {
            None => true,
            Some(live_secret) => self.credentials.connection_string.as_deref() == Some(live_secret),
        };

        self.name == live.name
            && self.description == live.description
            && self.source_type == live.source_type
            && self.container == live.container
            && credentials_match
    }
}
