use apache_avro::Schema;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::SchemaError;

/// Subject under which the value schema of `topic` is registered.
pub fn value_subject(topic: &str) -> String {
    format!("{topic}-value")
}

/// A schema resolved from the registry, with the id that goes into every framed message.
#[derive(Debug, Clone)]
pub struct SchemaHandle {
    pub id: u32,
    pub subject: String,
    pub version: u32,
    schema: Schema,
}

impl SchemaHandle {
    pub fn parse(
        id: u32,
        subject: impl Into<String>,
        version: u32,
        schema_str: &str,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            id,
            subject: subject.into(),
            version,
            schema: Schema::parse_str(schema_str)?,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectVersion {
    subject: String,
    version: u32,
    id: u32,
    schema: String,
    // Absent means AVRO
    schema_type: Option<String>,
}

pub struct SchemaRegistryClient {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl SchemaRegistryClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<(String, String)>,
    ) -> Result<Self, SchemaError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Fetch and parse the latest version registered under `subject`.
    pub async fn resolve_schema(&self, subject: &str) -> Result<SchemaHandle, SchemaError> {
        let url = format!("{}/subjects/{}/versions/latest", self.base_url, subject);
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.schemaregistry.v1+json");
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SchemaError::Status {
                subject: subject.to_string(),
                status: response.status(),
            });
        }

        let latest: SubjectVersion = response.json().await?;
        if let Some(schema_type) = latest.schema_type.filter(|t| !t.eq_ignore_ascii_case("AVRO")) {
            return Err(SchemaError::UnsupportedType {
                subject: subject.to_string(),
                schema_type,
            });
        }

        let handle = SchemaHandle::parse(latest.id, latest.subject, latest.version, &latest.schema)?;
        info!(
            subject = %handle.subject,
            version = handle.version,
            schema_id = handle.id,
            "resolved value schema"
        );
        Ok(handle)
    }
}
