//! Response shapes with nested sub-resources
//!
//! List endpoints use the same views with the heavy nested parts left out.

use super::catalog::{
    Client, DataAsset, DataAssetInstance, DataIngest, DataProvider, Domain, FileFormat, Function,
    FunctionArgument, FunctionMapping, Schema, SchemaColumn,
};
use super::enums::{CodeLanguage, ScheduleType, SchemaType, SourceType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Id and name of a referenced record
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntityRef {
    pub id: i32,
    pub name: String,
}

impl From<&Domain> for EntityRef {
    fn from(domain: &Domain) -> Self {
        Self {
            id: domain.id,
            name: domain.name.clone(),
        }
    }
}

impl From<&Client> for EntityRef {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
        }
    }
}

impl From<&DataProvider> for EntityRef {
    fn from(provider: &DataProvider) -> Self {
        Self {
            id: provider.id,
            name: provider.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchemaView {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: SchemaType,
    pub columns: Vec<SchemaColumn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SchemaView {
    pub fn new(schema: Schema, columns: Vec<SchemaColumn>) -> Self {
        Self {
            id: schema.id,
            kind: schema.kind,
            columns,
            created_at: schema.created_at,
            updated_at: schema.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataAssetView {
    pub id: i32,
    pub domain: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaView>,
    pub name: String,
    pub description: Option<String>,
    pub s3_bucket: String,
    pub s3_path_prefix: String,
    pub s3_partition_path: String,
    pub instance_default_database: String,
    pub instance_default_db_schema: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DataAssetView {
    pub fn new(asset: DataAsset, domain: &Domain, schema: Option<SchemaView>) -> Self {
        Self {
            id: asset.id,
            domain: domain.into(),
            schema,
            name: asset.name,
            description: asset.description,
            s3_bucket: asset.s3_bucket,
            s3_path_prefix: asset.s3_path_prefix,
            s3_partition_path: asset.s3_partition_path,
            instance_default_database: asset.instance_default_database,
            instance_default_db_schema: asset.instance_default_db_schema,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

/// Data asset as embedded in an instance
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataAssetSummary {
    pub id: i32,
    pub domain: EntityRef,
    pub name: String,
    pub s3_bucket: String,
    pub s3_path_prefix: String,
    pub s3_partition_path: String,
    pub instance_default_database: String,
    pub instance_default_db_schema: String,
}

impl DataAssetSummary {
    pub fn new(asset: DataAsset, domain: &Domain) -> Self {
        Self {
            id: asset.id,
            domain: domain.into(),
            name: asset.name,
            s3_bucket: asset.s3_bucket,
            s3_path_prefix: asset.s3_path_prefix,
            s3_partition_path: asset.s3_partition_path,
            instance_default_database: asset.instance_default_database,
            instance_default_db_schema: asset.instance_default_db_schema,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestSummary {
    pub id: i32,
    pub name: String,
    pub source_name: String,
    pub auto_ingest: bool,
}

impl From<DataIngest> for IngestSummary {
    fn from(ingest: DataIngest) -> Self {
        Self {
            id: ingest.id,
            name: ingest.name,
            source_name: ingest.source_name,
            auto_ingest: ingest.auto_ingest,
        }
    }
}

/// Parts of an instance view that only the detail endpoint carries
#[derive(Debug, Clone)]
pub struct InstanceDetail {
    pub data_ingest: Option<IngestSummary>,
    pub file_format: FileFormat,
    pub schema: SchemaView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataAssetInstanceView {
    pub id: i32,
    pub data_asset: DataAssetSummary,
    // outer None omits the key, inner None renders null
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<IngestSummary>)]
    pub data_ingest: Option<Option<IngestSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_format: Option<FileFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaView>,
    pub client: EntityRef,
    pub data_provider: EntityRef,
    pub source_type: SourceType,
    pub source_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub database: Option<String>,
    pub db_schema: Option<String>,
    pub materialization_type: String,
    pub tags: Vec<String>,
    pub stage_name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub one_off: bool,
    pub enabled: bool,
    pub schedule_type: ScheduleType,
    pub schedule_cron: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DataAssetInstanceView {
    pub fn new(
        instance: DataAssetInstance,
        data_asset: DataAssetSummary,
        client: &Client,
        data_provider: &DataProvider,
        detail: Option<InstanceDetail>,
    ) -> Self {
        let (data_ingest, file_format, schema) = match detail {
            Some(detail) => (
                Some(detail.data_ingest),
                Some(detail.file_format),
                Some(detail.schema),
            ),
            None => (None, None, None),
        };

        Self {
            id: instance.id,
            data_asset,
            data_ingest,
            file_format,
            schema,
            client: client.into(),
            data_provider: data_provider.into(),
            source_type: instance.source_type,
            source_id: instance.source_id,
            name: instance.name,
            description: instance.description,
            database: instance.database,
            db_schema: instance.db_schema,
            materialization_type: instance.materialization_type,
            tags: instance.tags,
            stage_name: instance.stage_name,
            start_time: instance.start_time,
            expires: instance.expires,
            one_off: instance.one_off,
            enabled: instance.enabled,
            schedule_type: instance.schedule_type,
            schedule_cron: instance.schedule_cron,
            created_at: instance.created_at,
            updated_at: instance.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FunctionView {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub code: String,
    pub code_language: CodeLanguage,
    pub arguments: Vec<FunctionArgument>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FunctionView {
    pub fn new(function: Function, arguments: Vec<FunctionArgument>) -> Self {
        Self {
            id: function.id,
            name: function.name,
            description: function.description,
            code: function.code,
            code_language: function.code_language,
            arguments,
            created_at: function.created_at,
            updated_at: function.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FunctionMappingView {
    pub id: i32,
    pub function: FunctionView,
    #[schema(value_type = Option<Object>)]
    pub argument_value: Option<serde_json::Value>,
    pub alias_name: Option<String>,
    pub seq_num: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FunctionMappingView {
    pub fn new(mapping: FunctionMapping, function: FunctionView) -> Self {
        Self {
            id: mapping.id,
            function,
            argument_value: mapping.argument_value,
            alias_name: mapping.alias_name,
            seq_num: mapping.seq_num,
            created_at: mapping.created_at,
            updated_at: mapping.updated_at,
        }
    }
}
