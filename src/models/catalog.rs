//! Configuration schema records
//!
//! One struct per table in the `configuration` schema. Foreign keys are
//! plain integer columns; nested views are assembled by the service layer.

use super::enums::{
    CodeLanguage, CompressionAlgorithm, FileFormatType, ScheduleType, SchemaType, SourceType,
};
use crate::db::store::record;
use chrono::{DateTime, Utc};

record! {
    /// Business domain owning a warehouse database and schema
    pub struct Domain in "configuration.domain" as "Domain" {
        pub name: String,
        pub database: String,
        pub db_schema: String,
    }
}

record! {
    pub struct DataProvider in "configuration.dataprovider" as "DataProvider" {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub contact_name: Option<String>,
        pub contact_email: Option<String>,
    }
}

record! {
    pub struct Client in "configuration.client" as "Client" {
        pub name: String,
        pub is_active: bool,
    }
}

record! {
    /// SFTP server a data asset instance pulls its files from
    pub struct SftpSource in "configuration.sftpsource" as "SFTPSource" {
        pub host: String,
        pub port: i32,
        pub user: String,
        pub passphrase: String,
        pub source_path: String,
        pub backup_dir: Option<String>,
    }
}

record! {
    pub struct Schema in "configuration.schema" as "Schema" {
        #[serde(rename = "type")]
        pub kind: SchemaType,
    }
}

record! {
    pub struct SchemaColumn in "configuration.schemacolumn" as "SchemaColumn" {
        #[serde(skip_serializing)]
        pub schema_id: i32,
        pub column_number: Option<i32>,
        pub column_name: String,
        pub tags: Vec<String>,
        pub data_type: String,
        pub is_custom_column: bool,
        pub is_nullable: bool,
        pub is_foreign_key: bool,
        pub is_primary_key: bool,
    }
    keys [schema_id, column_number]
}

record! {
    /// Warehouse file format definition used when loading staged files
    pub struct FileFormat in "configuration.fileformat" as "FileFormat" {
        pub name: String,
        pub format_type: FileFormatType,
        pub compression: CompressionAlgorithm,
        pub column_separator: String,
        pub row_separator: String,
        pub null_string: String,
        pub is_trimmed: bool,
        pub skip_header_lines: i32,
        pub is_column_mismatch_error_raised: bool,
        pub escape_character: Option<String>,
        pub escape_unenclosed_field: String,
        pub date_format: String,
        pub timestamp_format: String,
        pub is_active: bool,
        pub is_global: bool,
    }
}

record! {
    pub struct DataIngest in "configuration.dataingest" as "DataIngest" {
        pub name: String,
        pub source_name: String,
        pub auto_ingest: bool,
        pub aws_sns_topic: Option<String>,
        pub comment: Option<String>,
        pub error_integration: Option<String>,
    }
}

record! {
    pub struct DataAsset in "configuration.dataasset" as "DataAsset" {
        pub domain_id: i32,
        pub schema_id: i32,
        pub name: String,
        pub description: Option<String>,
        pub s3_bucket: String,
        pub s3_path_prefix: String,
        pub s3_partition_path: String,
        pub instance_default_database: String,
        pub instance_default_db_schema: String,
    }
    keys [domain_id, schema_id]
}

record! {
    /// A materialized data product of one asset for one client
    pub struct DataAssetInstance in "configuration.dataassetinstance" as "DataAssetInstance" {
        pub data_asset_id: i32,
        pub file_format_id: i32,
        pub schema_id: i32,
        pub client_id: i32,
        pub data_provider_id: i32,
        pub data_ingest_id: Option<i32>,
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
    }
    keys [data_asset_id, file_format_id, schema_id, client_id, data_provider_id, data_ingest_id, source_id]
}

record! {
    pub struct Function in "configuration.function" as "Function" {
        pub name: String,
        pub description: Option<String>,
        pub code: String,
        pub code_language: CodeLanguage,
    }
}

record! {
    pub struct FunctionArgument in "configuration.functionargument" as "FunctionArgument" {
        #[serde(skip_serializing)]
        pub function_id: i32,
        pub name: String,
        pub description: Option<String>,
        pub default_value: Option<String>,
        pub data_type: String,
    }
    keys [function_id]
}

record! {
    /// Applies a function to a data asset instance at position `seq_num`
    pub struct FunctionMapping in "configuration.functionmapping" as "FunctionMapping" {
        pub data_asset_instance_id: i32,
        pub function_id: i32,
        #[schema(value_type = Option<Object>)]
        pub argument_value: Option<serde_json::Value>,
        pub alias_name: Option<String>,
        pub seq_num: i32,
    }
    keys [data_asset_instance_id, function_id, seq_num]
}
