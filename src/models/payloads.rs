//! Request payloads
//!
//! Every `*Changes` struct mirrors one record with all fields optional. An
//! absent field leaves the stored value untouched on update; on create the
//! required fields must be present and the rest fall back to column defaults.

use super::catalog::{
    Client, DataAsset, DataAssetInstance, DataIngest, DataProvider, Domain, FileFormat, Schema,
    SchemaColumn, SftpSource,
};
use super::enums::*;
use super::metadata::PipelineTask;
use crate::db::store::Record;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::borrow::Cow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

/// Partial field set for one record type
pub trait Changes: Validate + Send {
    type Target: Record;

    /// Id of the row to update, or the id to create the row with
    fn id(&self) -> Option<i32>;

    /// Build a new row, failing when a required field is missing
    fn into_new(self) -> Result<Self::Target, AppError>;

    /// Overwrite the fields present in this change set
    fn apply(self, target: &mut Self::Target);
}

pub(crate) fn required_error() -> ValidationError {
    ValidationError::new("required").with_message(Cow::Borrowed("Missing data for required field."))
}

macro_rules! changes {
    (
        $(#[$meta:meta])*
        pub struct $name:ident => $target:ident {
            required { $( $(#[$rmeta:meta])* $req:ident : $rty:ty ),* $(,)? }
            defaults { $( $(#[$dmeta:meta])* $def:ident : $dty:ty = $dval:expr ),* $(,)? }
            optional { $( $(#[$ometa:meta])* $opt:ident : $oty:ty ),* $(,)? }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
        pub struct $name {
            pub id: Option<i32>,
            $( $(#[$rmeta])* pub $req: Option<$rty>, )*
            $( $(#[$dmeta])* pub $def: Option<$dty>, )*
            $( $(#[$ometa])* pub $opt: Option<$oty>, )*
        }

        impl Changes for $name {
            type Target = $target;

            fn id(&self) -> Option<i32> {
                self.id
            }

            fn into_new(self) -> Result<$target, AppError> {
                let now = Utc::now();
                match ( $( self.$req, )* ) {
                    ( $( Some($req), )* ) => Ok($target {
                        id: 0,
                        $( $req, )*
                        $( $def: self.$def.unwrap_or_else(|| $dval), )*
                        $( $opt: self.$opt, )*
                        created_at: now,
                        updated_at: now,
                    }),
                    ( $( $req, )* ) => {
                        let mut errors = ValidationErrors::new();
                        $(
                            if $req.is_none() {
                                errors.add(stringify!($req), required_error());
                            }
                        )*
                        Err(errors.into())
                    }
                }
            }

            fn apply(self, target: &mut $target) {
                $( if let Some(value) = self.$req { target.$req = value; } )*
                $( if let Some(value) = self.$def { target.$def = value; } )*
                $( if let Some(value) = self.$opt { target.$opt = Some(value); } )*
            }
        }
    };
}

fn validate_object(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new("object").with_message(Cow::Borrowed("Not a valid mapping type.")))
    }
}

changes! {
    pub struct DomainChanges => Domain {
        required {
            #[validate(length(min = 1, max = 256))]
            name: String,
            #[validate(length(min = 1, max = 256))]
            database: String,
            #[validate(length(min = 1, max = 256))]
            db_schema: String,
        }
        defaults {}
        optional {}
    }
}

changes! {
    pub struct DataProviderChanges => DataProvider {
        required {
            #[validate(length(min = 1, max = 256))]
            name: String,
        }
        defaults {}
        optional {
            #[serde(rename = "type")]
            #[validate(length(max = 256))]
            kind: String,
            #[validate(length(max = 256))]
            contact_name: String,
            #[validate(length(max = 256))]
            contact_email: String,
        }
    }
}

changes! {
    pub struct ClientChanges => Client {
        required {
            #[validate(length(min = 1, max = 256))]
            name: String,
        }
        defaults {
            is_active: bool = true,
        }
        optional {}
    }
}

changes! {
    pub struct SftpSourceChanges => SftpSource {
        required {
            #[validate(length(min = 1, max = 256))]
            host: String,
            #[validate(length(min = 1, max = 256))]
            user: String,
            #[validate(length(max = 256))]
            passphrase: String,
            #[validate(length(min = 1, max = 256))]
            source_path: String,
        }
        defaults {
            #[validate(range(min = 1, max = 65535))]
            port: i32 = DEFAULT_SFTP_PORT,
        }
        optional {
            backup_dir: String,
        }
    }
}

changes! {
    pub struct SchemaChanges => Schema {
        required {
            #[serde(rename = "type")]
            kind: SchemaType,
        }
        defaults {}
        optional {}
    }
}

changes! {
    pub struct SchemaColumnChanges => SchemaColumn {
        required {
            schema_id: i32,
            #[validate(length(min = 1, max = 256))]
            column_name: String,
            #[validate(length(min = 1, max = 256))]
            data_type: String,
        }
        defaults {
            tags: Vec<String> = Vec::new(),
            is_custom_column: bool = false,
            is_nullable: bool = true,
            is_foreign_key: bool = false,
            is_primary_key: bool = false,
        }
        optional {
            column_number: i32,
        }
    }
}

changes! {
    pub struct FileFormatChanges => FileFormat {
        required {
            #[validate(length(min = 1, max = 256))]
            name: String,
            format_type: FileFormatType,
        }
        defaults {
            compression: CompressionAlgorithm = CompressionAlgorithm::default(),
            #[validate(length(max = 32))]
            column_separator: String = FIELD_DELIMITER.to_string(),
            #[validate(length(max = 32))]
            row_separator: String = ROW_DELIMITER.to_string(),
            #[validate(length(max = 32))]
            null_string: String = NULL_IF.to_string(),
            is_trimmed: bool = false,
            skip_header_lines: i32 = DEFAULT_HEADER_LINES,
            is_column_mismatch_error_raised: bool = true,
            escape_unenclosed_field: String = ESCAPE_UNENCLOSED_FIELD.to_string(),
            date_format: String = DEFAULT_DATE_TIMESTAMP_FORMAT.to_string(),
            timestamp_format: String = DEFAULT_DATE_TIMESTAMP_FORMAT.to_string(),
            is_active: bool = true,
            is_global: bool = false,
        }
        optional {
            #[validate(length(max = 128))]
            escape_character: String,
        }
    }
}

changes! {
    pub struct DataIngestChanges => DataIngest {
        required {
            #[validate(length(min = 1, max = 256))]
            name: String,
            #[validate(length(min = 1, max = 256))]
            source_name: String,
        }
        defaults {
            auto_ingest: bool = false,
        }
        optional {
            aws_sns_topic: String,
            comment: String,
            error_integration: String,
        }
    }
}

changes! {
    pub struct DataAssetChanges => DataAsset {
        required {
            domain_id: i32,
            schema_id: i32,
            #[validate(length(min = 1, max = 256))]
            name: String,
            #[validate(length(min = 1, max = 256))]
            s3_bucket: String,
            #[validate(length(min = 1, max = 1025))]
            s3_partition_path: String,
            #[validate(length(min = 1, max = 256))]
            instance_default_database: String,
            #[validate(length(min = 1, max = 256))]
            instance_default_db_schema: String,
        }
        defaults {
            #[validate(length(max = 1025))]
            s3_path_prefix: String = INSTANCE_PATH_PREFIX.to_string(),
        }
        optional {
            description: String,
        }
    }
}

changes! {
    pub struct DataAssetInstanceChanges => DataAssetInstance {
        required {
            data_asset_id: i32,
            file_format_id: i32,
            schema_id: i32,
            client_id: i32,
            data_provider_id: i32,
            source_type: SourceType,
            #[validate(length(min = 1, max = 256))]
            name: String,
            #[validate(length(min = 1, max = 256))]
            materialization_type: String,
            schedule_type: ScheduleType,
        }
        defaults {
            tags: Vec<String> = Vec::new(),
            one_off: bool = false,
            enabled: bool = true,
        }
        optional {
            data_ingest_id: i32,
            source_id: i32,
            description: String,
            database: String,
            db_schema: String,
            stage_name: String,
            start_time: DateTime<Utc>,
            expires: DateTime<Utc>,
            schedule_cron: String,
        }
    }
}

changes! {
    /// Pipeline task fields accepted on create and on partial update
    pub struct PipelineTaskChanges => PipelineTask {
        required {
            #[validate(length(min = 1, max = 256))]
            service_name: String,
            task_type: PipelineTaskType,
        }
        defaults {
            state: PipelineTaskState = PipelineTaskState::default(),
            started_at: DateTime<Utc> = Utc::now(),
        }
        optional {
            data_asset_instance_id: i32,
            data_asset_id: i32,
            #[validate(length(max = 256))]
            external_id: String,
            status: PipelineTaskStatus,
            #[schema(value_type = Option<Object>)]
            #[validate(custom(function = "validate_object"))]
            extra_info: serde_json::Value,
            ended_at: DateTime<Utc>,
        }
    }
}

impl PipelineTaskChanges {
    /// A new task must point at a data asset or one of its instances
    pub fn validate_target(&self) -> Result<(), ValidationErrors> {
        if self.data_asset_id.is_none() && self.data_asset_instance_id.is_none() {
            let mut errors = ValidationErrors::new();
            errors.add(
                "data_asset_instance_id",
                ValidationError::new("target").with_message(Cow::Borrowed(
                    "Either data asset instance or data asset is required",
                )),
            );
            return Err(errors);
        }
        Ok(())
    }
}

/// Collects the errors of a nested payload. The flattened part reports at
/// the top level, matching the keys of the document it was read from.
struct NestedErrors(ValidationErrors);

impl NestedErrors {
    fn new() -> Self {
        Self(ValidationErrors::new())
    }

    fn flattened(&mut self, result: Result<(), ValidationErrors>) -> &mut Self {
        if let Err(errors) = result {
            self.0.errors_mut().extend(errors.into_errors());
        }
        self
    }

    fn field(&mut self, name: &'static str, value: Option<&impl Validate>) -> &mut Self {
        if let Some(value) = value {
            self.0.merge_self(name, value.validate());
        }
        self
    }

    fn finish(&mut self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.0))
        }
    }
}

/// Schema with its columns
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SchemaPayload {
    #[serde(flatten)]
    pub schema: SchemaChanges,
    #[serde(default)]
    pub columns: Vec<SchemaColumnChanges>,
}

impl Validate for SchemaPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        NestedErrors::new()
            .flattened(self.schema.validate())
            .field("columns", Some(&self.columns))
            .finish()
    }
}

/// Data asset with its domain and optional schema
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DataAssetPayload {
    #[serde(flatten)]
    pub asset: DataAssetChanges,
    pub domain: DomainChanges,
    pub schema: Option<SchemaPayload>,
}

impl Validate for DataAssetPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        NestedErrors::new()
            .flattened(self.asset.validate())
            .field("domain", Some(&self.domain))
            .field("schema", self.schema.as_ref())
            .finish()
    }
}

/// Nested document accepted by the instance upsert endpoint
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DataAssetInstancePayload {
    #[serde(flatten)]
    pub instance: DataAssetInstanceChanges,
    pub data_asset: DataAssetPayload,
    pub client: ClientChanges,
    pub data_provider: DataProviderChanges,
    pub file_format: Option<FileFormatChanges>,
    pub data_ingest: Option<DataIngestChanges>,
    pub schema: Option<SchemaPayload>,
    pub source: Option<SftpSourceChanges>,
}

impl Validate for DataAssetInstancePayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        NestedErrors::new()
            .flattened(self.instance.validate())
            .field("data_asset", Some(&self.data_asset))
            .field("client", Some(&self.client))
            .field("data_provider", Some(&self.data_provider))
            .field("file_format", self.file_format.as_ref())
            .field("data_ingest", self.data_ingest.as_ref())
            .field("schema", self.schema.as_ref())
            .field("source", self.source.as_ref())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_into_new_applies_defaults() {
        let changes: FileFormatChanges =
            serde_json::from_value(json!({"name": "csv_default", "format_type": "CSV"})).unwrap();
        let format = changes.into_new().unwrap();

        assert_eq!(format.compression, CompressionAlgorithm::Auto);
        assert_eq!(format.column_separator, ",");
        assert_eq!(format.row_separator, "\\n");
        assert_eq!(format.null_string, "\\\\N");
        assert_eq!(format.skip_header_lines, 1);
        assert!(format.is_column_mismatch_error_raised);
        assert!(!format.is_trimmed);
        assert_eq!(format.date_format, "AUTO");
        assert_eq!(format.escape_character, None);
    }

    #[test]
    fn test_into_new_reports_missing_fields() {
        let changes = DomainChanges {
            name: Some("finance".to_string()),
            ..Default::default()
        };
        let err = changes.into_new().unwrap_err();

        match err {
            AppError::InvalidPayload(errors) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("database"));
                assert!(fields.contains_key("db_schema"));
                assert!(!fields.contains_key("name"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut client = ClientChanges {
            name: Some("acme".to_string()),
            ..Default::default()
        }
        .into_new()
        .unwrap();
        assert!(client.is_active);

        ClientChanges {
            is_active: Some(false),
            ..Default::default()
        }
        .apply(&mut client);

        assert_eq!(client.name, "acme");
        assert!(!client.is_active);
    }

    #[test]
    fn test_sftp_port_default_and_range() {
        let source = SftpSourceChanges {
            host: Some("sftp.example.com".to_string()),
            user: Some("loader".to_string()),
            passphrase: Some("secret".to_string()),
            source_path: Some("/outbound".to_string()),
            ..Default::default()
        };
        assert!(source.validate().is_ok());
        assert_eq!(source.clone().into_new().unwrap().port, 22);

        let invalid = SftpSourceChanges {
            port: Some(70000),
            ..source
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_nested_instance_payload() {
        let payload: DataAssetInstancePayload = serde_json::from_value(json!({
            "id": 12,
            "name": "claims_acme",
            "materialization_type": "TABLE",
            "schedule_type": "CRON",
            "schedule_cron": "0 6 * * *",
            "data_asset": {
                "id": 4,
                "domain": {"id": 1},
                "schema": {"type": "ASSET", "columns": [{"column_name": "claim_id", "data_type": "NUMBER"}]}
            },
            "client": {"name": "acme"},
            "data_provider": {"name": "provider one", "type": "vendor"},
            "source": {"host": "h", "user": "u", "passphrase": "p", "source_path": "/in"}
        }))
        .unwrap();

        assert_eq!(payload.instance.id, Some(12));
        assert_eq!(payload.instance.schedule_type, Some(ScheduleType::Cron));
        assert_eq!(payload.data_asset.asset.id, Some(4));
        assert_eq!(payload.data_asset.domain.id, Some(1));
        let schema = payload.data_asset.schema.as_ref().unwrap();
        assert_eq!(schema.schema.kind, Some(SchemaType::Asset));
        assert_eq!(schema.columns.len(), 1);
        assert_eq!(payload.data_provider.kind.as_deref(), Some("vendor"));
        assert!(payload.file_format.is_none());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_nested_errors_keyed_like_the_document() {
        let payload: DataAssetInstancePayload = serde_json::from_value(json!({
            "name": "",
            "data_asset": {
                "name": "",
                "domain": {"id": 1},
                "schema": {"columns": [{"column_name": "ok"}, {"column_name": ""}]}
            },
            "client": {"name": "acme"},
            "data_provider": {"name": "p"},
            "source": {"port": 0}
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        let details = serde_json::to_value(&errors).unwrap();

        assert!(details.get("instance").is_none());
        assert!(details.get("name").is_some());
        assert!(details["data_asset"].get("asset").is_none());
        assert!(details["data_asset"].get("name").is_some());
        let columns = &details["data_asset"]["schema"]["columns"];
        assert!(columns.get("0").is_none());
        assert!(columns.get("1").is_some());
        assert!(details["source"].get("port").is_some());
        assert!(details.get("client").is_none());
    }

    #[test]
    fn test_contact_email_is_free_text() {
        let provider = DataProviderChanges {
            name: Some("clearinghouse".to_string()),
            contact_email: Some("ops team".to_string()),
            ..Default::default()
        };
        assert!(provider.validate().is_ok());

        let too_long = DataProviderChanges {
            contact_email: Some("x".repeat(257)),
            ..provider
        };
        assert!(too_long.validate().unwrap_err().field_errors().contains_key("contact_email"));
    }

    #[test]
    fn test_instance_payload_requires_data_asset() {
        let result = serde_json::from_value::<DataAssetInstancePayload>(json!({
            "client": {"name": "acme"},
            "data_provider": {"name": "p"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_pipeline_task_target() {
        let changes = PipelineTaskChanges {
            service_name: Some("ingest".to_string()),
            task_type: Some(PipelineTaskType::DataIngest),
            ..Default::default()
        };
        let errors = changes.validate_target().unwrap_err();
        assert!(errors.field_errors().contains_key("data_asset_instance_id"));

        let changes = PipelineTaskChanges {
            data_asset_id: Some(2),
            ..changes
        };
        assert!(changes.validate_target().is_ok());
        let task = changes.into_new().unwrap();
        assert_eq!(task.state, PipelineTaskState::Queued);
    }

    #[test]
    fn test_extra_info_must_be_object() {
        let changes: PipelineTaskChanges =
            serde_json::from_value(json!({"extra_info": ["not", "a", "map"]})).unwrap();
        assert!(changes.validate().is_err());

        let changes: PipelineTaskChanges =
            serde_json::from_value(json!({"extra_info": {"rows": 10}})).unwrap();
        assert!(changes.validate().is_ok());
    }
}
