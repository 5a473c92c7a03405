//! Catalog enumerations and column defaults
//!
//! Every enumeration is stored as TEXT and travels over the wire as its
//! upper-case name.

use bytes::BytesMut;
use postgres_types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Storage prefix template for the files of a data asset instance
pub const INSTANCE_PATH_PREFIX: &str = "{data_provider}/{data_asset}/{client_name}/";

// File format defaults
pub const FIELD_DELIMITER: &str = ",";
pub const ROW_DELIMITER: &str = r"\n";
pub const NULL_IF: &str = r"\\N";
pub const DEFAULT_HEADER_LINES: i32 = 1;
pub const ESCAPE_UNENCLOSED_FIELD: &str = r"\\";
pub const DEFAULT_DATE_TIMESTAMP_FORMAT: &str = "AUTO";

/// Default SFTP port
pub const DEFAULT_SFTP_PORT: i32 = 22;

/// Raised when a stored or submitted name has no matching variant
#[derive(Debug, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(
                &self,
                ty: &Type,
                out: &mut BytesMut,
            ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
                self.as_str().to_sql(ty, out)
            }

            accepts!(TEXT, VARCHAR);
            to_sql_checked!();
        }

        impl<'a> FromSql<'a> for $name {
            fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
                let text = <&str as FromSql>::from_sql(ty, raw)?;
                Ok(text.parse::<$name>()?)
            }

            accepts!(TEXT, VARCHAR);
        }
    };
}

text_enum! {
    /// Whether a schema describes an asset or one of its instances
    pub enum SchemaType {
        Asset => "ASSET",
        Instance => "INSTANCE",
    }
}

text_enum! {
    pub enum FileFormatType {
        Csv => "CSV",
        Json => "JSON",
        Avro => "AVRO",
        Orc => "ORC",
        Parquet => "PARQUET",
        Xml => "XML",
    }
}

text_enum! {
    pub enum CompressionAlgorithm {
        Auto => "AUTO",
        Gzip => "GZIP",
        Bz2 => "BZ2",
        Brotli => "BROTLI",
        Zstd => "ZSTD",
        Deflate => "DEFLATE",
        RawDeflate => "RAW_DEFLATE",
        Uncompressed => "NONE",
    }
}

text_enum! {
    /// How a data asset instance gets triggered
    pub enum ScheduleType {
        Event => "EVENT",
        Cron => "CRON",
    }
}

text_enum! {
    /// Language a catalog function is written in
    pub enum CodeLanguage {
        Sql => "SQL",
    }
}

text_enum! {
    /// Kind of external source a data asset instance pulls from
    pub enum SourceType {
        Sftp => "SFTPSource",
    }
}

text_enum! {
    /// Tasks that downstream services perform
    pub enum PipelineTaskType {
        Transfer => "TRANSFER",
        DataIngest => "DATA_INGEST",
        Transform => "TRANSFORM",
        // warehouse DDL
        CreateFileFormat => "CREATE_FILE_FORMAT",
        CreateStage => "CREATE_STAGE",
        CreateSnowpipe => "CREATE_SNOWPIPE",
        CreateTable => "CREATE_TABLE",
        AlterFileFormat => "ALTER_FILE_FORMAT",
        AlterStage => "ALTER_STAGE",
        AlterSnowpipe => "ALTER_SNOWPIPE",
        AlterTable => "ALTER_TABLE",
    }
}

text_enum! {
    /// Lifecycle state of a pipeline task
    pub enum PipelineTaskState {
        Queued => "QUEUED",
        Running => "RUNNING",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
        Completed => "COMPLETED",
    }
}

text_enum! {
    /// Outcome of a finished pipeline task
    pub enum PipelineTaskStatus {
        Success => "SUCCESS",
        PartialSuccess => "PARTIAL_SUCCESS",
        Failed => "FAILED",
    }
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        CompressionAlgorithm::Auto
    }
}

impl Default for CodeLanguage {
    fn default() -> Self {
        CodeLanguage::Sql
    }
}

impl Default for PipelineTaskState {
    fn default() -> Self {
        PipelineTaskState::Queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&CompressionAlgorithm::RawDeflate).unwrap(),
            "\"RAW_DEFLATE\""
        );
        assert_eq!(
            serde_json::from_str::<SchemaType>("\"ASSET\"").unwrap(),
            SchemaType::Asset
        );
        assert_eq!(SourceType::Sftp.to_string(), "SFTPSource");
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let err = "DONE".parse::<PipelineTaskState>().unwrap_err();
        assert_eq!(err.to_string(), "'DONE' is not a valid PipelineTaskState");
        assert!(serde_json::from_str::<ScheduleType>("\"cron\"").is_err());
    }

    #[test]
    fn test_every_variant_parses_back() {
        for task_type in PipelineTaskType::ALL {
            assert_eq!(task_type.as_str().parse::<PipelineTaskType>().unwrap(), *task_type);
        }
    }

    #[test]
    fn test_file_format_defaults() {
        assert_eq!(ROW_DELIMITER.len(), 2);
        assert_eq!(NULL_IF, "\\\\N");
        assert_eq!(ESCAPE_UNENCLOSED_FIELD, "\\\\");
        assert_eq!(CompressionAlgorithm::default(), CompressionAlgorithm::Auto);
    }
}
