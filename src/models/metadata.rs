//! Metadata schema records

use super::enums::{PipelineTaskState, PipelineTaskStatus, PipelineTaskType};
use crate::db::store::record;
use chrono::{DateTime, Utc};

record! {
    /// Execution log entry written by downstream ingestion and transform services
    pub struct PipelineTask in "metadata.pipelinetask" as "PipelineTask" {
        pub data_asset_instance_id: Option<i32>,
        pub data_asset_id: Option<i32>,
        pub external_id: Option<String>,
        pub service_name: String,
        pub task_type: PipelineTaskType,
        pub state: PipelineTaskState,
        pub status: Option<PipelineTaskStatus>,
        #[schema(value_type = Option<Object>)]
        pub extra_info: Option<serde_json::Value>,
        pub started_at: DateTime<Utc>,
        pub ended_at: Option<DateTime<Utc>>,
    }
    keys [data_asset_instance_id, data_asset_id]
}
