//! Catalog service layer
//!
//! Reconciles nested upsert payloads against the store and assembles the
//! nested views returned by the API. Everything here is written against
//! [`CatalogStore`] so a request can run on a pooled connection or inside a
//! single transaction.

use crate::db::store::{get_or_404, CatalogStore, ListQuery, Record, SortOrder};
use crate::error::AppError;
use crate::models::{
    Changes, Client, DataAsset, DataAssetInstance, DataAssetInstancePayload, DataAssetInstanceView,
    DataAssetPayload, DataAssetSummary, DataAssetView, DataIngest, DataProvider, Domain, FileFormat,
    Function, FunctionArgument, FunctionMapping, FunctionMappingView, FunctionView, InstanceDetail,
    PipelineTask, PipelineTaskChanges, Schema, SchemaColumn, SchemaPayload, SchemaView, SftpSource,
    SourceType,
};
use crate::pagination::{Page, PageParams};
use tracing::{debug, info};
use validator::Validate;

/// Update the row named by `id` with the fields present, or create it.
///
/// A soft-deleted row with that id is restored, then updated. A supplied id
/// that matches no row at all becomes the id of the new row.
pub async fn upsert_by_id<S, C>(store: &mut S, changes: C) -> Result<C::Target, AppError>
where
    S: CatalogStore,
    C: Changes,
{
    let id = changes.id();
    if let Some(id) = id {
        let existing = match store.fetch::<C::Target>(id).await? {
            Some(row) => Some(row),
            None => store.restore::<C::Target>(id).await?,
        };
        if let Some(mut existing) = existing {
            changes.apply(&mut existing);
            debug!(table = <C::Target as Record>::TABLE, id, "Updating existing row");
            return store.update(existing).await;
        }
    }

    let record = changes.into_new()?;
    store.insert(record, id).await
}

/// Upsert a schema, then each of its columns
pub async fn upsert_schema<S: CatalogStore>(store: &mut S, payload: SchemaPayload) -> Result<Schema, AppError> {
    let schema = upsert_by_id(store, payload.schema).await?;
    for mut column in payload.columns {
        column.schema_id = Some(schema.id);
        upsert_by_id(store, column).await?;
    }
    Ok(schema)
}

/// Upsert a data asset together with its domain and, when given, its schema
pub async fn upsert_data_asset<S: CatalogStore>(
    store: &mut S,
    payload: DataAssetPayload,
) -> Result<DataAsset, AppError> {
    let mut asset = payload.asset;

    let domain = upsert_by_id(store, payload.domain).await?;
    asset.domain_id = Some(domain.id);

    if let Some(schema) = payload.schema {
        asset.schema_id = Some(upsert_schema(store, schema).await?.id);
    }

    upsert_by_id(store, asset).await
}

/// Walk the nested instance document, upserting every sub-resource before
/// the instance itself.
pub async fn upsert_data_asset_instance<S: CatalogStore>(
    store: &mut S,
    payload: DataAssetInstancePayload,
) -> Result<DataAssetInstance, AppError> {
    payload.validate()?;
    let mut instance = payload.instance;

    instance.data_asset_id = Some(upsert_data_asset(store, payload.data_asset).await?.id);
    instance.client_id = Some(upsert_by_id(store, payload.client).await?.id);
    instance.data_provider_id = Some(upsert_by_id(store, payload.data_provider).await?.id);

    if let Some(file_format) = payload.file_format {
        instance.file_format_id = Some(upsert_by_id(store, file_format).await?.id);
    }
    if let Some(data_ingest) = payload.data_ingest {
        instance.data_ingest_id = Some(upsert_by_id(store, data_ingest).await?.id);
    }
    if let Some(schema) = payload.schema {
        instance.schema_id = Some(upsert_schema(store, schema).await?.id);
    }
    if let Some(source) = payload.source {
        let source = upsert_by_id(store, source).await?;
        instance.source_type = Some(SourceType::Sftp);
        instance.source_id = Some(source.id);
    }

    let instance = upsert_by_id(store, instance).await?;
    info!(
        id = instance.id,
        data_asset_id = instance.data_asset_id,
        name = %instance.name,
        "Upserted data asset instance"
    );
    Ok(instance)
}

/// One page of a flat record type, newest first
pub async fn list_records<R: Record, S: CatalogStore>(
    store: &mut S,
    params: &PageParams,
) -> Result<Page<R>, AppError> {
    let (records, total) = store
        .list::<R>(&ListQuery::new(params, SortOrder::NewestFirst))
        .await?;
    Ok(Page::new(params, records, total))
}

pub async fn load_schema<S: CatalogStore>(store: &mut S, id: i32) -> Result<SchemaView, AppError> {
    let schema = get_or_404::<Schema, _>(store, id).await?;
    let mut columns = store.find_by::<SchemaColumn>("schema_id", id).await?;
    columns.sort_by_key(|c| (c.column_number.is_none(), c.column_number, c.id));
    Ok(SchemaView::new(schema, columns))
}

async fn data_asset_view<S: CatalogStore>(
    store: &mut S,
    asset: DataAsset,
    with_schema: bool,
) -> Result<DataAssetView, AppError> {
    let domain = get_or_404::<Domain, _>(store, asset.domain_id).await?;
    let schema = if with_schema {
        Some(load_schema(store, asset.schema_id).await?)
    } else {
        None
    };
    Ok(DataAssetView::new(asset, &domain, schema))
}

pub async fn get_data_asset<S: CatalogStore>(store: &mut S, id: i32) -> Result<DataAssetView, AppError> {
    let asset = get_or_404::<DataAsset, _>(store, id).await?;
    data_asset_view(store, asset, true).await
}

pub async fn list_data_assets<S: CatalogStore>(
    store: &mut S,
    params: &PageParams,
) -> Result<Page<DataAssetView>, AppError> {
    let page = list_records::<DataAsset, _>(store, params).await?;
    let mut results = Vec::with_capacity(page.results.len());
    for asset in page.results {
        results.push(data_asset_view(store, asset, false).await?);
    }
    Ok(Page {
        pagination: page.pagination,
        results,
    })
}

async fn instance_view<S: CatalogStore>(
    store: &mut S,
    instance: DataAssetInstance,
    with_detail: bool,
) -> Result<DataAssetInstanceView, AppError> {
    let asset = get_or_404::<DataAsset, _>(store, instance.data_asset_id).await?;
    let domain = get_or_404::<Domain, _>(store, asset.domain_id).await?;
    let client = get_or_404::<Client, _>(store, instance.client_id).await?;
    let provider = get_or_404::<DataProvider, _>(store, instance.data_provider_id).await?;

    let detail = if with_detail {
        let data_ingest = match instance.data_ingest_id {
            Some(id) => store.fetch::<DataIngest>(id).await?.map(Into::into),
            None => None,
        };
        Some(InstanceDetail {
            data_ingest,
            file_format: get_or_404::<FileFormat, _>(store, instance.file_format_id).await?,
            schema: load_schema(store, instance.schema_id).await?,
        })
    } else {
        None
    };

    Ok(DataAssetInstanceView::new(
        instance,
        DataAssetSummary::new(asset, &domain),
        &client,
        &provider,
        detail,
    ))
}

pub async fn get_data_asset_instance<S: CatalogStore>(
    store: &mut S,
    id: i32,
) -> Result<DataAssetInstanceView, AppError> {
    let instance = get_or_404::<DataAssetInstance, _>(store, id).await?;
    instance_view(store, instance, true).await
}

pub async fn list_data_asset_instances<S: CatalogStore>(
    store: &mut S,
    params: &PageParams,
) -> Result<Page<DataAssetInstanceView>, AppError> {
    let page = list_records::<DataAssetInstance, _>(store, params).await?;
    let mut results = Vec::with_capacity(page.results.len());
    for instance in page.results {
        results.push(instance_view(store, instance, false).await?);
    }
    Ok(Page {
        pagination: page.pagination,
        results,
    })
}

/// SFTP source a data asset instance pulls from
pub async fn get_data_asset_instance_source<S: CatalogStore>(
    store: &mut S,
    id: i32,
) -> Result<SftpSource, AppError> {
    let instance = get_or_404::<DataAssetInstance, _>(store, id).await?;
    let source_id = instance
        .source_id
        .ok_or_else(|| AppError::NotFound(format!("DataAssetInstance {} has no source", id)))?;
    get_or_404::<SftpSource, _>(store, source_id).await
}

/// Function mappings of one instance, by ascending `seq_num`
pub async fn list_function_mappings<S: CatalogStore>(
    store: &mut S,
    instance_id: i32,
    params: &PageParams,
) -> Result<Page<FunctionMappingView>, AppError> {
    get_or_404::<DataAssetInstance, _>(store, instance_id).await?;

    let query = ListQuery::new(params, SortOrder::Ascending("seq_num"))
        .filter("data_asset_instance_id", instance_id);
    let (mappings, total) = store.list::<FunctionMapping>(&query).await?;

    let mut results = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let function = get_or_404::<Function, _>(store, mapping.function_id).await?;
        let arguments = store
            .find_by::<FunctionArgument>("function_id", function.id)
            .await?;
        results.push(FunctionMappingView::new(
            mapping,
            FunctionView::new(function, arguments),
        ));
    }

    Ok(Page::new(params, results, total))
}

pub async fn create_pipeline_task<S: CatalogStore>(
    store: &mut S,
    changes: PipelineTaskChanges,
) -> Result<PipelineTask, AppError> {
    changes.validate()?;
    changes.validate_target()?;

    let id = changes.id;
    let task = store.insert(changes.into_new()?, id).await?;
    info!(
        id = task.id,
        service = %task.service_name,
        task_type = %task.task_type,
        "Pipeline task created"
    );
    Ok(task)
}

/// Apply a partial update to a pipeline task
pub async fn update_pipeline_task<S: CatalogStore>(
    store: &mut S,
    id: i32,
    mut changes: PipelineTaskChanges,
) -> Result<PipelineTask, AppError> {
    changes.validate()?;
    // the path decides which row is updated
    changes.id = None;

    let mut task = get_or_404::<PipelineTask, _>(store, id).await?;
    changes.apply(&mut task);
    let task = store.update(task).await?;
    debug!(id, state = %task.state, "Pipeline task updated");
    Ok(task)
}
