//! Catalog schema bootstrap
//!
//! Statements are idempotent and run in order on every startup.

use deadpool_postgres::Pool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS configuration",
    "CREATE SCHEMA IF NOT EXISTS metadata",
    "CREATE TABLE IF NOT EXISTS configuration.domain (
        id SERIAL PRIMARY KEY,
        name VARCHAR(256) NOT NULL UNIQUE,
        database VARCHAR(256) NOT NULL,
        db_schema VARCHAR(256) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.dataprovider (
        id SERIAL PRIMARY KEY,
        name VARCHAR(256) NOT NULL,
        kind VARCHAR(256),
        contact_name VARCHAR(256),
        contact_email VARCHAR(256),
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.client (
        id SERIAL PRIMARY KEY,
        name VARCHAR(256) NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT true,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.sftpsource (
        id SERIAL PRIMARY KEY,
        host VARCHAR(256) NOT NULL,
        port INTEGER NOT NULL DEFAULT 22,
        \"user\" VARCHAR(256) NOT NULL,
        passphrase VARCHAR(256) NOT NULL,
        source_path VARCHAR(256) NOT NULL,
        backup_dir VARCHAR(256),
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.schema (
        id SERIAL PRIMARY KEY,
        kind TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.schemacolumn (
        id SERIAL PRIMARY KEY,
        schema_id INTEGER NOT NULL REFERENCES configuration.schema(id),
        column_number INTEGER,
        column_name VARCHAR(256) NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        data_type VARCHAR(256) NOT NULL,
        is_custom_column BOOLEAN NOT NULL DEFAULT false,
        is_nullable BOOLEAN NOT NULL DEFAULT true,
        is_foreign_key BOOLEAN NOT NULL DEFAULT false,
        is_primary_key BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.fileformat (
        id SERIAL PRIMARY KEY,
        name VARCHAR(256) NOT NULL,
        format_type TEXT NOT NULL,
        compression TEXT NOT NULL DEFAULT 'AUTO',
        column_separator VARCHAR(32) NOT NULL DEFAULT ',',
        row_separator VARCHAR(32) NOT NULL DEFAULT '\\n',
        null_string VARCHAR(32) NOT NULL,
        is_trimmed BOOLEAN NOT NULL DEFAULT false,
        skip_header_lines INTEGER NOT NULL DEFAULT 1,
        is_column_mismatch_error_raised BOOLEAN NOT NULL DEFAULT true,
        escape_character VARCHAR(128),
        escape_unenclosed_field VARCHAR(128) NOT NULL DEFAULT '\\\\',
        date_format VARCHAR(256) NOT NULL,
        timestamp_format VARCHAR(256) NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT true,
        is_global BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.dataingest (
        id SERIAL PRIMARY KEY,
        name VARCHAR(256) NOT NULL,
        source_name VARCHAR(256) NOT NULL,
        auto_ingest BOOLEAN NOT NULL DEFAULT false,
        aws_sns_topic VARCHAR(256),
        comment TEXT,
        error_integration TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.dataasset (
        id SERIAL PRIMARY KEY,
        domain_id INTEGER NOT NULL REFERENCES configuration.domain(id),
        schema_id INTEGER NOT NULL REFERENCES configuration.schema(id),
        name VARCHAR(256) NOT NULL,
        description TEXT,
        s3_bucket VARCHAR(256) NOT NULL,
        s3_path_prefix VARCHAR(1025) NOT NULL DEFAULT '{data_provider}/{data_asset}/{client_name}/',
        s3_partition_path VARCHAR(1025) NOT NULL,
        instance_default_database VARCHAR(256) NOT NULL,
        instance_default_db_schema VARCHAR(256) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.dataassetinstance (
        id SERIAL PRIMARY KEY,
        data_asset_id INTEGER NOT NULL REFERENCES configuration.dataasset(id),
        file_format_id INTEGER NOT NULL REFERENCES configuration.fileformat(id),
        schema_id INTEGER NOT NULL REFERENCES configuration.schema(id),
        client_id INTEGER NOT NULL REFERENCES configuration.client(id),
        data_provider_id INTEGER NOT NULL REFERENCES configuration.dataprovider(id),
        data_ingest_id INTEGER REFERENCES configuration.dataingest(id),
        source_type VARCHAR(255) NOT NULL,
        source_id INTEGER,
        name VARCHAR(256) NOT NULL,
        description TEXT,
        database VARCHAR(256),
        db_schema VARCHAR(256),
        materialization_type VARCHAR(256) NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        stage_name VARCHAR(256),
        start_time TIMESTAMPTZ,
        expires TIMESTAMPTZ,
        one_off BOOLEAN NOT NULL DEFAULT false,
        enabled BOOLEAN NOT NULL DEFAULT true,
        schedule_type TEXT NOT NULL,
        schedule_cron VARCHAR(256),
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.function (
        id SERIAL PRIMARY KEY,
        name VARCHAR(1024) NOT NULL,
        description TEXT,
        code TEXT NOT NULL,
        code_language TEXT NOT NULL DEFAULT 'SQL',
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.functionargument (
        id SERIAL PRIMARY KEY,
        function_id INTEGER NOT NULL REFERENCES configuration.function(id),
        name VARCHAR(256) NOT NULL,
        description TEXT,
        default_value VARCHAR(256),
        data_type VARCHAR(256) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configuration.functionmapping (
        id SERIAL PRIMARY KEY,
        data_asset_instance_id INTEGER NOT NULL REFERENCES configuration.dataassetinstance(id),
        function_id INTEGER NOT NULL REFERENCES configuration.function(id),
        argument_value JSONB,
        alias_name VARCHAR(256),
        seq_num INTEGER NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS metadata.pipelinetask (
        id SERIAL PRIMARY KEY,
        data_asset_instance_id INTEGER REFERENCES configuration.dataassetinstance(id),
        data_asset_id INTEGER REFERENCES configuration.dataasset(id),
        external_id VARCHAR(256),
        service_name VARCHAR(256) NOT NULL,
        task_type TEXT NOT NULL,
        state TEXT NOT NULL DEFAULT 'QUEUED',
        status TEXT,
        extra_info JSONB,
        started_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        ended_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        deleted_at TIMESTAMPTZ
    )",
    "CREATE INDEX IF NOT EXISTS idx_schemacolumn_schema_id ON configuration.schemacolumn(schema_id)",
    "CREATE INDEX IF NOT EXISTS idx_functionargument_function_id ON configuration.functionargument(function_id)",
    "CREATE INDEX IF NOT EXISTS idx_functionmapping_instance_id ON configuration.functionmapping(data_asset_instance_id)",
    "CREATE INDEX IF NOT EXISTS idx_pipelinetask_instance_id ON metadata.pipelinetask(data_asset_instance_id)",
];

/// Create the catalog schemas and tables if they don't exist
pub async fn run(pool: &Pool) -> anyhow::Result<()> {
    let client = pool.get().await?;

    for statement in STATEMENTS {
        client.batch_execute(statement).await?;
    }

    info!(statements = STATEMENTS.len(), "Catalog tables initialized");
    Ok(())
}
