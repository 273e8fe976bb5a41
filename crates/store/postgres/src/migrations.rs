use sqlx::PgPool;

/// Run the record store migrations, creating tables and indexes if they do
/// not already exist.
pub async fn run_migrations(pool: &PgPool, prefix: &str) -> Result<(), sqlx::Error> {
    let records = format!("{prefix}records");
    let hashes = format!("{prefix}record_hashes");
    let disposals = format!("{prefix}disposals");

    let create_records = format!(
        "
        CREATE TABLE IF NOT EXISTS {records} (
            id                   TEXT PRIMARY KEY,
            record_number        TEXT NOT NULL UNIQUE,
            filename             TEXT NOT NULL,
            storage_path         TEXT NOT NULL,
            category             TEXT NOT NULL,
            created_at           TIMESTAMPTZ NOT NULL,
            legal_hold           BOOLEAN NOT NULL DEFAULT FALSE,
            retention_expires_at TIMESTAMPTZ,
            original_hash        TEXT NOT NULL,
            digest_algorithm     TEXT NOT NULL DEFAULT 'sha256',
            verification_status  TEXT NOT NULL DEFAULT 'PENDING',
            last_verified_at     TIMESTAMPTZ,
            version              BIGINT NOT NULL DEFAULT 1
        )
        "
    );

    // Verification entries reference records by ID without a foreign key so
    // the trail outlives disposal.
    let create_hashes = format!(
        "
        CREATE TABLE IF NOT EXISTS {hashes} (
            id             TEXT PRIMARY KEY,
            record_id      TEXT NOT NULL,
            record_number  TEXT NOT NULL,
            computed_hash  TEXT,
            expected_hash  TEXT NOT NULL,
            matched        BOOLEAN NOT NULL,
            verified_at    TIMESTAMPTZ NOT NULL,
            verified_by    TEXT NOT NULL,
            error          TEXT
        )
        "
    );

    let create_disposals = format!(
        "
        CREATE TABLE IF NOT EXISTS {disposals} (
            id              TEXT PRIMARY KEY,
            record_id       TEXT NOT NULL,
            record_number   TEXT NOT NULL,
            filename        TEXT NOT NULL,
            category        TEXT NOT NULL,
            storage_path    TEXT NOT NULL,
            disposed_at     TIMESTAMPTZ NOT NULL,
            disposed_by     TEXT NOT NULL,
            content_deleted BOOLEAN NOT NULL DEFAULT FALSE
        )
        "
    );

    for stmt in [&create_records, &create_hashes, &create_disposals] {
        sqlx::query(stmt).execute(pool).await?;
    }

    let indexes = [
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}records_category ON {records} (category, record_number)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}records_status ON {records} (verification_status)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}records_expiry ON {records} (retention_expires_at) WHERE retention_expires_at IS NOT NULL AND legal_hold = FALSE"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}record_hashes_record ON {hashes} (record_id, verified_at)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}disposals_time ON {disposals} (disposed_at)"
        ),
    ];

    for idx in &indexes {
        sqlx::query(idx).execute(pool).await?;
    }

    Ok(())
}
