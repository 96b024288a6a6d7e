//! Shared constants for formsync.

/// Default base URL of the Zuko egress API.
pub const DEFAULT_API_URL: &str = "https://egress.api.zuko.io";

/// Header carrying the upstream API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Nested collections requested with every session page.
pub const SESSION_INCLUDES: &str = "fields,events";

/// Default warehouse dataset (Postgres schema) holding one table per form.
pub const DEFAULT_DATASET: &str = "zuko_data";

/// Default directory for per-form export files.
pub const DEFAULT_EXPORT_DIR: &str = "./tmp";

/// Default path of the JSON form registry.
pub const DEFAULT_FORMS_FILE: &str = "forms.json";

/// Default upstream request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Default tag prefixed to notification bodies.
pub const DEFAULT_NOTIFY_TAG: &str = "formsync";

/// Subject line of every failure notification.
pub const FAILURE_SUBJECT: &str = "Error while loading Zuko data into the warehouse";

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 4;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Rows per multi-row INSERT statement (Postgres caps binds at 65535).
pub const LOAD_CHUNK_ROWS: usize = 500;
