use sqlx::PgPool;

/// Postgres-backed processor. Every order command implements
/// `kanau::processor::Processor` for this type.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
