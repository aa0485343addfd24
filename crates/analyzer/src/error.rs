use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error(transparent)]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Malformed measurement data: {0}")]
    Measurements(#[from] core_types::CoreError),
}
