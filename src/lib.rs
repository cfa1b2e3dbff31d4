// Health Panel - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod metrics;
pub mod record;
pub mod validation;
pub mod aggregate;
pub mod error;
pub mod store;
pub mod feed;
pub mod config;
pub mod csv_io;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use metrics::{bmi_category, compute_bmi, risk_level, risk_points, risk_score};
pub use record::{
    newest_first, BmiCategory, Derived, Habits, HealthInput, IdGenerator, Record, RiskLevel,
    Sex, YesNo,
};
pub use validation::{validate_input, ValidationError, ValidationResult};
pub use aggregate::{
    age_imc_series, average_bmi_by_sex, risk_distribution, split_by_diabetes, Dashboard,
    DiabetesSplit, RiskSlice, ScatterPoint, SexBmi,
};
pub use error::StoreError;
pub use store::{
    FileStore, MemoryStore, RecordStore, SheetStore, SqliteStore, DEFAULT_MAX_RECORDS,
};
pub use feed::{RecordFeed, RecordListener, Subscription};
pub use config::{BackendKind, Config};
pub use csv_io::{load_csv, write_csv, ImportReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
