// Retirement Limits - Core Library
// Published contribution limits + MAGI phase-out resolution.
// Exposes all modules for use in CLI, API server, and tests

pub mod error;      // Error taxonomy + Result alias
pub mod money;      // Fixed-point currency / percentage
pub mod validation; // Input bounds (year, age, MAGI)
pub mod entities;   // Account types, limit types, facts
pub mod catalog;    // LimitCatalog trait + in-memory catalog
pub mod resolver;   // Eligibility + phase-out math
pub mod db;         // SQLite persistence
pub mod loader;     // CSV ingestion of published facts
pub mod service;    // Read API for CLI / HTTP
pub mod config;     // limits.toml
pub mod logger;     // tracing subscriber setup

// Re-export commonly used types
pub use error::{LimitsError, Result};
pub use money::{Money, Percentage};
pub use entities::{
    AccountType, TaxTreatment,
    ContributionLimit, LimitKey,
    FilingStatus,
    LimitType, LimitTypeRule,
    PhaseOutAccountType, PhaseOutKey, PhaseOutRange,
};
pub use catalog::{InMemoryCatalog, LimitCatalog};
pub use resolver::{phase_out_percentage, reduced_limit, LimitResolver};
pub use db::{setup_database, Publication, SqliteCatalog};
pub use loader::{load_limits_file, load_phase_outs_file, FactKind, LoadReport};
pub use service::{
    AccountTypeLimits, IncomeContext, LimitQuery, LimitResolution, LimitsService,
    ResolvedLimit, YearlyLimits,
};
pub use config::LimitsConfig;
pub use logger::init_logger;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
