// Entity Models - limit facts and their closed vocabularies
//
// Enumerations carry metadata as constant table data (display names,
// age bounds, tax treatment). Facts validate their invariants at
// construction so nothing malformed reaches the resolver.

pub mod account_type;
pub mod filing_status;
pub mod limit;
pub mod limit_type;
pub mod phase_out;

pub use account_type::{AccountType, TaxTreatment};
pub use filing_status::FilingStatus;
pub use limit::{ContributionLimit, LimitKey};
pub use limit_type::{LimitType, LimitTypeRule};
pub use phase_out::{PhaseOutAccountType, PhaseOutKey, PhaseOutRange};
