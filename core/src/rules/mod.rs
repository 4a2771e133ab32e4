//! Pure decision rules used by the workflows: business-hours scheduling,
//! upstream-id deduplication, cash-on-delivery classification and call
//! outcome classification.

pub mod business_hours;
pub mod cod;
pub mod dedup;
pub mod outcome;

pub use business_hours::{next_eligible_time, BusinessHours, Eligibility};
pub use cod::{is_cod, COD_SYNONYMS};
pub use dedup::{filter_new, filter_new_ordered};
pub use outcome::{classify_result, requests_address_change, ADDRESS_CHANGE_KEYWORDS};
