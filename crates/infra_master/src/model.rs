//! Raw and public instrument records.

use std::collections::{HashMap, HashSet};

/// Security record as extracted from the security master file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSecurity {
    /// Natural key of the security (e.g. `JBP7Z8-S`).
    pub security_id: String,
    /// Natural key of the issuing entity, attached by the sec-entity join.
    pub org_id: String,
    /// Universe category (e.g. `EQ`).
    pub instrument_type: String,
    /// Display name.
    pub name: String,
    /// Natural key of the canonical regional listing (e.g. `WHV8G2-R`).
    pub primary_listing_id: String,
    /// ISO date, empty when the layout does not track lifecycle.
    pub inception_date: String,
    /// ISO date, empty while the record is active.
    pub termination_date: String,
}

impl RawSecurity {
    /// A record with no termination date is the current revision.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.termination_date.is_empty()
    }
}

/// Public financial instrument served by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinancialInstrument {
    /// Opaque identifier derived from the security natural key.
    pub id: String,
    pub figi_code: String,
    pub security_id: String,
    /// Identifier derived from the issuing entity natural key.
    pub org_id: String,
    pub security_name: String,
}

/// Security natural key → admitted revisions, in file order.
pub type SecurityMap = HashMap<String, Vec<RawSecurity>>;

/// Listing natural key → primary security natural key.
pub type ListingMap = HashMap<String, String>;

/// FIGI → security natural keys, in file order without duplicates.
pub type FigiMap = HashMap<String, Vec<String>>;

/// Natural keys of entities flagged as public.
pub type EntitySet = HashSet<String>;

/// FIGI → one chosen revision per referenced natural key, in reference order.
pub type JoinedMap = HashMap<String, Vec<RawSecurity>>;

/// Instrument id → instrument.
pub type InstrumentMap = HashMap<String, FinancialInstrument>;
