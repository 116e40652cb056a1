//! Record parsers for the pipe-delimited extracts.
//!
//! Every stream starts with a header line that is skipped without inspection.
//! Each remaining line has its `"` characters removed and is split on `|`.
//! Rows with too few fields or failing an admission predicate are dropped and
//! parsing carries on; only a failure of the stream itself is an error.

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::BufRead;

use tracing::{debug, info, warn};

use crate::error::ParseError;
use crate::layout::SchemaLayout;
use crate::model::{EntitySet, FigiMap, ListingMap, RawSecurity, SecurityMap};

/// Parsing capability consumed by the load pipeline.
pub trait RecordParser: Send + Sync {
    /// Parse the security master into admitted revisions per natural key.
    fn parse_securities(&self, reader: &mut dyn BufRead) -> Result<SecurityMap, ParseError>;

    /// Attach organisation keys from the sec-entity map to known securities.
    ///
    /// Returns the number of distinct securities enriched.
    fn attach_entities(
        &self,
        reader: &mut dyn BufRead,
        securities: &mut SecurityMap,
    ) -> Result<usize, ParseError>;

    /// Parse regional listings that close the loop with their primary security.
    fn parse_listings(
        &self,
        reader: &mut dyn BufRead,
        securities: &SecurityMap,
    ) -> Result<ListingMap, ParseError>;

    /// Parse FIGI rows, resolving through `listings` when given.
    ///
    /// Without listings the referenced key is taken as a security key.
    fn parse_figi_codes(
        &self,
        reader: &mut dyn BufRead,
        listings: Option<&ListingMap>,
    ) -> Result<FigiMap, ParseError>;

    /// Collect entity keys carrying the public-entity marker.
    fn parse_public_entities(&self, reader: &mut dyn BufRead) -> Result<EntitySet, ParseError>;
}

/// Parser driven by a [`SchemaLayout`].
#[derive(Debug, Clone, Default)]
pub struct DelimitedParser {
    layout: SchemaLayout,
}

impl DelimitedParser {
    pub fn new(layout: SchemaLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &SchemaLayout {
        &self.layout
    }

    fn admit_security(&self, record: &[&str]) -> Option<RawSecurity> {
        let columns = &self.layout.securities;
        let rules = &self.layout.rules;
        let security_id = record[columns.security_id];

        if security_id.is_empty() || record[columns.universe_type] != rules.universe_type {
            return None;
        }
        if let Some(suffix) = &rules.primary_suffix {
            if !security_id.ends_with(suffix.as_str()) {
                return None;
            }
        }
        if let Some(col) = columns.active_flag {
            match record[col].parse::<i64>() {
                Ok(1) => {}
                Ok(_) => return None,
                Err(e) => {
                    warn!(security_id, flag = record[col], error = %e, "Skipping security with invalid active flag");
                    return None;
                }
            }
        }
        if let Some(col) = columns.primary_equity_id {
            if record[col] != security_id {
                return None;
            }
        }
        if let Some(col) = columns.security_type {
            if record[col] != rules.security_type {
                return None;
            }
        }
        if let Some(col) = columns.primary_listing_id {
            if record[col].is_empty() {
                return None;
            }
        }

        let field = |col: Option<usize>| col.map(|c| record[c].to_string()).unwrap_or_default();
        Some(RawSecurity {
            security_id: security_id.to_string(),
            org_id: field(columns.org_id),
            instrument_type: record[columns.universe_type].to_string(),
            name: record[columns.name].to_string(),
            primary_listing_id: field(columns.primary_listing_id),
            inception_date: field(columns.inception_date),
            termination_date: field(columns.termination_date),
        })
    }
}

impl RecordParser for DelimitedParser {
    fn parse_securities(&self, reader: &mut dyn BufRead) -> Result<SecurityMap, ParseError> {
        info!("Starting security parsing");
        let mut securities = SecurityMap::new();

        scan_records(
            reader,
            "security",
            self.layout.securities.required_fields(),
            |record| {
                if let Some(security) = self.admit_security(record) {
                    securities
                        .entry(security.security_id.clone())
                        .or_default()
                        .push(security);
                }
            },
        )?;

        info!(records = securities.len(), "Fetched securities");
        Ok(securities)
    }

    fn attach_entities(
        &self,
        reader: &mut dyn BufRead,
        securities: &mut SecurityMap,
    ) -> Result<usize, ParseError> {
        info!("Starting sec-entity mapping parsing");
        let columns = &self.layout.security_entity;
        let mut enriched = HashSet::new();

        scan_records(reader, "sec-entity", columns.required_fields(), |record| {
            let security_id = record[columns.security_id];
            if let Some(revisions) = securities.get_mut(security_id) {
                for security in revisions.iter_mut() {
                    security.org_id = record[columns.org_id].to_string();
                }
                enriched.insert(security_id.to_string());
            }
        })?;

        info!(securities = enriched.len(), "Attached entities to securities");
        Ok(enriched.len())
    }

    fn parse_listings(
        &self,
        reader: &mut dyn BufRead,
        securities: &SecurityMap,
    ) -> Result<ListingMap, ParseError> {
        let mut listings = ListingMap::new();
        let Some(columns) = &self.layout.listings else {
            warn!("Layout has no listing columns, no listings resolved");
            return Ok(listings);
        };
        info!("Starting listings parsing");
        let suffix = self.layout.rules.listing_suffix.as_str();

        scan_records(reader, "listing", columns.required_fields(), |record| {
            let regional_id = record[columns.security_id];
            let primary_equity_id = record[columns.primary_equity_id];
            let listing_id = record[columns.primary_listing_id];

            if !regional_id.ends_with(suffix) || primary_equity_id.is_empty() || listing_id.is_empty() {
                return;
            }
            let declared = securities.get(primary_equity_id).is_some_and(|revisions| {
                revisions
                    .iter()
                    .any(|security| security.primary_listing_id == regional_id)
            });
            if declared {
                listings.insert(listing_id.to_string(), primary_equity_id.to_string());
            }
        })?;

        info!(records = listings.len(), "Fetched listings");
        Ok(listings)
    }

    fn parse_figi_codes(
        &self,
        reader: &mut dyn BufRead,
        listings: Option<&ListingMap>,
    ) -> Result<FigiMap, ParseError> {
        info!("Starting FIGI code parsing");
        let columns = &self.layout.figi;
        let mut figi_codes = FigiMap::new();

        scan_records(reader, "figi", columns.required_fields(), |record| {
            let key = record[columns.key];
            let security_id = match listings {
                Some(listings) => match listings.get(key) {
                    Some(security_id) => security_id.as_str(),
                    None => return,
                },
                None if key.is_empty() => return,
                None => key,
            };

            let keys = figi_codes.entry(record[columns.figi].to_string()).or_default();
            if !keys.iter().any(|k| k == security_id) {
                keys.push(security_id.to_string());
            }
        })?;

        info!(records = figi_codes.len(), "Fetched FIGI codes");
        Ok(figi_codes)
    }

    fn parse_public_entities(&self, reader: &mut dyn BufRead) -> Result<EntitySet, ParseError> {
        info!("Starting entity parsing");
        let columns = &self.layout.entities;
        let marker = self.layout.rules.public_entity_type.as_str();
        let mut entities = EntitySet::new();

        scan_records(reader, "entity", columns.required_fields(), |record| {
            if record[columns.entity_type] == marker {
                entities.insert(record[columns.entity_id].to_string());
            }
        })?;

        info!(records = entities.len(), "Fetched public entities");
        Ok(entities)
    }
}

/// Drop every revision whose organisation is not a public entity.
///
/// Returns the number of natural keys removed entirely.
pub fn retain_public_entities(securities: &mut SecurityMap, public: &EntitySet) -> usize {
    let before = securities.len();
    securities.retain(|_, revisions| {
        revisions.retain(|security| public.contains(&security.org_id));
        !revisions.is_empty()
    });
    let removed = before - securities.len();
    info!(removed, remaining = securities.len(), "Applied public entity filter");
    removed
}

/// Feed every data row with at least `min_fields` fields to `visit`.
///
/// Lines are decoded lossily, so a row with bytes that are not UTF-8 is still
/// visited with replacement characters. Only read failures are returned.
fn scan_records<F>(
    reader: &mut dyn BufRead,
    dataset: &'static str,
    min_fields: usize,
    mut visit: F,
) -> Result<(), ParseError>
where
    F: FnMut(&[&str]),
{
    let io_err = |source: std::io::Error| ParseError::Io { dataset, source };
    let mut buf = Vec::new();

    // Header
    if reader.read_until(b'\n', &mut buf).map_err(io_err)? == 0 {
        return Ok(());
    }

    let mut skipped = 0usize;
    let mut lossy = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(io_err)? == 0 {
            break;
        }
        let raw = trim_line_ending(&buf);
        let text = String::from_utf8_lossy(raw);
        if let Cow::Owned(_) = text {
            lossy += 1;
            debug!(dataset, line = %text, "Row is not valid UTF-8, decoded lossily");
        }

        let line = text.replace('"', "");
        let record: Vec<&str> = line.split('|').collect();
        if record.len() < min_fields {
            debug!(dataset, fields = record.len(), line = %line, "Skipping short row");
            skipped += 1;
            continue;
        }
        visit(&record);
    }

    if skipped > 0 || lossy > 0 {
        info!(dataset, skipped, lossy, "Finished scanning with malformed rows");
    }
    Ok(())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
