//! FIGI → security join.

use tracing::{debug, info, warn};

use crate::model::{FigiMap, JoinedMap, SecurityMap};

/// Pick the securities representing each FIGI code.
///
/// Every natural key the FIGI code references contributes its last active
/// revision, so keys sharing a FIGI code each keep an instrument. More than
/// one active revision under a FIGI code is logged. FIGI codes without an
/// active candidate are dropped.
pub fn join(figi_codes: &FigiMap, securities: &SecurityMap) -> JoinedMap {
    let mut joined = JoinedMap::with_capacity(figi_codes.len());
    let mut ambiguous = 0usize;

    for (figi, security_ids) in figi_codes {
        let mut chosen = Vec::new();
        let mut active = 0usize;

        for security_id in security_ids {
            let Some(revisions) = securities.get(security_id) else {
                continue;
            };
            let mut last = None;
            for revision in revisions.iter().filter(|security| security.is_active()) {
                active += 1;
                last = Some(revision);
            }
            if let Some(revision) = last {
                chosen.push(revision.clone());
            }
        }

        if chosen.is_empty() {
            debug!(figi = %figi, "No active security for FIGI code");
            continue;
        }
        if active > 1 {
            ambiguous += 1;
            warn!(
                figi = %figi,
                candidates = active,
                securities = chosen.len(),
                "More than one active security for FIGI code, using the last revision per security"
            );
        }
        joined.insert(figi.clone(), chosen);
    }

    info!(records = joined.len(), ambiguous, "Joined FIGI codes to securities");
    joined
}
