//! Joined records → public instruments.

use tracing::{debug, info};

use crate::identity::{organisation_uuid, security_uuid};
use crate::model::{FinancialInstrument, InstrumentMap, JoinedMap, RawSecurity};

/// Build the instrument for one FIGI code and its chosen security.
pub fn to_instrument(figi_code: String, security: RawSecurity) -> FinancialInstrument {
    FinancialInstrument {
        id: security_uuid(&security.security_id).to_string(),
        figi_code,
        org_id: organisation_uuid(&security.org_id).to_string(),
        security_id: security.security_id,
        security_name: security.name,
    }
}

/// Build the instrument table keyed by instrument id.
///
/// A security reached through several FIGI codes yields one id; the entry
/// written last replaces the earlier ones.
pub fn transform(joined: JoinedMap) -> InstrumentMap {
    let mut instruments = InstrumentMap::with_capacity(joined.len());

    for (figi_code, securities) in joined {
        for security in securities {
            insert(&mut instruments, to_instrument(figi_code.clone(), security));
        }
    }

    info!(records = instruments.len(), "Transformed instruments");
    instruments
}

fn insert(instruments: &mut InstrumentMap, instrument: FinancialInstrument) {
    if let Some(previous) = instruments.get(&instrument.id) {
        debug!(
            id = %instrument.id,
            previous_figi = %previous.figi_code,
            figi = %instrument.figi_code,
            "Instrument id already present, replacing"
        );
    }
    instruments.insert(instrument.id.clone(), instrument);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::join;
    use crate::model::{FigiMap, SecurityMap};

    fn raw(id: &str, org: &str, name: &str) -> RawSecurity {
        RawSecurity {
            security_id: id.to_string(),
            org_id: org.to_string(),
            name: name.to_string(),
            instrument_type: "EQ".to_string(),
            ..RawSecurity::default()
        }
    }

    #[test]
    fn test_to_instrument() {
        let instrument = to_instrument(
            "BBG000JPVHS1".to_string(),
            raw("ABCDEF-S", "MNBVCX-E", "Acme Corp"),
        );

        assert_eq!(
            instrument,
            FinancialInstrument {
                id: "fd0d50ba-7031-3ebf-a594-4806b65a74bd".to_string(),
                figi_code: "BBG000JPVHS1".to_string(),
                security_id: "ABCDEF-S".to_string(),
                org_id: "6f2a22e5-2fb6-304e-b92b-1438f306dc94".to_string(),
                security_name: "Acme Corp".to_string(),
            }
        );
    }

    #[test]
    fn test_transform_keys_by_instrument_id() {
        let joined = JoinedMap::from([
            ("BBG000000001".to_string(), vec![raw("ABCDEF-S", "MNBVCX-E", "Acme")]),
            ("BBG000000002".to_string(), vec![raw("T621V4-S-KR", "0F03DX-E", "Other")]),
        ]);

        let instruments = transform(joined);

        assert_eq!(instruments.len(), 2);
        assert_eq!(
            instruments["fd0d50ba-7031-3ebf-a594-4806b65a74bd"].figi_code,
            "BBG000000001"
        );
        assert_eq!(
            instruments["e81c2fed-1fe3-3b38-9e82-0f64d3074281"].org_id,
            "5a9c7643-31e4-3bad-b6ba-a7676f43da9f"
        );
    }

    #[test]
    fn test_colliding_ids_keep_one_entry() {
        let joined = JoinedMap::from([
            ("BBG000000001".to_string(), vec![raw("ABCDEF-S", "MNBVCX-E", "Acme")]),
            ("BBG000000002".to_string(), vec![raw("ABCDEF-S", "MNBVCX-E", "Acme")]),
        ]);

        let instruments = transform(joined);

        assert_eq!(instruments.len(), 1);
        let figi = &instruments["fd0d50ba-7031-3ebf-a594-4806b65a74bd"].figi_code;
        assert!(figi == "BBG000000001" || figi == "BBG000000002");
    }

    #[test]
    fn test_securities_sharing_figi_yield_one_instrument_each() {
        let securities = SecurityMap::from([
            (
                "LK1Q8B-S-HK".to_string(),
                vec![
                    RawSecurity {
                        termination_date: "2016-03-29".to_string(),
                        ..raw("LK1Q8B-S-HK", "0BFB5F-E", "Old")
                    },
                    raw("LK1Q8B-S-HK", "0BFB5F-E", "Current"),
                ],
            ),
            (
                "S67X9X-S-HK".to_string(),
                vec![raw("S67X9X-S-HK", "0BFB5F-E", "Other")],
            ),
        ]);
        let figi_codes = FigiMap::from([(
            "BBG001D9T252".to_string(),
            vec!["LK1Q8B-S-HK".to_string(), "S67X9X-S-HK".to_string()],
        )]);

        let instruments = transform(join(&figi_codes, &securities));

        assert_eq!(instruments.len(), 2);
        let current = &instruments["a135ff6a-a466-32ba-a48c-ea280cf9df6f"];
        assert_eq!(current.security_id, "LK1Q8B-S-HK");
        assert_eq!(current.security_name, "Current");
        assert_eq!(
            instruments["6372c1b4-0dee-3d99-b9a0-bef34d97d6c8"].figi_code,
            "BBG001D9T252"
        );
    }

    #[test]
    fn test_distinct_issuers_under_one_figi() {
        let securities = SecurityMap::from([
            (
                "B2GXQ6-S-CL".to_string(),
                vec![raw("B2GXQ6-S-CL", "05W5BY-E", "Chile")],
            ),
            (
                "P7RDT8-S-CA".to_string(),
                vec![raw("P7RDT8-S-CA", "003XN9-E", "Canada")],
            ),
        ]);
        let figi_codes = FigiMap::from([(
            "BBG000BFPHG1".to_string(),
            vec!["B2GXQ6-S-CL".to_string(), "P7RDT8-S-CA".to_string()],
        )]);

        let instruments = transform(join(&figi_codes, &securities));

        assert_eq!(instruments.len(), 2);
        assert!(instruments.contains_key("24d7f133-d30b-394f-970c-5a5e3ed66061"));
        assert!(instruments.contains_key("f9ca6c8d-1b02-3492-ae76-5ef2231e6ae7"));
    }
}
