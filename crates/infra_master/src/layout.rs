//! Column layouts of the delimited extracts.
//!
//! The column positions of each file are an external contract. They are kept
//! here as data so that a new extract revision is a configuration change:
//!
//! - [`SchemaLayout::default`]: the current four-file layout (coverage,
//!   sec-entity map, FIGI listing codes, optional entity coverage)
//! - [`SchemaLayout::legacy`]: the older three-column-set layout, where the
//!   security file carries the entity key and lifecycle dates and FIGI rows
//!   reference securities directly

use serde::Deserialize;

/// Columns of the security master file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecurityColumns {
    pub security_id: usize,
    pub name: usize,
    pub universe_type: usize,
    /// Self-reference to the primary equity; the row must point at itself.
    pub primary_equity_id: Option<usize>,
    /// Must be non-empty when configured.
    pub primary_listing_id: Option<usize>,
    /// Integer flag that must equal 1 when configured.
    pub active_flag: Option<usize>,
    /// Must equal [`AdmissionRules::security_type`] when configured.
    pub security_type: Option<usize>,
    pub org_id: Option<usize>,
    pub inception_date: Option<usize>,
    pub termination_date: Option<usize>,
}

impl Default for SecurityColumns {
    fn default() -> Self {
        Self {
            security_id: 0,
            name: 2,
            universe_type: 13,
            primary_equity_id: Some(3),
            primary_listing_id: Some(4),
            active_flag: Some(5),
            security_type: Some(6),
            org_id: None,
            inception_date: None,
            termination_date: None,
        }
    }
}

impl SecurityColumns {
    /// Minimum number of fields a row needs to be considered.
    pub fn required_fields(&self) -> usize {
        [
            Some(self.security_id),
            Some(self.name),
            Some(self.universe_type),
            self.primary_equity_id,
            self.primary_listing_id,
            self.active_flag,
            self.security_type,
            self.org_id,
            self.inception_date,
            self.termination_date,
        ]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |max| max + 1)
    }
}

/// Columns of the security → entity map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecurityEntityColumns {
    pub security_id: usize,
    pub org_id: usize,
}

impl Default for SecurityEntityColumns {
    fn default() -> Self {
        Self {
            security_id: 0,
            org_id: 1,
        }
    }
}

impl SecurityEntityColumns {
    pub fn required_fields(&self) -> usize {
        self.security_id.max(self.org_id) + 1
    }
}

/// Columns of regional listing rows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListingColumns {
    /// Regional key (`-R` suffix).
    pub security_id: usize,
    /// Back-reference to the primary security.
    pub primary_equity_id: usize,
    /// Listing key referenced by FIGI rows.
    pub primary_listing_id: usize,
}

impl Default for ListingColumns {
    fn default() -> Self {
        Self {
            security_id: 0,
            primary_equity_id: 3,
            primary_listing_id: 4,
        }
    }
}

impl ListingColumns {
    pub fn required_fields(&self) -> usize {
        self.security_id
            .max(self.primary_equity_id)
            .max(self.primary_listing_id)
            + 1
    }
}

/// Columns of the FIGI file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FigiColumns {
    /// Listing key, or security key when listings are not resolved.
    pub key: usize,
    pub figi: usize,
}

impl Default for FigiColumns {
    fn default() -> Self {
        Self { key: 0, figi: 1 }
    }
}

impl FigiColumns {
    pub fn required_fields(&self) -> usize {
        self.key.max(self.figi) + 1
    }
}

/// Columns of the entity coverage file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EntityColumns {
    pub entity_id: usize,
    pub entity_type: usize,
}

impl Default for EntityColumns {
    fn default() -> Self {
        Self {
            entity_id: 0,
            entity_type: 11,
        }
    }
}

impl EntityColumns {
    pub fn required_fields(&self) -> usize {
        self.entity_id.max(self.entity_type) + 1
    }
}

/// Literal values the admission predicates compare against.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdmissionRules {
    pub universe_type: String,
    /// Role suffix of primary share keys; `None` admits any key.
    pub primary_suffix: Option<String>,
    pub security_type: String,
    /// Role suffix of regional listing keys.
    pub listing_suffix: String,
    pub public_entity_type: String,
}

impl Default for AdmissionRules {
    fn default() -> Self {
        Self {
            universe_type: "EQ".to_string(),
            primary_suffix: Some("-S".to_string()),
            security_type: "SHARE".to_string(),
            listing_suffix: "-R".to_string(),
            public_entity_type: "PUB".to_string(),
        }
    }
}

/// Complete layout of one extract revision.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchemaLayout {
    pub securities: SecurityColumns,
    pub security_entity: SecurityEntityColumns,
    /// `None` when FIGI rows reference securities directly.
    pub listings: Option<ListingColumns>,
    pub figi: FigiColumns,
    pub entities: EntityColumns,
    pub rules: AdmissionRules,
}

impl Default for SchemaLayout {
    fn default() -> Self {
        Self {
            securities: SecurityColumns::default(),
            security_entity: SecurityEntityColumns::default(),
            listings: Some(ListingColumns::default()),
            figi: FigiColumns::default(),
            entities: EntityColumns::default(),
            rules: AdmissionRules::default(),
        }
    }
}

impl SchemaLayout {
    /// Layout of the older security/entity map with lifecycle dates.
    pub fn legacy() -> Self {
        Self {
            securities: SecurityColumns {
                security_id: 4,
                org_id: Some(5),
                name: 6,
                universe_type: 8,
                inception_date: Some(10),
                termination_date: Some(11),
                primary_equity_id: None,
                primary_listing_id: None,
                active_flag: None,
                security_type: None,
            },
            listings: None,
            rules: AdmissionRules {
                primary_suffix: None,
                ..AdmissionRules::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_layout_required_fields() {
        let layout = SchemaLayout::default();
        assert_eq!(layout.securities.required_fields(), 14);
        assert_eq!(layout.security_entity.required_fields(), 2);
        assert_eq!(layout.listings.as_ref().map(|l| l.required_fields()), Some(5));
        assert_eq!(layout.figi.required_fields(), 2);
        assert_eq!(layout.entities.required_fields(), 12);
    }

    #[test]
    fn test_legacy_layout() {
        let layout = SchemaLayout::legacy();
        assert_eq!(layout.securities.required_fields(), 12);
        assert!(layout.listings.is_none());
        assert!(layout.rules.primary_suffix.is_none());
        assert_eq!(layout.rules.universe_type, "EQ");
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
            [securities]
            universe_type = 12

            [rules]
            security_type = "PREFEQ"
        "#;

        let layout: SchemaLayout = toml::from_str(toml_str).unwrap();
        assert_eq!(layout.securities.universe_type, 12);
        assert_eq!(layout.securities.security_id, 0);
        assert_eq!(layout.rules.security_type, "PREFEQ");
        assert_eq!(layout.rules.universe_type, "EQ");
        assert_eq!(layout.listings, Some(ListingColumns::default()));
    }
}
