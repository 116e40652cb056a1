//! Extract → join → transform → load orchestration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use adapter_loader::ResourceLoader;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::LoadError;
use crate::join::join;
use crate::model::InstrumentMap;
use crate::parser::{retain_public_entities, RecordParser};
use crate::table::InstrumentTable;
use crate::telemetry::{record_load_failure, record_load_success};
use crate::transform::transform;

/// Names of the resources making up one extract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceNames {
    /// Security master file.
    pub securities: String,
    /// Security → entity map; absent when the security file carries the key.
    pub security_entity: Option<String>,
    /// Regional listing rows; absent when FIGI rows reference securities.
    pub listings: Option<String>,
    pub figi: String,
    /// Entity coverage file; enables the public-entity filter when set.
    pub entities: Option<String>,
    /// Read resources from the latest dated folder instead of the bucket root.
    pub dated_folders: bool,
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self {
            securities: "sym_coverage.txt".to_string(),
            security_entity: Some("ent_scr_sec_entity.txt".to_string()),
            listings: Some("sym_coverage.txt".to_string()),
            figi: "sym_bbg.txt".to_string(),
            entities: None,
            dated_folders: true,
        }
    }
}

impl ResourceNames {
    /// Resources of the older extract at the bucket root.
    pub fn legacy() -> Self {
        Self {
            securities: "edm_security_entity_map.txt".to_string(),
            security_entity: None,
            listings: None,
            figi: "edm_bbg_ids.txt".to_string(),
            entities: None,
            dated_folders: false,
        }
    }

    /// Default file name of the entity coverage extract.
    pub const ENTITY_COVERAGE: &'static str = "ent_entity_coverage.txt";
}

/// Fetched resource bodies, each name fetched once.
struct Resources<'a> {
    loader: &'a dyn ResourceLoader,
    folder: Option<String>,
    fetched: HashMap<String, Bytes>,
}

impl Resources<'_> {
    async fn get(&mut self, name: &str) -> Result<Bytes, LoadError> {
        if let Some(content) = self.fetched.get(name) {
            return Ok(content.clone());
        }
        let key = match &self.folder {
            Some(folder) => format!("{}/{}", folder, name),
            None => name.to_string(),
        };
        info!(resource = %key, "Loading resource");
        let content = self.loader.load_resource(&key).await?;
        self.fetched.insert(name.to_string(), content.clone());
        Ok(content)
    }
}

/// One full load from the resource loader to an instrument table.
pub struct LoadPipeline {
    loader: Arc<dyn ResourceLoader>,
    parser: Arc<dyn RecordParser>,
    resources: ResourceNames,
}

impl LoadPipeline {
    pub fn new(
        loader: Arc<dyn ResourceLoader>,
        parser: Arc<dyn RecordParser>,
        resources: ResourceNames,
    ) -> Self {
        Self {
            loader,
            parser,
            resources,
        }
    }

    pub fn loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.loader
    }

    pub fn resources(&self) -> &ResourceNames {
        &self.resources
    }

    /// Fetch, parse, join and transform the latest extract.
    ///
    /// Every resource is fetched before parsing starts, so an unavailable
    /// resource aborts the load without parsing anything.
    pub async fn run(&self) -> Result<InstrumentMap, LoadError> {
        let names = &self.resources;
        let folder = if names.dated_folders {
            Some(self.loader.find_latest_resources_folder().await?)
        } else {
            None
        };
        let mut resources = Resources {
            loader: self.loader.as_ref(),
            folder,
            fetched: HashMap::new(),
        };

        let securities_src = resources.get(&names.securities).await?;
        let security_entity_src = match &names.security_entity {
            Some(name) => Some(resources.get(name).await?),
            None => None,
        };
        let entities_src = match &names.entities {
            Some(name) => Some(resources.get(name).await?),
            None => None,
        };
        let listings_src = match &names.listings {
            Some(name) => Some(resources.get(name).await?),
            None => None,
        };
        let figi_src = resources.get(&names.figi).await?;

        let parser = self.parser.as_ref();
        let mut securities = parser.parse_securities(&mut &securities_src[..])?;
        if let Some(src) = &security_entity_src {
            parser.attach_entities(&mut &src[..], &mut securities)?;
        }
        if let Some(src) = &entities_src {
            let public = parser.parse_public_entities(&mut &src[..])?;
            retain_public_entities(&mut securities, &public);
        }
        let listings = match &listings_src {
            Some(src) => Some(parser.parse_listings(&mut &src[..], &securities)?),
            None => None,
        };
        let figi_codes = parser.parse_figi_codes(&mut &figi_src[..], listings.as_ref())?;

        let joined = join(&figi_codes, &securities);
        Ok(transform(joined))
    }

    /// Run a load and publish the result to `table`.
    ///
    /// On failure the table keeps its previous generation.
    pub async fn load_into(&self, table: &InstrumentTable) -> Result<usize, LoadError> {
        info!("Started loading instruments");
        let start = Instant::now();

        match self.run().await {
            Ok(instruments) => {
                let count = instruments.len();
                table.load(instruments);
                let elapsed = start.elapsed();
                record_load_success(elapsed, count);
                info!(records = count, elapsed_ms = elapsed.as_millis() as u64, "Loading instruments finished");
                Ok(count)
            }
            Err(e) => {
                record_load_failure();
                error!(error = %e, "Loading instruments failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SchemaLayout;
    use crate::parser::DelimitedParser;
    use adapter_loader::{InMemoryLoader, LoaderError};

    const COVERAGE: &str = "\
\"FSYM_ID\"|\"CURRENCY\"|\"PROPER_NAME\"|\"FSYM_PRIMARY_EQUITY_ID\"|\"FSYM_PRIMARY_LISTING_ID\"|\"ACTIVE_FLAG\"|\"FREF_SECURITY_TYPE\"|\"X\"|\"X\"|\"X\"|\"X\"|\"X\"|\"X\"|\"UNIVERSE_TYPE\"
\"ABCDEF-S\"|\"USD\"|\"Acme Corp\"|\"ABCDEF-S\"|\"H73FN8-R\"|1|\"SHARE\"|\"\"|0|0|1|\"\"|0|\"EQ\"
\"GHIJKL-S\"|\"USD\"|\"Private Corp\"|\"GHIJKL-S\"|\"H73FN7-R\"|1|\"SHARE\"|\"\"|0|0|1|\"\"|0|\"EQ\"
\"H73FN8-R\"|\"USD\"|\"Acme Corp\"|\"ABCDEF-S\"|\"K7FRX1-L\"|1|\"SHARE\"|\"\"|0|1|0|\"\"|0|\"EQ\"
\"H73FN7-R\"|\"USD\"|\"Private Corp\"|\"GHIJKL-S\"|\"K7FRX2-L\"|1|\"SHARE\"|\"\"|0|1|0|\"\"|0|\"EQ\"
";
    const SEC_ENTITY: &str = "\"FSYM_ID\"|\"FACTSET_ENTITY_ID\"\n\"ABCDEF-S\"|\"MNBVCX-E\"\n\"GHIJKL-S\"|\"0D1MLR-F\"\n";
    const FIGI: &str = "\"FSYM_ID\"|\"BBG_ID\"\n\"K7FRX1-L\"|\"BBG000000001\"\n\"K7FRX2-L\"|\"BBG000000002\"\n";

    fn loader() -> InMemoryLoader {
        InMemoryLoader::new()
            .with_latest_folder("2024-01-05")
            .with_resource("2024-01-05/sym_coverage.txt", COVERAGE)
            .with_resource("2024-01-05/ent_scr_sec_entity.txt", SEC_ENTITY)
            .with_resource("2024-01-05/sym_bbg.txt", FIGI)
    }

    fn pipeline(loader: InMemoryLoader, resources: ResourceNames) -> LoadPipeline {
        LoadPipeline::new(
            Arc::new(loader),
            Arc::new(DelimitedParser::default()),
            resources,
        )
    }

    #[tokio::test]
    async fn test_run_current_layout() {
        let instruments = pipeline(loader(), ResourceNames::default())
            .run()
            .await
            .unwrap();

        assert_eq!(instruments.len(), 2);
        let acme = &instruments["fd0d50ba-7031-3ebf-a594-4806b65a74bd"];
        assert_eq!(acme.figi_code, "BBG000000001");
        assert_eq!(acme.security_name, "Acme Corp");
        assert_eq!(acme.org_id, "6f2a22e5-2fb6-304e-b92b-1438f306dc94");
    }

    #[tokio::test]
    async fn test_public_entity_filter() {
        let entities = format!(
            "{}\n\"MNBVCX-E\"{}|\"PUB\"\n\"0D1MLR-F\"{}|\"PVT\"\n",
            (0..12).map(|i| format!("\"C{i}\"")).collect::<Vec<_>>().join("|"),
            "|\"\"".repeat(10),
            "|\"\"".repeat(10),
        );
        let loader = loader().with_resource("2024-01-05/ent_entity_coverage.txt", entities);
        let resources = ResourceNames {
            entities: Some(ResourceNames::ENTITY_COVERAGE.to_string()),
            ..ResourceNames::default()
        };

        let instruments = pipeline(loader, resources).run().await.unwrap();

        assert_eq!(instruments.len(), 1);
        assert!(instruments.contains_key("fd0d50ba-7031-3ebf-a594-4806b65a74bd"));
    }

    #[tokio::test]
    async fn test_missing_resource_aborts() {
        let loader = InMemoryLoader::new()
            .with_latest_folder("2024-01-05")
            .with_resource("2024-01-05/sym_coverage.txt", COVERAGE);

        let err = pipeline(loader, ResourceNames::default())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Resource(LoaderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_table() {
        let table = InstrumentTable::new();

        let count = pipeline(loader(), ResourceNames::default())
            .load_into(&table)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let failing = loader().with_failure("2024-01-05/sym_bbg.txt");
        let result = pipeline(failing, ResourceNames::default())
            .load_into(&table)
            .await;

        assert!(result.is_err());
        assert_eq!(table.count(), 2);
    }

    #[tokio::test]
    async fn test_first_failed_load_leaves_table_uninitialized() {
        let table = InstrumentTable::new();
        let result = pipeline(InMemoryLoader::new(), ResourceNames::default())
            .load_into(&table)
            .await;

        assert!(matches!(
            result,
            Err(LoadError::Resource(LoaderError::NoResourceFolder(_)))
        ));
        assert!(!table.is_initialized());
    }

    #[tokio::test]
    async fn test_legacy_extract_at_bucket_root() {
        let securities = "\
HEADER
\"x\"|\"x\"|\"x\"|\"x\"|\"ABCDEF-S\"|\"MNBVCX-E\"|\"Acme Corp\"|\"x\"|\"EQ\"|\"x\"|\"2001-01-01\"|\"2010-01-01\"
\"x\"|\"x\"|\"x\"|\"x\"|\"ABCDEF-S\"|\"MNBVCX-E\"|\"Acme Corp\"|\"x\"|\"EQ\"|\"x\"|\"2010-01-02\"|\"\"
";
        let figi = "\"ID\"|\"FIGI\"\n\"ABCDEF-S\"|\"BBG000000001\"\n";
        let loader = InMemoryLoader::new()
            .with_resource("edm_security_entity_map.txt", securities)
            .with_resource("edm_bbg_ids.txt", figi);
        let pipeline = LoadPipeline::new(
            Arc::new(loader),
            Arc::new(DelimitedParser::new(SchemaLayout::legacy())),
            ResourceNames::legacy(),
        );

        let instruments = pipeline.run().await.unwrap();

        assert_eq!(instruments.len(), 1);
        let acme = &instruments["fd0d50ba-7031-3ebf-a594-4806b65a74bd"];
        assert_eq!(acme.figi_code, "BBG000000001");
        assert_eq!(acme.org_id, "6f2a22e5-2fb6-304e-b92b-1438f306dc94");
    }
}
