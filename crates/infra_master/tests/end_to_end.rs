//! Full load of a small extract through the in-memory loader.

use std::sync::Arc;

use adapter_loader::InMemoryLoader;
use infra_master::identity::{organisation_uuid, security_uuid};
use infra_master::{
    DelimitedParser, FinancialInstrument, InstrumentTable, LoadPipeline, ResourceNames,
};

const FOLDER: &str = "2024-03-01";

const SYM_COVERAGE: &str = "\
\"FSYM_ID\"|\"CURRENCY\"|\"PROPER_NAME\"|\"FSYM_PRIMARY_EQUITY_ID\"|\"FSYM_PRIMARY_LISTING_ID\"|\"ACTIVE_FLAG\"|\"FREF_SECURITY_TYPE\"|\"FREF_LISTING_EXCHANGE\"|\"LISTING_FLAG\"|\"REGIONAL_FLAG\"|\"SECURITY_FLAG\"|\"FREF_EXCHANGE_LOCATION_CODE\"|\"DR_FLAG\"|\"UNIVERSE_TYPE\"
\"JBP7Z8-S\"|\"RSD\"|\"Industrija Precizne Mehanike AD\"|\"JBP7Z8-S\"|\"WHV8G2-R\"|1|\"SHARE\"|\"\"|0|0|1|\"\"|0|\"EQ\"
\"WHV8G2-R\"|\"RSD\"|\"Industrija Precizne Mehanike AD\"|\"JBP7Z8-S\"|\"R85KLC-L\"|1|\"SHARE\"|\"\"|0|1|0|\"RS\"|0|\"EQ\"
\"WHV8G3-R\"|\"EUR\"|\"Industrija Precizne Mehanike AD\"|\"JBP7Z8-S\"|\"R85KLD-L\"|1|\"SHARE\"|\"\"|0|1|0|\"DE\"|0|\"EQ\"
\"QRS123-S\"|\"USD\"|\"Dormant Holdings\"|\"QRS123-S\"|\"QRS123-R\"|0|\"SHARE\"|\"\"|0|0|1|\"\"|0|\"EQ\"
\"QRS123-R\"|\"USD\"|\"Dormant Holdings\"|\"QRS123-S\"|\"QRS123-L\"|1|\"SHARE\"|\"\"|0|1|0|\"US\"|0|\"EQ\"
";

const SEC_ENTITY: &str = "\
\"FSYM_ID\"|\"FACTSET_ENTITY_ID\"
\"JBP7Z8-S\"|\"092VYW-E\"
\"QRS123-S\"|\"0D1MLR-F\"
";

const SYM_BBG: &str = "\
\"FSYM_ID\"|\"BBG_ID\"
\"R85KLC-L\"|\"BBG000JPVHS1\"
\"R85KLD-L\"|\"BBG000JPVHT0\"
\"QRS123-L\"|\"BBG000QRS123\"
";

fn pipeline() -> LoadPipeline {
    let loader = InMemoryLoader::new()
        .with_latest_folder(FOLDER)
        .with_resource(format!("{FOLDER}/sym_coverage.txt"), SYM_COVERAGE)
        .with_resource(format!("{FOLDER}/ent_scr_sec_entity.txt"), SEC_ENTITY)
        .with_resource(format!("{FOLDER}/sym_bbg.txt"), SYM_BBG);

    LoadPipeline::new(
        Arc::new(loader),
        Arc::new(DelimitedParser::default()),
        ResourceNames::default(),
    )
}

#[tokio::test]
async fn test_end_to_end_instrument() {
    let table = InstrumentTable::new();
    let loaded = pipeline().load_into(&table).await.unwrap();

    assert_eq!(loaded, 1);
    assert!(table.is_initialized());

    let id = "404c8329-3f8e-348e-ba32-cf3eb2c1ffed";
    assert_eq!(security_uuid("JBP7Z8-S").to_string(), id);

    let instrument = table.lookup(id).unwrap();
    assert_eq!(
        instrument,
        FinancialInstrument {
            id: id.to_string(),
            figi_code: "BBG000JPVHS1".to_string(),
            security_id: "JBP7Z8-S".to_string(),
            org_id: "ea90a425-73be-33c5-9aa4-939c9a46b87a".to_string(),
            security_name: "Industrija Precizne Mehanike AD".to_string(),
        }
    );
    assert_eq!(instrument.org_id, organisation_uuid("092VYW-E").to_string());
}

#[tokio::test]
async fn test_end_to_end_ids() {
    let table = InstrumentTable::new();
    pipeline().load_into(&table).await.unwrap();

    assert_eq!(table.list_ids(), vec!["404c8329-3f8e-348e-ba32-cf3eb2c1ffed"]);
    assert!(table.lookup(&security_uuid("QRS123-S").to_string()).is_none());
}

#[tokio::test]
async fn test_reload_is_idempotent() {
    let table = InstrumentTable::new();
    let pipeline = pipeline();

    pipeline.load_into(&table).await.unwrap();
    let first = table.snapshot().unwrap();
    pipeline.load_into(&table).await.unwrap();
    let second = table.snapshot().unwrap();

    assert_eq!(*first, *second);
}
