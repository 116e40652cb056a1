//! # Infra Master (I: Infrastructure)
//!
//! Security master processing for the financial instrument transformer.
//!
//! This crate provides:
//! - Record parsers for the pipe-delimited reference-data extracts
//! - Column layouts as configuration ([`SchemaLayout`])
//! - The FIGI → security join with termination-date selection
//! - Deterministic instrument and organisation identifiers
//! - The [`InstrumentTable`] shared between the load worker and readers
//! - The [`LoadPipeline`] running one complete load
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            infra_master (I)             │
//! ├─────────────────────────────────────────┤
//! │  parser/    - delimited record parsing  │
//! │  join/      - FIGI → security selection │
//! │  identity/  - v3 UUID derivation        │
//! │  transform/ - public instruments        │
//! │  table/     - atomic snapshot table     │
//! │  pipeline/  - load orchestration        │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │          adapter_loader (A)             │
//! │  Object-store resource access           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use adapter_loader::InMemoryLoader;
//! use infra_master::{DelimitedParser, InstrumentTable, LoadPipeline, ResourceNames};
//!
//! # tokio_test::block_on(async {
//! let loader = InMemoryLoader::new()
//!     .with_latest_folder("2024-01-05")
//!     .with_resource("2024-01-05/sym_coverage.txt", "header\n")
//!     .with_resource("2024-01-05/ent_scr_sec_entity.txt", "header\n")
//!     .with_resource("2024-01-05/sym_bbg.txt", "header\n");
//!
//! let pipeline = LoadPipeline::new(
//!     Arc::new(loader),
//!     Arc::new(DelimitedParser::default()),
//!     ResourceNames::default(),
//! );
//!
//! let table = InstrumentTable::new();
//! assert!(!table.is_initialized());
//!
//! let loaded = pipeline.load_into(&table).await.unwrap();
//! assert_eq!(loaded, 0);
//! assert!(table.is_initialized());
//! # });
//! ```

pub mod error;
pub mod identity;
pub mod join;
pub mod layout;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod table;
pub mod telemetry;
pub mod transform;

pub use error::{LoadError, ParseError};
pub use layout::SchemaLayout;
pub use model::{FinancialInstrument, InstrumentMap, RawSecurity};
pub use parser::{DelimitedParser, RecordParser};
pub use pipeline::{LoadPipeline, ResourceNames};
pub use table::InstrumentTable;
