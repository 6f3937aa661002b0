//! CAMT.053 to QIF converter library.
//!
//! Reads ISO 20022 CAMT.053 bank statements (bare XML or zipped exports)
//! and writes QIF for personal-finance applications.
//!
//! # Pipeline
//!
//! - [`config::AccountMap`]: IBAN to application account names and transfer rules
//! - [`source::read_source`]: unzip and parse CAMT.053 documents
//! - [`conversion::Converter`]: classify entries as plain entries or transfers
//! - [`qif_format::QifDocument`]: render QIF text
//!
//! # Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::path::Path;
//! use camtqif::{AccountMap, ConvertOptions, Converter};
//! use camtqif::source::read_source;
//!
//! let accounts = AccountMap::load("accounts.ini")?;
//! let mut converter = Converter::new(&accounts, ConvertOptions::default());
//!
//! for source in read_source(Path::new("export.zip"))? {
//!     for statement in &source.document.statements {
//!         converter.add_statement(statement)?;
//!     }
//! }
//!
//! let mut output = File::create("export.qif")?;
//! converter.document().write_to(&mut output)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod camt053_format;
pub mod description;
pub mod qif_format;
pub mod conversion;
pub mod source;

// Re-export commonly used types
pub use config::{AccountConfig, AccountMap};
pub use conversion::{ConversionSummary, ConvertOptions, Converter};
pub use error::{Error, Result};
pub use source::SourceKind;
pub use types::{DebitCredit, Statement, Transaction, TransactionKind};
