//! Golden-file conversion of the sample exports in `tests/fixtures`.

use camtqif::camt053_format::Camt053Document;
use camtqif::conversion::convert_statements;
use camtqif::source::{read_archive, read_source};
use camtqif::{AccountMap, ConvertOptions, Converter};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn zipped(name: &str) -> Vec<u8> {
    let content = fs::read(fixture(name)).unwrap();
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(&content).unwrap();
        writer.finish().unwrap();
    }
    buf.into_inner()
}

#[test]
fn test_golden_conversion() {
    let accounts = AccountMap::load(fixture("accounts.ini")).unwrap();
    let mut converter = Converter::new(&accounts, ConvertOptions::default());

    for source in read_archive(Cursor::new(zipped("checking.xml")), "checking.zip").unwrap() {
        for statement in &source.document.statements {
            converter.add_statement(statement).unwrap();
        }
    }
    for source in read_source(&fixture("savings.xml")).unwrap() {
        for statement in &source.document.statements {
            converter.add_statement(statement).unwrap();
        }
    }

    let expected = fs::read_to_string(fixture("expected.qif")).unwrap();
    assert_eq!(converter.document().to_qif_string().unwrap(), expected);

    let summary = converter.summary();
    assert_eq!(summary.inserted, 7);
    assert_eq!(summary.duplicates, 2);
    assert_eq!(summary.accounts, 2);
}

#[test]
fn test_input_order_does_not_change_the_ledger_contents() {
    let accounts = AccountMap::load(fixture("accounts.ini")).unwrap();
    let checking = Camt053Document::parse(&fs::read_to_string(fixture("checking.xml")).unwrap()).unwrap();
    let savings = Camt053Document::parse(&fs::read_to_string(fixture("savings.xml")).unwrap()).unwrap();

    let forward: Vec<_> = checking.statements.iter().chain(&savings.statements).cloned().collect();
    let backward: Vec<_> = savings.statements.iter().chain(&checking.statements).cloned().collect();

    let a = convert_statements(&accounts, &forward, ConvertOptions::default()).unwrap();
    let b = convert_statements(&accounts, &backward, ConvertOptions::default()).unwrap();

    assert_eq!(a.entry_count(), b.entry_count());
    for name in ["NL91ABNA0417164300", "NL02ABNA0123456789"] {
        let total = |doc: &camtqif::qif_format::QifDocument| -> Decimal {
            doc.account(name).unwrap().entries.iter().map(|e| e.amount).sum()
        };
        assert_eq!(total(&a), total(&b));
    }
}

#[test]
fn test_transfer_entries_offset_each_other() {
    let accounts = AccountMap::load(fixture("accounts.ini")).unwrap();
    let checking = Camt053Document::parse(&fs::read_to_string(fixture("checking.xml")).unwrap()).unwrap();
    let doc = convert_statements(&accounts, &checking.statements, ConvertOptions::default()).unwrap();

    let transfers = |iban: &str| -> Vec<Decimal> {
        doc.account(iban)
            .unwrap()
            .entries
            .iter()
            .filter(|e| e.category.as_deref().is_some_and(|c| c.starts_with('[')))
            .map(|e| e.amount)
            .collect()
    };

    let out = transfers("NL91ABNA0417164300");
    let back = transfers("NL02ABNA0123456789");
    assert_eq!(out.len(), 1);
    assert_eq!(back.len(), 1);
    assert_eq!(out[0] + back[0], Decimal::ZERO);
}

#[test]
fn test_strict_mode_accepts_known_wordings() {
    let accounts = AccountMap::load(fixture("accounts.ini")).unwrap();
    let checking = Camt053Document::parse(&fs::read_to_string(fixture("checking.xml")).unwrap()).unwrap();
    assert!(convert_statements(&accounts, &checking.statements, ConvertOptions { strict: true }).is_ok());
}
