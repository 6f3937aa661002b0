//! QIF (Quicken Interchange Format) writer.
//!
//! Entries are grouped per account. Each group starts with an `!Account`
//! block so the finance application files the following transactions into
//! the right account.

use crate::error::Result;
use crate::types::TransactionKind;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::Write;

/// One QIF transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QifEntry {
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub payee: Option<String>,
    pub memo: Option<String>,
    /// Category, or `[Account]` for a transfer.
    pub category: Option<String>,
}

impl QifEntry {
    /// Render the entry, terminated by `^`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "!Type:{}", self.kind)?;
        writeln!(writer, "D{}", format_date(&self.date))?;
        writeln!(writer, "T{}", format_amount(self.amount))?;
        writeln!(writer, "C")?;
        writeln!(writer, "P{}", field(self.payee.as_deref()))?;
        writeln!(writer, "M{}", field(self.memo.as_deref()))?;
        writeln!(writer, "L{}", field(self.category.as_deref()))?;
        writeln!(writer, "^")?;
        Ok(())
    }
}

/// A QIF account header and its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QifAccount {
    pub name: String,
    pub account_type: String,
    pub entries: Vec<QifEntry>,
}

impl QifAccount {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "!Account")?;
        writeln!(writer, "N{}", field(Some(self.name.as_str())))?;
        writeln!(writer, "T{}", self.account_type)?;
        writeln!(writer, "^")?;
        for entry in &self.entries {
            entry.write_to(writer)?;
        }
        Ok(())
    }
}

/// The whole QIF output, accounts in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct QifDocument {
    accounts: Vec<QifAccount>,
    index: HashMap<String, usize>,
}

impl QifDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the account identified by `key`, opening the account on first use.
    pub fn push(&mut self, key: &str, name: &str, account_type: &str, entry: QifEntry) {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.accounts.push(QifAccount {
                    name: name.to_string(),
                    account_type: account_type.to_string(),
                    entries: Vec::new(),
                });
                self.index.insert(key.to_string(), self.accounts.len() - 1);
                self.accounts.len() - 1
            }
        };
        self.accounts[idx].entries.push(entry);
    }

    pub fn accounts(&self) -> &[QifAccount] {
        &self.accounts
    }

    pub fn account(&self, key: &str) -> Option<&QifAccount> {
        self.index.get(key).map(|&idx| &self.accounts[idx])
    }

    pub fn entry_count(&self) -> usize {
        self.accounts.iter().map(|a| a.entries.len()).sum()
    }

    /// Write the document to any destination implementing `Write`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camtqif::qif_format::QifDocument;
    ///
    /// let document = QifDocument::new();
    /// let mut out = Vec::new();
    /// document.write_to(&mut out)?;
    /// assert!(out.is_empty());
    /// # Ok::<(), camtqif::Error>(())
    /// ```
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for account in &self.accounts {
            account.write_to(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Render the document as a string.
    pub fn to_qif_string(&self) -> Result<String> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Two decimals, `-` for outflows. A zero debit prints as `0.00`.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    if rounded.is_zero() {
        rounded = rounded.abs();
    }
    format!("{:.2}", rounded)
}

/// QIF fields are line based; embedded line breaks would start a new field.
fn field(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn entry(amount: &str) -> QifEntry {
        QifEntry {
            kind: TransactionKind::Bank,
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            amount: Decimal::from_str(amount).unwrap(),
            payee: Some("ALBERT HEIJN".into()),
            memo: None,
            category: None,
        }
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_date(&date), "2024/01/05");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from_str("-12.5").unwrap()), "-12.50");
        assert_eq!(format_amount(Decimal::from_str("1000").unwrap()), "1000.00");
        assert_eq!(format_amount(Decimal::from_str("0.125").unwrap()), "0.12");
        assert_eq!(format_amount(Decimal::from_str("3.14159").unwrap()), "3.14");
        assert_eq!(format_amount(-Decimal::from_str("0.00").unwrap()), "0.00");
        assert_eq!(format_amount(Decimal::from_str("-0.001").unwrap()), "0.00");
    }

    #[test]
    fn test_entry_layout() {
        let mut out = Vec::new();
        entry("-12.5").write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "!Type:Bank\nD2024/01/05\nT-12.50\nC\nPALBERT HEIJN\nM\nL\n^\n"
        );
    }

    #[test]
    fn test_multiline_memo_is_flattened() {
        let mut e = entry("1");
        e.memo = Some("first line\r\n  second line\n".into());
        let mut out = Vec::new();
        e.write_to(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\nMfirst line second line\n"));
    }

    #[test]
    fn test_accounts_keep_first_seen_order() {
        let mut doc = QifDocument::new();
        doc.push("B", "Savings", "Bank", entry("1"));
        doc.push("A", "Checking", "Bank", entry("2"));
        doc.push("B", "Savings", "Bank", entry("3"));

        let names: Vec<_> = doc.accounts().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Savings", "Checking"]);
        assert_eq!(doc.account("B").unwrap().entries.len(), 2);
        assert_eq!(doc.entry_count(), 3);

        let text = doc.to_qif_string().unwrap();
        assert!(text.starts_with("!Account\nNSavings\nTBank\n^\n!Type:Bank\n"));
    }
}
