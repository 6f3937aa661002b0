//! Statement to QIF conversion.
//!
//! Each statement entry becomes a QIF entry in the statement's account.
//! When the counterparty is another configured account and both accounts
//! take part in transfers, the entry is booked as a transfer and the
//! complementary entry is added to the counterparty account as well.

use crate::config::AccountMap;
use crate::description::{parse_description, DescriptionKind};
use crate::error::{Error, Result};
use crate::qif_format::{QifDocument, QifEntry};
use crate::types::{normalize_iban, Statement, Transaction, TransactionKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// Memo used for transfers without remittance information.
pub const TRANSFER_MEMO: &str = "Transfer";

/// Conversion switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Fail on entry descriptions that match no known wording.
    pub strict: bool,
}

/// A QIF entry together with the account it is booked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// IBAN of the account the entry belongs to.
    pub account: String,
    /// IBAN of the other side, when known.
    pub counterparty: Option<String>,
    pub transfer: bool,
    pub entry: QifEntry,
}

impl LedgerEntry {
    fn key(&self) -> EntryKey {
        // The two sides of a transfer describe it differently, so only the
        // accounts, date and amount identify it.
        let (payee, memo) = if self.transfer {
            (None, None)
        } else {
            (self.entry.payee.clone(), self.entry.memo.clone())
        };
        EntryKey {
            account: self.account.clone(),
            counterparty: self.counterparty.clone(),
            kind: self.entry.kind,
            date: self.entry.date,
            amount: self.entry.amount,
            payee,
            memo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    account: String,
    counterparty: Option<String>,
    kind: TransactionKind,
    date: NaiveDate,
    amount: Decimal,
    payee: Option<String>,
    memo: Option<String>,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub accounts: usize,
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Process completed:\n    {} transactions inserted\n    into {} accounts\n    and {} transactions reported as duplicated",
            self.inserted, self.accounts, self.duplicates
        )
    }
}

/// Accumulates statements into a single QIF document.
pub struct Converter<'a> {
    accounts: &'a AccountMap,
    options: ConvertOptions,
    document: QifDocument,
    seen: HashMap<EntryKey, usize>,
    inserted: usize,
    duplicates: usize,
}

impl<'a> Converter<'a> {
    pub fn new(accounts: &'a AccountMap, options: ConvertOptions) -> Self {
        Self {
            accounts,
            options,
            document: QifDocument::new(),
            seen: HashMap::new(),
            inserted: 0,
            duplicates: 0,
        }
    }

    /// Classify every entry of a statement and add the result to the document.
    ///
    /// Entries already produced by an earlier statement (an overlapping
    /// export, or the other side of a transfer) are skipped. Identical
    /// entries within one statement are all kept.
    pub fn add_statement(&mut self, statement: &Statement) -> Result<()> {
        let account = normalize_iban(&statement.account);
        if !self.accounts.contains(&account) {
            return Err(Error::UnmappedAccount(account));
        }

        let mut ledger = Vec::new();
        for transaction in &statement.transactions {
            ledger.extend(self.classify(&account, transaction)?);
        }

        let mut local: HashMap<EntryKey, usize> = HashMap::new();
        for line in ledger {
            let key = line.key();
            let count = local.entry(key.clone()).or_insert(0);
            *count += 1;

            let seen = self.seen.entry(key).or_insert(0);
            if *count > *seen {
                *seen = *count;
                self.book(line);
            } else {
                log::debug!(
                    "Found duplicated transaction: {} {} -> {} {}",
                    line.entry.date,
                    line.account,
                    line.counterparty.as_deref().unwrap_or("-"),
                    line.entry.amount
                );
                self.duplicates += 1;
            }
        }

        Ok(())
    }

    /// Turn one transaction into one ledger entry, or two for a transfer.
    pub fn classify(&self, account: &str, transaction: &Transaction) -> Result<Vec<LedgerEntry>> {
        let details = parse_description(&transaction.description);
        if details.kind == DescriptionKind::Unknown && self.options.strict {
            return Err(Error::UnsupportedTransaction(transaction.description.clone()));
        }

        let counterparty = details
            .counterparty_account
            .as_deref()
            .map(normalize_iban)
            .or_else(|| transaction.counterparty_account.clone());

        let payee = details.payee.or_else(|| transaction.counterparty_name.clone());
        let memo = details.memo.or_else(|| transaction.remittance.clone()).or_else(|| {
            let text = transaction.description.trim();
            (details.kind == DescriptionKind::Unknown && !text.is_empty()).then(|| text.to_string())
        });

        let entry = QifEntry {
            kind: details.transaction_kind,
            date: transaction.date,
            amount: transaction.amount,
            payee,
            memo,
            category: None,
        };

        match counterparty {
            Some(other) if self.accounts.is_transfer_pair(account, &other) => {
                let memo = entry.memo.clone().or_else(|| Some(TRANSFER_MEMO.to_string()));
                let outgoing = QifEntry {
                    memo: memo.clone(),
                    category: Some(self.transfer_category(&other)),
                    ..entry.clone()
                };
                let complement = QifEntry {
                    amount: -entry.amount,
                    memo,
                    category: Some(self.transfer_category(account)),
                    ..entry
                };
                Ok(vec![
                    LedgerEntry {
                        account: account.to_string(),
                        counterparty: Some(other.clone()),
                        transfer: true,
                        entry: outgoing,
                    },
                    LedgerEntry {
                        account: other,
                        counterparty: Some(account.to_string()),
                        transfer: true,
                        entry: complement,
                    },
                ])
            }
            counterparty => Ok(vec![LedgerEntry {
                account: account.to_string(),
                counterparty,
                transfer: false,
                entry,
            }]),
        }
    }

    fn transfer_category(&self, iban: &str) -> String {
        format!("[{}]", self.accounts.name(iban).unwrap_or(iban))
    }

    fn book(&mut self, line: LedgerEntry) {
        let (name, account_type) = match self.accounts.get(&line.account) {
            Some(config) => (config.name.as_str(), config.account_type.as_str()),
            None => (line.account.as_str(), "Bank"),
        };
        self.document.push(&line.account, name, account_type, line.entry);
        self.inserted += 1;
    }

    pub fn summary(&self) -> ConversionSummary {
        ConversionSummary {
            inserted: self.inserted,
            duplicates: self.duplicates,
            accounts: self.document.accounts().len(),
        }
    }

    pub fn document(&self) -> &QifDocument {
        &self.document
    }

    pub fn into_document(self) -> QifDocument {
        self.document
    }
}

/// Convert a set of statements in one go.
pub fn convert_statements(
    accounts: &AccountMap,
    statements: &[Statement],
    options: ConvertOptions,
) -> Result<QifDocument> {
    let mut converter = Converter::new(accounts, options);
    for statement in statements {
        converter.add_statement(statement)?;
    }
    Ok(converter.into_document())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DebitCredit;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const CHECKING: &str = "NL91ABNA0417164300";
    const SAVINGS: &str = "NL02ABNA0123456789";

    fn accounts() -> AccountMap {
        AccountMap::from_ini_str(&format!(
            "[checking]\niban = {}\nname = Checking\n\n[savings]\niban = {}\nname = Savings\n",
            CHECKING, SAVINGS
        ))
        .unwrap()
    }

    fn transaction(amount: &str, description: &str) -> Transaction {
        let amount = Decimal::from_str(amount).unwrap();
        Transaction {
            reference: None,
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            booking_date: None,
            amount,
            currency: "EUR".into(),
            debit_credit: if amount.is_sign_negative() {
                DebitCredit::Debit
            } else {
                DebitCredit::Credit
            },
            counterparty_account: None,
            counterparty_name: None,
            remittance: None,
            description: description.into(),
        }
    }

    fn statement(account: &str, transactions: Vec<Transaction>) -> Statement {
        let mut statement = Statement::new("S1".into(), account.into(), "EUR".into());
        for t in transactions {
            statement.add_transaction(t);
        }
        statement
    }

    fn sepa_to(iban: &str, amount: &str) -> Transaction {
        transaction(
            amount,
            &format!("/TRTP/SEPA OVERBOEKING/IBAN/{}/BIC/ABNANL2A/NAME/OWNER/REMI//EREF/NOTPROVIDED", iban),
        )
    }

    #[test]
    fn test_plain_entry() {
        let map = accounts();
        let converter = Converter::new(&map, ConvertOptions::default());
        let lines = converter
            .classify(CHECKING, &transaction("-4.50", "BEA   NR:XX 01.02.24/08.15 COFFEE BAR,PAS001"))
            .unwrap();

        assert_eq!(lines.len(), 1);
        assert!(!lines[0].transfer);
        assert_eq!(lines[0].entry.payee.as_deref(), Some("COFFEE BAR"));
        assert_eq!(lines[0].entry.category, None);
    }

    #[test]
    fn test_transfer_produces_symmetric_entries() {
        let map = accounts();
        let converter = Converter::new(&map, ConvertOptions::default());
        let lines = converter.classify(CHECKING, &sepa_to(SAVINGS, "-100.00")).unwrap();

        assert_eq!(lines.len(), 2);
        let (out, back) = (&lines[0], &lines[1]);
        assert_eq!(out.account, CHECKING);
        assert_eq!(back.account, SAVINGS);
        assert_eq!(out.entry.amount, -back.entry.amount);
        assert_eq!(out.entry.date, back.entry.date);
        assert_eq!(out.entry.category.as_deref(), Some("[Savings]"));
        assert_eq!(back.entry.category.as_deref(), Some("[Checking]"));
        assert_eq!(out.entry.memo.as_deref(), Some(TRANSFER_MEMO));
    }

    #[test]
    fn test_transfer_disabled_account_is_plain() {
        let map = AccountMap::from_ini_str(&format!(
            "[checking]\niban = {}\n[savings]\niban = {}\ntransfers = false\n",
            CHECKING, SAVINGS
        ))
        .unwrap();
        let converter = Converter::new(&map, ConvertOptions::default());
        let lines = converter.classify(CHECKING, &sepa_to(SAVINGS, "-100.00")).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].entry.payee.as_deref(), Some("OWNER"));
    }

    #[test]
    fn test_generic_entry_uses_structured_fields() {
        let map = accounts();
        let converter = Converter::new(&map, ConvertOptions::default());
        let mut t = transaction("25.00", "Refund");
        t.counterparty_name = Some("Web Shop".into());
        let lines = converter.classify(CHECKING, &t).unwrap();
        assert_eq!(lines[0].entry.payee.as_deref(), Some("Web Shop"));
        assert_eq!(lines[0].entry.memo.as_deref(), Some("Refund"));
    }

    #[test]
    fn test_structured_counterparty_can_make_a_transfer() {
        let map = accounts();
        let converter = Converter::new(&map, ConvertOptions::default());
        let mut t = transaction("50.00", "Incoming");
        t.counterparty_account = Some(SAVINGS.into());
        let lines = converter.classify(CHECKING, &t).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.transfer));
    }

    #[test]
    fn test_strict_mode_rejects_unknown_descriptions() {
        let map = accounts();
        let converter = Converter::new(&map, ConvertOptions { strict: true });
        let err = converter.classify(CHECKING, &transaction("1.00", "???")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransaction(_)));
    }

    #[test]
    fn test_unmapped_account() {
        let map = accounts();
        let mut converter = Converter::new(&map, ConvertOptions::default());
        let err = converter
            .add_statement(&statement("DE89370400440532013000", vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::UnmappedAccount(_)));
    }

    #[test]
    fn test_both_sides_of_a_transfer_are_booked_once() {
        let map = accounts();
        let mut converter = Converter::new(&map, ConvertOptions::default());
        converter
            .add_statement(&statement(CHECKING, vec![sepa_to(SAVINGS, "-100.00")]))
            .unwrap();
        converter
            .add_statement(&statement(SAVINGS, vec![sepa_to(CHECKING, "100.00")]))
            .unwrap();

        let summary = converter.summary();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.accounts, 2);
    }

    #[test]
    fn test_overlapping_exports_and_repeated_purchases() {
        let map = accounts();
        let coffee = || transaction("-2.00", "BEA   NR:XX 01.02.24/08.15 COFFEE BAR,PAS001");
        let mut converter = Converter::new(&map, ConvertOptions::default());

        // Two identical purchases on the same day are both real.
        converter
            .add_statement(&statement(CHECKING, vec![coffee(), coffee()]))
            .unwrap();
        assert_eq!(converter.summary().inserted, 2);

        // A later export repeating the same day adds nothing new.
        converter
            .add_statement(&statement(CHECKING, vec![coffee(), coffee()]))
            .unwrap();
        assert_eq!(converter.summary().inserted, 2);
        assert_eq!(converter.summary().duplicates, 2);

        // A third purchase shows up once the export covers it.
        converter
            .add_statement(&statement(CHECKING, vec![coffee(), coffee(), coffee()]))
            .unwrap();
        assert_eq!(converter.summary().inserted, 3);
    }

    #[test]
    fn test_summary_display() {
        let summary = ConversionSummary {
            inserted: 3,
            duplicates: 1,
            accounts: 2,
        };
        let text = summary.to_string();
        assert!(text.contains("3 transactions inserted"));
        assert!(text.contains("into 2 accounts"));
        assert!(text.contains("1 transactions reported as duplicated"));
    }
}
