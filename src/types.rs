//! Common types shared by the parser, the classifier and the QIF writer.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// A single booked entry of a bank statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Entry reference, when the bank provides one.
    pub reference: Option<String>,

    /// Date used for the ledger (value date, or booking date when absent).
    pub date: NaiveDate,

    /// Booking date.
    pub booking_date: Option<NaiveDate>,

    /// Signed amount: negative for debits.
    pub amount: Decimal,

    /// Currency code (e.g., EUR).
    pub currency: String,

    /// Debit (D) or Credit (C) indicator.
    pub debit_credit: DebitCredit,

    /// Counterparty IBAN.
    pub counterparty_account: Option<String>,

    /// Counterparty name.
    pub counterparty_name: Option<String>,

    /// Unstructured remittance information.
    pub remittance: Option<String>,

    /// Free-text entry description (`AddtlNtryInf`).
    pub description: String,
}

/// Debit/Credit indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitCredit {
    /// Debit transaction (outgoing).
    Debit,
    /// Credit transaction (incoming).
    Credit,
}

impl FromStr for DebitCredit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "D" | "DBIT" | "DEBIT" => Ok(DebitCredit::Debit),
            "C" | "CRDT" | "CREDIT" => Ok(DebitCredit::Credit),
            _ => Err(format!("Invalid debit/credit indicator: {}", s)),
        }
    }
}

impl DebitCredit {
    /// Apply the indicator to an unsigned statement amount.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            DebitCredit::Debit => -amount,
            DebitCredit::Credit => amount,
        }
    }
}

/// QIF transaction type of a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionKind {
    /// Ordinary bank movement.
    #[default]
    Bank,
    /// Cash withdrawal.
    Cash,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Bank => "Bank",
            TransactionKind::Cash => "Cash",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account statement containing transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement identification.
    pub statement_id: String,

    /// Account IBAN.
    pub account: String,

    /// Currency code for the account.
    pub currency: String,

    /// List of transactions.
    pub transactions: Vec<Transaction>,
}

impl Statement {
    /// Create a new statement with basic information.
    pub fn new(statement_id: String, account: String, currency: String) -> Self {
        Self {
            statement_id,
            account,
            currency,
            transactions: Vec::new(),
        }
    }

    /// Add a transaction to the statement.
    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }
}

/// Strip whitespace and upper-case an account number so lookups are stable.
pub fn normalize_iban(iban: &str) -> String {
    iban.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_uppercase())
        .collect()
}
