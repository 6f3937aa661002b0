//! Recognition of the bank's free-text entry descriptions.
//!
//! ABN AMRO puts most of the useful information of an entry in
//! `AddtlNtryInf`: card payments carry the merchant after a timestamp, SEPA
//! transfers carry `/NAME/`, `/REMI/` and `/IBAN/` tagged fields, and the
//! bank's own fees and interest bookings have fixed wordings.

use crate::types::TransactionKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// Payee used for the bank's own bookings.
pub const BANK_PAYEE: &str = "ABN AMRO Bank N.V.";

static CARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<subtype>[GB])EA.+(\d{2}.){4}\d{2}(?P<payee>.+),PAS(\d+)")
        .expect("valid card payment pattern")
});

static SEPA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/TRTP/.+").expect("valid SEPA pattern"));

static SEPA_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(TRTP|CSID|NAME|MARF|REMI|IBAN|BIC|EREF)/").expect("valid SEPA marker pattern")
});

static FEE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<payee>ABN AMRO Bank N\.V\.)\s+(?P<memo>\w+).+").expect("valid fee pattern")
});

static INTEREST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ACCOUNT BALANCED\s+(?P<memo>CREDIT INTEREST.+)For interest rates")
        .expect("valid interest pattern")
});

/// Which wording an entry description was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionKind {
    /// `BEA` card payment or `GEA` cash withdrawal.
    Card,
    /// SEPA transfer or direct debit.
    Sepa,
    /// Bank fee booking.
    Fee,
    /// Savings interest booking.
    Interest,
    /// Nothing recognised.
    Unknown,
}

/// Details recovered from an entry description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDetails {
    pub kind: DescriptionKind,
    pub transaction_kind: TransactionKind,
    pub payee: Option<String>,
    pub memo: Option<String>,
    pub counterparty_account: Option<String>,
}

impl EntryDetails {
    fn new(kind: DescriptionKind) -> Self {
        Self {
            kind,
            transaction_kind: TransactionKind::Bank,
            payee: None,
            memo: None,
            counterparty_account: None,
        }
    }
}

/// Classify a description, trying card, SEPA, fee and interest wordings in turn.
pub fn parse_description(text: &str) -> EntryDetails {
    if let Some(caps) = CARD_RE.captures(text) {
        let mut details = EntryDetails::new(DescriptionKind::Card);
        if &caps["subtype"] == "G" {
            details.transaction_kind = TransactionKind::Cash;
        }
        details.payee = non_empty(&caps["payee"]);
        details.memo = non_empty(text);
        return details;
    }

    if SEPA_RE.is_match(text) {
        let mut details = EntryDetails::new(DescriptionKind::Sepa);
        details.payee = sepa_field(text, "NAME");
        details.memo = sepa_field(text, "REMI");
        details.counterparty_account = sepa_field(text, "IBAN");
        return details;
    }

    if let Some(caps) = FEE_RE.captures(text) {
        let mut details = EntryDetails::new(DescriptionKind::Fee);
        details.payee = non_empty(&caps["payee"]);
        details.memo = non_empty(&caps["memo"]);
        return details;
    }

    if let Some(caps) = INTEREST_RE.captures(text) {
        let mut details = EntryDetails::new(DescriptionKind::Interest);
        details.payee = Some(BANK_PAYEE.to_string());
        details.memo = non_empty(&caps["memo"]);
        return details;
    }

    EntryDetails::new(DescriptionKind::Unknown)
}

/// Value of a `/FIELD/` tagged SEPA field, up to the next marker or the end of the text.
pub fn sepa_field(text: &str, field: &str) -> Option<String> {
    let mut markers = SEPA_MARKER_RE.captures_iter(text).peekable();
    while let Some(caps) = markers.next() {
        if &caps[1] != field {
            continue;
        }
        let start = caps.get(0).map_or(text.len(), |m| m.end());
        let end = markers
            .peek()
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        return non_empty(&text[start..end]);
    }
    None
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
