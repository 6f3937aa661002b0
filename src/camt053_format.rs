//! CAMT.053 (ISO 20022) statement parser.
//!
//! CAMT.053 is an XML-based bank-to-customer account statement format
//! defined by the ISO 20022 standard. Only the parts needed to build a
//! ledger are read: the account, and per entry the amount, direction,
//! dates, description and related parties.

use crate::error::{Error, Result};
use crate::types::{normalize_iban, DebitCredit, Statement, Transaction};
use chrono::NaiveDate;
use quick_xml::events::Event;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

/// Namespace prefix shared by every CAMT.053 schema version.
pub const CAMT053_NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:camt.053";

/// A parsed CAMT.053 document; one document may carry several statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Camt053Document {
    /// Namespace the document declared, e.g. `...camt.053.001.02`.
    pub namespace: String,
    /// Statements in document order.
    pub statements: Vec<Statement>,
}

impl Camt053Document {
    /// Parse a CAMT.053 document from any source implementing `Read`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use camtqif::camt053_format::Camt053Document;
    ///
    /// let mut file = File::open("statement.xml")?;
    /// let document = Camt053Document::from_read(&mut file)?;
    /// println!("{} statements", document.statements.len());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Parse raw export bytes, which may be UTF-8 or Windows-1252.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode_export(bytes);
        Self::parse(&text)
    }

    /// Parse a CAMT.053 document from text.
    pub fn parse(xml: &str) -> Result<Self> {
        let xml = strip_declaration(xml);

        let namespace = document_namespace(xml)?;
        if !namespace.starts_with(CAMT053_NAMESPACE) {
            return Err(Error::UnsupportedDocument(namespace));
        }

        let document: Document = serde_xml_rs::from_str(xml)?;
        Self::from_document(namespace, document)
    }

    fn from_document(namespace: String, document: Document) -> Result<Self> {
        if document.bk_to_cstmr_stmt.stmt.is_empty() {
            return Err(Error::MissingField("Stmt".to_string()));
        }

        let statements = document
            .bk_to_cstmr_stmt
            .stmt
            .iter()
            .map(Self::parse_statement)
            .collect::<Result<Vec<_>>>()?;

        Ok(Camt053Document {
            namespace,
            statements,
        })
    }

    fn parse_statement(stmt_data: &StatementXml) -> Result<Statement> {
        let account_id = stmt_data
            .acct
            .id
            .account_number()
            .ok_or_else(|| Error::MissingField("Stmt/Acct/Id/IBAN".to_string()))?;

        let currency = stmt_data.acct.ccy.clone().unwrap_or_default();
        let statement_id = stmt_data.id.clone().unwrap_or_default();

        let mut statement = Statement::new(statement_id, account_id, currency);

        for entry in &stmt_data.ntry {
            let transaction = Self::parse_entry(entry, &statement.currency)?;
            statement.add_transaction(transaction);
        }

        log::debug!(
            "Parsed statement {} for {} with {} entries",
            statement.statement_id,
            statement.account,
            statement.transactions.len()
        );

        Ok(statement)
    }

    fn parse_entry(entry: &EntryXml, default_currency: &str) -> Result<Transaction> {
        let amt = entry
            .amt
            .as_ref()
            .ok_or_else(|| Error::MissingField("Ntry/Amt".to_string()))?;
        let unsigned = Decimal::from_str(amt.value.trim())
            .map_err(|_| Error::InvalidAmount(amt.value.clone()))?;

        let indicator = entry
            .cdt_dbt_ind
            .as_deref()
            .ok_or_else(|| Error::MissingField("Ntry/CdtDbtInd".to_string()))?;
        let debit_credit = indicator
            .parse::<DebitCredit>()
            .map_err(Error::ParseError)?;

        let value_date = entry.val_dt.as_ref().map(DateXml::to_date).transpose()?.flatten();
        let booking_date = entry.bookg_dt.as_ref().map(DateXml::to_date).transpose()?.flatten();
        let date = value_date
            .or(booking_date)
            .ok_or_else(|| Error::MissingField("Ntry/ValDt".to_string()))?;

        let mut counterparty_name = None;
        let mut counterparty_account = None;
        let mut remittance = None;

        // Batched entries repeat TxDtls; the first one describes the entry.
        if let Some(tx_dtls) = entry.ntry_dtls.as_ref().and_then(|d| d.tx_dtls.first()) {
            if let Some(ref rmt_inf) = tx_dtls.rmt_inf {
                remittance = rmt_inf
                    .ustrd
                    .first()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
            }

            if let Some(ref pties) = tx_dtls.rltd_pties {
                let (party, party_acct, other, other_acct) = match debit_credit {
                    DebitCredit::Debit => (&pties.cdtr, &pties.cdtr_acct, &pties.dbtr, &pties.dbtr_acct),
                    DebitCredit::Credit => (&pties.dbtr, &pties.dbtr_acct, &pties.cdtr, &pties.cdtr_acct),
                };
                counterparty_name = party
                    .as_ref()
                    .and_then(|p| p.nm.clone())
                    .or_else(|| other.as_ref().and_then(|p| p.nm.clone()));
                counterparty_account = party_acct
                    .as_ref()
                    .or(other_acct.as_ref())
                    .and_then(|a| a.id.account_number());
            }
        }

        Ok(Transaction {
            reference: entry.ntry_ref.clone().or_else(|| entry.acct_svcr_ref.clone()),
            date,
            booking_date,
            amount: debit_credit.signed(unsigned),
            currency: amt.ccy().unwrap_or_else(|| default_currency.to_string()),
            debit_credit,
            counterparty_account,
            counterparty_name,
            remittance,
            description: entry.addtl_ntry_inf.clone().unwrap_or_default(),
        })
    }
}

/// Decode an export as UTF-8, falling back to Windows-1252.
pub fn decode_export(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            log::debug!("Export is not valid UTF-8, decoding as Windows-1252");
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
    }
}

/// Drop the `<?xml ...?>` declaration; the text is already decoded, so its
/// `encoding` attribute no longer applies.
fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}

/// Namespace declared on the root `Document` element.
fn document_namespace(xml: &str) -> Result<String> {
    let mut reader = quick_xml::Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                if e.local_name().as_ref() != b"Document" {
                    return Err(Error::UnsupportedDocument(format!(
                        "root element <{}>",
                        String::from_utf8_lossy(name.as_ref())
                    )));
                }

                let ns_key = match name.prefix() {
                    Some(prefix) => [b"xmlns:".as_slice(), prefix.as_ref()].concat(),
                    None => b"xmlns".to_vec(),
                };

                for attr in e.attributes() {
                    let attr = attr.map_err(|err| Error::XmlError(err.to_string()))?;
                    if attr.key.as_ref() == ns_key.as_slice() {
                        return Ok(attr.unescape_value()?.trim().to_string());
                    }
                }

                return Err(Error::UnsupportedDocument(
                    "Document declares no namespace".to_string(),
                ));
            }
            Event::Eof => return Err(Error::XmlError("empty document".to_string())),
            _ => {}
        }
    }
}

// XML structure definitions
#[derive(Debug, Deserialize)]
#[serde(rename = "Document")]
struct Document {
    #[serde(rename = "BkToCstmrStmt")]
    bk_to_cstmr_stmt: BankToCustomerStatementXml,
}

#[derive(Debug, Deserialize)]
struct BankToCustomerStatementXml {
    #[serde(rename = "Stmt", default)]
    stmt: Vec<StatementXml>,
}

#[derive(Debug, Deserialize)]
struct StatementXml {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "Acct")]
    acct: AccountInfoXml,
    #[serde(rename = "Ntry", default)]
    ntry: Vec<EntryXml>,
}

#[derive(Debug, Deserialize)]
struct AccountInfoXml {
    #[serde(rename = "Id")]
    id: AccountIdXml,
    #[serde(rename = "Ccy")]
    ccy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountIdXml {
    #[serde(rename = "IBAN")]
    iban: Option<String>,
    #[serde(rename = "Othr")]
    othr: Option<OtherAccountIdXml>,
}

impl AccountIdXml {
    fn account_number(&self) -> Option<String> {
        self.iban
            .as_deref()
            .or_else(|| self.othr.as_ref().map(|o| o.id.as_str()))
            .map(normalize_iban)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct OtherAccountIdXml {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct AmountXml {
    #[serde(rename = "$value")]
    value: String,
    #[serde(rename = "@Ccy")]
    ccy: Option<String>,
    #[serde(rename = "Ccy")]
    ccy_alt: Option<String>,
}

impl AmountXml {
    fn ccy(&self) -> Option<String> {
        self.ccy.clone().or_else(|| self.ccy_alt.clone())
    }
}

#[derive(Debug, Deserialize)]
struct DateXml {
    #[serde(rename = "Dt")]
    dt: Option<String>,
    #[serde(rename = "DtTm")]
    dt_tm: Option<String>,
}

impl DateXml {
    fn to_date(&self) -> Result<Option<NaiveDate>> {
        if let Some(ref d) = self.dt {
            parse_date_only(d).map(Some)
        } else if let Some(ref dt_tm) = self.dt_tm {
            parse_camt_date(dt_tm).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntryXml {
    #[serde(rename = "NtryRef")]
    ntry_ref: Option<String>,
    #[serde(rename = "Amt")]
    amt: Option<AmountXml>,
    #[serde(rename = "CdtDbtInd")]
    cdt_dbt_ind: Option<String>,
    #[serde(rename = "BookgDt")]
    bookg_dt: Option<DateXml>,
    #[serde(rename = "ValDt")]
    val_dt: Option<DateXml>,
    #[serde(rename = "AcctSvcrRef")]
    acct_svcr_ref: Option<String>,
    #[serde(rename = "NtryDtls")]
    ntry_dtls: Option<EntryDetailsXml>,
    #[serde(rename = "AddtlNtryInf")]
    addtl_ntry_inf: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntryDetailsXml {
    #[serde(rename = "TxDtls", default)]
    tx_dtls: Vec<TransactionDetailsXml>,
}

#[derive(Debug, Deserialize)]
struct TransactionDetailsXml {
    #[serde(rename = "RltdPties")]
    rltd_pties: Option<RelatedPartiesXml>,
    #[serde(rename = "RmtInf")]
    rmt_inf: Option<RemittanceInformationXml>,
}

#[derive(Debug, Deserialize)]
struct RelatedPartiesXml {
    #[serde(rename = "Dbtr")]
    dbtr: Option<PartyXml>,
    #[serde(rename = "DbtrAcct")]
    dbtr_acct: Option<AccountXml>,
    #[serde(rename = "Cdtr")]
    cdtr: Option<PartyXml>,
    #[serde(rename = "CdtrAcct")]
    cdtr_acct: Option<AccountXml>,
}

#[derive(Debug, Deserialize)]
struct PartyXml {
    #[serde(rename = "Nm")]
    nm: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountXml {
    #[serde(rename = "Id")]
    id: AccountIdXml,
}

#[derive(Debug, Deserialize)]
struct RemittanceInformationXml {
    #[serde(rename = "Ustrd", default)]
    ustrd: Vec<String>,
}

// Helper functions for date parsing
fn parse_camt_date(date_str: &str) -> Result<NaiveDate> {
    let date_str = date_str.trim();

    // ISO 8601 with time: 2023-04-20T23:24:31
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }

    // With offset: 2023-04-20T23:24:31+02:00
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.date_naive());
    }

    parse_date_only(date_str)
}

fn parse_date_only(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(date_str.to_string()))
}
