//! Account configuration.
//!
//! The account map is an INI file with one section per bank account:
//!
//! ```ini
//! [checking]
//! iban = NL91ABNA0417164300
//! name = Checking
//!
//! [savings]
//! iban = NL02ABNA0123456789
//! name = Savings
//! transfers = true
//! ```
//!
//! `name` defaults to the IBAN, `type` to `Bank` and `transfers` to `true`.

use crate::error::{Error, Result};
use crate::types::normalize_iban;
use ini::Ini;
use std::collections::HashMap;
use std::path::Path;

/// QIF account types accepted in the `type` key.
const ACCOUNT_TYPES: &[&str] = &["Bank", "Cash", "CCard", "Oth A", "Oth L", "Invst"];

/// One configured bank account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountConfig {
    pub iban: String,
    /// Account name in the finance application.
    pub name: String,
    /// QIF account type written in the `!Account` header.
    pub account_type: String,
    /// Whether entries against other configured accounts become transfers.
    pub transfers: bool,
}

/// IBAN-keyed table of configured accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountMap {
    accounts: HashMap<String, AccountConfig>,
}

impl AccountMap {
    /// Load the account map from an INI file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!(
                "Cannot find configuration file {}",
                path.display()
            )));
        }
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Parse the account map from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let mut map = AccountMap::default();

        for (section, props) in ini.iter() {
            // Keys outside any section are not accounts.
            let Some(section) = section else { continue };

            let iban = props
                .get("iban")
                .map(normalize_iban)
                .filter(|iban| !iban.is_empty())
                .ok_or_else(|| Error::Config(format!("Section [{}] has no iban", section)))?;

            let name = props
                .get("name")
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| iban.clone());

            let account_type = match props.get("type").map(str::trim) {
                None | Some("") => "Bank".to_string(),
                Some(t) => ACCOUNT_TYPES
                    .iter()
                    .find(|known| known.eq_ignore_ascii_case(t))
                    .map(|known| known.to_string())
                    .ok_or_else(|| {
                        Error::Config(format!("Section [{}]: unknown account type {}", section, t))
                    })?,
            };

            let transfers = match props.get("transfers") {
                None => true,
                Some(value) => parse_bool(value).ok_or_else(|| {
                    Error::Config(format!(
                        "Section [{}]: invalid transfers value {}",
                        section, value
                    ))
                })?,
            };

            map.insert(AccountConfig {
                iban,
                name,
                account_type,
                transfers,
            })?;
        }

        log::debug!("Loaded {} configured accounts", map.len());
        Ok(map)
    }

    /// Add an account, rejecting duplicate IBANs.
    pub fn insert(&mut self, account: AccountConfig) -> Result<()> {
        if self.accounts.contains_key(&account.iban) {
            return Err(Error::Config(format!(
                "IBAN {} is configured more than once",
                account.iban
            )));
        }
        self.accounts.insert(account.iban.clone(), account);
        Ok(())
    }

    pub fn get(&self, iban: &str) -> Option<&AccountConfig> {
        self.accounts.get(&normalize_iban(iban))
    }

    pub fn contains(&self, iban: &str) -> bool {
        self.get(iban).is_some()
    }

    /// Application account name for an IBAN.
    pub fn name(&self, iban: &str) -> Option<&str> {
        self.get(iban).map(|a| a.name.as_str())
    }

    /// Whether a movement between `source` and `counterparty` is an internal transfer.
    pub fn is_transfer_pair(&self, source: &str, counterparty: &str) -> bool {
        match (self.get(source), self.get(counterparty)) {
            (Some(a), Some(b)) => a.iban != b.iban && a.transfers && b.transfers,
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[checking]
iban = NL91 ABNA 0417 1643 00
name = Checking

[savings]
iban = NL02ABNA0123456789
name = Savings
type = bank

[shared]
iban = NL39ABNA0987654321
transfers = no
"#;

    #[test]
    fn test_load_accounts() {
        let map = AccountMap::from_ini_str(CONFIG).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.name("NL91ABNA0417164300"), Some("Checking"));
        assert_eq!(map.get("NL02ABNA0123456789").unwrap().account_type, "Bank");
    }

    #[test]
    fn test_name_defaults_to_iban() {
        let map = AccountMap::from_ini_str(CONFIG).unwrap();
        assert_eq!(map.name("NL39ABNA0987654321"), Some("NL39ABNA0987654321"));
    }

    #[test]
    fn test_transfer_pair() {
        let map = AccountMap::from_ini_str(CONFIG).unwrap();
        assert!(map.is_transfer_pair("NL91ABNA0417164300", "nl02abna0123456789"));
        assert!(!map.is_transfer_pair("NL91ABNA0417164300", "NL91ABNA0417164300"));
        assert!(!map.is_transfer_pair("NL91ABNA0417164300", "NL39ABNA0987654321"));
        assert!(!map.is_transfer_pair("NL91ABNA0417164300", "DE89370400440532013000"));
    }

    #[test]
    fn test_missing_iban_is_an_error() {
        let err = AccountMap::from_ini_str("[broken]\nname = Nothing\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_duplicate_iban_is_an_error() {
        let text = "[a]\niban = NL02ABNA0123456789\n[b]\niban = nl02abna0123456789\n";
        assert!(AccountMap::from_ini_str(text).is_err());
    }

    #[test]
    fn test_invalid_type_and_flag() {
        assert!(AccountMap::from_ini_str("[a]\niban = X1\ntype = Stocks\n").is_err());
        assert!(AccountMap::from_ini_str("[a]\niban = X1\ntransfers = maybe\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AccountMap::load("/nonexistent/accounts.ini").unwrap_err();
        assert!(err.to_string().contains("Cannot find configuration file"));
    }
}
