// Lookup module - ISIN to payer country / address, country to treaty relief

mod builtin;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::ReportError;

/// Placeholder written into the report when an ISIN has no known country
pub const COUNTRY_MISSING: &str = "COUNTRY MISSING";

/// Where an instrument's issuer is domiciled
pub trait InstrumentDirectory {
    /// ISO 3166-1 alpha-2 code
    fn country_of(&self, isin: &str) -> Option<String>;
    fn address_of(&self, isin: &str) -> Option<String>;
}

/// Double-taxation treaties between Slovenia and a source country
pub trait TreatyTable {
    /// Treaty withholding rate in percent, if a treaty exists
    fn relief_of(&self, country: &str) -> Option<Decimal>;
}

/// In-memory lookup tables, built-in entries first, then CSV overrides
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    countries: HashMap<String, String>,
    addresses: HashMap<String, String>,
    treaties: HashMap<String, Decimal>,
}

impl LookupTables {
    /// Tables seeded with the built-in ISIN to country map
    pub fn builtin() -> Self {
        let countries = builtin::ISIN_COUNTRIES
            .iter()
            .map(|(isin, country)| (isin.to_string(), country.to_string()))
            .collect();

        Self {
            countries,
            ..Self::default()
        }
    }

    /// Built-in tables extended by whichever CSV files are given
    pub fn load(
        countries: Option<&Path>,
        addresses: Option<&Path>,
        treaties: Option<&Path>,
    ) -> Result<Self> {
        let mut tables = Self::builtin();

        if let Some(path) = countries {
            let rows = read_pairs(path, "isin", "country")?;
            debug!("Loaded {} country entries from {:?}", rows.len(), path);
            for (isin, country) in rows {
                tables.insert_country(&isin, &country);
            }
        }

        if let Some(path) = addresses {
            let rows = read_pairs(path, "isin", "address")?;
            debug!("Loaded {} address entries from {:?}", rows.len(), path);
            for (isin, address) in rows {
                tables.insert_address(&isin, &address);
            }
        }

        if let Some(path) = treaties {
            let rows = read_pairs(path, "country", "relief")?;
            debug!("Loaded {} treaty entries from {:?}", rows.len(), path);
            for (country, relief) in rows {
                let rate = Decimal::from_str(&relief).map_err(|_| {
                    ReportError::Lookup(format!(
                        "invalid relief '{}' for country {} in {:?}",
                        relief, country, path
                    ))
                })?;
                tables.insert_treaty(&country, rate);
            }
        }

        Ok(tables)
    }

    pub fn insert_country(&mut self, isin: &str, country: &str) {
        self.countries
            .insert(normalize(isin), country.trim().to_ascii_uppercase());
    }

    pub fn insert_address(&mut self, isin: &str, address: &str) {
        self.addresses
            .insert(normalize(isin), address.trim().to_string());
    }

    pub fn insert_treaty(&mut self, country: &str, relief: Decimal) {
        self.treaties.insert(normalize(country), relief);
    }

    pub fn has_treaties(&self) -> bool {
        !self.treaties.is_empty()
    }
}

impl InstrumentDirectory for LookupTables {
    fn country_of(&self, isin: &str) -> Option<String> {
        self.countries.get(&normalize(isin)).cloned()
    }

    fn address_of(&self, isin: &str) -> Option<String> {
        self.addresses.get(&normalize(isin)).cloned()
    }
}

impl TreatyTable for LookupTables {
    fn relief_of(&self, country: &str) -> Option<Decimal> {
        self.treaties.get(&normalize(country)).copied()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

fn get_field<'a>(record: &'a csv::StringRecord, headers: &csv::StringRecord, name: &str) -> &'a str {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .and_then(|idx| record.get(idx))
        .unwrap_or("")
        .trim()
}

/// Read a two-column CSV keyed by header names, skipping blank keys
fn read_pairs(path: &Path, key: &str, value: &str) -> Result<Vec<(String, String)>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read lookup file {:?}", path))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    for column in [key, value] {
        if !headers.iter().any(|h| h.trim().eq_ignore_ascii_case(column)) {
            return Err(ReportError::Lookup(format!(
                "{:?} has no '{}' column",
                path, column
            ))
            .into());
        }
    }

    let mut pairs = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to parse {:?}", path))?;
        let k = get_field(&record, &headers, key);
        if k.is_empty() {
            continue;
        }
        pairs.push((k.to_string(), get_field(&record, &headers, value).to_string()));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_countries() {
        let tables = LookupTables::builtin();
        assert_eq!(tables.country_of("US0378331005").as_deref(), Some("US"));
        assert_eq!(tables.country_of(" ch0012221716 ").as_deref(), Some("CH"));
        // ADRs resolve to the issuer's home country
        assert_eq!(tables.country_of("US0594603039").as_deref(), Some("BR"));
        assert_eq!(tables.address_of("US0378331005"), None);
    }

    #[test]
    fn test_csv_overrides_and_extends() {
        let tmp = TempDir::new().unwrap();
        let countries = tmp.path().join("countries.csv");
        let addresses = tmp.path().join("addresses.csv");
        let treaties = tmp.path().join("treaties.csv");
        fs::write(&countries, "isin,country\nUS0378331005,ie\nXX0000000001,DE\n,FR\n").unwrap();
        fs::write(
            &addresses,
            "ISIN,Address\nUS0378331005,\"One Apple Park Way, Cupertino\"\n",
        )
        .unwrap();
        fs::write(&treaties, "country,relief\nUS,15\nDE,15.5\n").unwrap();

        let tables = LookupTables::load(Some(&countries), Some(&addresses), Some(&treaties)).unwrap();

        assert_eq!(tables.country_of("US0378331005").as_deref(), Some("IE"));
        assert_eq!(tables.country_of("XX0000000001").as_deref(), Some("DE"));
        assert_eq!(tables.country_of("CH0012221716").as_deref(), Some("CH"));
        assert_eq!(
            tables.address_of("US0378331005").as_deref(),
            Some("One Apple Park Way, Cupertino")
        );
        assert_eq!(tables.relief_of("us"), Some(dec!(15)));
        assert_eq!(tables.relief_of("DE"), Some(dec!(15.5)));
        assert_eq!(tables.relief_of("FR"), None);
        assert!(tables.has_treaties());
    }

    #[test]
    fn test_missing_column_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("countries.csv");
        fs::write(&path, "code,name\nUS,United States\n").unwrap();

        let err = LookupTables::load(Some(&path), None, None).unwrap_err();
        assert!(err.to_string().contains("'isin'"));
    }

    #[test]
    fn test_invalid_relief_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("treaties.csv");
        fs::write(&path, "country,relief\nUS,fifteen\n").unwrap();

        let err = LookupTables::load(None, None, Some(&path)).unwrap_err();
        assert!(err.to_string().contains("fifteen"));
    }

    #[test]
    fn test_unreadable_file_names_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("no_such_countries.csv");

        let err = LookupTables::load(Some(&path), None, None).unwrap_err();
        assert!(err.to_string().contains("no_such_countries.csv"));
        assert!(err.downcast_ref::<ReportError>().is_none());
    }
}
