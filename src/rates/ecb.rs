use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use super::RateSample;

/// ECB daily reference rate, US dollars per euro
pub const ECB_USD_EUR_URL: &str =
    "https://data-api.ecb.europa.eu/service/data/EXR/D.USD.EUR.SP00.A?format=csvdata";
const CACHE_FILENAME: &str = "usd_eur.csv";
pub const CACHE_MAX_AGE_HOURS: u64 = 24;

/// Where and how to obtain the rate series
#[derive(Debug, Clone)]
pub struct RateFeed {
    pub url: String,
    pub cache_max_age_hours: u64,
    /// Never touch the network; a cached copy must exist
    pub offline: bool,
}

impl Default for RateFeed {
    fn default() -> Self {
        Self {
            url: ECB_USD_EUR_URL.to_string(),
            cache_max_age_hours: CACHE_MAX_AGE_HOURS,
            offline: false,
        }
    }
}

pub fn get_rates_cache_dir() -> Result<PathBuf> {
    let cache_dir = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(dir_spec::cache_home)
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("edavki").join("rates"))
}

/// Make sure a fresh copy of the rate CSV is cached and return its path
pub fn refresh_rates_csv(feed: &RateFeed, force: bool) -> Result<PathBuf> {
    let cache_dir = get_rates_cache_dir()?;
    fs::create_dir_all(&cache_dir).context("Failed to create rates cache directory")?;

    let csv_path = cache_dir.join(CACHE_FILENAME);

    if feed.offline {
        if csv_path.exists() {
            debug!("Offline mode, using cached rates at {:?}", csv_path);
            return Ok(csv_path);
        }
        bail!(
            "Offline mode and no cached exchange rates at {:?}; pass a rates file with --rates",
            csv_path
        );
    }

    if !force && csv_path.exists() && !cache_is_stale(&csv_path, feed.cache_max_age_hours)? {
        debug!("Using cached rates at {:?}", csv_path);
        return Ok(csv_path);
    }

    info!("Downloading exchange rates from {}", feed.url);
    let client = Client::new();
    let response = client
        .get(&feed.url)
        .send()
        .context("Failed to download exchange rates")?
        .error_for_status()
        .context("Exchange rate feed returned error status")?;

    let bytes = response
        .bytes()
        .context("Failed to read exchange rate bytes")?;
    let tmp_path = cache_dir.join(format!("{}.tmp", CACHE_FILENAME));
    fs::write(&tmp_path, &bytes).context("Failed to write exchange rate cache")?;
    fs::rename(&tmp_path, &csv_path).context("Failed to finalize exchange rate cache file")?;

    Ok(csv_path)
}

/// Load the series from an explicit file, or from the (refreshed) cache
pub fn load_rates(feed: &RateFeed, explicit: Option<&Path>) -> Result<Vec<RateSample>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => refresh_rates_csv(feed, false)?,
    };
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read exchange rate file {:?}", path))?;
    let samples = parse_rates_csv(&content)?;
    info!("Loaded {} exchange rate samples from {:?}", samples.len(), path);
    Ok(samples)
}

fn cache_is_stale(csv_path: &Path, max_age_hours: u64) -> Result<bool> {
    let metadata = fs::metadata(csv_path).context("Failed to read rates cache metadata")?;
    let modified = metadata
        .modified()
        .context("Failed to read rates cache mtime")?;
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::from_secs(0));
    Ok(age.as_secs() > max_age_hours * 3600)
}

fn find_header(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("Missing exchange rate CSV column: {}", name))
}

/// Parse ECB `csvdata` content into rate samples
pub fn parse_rates_csv(content: &str) -> Result<Vec<RateSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let date_idx = find_header(&headers, "TIME_PERIOD")?;
    let value_idx = find_header(&headers, "OBS_VALUE")?;

    let mut samples = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let date = record.get(date_idx).unwrap_or("").trim();
        let value = record.get(value_idx).unwrap_or("").trim();

        if date.is_empty() || value.is_empty() {
            continue;
        }

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date in exchange rate CSV: {}", date))?;

        match Decimal::from_str(value) {
            Ok(rate) if rate > Decimal::ZERO => samples.push(RateSample::new(date, rate)),
            _ => warn!("Skipping exchange rate line {}: bad value '{}'", line + 2, value),
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "KEY,FREQ,CURRENCY,CURRENCY_DENOM,EXR_TYPE,EXR_SUFFIX,TIME_PERIOD,OBS_VALUE,OBS_STATUS\n\
EXR.D.USD.EUR.SP00.A,D,USD,EUR,SP00,A,2024-01-02,1.0956,A\n\
EXR.D.USD.EUR.SP00.A,D,USD,EUR,SP00,A,2024-01-03,1.0919,A\n\
EXR.D.USD.EUR.SP00.A,D,USD,EUR,SP00,A,2024-01-04,,M\n\
EXR.D.USD.EUR.SP00.A,D,USD,EUR,SP00,A,2024-01-05,NaN,M\n";

    #[test]
    fn test_parse_ecb_csv() {
        let samples = parse_rates_csv(SAMPLE).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(samples[0].rate, dec!(1.0956));
        assert_eq!(samples[1].rate, dec!(1.0919));
    }

    #[test]
    fn test_parse_requires_columns() {
        let err = parse_rates_csv("DATE,VALUE\n2024-01-02,1.1\n").unwrap_err();
        assert!(err.to_string().contains("TIME_PERIOD"));
    }

    #[test]
    fn test_offline_without_cache_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let old = std::env::var_os("XDG_CACHE_HOME");
        std::env::set_var("XDG_CACHE_HOME", tmp.path());

        let feed = RateFeed {
            offline: true,
            ..RateFeed::default()
        };
        let result = refresh_rates_csv(&feed, false);

        match old {
            Some(v) => std::env::set_var("XDG_CACHE_HOME", v),
            None => std::env::remove_var("XDG_CACHE_HOME"),
        }
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rates_from_explicit_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rates.csv");
        fs::write(&path, SAMPLE).unwrap();

        let samples = load_rates(&RateFeed::default(), Some(&path)).unwrap();
        assert_eq!(samples.len(), 2);
    }
}
