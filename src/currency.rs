use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rusqlite::{Connection, OptionalExtension};

use crate::error::{BurnwiseError, Result};

pub const BASE_CURRENCY: &str = "USD";

pub trait CurrencyConverter {
    fn convert_to_usd(&self, amount: f64, currency: &str) -> Result<f64>;
}

/// Supplies a rate quoted as units of `currency` per one USD.
pub trait RateSource {
    fn fetch_rate(&self, currency: &str) -> Result<f64>;
}

/// Rates the user entered with `rates set`, kept in the `exchange_rates` table.
pub struct StoredRates<'a> {
    conn: &'a Connection,
}

impl<'a> StoredRates<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl RateSource for StoredRates<'_> {
    fn fetch_rate(&self, currency: &str) -> Result<f64> {
        self.conn
            .query_row(
                "SELECT rate FROM exchange_rates WHERE currency = ?1",
                [currency],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| BurnwiseError::Conversion(format!("no exchange rate for {currency}")))
    }
}

struct CachedRate {
    rate: f64,
    fetched_at: Instant,
}

/// Currency → (rate, fetched_at) cache in front of a `RateSource`.
///
/// Fixed rates from settings always win. Anything else is served from the
/// cache until it is older than `ttl`, then fetched again from the source.
pub struct RateCache<S> {
    source: S,
    fixed: HashMap<String, f64>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedRate>>,
}

impl<S: RateSource> RateCache<S> {
    pub fn new(source: S, fixed: HashMap<String, f64>, ttl: Duration) -> Self {
        let fixed = fixed
            .into_iter()
            .map(|(code, rate)| (code.to_uppercase(), rate))
            .collect();
        Self {
            source,
            fixed,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn rate(&self, currency: &str) -> Result<f64> {
        let code = currency.to_uppercase();
        if code == BASE_CURRENCY {
            return Ok(1.0);
        }
        if let Some(rate) = self.fixed.get(&code) {
            return checked(&code, *rate);
        }

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| BurnwiseError::Conversion("rate cache poisoned".to_string()))?;
        if let Some(cached) = entries.get(&code) {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.rate);
            }
        }

        let rate = checked(&code, self.source.fetch_rate(&code)?)?;
        log::debug!("refreshed {code} rate: {rate}");
        entries.insert(
            code,
            CachedRate {
                rate,
                fetched_at: Instant::now(),
            },
        );
        Ok(rate)
    }
}

impl<S: RateSource> CurrencyConverter for RateCache<S> {
    fn convert_to_usd(&self, amount: f64, currency: &str) -> Result<f64> {
        Ok(amount / self.rate(currency)?)
    }
}

fn checked(code: &str, rate: f64) -> Result<f64> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(BurnwiseError::Conversion(format!("invalid rate {rate} for {code}")))
    }
}

pub fn set_rate(conn: &Connection, currency: &str, rate: f64) -> Result<()> {
    let code = currency.to_uppercase();
    checked(&code, rate).map_err(|e| BurnwiseError::Validation(e.to_string()))?;
    conn.execute(
        "INSERT INTO exchange_rates (currency, rate) VALUES (?1, ?2) \
         ON CONFLICT (currency) DO UPDATE SET rate = excluded.rate, updated_at = datetime('now')",
        rusqlite::params![code, rate],
    )?;
    Ok(())
}

pub fn list_rates(conn: &Connection) -> Result<Vec<(String, f64, String)>> {
    let mut stmt =
        conn.prepare("SELECT currency, rate, updated_at FROM exchange_rates ORDER BY currency")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::db::{get_connection, init_db};

    struct CountingSource {
        rate: f64,
        calls: Cell<usize>,
    }

    impl RateSource for CountingSource {
        fn fetch_rate(&self, _currency: &str) -> Result<f64> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.rate)
        }
    }

    fn counting(rate: f64) -> CountingSource {
        CountingSource { rate, calls: Cell::new(0) }
    }

    #[test]
    fn test_usd_passes_through() {
        let cache = RateCache::new(counting(2.0), HashMap::new(), Duration::from_secs(3600));
        assert_eq!(cache.convert_to_usd(100.0, "USD").unwrap(), 100.0);
        assert_eq!(cache.convert_to_usd(100.0, "usd").unwrap(), 100.0);
        assert_eq!(cache.source.calls.get(), 0);
    }

    #[test]
    fn test_fixed_rate_wins() {
        let fixed = HashMap::from([("AED".to_string(), 3.6725)]);
        let cache = RateCache::new(counting(99.0), fixed, Duration::from_secs(3600));
        let usd = cache.convert_to_usd(367.25, "AED").unwrap();
        assert!((usd - 100.0).abs() < 1e-9);
        assert_eq!(cache.source.calls.get(), 0);
    }

    #[test]
    fn test_cached_within_ttl() {
        let cache = RateCache::new(counting(0.5), HashMap::new(), Duration::from_secs(3600));
        assert_eq!(cache.convert_to_usd(10.0, "EUR").unwrap(), 20.0);
        assert_eq!(cache.convert_to_usd(20.0, "EUR").unwrap(), 40.0);
        assert_eq!(cache.source.calls.get(), 1);
    }

    #[test]
    fn test_expired_entry_refetched() {
        let cache = RateCache::new(counting(0.5), HashMap::new(), Duration::ZERO);
        cache.rate("EUR").unwrap();
        cache.rate("EUR").unwrap();
        assert_eq!(cache.source.calls.get(), 2);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let cache = RateCache::new(counting(0.0), HashMap::new(), Duration::from_secs(60));
        assert!(matches!(cache.convert_to_usd(1.0, "JPY"), Err(BurnwiseError::Conversion(_))));
    }

    #[test]
    fn test_stored_rates() {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        set_rate(&conn, "eur", 0.8).unwrap();
        set_rate(&conn, "EUR", 0.9).unwrap();
        let cache =
            RateCache::new(StoredRates::new(&conn), HashMap::new(), Duration::from_secs(60));
        let usd = cache.convert_to_usd(90.0, "EUR").unwrap();
        assert!((usd - 100.0).abs() < 1e-9);
        assert!(matches!(cache.convert_to_usd(1.0, "GBP"), Err(BurnwiseError::Conversion(_))));
        assert_eq!(list_rates(&conn).unwrap().len(), 1);
        assert!(set_rate(&conn, "GBP", -1.0).is_err());
    }
}
