//! Airport code resolution
//!
//! Flight plans may name airports by their three-letter IATA code. The store
//! keys facilities by four-letter ICAO idents, so three-letter codes are
//! looked up and replaced before a plan is handed off.

use async_trait::async_trait;
use fplan_common::db::PartialFlightPlan;
use fplan_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, error};

/// Lookup from IATA code to ICAO ident
#[async_trait]
pub trait AirportDirectory: Send + Sync {
    /// ICAO ident for `iata`, `None` when the directory has no mapping
    async fn icao_for(&self, iata: &str) -> Result<Option<String>>;
}

/// Directory backed by the `airport_data` table
#[derive(Clone)]
pub struct StoreAirportDirectory {
    pool: SqlitePool,
}

impl StoreAirportDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AirportDirectory for StoreAirportDirectory {
    async fn icao_for(&self, iata: &str) -> Result<Option<String>> {
        let ident: Option<String> =
            sqlx::query_scalar("SELECT ident FROM airport_data WHERE iata_code = ? LIMIT 1")
                .bind(iata)
                .fetch_optional(&self.pool)
                .await?;

        Ok(ident)
    }
}

/// Fixed in-memory directory
#[derive(Debug, Clone, Default)]
pub struct StaticAirportDirectory {
    codes: HashMap<String, String>,
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticAirportDirectory {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            codes: iter
                .into_iter()
                .map(|(iata, icao)| (iata.into(), icao.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl AirportDirectory for StaticAirportDirectory {
    async fn icao_for(&self, iata: &str) -> Result<Option<String>> {
        Ok(self.codes.get(iata).cloned())
    }
}

/// Replace three-letter airport codes on `plan` with their ICAO idents
///
/// Codes of any other length are left alone, as are codes the directory
/// cannot map. Canceled plans are passed through untouched. Lookup failures
/// are logged and leave the code as it was.
pub async fn resolve_airports(
    mut plan: PartialFlightPlan,
    directory: &dyn AirportDirectory,
) -> PartialFlightPlan {
    if plan.is_canceled() {
        return plan;
    }

    plan.dep_arpt = resolve_code(plan.dep_arpt.take(), directory).await;
    plan.arr_arpt = resolve_code(plan.arr_arpt.take(), directory).await;
    plan
}

async fn resolve_code(code: Option<String>, directory: &dyn AirportDirectory) -> Option<String> {
    let code = code?;
    if code.chars().count() != 3 {
        return Some(code);
    }

    match directory.icao_for(&code).await {
        Ok(Some(icao)) => {
            debug!(iata = %code, icao = %icao, "Resolved airport code");
            Some(icao)
        }
        Ok(None) => Some(code),
        Err(e) => {
            error!(iata = %code, "Airport lookup failed: {}", e);
            Some(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fplan_common::db::{init_memory_database, FlightStatus, StatusChange};

    fn directory() -> StaticAirportDirectory {
        [("JFK", "KJFK"), ("TEB", "KTEB"), ("PBI", "KPBI")]
            .into_iter()
            .collect()
    }

    fn plan(dep: Option<&str>, arr: Option<&str>) -> PartialFlightPlan {
        PartialFlightPlan {
            flight_ref: Some("F1".to_string()),
            acid: Some("N1".to_string()),
            dep_arpt: dep.map(str::to_string),
            arr_arpt: arr.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_three_letter_codes_resolved() {
        let resolved = resolve_airports(plan(Some("JFK"), Some("PBI")), &directory()).await;
        assert_eq!(resolved.dep_arpt.as_deref(), Some("KJFK"));
        assert_eq!(resolved.arr_arpt.as_deref(), Some("KPBI"));
    }

    #[tokio::test]
    async fn test_unknown_code_unchanged() {
        let resolved = resolve_airports(plan(Some("ZZZ"), None), &directory()).await;
        assert_eq!(resolved.dep_arpt.as_deref(), Some("ZZZ"));
        assert_eq!(resolved.arr_arpt, None);
    }

    #[tokio::test]
    async fn test_four_letter_codes_untouched() {
        let resolved = resolve_airports(plan(Some("KTEB"), Some("EGLL")), &directory()).await;
        assert_eq!(resolved.dep_arpt.as_deref(), Some("KTEB"));
        assert_eq!(resolved.arr_arpt.as_deref(), Some("EGLL"));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let once = resolve_airports(plan(Some("TEB"), Some("JFK")), &directory()).await;
        let twice = resolve_airports(once.clone(), &directory()).await;
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_canceled_plan_skipped() {
        let mut canceled = plan(Some("JFK"), None);
        canceled.status = StatusChange::Set(FlightStatus::Canceled);

        let resolved = resolve_airports(canceled, &directory()).await;
        assert_eq!(resolved.dep_arpt.as_deref(), Some("JFK"));
    }

    #[tokio::test]
    async fn test_store_directory() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO airport_data (ident, iata_code) VALUES ('KJFK', 'JFK')")
            .execute(&pool)
            .await
            .unwrap();

        let directory = StoreAirportDirectory::new(pool);
        assert_eq!(directory.icao_for("JFK").await.unwrap().as_deref(), Some("KJFK"));
        assert_eq!(directory.icao_for("ZZZ").await.unwrap(), None);

        let resolved = resolve_airports(plan(Some("JFK"), Some("ZZZ")), &directory).await;
        assert_eq!(resolved.dep_arpt.as_deref(), Some("KJFK"));
        assert_eq!(resolved.arr_arpt.as_deref(), Some("ZZZ"));
    }
}
