//! Facility assignment
//!
//! Picks the parking facility a flight will use at its arrival airport. A
//! flight keeps the facility it was already given; otherwise the
//! highest-priority facility with free space wins.
//!
//! Free space counts the store's occupancy plus assignments still waiting in
//! the hand-off queue. Those are tracked in [`FacilityReservations`] from the
//! moment the assigner picks a facility until the database manager pops the
//! item.

use async_trait::async_trait;
use fplan_common::db::PartialFlightPlan;
use fplan_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// One facility at an airport with its stored occupancy
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FacilityOccupancy {
    pub id: i64,
    pub total_space: i64,
    pub occupied: i64,
}

/// Facility lookups the assigner needs
#[async_trait]
pub trait FacilityDirectory: Send + Sync {
    /// Facility already stored on the plan for `flight_ref`
    async fn stored_assignment(&self, flight_ref: &str) -> Result<Option<i64>>;

    /// Facilities at `airport_code` in priority order
    async fn facilities_at(&self, airport_code: &str) -> Result<Vec<FacilityOccupancy>>;
}

/// Directory backed by the `flight_plans`, `fleet` and `airport_parking` tables
#[derive(Clone)]
pub struct StoreFacilityDirectory {
    pool: SqlitePool,
}

impl StoreFacilityDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FacilityDirectory for StoreFacilityDirectory {
    async fn stored_assignment(&self, flight_ref: &str) -> Result<Option<i64>> {
        let facility: Option<Option<i64>> =
            sqlx::query_scalar("SELECT facility_id FROM flight_plans WHERE flight_ref = ?")
                .bind(flight_ref)
                .fetch_optional(&self.pool)
                .await?;

        Ok(facility.flatten())
    }

    async fn facilities_at(&self, airport_code: &str) -> Result<Vec<FacilityOccupancy>> {
        // Occupancy counts aircraft whose current flight is assigned to the facility
        let facilities = sqlx::query_as::<_, FacilityOccupancy>(
            r#"
            SELECT
                p.id,
                p.total_space,
                (
                    SELECT COUNT(*)
                    FROM fleet f
                    JOIN flight_plans fp ON f.flight_ref = fp.flight_ref
                    WHERE fp.facility_id = p.id
                ) AS occupied
            FROM airport_parking p
            WHERE p.airport_code = ?
            ORDER BY p.priority, p.id
            "#,
        )
        .bind(airport_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(facilities)
    }
}

#[derive(Debug, Clone, Copy)]
struct Reservation {
    facility_id: i64,
    /// Queued items for the flight that carry this assignment
    queued: usize,
}

/// Facilities held by assignments that are queued but not yet popped
///
/// Clones share the same reservations.
#[derive(Debug, Clone, Default)]
pub struct FacilityReservations {
    held: Arc<Mutex<HashMap<String, Reservation>>>,
}

impl FacilityReservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Facility reserved for `flight_ref`
    pub fn held_for(&self, flight_ref: &str) -> Option<i64> {
        self.lock().get(flight_ref).map(|r| r.facility_id)
    }

    /// Number of flights holding `facility_id`
    pub fn pending_at(&self, facility_id: i64) -> usize {
        self.lock()
            .values()
            .filter(|r| r.facility_id == facility_id)
            .count()
    }

    /// Drop the claim of one popped item for `flight_ref`
    pub fn release(&self, flight_ref: &str) {
        let mut held = self.lock();
        if let Some(reservation) = held.get_mut(flight_ref) {
            reservation.queued = reservation.queued.saturating_sub(1);
            if reservation.queued == 0 {
                held.remove(flight_ref);
                debug!(flight_ref, "Released facility reservation");
            }
        }
    }

    /// Add one more queued item to an existing reservation
    fn renew(&self, flight_ref: &str) -> Option<i64> {
        self.lock().get_mut(flight_ref).map(|reservation| {
            reservation.queued += 1;
            reservation.facility_id
        })
    }

    /// Reserve the first facility with space left after stored and pending use
    fn reserve_first(&self, flight_ref: &str, facilities: &[FacilityOccupancy]) -> Option<i64> {
        let mut held = self.lock();
        let facility_id = facilities
            .iter()
            .find(|facility| {
                let pending = held
                    .values()
                    .filter(|r| r.facility_id == facility.id)
                    .count() as i64;
                facility.occupied + pending < facility.total_space
            })
            .map(|facility| facility.id)?;

        held.insert(
            flight_ref.to_string(),
            Reservation {
                facility_id,
                queued: 1,
            },
        );
        Some(facility_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Reservation>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fill in `facility_id` on `plan`
///
/// Canceled plans and plans without an arrival airport are passed through.
/// A plan with no free facility keeps `facility_id` unset. Lookup failures
/// are logged and leave the plan unassigned. A new assignment is reserved
/// until the item is popped from the hand-off queue.
pub async fn assign_facility(
    mut plan: PartialFlightPlan,
    directory: &dyn FacilityDirectory,
    reservations: &FacilityReservations,
) -> PartialFlightPlan {
    if plan.is_canceled() {
        return plan;
    }

    let flight_ref = plan
        .flight_ref
        .clone()
        .filter(|flight_ref| !flight_ref.is_empty());

    if let Some(flight_ref) = flight_ref.as_deref() {
        if let Some(facility_id) = reservations.renew(flight_ref) {
            plan.facility_id = Some(facility_id);
            return plan;
        }

        match directory.stored_assignment(flight_ref).await {
            Ok(Some(facility_id)) => {
                plan.facility_id = Some(facility_id);
                return plan;
            }
            Ok(None) => {}
            Err(e) => {
                error!(flight_ref, "Stored facility lookup failed: {}", e);
                return plan;
            }
        }
    }

    let Some(airport) = plan.arr_arpt.clone() else {
        return plan;
    };

    let facilities = match directory.facilities_at(&airport).await {
        Ok(facilities) => facilities,
        Err(e) => {
            error!(flight_ref = ?plan.flight_ref, airport = %airport, "Facility lookup failed: {}", e);
            return plan;
        }
    };

    let facility_id = match flight_ref.as_deref() {
        Some(flight_ref) => reservations.reserve_first(flight_ref, &facilities),
        // Nothing to key a reservation on; the merge layer drops such plans
        None => facilities
            .iter()
            .find(|f| f.occupied < f.total_space)
            .map(|f| f.id),
    };

    match facility_id {
        Some(facility_id) => {
            debug!(flight_ref = ?plan.flight_ref, airport = %airport, facility_id, "Assigned facility");
            plan.facility_id = Some(facility_id);
        }
        None => {
            debug!(flight_ref = ?plan.flight_ref, airport = %airport, "No facility with free space");
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use fplan_common::db::{init_memory_database, FlightStatus, StatusChange};
    use std::collections::HashSet;

    async fn setup() -> (SqlitePool, StoreFacilityDirectory) {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            "INSERT INTO airport_parking (id, airport_code, total_space, priority) VALUES
                (1, 'KTEB', 1, 2),
                (2, 'KTEB', 2, 1),
                (3, 'KPBI', 1, 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let directory = StoreFacilityDirectory::new(pool.clone());
        (pool, directory)
    }

    async fn occupy(pool: &SqlitePool, acid: &str, flight_ref: &str, facility_id: i64) {
        sqlx::query(
            "INSERT INTO flight_plans (flight_ref, acid, arrival_airport, facility_id) VALUES (?, ?, 'KTEB', ?)",
        )
        .bind(flight_ref)
        .bind(acid)
        .bind(facility_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO fleet (acid, flight_ref) VALUES (?, ?)")
            .bind(acid)
            .bind(flight_ref)
            .execute(pool)
            .await
            .unwrap();
    }

    fn arriving(flight_ref: &str, airport: &str) -> PartialFlightPlan {
        PartialFlightPlan {
            flight_ref: Some(flight_ref.to_string()),
            acid: Some(format!("N{}", flight_ref)),
            arr_arpt: Some(airport.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_priority_order() {
        let (_pool, directory) = setup().await;
        let plan = assign_facility(arriving("F1", "KTEB"), &directory, &FacilityReservations::new()).await;
        assert_eq!(plan.facility_id, Some(2));
    }

    #[tokio::test]
    async fn test_full_facility_skipped() {
        let (pool, directory) = setup().await;
        occupy(&pool, "NA", "FA", 2).await;
        occupy(&pool, "NB", "FB", 2).await;

        let plan = assign_facility(arriving("F1", "KTEB"), &directory, &FacilityReservations::new()).await;
        assert_eq!(plan.facility_id, Some(1));

        occupy(&pool, "NC", "FC", 1).await;
        let plan = assign_facility(arriving("F2", "KTEB"), &directory, &FacilityReservations::new()).await;
        assert_eq!(plan.facility_id, None);
    }

    #[tokio::test]
    async fn test_plans_without_fleet_link_do_not_occupy() {
        let (pool, directory) = setup().await;
        sqlx::query(
            "INSERT INTO flight_plans (flight_ref, acid, facility_id) VALUES ('OLD', 'NOLD', 3)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let plan = assign_facility(arriving("F1", "KPBI"), &directory, &FacilityReservations::new()).await;
        assert_eq!(plan.facility_id, Some(3));
    }

    #[tokio::test]
    async fn test_stored_assignment_reused() {
        let (pool, directory) = setup().await;
        occupy(&pool, "NA", "FA", 1).await;

        // Facility 1 is full, but FA already holds it
        let plan = assign_facility(arriving("FA", "KTEB"), &directory, &FacilityReservations::new()).await;
        assert_eq!(plan.facility_id, Some(1));
    }

    #[tokio::test]
    async fn test_unknown_airport_unassigned() {
        let (_pool, directory) = setup().await;
        let plan = assign_facility(arriving("F1", "EGLL"), &directory, &FacilityReservations::new()).await;
        assert_eq!(plan.facility_id, None);

        let mut no_airport = arriving("F2", "KTEB");
        no_airport.arr_arpt = None;
        let plan = assign_facility(no_airport, &directory, &FacilityReservations::new()).await;
        assert_eq!(plan.facility_id, None);
    }

    #[tokio::test]
    async fn test_canceled_plan_skipped() {
        let (_pool, directory) = setup().await;
        let mut plan = arriving("F1", "KTEB");
        plan.status = StatusChange::Set(FlightStatus::Canceled);

        let plan = assign_facility(plan, &directory, &FacilityReservations::new()).await;
        assert_eq!(plan.facility_id, None);
    }

    #[tokio::test]
    async fn test_facilities_at_reports_occupancy() {
        let (pool, directory) = setup().await;
        occupy(&pool, "NA", "FA", 2).await;

        let facilities = directory.facilities_at("KTEB").await.unwrap();
        assert_eq!(
            facilities,
            vec![
                FacilityOccupancy { id: 2, total_space: 2, occupied: 1 },
                FacilityOccupancy { id: 1, total_space: 1, occupied: 0 },
            ]
        );
        assert!(directory.facilities_at("EGLL").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queued_assignments_count_against_capacity() {
        let (pool, directory) = setup().await;
        let reservations = FacilityReservations::new();

        // KPBI has a single space; the first arrival takes it while still queued
        let first = assign_facility(arriving("F1", "KPBI"), &directory, &reservations).await;
        assert_eq!(first.facility_id, Some(3));
        assert_eq!(reservations.pending_at(3), 1);

        let second = assign_facility(arriving("F2", "KPBI"), &directory, &reservations).await;
        assert_eq!(second.facility_id, None);

        // A repeat message for the queued flight keeps its reservation
        let repeat = assign_facility(arriving("F1", "KPBI"), &directory, &reservations).await;
        assert_eq!(repeat.facility_id, Some(3));
        assert_eq!(reservations.pending_at(3), 1);

        // Both F1 items are popped and the first one persisted with a fleet link
        reservations.release("F1");
        assert_eq!(reservations.held_for("F1"), Some(3));
        reservations.release("F1");
        assert_eq!(reservations.held_for("F1"), None);
        sqlx::query(
            "INSERT INTO flight_plans (flight_ref, acid, arrival_airport, facility_id) VALUES ('F1', 'NF1', 'KPBI', 3)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO fleet (acid, flight_ref) VALUES ('NF1', 'F1')")
            .execute(&pool)
            .await
            .unwrap();

        let third = assign_facility(arriving("F2", "KPBI"), &directory, &reservations).await;
        assert_eq!(third.facility_id, None);
        assert_eq!(reservations.pending_at(3), 0);
    }

    #[tokio::test]
    async fn test_reservations_spill_to_next_priority() {
        let (_pool, directory) = setup().await;
        let reservations = FacilityReservations::new();

        let mut assigned = Vec::new();
        for flight_ref in ["F1", "F2", "F3", "F4"] {
            let plan = assign_facility(arriving(flight_ref, "KTEB"), &directory, &reservations).await;
            assigned.push(plan.facility_id);
        }

        assert_eq!(assigned, vec![Some(2), Some(2), Some(1), None]);
        let distinct: HashSet<_> = ["F1", "F2", "F3"]
            .iter()
            .filter_map(|f| reservations.held_for(f))
            .collect();
        assert_eq!(distinct, HashSet::from([1, 2]));

        reservations.release("F3");
        let plan = assign_facility(arriving("F4", "KTEB"), &directory, &reservations).await;
        assert_eq!(plan.facility_id, Some(1));
    }

    #[tokio::test]
    async fn test_release_of_unknown_flight_is_noop() {
        let reservations = FacilityReservations::new();
        reservations.release("NOPE");
        assert_eq!(reservations.held_for("NOPE"), None);
    }
}
