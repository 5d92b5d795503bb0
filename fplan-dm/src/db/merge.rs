//! Merge/persistence of hand-off items
//!
//! Upserts only ever overwrite columns the partial supplies: every optional
//! value is bound as-is and merged with `COALESCE(excluded.col, col)`, so a
//! `NULL` in the partial leaves the stored value alone.
//!
//! Each function is one logical write. [`apply`] chains them for a hand-off
//! item, logging and abandoning the item on the first store error.

use fplan_common::db::{FleetChange, FlightStatus, HandOff, ParkingChange, PartialFlightPlan};
use fplan_common::Result;
use sqlx::SqlitePool;
use tracing::{debug, error, info};

/// Merge `plan` into `flight_plans`
///
/// Returns `false` without touching the store when `flight_ref` or `acid` is
/// missing.
pub async fn upsert_flight_plan(pool: &SqlitePool, plan: &PartialFlightPlan) -> Result<bool> {
    if !plan.has_identity() {
        debug!(flight_ref = ?plan.flight_ref, acid = ?plan.acid, "Rejecting partial without identity");
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO flight_plans (
            flight_ref, acid, departing_airport, arrival_airport, etd, eta, status, facility_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(flight_ref) DO UPDATE SET
            acid = excluded.acid,
            departing_airport = COALESCE(excluded.departing_airport, flight_plans.departing_airport),
            arrival_airport = COALESCE(excluded.arrival_airport, flight_plans.arrival_airport),
            etd = COALESCE(excluded.etd, flight_plans.etd),
            eta = COALESCE(excluded.eta, flight_plans.eta),
            status = COALESCE(excluded.status, flight_plans.status),
            facility_id = COALESCE(excluded.facility_id, flight_plans.facility_id)
        "#,
    )
    .bind(&plan.flight_ref)
    .bind(&plan.acid)
    .bind(&plan.dep_arpt)
    .bind(&plan.arr_arpt)
    .bind(&plan.etd)
    .bind(&plan.eta)
    .bind(plan.status.value().map(|s| s.as_str()))
    .bind(plan.facility_id)
    .execute(pool)
    .await?;

    Ok(true)
}

/// Remove the plan for `flight_ref`; returns whether a row existed
pub async fn delete_flight_plan(pool: &SqlitePool, flight_ref: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM flight_plans WHERE flight_ref = ?")
        .bind(flight_ref)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Point aircraft `acid` at `flight_ref`
///
/// A plan the aircraft previously flew is deleted first, so each aircraft
/// has at most one live plan. `model` only overwrites the stored plane type
/// when supplied.
pub async fn link_fleet(
    pool: &SqlitePool,
    acid: &str,
    flight_ref: &str,
    model: Option<&str>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let previous: Option<Option<String>> =
        sqlx::query_scalar("SELECT flight_ref FROM fleet WHERE acid = ?")
            .bind(acid)
            .fetch_optional(&mut *tx)
            .await?;

    if let Some(stale) = previous.flatten().filter(|prev| prev != flight_ref) {
        sqlx::query("DELETE FROM flight_plans WHERE flight_ref = ?")
            .bind(&stale)
            .execute(&mut *tx)
            .await?;
        info!(acid, stale_flight_ref = %stale, flight_ref, "Evicted stale flight plan");
    }

    sqlx::query(
        r#"
        INSERT INTO fleet (acid, plane_type, flight_ref)
        VALUES (?, ?, ?)
        ON CONFLICT(acid) DO UPDATE SET
            flight_ref = excluded.flight_ref,
            plane_type = COALESCE(excluded.plane_type, fleet.plane_type)
        "#,
    )
    .bind(acid)
    .bind(model)
    .bind(flight_ref)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Set the plane type of an aircraft already in the fleet
pub async fn update_plane_type(pool: &SqlitePool, acid: &str, model: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE fleet SET plane_type = ? WHERE acid = ?")
        .bind(model)
        .bind(acid)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Clear the parking assignment of `acid`
pub async fn release_parking(pool: &SqlitePool, acid: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM parked_at WHERE acid = ?")
        .bind(acid)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Park `acid` at `facility_id`, or at the facility stored on its plan
///
/// Only parks when the facility has room for one more aircraft besides
/// `acid` itself. Returns whether the aircraft is now parked there.
pub async fn park_aircraft(
    pool: &SqlitePool,
    acid: &str,
    flight_ref: &str,
    facility_id: Option<i64>,
) -> Result<bool> {
    let facility_id = match facility_id {
        Some(id) => Some(id),
        None => sqlx::query_scalar::<_, Option<i64>>(
            "SELECT facility_id FROM flight_plans WHERE flight_ref = ?",
        )
        .bind(flight_ref)
        .fetch_optional(pool)
        .await?
        .flatten(),
    };

    let Some(facility_id) = facility_id else {
        debug!(acid, flight_ref, "No facility to park at");
        return Ok(false);
    };

    let result = sqlx::query(
        r#"
        INSERT INTO parked_at (acid, facility_id)
        SELECT ?, p.id
        FROM airport_parking p
        WHERE p.id = ?
          AND (SELECT COUNT(*) FROM parked_at WHERE facility_id = p.id AND acid != ?) < p.total_space
        ON CONFLICT(acid) DO UPDATE SET facility_id = excluded.facility_id
        "#,
    )
    .bind(acid)
    .bind(facility_id)
    .bind(acid)
    .execute(pool)
    .await?;

    let parked = result.rows_affected() > 0;
    if !parked {
        debug!(acid, facility_id, "Facility full or unknown, not parking");
    }
    Ok(parked)
}

/// Persist one hand-off item
///
/// Store errors are logged; the rest of the item is abandoned and the
/// caller moves on to the next one.
pub async fn apply(pool: &SqlitePool, item: &HandOff) {
    let result = match item {
        HandOff::Delete(signal) => {
            apply_delete(pool, &signal.flight_ref, signal.acid.as_deref()).await
        }
        HandOff::Upsert(plan) => apply_upsert(pool, plan).await,
    };

    if let Err(e) = result {
        error!(flight_ref = ?item.flight_ref(), "Failed to persist hand-off item: {}", e);
    }
}

async fn apply_delete(pool: &SqlitePool, flight_ref: &str, acid: Option<&str>) -> Result<()> {
    let existed = delete_flight_plan(pool, flight_ref).await?;
    info!(flight_ref, acid = ?acid, existed, "Deleted flight plan");
    Ok(())
}

async fn apply_upsert(pool: &SqlitePool, plan: &PartialFlightPlan) -> Result<()> {
    let (Some(flight_ref), Some(acid)) = (plan.flight_ref.as_deref(), plan.acid.as_deref())
    else {
        debug!(flight_ref = ?plan.flight_ref, acid = ?plan.acid, "Rejecting partial without identity");
        return Ok(());
    };
    if !plan.has_identity() {
        debug!(flight_ref, acid, "Rejecting partial with empty identity");
        return Ok(());
    }

    // Canceled plans are not kept
    if plan.status.value() == Some(FlightStatus::Canceled) {
        return apply_delete(pool, flight_ref, Some(acid)).await;
    }

    if !upsert_flight_plan(pool, plan).await? {
        return Ok(());
    }
    debug!(flight_ref, acid, status = ?plan.status.value(), "Upserted flight plan");

    match plan.fleet {
        FleetChange::Link => link_fleet(pool, acid, flight_ref, plan.model.as_deref()).await?,
        FleetChange::Keep => {
            if let Some(model) = plan.model.as_deref() {
                update_plane_type(pool, acid, model).await?;
            }
        }
    }

    match plan.parking {
        ParkingChange::Keep => {}
        ParkingChange::Release => {
            if release_parking(pool, acid).await? {
                debug!(acid, "Released parking");
            }
        }
        ParkingChange::Park => {
            if park_aircraft(pool, acid, flight_ref, plan.facility_id).await? {
                info!(acid, flight_ref, "Aircraft parked");
            }
        }
    }

    Ok(())
}
