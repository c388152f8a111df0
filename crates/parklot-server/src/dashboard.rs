//! Dashboard aggregates for admins and users.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::lifecycle::{BookingClock, round_cents};
use crate::storage::{DatabaseError, ParkingDatabase, Reservation, SpotStatus, User};

const TOP_USERS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCost {
    pub date: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

impl From<(String, i64)> for NamedCount {
    fn from((name, count): (String, i64)) -> Self {
        Self { name, count }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub bookings_by_date: Vec<DailyCount>,
    pub bookings_by_lot: Vec<NamedCount>,
    pub top_users: Vec<NamedCount>,
    /// Spot count for every status, including those with no spots.
    pub spot_status: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDashboard {
    pub user: User,
    pub reservations: Vec<Reservation>,
    pub active_booking: Option<Reservation>,
    pub latest_booking: Option<Reservation>,
    pub bookings_by_date: Vec<DailyCount>,
    pub cost_by_date: Vec<DailyCost>,
}

/// Group reservations by the local day of their start time.
pub fn bucket_by_day(
    clock: &BookingClock,
    reservations: &[Reservation],
) -> (Vec<DailyCount>, Vec<DailyCost>) {
    let mut days: BTreeMap<String, (i64, f64)> = BTreeMap::new();
    for r in reservations {
        let Some(day) = clock.day_of(r.parking_time) else {
            continue;
        };
        let entry = days.entry(day).or_default();
        entry.0 += 1;
        entry.1 += r.cost;
    }

    days.into_iter()
        .map(|(date, (count, total))| {
            (
                DailyCount {
                    date: date.clone(),
                    count,
                },
                DailyCost {
                    date,
                    total: round_cents(total),
                },
            )
        })
        .unzip()
}

pub async fn admin_dashboard(
    db: &ParkingDatabase,
    clock: &BookingClock,
) -> Result<AdminDashboard, DatabaseError> {
    let reservations = db.list_reservations(None).await?;
    let (bookings_by_date, _) = bucket_by_day(clock, &reservations);

    let mut spot_status: BTreeMap<String, i64> = [
        SpotStatus::Available,
        SpotStatus::Unavailable,
        SpotStatus::Occupied,
    ]
    .iter()
    .map(|s| (s.as_str().to_string(), 0))
    .collect();
    for (status, count) in db.spot_status_counts().await? {
        spot_status.insert(status.as_str().to_string(), count);
    }

    Ok(AdminDashboard {
        bookings_by_date,
        bookings_by_lot: db
            .bookings_per_lot()
            .await?
            .into_iter()
            .map(NamedCount::from)
            .collect(),
        top_users: db
            .top_users(TOP_USERS)
            .await?
            .into_iter()
            .map(NamedCount::from)
            .collect(),
        spot_status,
    })
}

pub async fn user_dashboard(
    db: &ParkingDatabase,
    clock: &BookingClock,
    user_id: i64,
) -> Result<UserDashboard, DatabaseError> {
    let user = db.get_user(user_id).await?;
    let reservations = db.list_reservations(Some(user_id)).await?;
    let active_booking = db.active_reservation(user_id).await?;
    let (bookings_by_date, cost_by_date) = bucket_by_day(clock, &reservations);
    let latest_booking = reservations
        .iter()
        .max_by_key(|r| (r.parking_time, r.id))
        .cloned();

    Ok(UserDashboard {
        user,
        reservations,
        active_booking,
        latest_booking,
        bookings_by_date,
        cost_by_date,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::ReservationStatus;

    fn reservation(id: i64, parking_time: i64, cost: f64) -> Reservation {
        Reservation {
            id,
            spot_id: 1,
            user_id: 1,
            vehicle_number: "KA01".into(),
            parking_time,
            leaving_time: parking_time + 3600,
            cost,
            status: ReservationStatus::Completed,
            created_at: parking_time,
        }
    }

    // 2026-01-01T10:00:00Z
    const DAY_ONE: i64 = 1_767_261_600;

    #[test]
    fn buckets_by_local_day() {
        let rows = [
            reservation(1, DAY_ONE, 10.0),
            reservation(2, DAY_ONE + 3600, 5.255),
            reservation(3, DAY_ONE + 86_400, 7.5),
        ];
        let (counts, costs) = bucket_by_day(&BookingClock::utc(), &rows);

        assert_eq!(
            counts,
            vec![
                DailyCount { date: "2026-01-01".into(), count: 2 },
                DailyCount { date: "2026-01-02".into(), count: 1 },
            ]
        );
        assert!((costs[0].total - 15.26).abs() < 1e-9);
        assert!((costs[1].total - 7.5).abs() < 1e-9);
    }

    #[test]
    fn offset_moves_late_bookings_to_next_day() {
        // 23:00 UTC is the next morning at +05:30.
        let rows = [reservation(1, DAY_ONE + 13 * 3600, 1.0)];
        let clock = BookingClock::new(330).unwrap();
        let (counts, _) = bucket_by_day(&clock, &rows);
        assert_eq!(counts[0].date, "2026-01-02");
    }

    #[test]
    fn empty_input_gives_empty_series() {
        let (counts, costs) = bucket_by_day(&BookingClock::utc(), &[]);
        assert!(counts.is_empty());
        assert!(costs.is_empty());
    }
}
