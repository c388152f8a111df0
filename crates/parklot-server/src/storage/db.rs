//! Database connection and initialization.

pub use parklot_core::db::DatabaseError;

parklot_core::define_database!(ParkingDatabase, "Parking database migrations complete");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_works() {
        let db = ParkingDatabase::open_in_memory().await;
        assert!(db.is_ok());
    }
}
