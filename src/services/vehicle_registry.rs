use sqlx::PgPool;
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::VehicleSummary;
use crate::services::vin_decoder::{DecodedAttributes, VinDecoder};

/// Canonical vehicle row per VIN, lazily populated from the decoder on
/// first sighting.
#[derive(Clone)]
pub struct VehicleRegistry {
    pool: PgPool,
    decoder: Arc<dyn VinDecoder>,
}

impl VehicleRegistry {
    pub fn new(pool: PgPool, decoder: Arc<dyn VinDecoder>) -> Self {
        Self { pool, decoder }
    }

    pub fn decoder(&self) -> &Arc<dyn VinDecoder> {
        &self.decoder
    }

    pub async fn find(&self, vin: &str) -> AppResult<Option<VehicleSummary>> {
        let row = sqlx::query_as::<_, VehicleSummary>(
            "SELECT id, make, model, year FROM vehicles WHERE vin = $1",
        )
        .bind(vin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn submission_count(&self, vin: &str) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE vin = $1")
                .bind(vin)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Returns the existing vehicle, or decodes and inserts one. `None` means
    /// the decoder produced no attributes and the VIN cannot be tracked.
    ///
    /// Two concurrent first sightings of the same VIN are arbitrated by the
    /// unique constraint: `ON CONFLICT (vin) DO NOTHING` followed by a
    /// re-select, so exactly one row survives.
    pub async fn get_or_create(&self, vin: &str) -> AppResult<Option<VehicleSummary>> {
        if let Some(existing) = self.find(vin).await? {
            return Ok(Some(existing));
        }

        let decoded = self.decoder.decode(vin).await;
        if decoded.is_empty() {
            return Ok(None);
        }

        let make = decoded.get("Make").cloned();
        let model = decoded.get("Model").cloned();
        let year = decoded
            .get("Model Year")
            .filter(|y| !y.is_empty() && y.chars().all(|c| c.is_ascii_digit()))
            .and_then(|y| y.parse::<i32>().ok());

        sqlx::query(
            r#"
            INSERT INTO vehicles (vin, make, model, year, body_class, engine, fuel_type,
                transmission, drive_type, plant_country, decoded_json)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (vin) DO NOTHING
            "#,
        )
        .bind(vin)
        .bind(&make)
        .bind(&model)
        .bind(year)
        .bind(attr(&decoded, "Body Class"))
        .bind(attr(&decoded, "Displacement (L)"))
        .bind(attr(&decoded, "Fuel Type - Primary"))
        .bind(attr(&decoded, "Transmission Style"))
        .bind(attr(&decoded, "Drive Type"))
        .bind(attr(&decoded, "Plant Country"))
        .bind(serde_json::to_value(&decoded).unwrap_or_default())
        .execute(&self.pool)
        .await?;

        self.find(vin).await
    }
}

fn attr(decoded: &DecodedAttributes, key: &str) -> String {
    decoded.get(key).cloned().unwrap_or_default()
}
