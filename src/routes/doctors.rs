use actix_web::{web, HttpResponse};
use sqlx::{query_as, SqlitePool};

use crate::models::profile::DoctorSummary;
use crate::utils::e500;

#[tracing::instrument(name = "Fetching doctor directory", skip(pool))]
pub async fn list_doctors(pool: &SqlitePool) -> Result<Vec<DoctorSummary>, sqlx::Error> {
    query_as::<_, DoctorSummary>(
        r#"SELECT id, full_name, specialty FROM doctor_profiles ORDER BY full_name"#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {}", e);
        e
    })
}

pub async fn get_doctors(pool: web::Data<SqlitePool>) -> Result<HttpResponse, actix_web::Error> {
    let doctors = list_doctors(&pool).await.map_err(e500)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "length": doctors.len(),
        "data": doctors
    })))
}
