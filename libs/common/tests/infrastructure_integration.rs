//! Integration tests for the infrastructure components
//!
//! These tests verify that the PostgreSQL database and Redis cache
//! are properly configured and accessible from the application.

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
};
use sqlx::Row;

/// Both PostgreSQL and Redis are reachable and the schema applies cleanly
#[tokio::test]
#[ignore = "requires running PostgreSQL and Redis (DATABASE_URL, REDIS_URL)"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    run_migrations(&pool).await?;

    let row = sqlx::query(
        "SELECT COUNT(*) AS tables FROM information_schema.tables
         WHERE table_name IN ('users', 'trophy_awards', 'gallery_images')",
    )
    .fetch_one(&pool)
    .await?;
    let tables: i64 = row.get("tables");
    assert_eq!(tables, 3, "schema tables missing after migration");

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    assert!(
        redis_pool.health_check().await?,
        "Redis health check failed"
    );

    let test_key = "integration_test_key";
    redis_pool.set(test_key, "integration_test_value", Some(10)).await?;
    assert_eq!(
        redis_pool.get(test_key).await?,
        Some("integration_test_value".to_string()),
        "Redis SET/GET test failed"
    );

    redis_pool.delete(test_key).await?;
    assert_eq!(redis_pool.get(test_key).await?, None, "Redis delete operation failed");

    Ok(())
}
