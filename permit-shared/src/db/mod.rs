/// Database layer for Permit
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Embedded schema migrations
///
/// Models live in the `models` module; the `store::PgStore` backend wraps
/// them behind the `EntityStore` trait.

pub mod migrations;
pub mod pool;
