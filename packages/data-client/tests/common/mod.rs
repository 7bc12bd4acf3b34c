#![allow(dead_code)]

use data_client::config::db::{ConnectionOptions, RuntimeEnv};
use data_client::registry::{load_with, ClientRegistry};
use data_client::{ClientSettings, Clients};
use sea_orm::{ConnectionTrait, DatabaseConnection};

#[ctor::ctor]
fn init_logging() {
    test_support::logging::init();
}

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE "Team" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "slug" TEXT NOT NULL,
        "pendingPayment" BOOLEAN NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE "Booking" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "title" TEXT,
        "status" TEXT NOT NULL,
        "startTime" TEXT NOT NULL,
        "endTime" TEXT NOT NULL,
        "userId" INTEGER NOT NULL,
        "idempotencyKey" TEXT UNIQUE
    )"#,
    r#"CREATE TABLE "BookingReference" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "bookingId" INTEGER NOT NULL,
        "type" TEXT NOT NULL,
        "uid" TEXT NOT NULL,
        "deleted" BOOLEAN
    )"#,
];

pub async fn create_schema(conn: &DatabaseConnection) {
    for ddl in SCHEMA {
        conn.execute_unprepared(ddl).await.expect("create table");
    }
}

pub fn memory_settings() -> ClientSettings {
    ClientSettings::new(RuntimeEnv::Test, ConnectionOptions::new("sqlite::memory:"))
}

/// Clients from a private registry over a fresh in-memory database.
pub async fn memory_clients() -> Clients {
    let registry = ClientRegistry::new();
    let clients = load_with(&registry, &memory_settings())
        .await
        .expect("load clients");
    create_schema(clients.base.connection()).await;
    clients
}

/// Row count straight from the connection, bypassing every hook.
pub async fn raw_count(conn: &DatabaseConnection, table: &str) -> i64 {
    let stmt = sea_orm::Statement::from_string(
        conn.get_database_backend(),
        format!(r#"SELECT COUNT(*) AS "n" FROM "{table}""#),
    );
    let row = conn.query_one(stmt).await.expect("count").expect("row");
    row.try_get::<i64>("", "n").expect("n")
}
