#![allow(dead_code)]

use bill_service::config::{BillConfig, JwtConfig, MongoConfig, StorageBackend};
use bill_service::services::{init_metrics, BillDb, Stores};
use bill_service::startup::Application;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: Client,
}

/// A registered, logged-in shop.
pub struct Shop {
    pub username: String,
    pub user_id: String,
    pub token: String,
}

impl TestApp {
    /// Spawn the service on a random port. Stores are in memory unless
    /// `TEST_MONGODB_URI` points at a MongoDB, in which case each app gets a
    /// fresh database.
    pub async fn spawn() -> Self {
        init_metrics();

        let mongo_uri = std::env::var("TEST_MONGODB_URI").ok();
        let storage = if mongo_uri.is_some() {
            StorageBackend::Mongodb
        } else {
            StorageBackend::Memory
        };

        let config = BillConfig {
            common: CoreConfig {
                port: 0,
                environment: "test".to_string(),
            },
            storage,
            mongodb: MongoConfig {
                uri: Secret::new(
                    mongo_uri
                        .clone()
                        .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
                ),
                database: format!("bill_test_{}", uuid::Uuid::new_v4().simple()),
            },
            jwt: JwtConfig {
                secret: Secret::new("integration-test-secret-0123456789abcdef".to_string()),
                access_token_expiry_minutes: 60,
            },
            log_level: "warn".to_string(),
            otlp_endpoint: None,
        };

        let stores = match storage {
            StorageBackend::Memory => Stores::memory(),
            StorageBackend::Mongodb => {
                let db = BillDb::connect(config.mongodb.uri.expose_secret(), &config.mongodb.database)
                    .await
                    .expect("Failed to connect to test MongoDB");
                db.initialize_indexes()
                    .await
                    .expect("Failed to create test indexes");
                Stores::mongo(db)
            }
        };

        let app = Application::build_with_stores(config, stores)
            .await
            .expect("Failed to build test application");

        let port = app.http_port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register a fresh user and log it in.
    pub async fn shop(&self) -> Shop {
        let username = format!("shop_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
        let password = "counter-top-42";

        let registered = self.register(&username, password).await;
        assert_eq!(registered.status(), StatusCode::CREATED);

        let login = self.login(&username, password).await;
        assert_eq!(login.status(), StatusCode::OK);
        let body: Value = login.json().await.expect("Invalid login body");

        Shop {
            username,
            user_id: body["user"]["user_id"].as_str().unwrap().to_string(),
            token: body["access_token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn get(&self, shop: &Shop, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(&shop.token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, shop: &Shop, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(&shop.token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, shop: &Shop, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .bearer_auth(&shop.token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, shop: &Shop, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(&shop.token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Create a bill and return its JSON body.
    pub async fn create_bill(&self, shop: &Shop, body: &Value) -> Value {
        let response = self.post(shop, "/bills", body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.expect("Invalid bill body")
    }
}

/// A typical mandap booking: subtotal 1000.
pub fn sample_bill(customer: &str, advance: Value) -> Value {
    json!({
        "customer_name": customer,
        "customer_address": "12 Temple Road",
        "bill_date": "2024-11-02",
        "items": [
            { "item_name": "Mandap", "quantity": 1, "rate": 600 },
            { "item_name": "Table", "quantity": "", "rate": "" },
            { "item_name": "LED Light", "quantity": "8", "rate": "50" }
        ],
        "advance_payment": advance
    })
}

/// Parse a decimal-string money field for comparison.
pub fn money(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .expect("money is serialized as a string")
        .parse()
        .expect("money parses as a decimal")
}
