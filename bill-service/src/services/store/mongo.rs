use super::{BillStore, CounterStore, UserStore};
use crate::models::{Bill, Counter, CounterType, ListBillsFilter, User};
use crate::services::metrics::observe_store_operation;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument, UpdateOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::time::Instant;

const BACKEND: &str = "mongodb";
const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct BillDb {
    client: MongoClient,
    db: Database,
}

fn db_error(context: &str, e: mongodb::error::Error) -> AppError {
    tracing::error!("{}: {}", context, e);
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

impl BillDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri)
            .await
            .map_err(|e| db_error("Failed to connect to MongoDB", e))?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for bill-service");

        let bill_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "owner_id": 1, "created_utc": -1 })
                .options(
                    IndexOptions::builder()
                        .name("owner_created_idx".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "bill_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("bill_id_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build(),
        ];
        self.bills()
            .create_indexes(bill_indexes, None)
            .await
            .map_err(|e| db_error("Failed to create bill indexes", e))?;

        let counter_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "counter_type": 1 })
            .options(
                IndexOptions::builder()
                    .name("owner_counter_type_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.counters()
            .create_index(counter_index, None)
            .await
            .map_err(|e| db_error("Failed to create counter index", e))?;

        let user_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(
                    IndexOptions::builder()
                        .name("username_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("user_id_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build(),
        ];
        self.users()
            .create_indexes(user_indexes, None)
            .await
            .map_err(|e| db_error("Failed to create user indexes", e))?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| db_error("MongoDB health check failed", e))?;
        Ok(())
    }

    fn bills(&self) -> Collection<Bill> {
        self.db.collection("bills")
    }

    fn counters(&self) -> Collection<Counter> {
        self.db.collection("counters")
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }
}

#[async_trait]
impl CounterStore for BillDb {
    async fn increment(&self, owner_id: &str, counter_type: CounterType) -> Result<i64, AppError> {
        let start = Instant::now();
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters()
            .find_one_and_update(
                doc! { "owner_id": owner_id, "counter_type": counter_type.as_str() },
                doc! { "$inc": { "sequence": 1_i64 } },
                options,
            )
            .await
            .map_err(|e| db_error("Failed to increment counter", e))?;
        observe_store_operation(BACKEND, "counter_increment", start);

        counter.map(|c| c.sequence).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Counter upsert returned no document for owner {}",
                owner_id
            ))
        })
    }

    async fn current(
        &self,
        owner_id: &str,
        counter_type: CounterType,
    ) -> Result<Option<i64>, AppError> {
        let start = Instant::now();
        let counter = self
            .counters()
            .find_one(
                doc! { "owner_id": owner_id, "counter_type": counter_type.as_str() },
                None,
            )
            .await
            .map_err(|e| db_error("Failed to read counter", e))?;
        observe_store_operation(BACKEND, "counter_read", start);
        Ok(counter.map(|c| c.sequence))
    }

    async fn overwrite(
        &self,
        owner_id: &str,
        counter_type: CounterType,
        sequence: i64,
    ) -> Result<(), AppError> {
        let start = Instant::now();
        self.counters()
            .update_one(
                doc! { "owner_id": owner_id, "counter_type": counter_type.as_str() },
                doc! { "$set": { "sequence": sequence } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| db_error("Failed to reset counter", e))?;
        observe_store_operation(BACKEND, "counter_overwrite", start);
        Ok(())
    }
}

#[async_trait]
impl BillStore for BillDb {
    async fn insert(&self, bill: &Bill) -> Result<(), AppError> {
        let start = Instant::now();
        self.bills()
            .insert_one(bill, None)
            .await
            .map_err(|e| db_error("Failed to insert bill", e))?;
        observe_store_operation(BACKEND, "bill_insert", start);
        Ok(())
    }

    async fn find(&self, owner_id: &str, bill_id: &str) -> Result<Option<Bill>, AppError> {
        let start = Instant::now();
        let bill = self
            .bills()
            .find_one(doc! { "bill_id": bill_id, "owner_id": owner_id }, None)
            .await
            .map_err(|e| db_error("Failed to find bill", e))?;
        observe_store_operation(BACKEND, "bill_find", start);
        Ok(bill)
    }

    async fn replace(&self, bill: &Bill) -> Result<bool, AppError> {
        let start = Instant::now();
        let result = self
            .bills()
            .replace_one(
                doc! { "bill_id": bill.bill_id.as_str(), "owner_id": bill.owner_id.as_str() },
                bill,
                None,
            )
            .await
            .map_err(|e| db_error("Failed to update bill", e))?;
        observe_store_operation(BACKEND, "bill_replace", start);
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, owner_id: &str, bill_id: &str) -> Result<bool, AppError> {
        let start = Instant::now();
        let result = self
            .bills()
            .delete_one(doc! { "bill_id": bill_id, "owner_id": owner_id }, None)
            .await
            .map_err(|e| db_error("Failed to delete bill", e))?;
        observe_store_operation(BACKEND, "bill_delete", start);
        Ok(result.deleted_count > 0)
    }

    async fn list(&self, owner_id: &str, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError> {
        let start = Instant::now();
        let mut query = doc! { "owner_id": owner_id };

        if let Some(term) = filter.search.as_deref() {
            let pattern = regex::escape(term);
            query.insert(
                "$or",
                vec![
                    doc! { "customer_name": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "bill_number": { "$regex": pattern.as_str(), "$options": "i" } },
                ],
            );
        }

        let find_options = FindOptions::builder()
            .sort(doc! { "created_utc": -1, "_id": -1 })
            .limit(filter.limit)
            .skip(filter.offset)
            .build();

        let cursor = self
            .bills()
            .find(query, find_options)
            .await
            .map_err(|e| db_error("Failed to list bills", e))?;

        let bills: Vec<Bill> = cursor
            .try_collect()
            .await
            .map_err(|e| db_error("Failed to collect bills", e))?;
        observe_store_operation(BACKEND, "bill_list", start);

        Ok(bills)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.ping().await
    }
}

#[async_trait]
impl UserStore for BillDb {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        let start = Instant::now();
        let result = self.users().insert_one(user, None).await;
        observe_store_operation(BACKEND, "user_insert", start);

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(anyhow::anyhow!(
                "Username already exists"
            ))),
            Err(e) => Err(db_error("Failed to insert user", e)),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let start = Instant::now();
        let user = self
            .users()
            .find_one(doc! { "username": username }, None)
            .await
            .map_err(|e| db_error("Failed to find user", e))?;
        observe_store_operation(BACKEND, "user_find", start);
        Ok(user)
    }
}
