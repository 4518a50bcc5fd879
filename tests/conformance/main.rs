//! Conformance suite for the storage backends.
//!
//! Every scenario runs against `MemoryStorage`. The MongoDB variants run
//! only when `STOREKIT_MONGODB_URI` points at a reachable server; each
//! scenario then uses its own collection, dropped before the run.

mod scenarios;
mod students;

macro_rules! memory_suite {
    ($($name:ident),* $(,)?) => {
        mod memory {
            use storekit::MemoryStorage;

            $(
                #[tokio::test]
                async fn $name() {
                    crate::scenarios::$name(&MemoryStorage::new(), None).await;
                }
            )*
        }
    };
}

macro_rules! mongo_suite {
    ($($name:ident),* $(,)?) => {
        mod mongo {
            use storekit::MongoStorage;

            use crate::students::Student;

            /// Connects when the environment names a server, clearing `table`.
            async fn connect(table: &str) -> Option<MongoStorage> {
                let uri = std::env::var("STOREKIT_MONGODB_URI").ok()?;
                let storage = MongoStorage::connect(&uri, "", "", "storekit_test")
                    .await
                    .unwrap();
                storage.drop_table::<Student>(Some(table)).await.unwrap();
                Some(storage)
            }

            $(
                #[tokio::test]
                async fn $name() {
                    let table = concat!("conformance_", stringify!($name));
                    let Some(storage) = connect(table).await else {
                        eprintln!("STOREKIT_MONGODB_URI not set, skipping");
                        return;
                    };
                    crate::scenarios::$name(&storage, Some(table)).await;
                }
            )*
        }
    };
}

macro_rules! suites {
    ($($name:ident),* $(,)?) => {
        memory_suite!($($name),*);
        #[cfg(feature = "mongodb")]
        mongo_suite!($($name),*);
    };
}

suites!(
    create_then_first,
    create_table_is_idempotent,
    duplicate_create_fails,
    save_of_unread_value_is_expired,
    save_after_first_bumps_version,
    interleaved_saves_admit_one_writer,
    delete_then_first_is_not_found,
    composite_keys_require_range,
    embedded_version_path,
    custom_version_attribute,
    find_with_expressions,
    find_rejects_bad_expressions,
);
