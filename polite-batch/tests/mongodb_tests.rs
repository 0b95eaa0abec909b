#[cfg(all(test, feature = "mongodb"))]
mod tests {
    use dotenvy::dotenv;
    use mongodb::{Client, Database, options::ClientOptions};
    use polite_batch::{
        BulkFetch, HasLookupKey, MongoStore, ProcessorOptions, spawn_batch_runtime,
    };
    use serde::{Deserialize, Serialize};
    use std::{sync::Arc, time::Duration};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct RobotsDoc {
        url: String,
        body: String,
    }

    impl HasLookupKey for RobotsDoc {
        fn lookup_key(&self) -> &str {
            &self.url
        }
    }

    async fn get_mongodb() -> Database {
        dotenv().ok();
        let uri = std::env::var("MONGODB_URI").expect("Set MONGODB_URI env variable");
        let client_options = ClientOptions::parse(&uri)
            .await
            .expect("Failed to parse options");
        let client =
            Client::with_options(client_options.clone()).expect("Failed to create client");
        let db_name = client_options
            .default_database
            .as_ref()
            .expect("No database specified");
        client.database(db_name)
    }

    async fn seeded_store(name: &str) -> MongoStore<RobotsDoc> {
        let db = get_mongodb().await;
        let store = MongoStore::<RobotsDoc>::new(&db, name);
        store.collection.drop().await.expect("drop collection");
        store
            .collection
            .insert_many(vec![
                RobotsDoc {
                    url: "https://a.com/robots.txt".to_string(),
                    body: "User-agent: *".to_string(),
                },
                RobotsDoc {
                    url: "https://b.com/robots.txt".to_string(),
                    body: "Disallow: /".to_string(),
                },
            ])
            .await
            .expect("seed collection");
        store.setup_index("url").await.expect("create index");
        store
    }

    #[tokio::test]
    async fn test_fetch_in_matches_values() {
        let store = seeded_store("polite_test_fetch_in").await;
        let found = store
            .fetch_in(
                "url",
                &[
                    "https://a.com/robots.txt".to_string(),
                    "https://zzz.com/robots.txt".to_string(),
                ],
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body, "User-agent: *");
    }

    #[tokio::test]
    async fn test_runtime_against_mongodb() {
        let store = Arc::new(seeded_store("polite_test_runtime").await);
        let runtime = spawn_batch_runtime(
            store,
            ProcessorOptions {
                tick_interval: Duration::from_millis(20),
                ..Default::default()
            },
        );

        let a = runtime.reader.get_one("https://a.com/robots.txt");
        let a_again = runtime.reader.get_one("https://a.com/robots.txt");
        let missing = runtime.reader.get_one("https://missing.com/robots.txt");

        assert_eq!(a.await.unwrap().body, "User-agent: *");
        assert_eq!(a_again.await.unwrap().body, "User-agent: *");
        assert_eq!(missing.await.unwrap(), RobotsDoc::default());

        runtime.shutdown().await;
    }
}
