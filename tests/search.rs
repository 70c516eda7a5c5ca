//! Searches against a real catalogue database.

mod common;

#[cfg(test)]
mod tests {
    use kittygifs::{
        config::SearchConfig,
        error::{ParseError, SearchError},
        search::{self, execute, parse, resolve, Page, SearchRequest},
    };

    use crate::common::{gif, hold_every_connection, ids, insert, setup, user};

    async fn run(
        db: &kittygifs::database::Database,
        q: &str,
        caller: Option<&kittygifs::models::identity::Identity>,
    ) -> Result<Vec<u128>, SearchError> {
        let request = SearchRequest::new(q, Page::default());
        let gifs = search::search(db, &SearchConfig::default(), &request, caller).await?;

        // unsorted searches don't promise an order
        let mut found = ids(&gifs);
        found.sort();
        Ok(found)
    }

    /// `tag1 tag2 @alice "secret note"` finds alice's public gifs with both
    /// tags and the note.
    #[tokio::test]
    async fn end_to_end() {
        let setup = setup().await;
        insert(
            &setup.db,
            &[
                gif(1, "alice", &["tag1", "tag2x"], "a Secret Note here", None),
                gif(2, "alice", &["tag1", "tag2"], "nothing to see", None),
                gif(3, "bob", &["tag1", "tag2"], "secret note", None),
                gif(4, "alice", &["tag1", "tag2"], "secret note", Some("x")),
                gif(5, "alice", &["tag2"], "secret note", None),
                gif(6, "alice", &["Tag2", "tag1"], "SECRET NOTE!", None),
                gif(7, "alice", &["tag1", "xtag2"], "secret note", None),
            ],
        )
        .await;

        let bob = user("bob", &[]);
        let descriptor = parse::parse("tag1 tag2 @alice \"secret note\"", Some("bob")).unwrap();
        let filter = resolve::resolve(&descriptor, Some(&bob)).unwrap();

        let results = execute::execute(&setup.db, &filter, Page::default())
            .await
            .unwrap();
        let mut found = ids(&results);
        found.sort();
        assert_eq!(found, vec![1, 6]);

        // the facade agrees
        let found = run(&setup.db, "tag1 tag2 @alice \"secret note\"", Some(&bob))
            .await
            .unwrap();
        assert_eq!(found, vec![1, 6]);
    }

    #[tokio::test]
    async fn groups() {
        let setup = setup().await;
        insert(
            &setup.db,
            &[
                gif(1, "alice", &["cat"], "", None),
                gif(2, "alice", &["cat"], "", Some("x")),
                gif(3, "alice", &["cat"], "", Some("y")),
                gif(4, "bob", &["cat"], "", Some("@bob")),
                gif(5, "alice", &["cat"], "", Some("@alice")),
            ],
        )
        .await;

        let db = &setup.db;
        let bob = user("bob", &["x"]);
        let root = user("root", &["admin"]);

        assert_eq!(run(db, "", None).await.unwrap(), vec![1]);
        assert_eq!(run(db, "", Some(&bob)).await.unwrap(), vec![1]);
        assert_eq!(run(db, "$ig", None).await.unwrap(), vec![1]);
        assert_eq!(run(db, "$ig", Some(&bob)).await.unwrap(), vec![1, 2, 4]);
        assert_eq!(run(db, "#x cat", Some(&bob)).await.unwrap(), vec![1, 2]);
        assert_eq!(run(db, "#!private", Some(&bob)).await.unwrap(), vec![4]);
        assert_eq!(run(db, "#!@alice", Some(&root)).await.unwrap(), vec![5]);
        assert_eq!(run(db, "#y #!y", Some(&root)).await.unwrap(), vec![3]);

        let err = run(db, "#!y", Some(&bob)).await.unwrap_err();
        assert!(matches!(err, SearchError::Authorization(_)));
        assert_eq!(err.status(), 403);

        let err = run(db, "#!private", None).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::Parse(ParseError::MissingIdentity)
        ));
        assert_eq!(err.status(), 403);
    }

    #[tokio::test]
    async fn pages_and_sorting() {
        let setup = setup().await;
        let gifs: Vec<_> = (1..=7).map(|i| gif(i, "alice", &["cat"], "", None)).collect();
        insert(&setup.db, &gifs).await;

        let db = &setup.db;
        let config = SearchConfig::default();
        let page = |q: &str, max: &str, skip: &str| {
            SearchRequest::from_params(&config, Some(q), Some(max), Some(skip))
        };

        let request = page("sort:old", "3", "2").unwrap();
        let found = search::search(db, &config, &request, None).await.unwrap();
        assert_eq!(ids(&found), vec![3, 4, 5]);

        let request = page("sort:new", "2", "0").unwrap();
        let found = search::search(db, &config, &request, None).await.unwrap();
        assert_eq!(ids(&found), vec![7, 6]);

        let request = page("cat", "0", "0").unwrap();
        let found = search::search(db, &config, &request, None).await.unwrap();
        assert!(found.is_empty(), "max=0 is an empty page, not an error");

        let request = page("cat", "10", "100").unwrap();
        let found = search::search(db, &config, &request, None).await.unwrap();
        assert!(found.is_empty(), "skipping past the end is fine too");

        let err = page("cat", "501", "0").unwrap_err();
        assert_eq!(SearchError::from(err).status(), 400);
    }

    #[tokio::test]
    async fn bad_syntax_is_a_bad_request() {
        let setup = setup().await;

        let err = run(&setup.db, "sort:random", None).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.public_message().contains("random"));
        assert!(!err.is_retryable());

        let err = run(&setup.db, "#!a #!b", None).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn full_text_and_regex_notes() {
        let setup = setup().await;
        insert(
            &setup.db,
            &[
                gif(1, "alice", &["cat"], "happy birthday to you", None),
                gif(2, "alice", &["cat"], "merry christmas", None),
                gif(3, "alice", &["cat"], "Birthday cake", None),
            ],
        )
        .await;

        let db = &setup.db;
        assert_eq!(run(db, "'birthday'", None).await.unwrap(), vec![1, 3]);
        assert_eq!(run(db, "'christmas cake'", None).await.unwrap(), vec![2, 3]);
        assert_eq!(run(db, "'birthday' \"cake\"", None).await.unwrap(), vec![3]);
        assert_eq!(run(db, "\"^merry\"", None).await.unwrap(), vec![2]);
        assert!(run(db, "'NOT'", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tag_prefix_is_literal() {
        let setup = setup().await;
        insert(
            &setup.db,
            &[
                gif(1, "alice", &["happy_birthday"], "", None),
                gif(2, "alice", &["happyxbirthday"], "", None),
                gif(3, "alice", &["unhappy_birthday"], "", None),
            ],
        )
        .await;

        assert_eq!(run(&setup.db, "happy_", None).await.unwrap(), vec![1]);
        assert_eq!(run(&setup.db, "happy", None).await.unwrap(), vec![1, 2]);
        assert_eq!(
            run(&setup.db, "happy_birthday", None).await.unwrap(),
            vec![1]
        );
    }

    #[tokio::test]
    async fn results_serialize_as_an_array() {
        let setup = setup().await;
        insert(&setup.db, &[gif(1, "alice", &["cat"], "", None)]).await;

        let found = run(&setup.db, "dog", None).await.unwrap();
        assert!(found.is_empty());

        let request = SearchRequest::new("cat", Page::default());
        let gifs = search::search(&setup.db, &SearchConfig::default(), &request, None)
            .await
            .unwrap();
        let json = serde_json::to_value(&gifs).unwrap();

        assert_eq!(json[0]["uploader"], "alice");
        assert_eq!(json[0]["tags"], serde_json::json!(["cat"]));
        assert!(json[0].get("previewGif").is_none());
    }

    #[tokio::test]
    async fn slow_searches_time_out() {
        let setup = setup().await;
        insert(&setup.db, &[gif(1, "alice", &["cat"], "", None)]).await;

        let config = SearchConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        let request = SearchRequest::new("cat", Page::default());

        let held = hold_every_connection(&setup.db).await;
        let err = search::search(&setup.db, &config, &request, None)
            .await
            .unwrap_err();
        drop(held);

        assert!(matches!(err, SearchError::TimedOut { .. }));
        assert_eq!(err.status(), 500);
        assert!(err.is_retryable());
        assert!(err.public_message().contains("timed out"));

        // the next search is fine
        assert_eq!(run(&setup.db, "cat", None).await.unwrap(), vec![1]);
    }
}
