//! History contract checks, run against both byte store backends.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use switchboard_common::ConversationId;
use switchboard_engine::{ByteStore, History, MemoryStore, Message, RedbStore, Role, UserInfo};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

async fn orders_by_timestamp(store: Arc<dyn ByteStore>) {
    let history = History::new(store, ConversationId::new("ordering"));
    history
        .add(&[
            Message::user("third").with_id("c").with_timestamp(at(300)),
            Message::user("first").with_id("a").with_timestamp(at(100)),
            Message::user("second").with_id("b").with_timestamp(at(200)),
        ])
        .await
        .unwrap();

    let contents: Vec<String> = history
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, ["first", "second", "third"]);
}

async fn roundtrips_and_clears(store: Arc<dyn ByteStore>) {
    let history = History::new(store, ConversationId::new("roundtrip"));
    let message = Message::user("hello")
        .with_id("m1")
        .with_timestamp(at(5))
        .with_user(
            UserInfo::new("u1", "sam")
                .with_display_name("Sam")
                .with_pronouns("they/them"),
        );
    history.add(std::slice::from_ref(&message)).await.unwrap();

    let got = history.get(&["m1".into()]).await.unwrap();
    assert_eq!(got, vec![message]);

    assert_eq!(history.clear().await.unwrap(), 1);
    assert!(history.get_all().await.unwrap().is_empty());
    assert_eq!(history.clear().await.unwrap(), 0);
}

async fn namespaces_are_disjoint(store: Arc<dyn ByteStore>) {
    let a = History::new(Arc::clone(&store), ConversationId::new("conv"));
    let b = History::new(store, ConversationId::new("conv2"));
    a.add(&[Message::user("in a").with_id("1").with_timestamp(at(1))])
        .await
        .unwrap();
    b.add(&[Message::user("in b").with_id("1").with_timestamp(at(1))])
        .await
        .unwrap();

    assert_eq!(a.all_keys().await.unwrap(), vec!["conv:1".to_string()]);
    assert_eq!(b.clear().await.unwrap(), 1);
    assert_eq!(a.get_all().await.unwrap().len(), 1);
}

async fn tolerates_corrupt_records(store: Arc<dyn ByteStore>) {
    store
        .mset(vec![("mixed:bad".into(), b"{{{{".to_vec())])
        .await
        .unwrap();
    let history = History::new(store, ConversationId::new("mixed"));
    history
        .add(&[Message::user("fine").with_id("good").with_timestamp(at(10))])
        .await
        .unwrap();

    let got = history.get_all().await.unwrap();
    assert_eq!(got.len(), 2);
    assert!(got
        .iter()
        .any(|m| m.content == "[empty]" && m.role == Role::User));
    assert!(got.iter().any(|m| m.content == "fine"));
}

#[tokio::test]
async fn memory_store_honors_the_contract() {
    orders_by_timestamp(Arc::new(MemoryStore::new())).await;
    roundtrips_and_clears(Arc::new(MemoryStore::new())).await;
    namespaces_are_disjoint(Arc::new(MemoryStore::new())).await;
    tolerates_corrupt_records(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn redb_store_honors_the_contract() {
    let dir = tempfile::tempdir().unwrap();
    let open = |name: &str| Arc::new(RedbStore::open(&dir.path().join(name)).unwrap());

    orders_by_timestamp(open("ordering.redb")).await;
    roundtrips_and_clears(open("roundtrip.redb")).await;
    namespaces_are_disjoint(open("namespaces.redb")).await;
    tolerates_corrupt_records(open("mixed.redb")).await;
}
