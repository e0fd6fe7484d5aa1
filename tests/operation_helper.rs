mod common;

use common::{BUCKET, Call, MockObjectClient, Op, page};
use object_fs::PathPrefixer;
use object_fs::models::listing::{CommonPrefix, ListObjectsOutput, ObjectRecord};
use object_fs::services::operation_helper::OperationHelper;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn helper(client: &Arc<MockObjectClient>, prefix: &str) -> OperationHelper {
    OperationHelper::new(client.clone(), PathPrefixer::new(prefix))
}

#[tokio::test]
async fn list_all_objects_follows_tokens_in_order() {
    let client = Arc::new(MockObjectClient::new());
    client.queue_page(page(&["x/1", "x/2"], &[], Some("a")));
    client.queue_page(page(&["x/3"], &[], Some("b")));
    client.queue_page(page(&["x/4"], &[], None));

    let keys: Vec<String> = helper(&client, "")
        .list_all_objects(BUCKET, "x/")
        .await
        .unwrap()
        .into_iter()
        .map(|id| id.key)
        .collect();

    assert_eq!(keys, vec!["x/1", "x/2", "x/3", "x/4"]);

    let tokens: Vec<Option<String>> = client
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::List(params) => Some(params.continuation_token),
            _ => None,
        })
        .collect();
    assert_eq!(tokens, vec![None, Some("a".to_string()), Some("b".to_string())]);
}

#[tokio::test]
async fn delete_directory_objects_batches_once() {
    let client = Arc::new(MockObjectClient::new());
    client.queue_page(page(&["d/a", "d/b"], &[], Some("t")));
    client.queue_page(page(&["d/c"], &[], None));

    let count = helper(&client, "")
        .delete_directory_objects(BUCKET, "d/")
        .await
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(client.count(Op::DeleteMany), 1);
    assert_eq!(
        client.calls().last(),
        Some(&Call::DeleteMany(vec!["d/a".into(), "d/b".into(), "d/c".into()]))
    );
}

#[tokio::test]
async fn delete_directory_objects_skips_empty_listing() {
    let client = Arc::new(MockObjectClient::new());
    let count = helper(&client, "")
        .delete_directory_objects(BUCKET, "nothing/")
        .await
        .unwrap();

    assert_eq!(count, 0);
    assert_eq!(client.count(Op::DeleteMany), 0);
}

#[tokio::test]
async fn listing_failure_propagates() {
    let client = Arc::new(MockObjectClient::new());
    client.fail(Op::List);

    assert!(helper(&client, "").list_all_objects(BUCKET, "d/").await.is_err());
    assert_eq!(client.count(Op::DeleteMany), 0);
}

#[test]
fn page_processing_drops_malformed_entries() {
    let client = Arc::new(MockObjectClient::new());
    let helper = helper(&client, "test");
    let page = ListObjectsOutput {
        contents: vec![
            ObjectRecord::new("test/valid-file.txt").size("2048"),
            ObjectRecord::default(),
            ObjectRecord::new("test/marker/"),
        ],
        common_prefixes: vec![CommonPrefix::new("test/valid-dir/"), CommonPrefix::default()],
        ..ListObjectsOutput::default()
    };

    let files: Vec<_> = helper.process_object_contents(&page).collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "valid-file.txt");
    assert_eq!(files[0].file_size, Some(2048));

    let dirs: Vec<_> = helper.process_directory_prefixes(&page, false).collect();
    assert_eq!(dirs.len(), 1);
    assert_eq!(dirs[0].path, "valid-dir");

    assert_eq!(helper.process_directory_prefixes(&page, true).count(), 0);
    assert!(client.calls().is_empty());
}
