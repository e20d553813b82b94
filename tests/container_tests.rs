//! Container operation tests.

mod common;

use blob_snapshot_sample::models::ListBlobsOptions;
use blob_snapshot_sample::{BlobService, ErrorCode};
use common::TestService;

#[tokio::test]
async fn test_create_container_is_idempotent() {
    let test = TestService::start("idempotent");

    assert!(test
        .service
        .create_container_if_not_exists(test.container())
        .await
        .unwrap());
    assert!(!test
        .service
        .create_container_if_not_exists(test.container())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_invalid_container_names() {
    let test = TestService::start("names");

    for name in ["ab", "UPPER", "-leading", "double--hyphen", "trailing-", "under_score"] {
        let err = test
            .service
            .create_container_if_not_exists(name)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidResourceName, "name {}", name);
    }
}

#[tokio::test]
async fn test_delete_container_removes_blobs_and_snapshots() {
    let test = TestService::with_container("cascade").await;
    test.commit_blocks("blob", &[("b1", "data")]).await;
    test.service.create_snapshot(test.container(), "blob").await.unwrap();

    test.service.delete_container(test.container()).await.unwrap();

    // Recreating gives an empty container
    assert!(test
        .service
        .create_container_if_not_exists(test.container())
        .await
        .unwrap());
    let listed = test
        .service
        .list_blobs(test.container(), &ListBlobsOptions::with_snapshots())
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_delete_missing_container() {
    let test = TestService::start("nothere");
    let err = test
        .service
        .delete_container(test.container())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ContainerNotFound);
}

#[tokio::test]
async fn test_list_missing_container() {
    let test = TestService::start("nolist");
    let err = test
        .service
        .list_blobs(test.container(), &ListBlobsOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ContainerNotFound);
}
