//! Scenario 6 from SPEC_FULL.md §8: at most one run lock is ever held per task.
//! Exercises `RunLock` directly against a real (tempfile-backed) SQLite pool, since
//! the overlap guard is a database-level claim rather than an in-memory one.

use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;

use papergather::error::Error;
use papergather::scheduler::RunLock;
use papergather::store::{run_pending_migrations, DbConnection};

async fn test_pool(path: &std::path::Path) -> papergather::store::DbPool {
    let url = format!("sqlite://{}", path.display());
    run_pending_migrations(&url).await.unwrap();
    let manager = AsyncDieselConnectionManager::<DbConnection>::new(url);
    Pool::builder(manager).build().unwrap()
}

#[tokio::test]
async fn second_acquire_for_the_same_task_is_rejected_while_the_first_is_held() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = test_pool(&tmp.path().join("overlap.sqlite3")).await;

    let first = RunLock::acquire(&pool, "task-a", "run-1").await.unwrap();
    let second = RunLock::acquire(&pool, "task-a", "run-2").await;

    assert!(matches!(second, Err(Error::InvalidConfig(_))));

    first.release().await.unwrap();
}

#[tokio::test]
async fn a_released_lock_can_be_reacquired() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = test_pool(&tmp.path().join("overlap.sqlite3")).await;

    let first = RunLock::acquire(&pool, "task-b", "run-1").await.unwrap();
    first.release().await.unwrap();

    let second = RunLock::acquire(&pool, "task-b", "run-2").await;
    assert!(second.is_ok());
    second.unwrap().release().await.unwrap();
}

#[tokio::test]
async fn distinct_tasks_do_not_contend_for_the_same_lock() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = test_pool(&tmp.path().join("overlap.sqlite3")).await;

    let a = RunLock::acquire(&pool, "task-c", "run-1").await.unwrap();
    let b = RunLock::acquire(&pool, "task-d", "run-1").await;

    assert!(b.is_ok());
    a.release().await.unwrap();
    b.unwrap().release().await.unwrap();
}
