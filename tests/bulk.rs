mod util;

use credx_harness::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use util::*;

#[tokio::test(flavor = "multi_thread")]
async fn bulk_issuance_respects_pool_size() {
    setup();
    let fixture = IssuanceFixture::new(&WorkflowConfig::default()).unwrap();
    let cred_def_id = fixture.cred_def.id.clone();
    let report = issue_many(
        PoolConfig {
            target: 25,
            workers: 4,
        },
        move |_| fixture.issue(),
    )
    .await;
    assert!(report.is_ok(), "{:?}", report.as_ref().map(|r| r.results.len()));
    let report = report.unwrap();
    assert_eq!(report.results.len(), 25);
    assert!(report.peak_in_flight <= 4);
    assert!(report.peak_in_flight >= 1);
    assert!(report
        .results
        .iter()
        .all(|c: &Credential| c.cred_def_id == cred_def_id));
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_never_exceeds_workers() {
    setup();
    let running = Arc::new(AtomicUsize::new(0));
    let observed = Arc::new(AtomicUsize::new(0));
    let (r, o) = (running.clone(), observed.clone());
    let report = issue_many(
        PoolConfig {
            target: 120,
            workers: 3,
        },
        move |i| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            o.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            r.fetch_sub(1, Ordering::SeqCst);
            Ok(i * 2)
        },
    )
    .await
    .unwrap();
    assert_eq!(report.results.len(), 120);
    assert!(observed.load(Ordering::SeqCst) <= 3);
    assert!(report.peak_in_flight <= 3);
    assert_eq!(report.results[7], 14);
    assert_eq!(running.load(Ordering::SeqCst), 0);
    assert!(report.average <= report.elapsed);
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_rejects_zero_workers() {
    setup();
    let res = issue_many(
        PoolConfig {
            target: 1,
            workers: 0,
        },
        |_| Ok(()),
    )
    .await;
    assert!(matches!(res, Err(Error::InvalidInput(_))));
}
