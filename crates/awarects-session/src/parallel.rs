//! Run one stage on several devices at once.
//!
//! Workers are scoped threads, one per item: spawn all, join all, and
//! only then report. The first failure in item order wins; the others are
//! logged so they are not silently lost.

use std::thread;

use tracing::debug;

use crate::error::{AwareError, Result};

/// Apply `task` to every item concurrently and collect results in item order.
pub fn concurrent_exec<T, R, F>(items: Vec<T>, task: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Sync,
{
    let outcomes: Vec<Result<R>> = thread::scope(|scope| {
        let task = &task;
        let workers: Vec<_> = items
            .into_iter()
            .map(|item| scope.spawn(move || task(item)))
            .collect();
        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|_| Err(AwareError::Internal("worker panicked".to_string())))
            })
            .collect()
    });

    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok(value) => results.push(value),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(err) => debug!(%err, "additional parallel failure"),
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

/// Run two different tasks concurrently; both finish before either result is used.
pub fn join_both<A, B, RA, RB>(a: A, b: B) -> Result<(RA, RB)>
where
    A: FnOnce() -> Result<RA> + Send,
    B: FnOnce() -> Result<RB> + Send,
    RA: Send,
    RB: Send,
{
    let (ra, rb) = thread::scope(|scope| {
        let left = scope.spawn(a);
        let right = scope.spawn(b);
        let panicked = || AwareError::Internal("worker panicked".to_string());
        (
            left.join().unwrap_or_else(|_| Err(panicked())),
            right.join().unwrap_or_else(|_| Err(panicked())),
        )
    });
    match (ra, rb) {
        (Ok(ra), Ok(rb)) => Ok((ra, rb)),
        (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err),
        (Err(err), Err(other)) => {
            debug!(%other, "additional parallel failure");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    use super::*;

    #[test]
    fn results_keep_item_order() {
        let out = concurrent_exec(vec![30u64, 0, 10], |delay| {
            thread::sleep(Duration::from_millis(delay));
            Ok(delay * 2)
        })
        .unwrap();
        assert_eq!(out, vec![60, 0, 20]);
    }

    #[test]
    fn tasks_really_overlap() {
        let barrier = Arc::new(Barrier::new(2));
        let out = concurrent_exec(vec![1, 2], |n| {
            barrier.wait();
            Ok(n)
        })
        .unwrap();
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn every_task_runs_even_when_one_fails() {
        let ran = AtomicUsize::new(0);
        let err = concurrent_exec(vec![0, 1, 2], |n| {
            ran.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                Err(AwareError::Config(format!("task {n}")))
            } else {
                thread::sleep(Duration::from_millis(20));
                Ok(n)
            }
        })
        .unwrap_err();
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert!(matches!(err, AwareError::Config(msg) if msg == "task 1"));
    }

    #[test]
    fn first_failure_in_item_order_wins() {
        let err = concurrent_exec(vec![0u64, 1], |n| {
            thread::sleep(Duration::from_millis(if n == 0 { 30 } else { 0 }));
            Err::<(), _>(AwareError::Config(format!("task {n}")))
        })
        .unwrap_err();
        assert!(matches!(err, AwareError::Config(msg) if msg == "task 0"));
    }

    #[test]
    fn panics_become_internal_errors() {
        let err = concurrent_exec(vec![1], |_: i32| -> Result<()> { panic!("boom") }).unwrap_err();
        assert!(matches!(err, AwareError::Internal(_)));
    }

    #[test]
    fn join_both_mixed_tasks() {
        let (a, b) = join_both(|| Ok(1u8), || Ok("two")).unwrap();
        assert_eq!((a, b), (1, "two"));

        let err = join_both(
            || Ok(1u8),
            || Err::<u8, _>(AwareError::Config("right".to_string())),
        )
        .unwrap_err();
        assert!(matches!(err, AwareError::Config(_)));
    }
}
