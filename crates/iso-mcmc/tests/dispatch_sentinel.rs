//! Worker pool dispatch and shutdown protocol.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use iso_mcmc::{run_worker, Task, TaskQueue};

#[test]
fn each_index_is_handled_exactly_once_and_all_workers_stop() {
    let (queue, rx) = TaskQueue::new();
    let handled = Mutex::new(Vec::new());
    let exits = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..2 {
            let tasks = rx.clone();
            let handled = &handled;
            let exits = &exits;
            scope.spawn(move || {
                run_worker(&tasks, |index| {
                    handled.lock().unwrap().push(index);
                });
                exits.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(rx);

        queue.dispatch_all(3).unwrap();
        queue.shutdown_workers(2).unwrap();
    });

    let mut seen = handled.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(exits.load(Ordering::SeqCst), 2);
}

#[test]
fn a_disconnected_queue_ends_the_worker_loop() {
    let (queue, tasks) = TaskQueue::new();
    queue.dispatch(5).unwrap();
    drop(queue);

    let mut seen = Vec::new();
    run_worker(&tasks, |index| seen.push(index));
    assert_eq!(seen, vec![5]);
}

#[test]
fn dispatch_after_the_last_worker_exits_is_a_lifecycle_error() {
    let (queue, rx) = TaskQueue::new();
    drop(rx);

    assert_eq!(queue.dispatch(0).unwrap_err().info().code, "queue-disconnected");
    assert_eq!(queue.dispatch_all(2).unwrap_err().info().code, "queue-disconnected");
    assert_eq!(
        queue.shutdown_workers(1).unwrap_err().info().code,
        "queue-disconnected"
    );
}

#[test]
fn shutdown_tasks_are_consumed_once_each() {
    let (queue, rx) = TaskQueue::new();
    queue.shutdown_workers(2).unwrap();
    assert_eq!(rx.recv().unwrap(), Task::Shutdown);
    assert_eq!(rx.recv().unwrap(), Task::Shutdown);
    assert!(rx.try_recv().is_err());
}
