use pawl::prelude::*;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const ITERATIONS: u64 = 100_000;

fn counting_threads<L, F>(lock: Arc<L>, threads: usize, f: F)
where
    L: Send + Sync + 'static,
    F: Fn(&L) + Send + Sync + Copy + 'static,
{
    let mut handles = vec![];

    for thread_no in 0..threads {
        let lock = lock.clone();

        let t = std::thread::Builder::new()
            .name(format!("t_{}", thread_no))
            .spawn(move || {
                for _ in 0..ITERATIONS {
                    f(&lock);
                }
            })
            .unwrap();

        handles.push(t);
    }

    for t in handles.into_iter() {
        t.join().unwrap();
    }
}

#[test]
fn tas_concurrent_counting() {
    let lock = Arc::new(Tas::new(0_u64));

    counting_threads(lock.clone(), THREADS, |l| *l.lock() += 1);

    assert_eq!(*lock.lock(), THREADS as u64 * ITERATIONS);
}

#[test]
fn tatas_concurrent_counting() {
    let lock = Arc::new(Tatas::new(0_u64));

    counting_threads(lock.clone(), THREADS, |l| *l.lock() += 1);

    assert_eq!(*lock.lock(), THREADS as u64 * ITERATIONS);
}

#[test]
fn ticket_concurrent_counting() {
    let lock = Arc::new(TicketLock::new(0_u64));

    counting_threads(lock.clone(), THREADS, |l| *l.lock() += 1);

    assert_eq!(*lock.lock(), THREADS as u64 * ITERATIONS);
}

#[test]
fn anderson_concurrent_counting() {
    // Slot count equals thread count, the tightest legal sizing
    let lock = Arc::new(ArrayLock::with_slots(4, 0_u64).unwrap());

    counting_threads(lock.clone(), 4, |l| *l.lock() += 1);

    assert_eq!(*lock.lock(), 4 * ITERATIONS);
}

#[test]
fn mcs_concurrent_counting() {
    let lock = Arc::new(McsLock::new(0_u64));
    let mut handles = vec![];

    for thread_no in 0..THREADS {
        let lock = lock.clone();

        let t = std::thread::Builder::new()
            .name(format!("t_{}", thread_no))
            .spawn(move || {
                // One node per thread, reused across every acquisition
                let mut node = McsNode::new();
                for _ in 0..ITERATIONS {
                    *lock.lock(&mut node) += 1;
                }
            })
            .unwrap();

        handles.push(t);
    }

    for t in handles.into_iter() {
        t.join().unwrap();
    }

    assert_eq!(*lock.lock(&mut McsNode::new()), THREADS as u64 * ITERATIONS);
}

#[test]
fn clh_concurrent_counting() {
    let lock = Arc::new(ClhLock::new(0_u64).unwrap());
    let mut handles = vec![];

    for thread_no in 0..THREADS {
        let lock = lock.clone();

        let t = std::thread::Builder::new()
            .name(format!("t_{}", thread_no))
            .spawn(move || {
                // The handle comes back recycled from every release
                let mut node = ClhNode::new();
                for _ in 0..ITERATIONS {
                    let mut guard = lock.lock(node);
                    *guard += 1;
                    node = guard.into_node();
                }
            })
            .unwrap();

        handles.push(t);
    }

    for t in handles.into_iter() {
        t.join().unwrap();
    }

    assert_eq!(*lock.lock(ClhNode::new()), THREADS as u64 * ITERATIONS);
}

#[test]
fn tas_oversubscribed_counting() {
    let lock = Arc::new(Tas::new(0_u64));
    let mut handles = vec![];

    // More threads than cores still converges, just slowly
    for thread_no in 0..16 {
        let lock = lock.clone();

        let t = std::thread::Builder::new()
            .name(format!("t_{}", thread_no))
            .spawn(move || {
                for _ in 0..10_000 {
                    *lock.lock() += 1;
                }
            })
            .unwrap();

        handles.push(t);
    }

    for t in handles.into_iter() {
        t.join().unwrap();
    }

    assert_eq!(*lock.lock(), 16 * 10_000);
}

#[test]
fn ticket_fifo_ordering() {
    let lock = Arc::new(TicketLock::new(Vec::new()));

    // Take ticket 0 and hold the lock while the others queue up
    let gate = lock.lock();
    assert_eq!(gate.ticket(), 0);

    let mut handles = vec![];
    for thread_no in 1..=2_u32 {
        let worker_lock = lock.clone();

        let t = std::thread::Builder::new()
            .name(format!("t_{}", thread_no))
            .spawn(move || {
                let mut guard = worker_lock.lock();
                let ticket = guard.ticket();
                guard.push((thread_no, ticket));
            })
            .unwrap();

        handles.push(t);

        // Wait for the ticket to be taken before queueing the next thread
        while lock.waiters() != thread_no + 1 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    drop(gate);

    for t in handles.into_iter() {
        t.join().unwrap();
    }

    // Entry order equals ticket-issue order
    let entries = lock.lock();
    assert_eq!(*entries, vec![(1, 1), (2, 2)]);
}

#[test]
fn release_publishes_writes() {
    let lock = Arc::new(Tas::new((0_u32, 0_u32)));

    let writer = {
        let lock = lock.clone();
        thread::spawn(move || {
            let mut guard = lock.lock();
            guard.0 = 42;
            guard.1 = 1;
        })
    };
    writer.join().unwrap();

    let guard = lock.lock();
    assert_eq!(*guard, (42, 1));
}

#[test]
fn trylock_protocol() {
    let tas = Tas::new(());
    let held = tas.try_lock();
    assert!(held.is_some());
    assert!(tas.try_lock().is_none());
    drop(held);
    assert!(tas.try_lock().is_some());

    let ticket = TicketLock::new(());
    let held = ticket.try_lock();
    assert!(held.is_some());
    assert!(ticket.try_lock().is_none());
    drop(held);
    assert!(ticket.try_lock().is_some());

    let mcs = McsLock::new(());
    let mut node_a = McsNode::new();
    let mut node_b = McsNode::new();
    let held = mcs.try_lock(&mut node_a);
    assert!(held.is_some());
    assert!(mcs.try_lock(&mut node_b).is_none());
    drop(held);
    assert!(mcs.try_lock(&mut node_b).is_some());
}
