use pawl::prelude::*;
use std::sync::Arc;

fn main() {
    let counter: Arc<TicketLock<u64>> = Arc::new(TicketLock::new(0));

    // Increment from 8 threads concurrently.
    let thread_count = 8;
    let mut threads = vec![];

    for thread_no in 0..thread_count {
        let counter = counter.clone();

        let t = std::thread::Builder::new()
            .name(format!("t_{}", thread_no))
            .spawn(move || {
                for _ in 0..100_000 {
                    *counter.lock() += 1;
                }
            })
            .unwrap();

        threads.push(t);
    }

    for t in threads.into_iter() {
        t.join().unwrap();
    }

    println!("counter: {}", *counter.lock());
}
