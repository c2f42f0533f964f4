use pawl::prelude::*;
use std::sync::Arc;

fn main() {
    let table: Arc<PhaseRwLock<Vec<u64>>> = Arc::new(PhaseRwLock::new(Vec::new()));

    // Readers and writers alternate in phases under contention.
    let thread_count = 8;
    let mut threads = vec![];

    for thread_no in 0..thread_count {
        let table = table.clone();

        let t = std::thread::Builder::new()
            .name(format!("t_{}", thread_no))
            .spawn(move || {
                for i in 0..10_000 {
                    if thread_no % 2 == 0 {
                        let guard = table.read();
                        let _len = guard.len();
                    } else {
                        let mut guard = table.write();
                        guard.push(thread_no * 10_000 + i);
                    }
                }
            })
            .unwrap();

        threads.push(t);
    }

    for t in threads.into_iter() {
        t.join().unwrap();
    }

    println!("writes observed: {}", table.read().len());
}
