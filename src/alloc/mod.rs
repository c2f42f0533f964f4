use std::alloc::{handle_alloc_error, Layout};

pub(crate) fn slot_buckets<T, F>(buckets: usize, init: F) -> Box<[T]>
where
    F: Fn(usize) -> T,
{
    debug_assert!(buckets != 0, "Bucket count should be positive");

    // Array of buckets
    let data = Layout::array::<T>(buckets).expect("Bucket layout can't fit in");

    unsafe {
        let p = std::alloc::alloc_zeroed(data) as *mut T;
        if p.is_null() {
            handle_alloc_error(data);
        }

        (0..buckets).for_each(|i| {
            std::ptr::write(p.add(i), init(i));
        });

        Vec::from_raw_parts(p, buckets, buckets).into_boxed_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::slot_buckets;

    #[test]
    fn buckets_are_initialized_in_order() {
        let slots = slot_buckets(8, |i| i * 2);
        assert_eq!(slots.len(), 8);
        for (i, s) in slots.iter().enumerate() {
            assert_eq!(*s, i * 2);
        }
    }
}
