use parking_lot::RwLock;
use std::sync::Arc;

/// Single-writer, many-reader slot. The writer swaps in a whole new value so a
/// reader never sees a half-updated one.
#[derive(Debug)]
pub struct Latest<T> {
    slot: RwLock<Arc<T>>,
}

impl<T> Latest<T> {
    pub fn new(value: T) -> Self {
        Self { slot: RwLock::new(Arc::new(value)) }
    }

    pub fn publish(&self, value: impl Into<Arc<T>>) {
        *self.slot.write() = value.into();
    }

    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.slot.read())
    }
}

impl<T: Default> Default for Latest<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn readers_keep_their_snapshot() {
        let slot = Latest::new(vec![1u32, 2, 3]);
        let before = slot.load();
        slot.publish(vec![4u32, 5, 6]);
        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*slot.load(), vec![4, 5, 6]);
    }

    #[test]
    fn concurrent_readers_see_whole_values() {
        let slot = Arc::new(Latest::new((0u64, 0u64)));
        let writer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for i in 1..=1_000u64 {
                    slot.publish((i, i * 2));
                }
            })
        };
        let reader = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let v = slot.load();
                    assert_eq!(v.1, v.0 * 2);
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(*slot.load(), (1_000, 2_000));
    }
}
