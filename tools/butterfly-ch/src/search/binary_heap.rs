/// Binary min-heap of `u32` items keyed by `K`
///
/// Equal keys pop the lower item first, so a search that pushes path tree
/// pointers settles ties in insertion order. `clear` resets the length and
/// keeps the backing buffer.
#[derive(Debug, Clone, Default)]
pub struct BinaryHeap<K> {
    data: Vec<(K, u32)>,
    len: usize,
}

impl<K: PartialOrd + Copy> BinaryHeap<K> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    fn less(a: &(K, u32), b: &(K, u32)) -> bool {
        a.0 < b.0 || (!(b.0 < a.0) && a.1 < b.1)
    }

    pub fn push(&mut self, item: u32, key: K) {
        if self.len < self.data.len() {
            self.data[self.len] = (key, item);
        } else {
            self.data.push((key, item));
        }
        self.len += 1;
        self.sift_up(self.len - 1);
    }

    pub fn pop(&mut self) -> Option<u32> {
        self.pop_with_key().map(|(item, _)| item)
    }

    pub fn pop_with_key(&mut self) -> Option<(u32, K)> {
        if self.len == 0 {
            return None;
        }
        let (key, item) = self.data[0];
        self.len -= 1;
        if self.len > 0 {
            self.data[0] = self.data[self.len];
            self.sift_down(0);
        }
        Some((item, key))
    }

    #[inline]
    pub fn peek_key(&self) -> Option<K> {
        (self.len > 0).then(|| self.data[0].0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !Self::less(&self.data[position], &self.data[parent]) {
                break;
            }
            self.data.swap(parent, position);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let left = 2 * position + 1;
            if left >= self.len {
                break;
            }
            let right = left + 1;
            let child = if right < self.len && Self::less(&self.data[right], &self.data[left]) {
                right
            } else {
                left
            };
            if !Self::less(&self.data[child], &self.data[position]) {
                break;
            }
            self.data.swap(child, position);
            position = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_key_order() {
        let mut heap = BinaryHeap::new();
        for (item, key) in [(0, 5.0f32), (1, 1.0), (2, 3.0), (3, 0.5), (4, 4.0)] {
            heap.push(item, key);
        }
        assert_eq!(heap.peek_key(), Some(0.5));
        let order: Vec<_> = std::iter::from_fn(|| heap.pop()).collect();
        assert_eq!(order, vec![3, 1, 2, 4, 0]);
        assert!(heap.is_empty());
    }

    #[test]
    fn equal_keys_pop_lower_item_first() {
        let mut heap = BinaryHeap::new();
        heap.push(9, 2u32);
        heap.push(3, 2);
        heap.push(5, 2);
        assert_eq!(heap.pop(), Some(3));
        assert_eq!(heap.pop(), Some(5));
        assert_eq!(heap.pop(), Some(9));
    }

    #[test]
    fn cleared_heap_behaves_like_a_new_one() {
        let keys = [7u32, 2, 9, 2, 4, 1];
        let mut fresh = BinaryHeap::new();
        let mut reused = BinaryHeap::new();
        for (i, k) in [100u32, 50, 75].iter().enumerate() {
            reused.push(i as u32 + 10, *k);
        }
        reused.pop();
        reused.clear();

        for (i, k) in keys.iter().enumerate() {
            fresh.push(i as u32, *k);
            reused.push(i as u32, *k);
        }
        let a: Vec<_> = std::iter::from_fn(|| fresh.pop_with_key()).collect();
        let b: Vec<_> = std::iter::from_fn(|| reused.pop_with_key()).collect();
        assert_eq!(a, b);
    }
}
