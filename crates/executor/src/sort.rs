//! ORDER BY support: the row comparator and a top-K selection heap.

use common::Row;
use std::cmp::Ordering;
use types::Value;

/// One ORDER BY key, resolved to a column ordinal.
#[derive(Clone, Copy, Debug)]
pub struct SortKey {
    pub ordinal: usize,
    pub descending: bool,
}

/// Compare two rows over the sort keys; later keys break ties.
pub fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = a.values.get(key.ordinal).unwrap_or(&Value::Null);
        let right = b.values.get(key.ordinal).unwrap_or(&Value::Null);

        let mut ordering = left.compare(right);
        if key.descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Select the first `k` rows of the sort order in O(N log K): a max-heap of
/// the best `k` seen so far, each incoming row either displacing the
/// current worst or being dropped. Every row is visited exactly once.
pub fn top_k(rows: Vec<Row>, k: usize, keys: &[SortKey]) -> Vec<Row> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: Vec<Row> = Vec::with_capacity(k);
    for row in rows {
        if heap.len() < k {
            heap.push(row);
            let last = heap.len() - 1;
            sift_up(&mut heap, last, keys);
        } else if compare_rows(&row, &heap[0], keys) == Ordering::Less {
            heap[0] = row;
            sift_down(&mut heap, 0, keys);
        }
    }

    heap.sort_by(|a, b| compare_rows(a, b, keys));
    heap
}

fn sift_up(heap: &mut [Row], mut idx: usize, keys: &[SortKey]) {
    while idx > 0 {
        let parent = (idx - 1) / 2;
        if compare_rows(&heap[idx], &heap[parent], keys) == Ordering::Greater {
            heap.swap(idx, parent);
            idx = parent;
        } else {
            break;
        }
    }
}

fn sift_down(heap: &mut [Row], mut idx: usize, keys: &[SortKey]) {
    loop {
        let left = 2 * idx + 1;
        let right = 2 * idx + 2;
        let mut largest = idx;

        if left < heap.len() && compare_rows(&heap[left], &heap[largest], keys) == Ordering::Greater
        {
            largest = left;
        }
        if right < heap.len()
            && compare_rows(&heap[right], &heap[largest], keys) == Ordering::Greater
        {
            largest = right;
        }
        if largest == idx {
            return;
        }
        heap.swap(idx, largest);
        idx = largest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(v: i64) -> Row {
        Row::new(v as u64, vec![Value::Integer(v)])
    }

    fn asc() -> Vec<SortKey> {
        vec![SortKey {
            ordinal: 0,
            descending: false,
        }]
    }

    fn desc() -> Vec<SortKey> {
        vec![SortKey {
            ordinal: 0,
            descending: true,
        }]
    }

    #[test]
    fn comparator_orders_and_reverses() {
        assert_eq!(compare_rows(&row(1), &row(2), &asc()), Ordering::Less);
        assert_eq!(compare_rows(&row(1), &row(2), &desc()), Ordering::Greater);
        assert_eq!(compare_rows(&row(2), &row(2), &asc()), Ordering::Equal);
    }

    #[test]
    fn later_keys_break_ties() {
        let keys = vec![
            SortKey {
                ordinal: 0,
                descending: false,
            },
            SortKey {
                ordinal: 1,
                descending: true,
            },
        ];
        let a = Row::new(1, vec![Value::Integer(1), Value::Integer(10)]);
        let b = Row::new(2, vec![Value::Integer(1), Value::Integer(20)]);
        assert_eq!(compare_rows(&a, &b, &keys), Ordering::Greater);
    }

    #[test]
    fn null_sorts_before_values() {
        let keys = asc();
        let null_row = Row::new(1, vec![Value::Null]);
        assert_eq!(
            compare_rows(&null_row, &row(i64::MIN), &keys),
            Ordering::Less
        );
    }

    #[test]
    fn top_k_matches_full_sort() {
        // Deterministic shuffle of 0..1000.
        let rows: Vec<Row> = (0..1000).map(|i| row((i * 7919) % 1000)).collect();

        let keys = desc();
        let got = top_k(rows.clone(), 10, &keys);

        let mut all = rows;
        all.sort_by(|a, b| compare_rows(a, b, &keys));
        all.truncate(10);

        let got_vals: Vec<&Value> = got.iter().map(|r| &r.values[0]).collect();
        let want_vals: Vec<&Value> = all.iter().map(|r| &r.values[0]).collect();
        assert_eq!(got_vals, want_vals);
        assert_eq!(got[0].values[0], Value::Integer(999));
    }

    #[test]
    fn top_k_with_k_larger_than_input() {
        let rows = vec![row(3), row(1), row(2)];
        let got = top_k(rows, 10, &asc());
        let vals: Vec<&Value> = got.iter().map(|r| &r.values[0]).collect();
        assert_eq!(
            vals,
            vec![&Value::Integer(1), &Value::Integer(2), &Value::Integer(3)]
        );
    }

    #[test]
    fn top_k_zero_is_empty() {
        assert!(top_k(vec![row(1)], 0, &asc()).is_empty());
    }
}
