//! Single-threaded building blocks shared by the scheduler and the
//! benchmark baseline.

/// Sorts `data` in place by insertion. Stable; intended for short slices.
pub fn insertion_sort<T: Ord>(data: &mut [T]) {
    for i in 1..data.len() {
        let mut j = i;
        while j > 0 && data[j - 1] > data[j] {
            data.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Index of the median of the first, middle and last elements.
///
/// # Panics
/// Panics if `data` is empty.
pub fn median_of_three<T: Ord>(data: &[T]) -> usize {
    let (a, b, c) = (0, data.len() / 2, data.len() - 1);
    if data[a] < data[b] {
        if data[b] < data[c] {
            b
        } else if data[a] < data[c] {
            c
        } else {
            a
        }
    } else if data[a] < data[c] {
        a
    } else if data[b] < data[c] {
        c
    } else {
        b
    }
}

/// Partitions `data` around a median-of-three pivot and returns the
/// pivot's final index `p`.
///
/// Afterwards every element of `data[..p]` is `<=` the pivot and every
/// element of `data[p + 1..]` is `>=` it. Both scans stop on elements equal
/// to the pivot, so runs of duplicates split evenly instead of degrading to
/// quadratic time.
pub fn partition<T: Ord>(data: &mut [T]) -> usize {
    if data.len() < 2 {
        return 0;
    }

    let hi = data.len() - 1;
    let median = median_of_three(data);
    data.swap(median, hi);

    let mut i = 0;
    let mut j = hi - 1;
    loop {
        // data[hi] is the pivot, so this scan stops at `hi` at the latest.
        while data[i] < data[hi] {
            i += 1;
        }
        while j > 0 && data[hi] < data[j] {
            j -= 1;
        }
        if i >= j {
            break;
        }
        data.swap(i, j);
        i += 1;
        j -= 1;
    }

    data.swap(i, hi);
    i
}

/// Recursive quicksort with an insertion-sort cutoff.
///
/// Recurses into the smaller side and loops on the larger one, so stack
/// depth stays logarithmic.
pub fn quick_sort_sequential<T: Ord>(mut data: &mut [T], insertion_threshold: usize) {
    let threshold = insertion_threshold.max(1);
    loop {
        if data.len() <= threshold {
            insertion_sort(data);
            return;
        }

        let pivot = partition(data);
        let (left, rest) = std::mem::take(&mut data).split_at_mut(pivot);
        let right = &mut rest[1..];

        if left.len() < right.len() {
            quick_sort_sequential(left, threshold);
            data = right;
        } else {
            quick_sort_sequential(right, threshold);
            data = left;
        }
    }
}

pub fn is_sorted<T: Ord>(data: &[T]) -> bool {
    data.windows(2).all(|pair| pair[0] <= pair[1])
}
