/// Deals `items` round-robin into `n` shards: shard `i` gets items
/// `i, i + n, i + 2n, ...` in their original order. `n` is at least 1.
pub fn partition_interleaved<T>(items: Vec<T>, n: usize) -> Vec<Vec<T>> {
    let n = n.max(1);
    let mut shards: Vec<Vec<T>> = (0..n)
        .map(|_| Vec::with_capacity(items.len() / n + 1))
        .collect();
    for (i, item) in items.into_iter().enumerate() {
        shards[i % n].push(item);
    }
    shards
}
