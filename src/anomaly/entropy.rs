//! Byte-level Shannon entropy for whole regions and fixed-size blocks.

/// Shannon entropy of `data` in bits per byte, 0.0 (one repeated byte) to 8.0 (uniform).
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut freq = [0u32; 256];
    for &b in data {
        freq[b as usize] += 1;
    }

    let total = data.len() as f64;
    freq.iter()
        .filter(|&&f| f > 0)
        .map(|&f| {
            let p = f as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Fixed-size blocks whose entropy exceeds `threshold`: `(offset, size, entropy)`, capped at `max_regions`.
pub fn high_entropy_blocks(
    data: &[u8],
    block_size: usize,
    threshold: f64,
    max_regions: usize,
) -> Vec<(usize, usize, f64)> {
    if block_size == 0 {
        return vec![];
    }

    data.chunks(block_size)
        .enumerate()
        .filter_map(|(i, chunk)| {
            let entropy = shannon_entropy(chunk);
            (entropy > threshold).then_some((i * block_size, chunk.len(), entropy))
        })
        .take(max_regions)
        .collect()
}
