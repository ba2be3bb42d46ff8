/// Byte range of the input attributed to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: usize,
    pub start: u64,
    pub len: u64,
}

impl ChunkSpec {
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Split `file_size` bytes into per-worker chunks.
///
/// Every chunk is at least `max_line_len` bytes, so small inputs get fewer
/// chunks than requested. The last chunk absorbs the remainder. Returns
/// `None` for an empty input.
pub fn plan(file_size: u64, worker_count: usize, max_line_len: usize) -> Option<Vec<ChunkSpec>> {
    if file_size == 0 {
        return None;
    }
    let workers = worker_count.max(1) as u64;
    let batch = (file_size / workers).max(max_line_len as u64);
    // Inputs shorter than one line still get a single chunk.
    let actual = (file_size / batch).max(1);

    let mut chunks: Vec<ChunkSpec> = (0..actual)
        .map(|i| ChunkSpec {
            index: i as usize,
            start: i * batch,
            len: batch.min(file_size),
        })
        .collect();
    if let Some(last) = chunks.last_mut() {
        last.len = file_size - last.start;
    }
    Some(chunks)
}
