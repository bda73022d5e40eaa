use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{Read, Write};

const MIN_CHUNK: usize = 1024 * 1024;
// Read buffer ceiling; progress chunks larger than this span several reads.
const MAX_BUFFER: usize = 4 * 1024 * 1024;

/// Chunk size for a body of `total` bytes: 0.1% of the file, at least 1 MiB.
pub(crate) fn chunk_size(total: Option<u64>) -> usize {
    match total {
        Some(total) => usize::try_from(total / 1000).unwrap_or(usize::MAX).max(MIN_CHUNK),
        None => MIN_CHUNK,
    }
}

pub(crate) fn progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {bytes} ({bytes_per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    }
}

/// Copies `reader` into `writer` chunk by chunk.
///
/// After every chunk `on_chunk` receives the running byte count. When `total`
/// is known `on_progress` also receives the completed fraction. Returns the
/// number of bytes copied.
pub(crate) fn stream_copy<R, W>(
    reader: &mut R,
    writer: &mut W,
    total: Option<u64>,
    on_chunk: impl FnMut(u64),
    on_progress: impl FnMut(f64),
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    copy_in_chunks(reader, writer, total, chunk_size(total), on_chunk, on_progress)
}

fn copy_in_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    total: Option<u64>,
    chunk: usize,
    mut on_chunk: impl FnMut(u64),
    mut on_progress: impl FnMut(f64),
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let chunk = chunk.max(1);
    let mut buf = vec![0u8; chunk.min(MAX_BUFFER)];
    let mut downloaded: u64 = 0;
    let mut pending: usize = 0;

    let mut report = |downloaded: u64| {
        on_chunk(downloaded);
        if let Some(total) = total.filter(|&t| t > 0) {
            on_progress((downloaded as f64 / total as f64).min(1.0));
        }
    };

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("download interrupted"),
        };

        writer
            .write_all(&buf[..n])
            .context("failed to write downloaded data")?;
        downloaded += n as u64;
        pending += n;

        if pending >= chunk {
            pending = 0;
            report(downloaded);
        }
    }

    if pending > 0 {
        report(downloaded);
    }

    writer.flush()?;
    Ok(downloaded)
}
