//! Reading the tail of the application log.

use std::io::{ErrorKind as IoErrorKind, SeekFrom};
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Bytes read from the end of the file per line requested.
const BYTES_PER_LINE: u64 = 2048;

/// The last `count` lines of `path`, oldest first. A missing file yields no
/// lines.
pub async fn tail(path: &Path, count: usize) -> std::io::Result<Vec<String>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let len = file.metadata().await?.len();
    let window = BYTES_PER_LINE.saturating_mul(count as u64).min(len);
    let start = len - window;
    file.seek(SeekFrom::Start(start)).await?;

    let mut buf = Vec::with_capacity(window as usize);
    file.take(window).read_to_end(&mut buf).await?;
    let text = String::from_utf8_lossy(&buf);

    let mut lines: Vec<&str> = text.lines().collect();
    // The first line is partial unless the window starts at the beginning.
    if start > 0 && !lines.is_empty() {
        lines.remove(0);
    }
    let skip = lines.len().saturating_sub(count);
    Ok(lines[skip..]
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| (*l).to_string())
        .collect())
}
