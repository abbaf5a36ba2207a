//! Result table writer.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{Error, Result, ResultRow};

/// Write `rows` as a comma separated table to `path`, one `key,value` line per row and no header.
///
/// The table is first written to a temporary file next to `path`, then persisted over any existing file once complete.
/// A failure thus never leaves a truncated table behind.
pub fn write_table(rows: &[ResultRow], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let io_err = |source: io::Error| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;

    let mut writer = BufWriter::new(file.as_file_mut());
    for row in rows {
        writeln!(writer, "{},{}", row.key, row.value).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    drop(writer);

    file.as_file().sync_all().map_err(io_err)?;
    file.persist(path).map_err(|e| io_err(e.error))?;

    tracing::debug!("Wrote {} rows to `{}`", rows.len(), path.display());

    Ok(())
}
