//! Plain-text dump of a discovery run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use lanscope_common::ResolvedClient;

/// Writes one `ip|hostname|mac|vendor` line per client, replacing `path`.
pub fn write_dump(path: impl AsRef<Path>, clients: &[ResolvedClient]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Unable to create output file {}", path.display()))?;
    let mut out = BufWriter::new(file);

    for client in clients {
        writeln!(out, "{}", client.to_dump_line())?;
    }
    out.flush()
        .with_context(|| format!("Unable to write output file {}", path.display()))?;

    info!("Output written to {}", path.display());
    Ok(())
}
