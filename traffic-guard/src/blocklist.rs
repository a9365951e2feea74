//! Hand-off file for a downstream blocking step.
//!
//! The pipeline never touches a firewall. It only writes the flagged
//! addresses to a one-column CSV (header `ip_address`) that an enforcement
//! tool can consume.

use crate::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Header of the blocklist CSV.
pub const BLOCKLIST_HEADER: &str = "ip_address";

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writes `ips` to `writer` as a one-column CSV.
pub fn write_blocklist_to<W: Write>(writer: &mut W, ips: &[String]) -> Result<()> {
    writeln!(writer, "{BLOCKLIST_HEADER}")?;
    for ip in ips {
        writeln!(writer, "{}", csv_cell(ip))?;
    }
    Ok(())
}

/// Writes `ips` to the file at `path`, replacing any previous contents.
///
/// Returns the number of addresses written.
pub fn write_blocklist(path: impl AsRef<Path>, ips: &[String]) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("cannot create blocklist {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_blocklist_to(&mut writer, ips)
        .and_then(|()| writer.flush().map_err(GuardError::from))
        .with_context(|| format!("cannot write blocklist {}", path.display()))?;

    info!(
        blocklist.path = %path.display(),
        blocklist.count = ips.len(),
        "Wrote blocklist"
    );
    Ok(ips.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_blocklist_format() {
        let mut buffer = Vec::new();
        write_blocklist_to(&mut buffer, &["1.2.3.4".to_string(), "a,b".to_string()]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "ip_address\n1.2.3.4\n\"a,b\"\n");
    }

    #[test]
    fn test_write_blocklist_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blocklist.csv");

        let written = write_blocklist(&path, &["10.0.0.1".to_string()]).unwrap();
        assert_eq!(written, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ip_address\n10.0.0.1\n");

        // an empty list still produces a header
        write_blocklist(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ip_address\n");
    }

    #[test]
    fn test_unwritable_path_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("blocklist.csv");

        let err = write_blocklist(&path, &["10.0.0.1".to_string()]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cannot create blocklist"));
        assert!(message.contains("blocklist.csv"));
    }
}
