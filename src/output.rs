use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::error::OutputError;
use crate::types::{OpenPort, ScanReport};

/// Result file name for a host: `scan_results_<host>.csv`.
///
/// Characters that are unsafe in file names (IPv6 colons, path separators)
/// are replaced with `_`.
pub fn results_file_name(host: &str) -> String {
    let safe: String = host
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("scan_results_{safe}.csv")
}

/// Write the two-column `Port,Service` table.
pub fn write_csv_file(path: &Path, open: &[OpenPort]) -> Result<(), OutputError> {
    let csv_err = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record(["Port", "Service"]).map_err(csv_err)?;
    for e in open {
        wtr.write_record([e.port.to_string().as_str(), e.service.as_str()])
            .map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Persist the open ports of `report` under `dir`.
///
/// Nothing is written when no port was open; the path is returned otherwise.
pub fn save_results(dir: &Path, report: &ScanReport) -> Result<Option<PathBuf>, OutputError> {
    if report.open.is_empty() {
        return Ok(None);
    }
    let path = dir.join(results_file_name(&report.host));
    write_csv_file(&path, &report.open)?;
    tracing::info!("Saved {} open ports to {}", report.open.len(), path.display());
    Ok(Some(path))
}

/// Write the full report as pretty JSON.
pub fn write_json_file(path: &Path, report: &ScanReport) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, report).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    w.flush().map_err(io_err)?;
    Ok(())
}

/// Console listing of a finished scan.
pub fn render_results(report: &ScanReport) -> String {
    if report.open.is_empty() {
        return format!(
            "No open ports found on {} in the specified range.",
            report.host
        );
    }
    let mut out = format!("Open ports on {}:", report.host);
    for e in &report.open {
        out.push_str(&format!("\nPort {}: {}", e.port, e.service));
    }
    out
}
