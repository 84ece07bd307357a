use std::net::{IpAddr, Ipv4Addr};

use port_sweep::output::{render_results, save_results, write_csv_file, write_json_file};
use port_sweep::{OpenPort, OutputError, ScanReport};

fn report(open: Vec<OpenPort>) -> ScanReport {
    ScanReport {
        host: "localhost".into(),
        address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        start_port: 1,
        end_port: 1024,
        open,
        scanned: 1024,
        total: 1024,
        errors: 0,
        workers: 100,
        cancelled: false,
        started_at: "2026-01-01T00:00:00Z".into(),
        finished_at: "2026-01-01T00:00:05Z".into(),
    }
}

#[test]
fn csv_has_header_and_one_row_per_open_port() {
    let dir = tempfile::tempdir().unwrap();
    let r = report(vec![OpenPort::new(22, "ssh"), OpenPort::new(80, "http")]);
    let path = save_results(dir.path(), &r).unwrap().expect("file written");

    assert_eq!(path, dir.path().join("scan_results_localhost.csv"));
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "Port,Service\n22,ssh\n80,http\n");
}

#[test]
fn no_file_when_nothing_is_open() {
    let dir = tempfile::tempdir().unwrap();
    assert!(save_results(dir.path(), &report(vec![])).unwrap().is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn unwritable_location_is_an_output_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.csv");
    let err = write_csv_file(&path, &[OpenPort::new(1, "tcpmux")]).unwrap_err();
    assert!(matches!(err, OutputError::Csv { .. }));
}

#[test]
fn json_report_round_trips_open_ports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let r = report(vec![OpenPort::new(443, "https")]);
    write_json_file(&path, &r).unwrap();

    let back: ScanReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back.open, r.open);
    assert_eq!(back.host, "localhost");
}

#[test]
fn console_rendering() {
    let r = report(vec![OpenPort::new(22, "ssh")]);
    assert_eq!(render_results(&r), "Open ports on localhost:\nPort 22: ssh");
    assert_eq!(
        render_results(&report(vec![])),
        "No open ports found on localhost in the specified range."
    );
}
