//! Noise figure capture against a mock link and a fake SCPI socket.

use std::collections::HashMap;

use bench_daq::config::{BenchConfig, NoiseFigureConfig};
use bench_daq::export::CsvTable;
use bench_daq::hardware::MockTransport;
use bench_daq::instruments::NoiseMeasurement;
use bench_daq::procedures::{self, run_noise_capture};
use bench_daq::BenchError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn nfa_config(resource: &str) -> BenchConfig {
    let text = format!(
        r#"
        [noise_figure]
        title = "Diramics_2F200_T50_8mA"
        measurement = "TEFF"

        [noise_figure.instrument]
        transport = "tcp"
        resource = "{}"
        timeout_ms = 2000
        "#,
        resource
    );
    BenchConfig::from_toml_str(&text).unwrap()
}

fn scripted_nfa(measurement: &str) -> MockTransport {
    MockTransport::new()
        .with_reply("*IDN?", "Agilent Technologies,N8975A,MY1234,A.05.02")
        .with_reply("SENS:FREQ:STAR?", "+1.00000000E+009")
        .with_reply("SENS:FREQ:STOP?", "+2.00000000E+009")
        .with_reply("SENS:SWE:POIN?", "+3")
        .with_reply(measurement, "+1.2E+00,+1.1E+00,+1.3E+00")
}

/// Answer queries from `replies` until the client hangs up; returns every
/// line received.
async fn fake_instrument(
    replies: HashMap<&'static str, &'static str>,
) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(reply) = replies.get(line.as_str()) {
                write.write_all(format!("{}\n", reply).as_bytes()).await.unwrap();
            }
            received.push(line);
        }
        received
    });
    (address, handle)
}

#[tokio::test]
async fn test_capture_writes_frequency_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = nfa_config("127.0.0.1:5025");
    let nfa: &NoiseFigureConfig = config.noise_figure().unwrap();
    let mock = scripted_nfa("FETC:CORR:TEFF?");

    let report = run_noise_capture(nfa, dir.path(), Box::new(mock.clone()))
        .await
        .unwrap();

    assert!(report.identity.contains("N8975A"));
    assert!(mock.is_closed());
    assert_eq!(report.path, dir.path().join("Diramics_2F200_T50_8mA.csv"));

    let table = CsvTable::read(&report.path).unwrap();
    assert_eq!(table.axis_label, "Frequency (Hz)");
    assert_eq!(table.labels, vec!["TEFF"]);
    assert_eq!(table.axis, vec![1.0e9, 1.5e9, 2.0e9]);
    assert_eq!(table.columns, vec![vec![1.2, 1.1, 1.3]]);
}

#[tokio::test]
async fn test_uncorrected_noise_figure() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = nfa_config("127.0.0.1:5025");
    if let Some(nfa) = config.noise_figure.as_mut() {
        nfa.measurement = NoiseMeasurement::NoiseFigure;
        nfa.corrected = false;
    }
    let mock = scripted_nfa("FETC:UNC:NFIG?");

    let report = run_noise_capture(config.noise_figure().unwrap(), dir.path(), Box::new(mock.clone()))
        .await
        .unwrap();

    assert_eq!(mock.commands().last().map(String::as_str), Some("FETC:UNC:NFIG?"));
    assert_eq!(CsvTable::read(&report.path).unwrap().labels, vec!["NFIG"]);
}

#[tokio::test]
async fn test_point_count_mismatch_still_closes() {
    let dir = tempfile::tempdir().unwrap();
    let config = nfa_config("127.0.0.1:5025");
    let mock = MockTransport::new()
        .with_reply("*IDN?", "N8975A")
        .with_reply("SENS:FREQ:STAR?", "1e9")
        .with_reply("SENS:FREQ:STOP?", "2e9")
        .with_reply("SENS:SWE:POIN?", "4")
        .with_reply("FETC:CORR:TEFF?", "1.0,2.0,3.0");

    let result = run_noise_capture(config.noise_figure().unwrap(), dir.path(), Box::new(mock.clone())).await;

    assert!(matches!(
        result,
        Err(BenchError::ShapeMismatch {
            expected: 4,
            found: 3
        })
    ));
    assert!(mock.is_closed());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_capture_over_tcp_socket() {
    let replies = HashMap::from([
        ("*IDN?", "Agilent Technologies,N8975A,MY1234,A.05.02"),
        ("SENS:FREQ:STAR?", "+1.00000000E+009"),
        ("SENS:FREQ:STOP?", "+3.00000000E+009"),
        ("SENS:SWE:POIN?", "+3"),
        ("FETC:CORR:TEFF?", "+2.9011E+02,+2.8803E+02,+2.7999E+02"),
    ]);
    let (address, instrument) = fake_instrument(replies).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = nfa_config(&address);
    config.application.output_dir = dir.path().to_path_buf();

    let report = procedures::noise_figure(&config).await.unwrap();

    assert_eq!(report.trace.values, vec![290.11, 288.03, 279.99]);
    let received = instrument.await.unwrap();
    assert_eq!(
        received,
        vec![
            "*IDN?",
            "SENS:FREQ:STAR?",
            "SENS:FREQ:STOP?",
            "SENS:SWE:POIN?",
            "FETC:CORR:TEFF?"
        ]
    );
}

#[tokio::test]
async fn test_silent_instrument_times_out() {
    let (address, _instrument) = fake_instrument(HashMap::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = nfa_config(&address);
    config.application.output_dir = dir.path().to_path_buf();
    if let Some(nfa) = config.noise_figure.as_mut() {
        nfa.instrument.timeout_ms = 100;
    }

    let err = procedures::noise_figure(&config).await.unwrap_err();
    assert!(matches!(err, BenchError::Timeout { .. }), "{}", err);
}
