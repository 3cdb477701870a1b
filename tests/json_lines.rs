//! Structured-record consumers own their serialization; the writer only
//! ever handles opaque text lines. This test shows the intended pattern:
//! a tagged enum serialized to one JSON object per line.

use linelog::MultiFileWriter;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JobEvent {
    Started { job: String },
    Progress { job: String, percent: u8 },
    Finished { job: String, ok: bool },
}

#[tokio::test]
async fn test_json_lines_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let registry = MultiFileWriter::new();

    let events = vec![
        JobEvent::Started { job: "ingest".into() },
        JobEvent::Progress { job: "ingest".into(), percent: 40 },
        JobEvent::Progress { job: "ingest".into(), percent: 90 },
        JobEvent::Finished { job: "ingest".into(), ok: true },
    ];

    let writer = registry.create(&path).await.unwrap();
    for event in &events {
        let line = serde_json::to_string(event).unwrap();
        writer.write_line(&line).unwrap();
    }
    writer.dispose().await.unwrap();

    let decoded: Vec<JobEvent> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(decoded, events, "each line should decode back to the original event");
}
