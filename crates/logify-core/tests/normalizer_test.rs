use logify_core::{CanonicalLogRecord, LogLevel, Normalizer, EMPTY_MESSAGE, UNKNOWN_SERVICE};
use serde_json::json;
use std::io::Cursor;

// ============ ACCESS LOG TESTS ============

#[test]
fn test_nginx_access_log() {
    let normalizer = Normalizer::new();

    let raw = r#"192.168.1.50 - alice [10/Feb/2026:14:30:45 +0000] "GET /api/users/123 HTTP/1.1" 500 1234 "-" "Mozilla/5.0""#;
    let record = normalizer.normalize(raw);

    assert_eq!(record.service, "nginx");
    assert_eq!(record.level, LogLevel::Error);
    assert_eq!(record.message, "GET /api/users/123 HTTP/1.1 - Status 500");
    assert_eq!(record.timestamp, "2026-02-10T14:30:45.000Z");
    assert_eq!(record.metadata.get("ip"), Some(&json!("192.168.1.50")));
    assert_eq!(record.metadata.get("user"), Some(&json!("alice")));
    assert_eq!(record.metadata.get("status"), Some(&json!(500)));
    assert_eq!(record.metadata.get("bytes"), Some(&json!(1234)));
    assert_eq!(record.metadata.get("referer"), Some(&json!("-")));
    assert_eq!(record.metadata.get("userAgent"), Some(&json!("Mozilla/5.0")));
}

#[test]
fn test_apache_access_log() {
    let normalizer = Normalizer::new();

    let raw = r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 404 -"#;
    let record = normalizer.normalize(raw);

    assert_eq!(record.service, "apache");
    assert_eq!(record.level, LogLevel::Warn);
    assert_eq!(record.message, "GET /apache_pb.gif HTTP/1.0 - Status 404");
    assert_eq!(record.timestamp, "2000-10-10T20:55:36.000Z");
    assert_eq!(record.metadata.get("bytes"), Some(&json!(0)));
    assert!(record.metadata.get("userAgent").is_none());
}

// ============ SYSLOG TESTS ============

#[test]
fn test_syslog_line() {
    let normalizer = Normalizer::new();

    let raw = "Feb 10 14:30:45 server-01 sshd[12345]: Failed password for invalid user admin";
    let record = normalizer.normalize(raw);

    assert_eq!(record.service, "server-01");
    // no priority, so the keyword "Failed" does not leak into the level
    assert_eq!(record.level, LogLevel::Info);
    assert_eq!(record.message, "Failed password for invalid user admin");
    assert_eq!(record.metadata.get("process"), Some(&json!("sshd")));
    assert_eq!(record.metadata.get("pid"), Some(&json!(12345)));
    assert!(record.timestamp.ends_with("-02-10T14:30:45.000Z"));
}

#[test]
fn test_syslog_with_priority_and_no_pid() {
    let normalizer = Normalizer::new();

    let record = normalizer.normalize("<12>Oct 11 22:14:15 mymachine su: 'su root' failed for lonvick");

    assert_eq!(record.level, LogLevel::Warn);
    assert_eq!(record.service, "mymachine");
    assert!(record.metadata.get("pid").is_none());
    assert_eq!(record.metadata.get("priority"), Some(&json!(12)));
    assert_eq!(record.metadata.get("facility"), Some(&json!(1)));
}

// ============ LEVELED LINE TESTS ============

#[test]
fn test_log4j_line() {
    let normalizer = Normalizer::new();

    let record =
        normalizer.normalize("2024-02-08 10:30:00,123 WARNING [pool-1-thread-3] Retrying job 42");

    assert_eq!(record.level, LogLevel::Warn);
    assert_eq!(record.message, "Retrying job 42");
    assert_eq!(record.service, UNKNOWN_SERVICE);
    assert_eq!(record.timestamp, "2024-02-08T10:30:00.123Z");
    assert_eq!(record.metadata.get("context"), Some(&json!("pool-1-thread-3")));
}

#[test]
fn test_level_prefix_line() {
    let normalizer = Normalizer::new();

    let record = normalizer.normalize("debug: cache warmed in 12ms");
    assert_eq!(record.level, LogLevel::Debug);
    assert_eq!(record.message, "cache warmed in 12ms");
}

#[test]
fn test_json_like_fragment_when_not_valid_json() {
    let normalizer = Normalizer::new();

    // trailing comma makes this invalid JSON
    let record = normalizer.normalize(r#"{"level": "fatal", "message": "db gone",}"#);
    assert_eq!(record.level, LogLevel::Error);
    assert_eq!(record.message, "db gone");
}

// ============ STRUCTURED INPUT TESTS ============

#[test]
fn test_structured_json_line() {
    let normalizer = Normalizer::new();

    let raw = r#"{"level":"TRACE","message":"cache hit","service":"api","timestamp":"2026-02-10T03:00:05Z","metadata":{"key":"u:1"}}"#;
    let record = normalizer.normalize(raw);

    assert_eq!(record.level, LogLevel::Debug);
    assert_eq!(record.message, "cache hit");
    assert_eq!(record.service, "api");
    assert_eq!(record.timestamp, "2026-02-10T03:00:05Z");
    assert_eq!(record.metadata.get("key"), Some(&json!("u:1")));
}

#[test]
fn test_structured_unknown_level_defaults_to_info() {
    let normalizer = Normalizer::new();

    let record = normalizer.normalize(r#"{"level":"notice","message":"rotated"}"#);
    assert_eq!(record.level, LogLevel::Info);
}

#[test]
fn test_normalize_value() {
    let normalizer = Normalizer::new();

    let record = normalizer.normalize_value(&json!({"level": "err", "message": "x", "service": "db"}));
    assert_eq!(record.level, LogLevel::Error);
    assert_eq!(record.service, "db");

    let record = normalizer.normalize_value(&json!("WARN - low disk"));
    assert_eq!(record.level, LogLevel::Warn);
    assert_eq!(record.message, "low disk");
}

#[test]
fn test_renormalizing_a_canonical_record_is_identity() {
    let normalizer = Normalizer::new();

    let lines = [
        r#"192.168.1.1 - - [08/Feb/2024:10:30:00 +0000] "GET /api/users HTTP/1.1" 200 1234"#,
        "Feb 10 14:30:45 server-01 sshd[12345]: Accepted publickey",
        "Something went wrong during fail-over",
        "",
    ];

    for line in lines {
        let first = normalizer.normalize(line);
        let json_text = serde_json::to_string(&first).unwrap();
        let second = normalizer.normalize(&json_text);
        assert_eq!(first, second, "line: {line:?}");

        let value = serde_json::to_value(&first).unwrap();
        assert_eq!(normalizer.normalize_value(&value), first);
    }
}

// ============ FALLBACK TESTS ============

#[test]
fn test_heuristic_fallback() {
    let normalizer = Normalizer::new();

    let record = normalizer.normalize("Something went wrong during fail-over");

    assert_eq!(record.level, LogLevel::Error);
    assert_eq!(record.message, "Something went wrong during fail-over");
    assert_eq!(record.service, UNKNOWN_SERVICE);
    assert!(record.metadata.is_empty());
}

#[test]
fn test_fallback_trims_whole_line() {
    let normalizer = Normalizer::new();

    let record = normalizer.normalize("   user logged in   ");
    assert_eq!(record.level, LogLevel::Info);
    assert_eq!(record.message, "user logged in");
}

#[test]
fn test_every_input_yields_a_complete_record() {
    let normalizer = Normalizer::new();
    let long_line = "x".repeat(100_000);

    let inputs: Vec<&str> = vec!["", "   ", "\t\n", "{}", "null", "[1,2]", "\u{0}\u{1}\u{7f}", &long_line];

    for input in inputs {
        let record = normalizer.normalize(input);
        assert!(!record.message.is_empty(), "input: {input:?}");
        assert!(!record.service.is_empty());
        assert!(!record.timestamp.is_empty());
    }

    let record = normalizer.normalize("   ");
    assert_eq!(record.message, EMPTY_MESSAGE);
}

#[test]
fn test_invalid_utf8_bytes() {
    let normalizer = Normalizer::new();

    let record = normalizer.normalize_bytes(&[0xff, 0xfe, b'w', b'a', b'r', b'n']);
    assert_eq!(record.level, LogLevel::Warn);
    assert!(record.message.ends_with("warn"));
}

// ============ BATCH / STREAM TESTS ============

#[test]
fn test_batch_preserves_order() {
    let normalizer = Normalizer::new();

    let lines = vec!["ERROR: one", "info: two", "three debug"];
    let records = normalizer.normalize_batch(&lines);

    let messages: Vec<&str> = records.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["one", "two", "three debug"]);
    let levels: Vec<LogLevel> = records.iter().map(|r| r.level).collect();
    assert_eq!(levels, vec![LogLevel::Error, LogLevel::Info, LogLevel::Debug]);
}

#[test]
fn test_reader_yields_one_record_per_line() {
    let normalizer = Normalizer::new();

    let input = Cursor::new("warn: a\r\nerror: b\n\nc\n");
    let records: Vec<CanonicalLogRecord> = normalizer
        .normalize_reader(input)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(records[0].message, "a");
    assert_eq!(records[1].level, LogLevel::Error);
    assert_eq!(records[2].message, EMPTY_MESSAGE);
    assert_eq!(records[3].message, "c");
}

#[test]
fn test_stream_preserves_order() {
    use futures::StreamExt;

    let normalizer = Normalizer::new();
    let chunks = futures::stream::iter(vec!["warn: first".to_string(), "error: second".to_string()]);

    let records: Vec<CanonicalLogRecord> =
        futures::executor::block_on(normalizer.normalize_stream(chunks).collect());

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message, "first");
    assert_eq!(records[1].level, LogLevel::Error);
}
