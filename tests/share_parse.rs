// tests/share_parse.rs
use dexwatch::share::parse::parse_entries;
use dexwatch::{ShareError, Trend};

#[test]
fn newest_first_records_come_out_ascending() {
    let body = r#"[
      {"WT":"Date(1700000900000)","Trend":7,"Value":80},
      {"WT":"Date(1700000600000)","Trend":6,"Value":95},
      {"WT":"Date(1700000300000)","Trend":5,"Value":104}
    ]"#;
    let v = parse_entries(body).unwrap();
    let values: Vec<_> = v.iter().map(|e| e.value).collect();
    assert_eq!(values, vec![104, 95, 80]);
    assert!(v.windows(2).all(|w| w[0].time < w[1].time));
    assert_eq!(v[2].trend, Trend::FallingFast);
    assert_eq!(v[0].trend, Trend::FallingSlow);
    assert!(v[0].raw.contains("1700000300000"));
}

#[test]
fn one_bad_timestamp_fails_the_batch() {
    let body = r#"[
      {"WT":"Date(1700000900000)","Trend":4,"Value":80},
      {"WT":"Date(not-a-number)","Trend":4,"Value":95}
    ]"#;
    assert!(matches!(parse_entries(body), Err(ShareError::Format(_))));
}

#[test]
fn missing_field_fails_the_batch() {
    let body = r#"[{"WT":"Date(1700000900000)","Value":80}]"#;
    assert!(matches!(parse_entries(body), Err(ShareError::Format(_))));
}

#[test]
fn repeated_timestamps_collapse() {
    let body = r#"[
      {"WT":"Date(1700000600000)","Trend":4,"Value":95},
      {"WT":"Date(1700000600000)","Trend":4,"Value":95},
      {"WT":"Date(1700000300000)","Trend":4,"Value":104}
    ]"#;
    let v = parse_entries(body).unwrap();
    assert_eq!(v.len(), 2);
    assert!(v[0].time < v[1].time);
}

#[test]
fn string_trend_names_are_understood() {
    let body = r#"[{"WT":"Date(1700000600000-0500)","Trend":"DoubleUp","Value":240}]"#;
    let v = parse_entries(body).unwrap();
    assert_eq!(v[0].trend, Trend::RisingFast);
    assert_eq!(v[0].time.timestamp_millis(), 1_700_000_600_000);
}

#[test]
fn unparsable_body_is_not_echoed_into_the_error() {
    let record = r#"{"WT":"Date(1700000600000)","Trend":4,"Value":95},"#;
    let body = format!("[{}", record.repeat(500));
    let Err(ShareError::Format(msg)) = parse_entries(&body) else {
        panic!("expected a format error");
    };
    assert!(msg.contains(&body.len().to_string()), "{msg}");
    assert!(!msg.contains("1700000600000"), "{msg}");
    assert!(msg.len() < 200, "{msg}");
}
