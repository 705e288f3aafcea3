//! Property-based tests for rust_severity_logger using proptest

use proptest::prelude::*;
use rust_severity_logger::prelude::*;
use rust_severity_logger::{format_kvs, ThresholdConfig};
use std::collections::HashMap;
use std::sync::Arc;

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error),
        Just(Severity::Fatal),
    ]
}

/// Pairs over a small key alphabet so duplicates are common
fn pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-d]", "[0-2]"), 0..12)
}

fn to_values(pairs: &[(String, String)]) -> Vec<Value> {
    pairs
        .iter()
        .flat_map(|(k, v)| [Value::from(k.clone()), Value::from(v.clone())])
        .collect()
}

/// Split ` k="v" k="v"` back into pairs
fn parse(output: &str) -> Vec<(String, String)> {
    output
        .split(' ')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').expect("key=value");
            (key.to_string(), value.trim_matches('"').to_string())
        })
        .collect()
}

fn render(pairs: &[(String, String)]) -> Vec<(String, String)> {
    let mut buf = Vec::new();
    format_kvs(&mut buf, &[&to_values(pairs)]);
    parse(&String::from_utf8(buf).unwrap())
}

proptest! {
    /// Every key appears once, with the value last assigned to it
    #[test]
    fn test_last_value_wins(input in pairs()) {
        let output = render(&input);

        let mut expected: HashMap<&str, &str> = HashMap::new();
        for (k, v) in &input {
            expected.insert(k, v);
        }

        prop_assert_eq!(output.len(), expected.len());
        for (k, v) in &output {
            prop_assert_eq!(expected.get(k.as_str()).copied(), Some(v.as_str()));
        }
    }

    /// Repeating an unchanged pair keeps its first position
    #[test]
    fn test_unchanged_repeat_keeps_position(input in pairs(), index in any::<prop::sample::Index>()) {
        prop_assume!(!input.is_empty());
        let output = render(&input);
        let repeated = output[index.index(output.len())].clone();

        let mut extended = input.clone();
        extended.push(repeated);

        prop_assert_eq!(render(&extended), output);
    }

    /// Splitting pairs across several lists is one logical append
    #[test]
    fn test_lists_concatenate(first in pairs(), second in pairs()) {
        let mut buf = Vec::new();
        format_kvs(&mut buf, &[&to_values(&first), &to_values(&second)]);
        let split = parse(&String::from_utf8(buf).unwrap());

        let mut joined = first.clone();
        joined.extend(second);
        prop_assert_eq!(split, render(&joined));
    }

    /// A record at S reaches exactly the files of severities up to S
    #[test]
    fn test_cascading_writes(record in severity(), stderr_threshold in severity()) {
        let logging = Logging::new();
        logging.set_thresholds(ThresholdConfig {
            to_stderr: false,
            stderr_threshold,
            ..ThresholdConfig::default()
        });
        logging.set_stderr(Arc::new(MemoryAppender::new()));
        logging.set_exit_hook(Arc::new(|| {}));
        let files: [MemoryAppender; Severity::COUNT] = Default::default();
        for s in Severity::ALL {
            logging.set_output_by_severity(s.name(), Arc::new(files[s.index()].clone())).unwrap();
        }

        logging.print(record, format_args!("property"));

        for s in Severity::ALL {
            prop_assert_eq!(files[s.index()].is_empty(), s > record);
        }
    }

    /// Severity names and numbers parse back to the same severity
    #[test]
    fn test_severity_parse(s in severity(), lowercase in any::<bool>()) {
        let name = if lowercase { s.name().to_lowercase() } else { s.name().to_string() };
        prop_assert_eq!(name.parse::<Severity>().unwrap(), s);
        prop_assert_eq!(s.index().to_string().parse::<Severity>().unwrap(), s);
    }
}
