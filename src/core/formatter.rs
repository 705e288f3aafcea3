//! Key/value serialization with last-one-wins de-duplication
//!
//! All pairs are formatted optimistically into the output buffer. When a key
//! repeats, either the new span (identical rendering) or the old span
//! (changed value) is recorded as obsolete, and the obsolete spans are cut
//! out in one compaction pass at the end. Without duplicates the only
//! overhead is the list of recorded key spans.

use super::value::{ErrorValue, Value};
use std::any::Any;
use std::io::Write;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Replacement for the JSON fallback encoding
pub type AnyToStringHook = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Serializer for key/value lists.
#[derive(Clone, Default)]
pub struct KvFormatter {
    any_to_string: Option<AnyToStringHook>,
}

struct Entry {
    key: Range<usize>,
    span: Range<usize>,
}

impl KvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render values without a dedicated representation through `hook`
    /// instead of JSON.
    #[must_use]
    pub fn with_any_to_string(mut self, hook: AnyToStringHook) -> Self {
        self.any_to_string = Some(hook);
        self
    }

    /// Append all pairs of all lists to `buf` such that every key appears once.
    ///
    /// Later lists override earlier ones. A repeated key with an identical
    /// rendering keeps the position of its first occurrence; a changed value
    /// moves the key to its last occurrence.
    pub fn format_kvs(&self, buf: &mut Vec<u8>, lists: &[&[Value]]) {
        let missing = Value::missing();
        let mut existing: Vec<Entry> = Vec::new();
        // Sorted by start offset.
        let mut obsolete: Vec<Range<usize>> = Vec::new();

        for list in lists {
            for pair in list.chunks(2) {
                let value = pair.get(1).unwrap_or(&missing);
                let start = buf.len();
                let key = self.kv_format(buf, &pair[0], value);
                let span = start..buf.len();

                let previous = existing
                    .iter()
                    .position(|entry| buf[entry.key.clone()] == buf[key.clone()]);
                match previous {
                    Some(i) => {
                        let old = &mut existing[i];
                        if buf[old.span.clone()] == buf[span.clone()] {
                            // Starts after every recorded span, so pushing keeps the order.
                            obsolete.push(span);
                        } else {
                            let index = obsolete.partition_point(|r| r.start < old.span.start);
                            obsolete.insert(index, old.span.clone());
                            old.key = key;
                            old.span = span;
                        }
                    }
                    None => existing.push(Entry { key, span }),
                }
            }
        }

        compact(buf, &obsolete);
    }

    /// Format one ` key=value` pair and return the byte range of the key.
    pub fn kv_format(&self, buf: &mut Vec<u8>, key: &Value, value: &Value) -> Range<usize> {
        buf.push(b' ');
        let key_start = buf.len();
        write_key(buf, key);
        let key_range = key_start..buf.len();

        match value {
            Value::Text(text) => write_text_value(buf, text.as_ref()),
            Value::Display(display) => {
                let s = guarded(|| display.to_string());
                write_string_value(buf, &s);
            }
            Value::Str(s) => write_string_value(buf, s),
            Value::Error(err) => {
                let key_text = buf[key_range.clone()].to_vec();
                self.write_error_value(buf, &key_text, err);
            }
            Value::Marshal(marshal) => {
                let marshalled = catch_unwind(AssertUnwindSafe(|| marshal.marshal_log()))
                    .unwrap_or_else(|payload| Value::from(panic_placeholder(payload)));
                // Called once only: a marshaler returning another marshaler
                // is not invoked again.
                match marshalled {
                    Value::Str(s) => write_string_value(buf, &s),
                    other => self.format_any(buf, &other),
                }
            }
            Value::Bytes(bytes) => {
                buf.extend_from_slice(b"=\"");
                buf.extend(bytes.escape_ascii());
                buf.push(b'"');
            }
            other => self.format_any(buf, other),
        }
        key_range
    }

    fn write_error_value(&self, buf: &mut Vec<u8>, key: &[u8], err: &ErrorValue) {
        let message = guarded(|| err.error.to_string());
        write_string_value(buf, &message);
        if err.details.is_some() {
            let details = catch_unwind(AssertUnwindSafe(|| err.details()))
                .unwrap_or_else(|payload| {
                    Some(serde_json::Value::String(panic_placeholder(payload)))
                });
            if let Some(details) = details {
                buf.push(b' ');
                buf.extend_from_slice(key);
                buf.extend_from_slice(b"Details");
                self.format_any(buf, &Value::Json(details));
            }
        }
    }

    /// Fallback for values without a dedicated text form: the hook if set,
    /// JSON otherwise.
    fn format_any(&self, buf: &mut Vec<u8>, value: &Value) {
        buf.push(b'=');
        if let Some(hook) = &self.any_to_string {
            let s = guarded(|| hook(value));
            buf.extend_from_slice(s.as_bytes());
            return;
        }
        let start = buf.len();
        if let Err(err) = encode_json(buf, value) {
            buf.truncate(start);
            let _ = write!(buf, "\"<internal error: {}>\"", err);
        }
    }
}

/// Append the formatted pairs of `lists` to `buf` with a default formatter
pub fn format_kvs(buf: &mut Vec<u8>, lists: &[&[Value]]) {
    KvFormatter::default().format_kvs(buf, lists);
}

/// Cut the obsolete (sorted, non-overlapping) ranges out of `buf`.
fn compact(buf: &mut Vec<u8>, obsolete: &[Range<usize>]) {
    let Some(first) = obsolete.first() else {
        return;
    };
    let mut write = first.start;
    let mut from = first.end;
    for range in &obsolete[1..] {
        if from < range.start {
            buf.copy_within(from..range.start, write);
            write += range.start - from;
        }
        from = range.end;
    }
    let end = buf.len();
    buf.copy_within(from..end, write);
    write += end - from;
    buf.truncate(write);
}

fn write_key(buf: &mut Vec<u8>, key: &Value) {
    match key {
        Value::Str(s) => buf.extend_from_slice(s.as_bytes()),
        Value::Display(display) => {
            let s = guarded(|| display.to_string());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Int(i) => {
            let _ = write!(buf, "{}", i);
        }
        Value::UInt(u) => {
            let _ = write!(buf, "{}", u);
        }
        Value::Bool(b) => {
            let _ = write!(buf, "{}", b);
        }
        other => {
            let _ = write!(buf, "{:?}", other);
        }
    }
}

fn write_text_value(buf: &mut Vec<u8>, text: &dyn super::value::WriteText) {
    buf.push(b'=');
    let start = buf.len();
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| text.write_text(buf))) {
        buf.truncate(start);
        let _ = write!(buf, "\"{}\"", panic_placeholder(payload));
    }
}

/// Write `=` plus a string, quoted when it is a single line and as an
/// indented block otherwise:
///
/// ```text
/// key=<
/// <tab>line 1
/// <tab>line 2
///  >
/// ```
///
/// Value lines are indented with a tab while the end delimiter is indented
/// with a space, so a value line starting with ` >` stays unambiguous.
pub fn write_string_value(buf: &mut Vec<u8>, value: &str) {
    if !value.contains('\n') {
        buf.push(b'=');
        write_quoted(buf, value);
        return;
    }

    buf.extend_from_slice(b"=<\n");
    let mut rest = value;
    while let Some(index) = rest.find('\n') {
        buf.push(b'\t');
        buf.extend_from_slice(rest[..=index].as_bytes());
        rest = &rest[index + 1..];
    }
    if rest.is_empty() {
        // Ended with a line break, don't add another.
        buf.extend_from_slice(b" >");
    } else {
        buf.push(b'\t');
        buf.extend_from_slice(rest.as_bytes());
        buf.extend_from_slice(b"\n >");
    }
}

/// Append `s` as a double-quoted string.
///
/// Printable characters are copied as they are, combining marks included.
/// `"` and `\` are backslash-escaped, control characters use the short C
/// escapes where one exists and `\xNN`, `\uNNNN` or `\UNNNNNNNN` otherwise.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.reserve(s.len() + 2);
    buf.push(b'"');
    for c in s.chars() {
        match c {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\u{7}' => buf.extend_from_slice(b"\\a"),
            '\u{8}' => buf.extend_from_slice(b"\\b"),
            '\u{c}' => buf.extend_from_slice(b"\\f"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            '\u{b}' => buf.extend_from_slice(b"\\v"),
            c if is_printable(c) => {
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
            c if c < ' ' || c == '\u{7f}' => {
                let _ = write!(buf, "\\x{:02x}", c as u32);
            }
            c if (c as u32) < 0x10000 => {
                let _ = write!(buf, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(buf, "\\U{:08x}", c as u32);
            }
        }
    }
    buf.push(b'"');
}

/// Graphic characters plus the ASCII space
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control()
        || c.is_whitespace()
        || matches!(
            c,
            '\u{ad}'
                | '\u{61c}'
                | '\u{180e}'
                | '\u{200b}'..='\u{200f}'
                | '\u{202a}'..='\u{202e}'
                | '\u{2060}'..='\u{2064}'
                | '\u{2066}'..='\u{206f}'
                | '\u{feff}'
                | '\u{fff9}'..='\u{fffb}'
                | '\u{e000}'..='\u{f8ff}'
        ))
}

fn encode_json(buf: &mut Vec<u8>, value: &Value) -> serde_json::Result<()> {
    match value {
        Value::Null => serde_json::to_writer(&mut *buf, &()),
        Value::Bool(b) => serde_json::to_writer(&mut *buf, b),
        Value::Int(i) => serde_json::to_writer(&mut *buf, i),
        Value::UInt(u) => serde_json::to_writer(&mut *buf, u),
        Value::Float(f) if !f.is_finite() => Err(serde::ser::Error::custom(format!(
            "json: unsupported value: {}",
            non_finite_name(*f)
        ))),
        Value::Float(f) => serde_json::to_writer(&mut *buf, f),
        Value::Str(s) => serde_json::to_writer(&mut *buf, s.as_ref()),
        Value::Bytes(b) => serde_json::to_writer(&mut *buf, b),
        Value::Json(j) => serde_json::to_writer(&mut *buf, j),
        Value::Serialize(serialize) => catch_unwind(AssertUnwindSafe(|| serialize(&mut *buf)))
            .unwrap_or_else(|payload| {
                Err(serde::ser::Error::custom(panic_placeholder(payload)))
            }),
        Value::Display(display) => {
            serde_json::to_writer(&mut *buf, &guarded(|| display.to_string()))
        }
        Value::Error(err) => serde_json::to_writer(&mut *buf, &guarded(|| err.error.to_string())),
        Value::Marshal(_) => serde_json::to_writer(&mut *buf, "<nested marshaler>"),
        Value::Text(text) => catch_unwind(AssertUnwindSafe(|| text.write_text(buf)))
            .map_err(|payload| serde::ser::Error::custom(panic_placeholder(payload))),
    }
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f > 0.0 {
        "+Inf"
    } else {
        "-Inf"
    }
}

/// Run a rendering hook, turning a panic into a `<panic: ...>` placeholder
fn guarded(render: impl FnOnce() -> String) -> String {
    catch_unwind(AssertUnwindSafe(render)).unwrap_or_else(panic_placeholder)
}

fn panic_placeholder(payload: Box<dyn Any + Send>) -> String {
    format!("<panic: {}>", panic_message(payload.as_ref()))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{MarshalLog, WriteText};
    use crate::kvs;
    use std::fmt;

    fn render(lists: &[&[Value]]) -> String {
        let mut buf = Vec::new();
        format_kvs(&mut buf, lists);
        String::from_utf8(buf).unwrap()
    }

    struct Panicky;

    impl fmt::Display for Panicky {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("boom")
        }
    }

    struct ObjectRef {
        namespace: &'static str,
        name: &'static str,
    }

    impl MarshalLog for ObjectRef {
        fn marshal_log(&self) -> Value {
            serde_json::json!({"name": self.name, "namespace": self.namespace}).into()
        }
    }

    struct Lazy(&'static str);

    impl MarshalLog for Lazy {
        fn marshal_log(&self) -> Value {
            Value::from(self.0)
        }
    }

    struct Hex(u32);

    impl WriteText for Hex {
        fn write_text(&self, buf: &mut Vec<u8>) {
            let _ = write!(buf, "0x{:x}", self.0);
        }
    }

    #[test]
    fn test_no_duplicates() {
        let kv = kvs!["a" => 1, "b" => "x", "c" => true];
        assert_eq!(render(&[&kv]), r#" a=1 b="x" c=true"#);
    }

    #[test]
    fn test_identical_duplicate_kept_once() {
        let kv = kvs!["a" => "1", "a" => "1"];
        assert_eq!(render(&[&kv]), r#" a="1""#);
    }

    #[test]
    fn test_changed_duplicate_last_wins() {
        let kv = kvs!["a" => "1", "a" => "2"];
        assert_eq!(render(&[&kv]), r#" a="2""#);
    }

    #[test]
    fn test_identical_duplicate_keeps_first_position() {
        let values = kvs!["a" => 1, "b" => 2];
        let call = kvs!["c" => 3, "a" => 1];
        assert_eq!(render(&[&values, &call]), " a=1 b=2 c=3");
    }

    #[test]
    fn test_changed_duplicate_moves_to_last_position() {
        let values = kvs!["a" => 1, "b" => 2];
        let call = kvs!["c" => 3, "a" => 4];
        assert_eq!(render(&[&values, &call]), " b=2 c=3 a=4");
    }

    #[test]
    fn test_multiple_overrides() {
        let kv = kvs![
            "a" => 1, "b" => 1, "a" => 2, "c" => 1, "b" => 1, "a" => 3, "b" => 2
        ];
        assert_eq!(render(&[&kv]), " c=1 a=3 b=2");
    }

    #[test]
    fn test_missing_value() {
        let kv = vec![Value::from("a"), Value::from(1), Value::from("orphan")];
        assert_eq!(render(&[&kv]), r#" a=1 orphan="(MISSING)""#);
    }

    #[test]
    fn test_multi_line_with_trailing_newline() {
        let kv = kvs!["text" => "line1\nline2\n"];
        assert_eq!(render(&[&kv]), " text=<\n\tline1\n\tline2\n >");
    }

    #[test]
    fn test_multi_line_without_trailing_newline() {
        let kv = kvs!["text" => "line1\nline2"];
        assert_eq!(render(&[&kv]), " text=<\n\tline1\n\tline2\n >");
    }

    #[test]
    fn test_string_quoting() {
        let kv = kvs!["q" => "say \"hi\"\tnow"];
        assert_eq!(render(&[&kv]), r#" q="say \"hi\"\tnow""#);
    }

    #[test]
    fn test_quoting_escapes_only_non_printable() {
        let kv = kvs!["s" => "a\u{7f}b\u{301}c\u{1}\u{200b}\u{85}é"];
        assert_eq!(render(&[&kv]), " s=\"a\\x7fb\u{301}c\\x01\\u200b\\u0085é\"");
    }

    #[test]
    fn test_quoting_short_escapes() {
        let mut buf = Vec::new();
        write_quoted(&mut buf, "\u{7}\u{8}\u{c}\r\u{b}\\");
        assert_eq!(String::from_utf8(buf).unwrap(), r#""\a\b\f\r\v\\""#);
    }

    #[test]
    fn test_non_finite_float_placeholder() {
        let kv = kvs!["f" => f64::NAN, "g" => f64::NEG_INFINITY, "h" => 1.5];
        assert_eq!(
            render(&[&kv]),
            r#" f="<internal error: json: unsupported value: NaN>" g="<internal error: json: unsupported value: -Inf>" h=1.5"#
        );
    }

    #[test]
    fn test_panicking_display() {
        let kv = vec![Value::from("obj"), Value::display(Panicky)];
        assert_eq!(render(&[&kv]), r#" obj="<panic: boom>""#);
    }

    #[test]
    fn test_marshal_to_json_and_string() {
        let kv = vec![
            Value::from("pod"),
            Value::marshal(ObjectRef {
                namespace: "kube-system",
                name: "dns",
            }),
            Value::from("lazy"),
            Value::marshal(Lazy("a\nb")),
        ];
        assert_eq!(
            render(&[&kv]),
            " pod={\"name\":\"dns\",\"namespace\":\"kube-system\"} lazy=<\n\ta\n\tb\n >"
        );
    }

    #[test]
    fn test_write_text() {
        let kv = vec![Value::from("addr"), Value::text(Hex(255))];
        assert_eq!(render(&[&kv]), " addr=0xff");
    }

    #[test]
    fn test_bytes() {
        let kv = vec![Value::from("raw"), Value::from(b"a\"\x01".to_vec())];
        assert_eq!(render(&[&kv]), r#" raw="a\"\x01""#);
    }

    #[test]
    fn test_serialize_value() {
        #[derive(serde::Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }
        let kv = vec![Value::from("point"), Value::serialize(Point { x: 1, y: -2 })];
        assert_eq!(render(&[&kv]), r#" point={"x":1,"y":-2}"#);
    }

    #[test]
    fn test_serialize_failure_placeholder() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON");
        let kv = vec![Value::from("map"), Value::serialize(map)];
        let out = render(&[&kv]);
        assert!(out.starts_with(" map=\"<internal error: "), "{}", out);
    }

    #[test]
    fn test_any_to_string_hook() {
        let formatter = KvFormatter::new().with_any_to_string(Arc::new(|v| format!("<{:?}>", v)));
        let mut buf = Vec::new();
        formatter.format_kvs(&mut buf, &[&kvs!["n" => 5]]);
        assert_eq!(String::from_utf8(buf).unwrap(), " n=<Int(5)>");
    }

    #[test]
    fn test_compaction_preserves_prefix() {
        let mut buf = b"I0101 prefix]".to_vec();
        KvFormatter::new().format_kvs(&mut buf, &[&kvs!["a" => 1, "a" => 2, "b" => 3]]);
        assert_eq!(String::from_utf8(buf).unwrap(), "I0101 prefix] a=2 b=3");
    }
}
