use std::fmt::Write;

use crate::value::Value;

/// Spell an argument list as the device parses it: a tuple literal.
///
/// The singleton case keeps the trailing comma (`(1,)`); without it the
/// device would read plain parentheses instead of a one-element tuple.
pub fn encode_args(args: &[Value]) -> String {
    let mut out = String::from("(");
    match args {
        [] => {}
        [only] => {
            repr_into(only, &mut out);
            out.push(',');
        }
        _ => {
            for (i, value) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                repr_into(value, &mut out);
            }
        }
    }
    out.push(')');
    out
}

/// Canonical literal spelling of a single value.
pub fn repr(value: &Value) -> String {
    let mut out = String::new();
    repr_into(value, &mut out);
    out
}

fn repr_into(value: &Value, out: &mut String) {
    match value {
        Value::None => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Value::Float(v) => {
            // `{:?}` keeps a trailing `.0` on whole floats, which the
            // device needs to read the value back as a float.
            let _ = write!(out, "{v:?}");
        }
        Value::Str(s) => quote_str(s, out),
        Value::Bytes(b) => {
            out.push('b');
            quote_bytes(b, out);
        }
        Value::Tuple(items) => {
            out.push('(');
            match items.as_slice() {
                [] => {}
                [only] => {
                    repr_into(only, out);
                    out.push(',');
                }
                _ => join(items, out),
            }
            out.push(')');
        }
        Value::List(items) => {
            out.push('[');
            join(items, out);
            out.push(']');
        }
        Value::Dict(pairs) => {
            out.push('{');
            for (i, (key, val)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                repr_into(key, out);
                out.push_str(": ");
                repr_into(val, out);
            }
            out.push('}');
        }
        Value::Set(items) if items.is_empty() => out.push_str("set()"),
        Value::Set(items) => {
            out.push('{');
            join(items, out);
            out.push('}');
        }
    }
}

fn join(items: &[Value], out: &mut String) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        repr_into(item, out);
    }
}

fn quote_str(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (' '..='~').contains(&c) => out.push(c),
            c if (c as u32) <= 0xFF => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) <= 0xFFFF => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('\'');
}

fn quote_bytes(bytes: &[u8], out: &mut String) {
    out.push('\'');
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b' '..=b'~' => out.push(b as char),
            b => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push('\'');
}
