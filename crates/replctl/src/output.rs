use std::io::IsTerminal;

use clap::ValueEnum;
use replctl_codec::{repr, Value};
use replctl_session::Reply;
use serde::Serialize;

use crate::exit;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

/// Prints a device reply to stdout and returns the process exit code for it.
pub fn print_reply(reply: &Reply, format: OutputFormat) -> i32 {
    match format {
        OutputFormat::Json => print_json(reply),
        OutputFormat::Text => print_text(reply),
    }
}

fn print_json(reply: &Reply) -> i32 {
    let (out, code) = match reply {
        Reply::None => (
            ReplyOutput {
                outcome: "ok",
                value: None,
                error: None,
                raw: None,
            },
            exit::SUCCESS,
        ),
        Reply::Value(value) => (
            ReplyOutput {
                outcome: "ok",
                value: Some(value_to_json(value)),
                error: None,
                raw: None,
            },
            exit::SUCCESS,
        ),
        Reply::DeviceError(traceback) => (
            ReplyOutput {
                outcome: "device-error",
                value: None,
                error: Some(traceback.clone()),
                raw: None,
            },
            exit::FAILURE,
        ),
        Reply::DecodeFailed(err) => (
            ReplyOutput {
                outcome: "undecodable",
                value: None,
                error: Some(err.to_string()),
                raw: Some(err.text.clone()),
            },
            exit::DATA_INVALID,
        ),
    };
    println!(
        "{}",
        serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
    );
    code
}

fn print_text(reply: &Reply) -> i32 {
    match reply {
        Reply::None => {
            println!("(no value)");
            exit::SUCCESS
        }
        Reply::Value(value) => {
            println!("{}", repr(value));
            exit::SUCCESS
        }
        Reply::DeviceError(traceback) => {
            eprintln!("device error:");
            eprint!("{traceback}");
            if !traceback.ends_with('\n') {
                eprintln!();
            }
            exit::FAILURE
        }
        Reply::DecodeFailed(err) => {
            eprintln!("undecodable reply: {err}");
            println!("{}", err.text);
            exit::DATA_INVALID
        }
    }
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::None => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => serde_json::Value::Array(
            b.iter().map(|byte| serde_json::Value::from(*byte)).collect(),
        ),
        Value::Tuple(items) | Value::List(items) | Value::Set(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Dict(entries) => {
            let mut map = serde_json::Map::with_capacity(entries.len());
            for (key, val) in entries {
                let key = match key {
                    Value::Str(s) => s.clone(),
                    other => repr(other),
                };
                map.insert(key, value_to_json(val));
            }
            serde_json::Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_nests_containers() {
        let value = Value::Dict(vec![
            (Value::Str("pins".into()), Value::List(vec![Value::Int(2), Value::Int(4)])),
            (Value::Int(7), Value::Bool(true)),
        ]);
        let json = value_to_json(&value);
        assert_eq!(json["pins"][1], serde_json::json!(4));
        assert_eq!(json["7"], serde_json::json!(true));
    }

    #[test]
    fn json_bytes_become_number_array() {
        let json = value_to_json(&Value::Bytes(vec![0, 255]));
        assert_eq!(json, serde_json::json!([0, 255]));
    }

    #[test]
    fn json_non_finite_float_is_null() {
        let json = value_to_json(&Value::Float(f64::INFINITY));
        assert_eq!(json, serde_json::Value::Null);
    }
}
