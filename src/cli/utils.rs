use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

/// Print a success message; in JSON mode `data` fields are merged into the object
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print an empty collection under `key`
pub fn output_empty_collection(output_format: OutputFormat, key: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut body = Map::new();
            body.insert(key.to_string(), json!([]));
            println!("{}", serde_json::to_string_pretty(&Value::Object(body))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}
