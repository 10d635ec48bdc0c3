use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::navigation::NavNode;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(object)) = (data, response.as_object_mut()) {
                object.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    collection_name: []
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Pretty JSON under a single key, for `--json` listings.
pub fn output_json<T: Serialize>(key: &str, value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&json!({ key: value }))?);
    Ok(())
}

/// Indented outline of a navigation forest.
pub fn render_tree(forest: &[NavNode]) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&NavNode, usize)> = forest.iter().rev().map(|node| (node, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let item = &node.item;
        let hidden = if item.visible { "" } else { " [hidden]" };
        out.push_str(&format!(
            "{}{}. {} -> {}{}  ({})\n",
            "  ".repeat(depth),
            item.order,
            item.label,
            item.href,
            hidden,
            item.id
        ));
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    out
}
