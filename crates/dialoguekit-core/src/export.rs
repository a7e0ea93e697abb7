use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use tracing::info;
use crate::state::ConversationItem;

/// Pretty-printed JSON array of `{theme, conversation}` records
pub fn dataset_json(items: &[ConversationItem]) -> Vec<u8> {
    // Only strings and arrays of strings: serialization has no failure path
    serde_json::to_vec_pretty(items).unwrap_or_else(|_| b"[]".to_vec())
}

pub fn dataset_file_name(assistant_name: &str, count: usize) -> String {
    format!("{assistant_name}_conversations_dataset_{count}_samples.json")
}

/// Write the dataset into `dir` under the suggested file name
pub fn write_dataset(dir: &Path, assistant_name: &str, items: &[ConversationItem]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Could not create export directory {}", dir.display()))?;

    let path = dir.join(dataset_file_name(assistant_name, items.len()));
    fs::write(&path, dataset_json(items))
        .with_context(|| format!("Could not write dataset to {}", path.display()))?;

    info!(path = %path.display(), count = items.len(), "dataset exported");
    Ok(path)
}

/// Parse an exported dataset back into items
pub fn read_dataset(bytes: &[u8]) -> Result<Vec<ConversationItem>> {
    let items = serde_json::from_slice(bytes).context("Dataset is not a valid conversation array")?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::themes::Theme;

    fn sample() -> Vec<ConversationItem> {
        vec![
            ConversationItem {
                theme: Theme::new("Fashion Talk"),
                turns: vec!["User: hi".to_string(), "IRIS: hey ✨".to_string()],
            },
            ConversationItem {
                theme: Theme::new("Late Night Vibes"),
                turns: vec!["Bob: unknown tag kept".to_string()],
            },
        ]
    }

    #[test]
    fn test_file_name() {
        assert_eq!(dataset_file_name("IRIS", 200), "IRIS_conversations_dataset_200_samples.json");
    }

    #[test]
    fn test_json_shape_uses_conversation_key() {
        let value: serde_json::Value = serde_json::from_slice(&dataset_json(&sample())).unwrap();
        assert_eq!(value[0]["theme"], "Fashion Talk");
        assert_eq!(value[0]["conversation"][1], "IRIS: hey ✨");
        assert!(value[0].get("turns").is_none());
    }

    #[test]
    fn test_pretty_printed() {
        let text = String::from_utf8(dataset_json(&sample())).unwrap();
        assert!(text.starts_with("[\n  {"));
    }

    #[test]
    fn test_empty_list_exports_empty_array() {
        assert_eq!(dataset_json(&[]), b"[]".to_vec());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(dir.path(), "IRIS", &sample()).unwrap();
        assert!(path.ends_with("IRIS_conversations_dataset_2_samples.json"));
        let items = read_dataset(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(items, sample());
    }
}
