//! Get command handler.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::json;

use super::App;

impl App {
    /// Print one document as JSON, or report that it does not exist.
    pub async fn run_get(&self, index: &str, id: &str) -> Result<()> {
        let client = self.connect().await?;
        match client.get(index, id).await? {
            Some(document) => {
                let output = json!({ "_id": document.id, "_source": document.source });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            None => return Err(eyre!("Document '{}' not found in '{}'", id, index)),
        }
        Ok(())
    }
}
