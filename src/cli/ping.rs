//! Ping command handler.

use color_eyre::Result;

use super::App;

impl App {
    /// Initialise the client and report the cluster it reached.
    pub async fn run_ping(&self) -> Result<()> {
        let info = self
            .connector()?
            .cluster_info()
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Failed to connect: {}", e))?;
        println!("{} (Elasticsearch {})", info.cluster_name, info.version);
        Ok(())
    }
}
