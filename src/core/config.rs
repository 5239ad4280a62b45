use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: PathBuf,
    pub shard_count: usize,  // only used when the workspace is first created
    pub page_size: u64,      // documents per scan page during reindex/scrub
    pub client_id: u32,      // shows up in log lines
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workspace: PathBuf::from("./data"),
            shard_count: num_cpus::get(),
            page_size: 10_000,
            client_id: 0,
        }
    }
}

impl Config {
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_client_id(mut self, client_id: u32) -> Self {
        self.client_id = client_id;
        self
    }
}
