//! Sample configuration.

use clap::Parser;

use crate::error::SampleError;

/// Default account name for development storage.
pub const DEFAULT_ACCOUNT: &str = "devstoreaccount1";

/// Default blob endpoint used when building entry URLs.
pub const DEFAULT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000";

/// Container the sample works in.
pub const DEFAULT_CONTAINER: &str = "snapshotsample9994";

/// Blob the sample snapshots.
pub const DEFAULT_BLOB: &str = "snapshotsample";

/// Command-line arguments for the sample.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "snapshot-sample")]
#[command(about = "Blob snapshot sample: commit blocks, take snapshots, read and delete them")]
#[command(version)]
pub struct Args {
    /// Any single value deletes the sample container before the run.
    #[arg(value_name = "RESET")]
    pub reset: Vec<String>,
}

/// Block IDs and contents the sample stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    pub block_id1: String,
    pub block_id2: String,
    pub block_id3: String,
    pub content1: String,
    pub content2: String,
    pub content_alternative2: String,
    pub content3: String,
}

impl Default for BlockPlan {
    fn default() -> Self {
        Self {
            block_id1: "b1".to_string(),
            block_id2: "b2".to_string(),
            block_id3: "b3".to_string(),
            content1: "content1".to_string(),
            content2: "content2".to_string(),
            content_alternative2: "alternative2".to_string(),
            content3: "content3".to_string(),
        }
    }
}

impl BlockPlan {
    /// Block IDs in commit order.
    pub fn block_ids(&self) -> [&str; 3] {
        [
            self.block_id1.as_str(),
            self.block_id2.as_str(),
            self.block_id3.as_str(),
        ]
    }

    /// Content expected after the first commit.
    pub fn initial_content(&self) -> String {
        format!("{}{}{}", self.content1, self.content2, self.content3)
    }

    /// Content expected after block 2 is replaced.
    pub fn updated_content(&self) -> String {
        format!(
            "{}{}{}",
            self.content1, self.content_alternative2, self.content3
        )
    }
}

/// Sample configuration derived from command-line arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Account name used in entry URLs.
    pub account: String,
    /// Blob endpoint used in entry URLs.
    pub endpoint: String,
    /// Container the sample works in.
    pub container: String,
    /// Blob the sample snapshots.
    pub blob: String,
    /// Blocks to stage and commit.
    pub blocks: BlockPlan,
    /// Delete the container before running.
    pub reset_container: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: DEFAULT_ACCOUNT.to_string(),
            endpoint: DEFAULT_BLOB_ENDPOINT.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            blob: DEFAULT_BLOB.to_string(),
            blocks: BlockPlan::default(),
            reset_container: false,
        }
    }
}

impl TryFrom<Args> for Config {
    type Error = SampleError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.reset.len() > 1 {
            return Err(SampleError::InvalidArguments);
        }
        Ok(Self {
            reset_container: !args.reset.is_empty(),
            ..Self::default()
        })
    }
}

impl Config {
    /// Returns a configuration for the given container, keeping the other defaults.
    pub fn for_container(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_runs_without_reset() {
        let args = Args::try_parse_from(["snapshot-sample"]).unwrap();
        let config = Config::try_from(args).unwrap();
        assert!(!config.reset_container);
        assert_eq!(config.container, DEFAULT_CONTAINER);
        assert_eq!(config.blob, DEFAULT_BLOB);
    }

    #[test]
    fn test_any_single_argument_resets() {
        let args = Args::try_parse_from(["snapshot-sample", "whatever"]).unwrap();
        let config = Config::try_from(args).unwrap();
        assert!(config.reset_container);
    }

    #[test]
    fn test_too_many_arguments() {
        let args = Args::try_parse_from(["snapshot-sample", "a", "b"]).unwrap();
        let err = Config::try_from(args).unwrap_err();
        assert_eq!(err.to_string(), "Incorrect number of arguments");
    }

    #[test]
    fn test_block_plan_contents() {
        let plan = BlockPlan::default();
        assert_eq!(plan.initial_content(), "content1content2content3");
        assert_eq!(plan.updated_content(), "content1alternative2content3");
        assert_eq!(plan.block_ids(), ["b1", "b2", "b3"]);
    }
}
