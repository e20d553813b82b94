//! The snapshot sample: a linear sequence of blob service calls.
//!
//! Each [`Step`] runs only after the previous one has finished, and the first
//! failing step aborts the run. The outputs of a full [`SNAPSHOT_SEQUENCE`]
//! run can be checked with [`SnapshotSample::verify_outcome`].

use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ErrorCode, SampleError, SampleResult, StorageError, StorageResult};
use crate::models::{BlobItem, BlockList, DeleteBlobOptions, ListBlobsOptions};
use crate::service::BlobService;

/// A named operation of the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateContainer,
    UploadBlockBlobs,
    ReadBlobContent,
    CreateSnapshot,
    UpdateBlock2,
    CreateAnotherSnapshot,
    ListSnapshots,
    ReadBlobContentFromSnapshot,
    DeleteSnapshot,
    ListOnlySnapshots,
    DeleteContainer,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CreateContainer => "CreateContainer",
            Step::UploadBlockBlobs => "UploadBlockBlobs",
            Step::ReadBlobContent => "ReadBlobContent",
            Step::CreateSnapshot => "CreateSnapshot",
            Step::UpdateBlock2 => "UpdateBlock2",
            Step::CreateAnotherSnapshot => "CreateAnotherSnapshot",
            Step::ListSnapshots => "ListSnapshots",
            Step::ReadBlobContentFromSnapshot => "ReadBlobContentFromSnapshot",
            Step::DeleteSnapshot => "DeleteSnapshot",
            Step::ListOnlySnapshots => "ListOnlySnapshots",
            Step::DeleteContainer => "DeleteContainer",
        }
    }
}

/// The sample's operations, in run order.
pub const SNAPSHOT_SEQUENCE: [Step; 11] = [
    Step::CreateContainer,
    Step::UploadBlockBlobs,
    Step::ReadBlobContent,
    Step::CreateSnapshot,
    Step::UpdateBlock2,
    Step::ReadBlobContent,
    Step::CreateAnotherSnapshot,
    Step::ListSnapshots,
    Step::ReadBlobContentFromSnapshot,
    Step::DeleteSnapshot,
    Step::ListOnlySnapshots,
];

/// What a step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutput {
    Done,
    Text(String),
    Snapshot(String),
    Listing(Vec<BlobItem>),
}

impl StepOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StepOutput::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_listing(&self) -> Option<&[BlobItem]> {
        match self {
            StepOutput::Listing(items) => Some(items),
            _ => None,
        }
    }
}

/// State carried from one step to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleState {
    /// Token of the first snapshot; read and then deleted by later steps.
    pub snapshot1: Option<String>,
    /// Token of the second snapshot.
    pub snapshot2: Option<String>,
}

/// Runs the snapshot sample against a blob service.
pub struct SnapshotSample {
    service: Arc<dyn BlobService>,
    config: Config,
    state: SampleState,
}

impl SnapshotSample {
    pub fn new(service: Arc<dyn BlobService>, config: Config) -> Self {
        Self {
            service,
            config,
            state: SampleState::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &SampleState {
        &self.state
    }

    /// Deletes the sample container. A missing container is nothing to reset.
    pub async fn reset(&self) -> SampleResult<()> {
        match self.service.delete_container(&self.config.container).await {
            Ok(()) => {
                info!("Deleted the container {}", self.config.container);
                Ok(())
            }
            Err(e) if e.code == ErrorCode::ContainerNotFound => {
                warn!(
                    "Container {} does not exist, nothing to reset",
                    self.config.container
                );
                Ok(())
            }
            Err(e) => Err(SampleError::service(Step::DeleteContainer.name(), e)),
        }
    }

    /// Runs the steps in order, stopping at the first failure.
    pub async fn run(&mut self, steps: &[Step]) -> SampleResult<Vec<StepOutput>> {
        let mut outputs = Vec::with_capacity(steps.len());
        for &step in steps {
            let output = self
                .run_step(step)
                .await
                .map_err(|e| SampleError::service(step.name(), e))?;
            outputs.push(output);
        }
        Ok(outputs)
    }

    /// Runs a single step.
    pub async fn run_step(&mut self, step: Step) -> StorageResult<StepOutput> {
        let container = self.config.container.clone();
        let blob = self.config.blob.clone();
        let blocks = self.config.blocks.clone();
        let service = self.service.as_ref();

        match step {
            Step::CreateContainer => {
                let created = service.create_container_if_not_exists(&container).await?;
                if created {
                    info!("Created the container {}", container);
                } else {
                    info!("Using the existing container {}", container);
                }
                Ok(StepOutput::Done)
            }
            Step::UploadBlockBlobs => {
                let contents = [&blocks.content1, &blocks.content2, &blocks.content3];
                for (block_id, content) in blocks.block_ids().into_iter().zip(contents) {
                    service
                        .stage_block(&container, &blob, block_id, Bytes::from(content.clone()))
                        .await?;
                    info!("Uploaded the block whose ID is {}", block_id);
                }
                service
                    .commit_block_list(&container, &blob, &BlockList::latest(blocks.block_ids()))
                    .await?;
                info!("Committed the blob {}", blob);
                Ok(StepOutput::Done)
            }
            Step::ReadBlobContent => {
                let text = service.read_text(&container, &blob, None).await?;
                info!("Reading the current blob content: {}", text);
                Ok(StepOutput::Text(text))
            }
            Step::CreateSnapshot | Step::CreateAnotherSnapshot => {
                let token = service.create_snapshot(&container, &blob).await?;
                info!("Created a snapshot for the blob {}: {}", blob, token);
                if step == Step::CreateSnapshot {
                    self.state.snapshot1 = Some(token.clone());
                } else {
                    self.state.snapshot2 = Some(token.clone());
                }
                Ok(StepOutput::Snapshot(token))
            }
            Step::UpdateBlock2 => {
                service
                    .stage_block(
                        &container,
                        &blob,
                        &blocks.block_id2,
                        Bytes::from(blocks.content_alternative2.clone()),
                    )
                    .await?;
                info!("Uploaded the block whose ID is {}", blocks.block_id2);
                service
                    .commit_block_list(&container, &blob, &BlockList::latest(blocks.block_ids()))
                    .await?;
                info!("Committed the blob {}", blob);
                Ok(StepOutput::Done)
            }
            Step::ListSnapshots => {
                let items = service
                    .list_blobs(&container, &ListBlobsOptions::with_snapshots())
                    .await?;
                info!("Listing the blobs under the container {}", container);
                for item in &items {
                    info!("  Blob: {}", item.url);
                }
                Ok(StepOutput::Listing(items))
            }
            Step::ReadBlobContentFromSnapshot => {
                let token = self.first_snapshot()?;
                let text = service.read_text(&container, &blob, Some(&token)).await?;
                info!("Reading from snapshot {}: {}", token, text);
                Ok(StepOutput::Text(text))
            }
            Step::DeleteSnapshot => {
                let token = self.first_snapshot()?;
                service
                    .delete_blob(&container, &blob, &DeleteBlobOptions::snapshot(token.clone()))
                    .await?;
                info!("Deleted the snapshot {}", token);
                Ok(StepOutput::Done)
            }
            Step::ListOnlySnapshots => {
                let options = ListBlobsOptions::with_snapshots().prefix(blob.clone());
                let items = service.list_blobs(&container, &options).await?;
                info!("Listing snapshots for the blob {}", blob);
                for token in items.iter().filter_map(|item| item.snapshot.as_deref()) {
                    info!("  Snapshot: {}", token);
                }
                Ok(StepOutput::Listing(items))
            }
            Step::DeleteContainer => {
                service.delete_container(&container).await?;
                info!("Deleted the container {}", container);
                Ok(StepOutput::Done)
            }
        }
    }

    fn first_snapshot(&self) -> StorageResult<String> {
        self.state.snapshot1.clone().ok_or_else(|| {
            StorageError::with_message(ErrorCode::InvalidInput, "No snapshot has been taken yet")
        })
    }

    /// Checks the outputs of a full [`SNAPSHOT_SEQUENCE`] run.
    pub fn verify_outcome(&self, outputs: &[StepOutput]) -> SampleResult<()> {
        if outputs.len() != SNAPSHOT_SEQUENCE.len() {
            return Err(SampleError::assertion(
                "step count",
                SNAPSHOT_SEQUENCE.len(),
                outputs.len(),
            ));
        }

        let blocks = &self.config.blocks;
        let text = |index: usize| outputs[index].as_text().unwrap_or_default();
        let listed = |index: usize| outputs[index].as_listing().map_or(0, |items| items.len());

        let checks = [
            ("initial content", blocks.initial_content(), text(2).to_string()),
            ("updated content", blocks.updated_content(), text(5).to_string()),
            ("listing with snapshots", "3".to_string(), listed(7).to_string()),
            ("snapshot content", blocks.initial_content(), text(8).to_string()),
            ("listing after delete", "2".to_string(), listed(10).to_string()),
        ];
        for (check, expected, actual) in checks {
            if expected != actual {
                return Err(SampleError::assertion(check, expected, actual));
            }
        }
        Ok(())
    }
}
