use std::fmt;

/// Frame counters for one pipeline run.
///
/// `submitted == dropped + processed + discarded + pending` at every point
/// where the counters are read, with `pending` the frames still buffered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames handed to `submit`.
    pub submitted: u64,
    /// Frames evicted from a full buffer before processing.
    pub dropped: u64,
    /// Frames taken by the worker.
    pub processed: u64,
    /// Processed frames where the detector found no face.
    pub without_face: u64,
    /// Processed frames where detection or rendering failed.
    pub failed: u64,
    /// Outputs delivered to the handler.
    pub emitted: u64,
    /// Frames still queued when the pipeline shut down.
    pub discarded: u64,
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} submitted, {} dropped, {} processed ({} without face, {} failed), {} emitted",
            self.submitted, self.dropped, self.processed, self.without_face, self.failed, self.emitted
        )?;
        if self.discarded > 0 {
            write!(f, ", {} discarded", self.discarded)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_summary() {
        let stats = PipelineStats {
            submitted: 10,
            dropped: 4,
            processed: 6,
            without_face: 1,
            failed: 0,
            emitted: 5,
            discarded: 0,
        };
        assert_eq!(
            stats.to_string(),
            "10 submitted, 4 dropped, 6 processed (1 without face, 0 failed), 5 emitted"
        );
    }

    #[test]
    fn test_display_mentions_discarded_frames() {
        let stats = PipelineStats {
            submitted: 2,
            discarded: 1,
            processed: 1,
            emitted: 1,
            ..Default::default()
        };
        assert!(stats.to_string().ends_with(", 1 discarded"));
    }
}
