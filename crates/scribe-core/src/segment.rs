//! Segments: fixed-duration slices of one recording, recognized independently.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Successful recognitions keyed by stable segment index. An absent index is a failure.
pub type SegmentResults = BTreeMap<usize, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Pending,
    Success,
    Failed,
}

impl SegmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentStatus::Pending => "pending",
            SegmentStatus::Success => "success",
            SegmentStatus::Failed => "failed",
        }
    }
}

/// One segment of a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Ordinal within the file; results are always keyed by this.
    pub index: usize,
    pub path: PathBuf,
    pub status: SegmentStatus,
    pub text: Option<String>,
    /// Times this segment was submitted to the scheduler.
    pub attempts: u32,
}

impl Segment {
    pub fn new(index: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            path: path.into(),
            status: SegmentStatus::Pending,
            text: None,
            attempts: 0,
        }
    }

    /// Build pending segments numbered by position.
    pub fn from_paths<I, P>(paths: I) -> Vec<Segment>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths
            .into_iter()
            .enumerate()
            .map(|(i, p)| Segment::new(i, p))
            .collect()
    }

    pub fn mark_success(&mut self, text: String) {
        self.status = SegmentStatus::Success;
        self.text = Some(text);
    }

    /// No-op on a segment that already succeeded.
    pub fn mark_failed(&mut self) {
        if self.status != SegmentStatus::Success {
            self.status = SegmentStatus::Failed;
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SegmentStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_never_overwritten() {
        let mut seg = Segment::new(0, "a.wav");
        seg.mark_failed();
        assert_eq!(seg.status, SegmentStatus::Failed);
        seg.mark_success("hello".to_string());
        seg.mark_failed();
        assert!(seg.is_success());
        assert_eq!(seg.text.as_deref(), Some("hello"));
    }

    #[test]
    fn from_paths_numbers_by_position() {
        let segs = Segment::from_paths(["x/0.wav", "x/1.wav", "x/2.wav"]);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[2].index, 2);
        assert_eq!(segs[2].path, PathBuf::from("x/2.wav"));
        assert!(segs.iter().all(|s| s.status == SegmentStatus::Pending));
    }
}
