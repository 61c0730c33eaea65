//! Work deferred to the next rendering frame.

use std::collections::VecDeque;

use smol_str::SmolStr;
use weaver_richtext_core::FormatValue;

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameTask {
    /// Apply a format once focus has settled.
    ApplyFormat {
        name: SmolStr,
        value: FormatValue,
        /// The caller asserted the editor already had focus.
        editor_focused: bool,
    },
}

/// FIFO of tasks waiting for the next frame flush.
#[derive(Debug, Default)]
pub struct FrameQueue {
    tasks: VecDeque<FrameTask>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: FrameTask) {
        self.tasks.push_back(task);
    }

    /// Take every task queued so far. Tasks pushed afterwards wait for the
    /// following flush.
    pub fn take(&mut self) -> Vec<FrameTask> {
        self.tasks.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str) -> FrameTask {
        FrameTask::ApplyFormat {
            name: name.into(),
            value: true.into(),
            editor_focused: false,
        }
    }

    #[test]
    fn test_take_preserves_order() {
        let mut queue = FrameQueue::new();
        queue.push(apply("bold"));
        queue.push(apply("italic"));
        let tasks = queue.take();
        assert_eq!(tasks, vec![apply("bold"), apply("italic")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_tasks_after_take_wait() {
        let mut queue = FrameQueue::new();
        queue.push(apply("bold"));
        let first = queue.take();
        queue.push(apply("italic"));
        assert_eq!(first.len(), 1);
        assert_eq!(queue.len(), 1);
        queue.clear();
        assert!(queue.is_empty());
    }
}
