//! Cosmetic progress bar shown after a section is generated.
//!
//! Content is rendered instantly; the animation only paces the bar. It runs
//! as a tokio task that publishes frames through a `watch` channel, so the
//! UI loop just reads the latest frame on each draw.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::templates::Section;

/// Percent added per tick
const STEP_PERCENT: u16 = 5;

/// Messages shown from 25%, 50%, 75% and 100%
const STAGE_MESSAGES: [&str; 4] = [
    "Analyzing the story background...",
    "Building character relationships...",
    "Refining story details...",
    "Almost done...",
];

/// One frame of the animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressFrame {
    pub section: Section,
    pub percent: u16,
    pub message: String,
}

impl ProgressFrame {
    /// Frame after `tick` steps
    pub fn at(section: Section, tick: u32) -> Self {
        let percent = (tick.min(u32::from(100 / STEP_PERCENT)) as u16) * STEP_PERCENT;
        let message = match percent / 25 {
            0 => format!("Generating the {}...", section.label().to_lowercase()),
            stage => STAGE_MESSAGES[usize::from(stage - 1).min(STAGE_MESSAGES.len() - 1)]
                .to_string(),
        };
        Self {
            section,
            percent,
            message,
        }
    }

    pub fn is_done(&self) -> bool {
        self.percent >= 100
    }
}

/// Handle to a running animation
pub struct ProgressAnimation {
    frames: watch::Receiver<ProgressFrame>,
    handle: JoinHandle<()>,
}

impl ProgressAnimation {
    /// Spawn the animation task; must be called inside a tokio runtime.
    /// A zero `step` is raised to one millisecond.
    pub fn start(section: Section, step: Duration) -> Self {
        let step = step.max(Duration::from_millis(1));
        let (tx, frames) = watch::channel(ProgressFrame::at(section, 0));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(step);
            // First tick completes immediately
            interval.tick().await;

            let mut tick = 0;
            loop {
                interval.tick().await;
                tick += 1;
                let frame = ProgressFrame::at(section, tick);
                let done = frame.is_done();
                if tx.send(frame).is_err() || done {
                    break;
                }
            }
        });

        Self { frames, handle }
    }

    /// Latest published frame
    pub fn frame(&self) -> ProgressFrame {
        self.frames.borrow().clone()
    }

    /// Receiver for observers that want to await frames
    pub fn subscribe(&self) -> watch::Receiver<ProgressFrame> {
        self.frames.clone()
    }

    /// True once the bar should be hidden
    pub fn is_finished(&self) -> bool {
        self.frames.borrow().is_done() || self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for ProgressAnimation {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_step_by_five_percent() {
        assert_eq!(ProgressFrame::at(Section::Outline, 0).percent, 0);
        assert_eq!(ProgressFrame::at(Section::Outline, 1).percent, 5);
        assert_eq!(ProgressFrame::at(Section::Outline, 19).percent, 95);
        assert_eq!(ProgressFrame::at(Section::Outline, 20).percent, 100);
        assert_eq!(ProgressFrame::at(Section::Outline, 500).percent, 100);
    }

    #[test]
    fn test_message_changes_every_quarter() {
        let message = |tick| ProgressFrame::at(Section::Background, tick).message;

        assert_eq!(message(0), "Generating the background...");
        assert_eq!(message(4), "Generating the background...");
        assert_eq!(message(5), "Analyzing the story background...");
        assert_eq!(message(10), "Building character relationships...");
        assert_eq!(message(15), "Refining story details...");
        assert_eq!(message(19), "Refining story details...");
        assert_eq!(message(20), "Almost done...");
    }

    #[test]
    fn test_done_only_at_full() {
        assert!(!ProgressFrame::at(Section::Outline, 19).is_done());
        assert!(ProgressFrame::at(Section::Outline, 20).is_done());
    }

    #[tokio::test]
    async fn test_animation_runs_to_completion() {
        let animation = ProgressAnimation::start(Section::Outline, Duration::from_millis(1));
        let mut frames = animation.subscribe();

        let last = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if frames.borrow_and_update().is_done() {
                    break frames.borrow().clone();
                }
                if frames.changed().await.is_err() {
                    break frames.borrow().clone();
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(last.percent, 100);
        assert!(animation.is_finished());
    }

    #[tokio::test]
    async fn test_zero_step_still_animates() {
        let animation = ProgressAnimation::start(Section::Outline, Duration::ZERO);
        let mut frames = animation.subscribe();

        let done = tokio::time::timeout(Duration::from_secs(5), async {
            while !frames.borrow_and_update().is_done() {
                if frames.changed().await.is_err() {
                    break;
                }
            }
            frames.borrow().percent
        })
        .await
        .unwrap();

        assert_eq!(done, 100);
    }

    #[tokio::test]
    async fn test_abort_stops_the_task() {
        let animation = ProgressAnimation::start(Section::Background, Duration::from_secs(60));
        animation.abort();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(animation.is_finished());
        assert_eq!(animation.frame().percent, 0);
    }
}
