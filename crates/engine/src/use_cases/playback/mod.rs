//! Animation playback.
//!
//! Replays an already resolved [`AnimationSequence`] wave by wave with a
//! delay between waves. Dice values are fixed before playback starts, so
//! skipping is purely a presentation short-circuit: the remaining waves are
//! dropped and the closing frames are emitted straight away.
//!
//! Frame order:
//! - within a roll, wave N of every group before wave N+1 of any group
//! - insurance: every roll-1 frame, then every roll-2 frame, then the reveal
//! - always a final `Complete`

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vttdice_domain::{AnimationGroup, AnimationSequence, Wave};

/// One step the renderer should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "frame", rename_all = "camelCase")]
pub enum PlaybackFrame {
    #[serde(rename_all = "camelCase")]
    Wave {
        /// 1 for single rolls and the first insurance roll, 2 for the second
        roll: u8,
        group_id: String,
        color: String,
        wave: Wave,
    },
    #[serde(rename_all = "camelCase")]
    Reveal { kept_roll: u8 },
    Complete { skipped: bool },
}

impl PlaybackFrame {
    pub fn is_wave(&self) -> bool {
        matches!(self, PlaybackFrame::Wave { .. })
    }
}

pub struct AnimationPlayer {
    wave_delay: Duration,
}

impl AnimationPlayer {
    pub fn new(wave_delay: Duration) -> Self {
        Self { wave_delay }
    }

    pub fn wave_delay(&self) -> Duration {
        self.wave_delay
    }

    /// Every frame of a full, uninterrupted playback.
    pub fn frames(sequence: &AnimationSequence) -> Vec<PlaybackFrame> {
        let mut frames = Vec::new();
        match sequence {
            AnimationSequence::Single { groups } => {
                push_roll(&mut frames, 1, groups);
            }
            AnimationSequence::Insurance {
                groups1,
                groups2,
                kept_roll,
            } => {
                push_roll(&mut frames, 1, groups1);
                push_roll(&mut frames, 2, groups2);
                frames.push(PlaybackFrame::Reveal {
                    kept_roll: *kept_roll,
                });
            }
        }
        frames.push(PlaybackFrame::Complete { skipped: false });
        frames
    }

    /// Stream frames over a channel, sleeping `wave_delay` after each wave.
    ///
    /// Cancelling `cancel` at any point stops further wave frames; the reveal
    /// (if any) and a skipped `Complete` still follow. Dropping the receiver
    /// ends the task.
    pub fn play(
        &self,
        sequence: &AnimationSequence,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<PlaybackFrame>, JoinHandle<()>) {
        let frames = Self::frames(sequence);
        let delay = self.wave_delay;
        // Room for every frame so a send never waits on the renderer
        let (tx, rx) = mpsc::channel(frames.len());

        let handle = tokio::spawn(async move {
            let mut frames = frames.into_iter();
            while let Some(frame) = frames.next() {
                if cancel.is_cancelled() {
                    finish_skipped(&tx, std::iter::once(frame).chain(frames)).await;
                    return;
                }

                let is_wave = frame.is_wave();
                if tx.send(frame).await.is_err() {
                    tracing::trace!("Playback receiver dropped");
                    return;
                }

                if is_wave {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            finish_skipped(&tx, frames).await;
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        });

        (rx, handle)
    }
}

fn push_roll(frames: &mut Vec<PlaybackFrame>, roll: u8, groups: &[AnimationGroup]) {
    let depth = groups.iter().map(|g| g.waves.len()).max().unwrap_or(0);
    for index in 0..depth {
        for group in groups {
            if let Some(wave) = group.waves.get(index) {
                frames.push(PlaybackFrame::Wave {
                    roll,
                    group_id: group.id.clone(),
                    color: group.color.clone(),
                    wave: wave.clone(),
                });
            }
        }
    }
}

async fn finish_skipped(
    tx: &mpsc::Sender<PlaybackFrame>,
    rest: impl Iterator<Item = PlaybackFrame>,
) {
    tracing::debug!("Playback skipped");
    for frame in rest {
        let frame = match frame {
            PlaybackFrame::Wave { .. } => continue,
            PlaybackFrame::Complete { .. } => PlaybackFrame::Complete { skipped: true },
            other => other,
        };
        if tx.send(frame).await.is_err() {
            return;
        }
    }
}
