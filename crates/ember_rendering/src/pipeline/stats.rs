//! Pipeline statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames presented.
    pub frames_rendered: u64,
    /// Commands decoded and dispatched.
    pub commands_executed: u64,
    /// Backend copies issued for draw records.
    pub draw_calls: u64,
    /// Draw records in the last presented frame.
    pub last_total_widgets: u64,
    /// Draw records dropped because the frame was full.
    pub dropped_draws: u64,
    /// Commands dropped because the frame was full.
    pub dropped_commands: u64,
    /// Payload bytes of dropped commands.
    pub dropped_payload_bytes: u64,
    /// Commands whose payload could not be decoded.
    pub decode_errors: u64,
}

impl RenderStats {
    /// Everything the producer had to throw away.
    #[must_use]
    pub const fn total_dropped(&self) -> u64 {
        self.dropped_draws + self.dropped_commands
    }

    /// True if nothing was dropped or failed to decode.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.total_dropped() == 0 && self.decode_errors == 0
    }
}

/// Live counters shared by both sides of the pipeline.
#[derive(Debug, Default)]
pub(crate) struct PipelineStats {
    frames_rendered: AtomicU64,
    commands_executed: AtomicU64,
    draw_calls: AtomicU64,
    last_total_widgets: AtomicU64,
    dropped_draws: AtomicU64,
    dropped_commands: AtomicU64,
    dropped_payload_bytes: AtomicU64,
    decode_errors: AtomicU64,
}

impl PipelineStats {
    pub(crate) fn frame_presented(&self, widgets: usize) {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed);
        self.last_total_widgets
            .store(widgets as u64, Ordering::Relaxed);
    }

    pub(crate) fn command_executed(&self) {
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn draw_call(&self) {
        self.draw_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn draw_dropped(&self) {
        self.dropped_draws.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn command_dropped(&self, payload_bytes: usize) {
        self.dropped_commands.fetch_add(1, Ordering::Relaxed);
        self.dropped_payload_bytes
            .fetch_add(payload_bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn last_total_widgets(&self) -> u64 {
        self.last_total_widgets.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self) -> RenderStats {
        RenderStats {
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            last_total_widgets: self.last_total_widgets.load(Ordering::Relaxed),
            dropped_draws: self.dropped_draws.load(Ordering::Relaxed),
            dropped_commands: self.dropped_commands.load(Ordering::Relaxed),
            dropped_payload_bytes: self.dropped_payload_bytes.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = PipelineStats::default();
        stats.frame_presented(4);
        stats.draw_call();
        stats.draw_dropped();
        stats.command_dropped(12);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_rendered, 1);
        assert_eq!(snapshot.last_total_widgets, 4);
        assert_eq!(snapshot.dropped_payload_bytes, 12);
        assert_eq!(snapshot.total_dropped(), 2);
        assert!(!snapshot.is_clean());
        assert!(RenderStats::default().is_clean());
    }
}
