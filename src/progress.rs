//! Live build status on stderr.
//!
//! A build runs three phases: parallel extraction, the single-writer merge
//! and reference resolution. Each phase is announced with [`Progress::begin`]
//! and advanced with [`Progress::step`] (or [`Progress::file_extracted`],
//! which also counts parse failures). The live line reads like
//! `[1/3] Extracting 40/120 files, 2 failed to parse`.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::pipeline::RunSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    Silent,
    /// One line rewritten with `\r`.
    InPlace,
    /// A fresh line every tenth of a phase, for dumb terminals and screen readers.
    LineBased,
}

/// Silent when asked to be, or when stderr is not a terminal.
pub fn detect_mode(suppress: bool) -> ProgressMode {
    if suppress || !std::io::stderr().is_terminal() {
        return ProgressMode::Silent;
    }
    match std::env::var("TERM").ok().as_deref() {
        None | Some("dumb") => ProgressMode::LineBased,
        _ => ProgressMode::InPlace,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Extract = 0,
    Merge = 1,
    Resolve = 2,
}

impl Phase {
    const ALL: [Phase; 3] = [Phase::Extract, Phase::Merge, Phase::Resolve];

    fn from_index(i: u8) -> Phase {
        Self::ALL.get(usize::from(i)).copied().unwrap_or(Phase::Extract)
    }

    fn label(self) -> &'static str {
        match self {
            Phase::Extract => "Extracting",
            Phase::Merge => "Merging",
            Phase::Resolve => "Resolving",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Phase::Extract | Phase::Merge => "files",
            Phase::Resolve => "references",
        }
    }
}

/// Shared by the rayon workers during extraction; every counter is atomic.
pub struct Progress {
    mode: ProgressMode,
    phase: AtomicU8,
    total: AtomicUsize,
    done: AtomicUsize,
    failed: AtomicUsize,
    /// Highest percentage bucket already rendered in this phase.
    rendered: AtomicUsize,
}

impl Progress {
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            phase: AtomicU8::new(Phase::Extract as u8),
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            rendered: AtomicUsize::new(0),
        }
    }

    pub fn silent() -> Self {
        Self::new(ProgressMode::Silent)
    }

    /// Start `phase` over `total` units. The parse-failure count carries over
    /// from extraction into the merge line.
    pub fn begin(&self, phase: Phase, total: usize) {
        self.phase.store(phase as u8, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        self.rendered.store(0, Ordering::Relaxed);
        if phase == Phase::Extract {
            self.failed.store(0, Ordering::Relaxed);
        }
        self.render(0, total);
    }

    /// One file through extraction; `parsed` is false for a rejected parse.
    pub fn file_extracted(&self, parsed: bool) {
        if !parsed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.step(1);
    }

    pub fn step(&self, n: usize) {
        let current = self.done.fetch_add(n, Ordering::Relaxed) + n;
        let total = self.total.load(Ordering::Relaxed);
        if self.due(current, total) {
            self.render(current, total);
        }
    }

    /// Whether reaching `current` crosses into a bucket not yet shown:
    /// every percent in place, every ten percent line by line.
    fn due(&self, current: usize, total: usize) -> bool {
        let width = match self.mode {
            ProgressMode::Silent => return false,
            ProgressMode::InPlace => 1,
            ProgressMode::LineBased => 10,
        };
        if total == 0 || current >= total {
            return true;
        }
        let bucket = current * 100 / total / width * width;
        bucket > self.rendered.fetch_max(bucket, Ordering::Relaxed)
    }

    fn live_line(&self, current: usize, total: usize) -> String {
        let phase = Phase::from_index(self.phase.load(Ordering::Relaxed));
        let mut line = format!(
            "[{}/{}] {} {current}/{total} {}",
            phase as u8 + 1,
            Phase::ALL.len(),
            phase.label(),
            phase.unit(),
        );
        let failed = self.failed.load(Ordering::Relaxed);
        if failed > 0 && phase != Phase::Resolve {
            line.push_str(&format!(", {failed} failed to parse"));
        }
        line
    }

    fn render(&self, current: usize, total: usize) {
        match self.mode {
            ProgressMode::Silent => {}
            ProgressMode::InPlace => eprint!("\r{:<80}", self.live_line(current, total)),
            ProgressMode::LineBased => eprintln!("{}", self.live_line(current, total)),
        }
    }

    pub fn finish(&self, summary: &RunSummary) {
        match self.mode {
            ProgressMode::Silent => {}
            ProgressMode::InPlace => eprintln!("\r{:<80}", summary_line(summary)),
            ProgressMode::LineBased => eprintln!("{}", summary_line(summary)),
        }
    }
}

fn summary_line(summary: &RunSummary) -> String {
    let mut line = format!("Built graph from {} files", summary.files_processed);
    if summary.files_failed_parse > 0 {
        line.push_str(&format!(" ({} failed to parse)", summary.files_failed_parse));
    }
    line.push_str(&format!(
        ": {} definitions, {} references, {} resolved in {:.1}s",
        summary.definitions,
        summary.references,
        summary.resolution.resolved,
        summary.elapsed.as_secs_f64(),
    ));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn extract_line_counts_parse_failures() {
        let p = Progress::new(ProgressMode::LineBased);
        p.begin(Phase::Extract, 120);
        assert_eq!(p.live_line(0, 120), "[1/3] Extracting 0/120 files");
        p.file_extracted(true);
        p.file_extracted(false);
        p.file_extracted(false);
        assert_eq!(
            p.live_line(3, 120),
            "[1/3] Extracting 3/120 files, 2 failed to parse"
        );
    }

    #[test]
    fn failures_carry_into_merge_but_not_resolve() {
        let p = Progress::silent();
        p.begin(Phase::Extract, 2);
        p.file_extracted(false);
        p.file_extracted(true);

        p.begin(Phase::Merge, 2);
        assert_eq!(p.done.load(Ordering::Relaxed), 0);
        assert_eq!(p.live_line(1, 2), "[2/3] Merging 1/2 files, 1 failed to parse");

        p.begin(Phase::Resolve, 50);
        p.step(50);
        assert_eq!(p.live_line(50, 50), "[3/3] Resolving 50/50 references");
    }

    #[test]
    fn concurrent_workers_count_every_file() {
        let p = Arc::new(Progress::silent());
        p.begin(Phase::Extract, 400);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&p);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        p.file_extracted(i % 10 != 0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(p.done.load(Ordering::Relaxed), 400);
        assert_eq!(p.failed.load(Ordering::Relaxed), 40);
    }

    #[test]
    fn line_mode_renders_each_tenth_once() {
        let p = Progress::new(ProgressMode::LineBased);
        p.total.store(100, Ordering::Relaxed);
        assert!(!p.due(5, 100));
        assert!(p.due(10, 100));
        assert!(!p.due(11, 100));
        assert!(!p.due(10, 100));
        assert!(p.due(25, 100));
        assert!(p.due(100, 100));
        assert!(!Progress::silent().due(100, 100));
    }

    #[test]
    fn in_place_mode_renders_each_percent() {
        let p = Progress::new(ProgressMode::InPlace);
        assert!(p.due(1, 100));
        assert!(!p.due(1, 100));
        assert!(p.due(2, 100));
    }

    fn summary(failed: usize) -> RunSummary {
        let mut summary = RunSummary {
            files_processed: 100,
            files_failed_parse: failed,
            definitions: 500,
            references: 2000,
            elapsed: Duration::from_secs_f64(1.5),
            ..RunSummary::default()
        };
        summary.resolution.resolved = 1200;
        summary
    }

    #[test]
    fn summary_line_mentions_failures_only_when_present() {
        assert_eq!(
            summary_line(&summary(0)),
            "Built graph from 100 files: 500 definitions, 2000 references, 1200 resolved in 1.5s"
        );
        assert_eq!(
            summary_line(&summary(3)),
            "Built graph from 100 files (3 failed to parse): 500 definitions, 2000 references, 1200 resolved in 1.5s"
        );
    }

    #[test]
    fn suppressed_mode_is_silent() {
        assert_eq!(detect_mode(true), ProgressMode::Silent);
        Progress::silent().finish(&summary(1));
    }
}
