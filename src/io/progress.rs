//! Progress events and sub-range composition.
//!
//! Every event carries the stage-local `(current, total)` counts the stage
//! naturally has (rows, images, archive entries) plus a `percent` on the
//! caller's overall 0-100 scale. A [`ProgressReporter`] owns a band of that
//! scale; [`ProgressReporter::band`] carves a sub-band out of it, so a
//! pipeline step reporting its own 0-100 can be nested inside a larger one
//! (extraction in 0-50 of an archive import, for example).

use std::fmt;

/// Pipeline stage named in a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Setting up staging areas and counting inputs.
    Preparing,
    /// Writing or reading item rows.
    Items,
    /// Writing or reading transaction rows.
    Transactions,
    /// Copying image files.
    Images,
    /// Building the archive.
    Packaging,
    /// Unpacking an archive.
    Extracting,
    /// Finished successfully.
    Complete,
}

impl Stage {
    /// Returns the stage as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Items => "items",
            Self::Transactions => "transactions",
            Self::Images => "images",
            Self::Packaging => "packaging",
            Self::Extracting => "extracting",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Current stage.
    pub stage: Stage,
    /// Units done within the stage.
    pub current: usize,
    /// Units expected within the stage.
    pub total: usize,
    /// Position on the caller's overall 0-100 scale.
    pub percent: u8,
    /// Human-readable message.
    pub message: String,
}

/// Progress callback invoked zero or more times per call.
pub type ProgressCallback<'a> = dyn Fn(&Progress) + Send + Sync + 'a;

/// Maps stage-local counts onto a band of the overall progress scale.
#[derive(Clone, Copy)]
pub struct ProgressReporter<'a> {
    callback: Option<&'a ProgressCallback<'a>>,
    start: u32,
    end: u32,
}

impl fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("attached", &self.callback.is_some())
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

impl<'a> ProgressReporter<'a> {
    /// Creates a reporter spanning the whole 0-100 scale.
    #[must_use]
    pub const fn new(callback: Option<&'a ProgressCallback<'a>>) -> Self {
        Self {
            callback,
            start: 0,
            end: 100,
        }
    }

    /// Creates a reporter that discards every event.
    #[must_use]
    pub const fn silent() -> Self {
        Self::new(None)
    }

    /// Returns a reporter for `start..=end` percent of this reporter's band.
    #[must_use]
    pub fn band(&self, start: u32, end: u32) -> Self {
        let (start, end) = (start.min(100), end.clamp(start.min(100), 100));
        let span = self.end - self.start;
        Self {
            callback: self.callback,
            start: self.start + span * start / 100,
            end: self.start + span * end / 100,
        }
    }

    /// Emits an event for `current` of `total` units of `stage`.
    ///
    /// A zero `total` maps to the end of the band.
    pub fn report(&self, stage: Stage, current: usize, total: usize, message: impl Into<String>) {
        let Some(callback) = self.callback else {
            return;
        };
        callback(&Progress {
            stage,
            current,
            total,
            percent: self.percent_of(current, total),
            message: message.into(),
        });
    }

    /// Emits the entry event of `stage` at the start of the band, whatever `total` is.
    pub fn begin(&self, stage: Stage, total: usize, message: impl Into<String>) {
        let Some(callback) = self.callback else {
            return;
        };
        callback(&Progress {
            stage,
            current: 0,
            total,
            percent: u8::try_from(self.start).unwrap_or(100),
            message: message.into(),
        });
    }

    /// Emits the terminal `complete` event with `current = total = 100`.
    pub fn complete(&self, message: impl Into<String>) {
        self.report(Stage::Complete, 100, 100, message);
    }

    fn percent_of(&self, current: usize, total: usize) -> u8 {
        let span = u64::from(self.end - self.start);
        let offset = if total == 0 {
            span
        } else {
            let current = current.min(total) as u64;
            span * current / total as u64
        };
        u8::try_from(u64::from(self.start) + offset).unwrap_or(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collect() -> (Mutex<Vec<Progress>>, impl Fn(&Mutex<Vec<Progress>>) -> Vec<u8>) {
        (Mutex::new(Vec::new()), |events: &Mutex<Vec<Progress>>| {
            events.lock().unwrap().iter().map(|p| p.percent).collect()
        })
    }

    #[test]
    fn test_full_scale_percent() {
        let (events, percents) = collect();
        let cb = |p: &Progress| events.lock().unwrap().push(p.clone());
        let reporter = ProgressReporter::new(Some(&cb));

        reporter.report(Stage::Items, 0, 4, "start");
        reporter.report(Stage::Items, 2, 4, "half");
        reporter.report(Stage::Items, 4, 4, "done");
        reporter.complete("complete");

        assert_eq!(percents(&events), vec![0, 50, 100, 100]);
        let last = events.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.stage, Stage::Complete);
        assert_eq!((last.current, last.total), (100, 100));
    }

    #[test]
    fn test_band_composes() {
        let (events, percents) = collect();
        let cb = |p: &Progress| events.lock().unwrap().push(p.clone());
        let reporter = ProgressReporter::new(Some(&cb));

        let extraction = reporter.band(20, 50);
        extraction.report(Stage::Extracting, 0, 10, "");
        extraction.report(Stage::Extracting, 10, 10, "");

        let nested = reporter.band(50, 100).band(50, 100);
        nested.report(Stage::Items, 0, 1, "");
        nested.complete("");

        assert_eq!(percents(&events), vec![20, 50, 75, 100]);
    }

    #[test]
    fn test_raw_counts_pass_through() {
        let (events, _) = collect();
        let cb = |p: &Progress| events.lock().unwrap().push(p.clone());
        ProgressReporter::new(Some(&cb))
            .band(60, 90)
            .report(Stage::Images, 3, 12, "image 3");

        let event = events.lock().unwrap()[0].clone();
        assert_eq!((event.current, event.total), (3, 12));
        assert_eq!(event.percent, 67);
    }

    #[test]
    fn test_zero_total_and_overshoot() {
        let (events, percents) = collect();
        let cb = |p: &Progress| events.lock().unwrap().push(p.clone());
        let reporter = ProgressReporter::new(Some(&cb)).band(10, 30);
        reporter.report(Stage::Items, 0, 0, "");
        reporter.report(Stage::Items, 9, 3, "");
        assert_eq!(percents(&events), vec![30, 30]);
    }

    #[test]
    fn test_begin_reports_band_start_for_empty_stage() {
        let (events, percents) = collect();
        let cb = |p: &Progress| events.lock().unwrap().push(p.clone());
        let reporter = ProgressReporter::new(Some(&cb)).band(90, 99);
        reporter.begin(Stage::Packaging, 0, "nothing to package");
        reporter.report(Stage::Packaging, 0, 0, "done");

        assert_eq!(percents(&events), vec![90, 99]);
        let first = events.lock().unwrap()[0].clone();
        assert_eq!((first.current, first.total), (0, 0));
    }

    #[test]
    fn test_silent_reporter() {
        ProgressReporter::silent().report(Stage::Items, 1, 2, "ignored");
    }
}
