use crate::evaluation::{EpisodeOutcome, EvaluationSummary};

/// Something worth narrating while an evaluation runs.
#[derive(Debug, Clone, Copy)]
pub enum Report<'a> {
    /// A finished episode, `index` counts from zero in call order.
    Episode {
        index: usize,
        outcome: &'a EpisodeOutcome,
    },
    Summary(&'a EvaluationSummary),
}

/// Receives reports from the evaluation driver. The driver only measures, rendering the
/// measurements is entirely up to the sink.
pub trait ReportSink {
    fn report(&mut self, report: Report<'_>);
}

impl<F: FnMut(Report<'_>)> ReportSink for F {
    fn report(&mut self, report: Report<'_>) {
        self(report)
    }
}

/// Discards everything.
pub struct NullSink;

impl ReportSink for NullSink {
    fn report(&mut self, _report: Report<'_>) {}
}
