use std::io::{self, Write};

/// Width of the bracketed bar, in glyphs.
pub const BAR_WIDTH: usize = 50;

const DEFAULT_GRAPH: &str = "█";

/// Destination for live progress output. Defaults to stderr.
pub type DiagnosticSink = Box<dyn Write + Send>;

/// Counters behind the rendered bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub current: u64,
    pub total: u64,
    pub percent: u64,
    pub rendered: String,
}

/// Single-line progress bar redrawn in place on the diagnostic sink.
///
/// Each [`ProgressBar::play`] writes `\r[<bar>]<percent>% <current>/<total>` without a trailing
/// newline so the next call overwrites it; [`ProgressBar::finish`] terminates the line.
pub struct ProgressBar<W: Write> {
    state: ProgressState,
    graph: String,
    sink: W,
}

impl<W: Write> ProgressBar<W> {
    pub fn new(start: u64, total: u64, sink: W) -> Self {
        Self::with_graph(start, total, DEFAULT_GRAPH, sink)
    }

    /// Same as [`ProgressBar::new`] with a custom fill glyph.
    pub fn with_graph(start: u64, total: u64, graph: impl Into<String>, sink: W) -> Self {
        let graph = graph.into();
        let percent = percent_of(start, total);
        Self {
            state: ProgressState {
                current: start,
                total,
                percent,
                rendered: fill(&graph, percent),
            },
            graph,
            sink,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Updates the total for sources whose length is discovered while dispatching.
    pub fn set_total(&mut self, total: u64) {
        self.state.total = total;
    }

    pub fn play(&mut self, current: u64) -> io::Result<()> {
        self.state.current = current;
        let last = self.state.percent;
        self.state.percent = percent_of(current, self.state.total);
        if self.state.percent != last {
            self.state.rendered = fill(&self.graph, self.state.percent);
        }

        write!(
            self.sink,
            "\r[{:<width$}]{:>3}% {:>8}/{}",
            self.state.rendered,
            self.state.percent,
            self.state.current,
            self.state.total,
            width = BAR_WIDTH,
        )?;
        self.sink.flush()
    }

    pub fn finish(&mut self) -> io::Result<()> {
        writeln!(self.sink)?;
        self.sink.flush()
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}

fn percent_of(current: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let percent = (u128::from(current) * 100) / u128::from(total);
    percent.min(100) as u64
}

// One glyph per two percent, rounded up.
fn fill(graph: &str, percent: u64) -> String {
    let glyphs = (percent.div_ceil(2) as usize).min(BAR_WIDTH);
    graph.repeat(glyphs)
}
