//! Plain-text rendering of a finished [`BatchSummary`].

use crate::processor::summary::BatchSummary;
use std::fmt;
use std::io::{self, Write};

const RULE: &str = "  --------";

impl BatchSummary {
    /// Writes the report: title box, headers, failures, then the results footer.
    pub fn write_report<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{self}")
    }

    fn fmt_headers(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = self.title() {
            let bars = "-".repeat(title.chars().count());
            writeln!(f, "  {bars}")?;
            writeln!(f, "  {title}")?;
            writeln!(f, "  {bars}")?;
        }

        let width = self
            .headers()
            .keys()
            .map(|key| key.chars().count())
            .max()
            .unwrap_or(0);
        for (key, value) in self.headers() {
            writeln!(f, " {key:>width$}: {value}")?;
        }
        Ok(())
    }

    fn fmt_failures(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "   Errors")?;
        writeln!(f, "{RULE}")?;
        for failure in self.failures() {
            writeln!(f, "{failure}")?;
        }
        Ok(())
    }

    fn fmt_footer(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "  Results")?;
        writeln!(f, "{RULE}")?;
        match self.finished_at() {
            Some(finished) => writeln!(f, "  Finished: {finished}")?,
            None => writeln!(f, "  Finished: -")?,
        }
        writeln!(f, " Processed: {}", self.processed())?;
        writeln!(f, "    Failed: {}", self.failures().len())?;
        writeln!(f, "   Elapsed: {}ms", self.elapsed().as_millis())?;
        writeln!(f, "   Average: {}ms", self.average().as_millis())
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_headers(f)?;
        writeln!(f)?;
        self.fmt_failures(f)?;
        writeln!(f)?;
        self.fmt_footer(f)
    }
}
