//! Line splitter: turns one raw line into `(column, statement_text)` pairs.

use indexmap::IndexMap;
use regex::Regex;

/// How a matched delimiter's text is folded into the surrounding statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// The delimiter text is dropped.
    Skip,
    /// The delimiter text is appended to the statement before it.
    WithPrevious,
    /// The delimiter text is prepended to the statement after it.
    WithNext,
}

/// The retention mode and stop-after behavior configured for one delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterSpec {
    /// How the delimiter's own text is retained.
    pub retention: Retention,
    /// If set, splitting stops after this delimiter: the remainder of the
    /// line (plus any pending carry) is emitted as one final statement.
    pub terminate: bool,
}

impl DelimiterSpec {
    /// A delimiter whose text is dropped and that does not stop splitting.
    pub fn skip() -> Self {
        DelimiterSpec {
            retention: Retention::Skip,
            terminate: false,
        }
    }

    /// A delimiter whose text is appended to the preceding statement.
    pub fn with_previous() -> Self {
        DelimiterSpec {
            retention: Retention::WithPrevious,
            terminate: false,
        }
    }

    /// A delimiter whose text is prepended to the following statement.
    pub fn with_next() -> Self {
        DelimiterSpec {
            retention: Retention::WithNext,
            terminate: false,
        }
    }

    /// Sets the stop-after-match flag.
    pub fn terminating(mut self) -> Self {
        self.terminate = true;
        self
    }
}

/// An ordered table mapping literal delimiter strings to their retention
/// configuration. Declaration order doubles as the alternation's
/// disambiguation order, since `regex` matches alternatives leftmost-first.
#[derive(Debug, Clone, Default)]
pub struct Delimiters {
    entries: IndexMap<String, DelimiterSpec>,
}

impl Delimiters {
    /// An empty delimiter table (degenerates to one emission per line).
    pub fn new() -> Self {
        Delimiters::default()
    }

    /// Declares one delimiter, in declaration order.
    pub fn with(mut self, delimiter: impl Into<String>, spec: DelimiterSpec) -> Self {
        self.entries.insert(delimiter.into(), spec);
        self
    }

    /// The default table: end-of-line only (i.e. no delimiters — the whole
    /// line is one statement), matching §4.I's documented default.
    pub fn end_of_line_only() -> Self {
        Delimiters::new()
    }

    fn compile(&self) -> Option<Regex> {
        if self.entries.is_empty() {
            return None;
        }
        let pattern = self
            .entries
            .keys()
            .map(|d| regex::escape(d))
            .collect::<Vec<_>>()
            .join("|");
        Some(Regex::new(&pattern).expect("delimiter alternation is well-formed"))
    }
}

/// Splits raw lines into `(column, statement_text)` pairs per §4.B.
pub struct Splitter {
    delimiters: Delimiters,
    pattern: Option<Regex>,
}

impl Splitter {
    /// Builds a splitter from a delimiter table, compiling its pattern once.
    pub fn new(delimiters: Delimiters) -> Self {
        let pattern = delimiters.compile();
        Splitter { delimiters, pattern }
    }

    /// Splits one line (newline already stripped) into `(column, text)`
    /// pairs, optionally trimming each result of leading/trailing
    /// whitespace. Reported columns always refer to the pre-strip text.
    pub fn split(&self, line: &str, strip_spaces: bool) -> Vec<(i64, String)> {
        let mut out = self.split_raw(line);
        if strip_spaces {
            for (_, text) in out.iter_mut() {
                let trimmed = text.trim();
                if trimmed.len() != text.len() {
                    *text = trimmed.to_string();
                }
            }
        }
        out
    }

    fn split_raw(&self, line: &str) -> Vec<(i64, String)> {
        let Some(pattern) = &self.pattern else {
            return vec![(0, line.to_string())];
        };

        let mut out = Vec::new();
        let mut pos = 0usize;
        let mut carry = String::new();

        for m in pattern.find_iter(line) {
            let before = &line[pos..m.start()];
            let delim_text = m.as_str();
            let spec = self
                .delimiters
                .entries
                .get(delim_text)
                .expect("matched text is one of the configured delimiters");

            let col = pos as i64 - carry.len() as i64;
            match spec.retention {
                Retention::Skip => {
                    out.push((col, format!("{carry}{before}")));
                    carry.clear();
                }
                Retention::WithPrevious => {
                    out.push((col, format!("{carry}{before}{delim_text}")));
                    carry.clear();
                }
                Retention::WithNext => {
                    out.push((col, format!("{carry}{before}")));
                    carry = delim_text.to_string();
                }
            }
            pos = m.end();

            if spec.terminate {
                let rest = &line[pos..];
                let col = pos as i64 - carry.len() as i64;
                out.push((col, format!("{carry}{rest}")));
                return out;
            }
        }

        let rest = &line[pos..];
        let col = pos as i64 - carry.len() as i64;
        out.push((col, format!("{carry}{rest}")));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_delimiter_set_is_one_emission() {
        let s = Splitter::new(Delimiters::new());
        assert_eq!(
            s.split("hello world", false),
            vec![(0, "hello world".to_string())]
        );
    }

    #[test]
    fn skip_drops_delimiter_text() {
        let s = Splitter::new(Delimiters::new().with(";", DelimiterSpec::skip()));
        assert_eq!(
            s.split("a;b;c", false),
            vec![(0, "a".to_string()), (2, "b".to_string()), (4, "c".to_string())]
        );
    }

    #[test]
    fn with_previous_keeps_delimiter_on_left() {
        let s = Splitter::new(Delimiters::new().with(";", DelimiterSpec::with_previous()));
        assert_eq!(
            s.split("a;b;c", false),
            vec![(0, "a;".to_string()), (2, "b;".to_string()), (4, "c".to_string())]
        );
    }

    #[test]
    fn with_next_carries_and_shifts_column() {
        let s = Splitter::new(Delimiters::new().with(";", DelimiterSpec::with_next()));
        assert_eq!(
            s.split("a;b;c", false),
            vec![(0, "a".to_string()), (1, ";b".to_string()), (3, ";c".to_string())]
        );
    }

    #[test]
    fn terminate_stops_after_first_match() {
        let s = Splitter::new(
            Delimiters::new().with("#", DelimiterSpec::skip().terminating()),
        );
        assert_eq!(
            s.split("x = 1 # trailing comment # more", false),
            vec![(0, "x = 1 ".to_string()), (7, " trailing comment # more".to_string())]
        );
    }

    #[test]
    fn strip_spaces_trims_but_column_is_pre_strip() {
        // " a ; b " splits (pre-strip) into " a " at column 0 and " b " at
        // column 4 (right after the ';' at index 3); stripping shortens the
        // text but never shifts the reported column, since columns are
        // byte offsets into the original, pre-strip line (§3 "Position").
        let s = Splitter::new(Delimiters::new().with(";", DelimiterSpec::skip()));
        assert_eq!(
            s.split(" a ; b ", true),
            vec![(0, "a".to_string()), (4, "b".to_string())]
        );
    }

    #[test]
    fn skip_then_rejoin_reproduces_input_without_terminate() {
        let s = Splitter::new(Delimiters::new().with(",", DelimiterSpec::skip()));
        let parts = s.split("a,b,c", false);
        let rejoined = parts
            .iter()
            .map(|(_, t)| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(rejoined, "a,b,c");
    }
}
