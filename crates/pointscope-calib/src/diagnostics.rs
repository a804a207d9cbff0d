use std::fmt;

/// A recoverable problem found while reading a calibration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number, when the problem is tied to a line.
    pub line: Option<usize>,
    /// What was skipped or found inconsistent.
    pub message: String,
}

impl Diagnostic {
    /// A diagnostic about a specific line.
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            message: message.into(),
        }
    }

    /// A diagnostic about the file as a whole.
    pub fn global(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A parsed value together with the diagnostics collected on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    /// The parsed value.
    pub value: T,
    /// Lines that were skipped and warnings about the content.
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Parsed<T> {
    /// Wrap a value with its diagnostics.
    pub fn new(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// Convert the value, keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    /// Emit every diagnostic with `log::warn!` and return the value.
    pub fn log_diagnostics(self, source: &str) -> T {
        for diagnostic in &self.diagnostics {
            log::warn!("{source}: {diagnostic}");
        }
        self.value
    }
}
