//! Header row plus data rows of one uploaded export, before any interpretation.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First `n` data rows, for the classifier and the manual-mapping prompt.
    pub fn sample(&self, n: usize) -> Vec<Vec<String>> {
        self.rows.iter().take(n).cloned().collect()
    }
}
