//! Contig dictionary: names, lengths, and genome-order indices.
//!
//! Parses .genome files (tab-delimited: contig\tlength). The declaration
//! order of contigs defines genome order; intervals and reads refer to
//! contigs by index into this dictionary.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::interval::Interval;

/// Genome information containing contig names and sizes.
/// Preserves contig order from the input file.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    names: Vec<String>,
    lengths: Vec<u64>,
    index: HashMap<String, u32>,
}

impl Genome {
    /// Create an empty genome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a genome from a file.
    /// Format: tab-delimited with contig\tlength per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut genome = Self::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(EngineError::Parse {
                    line: line_num + 1,
                    message: "Genome file requires two columns: contig and length".to_string(),
                });
            }

            let length: u64 = fields[1].parse().map_err(|_| EngineError::Parse {
                line: line_num + 1,
                message: format!("Invalid contig length: {}", fields[1]),
            })?;

            genome.insert(fields[0], length);
        }

        Ok(genome)
    }

    /// Insert a contig, returning its index. Re-inserting an existing name
    /// updates the length and returns the original index.
    pub fn insert(&mut self, name: &str, length: u64) -> u32 {
        if let Some(&idx) = self.index.get(name) {
            self.lengths[idx as usize] = length;
            return idx;
        }
        let idx = self.names.len() as u32;
        self.names.push(name.to_string());
        self.lengths.push(length);
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Look up a contig index by name.
    #[inline]
    pub fn contig_index(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    /// Look up a contig name by index.
    #[inline]
    pub fn contig_name(&self, contig: u32) -> Option<&str> {
        self.names.get(contig as usize).map(|s| s.as_str())
    }

    /// Length of a contig in bp, or 0 if the index is unknown.
    #[inline]
    pub fn contig_length(&self, contig: u32) -> u64 {
        self.lengths.get(contig as usize).copied().unwrap_or(0)
    }

    /// An interval spanning an entire contig.
    pub fn contig_span(&self, contig: u32) -> Option<Interval> {
        let length = self.contig_length(contig);
        if length == 0 {
            None
        } else {
            Some(Interval::new(contig, 1, length))
        }
    }

    /// All contig names in genome order.
    pub fn contigs(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }

    /// Number of contigs.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_genome_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t1000000").unwrap();
        writeln!(file, "chr2\t500000").unwrap();
        writeln!(file, "# comment line").unwrap();
        writeln!(file, "chr3\t250000").unwrap();

        let genome = Genome::from_file(file.path()).unwrap();

        assert_eq!(genome.len(), 3);
        assert_eq!(genome.contig_index("chr1"), Some(0));
        assert_eq!(genome.contig_index("chr3"), Some(2));
        assert_eq!(genome.contig_index("chr4"), None);
        assert_eq!(genome.contig_length(1), 500000);
        assert_eq!(genome.contig_name(2), Some("chr3"));
    }

    #[test]
    fn test_genome_bad_length() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\tnot-a-number").unwrap();

        let result = Genome::from_file(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_genome_order_is_declaration_order() {
        let mut genome = Genome::new();
        // Genome order, not lexicographic: chr9 before chr10
        let chr9 = genome.insert("chr9", 1000);
        let chr10 = genome.insert("chr10", 2000);

        assert!(chr9 < chr10);
        assert_eq!(genome.contig_span(chr9), Some(Interval::new(chr9, 1, 1000)));
    }
}
