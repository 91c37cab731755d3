//! IGV-format trace output for activity profiles and region decisions.
//!
//! Rows are written tab-delimited with 0-based half-open coordinates, the
//! convention genome browsers expect, converted from the engine's 1-based
//! closed intervals at the boundary. Numbers go through itoa/ryu buffers to
//! keep trace writing off the allocator on hot paths.

use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::genome::Genome;
use crate::interval::Interval;

/// Writes one track of per-interval values in IGV format.
pub struct TrackWriter<W: Write> {
    writer: BufWriter<W>,
    int_buf: itoa::Buffer,
    float_buf: ryu::Buffer,
}

impl<W: Write> TrackWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            int_buf: itoa::Buffer::new(),
            float_buf: ryu::Buffer::new(),
        }
    }

    /// Write the track header. `graph_type` is an IGV rendering hint
    /// ("line", "points"); `columns` names the value columns.
    pub fn write_header(&mut self, graph_type: &str, columns: &[&str]) -> Result<()> {
        writeln!(self.writer, "#track graphType={graph_type}")?;
        write!(self.writer, "Chromosome\tStart\tEnd\tFeature")?;
        for column in columns {
            write!(self.writer, "\t{column}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    /// Write one row covering `interval`, converting to 0-based half-open.
    pub fn write_row(
        &mut self,
        genome: &Genome,
        interval: &Interval,
        feature: &str,
        values: &[f64],
    ) -> Result<()> {
        match genome.contig_name(interval.contig) {
            Some(name) => self.writer.write_all(name.as_bytes())?,
            // Contig outside the dictionary: fall back to its raw index
            None => self
                .writer
                .write_all(self.int_buf.format(interval.contig).as_bytes())?,
        }
        self.writer.write_all(b"\t")?;
        // Intervals are 1-based; saturate rather than underflow on a
        // degenerate 0 start
        self.writer
            .write_all(self.int_buf.format(interval.start.saturating_sub(1)).as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer
            .write_all(self.int_buf.format(interval.stop).as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(feature.as_bytes())?;
        for value in values {
            self.writer.write_all(b"\t")?;
            self.writer
                .write_all(self.float_buf.format(*value).as_bytes())?;
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush buffered rows to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> std::fmt::Debug for TrackWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackWriter").finish_non_exhaustive()
    }
}
