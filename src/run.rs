//! Run parameters: the NDRange for one benchmark configuration

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Global/local work-item grid dimensions for one kernel launch,
/// parsed from one six-column CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Global work-item counts per dimension
    pub global: [u32; 3],
    /// Work-group sizes per dimension
    pub local: [u32; 3],
}

impl Run {
    /// Parse one CSV line of exactly six unsigned integers.
    pub fn from_csv_line(line: &str) -> Result<Self> {
        let fields: Vec<u32> = line
            .split(',')
            .map(|tok| {
                tok.trim()
                    .parse::<u32>()
                    .map_err(|_| Error::load("<run csv>", format!("bad field '{}'", tok.trim())))
            })
            .collect::<Result<_>>()?;
        let [g1, g2, g3, l1, l2, l3] = fields[..] else {
            return Err(Error::load(
                "<run csv>",
                format!("expected 6 fields, got {}", fields.len()),
            ));
        };
        Ok(Self {
            global: [g1, g2, g3],
            local: [l1, l2, l3],
        })
    }

    /// Load every run row from a CSV file, skipping blank lines.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Run>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::load(path.display().to_string(), e.to_string()))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(Run::from_csv_line)
            .collect()
    }

    /// Work items per work group
    pub fn num_work_items(&self) -> u64 {
        self.local.iter().map(|&l| u64::from(l)).product()
    }

    /// Workgroup count per dimension (global size divided by local size,
    /// rounded up)
    pub fn workgroups(&self) -> [u32; 3] {
        [
            self.global[0].div_ceil(self.local[0].max(1)),
            self.global[1].div_ceil(self.local[1].max(1)),
            self.global[2].div_ceil(self.local[2].max(1)),
        ]
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} {} {} / {} {} {}}}",
            self.global[0], self.global[1], self.global[2],
            self.local[0], self.local[1], self.local[2]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_fields() {
        let run = Run::from_csv_line("1024,1,1,128,1,1").unwrap();
        assert_eq!(run.global, [1024, 1, 1]);
        assert_eq!(run.local, [128, 1, 1]);
        assert_eq!(run.num_work_items(), 128);
        assert_eq!(run.workgroups(), [8, 1, 1]);
    }

    #[test]
    fn wrong_field_count_is_an_error() {
        assert!(Run::from_csv_line("1,2,3,4,5").is_err());
        assert!(Run::from_csv_line("1,2,3,4,5,6,7").is_err());
    }

    #[test]
    fn display_matches_sweep_logs() {
        let run = Run::from_csv_line("64,1,1,32,1,1").unwrap();
        assert_eq!(run.to_string(), "{64 1 1 / 32 1 1}");
    }
}
