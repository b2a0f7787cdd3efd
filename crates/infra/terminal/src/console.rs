//! Line-oriented prompt over any async reader.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

/// Reads answers line by line and writes prompts to `out`.
pub struct Console<R, W> {
    lines: Lines<BufReader<R>>,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            out,
        }
    }

    /// Prints `label` and reads one trimmed line. `None` at end of input.
    pub async fn ask(&mut self, label: &str) -> std::io::Result<Option<String>> {
        write!(self.out, "{label}: ")?;
        self.out.flush()?;
        let line = self.lines.next_line().await?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    /// Prints one line.
    pub fn say(&mut self, message: &str) -> std::io::Result<()> {
        writeln!(self.out, "{message}")
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
