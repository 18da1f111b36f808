use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
    sync::Arc,
};

use parking_lot::Mutex;

/// Appends log lines to a file and trims it back to `max_lines` every so often.
#[derive(Clone)]
pub struct CappedFileWriter {
    path: String,
    max_lines: u32,
    unpruned: Arc<Mutex<u32>>,
}

impl CappedFileWriter {
    pub fn new(path: String, max_lines: u32) -> Self {
        Self {
            path,
            max_lines: max_lines.max(1),
            unpruned: Arc::new(Mutex::new(0)),
        }
    }

    /// Lines written between two prunes: a tenth of the cap, at least 50.
    fn prune_every(&self) -> u32 {
        (self.max_lines / 10).max(50)
    }

    fn prune(&self) -> io::Result<()> {
        if !Path::new(&self.path).exists() {
            return Ok(());
        }

        let lines: Vec<String> = BufReader::new(File::open(&self.path)?)
            .lines()
            .collect::<Result<_, _>>()?;

        let cap = self.max_lines as usize;
        if lines.len() > cap {
            let mut file = File::create(&self.path)?;
            for line in &lines[lines.len() - cap..] {
                writeln!(file, "{}", line)?;
            }
        }
        Ok(())
    }
}

impl io::Write for CappedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        let mut unpruned = self.unpruned.lock();
        *unpruned += buf.iter().filter(|&&b| b == b'\n').count() as u32;
        if *unpruned >= self.prune_every() {
            if let Err(e) = self.prune() {
                eprintln!("Failed to prune log file: {}", e);
            }
            *unpruned = 0;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CappedFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_lines() {
        let path = std::env::temp_dir().join(format!("caramella-log-{}.log", uuid::Uuid::new_v4()));
        let path_str = path.to_string_lossy().into_owned();
        let mut writer = CappedFileWriter::new(path_str, 10);

        for i in 0..100 {
            writer.write_all(format!("line {}\n", i).as_bytes()).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines.first(), Some(&"line 90"));
        assert_eq!(lines.last(), Some(&"line 99"));
        let _ = std::fs::remove_file(&path);
    }
}
