//! Record persistence
//!
//! A [`RecordSink`] receives the listing of a source once and then every
//! resolved record as soon as it is built.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::types::{AnimeRecord, ListingEntry};

/// Destination for crawl output
pub trait RecordSink {
    /// Store the complete listing of a source
    fn write_listing(&mut self, source: &str, entries: &[ListingEntry]) -> Result<()>;

    /// Store one resolved record
    fn write_record(&mut self, record: &AnimeRecord) -> Result<()>;
}

/// Writes `<source>_list.json` and appends records to `<source>.jsonl`.
///
/// The record file of a source is truncated the first time this sink
/// opens it, so each run starts from an empty file. Every record is
/// flushed as soon as it is written, so an interrupted crawl loses at most
/// the record in flight.
pub struct JsonFileSink {
    dir: PathBuf,
    records: Option<(String, BufWriter<File>)>,
    started: HashSet<String>,
}

impl JsonFileSink {
    /// Create a sink writing into `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            records: None,
            started: HashSet::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn listing_path(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{}_list.json", source))
    }

    pub fn records_path(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", source))
    }

    /// Writer for the record file of `source`, opened on first use
    fn records_writer(&mut self, source: &str) -> Result<&mut BufWriter<File>> {
        let current = match self.records.take() {
            Some((open, writer)) if open == source => (open, writer),
            _ => {
                let path = self.records_path(source);
                let fresh = self.started.insert(source.to_string());
                let file = if fresh {
                    File::create(&path)?
                } else {
                    OpenOptions::new().append(true).open(&path)?
                };
                debug!(path = %path.display(), truncated = fresh, "Opened record file");
                (source.to_string(), BufWriter::new(file))
            }
        };

        let (_, writer) = self.records.insert(current);
        Ok(writer)
    }
}

impl RecordSink for JsonFileSink {
    fn write_listing(&mut self, source: &str, entries: &[ListingEntry]) -> Result<()> {
        let path = self.listing_path(source);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer.flush()?;

        debug!(path = %path.display(), entries = entries.len(), "Wrote listing");
        Ok(())
    }

    fn write_record(&mut self, record: &AnimeRecord) -> Result<()> {
        let writer = self.records_writer(&record.source)?;
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps listings and records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub listings: Vec<(String, Vec<ListingEntry>)>,
    pub records: Vec<AnimeRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn write_listing(&mut self, source: &str, entries: &[ListingEntry]) -> Result<()> {
        self.listings.push((source.to_string(), entries.to_vec()));
        Ok(())
    }

    fn write_record(&mut self, record: &AnimeRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u32) -> ListingEntry {
        ListingEntry {
            title: format!("Тайтл {}", n),
            link: format!("https://animevost.org/tip/tv/{}-t.html", n),
            poster: None,
            section: None,
        }
    }

    #[test]
    fn test_json_file_sink_writes_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path().join("out")).unwrap();

        sink.write_listing("animevost", &[entry(1), entry(2)]).unwrap();

        let text = fs::read_to_string(sink.listing_path("animevost")).unwrap();
        assert!(text.contains('\n'), "listing should be pretty-printed");
        let parsed: Vec<ListingEntry> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, vec![entry(1), entry(2)]);
    }

    #[test]
    fn test_json_file_sink_appends_records_as_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path()).unwrap();

        let first = AnimeRecord::empty("animevost", "https://animevost.org/tip/tv/1-a.html");
        let second = AnimeRecord::empty("animevost", "https://animevost.org/tip/tv/2-b.html");
        sink.write_record(&first).unwrap();
        sink.write_record(&second).unwrap();

        // Flushed per record, readable before the sink is dropped
        let text = fs::read_to_string(sink.records_path("animevost")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: AnimeRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.link, second.link);
        assert_eq!(parsed.id, second.id);
    }

    #[test]
    fn test_json_file_sink_separates_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path()).unwrap();

        sink.write_record(&AnimeRecord::empty("animevost", "https://a.test/1-a.html"))
            .unwrap();
        sink.write_record(&AnimeRecord::empty("anidub", "https://b.test/2-b.html"))
            .unwrap();

        let vost = fs::read_to_string(sink.records_path("animevost")).unwrap();
        let dub = fs::read_to_string(sink.records_path("anidub")).unwrap();
        assert_eq!(vost.lines().count(), 1);
        assert_eq!(dub.lines().count(), 1);
    }

    #[test]
    fn test_json_file_sink_starts_fresh_each_run() {
        let dir = tempfile::tempdir().unwrap();

        for run in 0..2 {
            let mut sink = JsonFileSink::new(dir.path()).unwrap();
            sink.write_listing("animevost", &[entry(run)]).unwrap();
            sink.write_record(&AnimeRecord::empty(
                "animevost",
                &format!("https://animevost.org/tip/tv/{}-a.html", run),
            ))
            .unwrap();
        }

        let sink = JsonFileSink::new(dir.path()).unwrap();
        let text = fs::read_to_string(sink.records_path("animevost")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);

        let parsed: AnimeRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.link, "https://animevost.org/tip/tv/1-a.html");
    }

    #[test]
    fn test_json_file_sink_reopens_source_in_append_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path()).unwrap();

        sink.write_record(&AnimeRecord::empty("animevost", "https://a.test/1-a.html"))
            .unwrap();
        sink.write_record(&AnimeRecord::empty("anidub", "https://b.test/2-b.html"))
            .unwrap();
        sink.write_record(&AnimeRecord::empty("animevost", "https://a.test/3-c.html"))
            .unwrap();

        let vost = fs::read_to_string(sink.records_path("animevost")).unwrap();
        assert_eq!(vost.lines().count(), 2);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_listing("anidub", &[entry(1)]).unwrap();
        sink.write_record(&AnimeRecord::empty("anidub", "https://anidub.biz/1-a.html"))
            .unwrap();

        assert_eq!(sink.listings.len(), 1);
        assert_eq!(sink.listings[0].0, "anidub");
        assert_eq!(sink.records.len(), 1);
    }
}
