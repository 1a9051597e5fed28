// Saved sketches: PNG files named by timestamp plus an in-memory gallery of
// thumbnails shown along the bottom of the draw view.

use crate::error::Error;
use chrono::{DateTime, Local};
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::fs;
use std::path::{Path, PathBuf};

const PREFIX: &str = "sketch_";
const EXT: &str = ".png";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Clone, Debug)]
pub struct SketchRecord {
    pub path: PathBuf,
    pub filename: String,
    pub thumbnail: RgbImage,
    /// `YYYYMMDD_HHMMSS` as it appears in the filename
    pub timestamp: String,
    pub created: DateTime<Local>,
}

pub struct SketchGallery {
    dir: PathBuf,
    thumb_size: (u32, u32),
    records: Vec<SketchRecord>,
}

/// `sketch_<YYYYMMDD_HHMMSS>.png` for the given time.
pub fn sketch_filename(at: &DateTime<Local>) -> String {
    format!("{PREFIX}{}{EXT}", at.format(TIMESTAMP_FORMAT))
}

/// Timestamp part of a sketch filename, if it has the expected shape.
pub fn parse_sketch_filename(name: &str) -> Option<&str> {
    let stamp = name.strip_prefix(PREFIX)?.strip_suffix(EXT)?;
    let ok = stamp.len() == 15
        && stamp.char_indices().all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() });
    ok.then_some(stamp)
}

impl SketchGallery {
    /// Create the directory if needed and load what is already there.
    pub fn open(dir: impl Into<PathBuf>, thumb_size: (u32, u32)) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Sketch(format!("Create {}: {e}", dir.display())))?;

        let mut gallery = Self { dir, thumb_size, records: Vec::new() };
        gallery.load_existing()?;
        Ok(gallery)
    }

    fn load_existing(&mut self) -> Result<(), Error> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| Error::Sketch(format!("List {}: {e}", self.dir.display())))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| parse_sketch_filename(name).is_some())
            .collect();
        names.sort();

        for name in names {
            let path = self.dir.join(&name);
            match image::open(&path) {
                Ok(img) => {
                    let created = fs::metadata(&path)
                        .and_then(|m| m.modified())
                        .map(DateTime::<Local>::from)
                        .unwrap_or_else(|_| Local::now());
                    let timestamp = parse_sketch_filename(&name).unwrap_or_default().to_string();
                    let thumbnail = self.thumbnail(&img.to_rgb8());
                    self.records.push(SketchRecord { path, filename: name, thumbnail, timestamp, created });
                }
                Err(e) => log::warn!("Skipping sketch {}: {e}", path.display()),
            }
        }
        log::info!("Loaded {} sketches from {}", self.records.len(), self.dir.display());
        Ok(())
    }

    /// Write `canvas` as a new PNG and add it to the gallery.
    pub fn save(&mut self, canvas: &RgbImage) -> Result<&SketchRecord, Error> {
        self.save_at(canvas, Local::now())
    }

    pub fn save_at(&mut self, canvas: &RgbImage, at: DateTime<Local>) -> Result<&SketchRecord, Error> {
        let filename = sketch_filename(&at);
        let path = self.dir.join(&filename);
        canvas
            .save(&path)
            .map_err(|e| Error::Sketch(format!("Write {}: {e}", path.display())))?;

        let record = SketchRecord {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            thumbnail: self.thumbnail(canvas),
            path,
            filename,
            created: at,
        };
        log::info!("Saved sketch {}", record.path.display());
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Delete every saved sketch file and empty the gallery.
    pub fn clear_all(&mut self) {
        for record in self.records.drain(..) {
            if record.path.exists() {
                if let Err(e) = fs::remove_file(&record.path) {
                    log::warn!("Could not delete {}: {e}", record.filename);
                }
            }
        }
    }

    pub fn records(&self) -> &[SketchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn thumb_size(&self) -> (u32, u32) {
        self.thumb_size
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Exact size, aspect ratio ignored.
    fn thumbnail(&self, img: &RgbImage) -> RgbImage {
        imageops::resize(img, self.thumb_size.0, self.thumb_size.1, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgb;
    use tempfile::tempdir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, h, m, s).unwrap()
    }

    #[test]
    fn filename_pattern() {
        assert_eq!(sketch_filename(&at(14, 5, 9)), "sketch_20240309_140509.png");
        assert_eq!(parse_sketch_filename("sketch_20240309_140509.png"), Some("20240309_140509"));
        assert_eq!(parse_sketch_filename("sketch_2024.png"), None);
        assert_eq!(parse_sketch_filename("notes.png"), None);
    }

    #[test]
    fn save_appends_one_fixed_size_record() {
        let dir = tempdir().unwrap();
        let mut g = SketchGallery::open(dir.path(), (100, 75)).unwrap();
        assert!(g.is_empty());

        for (w, h) in [(640, 480), (1280, 720), (33, 999)] {
            let before = g.len();
            let img = RgbImage::from_pixel(w, h, Rgb([0, 200, 0]));
            let rec = g.save(&img).unwrap();
            assert!(parse_sketch_filename(&rec.filename).is_some(), "{}", rec.filename);
            assert_eq!(rec.thumbnail.dimensions(), (100, 75));
            assert!(rec.path.exists());
            assert_eq!(g.len(), before + 1);
        }
    }

    #[test]
    fn reopening_loads_sorted_and_skips_broken_files() {
        let dir = tempdir().unwrap();
        {
            let mut g = SketchGallery::open(dir.path(), (100, 75)).unwrap();
            let img = RgbImage::from_pixel(64, 48, Rgb([9, 9, 9]));
            g.save_at(&img, at(12, 0, 2)).unwrap();
            g.save_at(&img, at(12, 0, 1)).unwrap();
        }
        fs::write(dir.path().join("sketch_20240309_120003.png"), b"not a png").unwrap();
        fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let g = SketchGallery::open(dir.path(), (40, 30)).unwrap();
        let names: Vec<&str> = g.records().iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["sketch_20240309_120001.png", "sketch_20240309_120002.png"]);
        assert_eq!(g.records()[0].thumbnail.dimensions(), (40, 30));
        assert_eq!(g.records()[0].timestamp, "20240309_120001");
    }

    #[test]
    fn clear_all_removes_files_and_records() {
        let dir = tempdir().unwrap();
        let mut g = SketchGallery::open(dir.path().join("nested"), (10, 10)).unwrap();
        let img = RgbImage::from_pixel(20, 20, Rgb([1, 2, 3]));
        let path = g.save_at(&img, at(8, 30, 0)).unwrap().path.clone();
        g.clear_all();
        assert!(g.is_empty());
        assert!(!path.exists());
    }
}
