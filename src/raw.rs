//! Built-in frame compiler and series store over a plain word-interleaved
//! raw format.
//!
//! The recording is a sequence of frames, one frame per second, each frame
//! `words_per_frame` little-endian u16 words. A parameter's record lists the
//! word offsets carrying its samples, so its rate equals the number of
//! offsets. A frame-doubled recording carries two logical frames back to
//! back; every offset then also appears mirrored into the second half and
//! rates double.
//!
//! The materialized store is a JSON file mapping parameter names to
//! [`Series`]. Decoding proceeds superframe by superframe; with a positive
//! memory budget the store is flushed to disk every `budget` superframes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::debug;

use crate::backend::{
    DecodeEntry, DecodePlan, FrameCompiler, FrameDescriptor, Series, SeriesStore,
};
use crate::definition::FrameDefinition;
use crate::error::{ProcessError, Result};

/// Frames per superframe, the unit the memory budget counts.
pub const FRAMES_PER_SUPERFRAME: usize = 64;

/// The default backend used by the shipped binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBackend;

impl FrameCompiler for RawBackend {
    fn resolve(
        &self,
        definition_path: &Path,
        names: &BTreeSet<String>,
        frame_doubled: bool,
        verbose: bool,
    ) -> Result<(FrameDescriptor, DecodePlan)> {
        let definition = FrameDefinition::load(definition_path)
            .map_err(|err| ProcessError::Compile(err.to_string()))?;
        let words_per_frame = definition.frame.words_per_frame;
        if words_per_frame == 0 {
            return Err(ProcessError::Compile(
                "Frame section must define a positive words_per_frame".into(),
            ));
        }

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let record = definition.parameters.get(name).ok_or_else(|| {
                ProcessError::Compile(format!("parameter '{name}' is not defined in the LFL"))
            })?;
            if record.words.is_empty() {
                return Err(ProcessError::Compile(format!(
                    "parameter '{name}' defines no word positions"
                )));
            }
            if let Some(&word) = record.words.iter().find(|&&w| w >= words_per_frame) {
                return Err(ProcessError::Compile(format!(
                    "parameter '{name}' word {word} exceeds the frame ({words_per_frame} words)"
                )));
            }

            let mut words = record.words.clone();
            if frame_doubled {
                let mirrored: Vec<usize> = words.iter().map(|w| w + words_per_frame).collect();
                words.extend(mirrored);
            }
            let rate = words.len() as f64;
            if verbose {
                debug!("resolved {name}: rate {rate}, words {words:?}");
            }
            entries.push(DecodeEntry {
                name: name.clone(),
                words,
                rate,
                units: record.units.clone(),
                scale: record.scale,
                offset: record.offset,
            });
        }

        let frame = FrameDescriptor {
            words_per_frame: if frame_doubled {
                words_per_frame * 2
            } else {
                words_per_frame
            },
            frame_doubled,
        };
        Ok((frame, DecodePlan { entries }))
    }
}

impl SeriesStore for RawBackend {
    fn materialize(
        &self,
        data_path: &Path,
        output_path: &Path,
        frame: &FrameDescriptor,
        plan: &DecodePlan,
        memory_budget: i64,
    ) -> Result<()> {
        if memory_budget == 0 || memory_budget < -1 {
            return Err(ProcessError::Decode(format!(
                "memory budget must be -1 or positive, got {memory_budget}"
            )));
        }
        let bytes = std::fs::read(data_path)
            .map_err(|err| ProcessError::Decode(format!("{}: {err}", data_path.display())))?;
        let bytes_per_frame = frame.words_per_frame * 2;
        let frame_count = bytes.len() / bytes_per_frame;
        if frame_count == 0 {
            return Err(ProcessError::Decode(format!(
                "raw data is shorter than one frame ({} bytes < {bytes_per_frame})",
                bytes.len()
            )));
        }
        let trailing = bytes.len() % bytes_per_frame;
        if trailing != 0 {
            debug!("ignoring {trailing} trailing bytes of a partial frame");
        }

        let mut series: BTreeMap<String, Series> = plan
            .entries
            .iter()
            .map(|entry| {
                let mut s = Series::new(
                    Vec::with_capacity(frame_count * entry.words.len()),
                    entry.rate,
                );
                s.units = entry.units.clone();
                (entry.name.clone(), s)
            })
            .collect();

        let mut buffered_superframes = 0i64;
        let superframe_bytes = bytes_per_frame * FRAMES_PER_SUPERFRAME;
        for superframe in bytes[..frame_count * bytes_per_frame].chunks(superframe_bytes) {
            for frame_bytes in superframe.chunks_exact(bytes_per_frame) {
                for entry in &plan.entries {
                    let out = &mut series
                        .get_mut(&entry.name)
                        .expect("series allocated for every plan entry")
                        .samples;
                    for &word in &entry.words {
                        let raw =
                            u16::from_le_bytes([frame_bytes[word * 2], frame_bytes[word * 2 + 1]]);
                        out.push(raw as f64 * entry.scale + entry.offset);
                    }
                }
            }
            buffered_superframes += 1;
            if memory_budget > 0 && buffered_superframes >= memory_budget {
                debug!("flushing store after {buffered_superframes} superframes");
                write_store(output_path, &series)?;
                buffered_superframes = 0;
            }
        }

        write_store(output_path, &series)
    }

    fn open(&self, path: &Path) -> Result<BTreeMap<String, Series>> {
        let file = File::open(path)
            .map_err(|err| ProcessError::Decode(format!("{}: {err}", path.display())))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|err| ProcessError::Decode(format!("{}: {err}", path.display())))
    }
}

fn write_store(path: &Path, series: &BTreeMap<String, Series>) -> Result<()> {
    let file = File::create(path)
        .map_err(|err| ProcessError::Decode(format!("{}: {err}", path.display())))?;
    serde_json::to_writer(BufWriter::new(file), series)
        .map_err(|err| ProcessError::Decode(format!("{}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LFL: &str = r#"
Frame:
  words_per_frame: 4
Parameters:
  Altitude STD:
    words: [0, 2]
    units: ft
    scale: 2.0
    offset: -10.0
  Airspeed:
    words: [1]
    units: kt
Parameter Group:
  AXIS_1: [Altitude STD]
"#;

    fn write_lfl() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(LFL.as_bytes()).unwrap();
        f
    }

    fn write_raw(words: &[u16]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for w in words {
            f.write_all(&w.to_le_bytes()).unwrap();
        }
        f
    }

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolve_builds_one_entry_per_name() {
        let lfl = write_lfl();
        let (frame, plan) = RawBackend
            .resolve(
                lfl.path(),
                &names(&["Altitude STD", "Airspeed"]),
                false,
                false,
            )
            .unwrap();
        assert_eq!(frame.words_per_frame, 4);
        assert_eq!(plan.entries.len(), 2);
        let alt = plan
            .entries
            .iter()
            .find(|e| e.name == "Altitude STD")
            .unwrap();
        assert_eq!(alt.rate, 2.0);
        assert_eq!(alt.units.as_deref(), Some("ft"));
    }

    #[test]
    fn resolve_rejects_unknown_names() {
        let lfl = write_lfl();
        let err = RawBackend
            .resolve(lfl.path(), &names(&["Heading"]), false, false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Compile);
        assert!(err.to_string().contains("Heading"));
    }

    #[test]
    fn frame_doubling_mirrors_words_and_doubles_rates() {
        let lfl = write_lfl();
        let (frame, plan) = RawBackend
            .resolve(lfl.path(), &names(&["Airspeed"]), true, false)
            .unwrap();
        assert_eq!(frame.words_per_frame, 8);
        assert_eq!(plan.entries[0].words, vec![1, 5]);
        assert_eq!(plan.entries[0].rate, 2.0);
    }

    #[test]
    fn materialize_and_open_round_trip() {
        let lfl = write_lfl();
        // Two frames of four words each.
        let raw = write_raw(&[100, 7, 200, 0, 300, 8, 400, 0]);
        let out = tempfile::NamedTempFile::new().unwrap();
        let (frame, plan) = RawBackend
            .resolve(
                lfl.path(),
                &names(&["Altitude STD", "Airspeed"]),
                false,
                false,
            )
            .unwrap();
        RawBackend
            .materialize(raw.path(), out.path(), &frame, &plan, -1)
            .unwrap();

        let store = RawBackend.open(out.path()).unwrap();
        let alt = &store["Altitude STD"];
        // value = raw * 2 - 10
        assert_eq!(alt.samples, vec![190.0, 390.0, 590.0, 790.0]);
        assert_eq!(alt.rate, 2.0);
        let ias = &store["Airspeed"];
        assert_eq!(ias.samples, vec![7.0, 8.0]);
        assert_eq!(ias.units.as_deref(), Some("kt"));
    }

    #[test]
    fn trailing_partial_frame_is_ignored() {
        let lfl = write_lfl();
        let raw = write_raw(&[100, 7, 200, 0, 55, 55]);
        let out = tempfile::NamedTempFile::new().unwrap();
        let (frame, plan) = RawBackend
            .resolve(lfl.path(), &names(&["Airspeed"]), false, false)
            .unwrap();
        RawBackend
            .materialize(raw.path(), out.path(), &frame, &plan, -1)
            .unwrap();
        let store = RawBackend.open(out.path()).unwrap();
        assert_eq!(store["Airspeed"].samples, vec![7.0]);
    }

    #[test]
    fn empty_recording_is_a_decode_error() {
        let lfl = write_lfl();
        let raw = write_raw(&[1]);
        let out = tempfile::NamedTempFile::new().unwrap();
        let (frame, plan) = RawBackend
            .resolve(lfl.path(), &names(&["Airspeed"]), false, false)
            .unwrap();
        let err = RawBackend
            .materialize(raw.path(), out.path(), &frame, &plan, -1)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decode);
    }

    #[test]
    fn zero_memory_budget_is_rejected() {
        let lfl = write_lfl();
        let raw = write_raw(&[100, 7, 200, 0]);
        let out = tempfile::NamedTempFile::new().unwrap();
        let (frame, plan) = RawBackend
            .resolve(lfl.path(), &names(&["Airspeed"]), false, false)
            .unwrap();
        assert!(RawBackend
            .materialize(raw.path(), out.path(), &frame, &plan, 0)
            .is_err());
    }

    #[test]
    fn positive_budget_still_produces_a_complete_store() {
        let lfl = write_lfl();
        // 130 frames: three superframes at 64 frames each (the last partial).
        let words: Vec<u16> = (0..130 * 4).map(|i| (i % 1000) as u16).collect();
        let raw = write_raw(&words);
        let out = tempfile::NamedTempFile::new().unwrap();
        let (frame, plan) = RawBackend
            .resolve(lfl.path(), &names(&["Airspeed"]), false, false)
            .unwrap();
        RawBackend
            .materialize(raw.path(), out.path(), &frame, &plan, 1)
            .unwrap();
        let store = RawBackend.open(out.path()).unwrap();
        assert_eq!(store["Airspeed"].samples.len(), 130);
    }
}
