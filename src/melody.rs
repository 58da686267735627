//! # Melody Prompt
//!
//! Summarize a played or imported melody and render it as the text prompt
//! that asks the generation service to build around it.
//!
//! ## Example
//! ```rust
//! use pianodj::melody::{melody_prompt, MelodyAnalysis, MelodyDirection};
//! use pianodj::NoteEvent;
//!
//! let note = |name: &str, at: f64| NoteEvent {
//!     pitch_name: name.to_string(),
//!     octave: 4,
//!     instrument: "piano".to_string(),
//!     timestamp_ms: at,
//!     duration_ms: 400.0,
//!     velocity: 0.8,
//! };
//! let notes = vec![note("C", 0.0), note("E", 500.0), note("G", 1000.0)];
//!
//! let analysis = MelodyAnalysis::from_notes(&notes).unwrap();
//! assert_eq!(analysis.note_sequence, "C4 → E4 → G4");
//! assert_eq!(analysis.direction, MelodyDirection::Ascending);
//!
//! let prompt = melody_prompt(&notes, 120, "piano").unwrap();
//! assert!(prompt.contains("Tempo: 120 BPM"));
//! ```

use serde::Serialize;

use crate::midi::NoteEvent;

/// Velocity assumed for notes recorded without one.
const DEFAULT_VELOCITY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MelodyDirection {
    Ascending,
    Descending,
    Static,
}

impl MelodyDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            MelodyDirection::Ascending => "ascending",
            MelodyDirection::Descending => "descending",
            MelodyDirection::Static => "static",
        }
    }
}

/// One note's position in the melody, rounded to whole milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTiming {
    pub note: String,
    pub start_ms: i64,
    pub duration_ms: i64,
    pub velocity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MelodyAnalysis {
    /// Note labels joined with arrows, e.g. `C4 → E4`.
    pub note_sequence: String,
    pub timing: Vec<NoteTiming>,
    /// End of the last sounding note.
    pub total_duration_ms: f64,
    pub avg_note_duration_ms: i64,
    /// Notes per second, one decimal.
    pub note_density: f64,
    pub has_gaps: bool,
    /// Mean of the positive silences between consecutive notes.
    pub avg_gap_ms: i64,
    pub min_octave: i32,
    pub max_octave: i32,
    /// Mean absolute step between consecutive notes, in semitones.
    pub avg_interval: i64,
    pub direction: MelodyDirection,
}

impl MelodyAnalysis {
    /// Analyze `notes` in time order. `None` for an empty melody.
    pub fn from_notes(notes: &[NoteEvent]) -> Option<Self> {
        if notes.is_empty() {
            return None;
        }
        let mut sorted: Vec<&NoteEvent> = notes.iter().collect();
        sorted.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));

        let count = sorted.len() as f64;
        let total_duration_ms = sorted.iter().map(|n| n.end_ms()).fold(0.0, f64::max);
        let avg_note_duration = sorted.iter().map(|n| n.duration_ms).sum::<f64>() / count;
        let note_density = if total_duration_ms > 0.0 {
            (count / (total_duration_ms / 1000.0) * 10.0).round() / 10.0
        } else {
            0.0
        };

        let intervals: Vec<i32> = sorted
            .windows(2)
            .map(|pair| pair[1].midi_number() - pair[0].midi_number())
            .collect();
        let gaps: Vec<f64> = sorted
            .windows(2)
            .map(|pair| pair[1].timestamp_ms - pair[0].end_ms())
            .filter(|gap| *gap > 0.0)
            .collect();

        let avg_gap_ms = if gaps.is_empty() {
            0
        } else {
            (gaps.iter().sum::<f64>() / gaps.len() as f64).round() as i64
        };
        let avg_interval = if intervals.is_empty() {
            0
        } else {
            let total: i32 = intervals.iter().map(|i| i.abs()).sum();
            (total as f64 / intervals.len() as f64).round() as i64
        };
        let direction = if intervals.is_empty() {
            MelodyDirection::Static
        } else {
            let up = intervals.iter().filter(|i| **i > 0).count();
            let down = intervals.iter().filter(|i| **i < 0).count();
            if up > down {
                MelodyDirection::Ascending
            } else {
                MelodyDirection::Descending
            }
        };

        let timing = sorted
            .iter()
            .map(|n| NoteTiming {
                note: n.label(),
                start_ms: n.timestamp_ms.round() as i64,
                duration_ms: n.duration_ms.round() as i64,
                velocity: if n.velocity > 0.0 { n.velocity } else { DEFAULT_VELOCITY },
            })
            .collect();

        Some(Self {
            note_sequence: sorted
                .iter()
                .map(|n| n.label())
                .collect::<Vec<_>>()
                .join(" → "),
            timing,
            total_duration_ms,
            avg_note_duration_ms: avg_note_duration.round() as i64,
            note_density,
            has_gaps: !gaps.is_empty(),
            avg_gap_ms,
            min_octave: sorted.iter().map(|n| n.octave).min().unwrap_or(0),
            max_octave: sorted.iter().map(|n| n.octave).max().unwrap_or(0),
            avg_interval,
            direction,
        })
    }

    /// Octave range as `min-max`.
    pub fn range(&self) -> String {
        format!("{}-{}", self.min_octave, self.max_octave)
    }
}

/// Render the melody prompt for `notes`, or `None` when there are none.
pub fn melody_prompt(notes: &[NoteEvent], bpm: u32, instrument: &str) -> Option<String> {
    let analysis = MelodyAnalysis::from_notes(notes)?;

    let timing = analysis
        .timing
        .iter()
        .map(|t| {
            format!(
                "  • {}: starts at {}ms, holds for {}ms (velocity: {}%)",
                t.note,
                t.start_ms,
                t.duration_ms,
                (t.velocity * 100.0).round() as i64
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let pauses = if analysis.has_gaps {
        format!("Pauses between notes: average {}ms gaps", analysis.avg_gap_ms)
    } else {
        "Continuous playing with no significant pauses".to_string()
    };

    Some(format!(
        "MUSICAL FOUNDATION FOR AI GENERATION:

PRIMARY MELODY STRUCTURE:
- Exact note sequence: {sequence}
- Total duration: {seconds} seconds
- Tempo: {bpm} BPM
- Instrument style: {instrument}

TIMING AND RHYTHM (CRITICAL - MAINTAIN THESE PATTERNS):
{timing}

RHYTHMIC CHARACTERISTICS:
- Average note duration: {avg_duration}ms
- Note density: {density} notes/second
- {pauses}
- Maintain exact timing relationships between notes

MELODIC CHARACTERISTICS:
- Octave range: {range}
- Average interval between notes: {interval} semitones
- Overall direction: {direction}
- Preserve the melodic contour and note relationships

GENERATION INSTRUCTIONS:
1. Use this exact note sequence as your primary melodic foundation
2. Maintain the precise timing, duration, and velocity of each note
3. Preserve the rhythmic patterns and pauses between notes
4. Keep the same octave range and melodic direction
5. Build accompaniment, harmonies, and variations around this core melody
6. The generated music should feel like an expansion of this melody, not a replacement
7. Maintain the {instrument} character while adding complementary elements

This melody represents the core musical DNA - all generated content should be built upon and around this foundation while preserving its essential characteristics.",
        sequence = analysis.note_sequence,
        seconds = (analysis.total_duration_ms / 1000.0).round() as i64,
        avg_duration = analysis.avg_note_duration_ms,
        density = analysis.note_density,
        range = analysis.range(),
        interval = analysis.avg_interval,
        direction = analysis.direction.as_str(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(name: &str, octave: i32, at: f64, duration: f64) -> NoteEvent {
        NoteEvent {
            pitch_name: name.to_string(),
            octave,
            instrument: "piano".to_string(),
            timestamp_ms: at,
            duration_ms: duration,
            velocity: 0.8,
        }
    }

    #[test]
    fn test_empty_melody() {
        assert!(MelodyAnalysis::from_notes(&[]).is_none());
        assert!(melody_prompt(&[], 120, "piano").is_none());
    }

    #[test]
    fn test_rhythm_analysis() {
        let notes = vec![
            note("C", 4, 0.0, 400.0),
            note("E", 4, 500.0, 400.0),
            note("G", 4, 1000.0, 500.0),
        ];
        let analysis = MelodyAnalysis::from_notes(&notes).unwrap();

        assert_eq!(analysis.total_duration_ms, 1500.0);
        assert_eq!(analysis.avg_note_duration_ms, 433);
        assert_eq!(analysis.note_density, 2.0);
        assert!(analysis.has_gaps);
        assert_eq!(analysis.avg_gap_ms, 100);
        assert_eq!(analysis.range(), "4-4");
        // Steps of 4 and 3 semitones
        assert_eq!(analysis.avg_interval, 4);
        assert_eq!(analysis.direction, MelodyDirection::Ascending);
    }

    #[test]
    fn test_unsorted_input_and_octave_crossing() {
        let notes = vec![
            note("C", 5, 1000.0, 500.0),
            note("B", 4, 500.0, 500.0),
            note("D", 5, 0.0, 500.0),
        ];
        let analysis = MelodyAnalysis::from_notes(&notes).unwrap();

        assert_eq!(analysis.note_sequence, "D5 → B4 → C5");
        assert!(!analysis.has_gaps);
        assert_eq!(analysis.avg_gap_ms, 0);
        assert_eq!(analysis.range(), "4-5");
        // D5 to B4 is -3, B4 to C5 is +1: a tie reads as descending
        assert_eq!(analysis.avg_interval, 2);
        assert_eq!(analysis.direction, MelodyDirection::Descending);
    }

    #[test]
    fn test_single_note_is_static() {
        let analysis = MelodyAnalysis::from_notes(&[note("A", 3, 0.0, 250.0)]).unwrap();
        assert_eq!(analysis.direction, MelodyDirection::Static);
        assert_eq!(analysis.avg_interval, 0);
        assert_eq!(analysis.note_density, 4.0);
    }

    #[test]
    fn test_missing_velocity_defaults() {
        let mut silent = note("C", 4, 0.0, 100.0);
        silent.velocity = 0.0;
        let analysis = MelodyAnalysis::from_notes(&[silent]).unwrap();
        assert_eq!(analysis.timing[0].velocity, 0.8);
    }

    #[test]
    fn test_prompt_text() {
        let notes = vec![note("C", 4, 0.0, 400.0), note("E", 4, 400.0, 400.0)];
        let prompt = melody_prompt(&notes, 96, "strings").unwrap();

        assert!(prompt.starts_with("MUSICAL FOUNDATION FOR AI GENERATION:"));
        assert!(prompt.contains("- Exact note sequence: C4 → E4"));
        assert!(prompt.contains("- Tempo: 96 BPM"));
        assert!(prompt.contains("- Instrument style: strings"));
        assert!(prompt.contains("  • E4: starts at 400ms, holds for 400ms (velocity: 80%)"));
        assert!(prompt.contains("- Continuous playing with no significant pauses"));
        assert!(prompt.contains("- Note density: 2.5 notes/second"));
        assert!(prompt.contains("- Overall direction: ascending"));
        assert!(prompt.contains("7. Maintain the strings character"));
    }
}
