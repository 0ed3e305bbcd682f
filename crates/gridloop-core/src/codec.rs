//! Share-string codec
//!
//! Songs travel as URL-fragment strings: JSON, LZ4-compressed with a prepended
//! size, then URL-safe unpadded base64. Decoding tolerates strings written by
//! older versions (absent key, shorter drum legends) and reports anything
//! malformed as an error rather than panicking; callers fall back to
//! [`Song::default_song`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};

use crate::error::{GridloopError, Result};
use crate::pitch::{InstrumentKind, Key, DRUM_ROWS};
use crate::song::{Resolution, Song, SongSettings};
use crate::track::{StepSet, Track};

/// Wire shape of a shared song. The global scale is not part of it; it is
/// recovered from the first melodic track on decode.
#[derive(Serialize, Deserialize)]
struct SongState {
    tempo: u16,
    resolution: Resolution,
    bars: u8,
    /// Absent in strings from before keys were selectable
    #[serde(default)]
    key: Key,
    tracks: Vec<Track>,
}

pub fn encode_song(song: &Song) -> Result<String> {
    let state = SongState {
        tempo: song.settings.tempo,
        resolution: song.settings.resolution,
        bars: song.settings.bars,
        key: song.settings.key,
        tracks: song.tracks.clone(),
    };
    let json = serde_json::to_vec(&state).map_err(|e| GridloopError::Encode(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(compress_prepend_size(&json)))
}

pub fn decode_song(encoded: &str) -> Result<Song> {
    let packed = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| GridloopError::Decode(e.to_string()))?;
    let json =
        decompress_size_prepended(&packed).map_err(|e| GridloopError::Decode(e.to_string()))?;
    let mut state: SongState =
        serde_json::from_slice(&json).map_err(|e| GridloopError::Decode(e.to_string()))?;

    for track in &mut state.tracks {
        migrate_track(track);
    }

    // The first melodic track carries the global scale
    let scale = state
        .tracks
        .iter()
        .find(|t| t.kind.is_melodic())
        .map(|t| t.scale)
        .unwrap_or_default();

    let settings = SongSettings {
        tempo: state.tempo,
        resolution: state.resolution,
        bars: state.bars,
        key: state.key,
        scale,
    };
    Ok(Song::from_parts(settings, state.tracks))
}

/// Forward-compatibility migration: drum tracks stored before the legend grew
/// to its current seven rows get their missing trailing rows padded empty.
fn migrate_track(track: &mut Track) {
    if track.kind == InstrumentKind::Drums {
        while track.steps.len() < DRUM_ROWS.len() {
            track.steps.push(StepSet::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::Scale;
    use crate::song::TrackUpdate;
    use crate::track::TrackId;

    fn pack(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(compress_prepend_size(json.as_bytes()))
    }

    fn sample_song() -> Song {
        let mut song = Song::new(SongSettings::default());
        song.set_tempo(132);
        song.set_bars(4);
        song.set_resolution(Resolution::Sixteenth);
        song.apply_global_scale_key(Scale::Whole, Key::Em);

        let drums = song.add_track(InstrumentKind::Drums);
        let bass = song.add_track(InstrumentKind::Bass);
        song.toggle_step(drums, 0, 0.0);
        song.toggle_step(drums, 0, 2.5);
        song.toggle_step(bass, 3, 0.25);
        song.update_track(
            bass,
            TrackUpdate {
                volume: Some(-12),
                muted: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        song
    }

    #[test]
    fn round_trip_preserves_the_song() {
        let song = sample_song();
        let decoded = decode_song(&encode_song(&song).unwrap()).unwrap();
        assert_eq!(decoded, song);
    }

    #[test]
    fn missing_key_defaults_to_c() {
        let json = r#"{"tempo":110,"resolution":"8n","bars":2,"tracks":[]}"#;
        let song = decode_song(&pack(json)).unwrap();
        assert_eq!(song.settings.key, Key::C);
    }

    #[test]
    fn short_drum_tracks_are_padded() {
        let json = r#"{
            "tempo": 110,
            "resolution": "8n",
            "bars": 2,
            "key": "Am",
            "tracks": [{
                "id": 1,
                "type": "drums",
                "scale": "pentatonic",
                "volume": 0,
                "muted": false,
                "solo": false,
                "activeSteps": [[0.0], [], [], [], []]
            }]
        }"#;
        let song = decode_song(&pack(json)).unwrap();
        let drums = &song.tracks[0];
        assert_eq!(drums.row_count(), DRUM_ROWS.len());
        assert_eq!(drums.steps[0].len(), 1);
        assert!(drums.steps[5].is_empty());
        assert!(drums.steps[6].is_empty());
    }

    #[test]
    fn global_scale_is_recovered_from_the_first_melodic_track() {
        let mut song = Song::new(SongSettings::default());
        song.apply_global_scale_key(Scale::Whole, Key::D);
        song.add_track(InstrumentKind::Keyboard);

        let decoded = decode_song(&encode_song(&song).unwrap()).unwrap();
        assert_eq!(decoded.settings.scale, Scale::Whole);
    }

    #[test]
    fn malformed_input_is_an_error_not_a_panic() {
        assert!(decode_song("not-a-song!").is_err());
        assert!(decode_song("").is_err());
        // Valid base64, garbage underneath
        assert!(decode_song(&URL_SAFE_NO_PAD.encode(b"garbage")).is_err());
    }

    #[test]
    fn out_of_range_settings_are_clamped_on_decode() {
        let json = r#"{"tempo":999,"resolution":"4n","bars":200,"tracks":[]}"#;
        let song = decode_song(&pack(json)).unwrap();
        assert_eq!(song.settings.tempo, 180);
        assert_eq!(song.settings.bars, 8);
    }

    #[test]
    fn decoded_ids_do_not_collide_with_new_tracks() {
        let mut song = Song::new(SongSettings::default());
        let a = song.add_track(InstrumentKind::Drums);
        let b = song.add_track(InstrumentKind::Guitar);

        let mut decoded = decode_song(&encode_song(&song).unwrap()).unwrap();
        let c = decoded.add_track(InstrumentKind::Bass);
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert_eq!(c, TrackId(3));
    }
}
