use std::collections::HashMap;

use thiserror::Error;

use crate::emotion::Emotion;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("{emotion}: genre \"{genre}\" has no artist list")]
    MissingArtists { emotion: Emotion, genre: String },

    #[error("{emotion}: genre \"{genre}\" has an empty artist list")]
    EmptyArtists { emotion: Emotion, genre: String },

    #[error("{0}: empty mood keyword list")]
    NoKeywords(Emotion),

    #[error("{0}: empty playlist theme list")]
    NoThemes(Emotion),

    #[error("{emotion}: tempo range {low}-{high} BPM is inverted")]
    TempoRange { emotion: Emotion, low: u16, high: u16 },
}

/// Static music knowledge for one emotion: what to recommend and what to
/// search for when this is the detected mood.
#[derive(Debug, Clone)]
pub struct MusicProfile {
    pub genres: Vec<&'static str>,
    pub mood_keywords: Vec<&'static str>,
    /// Suggested tempo range in BPM, inclusive on both ends.
    pub tempo_range: (u16, u16),
    pub artists_by_genre: HashMap<&'static str, Vec<&'static str>>,
    pub playlist_themes: Vec<&'static str>,
    /// Catalog search queries for this mood.
    pub search_terms: [&'static str; 4],
}

/// The emotion→music table. Built and validated once at startup, then passed
/// by reference to whatever needs it.
///
/// Not every emotion has a profile: fear and disgust are valid detection
/// outcomes with no musical mapping, and lookups for them return `None`.
#[derive(Debug)]
pub struct MusicKnowledge {
    profiles: HashMap<Emotion, MusicProfile>,
}

impl MusicKnowledge {
    /// Build the built-in table. A table that violates its own invariants
    /// (a genre with no artists, an inverted tempo range) is a fatal
    /// configuration error, surfaced here before any user-facing work runs.
    pub fn builtin() -> Result<Self, KnowledgeError> {
        Self::from_profiles(builtin_profiles())
    }

    fn from_profiles(profiles: HashMap<Emotion, MusicProfile>) -> Result<Self, KnowledgeError> {
        for (&emotion, profile) in &profiles {
            for &genre in &profile.genres {
                match profile.artists_by_genre.get(genre) {
                    None => {
                        return Err(KnowledgeError::MissingArtists {
                            emotion,
                            genre: genre.to_string(),
                        });
                    }
                    Some(artists) if artists.is_empty() => {
                        return Err(KnowledgeError::EmptyArtists {
                            emotion,
                            genre: genre.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
            if profile.mood_keywords.is_empty() {
                return Err(KnowledgeError::NoKeywords(emotion));
            }
            if profile.playlist_themes.is_empty() {
                return Err(KnowledgeError::NoThemes(emotion));
            }
            let (low, high) = profile.tempo_range;
            if low > high {
                return Err(KnowledgeError::TempoRange { emotion, low, high });
            }
        }
        Ok(Self { profiles })
    }

    pub fn profile(&self, emotion: Emotion) -> Option<&MusicProfile> {
        self.profiles.get(&emotion)
    }

    /// Emotions that have a music profile, in canonical order.
    pub fn covered_emotions(&self) -> Vec<Emotion> {
        Emotion::ALL
            .into_iter()
            .filter(|e| self.profiles.contains_key(e))
            .collect()
    }
}

/// The built-in emotion→music table.
fn builtin_profiles() -> HashMap<Emotion, MusicProfile> {
    HashMap::from([
        (
            Emotion::Happy,
            MusicProfile {
                genres: vec!["Pop", "Dance", "Upbeat Rock", "Reggae"],
                mood_keywords: vec!["uplifting", "energetic", "bright", "cheerful"],
                tempo_range: (120, 160),
                artists_by_genre: HashMap::from([
                    ("Pop", vec!["Taylor Swift", "Ed Sheeran", "Bruno Mars"]),
                    ("Dance", vec!["Calvin Harris", "Dua Lipa", "The Chainsmokers"]),
                    ("Upbeat Rock", vec!["Imagine Dragons", "Maroon 5", "The Killers"]),
                    ("Reggae", vec!["Bob Marley", "Sean Paul", "Shaggy"]),
                ]),
                playlist_themes: vec![
                    "Summer Hits",
                    "Party Mix",
                    "Workout Energy",
                    "Feel Good Classics",
                ],
                search_terms: [
                    "upbeat music",
                    "happy songs",
                    "feel good music",
                    "positive vibes playlist",
                ],
            },
        ),
        (
            Emotion::Sad,
            MusicProfile {
                genres: vec!["Blues", "Slow Rock", "Classical", "Ambient"],
                mood_keywords: vec!["melancholic", "emotional", "deep", "reflective"],
                tempo_range: (60, 90),
                artists_by_genre: HashMap::from([
                    ("Blues", vec!["B.B. King", "Eric Clapton", "John Lee Hooker"]),
                    ("Slow Rock", vec!["Coldplay", "The Script", "Snow Patrol"]),
                    ("Classical", vec!["Ludovico Einaudi", "Max Richter", "Joep Beving"]),
                    ("Ambient", vec!["Brian Eno", "Tycho", "Jon Hopkins"]),
                ]),
                playlist_themes: vec![
                    "Rainy Day",
                    "Late Night Thoughts",
                    "Emotional Healing",
                    "Peaceful Piano",
                ],
                search_terms: [
                    "sad songs",
                    "emotional music",
                    "melancholic playlist",
                    "peaceful piano",
                ],
            },
        ),
        (
            Emotion::Angry,
            MusicProfile {
                genres: vec!["Metal", "Punk Rock", "Hard Rock", "Intense Electronic"],
                mood_keywords: vec!["intense", "powerful", "aggressive", "energetic"],
                tempo_range: (140, 180),
                artists_by_genre: HashMap::from([
                    ("Metal", vec!["Metallica", "System of a Down", "Slipknot"]),
                    ("Punk Rock", vec!["Green Day", "Blink-182", "Sum 41"]),
                    ("Hard Rock", vec!["Foo Fighters", "AC/DC", "Guns N' Roses"]),
                    ("Intense Electronic", vec!["The Prodigy", "Chemical Brothers", "Pendulum"]),
                ]),
                playlist_themes: vec![
                    "Rage Release",
                    "Workout Intensity",
                    "Metal Classics",
                    "Power Hour",
                ],
                search_terms: [
                    "intense music",
                    "powerful songs",
                    "aggressive music",
                    "metal playlist",
                ],
            },
        ),
        (
            Emotion::Neutral,
            MusicProfile {
                genres: vec!["Jazz", "Indie", "Folk", "Alternative"],
                mood_keywords: vec!["balanced", "calm", "focused", "mindful"],
                tempo_range: (90, 120),
                artists_by_genre: HashMap::from([
                    ("Jazz", vec!["Miles Davis", "John Coltrane", "Norah Jones"]),
                    ("Indie", vec!["Arctic Monkeys", "The XX", "Tame Impala"]),
                    ("Folk", vec!["Mumford & Sons", "The Lumineers", "Of Monsters and Men"]),
                    ("Alternative", vec!["Radiohead", "The National", "Bon Iver"]),
                ]),
                playlist_themes: vec![
                    "Coffee House",
                    "Indie Essentials",
                    "Focus Flow",
                    "Acoustic Afternoon",
                ],
                search_terms: [
                    "relaxing music",
                    "calm playlist",
                    "indie music",
                    "chill songs",
                ],
            },
        ),
        (
            Emotion::Surprise,
            MusicProfile {
                genres: vec!["Electronic", "Experimental", "Jazz Fusion", "Progressive Rock"],
                mood_keywords: vec!["unexpected", "innovative", "exciting", "dynamic"],
                tempo_range: (100, 160),
                artists_by_genre: HashMap::from([
                    ("Electronic", vec!["Aphex Twin", "Four Tet", "Boards of Canada"]),
                    ("Experimental", vec!["Björk", "Flying Lotus", "Animal Collective"]),
                    ("Jazz Fusion", vec!["Weather Report", "Snarky Puppy", "GoGo Penguin"]),
                    ("Progressive Rock", vec!["Pink Floyd", "Tool", "Dream Theater"]),
                ]),
                playlist_themes: vec![
                    "Mind-Bending Mix",
                    "Genre Fusion",
                    "Musical Journey",
                    "Discovery Weekly",
                ],
                search_terms: [
                    "experimental music",
                    "unique songs",
                    "innovative music",
                    "fusion playlist",
                ],
            },
        ),
    ])
}
