use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::emotion::Emotion;
use crate::knowledge::MusicKnowledge;
use crate::prefs::PreferenceProfile;

/// Artists sampled per recommendation.
const ARTISTS_PER_GENRE: usize = 3;
/// Mood keywords sampled per recommendation.
const KEYWORDS_PER_GENRE: usize = 2;

/// One recommended listening bundle, tied to a single genre.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub genre: String,
    /// Up to three artists from the genre's pool, no repeats.
    pub artists: Vec<String>,
    /// Up to two of the emotion's mood keywords.
    pub mood_keywords: Vec<String>,
    /// Suggested tempo in BPM, within the emotion's range.
    pub suggested_tempo: u16,
    pub playlist_theme: String,
}

/// A full selection run: the detected emotion plus one bundle per candidate
/// genre.
#[derive(Debug, Serialize)]
pub struct RecommendationSet {
    pub emotion: Emotion,
    pub generated_at: String,
    pub recommendations: Vec<Recommendation>,
}

impl RecommendationSet {
    pub fn generate<R: Rng + ?Sized>(
        emotion: Emotion,
        knowledge: &MusicKnowledge,
        profile: &PreferenceProfile,
        rng: &mut R,
    ) -> Self {
        Self {
            emotion,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            recommendations: select(Some(emotion), knowledge, profile, rng),
        }
    }
}

/// Build one recommendation per candidate genre for the detected emotion.
///
/// An undetermined emotion (`None`) or one with no music profile yields an
/// empty list; the caller decides what to tell the user. Dislike beats
/// favorite: a genre in both preference sets is excluded. A genre whose
/// artist pool contains none of the favorite artists falls back to the full
/// pool, so a covered genre never comes back artist-less.
pub fn select<R: Rng + ?Sized>(
    emotion: Option<Emotion>,
    knowledge: &MusicKnowledge,
    profile: &PreferenceProfile,
    rng: &mut R,
) -> Vec<Recommendation> {
    let Some(emotion) = emotion else {
        return Vec::new();
    };
    let Some(music) = knowledge.profile(emotion) else {
        return Vec::new();
    };

    let candidates = candidate_genres(&music.genres, profile);

    let mut recommendations = Vec::with_capacity(candidates.len());
    for genre in candidates {
        let Some(pool) = music.artists_by_genre.get(genre) else {
            continue;
        };
        let picks = favored_artists(pool, profile);

        let artists = picks
            .choose_multiple(rng, ARTISTS_PER_GENRE)
            .map(|a| a.to_string())
            .collect();
        let mood_keywords = music
            .mood_keywords
            .choose_multiple(rng, KEYWORDS_PER_GENRE)
            .map(|k| k.to_string())
            .collect();
        let (low, high) = music.tempo_range;
        let suggested_tempo = rng.random_range(low..=high);
        let playlist_theme = music
            .playlist_themes
            .choose(rng)
            .map(|t| t.to_string())
            .unwrap_or_default();

        recommendations.push(Recommendation {
            genre: genre.to_string(),
            artists,
            mood_keywords,
            suggested_tempo,
            playlist_theme,
        });
    }
    recommendations
}

/// The emotion's genres with disliked ones removed. A genre marked both
/// favorite and disliked is excluded: dislike takes strict precedence.
/// Favorite genres never widen the set past the emotion's own list; they
/// only bias the catalog search query.
fn candidate_genres<'a>(genres: &[&'a str], profile: &PreferenceProfile) -> BTreeSet<&'a str> {
    genres
        .iter()
        .copied()
        .filter(|g| !profile.disliked_genres.contains(*g))
        .collect()
}

/// The slice of `pool` the user marked favorite, or the whole pool when none
/// match.
fn favored_artists<'a>(pool: &[&'a str], profile: &PreferenceProfile) -> Vec<&'a str> {
    let favored: Vec<&str> = pool
        .iter()
        .copied()
        .filter(|a| profile.favorite_artists.contains(*a))
        .collect();
    if favored.is_empty() { pool.to_vec() } else { favored }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn knowledge() -> MusicKnowledge {
        MusicKnowledge::builtin().unwrap()
    }

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_empty_profile_covers_all_emotion_genres() {
        let knowledge = knowledge();
        let profile = PreferenceProfile::default();
        let recs = select(Some(Emotion::Happy), &knowledge, &profile, &mut rng(1));

        let genres: BTreeSet<&str> = recs.iter().map(|r| r.genre.as_str()).collect();
        let expected: BTreeSet<&str> = ["Pop", "Dance", "Upbeat Rock", "Reggae"].into();
        assert_eq!(genres, expected);
        assert_eq!(recs.len(), 4, "one recommendation per genre, no duplicates");
    }

    #[test]
    fn test_each_recommendation_respects_its_genre_pool() {
        let knowledge = knowledge();
        let profile = PreferenceProfile::default();

        for seed in 0..25 {
            let recs = select(Some(Emotion::Happy), &knowledge, &profile, &mut rng(seed));
            let music = knowledge.profile(Emotion::Happy).unwrap();
            for rec in &recs {
                let pool = music.artists_by_genre.get(rec.genre.as_str()).unwrap();
                assert!(!rec.artists.is_empty());
                assert!(rec.artists.len() <= 3);
                for artist in &rec.artists {
                    assert!(pool.contains(&artist.as_str()));
                }
                let unique: BTreeSet<&String> = rec.artists.iter().collect();
                assert_eq!(unique.len(), rec.artists.len(), "repeated artist in {rec:?}");
            }
        }
    }

    #[test]
    fn test_keywords_tempo_and_theme_come_from_the_profile() {
        let knowledge = knowledge();
        let profile = PreferenceProfile::default();
        let music = knowledge.profile(Emotion::Sad).unwrap();

        for seed in 0..25 {
            for rec in select(Some(Emotion::Sad), &knowledge, &profile, &mut rng(seed)) {
                assert!(!rec.mood_keywords.is_empty());
                assert!(rec.mood_keywords.len() <= 2);
                for keyword in &rec.mood_keywords {
                    assert!(music.mood_keywords.contains(&keyword.as_str()));
                }
                assert!(rec.suggested_tempo >= 60 && rec.suggested_tempo <= 90);
                assert!(music.playlist_themes.contains(&rec.playlist_theme.as_str()));
            }
        }
    }

    #[test]
    fn test_disliked_genre_is_excluded() {
        let knowledge = knowledge();
        let mut profile = PreferenceProfile::default();
        profile.disliked_genres.insert("Pop".to_string());

        let recs = select(Some(Emotion::Happy), &knowledge, &profile, &mut rng(7));
        assert_eq!(recs.len(), 3);
        assert!(recs.iter().all(|r| r.genre != "Pop"));
    }

    #[test]
    fn test_dislike_beats_favorite() {
        let knowledge = knowledge();
        let mut profile = PreferenceProfile::default();
        profile.favorite_genres.insert("Pop".to_string());
        profile.disliked_genres.insert("Pop".to_string());

        let recs = select(Some(Emotion::Happy), &knowledge, &profile, &mut rng(7));
        assert!(recs.iter().all(|r| r.genre != "Pop"));
    }

    #[test]
    fn test_favorite_genre_outside_the_emotion_is_not_added() {
        let knowledge = knowledge();
        let mut profile = PreferenceProfile::default();
        profile.favorite_genres.insert("Metal".to_string());

        let recs = select(Some(Emotion::Happy), &knowledge, &profile, &mut rng(3));
        assert!(recs.iter().all(|r| r.genre != "Metal"));
        assert_eq!(recs.len(), 4);
    }

    #[test]
    fn test_favorite_artists_narrow_the_pool() {
        let knowledge = knowledge();
        let mut profile = PreferenceProfile::default();
        profile.favorite_artists.insert("Bruno Mars".to_string());

        for seed in 0..10 {
            let recs = select(Some(Emotion::Happy), &knowledge, &profile, &mut rng(seed));
            let pop = recs.iter().find(|r| r.genre == "Pop").unwrap();
            assert_eq!(pop.artists, vec!["Bruno Mars"]);
            // Other genres have no favorite overlap and keep their full pool
            let dance = recs.iter().find(|r| r.genre == "Dance").unwrap();
            assert_eq!(dance.artists.len(), 3);
        }
    }

    #[test]
    fn test_unknown_favorite_artist_falls_back_to_full_pool() {
        let knowledge = knowledge();
        let mut profile = PreferenceProfile::default();
        profile.favorite_artists.insert("Nobody In Particular".to_string());

        let recs = select(Some(Emotion::Happy), &knowledge, &profile, &mut rng(2));
        for rec in &recs {
            assert_eq!(rec.artists.len(), 3);
        }
    }

    #[test]
    fn test_undetermined_emotion_selects_nothing() {
        let knowledge = knowledge();
        let profile = PreferenceProfile::default();
        assert!(select(None, &knowledge, &profile, &mut rng(0)).is_empty());
    }

    #[test]
    fn test_uncovered_emotion_selects_nothing() {
        let knowledge = knowledge();
        let profile = PreferenceProfile::default();
        assert!(select(Some(Emotion::Fear), &knowledge, &profile, &mut rng(0)).is_empty());
        assert!(select(Some(Emotion::Disgust), &knowledge, &profile, &mut rng(0)).is_empty());
    }

    #[test]
    fn test_all_genres_disliked_selects_nothing() {
        let knowledge = knowledge();
        let mut profile = PreferenceProfile::default();
        for genre in ["Pop", "Dance", "Upbeat Rock", "Reggae"] {
            profile.disliked_genres.insert(genre.to_string());
        }
        assert!(select(Some(Emotion::Happy), &knowledge, &profile, &mut rng(4)).is_empty());
    }

    #[test]
    fn test_candidate_genres_dislike_precedence() {
        let genres = ["Pop", "Dance"];
        let mut profile = PreferenceProfile::default();
        profile.favorite_genres.insert("Pop".to_string());
        profile.disliked_genres.insert("Pop".to_string());

        let candidates = candidate_genres(&genres, &profile);
        assert_eq!(candidates, BTreeSet::from(["Dance"]));
    }

    #[test]
    fn test_generate_stamps_the_set() {
        let knowledge = knowledge();
        let profile = PreferenceProfile::default();
        let set = RecommendationSet::generate(Emotion::Neutral, &knowledge, &profile, &mut rng(9));
        assert_eq!(set.emotion, Emotion::Neutral);
        assert_eq!(set.recommendations.len(), 4);
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(set.generated_at.len(), 19);
    }
}
