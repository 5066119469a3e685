use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Artwork {
    pub url: String,
}

/// A playable episode from the static catalog. The session never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub stream_url: String,
    #[serde(default)]
    pub artwork: Artwork,
    #[serde(default)]
    pub show_title: String,
    #[serde(default)]
    pub duration_millis: u64,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub summary: String,
}

impl Episode {
    pub fn artwork_url(&self) -> Option<&str> {
        let url = self.artwork.url.trim();
        if url.is_empty() {
            None
        } else {
            Some(url)
        }
    }
}

pub fn format_duration(millis: u64) -> String {
    let seconds = millis / 1000;
    let mins = seconds / 60;
    let secs = seconds % 60;
    format!("{}:{:02}", mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_reads_camel_case_catalog_fields() {
        let json = r#"{
            "id": "ep-1",
            "title": "Morning Briefing",
            "streamUrl": "https://cdn.example.com/ep-1.mp3",
            "artwork": { "url": "https://cdn.example.com/ep-1.jpg" },
            "showTitle": "The Daily Wire Desk",
            "durationMillis": 600000,
            "releaseDate": "2024-03-01",
            "summary": "Top stories."
        }"#;

        let episode: Episode = serde_json::from_str(json).expect("episode");
        assert_eq!(episode.stream_url, "https://cdn.example.com/ep-1.mp3");
        assert_eq!(episode.duration_millis, 600_000);
        assert_eq!(
            episode.release_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).expect("date")
        );
        assert_eq!(episode.artwork_url(), Some("https://cdn.example.com/ep-1.jpg"));
    }

    #[test]
    fn missing_artwork_is_treated_as_absent() {
        let json = r#"{
            "id": "ep-2",
            "title": "Evening",
            "streamUrl": "https://cdn.example.com/ep-2.mp3",
            "releaseDate": "2024-03-02"
        }"#;
        let episode: Episode = serde_json::from_str(json).expect("episode");
        assert_eq!(episode.artwork_url(), None);
        assert_eq!(episode.duration_millis, 0);
    }

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65_400), "1:05");
        assert_eq!(format_duration(600_000), "10:00");
    }
}
