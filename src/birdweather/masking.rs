//! Secret masking for logged URLs.

use crate::constants::birdweather::MASKED_ID;

/// Replaces every occurrence of `station_id` in `url` with a placeholder,
/// so logged URLs never contain the station's secret token.
#[must_use]
pub fn mask_url(url: &str, station_id: &str) -> String {
    if station_id.is_empty() {
        return url.to_string();
    }
    url.replace(station_id, MASKED_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_station_id_in_path() {
        let url = "https://app.birdweather.com/api/v1/stations/secret123/detections";
        let masked = mask_url(url, "secret123");
        assert!(!masked.contains("secret123"));
        assert!(masked.contains(MASKED_ID));
    }

    #[test]
    fn empty_station_id_is_a_no_op() {
        let url = "https://app.birdweather.com/api/v1/";
        assert_eq!(mask_url(url, ""), url);
    }

    #[test]
    fn masks_every_occurrence() {
        let url = "https://x/secret/secret";
        let masked = mask_url(url, "secret");
        assert!(!masked.contains("secret"));
    }
}
