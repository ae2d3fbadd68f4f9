use url::Url;

/// Canonical form of a video link, used as cache key and for recipe
/// de-duplication.
///
/// Drops the query string and fragment and any trailing slash. Input that
/// does not parse as a URL is returned unchanged.
///
/// YouTube `/watch` links keep their `v` parameter, the only part of the
/// query that identifies the video.
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    let mut parsed = match Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(_) => return url.to_string(),
    };
    if parsed.cannot_be_a_base() {
        return url.to_string();
    }

    let video_id = watch_video_id(&parsed);
    parsed.set_query(None);
    parsed.set_fragment(None);
    if let Some(id) = video_id {
        parsed.query_pairs_mut().append_pair("v", &id);
        return parsed.to_string();
    }

    // Trimming every trailing slash keeps normalize idempotent for
    // paths like `/reel/abc//`.
    parsed.as_str().trim_end_matches('/').to_string()
}

fn watch_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let on_youtube = host == "youtube.com" || host.ends_with(".youtube.com");
    if !on_youtube || url.path().trim_end_matches('/') != "/watch" {
        return None;
    }
    url.query_pairs()
        .find(|(k, v)| k == "v" && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}
