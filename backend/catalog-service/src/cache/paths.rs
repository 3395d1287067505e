//! Derivation of the logical page paths touched by a catalog change.
//!
//! Every cascade works on the same path vocabulary: the homepage, one page
//! per affected playlist, and one page per affected video. CDN purges and
//! regeneration requests both consume this list.

/// Paths affected by a change to the given playlists and optional video.
///
/// The homepage is always included: any membership or metadata change can
/// surface there. Slugs are deduplicated and sorted so a sweep that unions
/// many rebuilds produces a stable list.
pub fn affected_paths(video_remote_id: Option<&str>, slugs: &[String]) -> Vec<String> {
    let mut sorted: Vec<&str> = slugs.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut paths = Vec::with_capacity(sorted.len() + 2);
    paths.push("/".to_string());
    for slug in sorted {
        paths.push(format!("/playlists/{}", slug));
    }
    if let Some(remote_id) = video_remote_id {
        paths.push(format!("/videos/{}", remote_id));
    }

    paths
}
