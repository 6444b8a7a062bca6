//! Location string math shared by filesystem paths and URLs.
//!
//! Every persisted document is addressed by a location string: an absolute
//! or relative filesystem path, or a scheme-qualified URL. Link hrefs are
//! resolved against the directory of the owning document's location, so all
//! of the path arithmetic here has to work identically for both regimes.
//! URLs are split into a `scheme://host` head (never touched) and a
//! `/`-separated path tail.

/// Split a location into its `scheme://host` head and path tail.
///
/// Local paths have an empty head. The tail of a URL always starts with
/// `/` (or is empty for a bare `scheme://host`).
fn split_head(location: &str) -> (&str, &str) {
    if let Some(idx) = location.find("://")
        && location[..idx].chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
        && !location[..idx].is_empty()
    {
        let after = idx + 3;
        match location[after..].find('/') {
            Some(slash) => location.split_at(after + slash),
            None => (location, ""),
        }
    } else {
        ("", location)
    }
}

/// Whether a location is absolute: filesystem-absolute or a full URL.
pub fn is_absolute(location: &str) -> bool {
    location.starts_with('/') || !split_head(location).0.is_empty()
}

/// The directory containing a location, with the URL head preserved.
///
/// `dirname("/a/b/catalog.json")` is `"/a/b"`; the dirname of a bare
/// filename is `""`.
pub fn dirname(location: &str) -> String {
    let (head, path) = split_head(location);
    match path.rfind('/') {
        Some(0) => {
            if head.is_empty() {
                "/".to_string()
            } else {
                head.to_string()
            }
        }
        Some(idx) => format!("{}{}", head, &path[..idx]),
        None => head.to_string(),
    }
}

/// Collapse `.` and `..` segments without disturbing the URL head.
pub fn normalize(location: &str) -> String {
    let (head, path) = split_head(location);
    let rooted = path.starts_with('/');
    let mut segs: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(segs.last(), Some(&s) if s != "..") {
                    segs.pop();
                } else if !rooted && head.is_empty() {
                    segs.push("..");
                }
                // ".." above an absolute root stays at the root
            }
            s => segs.push(s),
        }
    }
    let tail = segs.join("/");
    if rooted || !head.is_empty() {
        format!("{}/{}", head, tail)
    } else {
        tail
    }
}

/// Join a possibly-relative href onto a base directory.
///
/// Absolute hrefs pass through (normalized); everything else is resolved
/// against `base_dir`.
pub fn join(base_dir: &str, href: &str) -> String {
    if is_absolute(href) || base_dir.is_empty() {
        normalize(href)
    } else {
        normalize(&format!("{}/{}", base_dir, href))
    }
}

/// Express `target` relative to `base_dir`.
///
/// Both are normalized first. When the two live under different URL heads
/// (or one is a URL and the other a filesystem path) there is no relative
/// form and the normalized target is returned unchanged.
pub fn relative_to(target: &str, base_dir: &str) -> String {
    let target = normalize(target);
    let base = normalize(base_dir);
    let (thead, tpath) = split_head(&target);
    let (bhead, bpath) = split_head(&base);
    if thead != bhead || tpath.starts_with('/') != bpath.starts_with('/') {
        return target.to_string();
    }

    let tsegs: Vec<&str> = tpath.split('/').filter(|s| !s.is_empty()).collect();
    let bsegs: Vec<&str> = bpath.split('/').filter(|s| !s.is_empty()).collect();
    let common = tsegs
        .iter()
        .zip(bsegs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel: Vec<&str> = Vec::new();
    for _ in common..bsegs.len() {
        rel.push("..");
    }
    rel.extend(&tsegs[common..]);
    if rel.is_empty() {
        ".".to_string()
    } else {
        rel.join("/")
    }
}

/// The extension of a location, dot included (`""` when there is none).
pub fn extension(location: &str) -> &str {
    let name = location.rsplit('/').next().unwrap_or(location);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx..],
        _ => "",
    }
}
