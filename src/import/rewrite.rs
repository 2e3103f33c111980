use std::collections::BTreeSet;

/// Neutral stand-in for the file's path during rewriting. The leading and
/// trailing underscores keep it out of the space of real repository paths.
pub const PATH_PLACEHOLDER: &str = "__git_import_file_path__";

/// Rewrite every historical path in the concatenated patch series onto
/// `dest_path`.
///
/// Two phases: every known path occurring in a path-marker position is
/// first masked with [`PATH_PLACEHOLDER`], then the placeholder is
/// replaced with the destination path. Several distinct historical paths
/// converge onto one destination, so a direct multi-pattern substitution
/// could see its own output; the placeholder indirection makes the
/// rewrite order-independent and idempotent.
pub fn rewrite_series(
    series: &[u8],
    historical_paths: &BTreeSet<String>,
    dest_path: &str,
) -> Vec<u8> {
    let masked = mask_marker_paths(series, historical_paths);
    replace_all(&masked, PATH_PLACEHOLDER.as_bytes(), dest_path.as_bytes())
}

/// Phase one: replace path occurrences in marker positions (`diff --git`,
/// `---`, `+++`, and diffstat lines) with the placeholder. Everything
/// else, including binary-diff payloads and non-UTF-8 context bytes, is
/// passed through untouched.
fn mask_marker_paths(series: &[u8], paths: &BTreeSet<String>) -> Vec<u8> {
    let mut out = Vec::with_capacity(series.len());
    let mut rest = series;
    while !rest.is_empty() {
        let line = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => {
                let (line, tail) = rest.split_at(i + 1);
                rest = tail;
                line
            }
            None => {
                let line = rest;
                rest = &[];
                line
            }
        };
        out.extend_from_slice(&mask_line(line, paths));
    }
    out
}

fn mask_line(line: &[u8], paths: &BTreeSet<String>) -> Vec<u8> {
    let (body, newline) = match line.strip_suffix(b"\n") {
        Some(body) => (body, &b"\n"[..]),
        None => (line, &b""[..]),
    };

    let masked: Option<Vec<u8>> = if let Some(rest) = body.strip_prefix(b"diff --git a/") {
        mask_diff_git_line(rest, paths)
    } else if let Some(rest) = body.strip_prefix(b"--- a/") {
        path_in_set(rest, paths).then(|| {
            let mut v = b"--- a/".to_vec();
            v.extend_from_slice(PATH_PLACEHOLDER.as_bytes());
            v
        })
    } else if let Some(rest) = body.strip_prefix(b"+++ b/") {
        path_in_set(rest, paths).then(|| {
            let mut v = b"+++ b/".to_vec();
            v.extend_from_slice(PATH_PLACEHOLDER.as_bytes());
            v
        })
    } else if body.starts_with(b" ") {
        mask_diffstat_line(body, paths)
    } else {
        None
    };

    match masked {
        Some(mut v) => {
            v.extend_from_slice(newline);
            v
        }
        None => line.to_vec(),
    }
}

/// `diff --git a/<old> b/<new>` with the `a/` prefix already stripped.
/// Old and new are masked independently; after rename filtering they are
/// normally the same path.
fn mask_diff_git_line(rest: &[u8], paths: &BTreeSet<String>) -> Option<Vec<u8>> {
    let sep = rfind_subslice(rest, b" b/")?;
    let old = &rest[..sep];
    let new = &rest[sep + 3..];

    let old_known = path_in_set(old, paths);
    let new_known = path_in_set(new, paths);
    if !old_known && !new_known {
        return None;
    }

    let mut v = b"diff --git a/".to_vec();
    if old_known {
        v.extend_from_slice(PATH_PLACEHOLDER.as_bytes());
    } else {
        v.extend_from_slice(old);
    }
    v.extend_from_slice(b" b/");
    if new_known {
        v.extend_from_slice(PATH_PLACEHOLDER.as_bytes());
    } else {
        v.extend_from_slice(new);
    }
    Some(v)
}

/// Diffstat lines look like ` <path>     | 3 ++-`. The path may be
/// truncated by git for display; only exact matches are rewritten, which
/// is all `git am` cares about (the stat block is decoration).
fn mask_diffstat_line(body: &[u8], paths: &BTreeSet<String>) -> Option<Vec<u8>> {
    let pipe = rfind_subslice(body, b" | ")?;
    if pipe == 0 {
        return None;
    }
    let token = trim_ascii(&body[1..pipe]);
    if !path_in_set(token, paths) {
        return None;
    }

    let mut v = b" ".to_vec();
    v.extend_from_slice(PATH_PLACEHOLDER.as_bytes());
    v.extend_from_slice(&body[pipe..]);
    Some(v)
}

fn path_in_set(candidate: &[u8], paths: &BTreeSet<String>) -> bool {
    std::str::from_utf8(candidate)
        .map(|s| paths.contains(s))
        .unwrap_or(false)
}

fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace());
    match (start, end) {
        (Some(s), Some(e)) => &bytes[s..=e],
        _ => &[],
    }
}

fn replace_all(data: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i..].starts_with(from) {
            out.extend_from_slice(to);
            i += from.len();
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_series() -> String {
        "From 1111111111111111111111111111111111111111 Mon Sep 17 00:00:00 2001\n\
         From: Alice <alice@example.com>\n\
         Subject: [PATCH] add foo.txt\n\
         \n\
         ---\n \
         foo.txt | 1 +\n \
         1 file changed, 1 insertion(+)\n\
         \n\
         diff --git a/foo.txt b/foo.txt\n\
         new file mode 100644\n\
         index 0000000000000000000000000000000000000000..e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\n\
         --- /dev/null\n\
         +++ b/foo.txt\n\
         @@ -0,0 +1 @@\n\
         +hello foo.txt\n\
         From 3333333333333333333333333333333333333333 Mon Sep 17 00:00:00 2001\n\
         From: Carol <carol@example.com>\n\
         Subject: [PATCH] edit bar.txt\n\
         \n\
         ---\n \
         bar.txt | 2 +-\n\
         \n\
         diff --git a/bar.txt b/bar.txt\n\
         index e69de29bb2d1d6434b8b29ae775ad8c2e48c5391..5716ca5987cbf97d6bb54920bea6adde242d87e6\n\
         --- a/bar.txt\n\
         +++ b/bar.txt\n\
         @@ -1 +1 @@\n\
         -hello foo.txt\n\
         +goodbye\n"
            .to_string()
    }

    #[test]
    fn converges_all_historical_paths_onto_destination() {
        let series = sample_series().into_bytes();
        let out = rewrite_series(&series, &paths(&["foo.txt", "bar.txt"]), "docs/renamed.txt");
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("diff --git a/docs/renamed.txt b/docs/renamed.txt"));
        assert!(text.contains("--- a/docs/renamed.txt"));
        assert!(text.contains("+++ b/docs/renamed.txt"));
        assert!(text.contains(" docs/renamed.txt | 1 +"));
        assert!(text.contains(" docs/renamed.txt | 2 +-"));
        assert!(!text.contains("a/foo.txt"));
        assert!(!text.contains("b/bar.txt"));
        assert!(!text.contains(PATH_PLACEHOLDER));
    }

    #[test]
    fn null_path_sentinel_is_untouched() {
        let series = sample_series().into_bytes();
        let out = rewrite_series(&series, &paths(&["foo.txt", "bar.txt"]), "renamed.txt");
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("--- /dev/null\n"));
    }

    #[test]
    fn content_lines_mentioning_the_path_are_untouched() {
        let series = sample_series().into_bytes();
        let out = rewrite_series(&series, &paths(&["foo.txt", "bar.txt"]), "renamed.txt");
        let text = String::from_utf8(out).unwrap();

        // The hunk bodies mention foo.txt; those bytes are file content,
        // not path markers.
        assert!(text.contains("+hello foo.txt\n"));
        assert!(text.contains("-hello foo.txt\n"));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let series = sample_series().into_bytes();
        let set = paths(&["foo.txt", "bar.txt"]);

        let once = rewrite_series(&series, &set, "bar.txt");
        let twice = rewrite_series(&once, &set, "bar.txt");
        assert_eq!(once, twice);

        // Also when the destination is not among the historical paths.
        let once = rewrite_series(&series, &set, "docs/renamed.txt");
        let twice = rewrite_series(&once, &set, "docs/renamed.txt");
        assert_eq!(once, twice);
    }

    #[test]
    fn unrelated_paths_are_left_alone() {
        let series = sample_series().into_bytes();
        let out = rewrite_series(&series, &paths(&["foo.txt"]), "renamed.txt");
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("diff --git a/bar.txt b/bar.txt"));
        assert!(text.contains("diff --git a/renamed.txt b/renamed.txt"));
    }

    #[test]
    fn nested_path_names_do_not_cross_contaminate() {
        // "foo.txt" is a suffix of "dir/foo.txt"; marker matching is exact,
        // so neither bleeds into the other.
        let series = "diff --git a/dir/foo.txt b/dir/foo.txt\n--- a/dir/foo.txt\n+++ b/dir/foo.txt\n"
            .as_bytes()
            .to_vec();
        let out = rewrite_series(&series, &paths(&["foo.txt"]), "renamed.txt");
        assert_eq!(out, series);

        let out = rewrite_series(&series, &paths(&["dir/foo.txt"]), "renamed.txt");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("diff --git a/renamed.txt b/renamed.txt"));
    }
}
