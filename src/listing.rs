//! LIST response parser.
//!
//! Recognises Unix `ls -l` lines and Windows/IIS lines. Anything else is
//! taken as a bare file name.

use regex::Regex;

use super::types::RemoteEntry;

lazy_static! {
    // drwxr-xr-x   2 user group  4096 Jan  1 12:00 dirname
    // -rw-r--r--   1 user group    10 Oct 17  2025 a.txt
    static ref UNIX_RE: Regex = Regex::new(
        r"(?x)
        ^([bcdlps-])[rwxsStT-]{9}[.+@]?\s+   # type and permissions
        \d+\s+                                # link count
        \S+\s+                                # owner
        (?:\S+\s+)?                           # group, omitted by some servers
        \d+\s+                                # size
        \w{3}\s+\d{1,2}\s+[\d:]{4,5}\s+       # date
        (.+)$                                 # name, possibly with -> target
        "
    ).unwrap();

    // 10-17-25  09:33PM       <DIR>          pub
    // 10-17-25  09:33PM                   10 a.txt
    static ref WINDOWS_RE: Regex = Regex::new(
        r"^\d{2}-\d{2}-\d{2,4}\s+\d{1,2}:\d{2}(?:AM|PM)?\s+(<DIR>|\d+)\s+(.+)$"
    ).unwrap();
}

/// Parse the lines of a LIST response, dropping `.` and `..`.
pub fn parse_listing<S: AsRef<str>>(lines: &[S]) -> Vec<RemoteEntry> {
    lines
        .iter()
        .filter_map(|line| parse_line(line.as_ref()))
        .filter(|entry| entry.name != "." && entry.name != "..")
        .collect()
}

/// Parse a single LIST line.
pub fn parse_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end();
    if line.trim().is_empty() || line.starts_with("total ") {
        return None;
    }

    if let Some(caps) = UNIX_RE.captures(line) {
        let name = &caps[2];
        return Some(match &caps[1] {
            "d" => RemoteEntry::directory(name),
            // Only the link name is listed; the target is not followed.
            "l" => RemoteEntry::file(name.split(" -> ").next().unwrap_or(name)),
            _ => RemoteEntry::file(name),
        });
    }

    if let Some(caps) = WINDOWS_RE.captures(line) {
        let name = &caps[2];
        return Some(if &caps[1] == "<DIR>" {
            RemoteEntry::directory(name)
        } else {
            RemoteEntry::file(name)
        });
    }

    Some(RemoteEntry::file(line.trim()))
}
