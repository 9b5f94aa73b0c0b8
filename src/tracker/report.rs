//! Human-readable tables of regions, associations and tracks.
//!
//! These are plain renderings of the data model for logs and regression diffs.

use std::io::{self, Write};

use crate::features::Region;
use crate::tracker::matching::Matcher;
use crate::tracker::track::Track;

/// Which frame a region listing refers to, relative to the tracker's last update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Age {
    /// The frame the tracker was last updated with (t).
    Current,
    /// The frame before it (t-1).
    Previous,
}

/// Index of the track whose last region is `region_id` of `frame`.
///
/// For [`Age::Previous`], `frame` is t-1 and the lookup goes through the backward
/// link of the track's region at t.
pub fn find_corresponding_track(
    frame: u32,
    tracks: &[Track],
    region_id: u32,
    age: Age,
) -> Option<usize> {
    tracks.iter().position(|t| match age {
        Age::Current => t.end.frame == frame && t.end.region.id == region_id,
        Age::Previous => {
            t.end.frame == frame + 1
                && t.end.region.prev_id != 0
                && t.end.region.prev_id == region_id
        }
    })
}

/// List the valid regions of one frame, with a track column when `tracks` is given.
pub fn write_regions<W: Write>(
    w: &mut W,
    frame: u32,
    regions: &[Region],
    tracks: Option<&[Track]>,
    age: Age,
) -> io::Result<()> {
    let n_valid = regions.iter().filter(|r| r.is_valid()).count();
    writeln!(w, "Regions of interest (RoI) [{n_valid}]: ")?;

    if tracks.is_some() {
        writeln!(w, "# ------||-------||---------------------------||---------||-------------------")?;
        writeln!(w, "#   RoI || Track ||        Bounding Box       || Surface ||      Center       ")?;
        writeln!(w, "# ------||-------||---------------------------||---------||-------------------")?;
        writeln!(w, "# ------||-------||------|------|------|------||---------||---------|---------")?;
        writeln!(w, "#    ID ||    ID || xmin | xmax | ymin | ymax ||       S ||       x |       y ")?;
        writeln!(w, "# ------||-------||------|------|------|------||---------||---------|---------")?;
    } else {
        writeln!(w, "# ------||---------------------------||---------||-------------------")?;
        writeln!(w, "#   RoI ||        Bounding Box       || Surface ||      Center       ")?;
        writeln!(w, "# ------||---------------------------||---------||-------------------")?;
        writeln!(w, "# ------||------|------|------|------||---------||---------|---------")?;
        writeln!(w, "#    ID || xmin | xmax | ymin | ymax ||       S ||       x |       y ")?;
        writeln!(w, "# ------||------|------|------|------||---------||---------|---------")?;
    }

    for r in regions.iter().filter(|r| r.is_valid()) {
        match tracks {
            Some(tracks) => {
                let track_id = find_corresponding_track(frame, tracks, r.id, age)
                    .map(|t| format!("{:5}", tracks[t].id))
                    .unwrap_or_else(|| "    -".to_string());
                writeln!(
                    w,
                    "   {:4} || {} || {:4} | {:4} | {:4} | {:4} || {:7} || {:7.1} | {:7.1} ",
                    r.id, track_id, r.xmin, r.xmax, r.ymin, r.ymax, r.surface, r.x, r.y
                )?;
            }
            None => writeln!(
                w,
                "   {:4} || {:4} | {:4} | {:4} | {:4} || {:7} || {:7.1} | {:7.1} ",
                r.id, r.xmin, r.xmax, r.ymin, r.ymax, r.surface, r.x, r.y
            )?,
        }
    }
    Ok(())
}

/// List the regions of frames t-1 (when `prev_frame` is given) and t.
pub fn write_region_pair<W: Write>(
    w: &mut W,
    prev_frame: Option<u32>,
    cur_frame: u32,
    prev: &[Region],
    cur: &[Region],
    tracks: Option<&[Track]>,
) -> io::Result<()> {
    if let Some(prev_frame) = prev_frame {
        write!(w, "# Frame n°{prev_frame:05} (t-1) -- ")?;
        write_regions(w, prev_frame, prev, tracks, Age::Previous)?;
        writeln!(w, "#")?;
    }
    write!(w, "# Frame n°{cur_frame:05} (t) -- ")?;
    write_regions(w, cur_frame, cur, tracks, Age::Current)
}

/// List the associations of the last matching, then its conflicts when the matcher
/// tracks them.
pub fn write_associations<W: Write>(
    w: &mut W,
    matcher: &Matcher,
    prev: &[Region],
    cur: &[Region],
) -> io::Result<()> {
    let n_assoc = prev.iter().filter(|r| r.next_id != 0).count();
    writeln!(w, "# Associations [{n_assoc}]:")?;

    if n_assoc > 0 {
        writeln!(w, "# ------------||---------------")?;
        writeln!(w, "#    RoI ID   ||    Distance   ")?;
        writeln!(w, "# ------------||---------------")?;
        writeln!(w, "# -----|------||--------|------")?;
        writeln!(w, "#  t-1 |    t || pixels | rank ")?;
        writeln!(w, "# -----|------||--------|------")?;
    }

    for (i, r) in prev.iter().enumerate() {
        if !r.is_valid() || r.next_id == 0 {
            continue;
        }
        let j = r.next_id as usize - 1;
        writeln!(
            w,
            "  {:4} | {:4} || {:6.3} | {:4} ",
            r.id,
            r.next_id,
            matcher.distance_squared(i, j).sqrt(),
            matcher.rank(i, j)
        )?;
    }

    if let Some(conflicts) = matcher.conflicts() {
        write_conflicts(w, matcher, conflicts, prev.len().min(matcher.dims().0), cur.len())?;
    }
    Ok(())
}

fn write_conflicts<W: Write>(
    w: &mut W,
    matcher: &Matcher,
    conflicts: &[u32],
    n_prev: usize,
    n_cur: usize,
) -> io::Result<()> {
    writeln!(w, "#")?;
    let conflicting: Vec<usize> = (0..n_cur.min(conflicts.len()))
        .filter(|&j| conflicts[j] > 1)
        .collect();
    if conflicting.is_empty() {
        return writeln!(w, "# No conflict found");
    }

    writeln!(w, "# Association conflicts [{}]:", conflicting.len())?;
    for j in conflicting {
        let candidates: Vec<String> = (0..n_prev)
            .filter(|&i| matcher.rank(i, j) == 1)
            .map(|i| format!("{} [dist = {:.2}]", i + 1, matcher.distance_squared(i, j).sqrt()))
            .collect();
        writeln!(
            w,
            "RoI ID (t) = {}, list of possible RoI IDs (t-1): {{ {} }}",
            j + 1,
            candidates.join(", ")
        )?;
    }
    Ok(())
}

fn track_header<W: Write>(w: &mut W, tracks: &[Track], with_state: bool) -> io::Result<()> {
    let (bar, state, blank) = if with_state {
        ("||-------", "|| State ", "||       ")
    } else {
        ("", "", "")
    };
    writeln!(w, "# Tracks [{}]:", tracks.len())?;
    writeln!(w, "# -------||---------------------------||---------------------------{bar}")?;
    writeln!(w, "#  Track ||           Begin           ||            End            {state}")?;
    writeln!(w, "# -------||---------------------------||---------------------------{bar}")?;
    writeln!(w, "# -------||---------|--------|--------||---------|--------|--------{bar}")?;
    writeln!(w, "#     Id || Frame # |      x |      y || Frame # |      x |      y {blank}")?;
    writeln!(w, "# -------||---------|--------|--------||---------|--------|--------{bar}")
}

fn track_row(t: &Track) -> String {
    format!(
        "   {:5} || {:7} | {:6.1} | {:6.1} || {:7} | {:6.1} | {:6.1} ",
        t.id, t.begin.frame, t.begin.region.x, t.begin.region.y, t.end.frame, t.end.region.x,
        t.end.region.y
    )
}

/// List tracks with their begin and end.
pub fn write_tracks<W: Write>(w: &mut W, tracks: &[Track]) -> io::Result<()> {
    track_header(w, tracks, false)?;
    for t in tracks {
        writeln!(w, "{}", track_row(t))?;
    }
    Ok(())
}

/// List tracks with their begin, end and state.
pub fn write_tracks_full<W: Write>(w: &mut W, tracks: &[Track]) -> io::Result<()> {
    track_header(w, tracks, true)?;
    for t in tracks {
        writeln!(w, "{}||   {} ", track_row(t), t.state)?;
    }
    Ok(())
}

/// One line per track with its recorded region ids.
pub fn write_track_region_ids<W: Write>(w: &mut W, tracks: &[Track]) -> io::Result<()> {
    for t in tracks {
        write!(w, " {:5} object ", t.id)?;
        if let Some(ids) = t.region_ids() {
            for id in ids {
                write!(w, " {id:5} ")?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::TrackedRegion;
    use crate::tracker::MatcherConfig;

    fn region(id: u32, x: f32) -> Region {
        Region::new(id, [1, 3, 2, 4], 9, x, 3.0)
    }

    fn track(id: u32, end: Region, frame: u32) -> Track {
        let chain = [
            TrackedRegion::observed(&region(1, 0.0), frame - 1),
            TrackedRegion::observed(&end, frame),
        ];
        Track::from_chain(id, &chain, true)
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_find_corresponding_track() {
        let mut end = region(2, 5.0);
        end.prev_id = 4;
        let tracks = vec![track(1, region(1, 1.0), 9), track(2, end, 10)];

        assert_eq!(find_corresponding_track(10, &tracks, 2, Age::Current), Some(1));
        assert_eq!(find_corresponding_track(9, &tracks, 1, Age::Current), Some(0));
        assert_eq!(find_corresponding_track(9, &tracks, 4, Age::Previous), Some(1));
        assert_eq!(find_corresponding_track(9, &tracks, 3, Age::Current), None);
    }

    #[test]
    fn test_regions_listing() {
        let regions = vec![region(1, 2.0), Region::default(), region(3, 7.25)];
        let tracks = vec![track(5, region(3, 7.25), 4)];

        let text = render(|w| write_regions(w, 4, &regions, Some(&tracks), Age::Current));
        assert!(text.starts_with("Regions of interest (RoI) [2]:"));
        assert!(text.contains("   1 ||     - ||    1 |    3 |    2 |    4 ||       9 ||     2.0 |     3.0 "));
        assert!(text.contains("   3 ||     5 ||"));

        let plain = render(|w| write_regions(w, 4, &regions, None, Age::Current));
        assert!(!plain.contains("Track"));
    }

    #[test]
    fn test_associations_listing() {
        let mut matcher = Matcher::new(4).with_conflict_tracking();
        let mut prev = vec![region(1, 0.0), region(2, 10.0)];
        let mut cur = vec![region(1, 3.0)];
        matcher.associate(&mut prev, &mut cur, &MatcherConfig::default()).unwrap();

        let text = render(|w| write_associations(w, &matcher, &prev, &cur));
        assert!(text.contains("# Associations [1]:"));
        assert!(text.contains("     1 |    1 ||  3.000 |    1 "));
        assert!(text.contains("# Association conflicts [1]:"));
        assert!(text.contains("{ 1 [dist = 3.00], 2 [dist = 7.00] }"));
    }

    #[test]
    fn test_tracks_listing() {
        let mut lost = track(2, region(2, 8.0), 6);
        lost.mark_lost();
        let tracks = vec![track(1, region(1, 4.5), 6), lost];

        let text = render(|w| write_tracks_full(w, &tracks));
        assert!(text.starts_with("# Tracks [2]:"));
        assert!(text.contains("|| State "));
        assert!(text.contains("       1 ||       5 |    0.0 |    3.0 ||       6 |    4.5 |    3.0 ||   UPD "));
        assert!(text.contains("||   LST "));

        let compact = render(|w| write_tracks(w, &tracks));
        assert!(!compact.contains("State"));

        let ids = render(|w| write_track_region_ids(w, &tracks));
        assert_eq!(ids.lines().next(), Some("     1 object      1      1 "));
    }
}
