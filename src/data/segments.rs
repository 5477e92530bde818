use serde::{Deserialize, Serialize};

/// Half-open GPS interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentList(pub Vec<Segment>);

impl SegmentList {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.0.iter()
    }

    /// Total covered time, counting overlaps once.
    pub fn duration(&self) -> f64 {
        self.coalesce().0.iter().map(Segment::duration).sum()
    }

    /// Sorted copy with overlapping and touching segments merged.
    pub fn coalesce(&self) -> SegmentList {
        let mut segments: Vec<Segment> =
            self.0.iter().copied().filter(|s| s.end > s.start).collect();
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
        for seg in segments {
            match out.last_mut() {
                Some(last) if seg.start <= last.end => last.end = last.end.max(seg.end),
                _ => out.push(seg),
            }
        }
        SegmentList(out)
    }

    pub fn intersection(&self, other: &SegmentList) -> SegmentList {
        let a = self.coalesce();
        let b = other.coalesce();
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < a.0.len() && j < b.0.len() {
            let start = a.0[i].start.max(b.0[j].start);
            let end = a.0[i].end.min(b.0[j].end);
            if end > start {
                out.push(Segment::new(start, end));
            }
            if a.0[i].end < b.0[j].end {
                i += 1;
            } else {
                j += 1;
            }
        }
        SegmentList(out)
    }
}

impl FromIterator<Segment> for SegmentList {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        SegmentList(iter.into_iter().collect())
    }
}

/// Known and active segments of one data-quality flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityFlag {
    /// `IFO:TAG:VERSION`, version optional.
    pub name: String,
    #[serde(default)]
    pub known: SegmentList,
    #[serde(default)]
    pub active: SegmentList,
}

impl DataQualityFlag {
    pub fn new(name: impl Into<String>, known: SegmentList, active: SegmentList) -> Self {
        Self {
            name: name.into(),
            known,
            active,
        }
    }

    fn parts(&self) -> (Option<&str>, &str, Option<u32>) {
        let mut parts = self.name.splitn(3, ':');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (Some(tag), Some(version)) => (Some(first), tag, version.parse().ok()),
            (Some(tag), None) => (Some(first), tag, None),
            _ => (None, first, None),
        }
    }

    pub fn ifo(&self) -> Option<&str> {
        self.parts().0
    }

    pub fn tag(&self) -> &str {
        self.parts().1
    }

    pub fn version(&self) -> Option<u32> {
        self.parts().2
    }

    /// Copy of this flag restricted to `span`.
    pub fn restrict(&self, span: &SegmentList) -> DataQualityFlag {
        DataQualityFlag {
            name: self.name.clone(),
            known: self.known.intersection(span),
            active: self.active.intersection(span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(pairs: &[(f64, f64)]) -> SegmentList {
        pairs.iter().map(|&(s, e)| Segment::new(s, e)).collect()
    }

    #[test]
    fn test_coalesce_and_duration() {
        let segs = list(&[(10.0, 20.0), (0.0, 5.0), (15.0, 30.0), (30.0, 31.0), (40.0, 40.0)]);
        assert_eq!(segs.coalesce(), list(&[(0.0, 5.0), (10.0, 31.0)]));
        assert_eq!(segs.duration(), 26.0);
    }

    #[test]
    fn test_intersection() {
        let a = list(&[(0.0, 10.0), (20.0, 30.0)]);
        let b = list(&[(5.0, 25.0)]);
        assert_eq!(a.intersection(&b), list(&[(5.0, 10.0), (20.0, 25.0)]));
        assert!(a.intersection(&SegmentList::default()).is_empty());
    }

    #[test]
    fn test_flag_name_parts() {
        let flag = DataQualityFlag::new(
            "L1:DMT-ANALYSIS_READY:1",
            SegmentList::default(),
            SegmentList::default(),
        );
        assert_eq!(flag.ifo(), Some("L1"));
        assert_eq!(flag.tag(), "DMT-ANALYSIS_READY");
        assert_eq!(flag.version(), Some(1));

        let flag =
            DataQualityFlag::new("H1:DMT-SCIENCE", SegmentList::default(), SegmentList::default());
        assert_eq!(flag.ifo(), Some("H1"));
        assert_eq!(flag.version(), None);
    }

    #[test]
    fn test_restrict() {
        let flag = DataQualityFlag::new(
            "L1:X:1",
            list(&[(0.0, 100.0)]),
            list(&[(10.0, 20.0), (90.0, 120.0)]),
        );
        let restricted = flag.restrict(&list(&[(0.0, 50.0)]));
        assert_eq!(restricted.known, list(&[(0.0, 50.0)]));
        assert_eq!(restricted.active, list(&[(10.0, 20.0)]));
    }
}
