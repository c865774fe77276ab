//! Port specifications and well-known port lists

/// Top 100 most common TCP ports
pub const TOP_100: &[u16] = &[
    7, 9, 13, 21, 22, 23, 25, 26, 37, 53, 79, 80, 81, 88, 106, 110, 111, 113, 119, 135, 139,
    143, 144, 179, 199, 389, 427, 443, 444, 445, 465, 513, 514, 515, 543, 544, 548, 554, 587,
    631, 646, 873, 990, 993, 995, 1025, 1026, 1027, 1028, 1029, 1110, 1433, 1720, 1723, 1755,
    1900, 2000, 2001, 2049, 2121, 2717, 3000, 3128, 3306, 3389, 3986, 4899, 5000, 5009, 5051,
    5060, 5101, 5190, 5357, 5432, 5631, 5666, 5800, 5900, 6000, 6001, 6646, 7070, 8000, 8008,
    8009, 8080, 8081, 8443, 8888, 9100, 9999, 10000, 32768, 49152, 49153, 49154, 49155, 49156,
    49157,
];

/// Top 20 most common TCP ports
pub const TOP_20: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 445, 993, 995, 1723, 3306, 3389,
    5900, 8080,
];

const MIN_PORT: u32 = 1;
const MAX_PORT: u32 = 65535;

/// Ascending, duplicate-free set of ports in 1..=65535
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSet {
    ports: Vec<u16>,
}

impl PortSet {
    /// Parse a port specification such as `"22,80,8000-8010"`.
    ///
    /// Tokens are comma separated; each is a port or an inclusive `start-end`
    /// range. Non-numeric tokens, reversed ranges and values outside
    /// 1..=65535 are dropped rather than failing the parse, and a range that
    /// crosses a bound keeps only its in-range part. Empty input gives an
    /// empty set.
    pub fn parse(spec: &str) -> Self {
        let mut ports = Vec::new();

        for token in spec.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            if let Some((start, end)) = token.split_once('-') {
                let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>())
                else {
                    continue;
                };
                if start > end {
                    continue;
                }
                let start = start.max(MIN_PORT);
                let end = end.min(MAX_PORT);
                if start > end {
                    continue;
                }
                ports.extend((start..=end).map(|p| p as u16));
            } else if let Ok(port) = token.parse::<u32>() {
                if (MIN_PORT..=MAX_PORT).contains(&port) {
                    ports.push(port as u16);
                }
            }
        }

        Self::from_unsorted(ports)
    }

    /// Build a set from arbitrary ports, dropping port 0
    pub fn from_ports(ports: impl IntoIterator<Item = u16>) -> Self {
        Self::from_unsorted(ports.into_iter().filter(|&p| p != 0).collect())
    }

    fn from_unsorted(mut ports: Vec<u16>) -> Self {
        ports.sort_unstable();
        ports.dedup();
        Self { ports }
    }

    /// Every port, 1 through 65535
    pub fn all() -> Self {
        Self {
            ports: (1..=65535).collect(),
        }
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ports.binary_search(&port).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }

    /// Consecutive ascending batches of at most `size` ports
    pub fn batches(&self, size: usize) -> std::slice::Chunks<'_, u16> {
        self.ports.chunks(size.max(1))
    }
}

impl From<PortSet> for Vec<u16> {
    fn from(set: PortSet) -> Self {
        set.ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_sorted_and_deduped() {
        let set = PortSet::parse("80,22,1000-1002");
        assert_eq!(set.as_slice(), &[22, 80, 1000, 1001, 1002]);
    }

    #[test]
    fn test_parse_duplicates_and_out_of_range() {
        let set = PortSet::parse("70-70,70,9999999");
        assert_eq!(set.as_slice(), &[70]);
    }

    #[test]
    fn test_parse_skips_malformed_tokens() {
        let set = PortSet::parse("abc, 443 ,10-5,0,65536,-3,1-2-3,,8080");
        assert_eq!(set.as_slice(), &[443, 8080]);
    }

    #[test]
    fn test_parse_range_clipped_to_bounds() {
        let set = PortSet::parse("65534-70000");
        assert_eq!(set.as_slice(), &[65534, 65535]);

        let set = PortSet::parse("0-2");
        assert_eq!(set.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_parse_empty_is_empty() {
        assert!(PortSet::parse("").is_empty());
        assert!(PortSet::parse("  ,  ").is_empty());
    }

    #[test]
    fn test_batches_preserve_order() {
        let set = PortSet::parse("1-10");
        let batches: Vec<&[u16]> = set.batches(4).collect();
        assert_eq!(batches, vec![&[1, 2, 3, 4][..], &[5, 6, 7, 8][..], &[9, 10][..]]);
    }

    #[test]
    fn test_preset_names_parse_empty() {
        assert!(PortSet::parse("top20").is_empty());
        assert!(PortSet::parse("all").is_empty());
        assert_eq!(PortSet::all().len(), 65535);
        assert_eq!(PortSet::from_ports(TOP_100.iter().copied()).len(), 100);
    }

    #[test]
    fn test_top_lists_sorted() {
        assert!(TOP_100.windows(2).all(|w| w[0] < w[1]));
        assert!(TOP_20.windows(2).all(|w| w[0] < w[1]));
    }
}
