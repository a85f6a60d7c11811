use std::convert::Infallible;
use std::str::FromStr;

/// Type suffix for miniSEED streams.
pub const MSEED_TYPE: &str = "MSEED";

/// SEED spells an empty location code as two dashes.
pub const SEED_LOC_NULL: &str = "--";

/// Composite stream identifier `"W_X_Y_Z/TYPE"`.
///
/// For SEED data the components are `NET_STA_LOC_CHAN/MSEED`, e.g.
/// `IU_ANMO_00_BHZ/MSEED`. The client sends stream ids as opaque text; this
/// type only builds and splits that text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StreamId {
    text: String,
    w: String,
    x: String,
    y: String,
    z: String,
    kind: String,
}

impl StreamId {
    /// Build an identifier from its components.
    pub fn new(w: &str, x: &str, y: &str, z: &str, kind: &str) -> Self {
        Self {
            text: format!("{w}_{x}_{y}_{z}/{kind}"),
            w: w.to_owned(),
            x: x.to_owned(),
            y: y.to_owned(),
            z: z.to_owned(),
            kind: kind.to_owned(),
        }
    }

    /// Build a SEED identifier (`NET_STA_LOC_CHAN/MSEED`).
    pub fn seed(network: &str, station: &str, location: &str, channel: &str) -> Self {
        let location = if location == SEED_LOC_NULL { "" } else { location };
        Self::new(network, station, location, channel, MSEED_TYPE)
    }

    /// Split identifier text into components.
    ///
    /// Never fails: missing components are empty. Everything after the first
    /// `/` is the type, the first three `_` delimit W, X and Y, and the
    /// remainder is Z. The original text is kept as-is.
    pub fn parse(text: &str) -> Self {
        let (ids, kind) = match text.split_once('/') {
            Some((ids, kind)) => (ids, kind),
            None => (text, ""),
        };

        let mut parts = ids.splitn(4, '_').collect::<Vec<_>>();
        // The last piece is always Z; the ones before it fill W, X, Y in order.
        let z = parts.pop().unwrap_or("");
        let mut leading = parts.into_iter();

        Self {
            text: text.to_owned(),
            w: leading.next().unwrap_or("").to_owned(),
            x: leading.next().unwrap_or("").to_owned(),
            y: leading.next().unwrap_or("").to_owned(),
            z: z.to_owned(),
            kind: kind.to_owned(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn w(&self) -> &str {
        &self.w
    }

    pub fn x(&self) -> &str {
        &self.x
    }

    pub fn y(&self) -> &str {
        &self.y
    }

    pub fn z(&self) -> &str {
        &self.z
    }

    /// Payload type, e.g. `"MSEED"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// SEED network code (W).
    pub fn network(&self) -> &str {
        &self.w
    }

    /// SEED station code (X).
    pub fn station(&self) -> &str {
        &self.x
    }

    /// SEED location code (Y).
    pub fn location(&self) -> &str {
        &self.y
    }

    /// SEED channel code (Z).
    pub fn channel(&self) -> &str {
        &self.z
    }
}

impl FromStr for StreamId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_format() {
        let sid = StreamId::seed("IU", "ANMO", "00", "BHZ");
        assert_eq!(sid.to_string(), "IU_ANMO_00_BHZ/MSEED");
        assert_eq!(sid.network(), "IU");
        assert_eq!(sid.station(), "ANMO");
        assert_eq!(sid.location(), "00");
        assert_eq!(sid.channel(), "BHZ");
        assert_eq!(sid.kind(), MSEED_TYPE);
    }

    #[test]
    fn seed_null_location() {
        let sid = StreamId::seed("GE", "WLF", "--", "HHZ");
        assert_eq!(sid.as_str(), "GE_WLF__HHZ/MSEED");
        assert_eq!(sid.location(), "");
    }

    #[test]
    fn parse_seed_text() {
        let sid = StreamId::parse("IU_ANMO_00_BHZ/MSEED");
        assert_eq!(sid, StreamId::seed("IU", "ANMO", "00", "BHZ"));
    }

    #[test]
    fn parse_empty_location() {
        let sid = StreamId::parse("GE_WLF__HHZ/MSEED");
        assert_eq!(sid.network(), "GE");
        assert_eq!(sid.station(), "WLF");
        assert_eq!(sid.location(), "");
        assert_eq!(sid.channel(), "HHZ");
    }

    #[test]
    fn parse_empty_text() {
        let sid = StreamId::parse("");
        assert_eq!(sid.w(), "");
        assert_eq!(sid.x(), "");
        assert_eq!(sid.y(), "");
        assert_eq!(sid.z(), "");
        assert_eq!(sid.kind(), "");
    }

    #[test]
    fn parse_without_type_or_separators() {
        let sid = StreamId::parse("ANMO");
        assert_eq!(sid.w(), "");
        assert_eq!(sid.z(), "ANMO");
        assert_eq!(sid.kind(), "");
        assert_eq!(sid.as_str(), "ANMO");
    }

    #[test]
    fn parse_extra_separators_stay_in_z() {
        let sid = StreamId::parse("A_B_C_D_E/JSON");
        assert_eq!(sid.w(), "A");
        assert_eq!(sid.x(), "B");
        assert_eq!(sid.y(), "C");
        assert_eq!(sid.z(), "D_E");
        assert_eq!(sid.kind(), "JSON");
    }

    #[test]
    fn from_str() {
        let sid: StreamId = "XX_TEST_10_HHN/MSEED".parse().unwrap();
        assert_eq!(sid.channel(), "HHN");
    }
}
