use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use time::OffsetDateTime;

static FULL_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]{4})").unwrap());
static SHORT_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(2[0-9])").unwrap());

/// The year bucket an album is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlbumYear {
    Known(i32),
    Unknown,
}
impl fmt::Display for AlbumYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(year) => write!(f, "{year}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Work out which year an album belongs to.
///
/// People tend to name albums after the event, and the event's year is often
/// in the name ("2019 Rom", "21 Weihnachten") while the album itself was
/// created much later. So when `from_name` is set, a leading four-digit
/// number wins, then a leading two-digit number starting with `2` (read as
/// `20xx`). Otherwise the creation time's UTC year is used. Missing or
/// non-positive timestamps land in [`AlbumYear::Unknown`].
pub fn derive_year(name: &str, create_time: Option<i64>, from_name: bool) -> AlbumYear {
    if from_name {
        if let Some(captures) = FULL_YEAR.captures(name)
            && let Ok(year) = captures[1].parse()
        {
            return AlbumYear::Known(year);
        }
        if let Some(captures) = SHORT_YEAR.captures(name)
            && let Ok(year) = captures[1].parse::<i32>()
        {
            return AlbumYear::Known(2000 + year);
        }
    }
    create_time
        .filter(|timestamp| *timestamp > 0)
        .and_then(|timestamp| OffsetDateTime::from_unix_timestamp(timestamp).ok())
        .map_or(AlbumYear::Unknown, |date| AlbumYear::Known(date.year()))
}
