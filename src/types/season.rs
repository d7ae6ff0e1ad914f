use std::fmt;

/// Southern hemisphere season of a local calendar date.
///
/// Boundaries are fixed days; the astronomical dates drift by a day or two
/// from year to year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    /// 21 December to 20 March.
    Summer,
    /// 21 March to 20 June.
    Autumn,
    /// 21 June to 22 September.
    Winter,
    /// 23 September to 20 December.
    Spring,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Summer, Season::Autumn, Season::Winter, Season::Spring];

    pub fn from_month_day(month: u32, day: u32) -> Season {
        match month * 100 + day {
            321..=620 => Season::Autumn,
            621..=922 => Season::Winter,
            923..=1220 => Season::Spring,
            _ => Season::Summer,
        }
    }

    /// Label stored in the `estacao` column.
    pub fn label(&self) -> &'static str {
        match self {
            Season::Summer => "Verão",
            Season::Autumn => "Outono",
            Season::Winter => "Inverno",
            Season::Spring => "Primavera",
        }
    }

    pub fn from_label(label: &str) -> Option<Season> {
        Season::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Portuguese name of a month (1 = January).
pub fn month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
}
