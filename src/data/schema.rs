use std::fmt;

// ---------------------------------------------------------------------------
// Identifying columns
// ---------------------------------------------------------------------------

/// The six string columns that identify an institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdField {
    UnitId,
    Name,
    City,
    State,
    Control,
    Region,
}

impl IdField {
    pub const ALL: [IdField; 6] = [
        IdField::UnitId,
        IdField::Name,
        IdField::City,
        IdField::State,
        IdField::Control,
        IdField::Region,
    ];

    /// Column name in the source table.
    pub fn column(self) -> &'static str {
        match self {
            IdField::UnitId => "UNITID",
            IdField::Name => "INSTNM",
            IdField::City => "CITY",
            IdField::State => "STABBR",
            IdField::Control => "CONTROL",
            IdField::Region => "REGION",
        }
    }
}

// ---------------------------------------------------------------------------
// Numeric metrics
// ---------------------------------------------------------------------------

/// How a metric's values should be read and formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// 0–1 fraction, shown as a percentage.
    Fraction,
    /// Nominal dollars.
    Dollars,
    /// Head count.
    Count,
    /// Test score.
    Score,
}

/// The numeric metrics retained from the institution table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    AdmissionRate,
    SatAverage,
    Enrollment,
    Cost,
    TuitionInState,
    TuitionOutOfState,
    SpendPerFte,
    FacultySalary,
    PellShare,
    ShareWhite,
    ShareBlack,
    ShareHispanic,
    ShareAsian,
    PartTimeShare,
    Completion,
    Completion200,
    Earnings,
    Debt,
    GradDebt,
    Repayment3yr,
    Retention,
    Default3yr,
}

impl Metric {
    pub const COUNT: usize = 22;

    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::AdmissionRate,
        Metric::SatAverage,
        Metric::Enrollment,
        Metric::Cost,
        Metric::TuitionInState,
        Metric::TuitionOutOfState,
        Metric::SpendPerFte,
        Metric::FacultySalary,
        Metric::PellShare,
        Metric::ShareWhite,
        Metric::ShareBlack,
        Metric::ShareHispanic,
        Metric::ShareAsian,
        Metric::PartTimeShare,
        Metric::Completion,
        Metric::Completion200,
        Metric::Earnings,
        Metric::Debt,
        Metric::GradDebt,
        Metric::Repayment3yr,
        Metric::Retention,
        Metric::Default3yr,
    ];

    /// Position of this metric inside a record's metric array.
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Column name in the source table.
    pub fn column(self) -> &'static str {
        match self {
            Metric::AdmissionRate => "ADM_RATE",
            Metric::SatAverage => "SAT_AVG",
            Metric::Enrollment => "UGDS",
            Metric::Cost => "COSTT4_A",
            Metric::TuitionInState => "TUITIONFEE_IN",
            Metric::TuitionOutOfState => "TUITIONFEE_OUT",
            Metric::SpendPerFte => "INEXPFTE",
            Metric::FacultySalary => "AVGFACSAL",
            Metric::PellShare => "PCTPELL",
            Metric::ShareWhite => "UGDS_WHITE",
            Metric::ShareBlack => "UGDS_BLACK",
            Metric::ShareHispanic => "UGDS_HISP",
            Metric::ShareAsian => "UGDS_ASIAN",
            Metric::PartTimeShare => "PPTUG_EF",
            Metric::Completion => "C150_4",
            Metric::Completion200 => "C200_4",
            Metric::Earnings => "MD_EARN_WNE_P10",
            Metric::Debt => "DEBT_MDN",
            Metric::GradDebt => "GRAD_DEBT_MDN",
            Metric::Repayment3yr => "RPY_3YR_RT",
            Metric::Retention => "RET_FT4",
            Metric::Default3yr => "CDR3",
        }
    }

    /// Compact label used on axes and in tooltips.
    pub fn short_label(self) -> &'static str {
        match self {
            Metric::AdmissionRate => "Adm. rate",
            Metric::SatAverage => "SAT avg",
            Metric::Enrollment => "Enrollment",
            Metric::Cost => "Cost",
            Metric::TuitionInState => "Tuition in",
            Metric::TuitionOutOfState => "Tuition out",
            Metric::SpendPerFte => "Spend/FTE",
            Metric::FacultySalary => "Fac. salary",
            Metric::PellShare => "% Pell",
            Metric::ShareWhite => "% White",
            Metric::ShareBlack => "% Black",
            Metric::ShareHispanic => "% Hisp.",
            Metric::ShareAsian => "% Asian",
            Metric::PartTimeShare => "% Part-time",
            Metric::Completion => "Completion",
            Metric::Completion200 => "Comp. 200",
            Metric::Earnings => "Earnings",
            Metric::Debt => "Debt",
            Metric::GradDebt => "Grad debt",
            Metric::Repayment3yr => "Repay 3yr",
            Metric::Retention => "Retention",
            Metric::Default3yr => "Default 3yr",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            Metric::SatAverage => Unit::Score,
            Metric::Enrollment => Unit::Count,
            Metric::Cost
            | Metric::TuitionInState
            | Metric::TuitionOutOfState
            | Metric::SpendPerFte
            | Metric::FacultySalary
            | Metric::Earnings
            | Metric::Debt
            | Metric::GradDebt => Unit::Dollars,
            _ => Unit::Fraction,
        }
    }

    /// Format a value of this metric for display.
    pub fn format(self, value: f64) -> String {
        match self.unit() {
            Unit::Fraction => format!("{:.1}%", value * 100.0),
            Unit::Dollars => format!("${}", group_thousands(value.round() as i64)),
            Unit::Count => group_thousands(value.round() as i64),
            Unit::Score => format!("{value:.0}"),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_label())
    }
}

/// Metrics shown in the correlation and scatterplot matrices.
pub const CORE_METRICS: [Metric; 7] = [
    Metric::AdmissionRate,
    Metric::SatAverage,
    Metric::PellShare,
    Metric::Cost,
    Metric::Completion,
    Metric::Earnings,
    Metric::Debt,
];

/// Parallel-coordinate axes. Also the metrics a record must mostly have to be kept.
pub const PARALLEL_AXES: [Metric; 6] = [
    Metric::AdmissionRate,
    Metric::SatAverage,
    Metric::PellShare,
    Metric::Cost,
    Metric::Earnings,
    Metric::Debt,
];

/// Metric driving the sequential colour encoding.
pub const COLOR_BY: Metric = Metric::Completion;

/// Every column the loader needs to retain, identifying fields first.
pub fn retained_columns() -> Vec<&'static str> {
    IdField::ALL
        .iter()
        .map(|f| f.column())
        .chain(Metric::ALL.iter().map(|m| m.column()))
        .collect()
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

pub const CONTROL_LABELS: [(&str, &str); 3] = [
    ("1", "Public"),
    ("2", "Private nonprofit"),
    ("3", "Private for-profit"),
];

pub const REGION_LABELS: [(&str, &str); 10] = [
    ("0", "US Service Schools"),
    ("1", "New England"),
    ("2", "Mid East"),
    ("3", "Great Lakes"),
    ("4", "Plains"),
    ("5", "Southeast"),
    ("6", "Southwest"),
    ("7", "Rocky Mountains"),
    ("8", "Far West"),
    ("9", "Outlying Areas"),
];

const STATE_FIPS: [(&str, u32); 51] = [
    ("AL", 1), ("AK", 2), ("AZ", 4), ("AR", 5), ("CA", 6), ("CO", 8), ("CT", 9),
    ("DE", 10), ("DC", 11), ("FL", 12), ("GA", 13), ("HI", 15), ("ID", 16), ("IL", 17),
    ("IN", 18), ("IA", 19), ("KS", 20), ("KY", 21), ("LA", 22), ("ME", 23), ("MD", 24),
    ("MA", 25), ("MI", 26), ("MN", 27), ("MS", 28), ("MO", 29), ("MT", 30), ("NE", 31),
    ("NV", 32), ("NH", 33), ("NJ", 34), ("NM", 35), ("NY", 36), ("NC", 37), ("ND", 38),
    ("OH", 39), ("OK", 40), ("OR", 41), ("PA", 42), ("RI", 44), ("SC", 45), ("SD", 46),
    ("TN", 47), ("TX", 48), ("UT", 49), ("VT", 50), ("VA", 51), ("WA", 53), ("WV", 54),
    ("WI", 55), ("WY", 56),
];

pub fn control_label(code: &str) -> Option<&'static str> {
    lookup(&CONTROL_LABELS, code)
}

pub fn region_label(code: &str) -> Option<&'static str> {
    lookup(&REGION_LABELS, code)
}

/// FIPS code for a postal abbreviation; comparison ignores case.
pub fn state_fips(abbreviation: &str) -> Option<u32> {
    STATE_FIPS
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(abbreviation.trim()))
        .map(|(_, fips)| *fips)
}

pub fn state_abbreviation(fips: u32) -> Option<&'static str> {
    STATE_FIPS.iter().find(|(_, f)| *f == fips).map(|(abbr, _)| *abbr)
}

fn lookup(table: &[(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, label)| *label)
}

/// `1234567` → `"1,234,567"`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
