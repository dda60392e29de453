//! Mock employer roster
//!
//! Fixed fixture data in realistic ranges; rates and hours are drawn from
//! these bounds per scenario.

use attestation_core::PayrollFrequency;

/// One mock employer in the corpus roster
#[derive(Debug, Clone, Copy)]
pub struct MockEmployer {
    /// Stable corpus key
    pub key: &'static str,
    /// Registered company name
    pub company_name: &'static str,
    /// Registered domain
    pub domain: &'static str,
    /// Declared headcount
    pub employee_count: u32,
    /// Payroll cadence (also sets the period length)
    pub payroll_frequency: PayrollFrequency,
    /// Lowest hourly rate paid (cents)
    pub min_rate_cents: i64,
    /// Highest hourly rate paid (cents)
    pub max_rate_cents: i64,
    /// Fewest quarter-hours worked per period
    pub min_quarter_hours: i64,
    /// Most quarter-hours worked per period
    pub max_quarter_hours: i64,
}

impl MockEmployer {
    /// Period length in days for this employer's cadence
    pub fn period_days(&self) -> i64 {
        match self.payroll_frequency {
            PayrollFrequency::Weekly => 7,
            PayrollFrequency::Biweekly => 14,
            PayrollFrequency::Monthly => 30,
        }
    }
}

const ROSTER: &[MockEmployer] = &[
    MockEmployer {
        key: "meridian_logistics",
        company_name: "Meridian Logistics, Inc.",
        domain: "meridianlogistics.example",
        employee_count: 140,
        payroll_frequency: PayrollFrequency::Weekly,
        min_rate_cents: 1_850,  // $18.50
        max_rate_cents: 3_200,  // $32.00
        min_quarter_hours: 128, // 32 h
        max_quarter_hours: 180, // 45 h
    },
    MockEmployer {
        key: "harborview_staffing",
        company_name: "Harborview Staffing LLC",
        domain: "harborviewstaffing.example",
        employee_count: 60,
        payroll_frequency: PayrollFrequency::Biweekly,
        min_rate_cents: 1_600,  // $16.00
        max_rate_cents: 2_400,  // $24.00
        min_quarter_hours: 240, // 60 h
        max_quarter_hours: 360, // 90 h
    },
    MockEmployer {
        key: "bluepeak_retail",
        company_name: "BluePeak Retail Group",
        domain: "bluepeakretail.example",
        employee_count: 220,
        payroll_frequency: PayrollFrequency::Weekly,
        min_rate_cents: 1_450,  // $14.50
        max_rate_cents: 2_100,  // $21.00
        min_quarter_hours: 80,  // 20 h
        max_quarter_hours: 160, // 40 h
    },
    MockEmployer {
        key: "cedarcreek_manufacturing",
        company_name: "Cedar Creek Manufacturing Co.",
        domain: "cedarcreekmfg.example",
        employee_count: 85,
        payroll_frequency: PayrollFrequency::Monthly,
        min_rate_cents: 2_200,  // $22.00
        max_rate_cents: 3_600,  // $36.00
        min_quarter_hours: 520, // 130 h
        max_quarter_hours: 680, // 170 h
    },
];

/// The fixed mock-employer roster
pub fn mock_employers() -> &'static [MockEmployer] {
    ROSTER
}
